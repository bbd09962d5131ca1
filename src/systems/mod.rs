//! ECS Systems for the first-person action core.
//!
//! Systems contain the per-tick logic that operates on components. The
//! schedule chains them in a fixed order so that, within a tick:
//!
//! - `movement_system` - ground check, jump windows, speed blend, gravity,
//!   crouch blend; runs first so weapon spread reads current speed/crouch.
//! - `weapon_system` - trigger handling, fire gating, spread/recoil,
//!   hit resolution, pooled effect borrows.
//! - `deferred_system` - drains the timer queue: reload completions and
//!   pooled-effect returns whose delay elapsed this tick.

pub mod deferred;
pub mod movement;
pub mod weapon;

pub use deferred::*;
pub use movement::*;
pub use weapon::*;
