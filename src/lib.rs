//! First-Person Action Core - Simulation
//!
//! A headless, tick-driven simulation of the per-frame action core of a
//! first-person shooter: player movement (grounding, coyote time, jump
//! buffering, crouch blending), weapon gunplay (fire gating, spread/recoil,
//! ammo/reload lifecycle, hit resolution) and the pooled transient effects
//! both depend on. Uses `bevy_ecs` for the entity-component-system
//! architecture; the host engine drives it through [`api::SimWorld`].

pub mod api;
pub mod components;
pub mod events;
pub mod interfaces;
pub mod pool;
pub mod scheduler;
pub mod systems;
pub mod world;

pub use api::{ConfigError, SimConfig, SimWorld};
pub use components::*;
pub use events::{SimEvent, SimEvents};
pub use interfaces::{ContactTest, GroundContact, LayerMask, RayHit, WorldRay};
pub use pool::{ObjectPool, Placement, PoolError, PoolHandle};
pub use scheduler::{Deferred, SimClock, TimerQueue};
pub use systems::*;
pub use world::Snapshot;
