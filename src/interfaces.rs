//! Injected host interfaces.
//!
//! The core never reaches for process-wide globals; the host hands it the
//! world queries it consumes (ground contact, ray intersection) as trait
//! objects at construction time, which keeps the simulation testable in
//! isolation.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Collision layer filter passed through to host queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Outcome of the authoritative collider-contact test.
///
/// `Ambiguous` means the host cannot assert either way (engine contact flags
/// are flaky at low speeds); the controller then falls back to the proximity
/// probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTest {
    Grounded,
    Airborne,
    Ambiguous,
}

/// Ground-contact query consumed by the movement controller.
pub trait GroundContact: Send + Sync {
    /// Authoritative collider-contact test at the character's foot point.
    fn collider_contact(&self, foot: Vec3, mask: LayerMask) -> ContactTest;

    /// Secondary proximity-volume test, used when the contact test is
    /// ambiguous.
    fn probe(&self, origin: Vec3, radius: f32, mask: LayerMask) -> bool;
}

/// Nearest intersection returned by a world ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
    /// Target id of the struck entity, if the host tracks one.
    pub target: Option<u32>,
    /// True when the struck body is physically dynamic.
    pub dynamic_body: bool,
}

/// World-intersection query consumed by the weapon.
pub trait WorldRay: Send + Sync {
    /// Cast a ray and return the nearest hit within `max_dist`, or `None`.
    fn cast(&self, origin: Vec3, dir: Vec3, max_dist: f32, mask: LayerMask) -> Option<RayHit>;
}

/// Resource wrapper for the injected ground-contact query.
#[derive(Resource)]
pub struct GroundQuery(pub Box<dyn GroundContact>);

/// Resource wrapper for the injected world ray query.
#[derive(Resource)]
pub struct RayQuery(pub Box<dyn WorldRay>);

// ============================================================================
// BUILT-IN IMPLEMENTATIONS
// ============================================================================

/// Infinite flat ground plane. Contact is conclusive at the surface and
/// ambiguous above it, exercising the fallback probe the way a real
/// character-collider adapter would.
pub struct FlatGround {
    pub surface_y: f32,
}

/// Contact tolerance above the surface, in units.
const CONTACT_EPSILON: f32 = 0.001;

impl GroundContact for FlatGround {
    fn collider_contact(&self, foot: Vec3, _mask: LayerMask) -> ContactTest {
        if foot.y <= self.surface_y + CONTACT_EPSILON {
            ContactTest::Grounded
        } else {
            ContactTest::Ambiguous
        }
    }

    fn probe(&self, origin: Vec3, radius: f32, _mask: LayerMask) -> bool {
        origin.y - radius <= self.surface_y
    }
}

/// A world with nothing to hit.
pub struct EmptyWorld;

impl WorldRay for EmptyWorld {
    fn cast(&self, _origin: Vec3, _dir: Vec3, _max_dist: f32, _mask: LayerMask) -> Option<RayHit> {
        None
    }
}
