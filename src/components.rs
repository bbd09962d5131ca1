//! ECS Components for the first-person action core.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::interfaces::LayerMask;
use crate::pool::{ObjectPool, PoolError};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World-space position of an entity.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }
}

/// Body yaw of a character, in radians. Move axes are interpreted in this
/// frame; the host's look system owns pitch.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f32,
}

impl Orientation {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }
}

/// World-space displacement produced by the movement controller this tick.
/// The host applies this to its own collider; [`Position`] is also integrated
/// from it as a convenience.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Displacement(pub Vec3);

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for a player character.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Unique identifier for a shootable world entity. Ray queries report hits
/// by this id.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TargetId(pub u32);

// ============================================================================
// HEALTH COMPONENTS
// ============================================================================

/// Health of a damageable entity. Owns its own clamping; death semantics are
/// surfaced as a one-shot event by whoever applies the killing blow.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Marker for collider entities that relay damage instead of owning health.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Damageable;

/// Routes damage from a tagged collider to the owning entity's [`Health`],
/// identified by target id (the flat-world stand-in for a parent lookup).
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DamageRelay(pub u32);

// ============================================================================
// MOVEMENT COMPONENTS
// ============================================================================

/// Latest directional/sprint/crouch intent. Stored by the API, consumed by
/// the movement system each tick; setting it has no immediate effect.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Move axes in `[-1, 1]^2` (x = strafe, y = forward).
    pub axes: Vec2,
    pub sprint_held: bool,
    pub crouch_requested: bool,
}

/// Movement tuning for a player character.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Base walk speed (units per second).
    pub walk_speed: f32,
    /// Sprint speed (units per second).
    pub run_speed: f32,
    /// Exponential smoothing rate for blending horizontal speed.
    pub accel: f32,
    /// Apex height a jump reaches under constant gravity.
    pub jump_height: f32,
    /// Gravity acceleration (negative, units per second squared).
    pub gravity: f32,
    /// Grace window after leaving the ground during which a jump still works.
    pub coyote_time: f32,
    /// Grace window during which an early jump request stays buffered.
    pub jump_buffer_time: f32,
    /// Collider height while standing.
    pub stand_height: f32,
    /// Collider height while crouched.
    pub crouch_height: f32,
    /// Blend rate for the stand/crouch height transition.
    pub crouch_transition_speed: f32,
    /// If true, a crouch press toggles; otherwise crouch is held.
    pub crouch_toggle: bool,
    pub can_sprint: bool,
    /// Upward offset of the fallback ground probe from the foot point.
    pub probe_offset: f32,
    /// Radius of the fallback ground probe volume.
    pub probe_radius: f32,
    pub ground_mask: LayerMask,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 3.0,
            run_speed: 6.0,
            accel: 10.0,
            jump_height: 1.6,
            gravity: -24.0,
            coyote_time: 0.12,
            jump_buffer_time: 0.12,
            stand_height: 1.8,
            crouch_height: 1.0,
            crouch_transition_speed: 8.0,
            crouch_toggle: false,
            can_sprint: true,
            probe_offset: 0.1,
            probe_radius: 0.25,
            ground_mask: LayerMask::ALL,
        }
    }
}

/// Runtime movement state, mutated once per tick by the movement system.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MovementState {
    /// Horizontal speed, lerped toward the walk/run/crouch target.
    pub current_speed: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    /// Simulation time of the last ground contact.
    pub last_grounded_time: f32,
    /// Simulation time of the last buffered jump request.
    pub last_jump_request_time: f32,
    /// Set while a jump is in flight; cleared on ground contact.
    pub jump_in_progress: bool,
    pub crouched: bool,
    /// Collider height, lerped toward the stand/crouch target.
    pub collider_height: f32,
    /// Vertical collider center, kept at half height so the lower contact
    /// point stays fixed during crouch transitions.
    pub collider_center_y: f32,
}

impl MovementState {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            current_speed: config.walk_speed,
            vertical_velocity: 0.0,
            grounded: false,
            last_grounded_time: f32::NEG_INFINITY,
            last_jump_request_time: f32::NEG_INFINITY,
            jump_in_progress: false,
            crouched: false,
            collider_height: config.stand_height,
            collider_center_y: config.stand_height * 0.5,
        }
    }
}

// ============================================================================
// WEAPON COMPONENTS
// ============================================================================

/// Weapon tuning for one firing state machine.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponConfig {
    pub magazine_size: u32,
    /// Shots per second; the inter-shot gate is `1 / fire_rate`.
    pub fire_rate: f32,
    /// Automatic weapons keep attempting shots while the trigger is held.
    pub automatic: bool,
    pub damage: f32,
    /// Maximum hit-scan distance.
    pub range: f32,
    pub reload_time: f32,
    /// Hip-fire spread in degrees.
    pub base_spread: f32,
    pub moving_spread_mult: f32,
    /// Crouching takes precedence over the moving multiplier.
    pub crouch_spread_mult: f32,
    /// Applied only while aiming down sights.
    pub ads_spread_mult: f32,
    /// Fixed vertical recoil per shot, in degrees.
    pub recoil_per_shot: f32,
    /// Lateral recoil is sampled uniformly from this range.
    pub recoil_side_range: (f32, f32),
    /// Prewarm count for each effect pool.
    pub pool_size: u32,
    pub hit_mask: LayerMask,
    /// Display lifetime of a borrowed muzzle flash.
    pub muzzle_flash_secs: f32,
    /// Display lifetime of a borrowed impact mark.
    pub impact_mark_secs: f32,
    /// Impulse magnitude applied opposite the hit normal to dynamic bodies.
    pub impact_impulse: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            magazine_size: 12,
            fire_rate: 5.0,
            automatic: false,
            damage: 40.0,
            range: 120.0,
            reload_time: 1.2,
            base_spread: 1.8,
            moving_spread_mult: 1.6,
            crouch_spread_mult: 0.6,
            ads_spread_mult: 0.4,
            recoil_per_shot: 4.0,
            recoil_side_range: (-0.4, 0.4),
            pool_size: 12,
            hit_mask: LayerMask::ALL,
            muzzle_flash_secs: 0.6,
            impact_mark_secs: 4.0,
            impact_impulse: 80.0,
        }
    }
}

/// Runtime weapon state, owned exclusively by the firing state machine.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponState {
    /// Rounds left in the magazine, always in `[0, magazine_size]`.
    pub ammo: u32,
    /// Simulation time of the last successful or dry-fire attempt.
    pub last_fire_time: f32,
    pub reloading: bool,
    /// Trigger is held (only meaningful for automatic weapons).
    pub firing_held: bool,
    /// A trigger press arrived since the last tick and still needs a shot
    /// attempt.
    pub trigger_edge: bool,
    pub aiming: bool,
    /// Firing flag as seen by animation consumers; raised by a shot, lowered
    /// by the muzzle flash return once the trigger is released.
    pub firing_visible: bool,
}

impl WeaponState {
    pub fn new(config: &WeaponConfig) -> Self {
        Self {
            ammo: config.magazine_size,
            last_fire_time: f32::NEG_INFINITY,
            reloading: false,
            firing_held: false,
            trigger_edge: false,
            aiming: false,
            firing_visible: false,
        }
    }
}

/// Host-fed aim ray and muzzle anchor, updated before each tick.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AimTransform {
    /// Ray origin (camera position).
    pub origin: Vec3,
    /// Normalized aim-forward direction.
    pub forward: Vec3,
    /// Muzzle anchor where flash effects are placed.
    pub muzzle: Vec3,
}

impl Default for AimTransform {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            forward: Vec3::Z,
            muzzle: Vec3::ZERO,
        }
    }
}

// ============================================================================
// EFFECT COMPONENTS
// ============================================================================

/// Pooled muzzle flash instance data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MuzzleFlash;

/// Pooled impact decal/particles instance data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactMark;

/// The weapon's transient-effect pools. Muzzle and impact call sites own
/// distinct pool instances; there is no cross-talk between them.
#[derive(Component)]
pub struct EffectPools {
    pub muzzle: ObjectPool<MuzzleFlash>,
    pub impact: ObjectPool<ImpactMark>,
}

impl EffectPools {
    /// Build both pools and prewarm each with `prewarm` inactive instances.
    pub fn with_capacity(prewarm: u32) -> Result<Self, PoolError> {
        let mut muzzle = ObjectPool::with_template(|| MuzzleFlash);
        muzzle.prewarm(prewarm as usize)?;
        let mut impact = ObjectPool::with_template(|| ImpactMark);
        impact.prewarm(prewarm as usize)?;
        Ok(Self { muzzle, impact })
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete player character entity.
#[derive(Bundle)]
pub struct PlayerBundle {
    pub player_id: PlayerId,
    pub position: Position,
    pub orientation: Orientation,
    pub intent: MoveIntent,
    pub move_config: MovementConfig,
    pub move_state: MovementState,
    pub displacement: Displacement,
    pub aim: AimTransform,
    pub weapon_config: WeaponConfig,
    pub weapon_state: WeaponState,
    pub health: Health,
}

impl PlayerBundle {
    pub fn new(id: u32, move_config: MovementConfig, weapon_config: WeaponConfig) -> Self {
        Self {
            player_id: PlayerId(id),
            position: Position::default(),
            orientation: Orientation::default(),
            intent: MoveIntent::default(),
            move_state: MovementState::new(&move_config),
            move_config,
            displacement: Displacement::default(),
            aim: AimTransform::default(),
            weapon_state: WeaponState::new(&weapon_config),
            weapon_config,
            health: Health::default(),
        }
    }
}

/// Bundle for spawning a shootable target with its own health.
#[derive(Bundle, Default)]
pub struct TargetBundle {
    pub target_id: TargetId,
    pub position: Position,
    pub health: Health,
}

impl TargetBundle {
    pub fn new(id: u32, position: Vec3, max_health: f32) -> Self {
        Self {
            target_id: TargetId(id),
            position: Position(position),
            health: Health::new(max_health),
        }
    }
}

/// Bundle for a tagged collider that relays damage to an owning target.
#[derive(Bundle)]
pub struct RelayColliderBundle {
    pub target_id: TargetId,
    pub damageable: Damageable,
    pub relay: DamageRelay,
}

impl RelayColliderBundle {
    pub fn new(collider_id: u32, owner_id: u32) -> Self {
        Self {
            target_id: TargetId(collider_id),
            damageable: Damageable,
            relay: DamageRelay(owner_id),
        }
    }
}
