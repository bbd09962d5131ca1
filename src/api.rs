//! Public API for the simulation.
//!
//! This module provides the main interface for a host engine (or test
//! harness) to drive the action core.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs fixed
//! updates as needed. This ensures deterministic behavior regardless of the
//! host's frame rate.
//!
//! ## Intents and Events
//!
//! Input arrives as stored intents (`set_move_input`, `start_fire`, ...)
//! that the next tick consumes; nothing happens at call time. Observable
//! side effects come back out of `drain_events` after stepping.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, error};

use crate::components::*;
use crate::interfaces::{EmptyWorld, FlatGround, GroundContact, GroundQuery, RayQuery, WorldRay};
use crate::pool::PoolError;
use crate::scheduler::{SimClock, TimerQueue};
use crate::events::{SimEvent, SimEvents};
use crate::systems::*;
use crate::world::Snapshot;

/// Simulation-wide configuration.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimConfig {
    /// Fixed update interval in seconds.
    pub fixed_timestep: f32,
    /// Seed for the spread/recoil RNG; fixed seeds give reproducible runs.
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            rng_seed: 0xF1DE,
        }
    }
}

/// Rejected character configuration. Raised at spawn time so bad tuning
/// fails loudly instead of misbehaving mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fixed timestep must be positive")]
    NonPositiveTimestep,
    #[error("magazine size must be at least 1")]
    EmptyMagazine,
    #[error("fire rate must be positive")]
    NonPositiveFireRate,
    #[error("movement tuning invalid: {0}")]
    BadMovementTuning(&'static str),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Spawning players, targets and relay colliders
/// - Feeding input intents
/// - Stepping the simulation forward
/// - Draining side-effect events and extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a simulation over an infinite flat floor with nothing to
    /// shoot. Useful for movement-only hosts and tests.
    pub fn new() -> Self {
        Self::build(
            SimConfig::default(),
            Box::new(FlatGround { surface_y: 0.0 }),
            Box::new(EmptyWorld),
        )
    }

    /// Create a simulation with custom configuration and injected world
    /// queries. Fails when the fixed timestep is not positive; the
    /// accumulator in [`SimWorld::step`] could never drain otherwise.
    pub fn with_config(
        config: SimConfig,
        ground: Box<dyn GroundContact>,
        rays: Box<dyn WorldRay>,
    ) -> Result<Self, ConfigError> {
        if !(config.fixed_timestep > 0.0) {
            error!(
                fixed_timestep = config.fixed_timestep,
                "rejected simulation config"
            );
            return Err(ConfigError::NonPositiveTimestep);
        }
        Ok(Self::build(config, ground, rays))
    }

    fn build(
        config: SimConfig,
        ground: Box<dyn GroundContact>,
        rays: Box<dyn WorldRay>,
    ) -> Self {
        let mut world = World::new();

        // Core resources
        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimClock::default());
        world.insert_resource(TimerQueue::default());
        world.insert_resource(SimEvents::default());
        world.insert_resource(WeaponRng(StdRng::seed_from_u64(config.rng_seed)));
        world.insert_resource(GroundQuery(ground));
        world.insert_resource(RayQuery(rays));
        world.insert_resource(config);

        // Movement runs first so weapon spread reads current speed/crouch;
        // deferred continuations resolve last.
        let mut schedule = Schedule::default();
        schedule.add_systems((movement_system, weapon_system, deferred_system).chain());

        Self {
            world,
            schedule,
            time_accumulator: 0.0,
        }
    }

    /// Spawn a player character. Fails without side effects when the tuning
    /// is invalid.
    pub fn spawn_player(
        &mut self,
        id: u32,
        move_config: MovementConfig,
        weapon_config: WeaponConfig,
    ) -> Result<(), ConfigError> {
        if let Err(err) = validate_configs(&move_config, &weapon_config) {
            error!(player = id, %err, "rejected player spawn");
            return Err(err);
        }
        let pools = EffectPools::with_capacity(weapon_config.pool_size)?;
        self.world
            .spawn((PlayerBundle::new(id, move_config, weapon_config), pools));
        debug!(player = id, "player spawned");
        Ok(())
    }

    /// Spawn a shootable target with its own health.
    pub fn spawn_target(&mut self, id: u32, position: Vec3, max_health: f32) {
        self.world.spawn(TargetBundle::new(id, position, max_health));
    }

    /// Spawn a tagged collider that relays damage to an owning target.
    pub fn spawn_relay_collider(&mut self, collider_id: u32, owner_id: u32) {
        self.world
            .spawn(RelayColliderBundle::new(collider_id, owner_id));
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed
    /// updates as needed.
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self
            .world
            .get_resource::<SimConfig>()
            .map(|c| c.fixed_timestep)
            .unwrap_or(1.0 / 60.0);

        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        // Advance before the systems run so they see end-of-tick time.
        self.world.resource_mut::<SimClock>().advance(dt);
        self.schedule.run(&mut self.world);
    }

    // ------------------------------------------------------------------
    // Movement intents
    // ------------------------------------------------------------------

    /// Store directional input for the next tick. Components are clamped to
    /// `[-1, 1]` (x = strafe, y = forward).
    pub fn set_move_input(&mut self, player_id: u32, x: f32, y: f32) {
        let mut query = self.world.query::<(&PlayerId, &mut MoveIntent)>();
        for (id, mut intent) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                intent.axes = Vec2::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
                break;
            }
        }
    }

    /// Store sprint-held input for the next tick.
    pub fn set_sprint(&mut self, player_id: u32, held: bool) {
        let mut query = self.world.query::<(&PlayerId, &mut MoveIntent)>();
        for (id, mut intent) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                intent.sprint_held = held;
                break;
            }
        }
    }

    /// Feed the crouch control. In hold mode the requested state follows
    /// `pressed`; in toggle mode each press flips it and releases are
    /// ignored.
    pub fn set_crouch(&mut self, player_id: u32, pressed: bool) {
        let mut query = self
            .world
            .query::<(&PlayerId, &MovementConfig, &mut MoveIntent)>();
        for (id, config, mut intent) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                if config.crouch_toggle {
                    if pressed {
                        intent.crouch_requested = !intent.crouch_requested;
                    }
                } else {
                    intent.crouch_requested = pressed;
                }
                break;
            }
        }
    }

    /// Buffer a jump request. It stays valid for the configured buffer
    /// window, so a slightly early press still lands.
    pub fn request_jump(&mut self, player_id: u32) {
        let now = self.world.resource::<SimClock>().time;
        let mut query = self.world.query::<(&PlayerId, &mut MovementState)>();
        for (id, mut state) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                state.last_jump_request_time = now;
                break;
            }
        }
    }

    /// Set the character's body yaw, in radians.
    pub fn set_yaw(&mut self, player_id: u32, yaw: f32) {
        let mut query = self.world.query::<(&PlayerId, &mut Orientation)>();
        for (id, mut orient) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                orient.yaw = yaw;
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Weapon intents
    // ------------------------------------------------------------------

    /// Feed the host's aim ray and muzzle anchor for the next tick.
    pub fn set_aim(&mut self, player_id: u32, origin: Vec3, forward: Vec3, muzzle: Vec3) {
        let mut query = self.world.query::<(&PlayerId, &mut AimTransform)>();
        for (id, mut aim) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                aim.origin = origin;
                aim.forward = forward.normalize_or(Vec3::Z);
                aim.muzzle = muzzle;
                break;
            }
        }
    }

    /// Set whether the player is aiming down sights.
    pub fn set_aiming(&mut self, player_id: u32, aiming: bool) {
        let mut query = self.world.query::<(&PlayerId, &mut WeaponState)>();
        for (id, mut state) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                state.aiming = aiming;
                break;
            }
        }
    }

    /// Trigger pressed. Buffers one shot attempt for the next tick; for
    /// automatic weapons the held trigger keeps attempting until released.
    pub fn start_fire(&mut self, player_id: u32) {
        let mut query = self.world.query::<(&PlayerId, &mut WeaponState)>();
        for (id, mut state) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                state.trigger_edge = true;
                state.firing_held = true;
                break;
            }
        }
    }

    /// Trigger released.
    pub fn stop_fire(&mut self, player_id: u32) {
        let mut query = self.world.query::<(&PlayerId, &mut WeaponState)>();
        for (id, mut state) in query.iter_mut(&mut self.world) {
            if id.0 == player_id {
                state.firing_held = false;
                break;
            }
        }
    }

    /// Request a reload. Ignored while already reloading or with a full
    /// magazine; otherwise the magazine refills after the configured reload
    /// time.
    pub fn request_reload(&mut self, player_id: u32) {
        let now = self.world.resource::<SimClock>().time;
        self.world.resource_scope(|world, mut timers: Mut<TimerQueue>| {
            world.resource_scope(|world, mut events: Mut<SimEvents>| {
                let mut query =
                    world.query::<(Entity, &PlayerId, &WeaponConfig, &mut WeaponState)>();
                for (entity, id, config, mut state) in query.iter_mut(world) {
                    if id.0 == player_id {
                        try_start_reload(
                            *id,
                            entity,
                            config,
                            &mut state,
                            now,
                            &mut timers,
                            &mut events,
                        );
                        break;
                    }
                }
            });
        });
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Take all side-effect events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<SimEvents>().drain()
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        let clock = *self.world.resource::<SimClock>();
        Snapshot::from_world(&mut self.world, clock.tick, clock.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.world.resource::<SimClock>().time
    }

    /// Rounds left in a player's magazine.
    pub fn ammo(&mut self, player_id: u32) -> Option<u32> {
        let mut query = self.world.query::<(&PlayerId, &WeaponState)>();
        query
            .iter(&self.world)
            .find(|(id, _)| id.0 == player_id)
            .map(|(_, state)| state.ammo)
    }

    /// Whether a player's weapon is mid-reload.
    pub fn is_reloading(&mut self, player_id: u32) -> Option<bool> {
        let mut query = self.world.query::<(&PlayerId, &WeaponState)>();
        query
            .iter(&self.world)
            .find(|(id, _)| id.0 == player_id)
            .map(|(_, state)| state.reloading)
    }

    /// A target's current health.
    pub fn target_health(&mut self, target_id: u32) -> Option<f32> {
        let mut query = self.world.query::<(&TargetId, &Health)>();
        query
            .iter(&self.world)
            .find(|(id, _)| id.0 == target_id)
            .map(|(_, health)| health.current)
    }

    /// Direct access to the underlying ECS world for advanced hosts.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_configs(
    move_config: &MovementConfig,
    weapon_config: &WeaponConfig,
) -> Result<(), ConfigError> {
    if move_config.walk_speed <= 0.0 {
        return Err(ConfigError::BadMovementTuning("walk speed must be positive"));
    }
    if move_config.accel <= 0.0 {
        return Err(ConfigError::BadMovementTuning("accel must be positive"));
    }
    if move_config.gravity >= 0.0 {
        return Err(ConfigError::BadMovementTuning("gravity must be negative"));
    }
    if move_config.jump_height < 0.0 {
        return Err(ConfigError::BadMovementTuning(
            "jump height must not be negative",
        ));
    }
    if move_config.crouch_height <= 0.0 || move_config.crouch_height > move_config.stand_height {
        return Err(ConfigError::BadMovementTuning(
            "crouch height must be positive and at most the stand height",
        ));
    }
    if weapon_config.magazine_size == 0 {
        return Err(ConfigError::EmptyMagazine);
    }
    if weapon_config.fire_rate <= 0.0 {
        return Err(ConfigError::NonPositiveFireRate);
    }
    Ok(())
}
