//! Snapshot types for the simulation state.
//!
//! The `Snapshot` struct provides a serializable view of the simulation state
//! that a host engine can consume for rendering, HUD and debugging.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::pool::PoolHandle;

/// Snapshot of a single player character's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub speed: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    pub crouched: bool,
    pub collider_height: f32,
    pub ammo: u32,
    pub magazine: u32,
    pub reloading: bool,
    pub firing: bool,
    pub aiming: bool,
    pub health: f32,
    pub health_max: f32,
}

/// Snapshot of a shootable target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub health: f32,
    pub health_max: f32,
    pub alive: bool,
}

/// Snapshot of one active pooled effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub player: u32,
    /// Effect kind: `"muzzle"` or `"impact"`.
    pub kind: String,
    pub handle: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// All player character states.
    pub players: Vec<PlayerSnapshot>,
    /// All shootable targets with health.
    pub targets: Vec<TargetSnapshot>,
    /// Currently borrowed effect instances.
    pub effects: Vec<EffectSnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut players = Vec::new();

        let mut player_query = world.query::<(
            &PlayerId,
            &Position,
            &Orientation,
            &MovementState,
            &WeaponConfig,
            &WeaponState,
            &Health,
        )>();
        for (id, pos, orient, movement, weapon_config, weapon, health) in player_query.iter(world)
        {
            players.push(PlayerSnapshot {
                id: id.0,
                x: pos.0.x,
                y: pos.0.y,
                z: pos.0.z,
                yaw: orient.yaw,
                speed: movement.current_speed,
                vertical_velocity: movement.vertical_velocity,
                grounded: movement.grounded,
                crouched: movement.crouched,
                collider_height: movement.collider_height,
                ammo: weapon.ammo,
                magazine: weapon_config.magazine_size,
                reloading: weapon.reloading,
                firing: weapon.firing_visible,
                aiming: weapon.aiming,
                health: health.current,
                health_max: health.max,
            });
        }

        let mut targets = Vec::new();
        let mut target_query = world.query::<(&TargetId, &Position, &Health)>();
        for (id, pos, health) in target_query.iter(world) {
            targets.push(TargetSnapshot {
                id: id.0,
                x: pos.0.x,
                y: pos.0.y,
                z: pos.0.z,
                health: health.current,
                health_max: health.max,
                alive: health.is_alive(),
            });
        }

        let mut effects = Vec::new();
        let mut pool_query = world.query::<(&PlayerId, &EffectPools)>();
        for (id, pools) in pool_query.iter(world) {
            let push = |out: &mut Vec<EffectSnapshot>,
                        kind: &str,
                        handle: PoolHandle,
                        placement: crate::pool::Placement| {
                out.push(EffectSnapshot {
                    player: id.0,
                    kind: kind.to_string(),
                    handle: handle.index() as u32,
                    x: placement.position.x,
                    y: placement.position.y,
                    z: placement.position.z,
                });
            };
            for (handle, placement, _) in pools.muzzle.iter_active() {
                push(&mut effects, "muzzle", handle, placement);
            }
            for (handle, placement, _) in pools.impact.iter_active() {
                push(&mut effects, "impact", handle, placement);
            }
        }

        Self {
            tick,
            time,
            players,
            targets,
            effects,
        }
    }

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to a human-readable JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_snapshot_from_world_and_json() {
        let mut world = World::new();
        world.spawn(PlayerBundle::new(
            0,
            MovementConfig::default(),
            WeaponConfig::default(),
        ));
        world.spawn(TargetBundle::new(10, Vec3::new(0.0, 1.0, 8.0), 80.0));

        let snapshot = Snapshot::from_world(&mut world, 42, 0.7);
        assert_eq!(snapshot.tick, 42);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].ammo, 12);
        assert_eq!(snapshot.targets.len(), 1);
        assert!(snapshot.targets[0].alive);
        assert!(snapshot.effects.is_empty());

        let json = snapshot.to_json().unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tick, snapshot.tick);
        assert_eq!(back.players[0].magazine, 12);
    }

    #[test]
    fn test_snapshot_lists_active_effects() {
        let mut world = World::new();
        let mut pools = EffectPools::with_capacity(2).unwrap();
        pools
            .muzzle
            .get(crate::pool::Placement::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z))
            .unwrap();
        world.spawn((PlayerId(3), pools));

        // Effect enumeration does not require the full player bundle.
        let snapshot = Snapshot::from_world(&mut world, 0, 0.0);
        assert_eq!(snapshot.effects.len(), 1);
        assert_eq!(snapshot.effects[0].kind, "muzzle");
        assert_eq!(snapshot.effects[0].player, 3);
        assert_eq!(snapshot.effects[0].y, 2.0);
    }
}
