//! Deferred-continuation system.
//!
//! Runs last in the tick and drains every [`TimerQueue`] entry whose expiry
//! has elapsed: reload completions refill magazines, pooled effects go back
//! to their pools. Nothing here is ever resumed early.

use bevy_ecs::prelude::*;
use tracing::debug;

use crate::components::{EffectPools, PlayerId, WeaponConfig, WeaponState};
use crate::events::{SimEvent, SimEvents};
use crate::scheduler::{Deferred, SimClock, TimerQueue};

/// System resuming expired continuations, once per tick.
pub fn deferred_system(
    clock: Res<SimClock>,
    mut timers: ResMut<TimerQueue>,
    mut events: ResMut<SimEvents>,
    mut shooters: Query<(&PlayerId, &WeaponConfig, &mut WeaponState, &mut EffectPools)>,
) {
    let now = clock.time;

    while let Some(action) = timers.pop_due(now) {
        match action {
            Deferred::FinishReload { shooter } => {
                if let Ok((id, config, mut state, _)) = shooters.get_mut(shooter) {
                    // Atomic refill at expiry; no partial progress exists.
                    state.ammo = config.magazine_size;
                    state.reloading = false;
                    debug!(player = id.0, "reload finished");
                    events.push(SimEvent::AmmoChanged {
                        player: id.0,
                        ammo: state.ammo,
                        magazine: config.magazine_size,
                    });
                    events.push(SimEvent::ReloadingChanged {
                        player: id.0,
                        reloading: false,
                    });
                }
            }
            Deferred::ReturnMuzzle { shooter, handle } => {
                if let Ok((id, _, mut state, mut pools)) = shooters.get_mut(shooter) {
                    pools.muzzle.put_back(handle);
                    // The visible firing flag outlives the shot by the flash
                    // duration, unless the trigger is still held.
                    if state.firing_visible && !state.firing_held && !state.trigger_edge {
                        state.firing_visible = false;
                        events.push(SimEvent::FiringChanged {
                            player: id.0,
                            firing: false,
                        });
                    }
                }
            }
            Deferred::ReturnImpact { shooter, handle } => {
                if let Ok((_, _, _, mut pools)) = shooters.get_mut(shooter) {
                    pools.impact.put_back(handle);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Placement;
    use glam::Vec3;

    fn test_world() -> (World, Schedule, Entity) {
        let mut world = World::new();
        world.insert_resource(SimClock::default());
        world.insert_resource(TimerQueue::default());
        world.insert_resource(SimEvents::default());

        let config = WeaponConfig::default();
        let mut state = WeaponState::new(&config);
        state.ammo = 3;
        state.reloading = true;
        let entity = world
            .spawn((
                PlayerId(0),
                state,
                config,
                EffectPools::with_capacity(2).unwrap(),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(deferred_system);
        (world, schedule, entity)
    }

    fn run_tick(world: &mut World, schedule: &mut Schedule, dt: f32) {
        world.resource_mut::<SimClock>().advance(dt);
        schedule.run(world);
    }

    #[test]
    fn test_reload_completes_at_expiry_not_before() {
        let (mut world, mut schedule, entity) = test_world();
        world
            .resource_mut::<TimerQueue>()
            .schedule(0.3, Deferred::FinishReload { shooter: entity });

        run_tick(&mut world, &mut schedule, 0.1);
        run_tick(&mut world, &mut schedule, 0.1);
        let state = world.get::<WeaponState>(entity).unwrap();
        assert_eq!(state.ammo, 3);
        assert!(state.reloading);

        run_tick(&mut world, &mut schedule, 0.1);
        let state = world.get::<WeaponState>(entity).unwrap();
        assert_eq!(state.ammo, WeaponConfig::default().magazine_size);
        assert!(!state.reloading);

        let events = world.resource_mut::<SimEvents>().drain();
        assert!(events.contains(&SimEvent::ReloadingChanged {
            player: 0,
            reloading: false,
        }));
    }

    #[test]
    fn test_muzzle_return_lowers_firing_flag_unless_held() {
        let (mut world, mut schedule, entity) = test_world();

        let handle = {
            let mut pools = world.get_mut::<EffectPools>(entity).unwrap();
            pools
                .muzzle
                .get(Placement::new(Vec3::ZERO, Vec3::Z))
                .unwrap()
        };
        {
            let mut state = world.get_mut::<WeaponState>(entity).unwrap();
            state.firing_visible = true;
            state.firing_held = true;
        }
        world.resource_mut::<TimerQueue>().schedule(
            0.1,
            Deferred::ReturnMuzzle {
                shooter: entity,
                handle,
            },
        );

        // Trigger still held: the instance returns but the flag stays up.
        run_tick(&mut world, &mut schedule, 0.2);
        let pools = world.get::<EffectPools>(entity).unwrap();
        assert!(!pools.muzzle.is_active(handle));
        assert!(world.get::<WeaponState>(entity).unwrap().firing_visible);

        // Released trigger: the next return lowers the flag.
        let handle = {
            let mut pools = world.get_mut::<EffectPools>(entity).unwrap();
            pools
                .muzzle
                .get(Placement::new(Vec3::ZERO, Vec3::Z))
                .unwrap()
        };
        world.get_mut::<WeaponState>(entity).unwrap().firing_held = false;
        world.resource_mut::<TimerQueue>().schedule(
            0.3,
            Deferred::ReturnMuzzle {
                shooter: entity,
                handle,
            },
        );
        run_tick(&mut world, &mut schedule, 0.2);

        let state = world.get::<WeaponState>(entity).unwrap();
        assert!(!state.firing_visible);
        let events = world.resource_mut::<SimEvents>().drain();
        assert!(events.contains(&SimEvent::FiringChanged {
            player: 0,
            firing: false,
        }));
    }

    #[test]
    fn test_late_return_of_reused_handle_is_tolerated() {
        let (mut world, mut schedule, entity) = test_world();

        let handle = {
            let mut pools = world.get_mut::<EffectPools>(entity).unwrap();
            pools
                .impact
                .get(Placement::new(Vec3::ZERO, Vec3::Y))
                .unwrap()
        };
        // Two returns race for the same handle; the second is a no-op.
        for due in [0.1, 0.2] {
            world.resource_mut::<TimerQueue>().schedule(
                due,
                Deferred::ReturnImpact {
                    shooter: entity,
                    handle,
                },
            );
        }

        run_tick(&mut world, &mut schedule, 0.5);
        let pools = world.get::<EffectPools>(entity).unwrap();
        assert!(!pools.impact.is_active(handle));
        assert_eq!(pools.impact.inactive_count(), 2);
    }
}
