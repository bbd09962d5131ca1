//! Weapon firing system - trigger handling, ballistics and hit resolution.
//!
//! A shot attempt is gated by the inter-shot interval `1 / fire_rate`,
//! independent of the coarse Idle/Firing/Reloading state. Spread applies a
//! rectangular angular perturbation: independent uniform pitch and yaw
//! offsets, each bounded by the effective spread angle. This is not a
//! uniform-on-cone distribution and is kept that way on purpose - hosts
//! tuned their weapons against it.

use bevy_ecs::prelude::*;
use glam::{EulerRot, Quat, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, error};

use crate::components::*;
use crate::events::{SimEvent, SimEvents};
use crate::interfaces::RayQuery;
use crate::pool::Placement;
use crate::scheduler::{Deferred, SimClock, TimerQueue};

/// Horizontal speed above which the moving-spread multiplier applies.
pub const MOVING_SPEED_THRESHOLD: f32 = 0.1;
/// Impact marks are nudged off the surface along the normal.
const IMPACT_NORMAL_OFFSET: f32 = 0.01;

/// Seedable RNG driving spread and lateral recoil sampling.
#[derive(Resource)]
pub struct WeaponRng(pub StdRng);

/// System that evaluates fire intent for every weapon, once per tick.
///
/// ## Data Access
/// - Reads: SimClock, RayQuery, MovementState (set by `movement_system`
///   earlier in the same tick), WeaponConfig, AimTransform
/// - Writes: WeaponState, EffectPools, TimerQueue, SimEvents, WeaponRng,
///   Health (on struck targets)
pub fn weapon_system(
    clock: Res<SimClock>,
    rays: Res<RayQuery>,
    mut rng: ResMut<WeaponRng>,
    mut timers: ResMut<TimerQueue>,
    mut events: ResMut<SimEvents>,
    mut shooters: Query<(
        Entity,
        &PlayerId,
        &WeaponConfig,
        &AimTransform,
        &MovementState,
        &mut WeaponState,
        &mut EffectPools,
    )>,
    targets: Query<(Entity, &TargetId, Option<&Damageable>, Option<&DamageRelay>)>,
    mut healths: Query<&mut Health>,
) {
    let now = clock.time;

    for (entity, id, config, aim, movement, mut state, mut pools) in shooters.iter_mut() {
        // Automatic weapons keep attempting while the trigger is held;
        // semi-auto fires on the buffered press edge only.
        let attempt = state.trigger_edge
            || (config.automatic && state.firing_held && !state.reloading);
        state.trigger_edge = false;
        if !attempt {
            continue;
        }

        // Firing intents during a reload are ignored, not queued.
        if state.reloading {
            continue;
        }
        if now - state.last_fire_time < 1.0 / config.fire_rate {
            continue;
        }

        if state.ammo == 0 {
            // Dry fire: distinct cue, timer still resets, no ammo change.
            state.last_fire_time = now;
            events.push(SimEvent::DryFire { player: id.0 });
            continue;
        }

        // --- successful shot ---
        state.last_fire_time = now;
        state.ammo -= 1;

        if !state.firing_visible {
            state.firing_visible = true;
            events.push(SimEvent::FiringChanged {
                player: id.0,
                firing: true,
            });
        }

        // Muzzle flash from the weapon's own pool, returned after a fixed
        // display duration.
        match pools
            .muzzle
            .get(Placement::new(aim.muzzle, aim.forward))
        {
            Ok(handle) => timers.schedule_after(
                now,
                config.muzzle_flash_secs,
                Deferred::ReturnMuzzle {
                    shooter: entity,
                    handle,
                },
            ),
            Err(err) => error!(player = id.0, %err, "muzzle effect pool misconfigured"),
        }

        // Recoil: fixed vertical kick, uniformly sampled lateral component.
        let (side_min, side_max) = config.recoil_side_range;
        let lateral = rng.0.gen_range(side_min..=side_max);
        events.push(SimEvent::Recoil {
            player: id.0,
            lateral,
            vertical: config.recoil_per_shot,
        });

        // Effective spread: crouch takes precedence over the moving
        // multiplier; the ADS multiplier applies only while aiming.
        let mut spread = config.base_spread;
        spread *= if movement.crouched {
            config.crouch_spread_mult
        } else if movement.current_speed > MOVING_SPEED_THRESHOLD {
            config.moving_spread_mult
        } else {
            1.0
        };
        if state.aiming {
            spread *= config.ads_spread_mult;
        }

        let dir = perturb_direction(&mut rng.0, aim.forward, spread);
        if let Some(hit) = rays.0.cast(aim.origin, dir, config.range, config.hit_mask) {
            match pools.impact.get(Placement::new(
                hit.point + hit.normal * IMPACT_NORMAL_OFFSET,
                hit.normal,
            )) {
                Ok(handle) => timers.schedule_after(
                    now,
                    config.impact_mark_secs,
                    Deferred::ReturnImpact {
                        shooter: entity,
                        handle,
                    },
                ),
                Err(err) => error!(player = id.0, %err, "impact effect pool misconfigured"),
            }

            // Dynamic bodies get the impulse whether or not the host tracks
            // an id for them; damage needs an id to resolve against.
            if hit.dynamic_body {
                events.push(SimEvent::Impulse {
                    target: hit.target,
                    impulse: -hit.normal * config.impact_impulse,
                    point: hit.point,
                });
            }

            if let Some(struck) = hit.target {
                if let Some((victim, victim_id)) = resolve_victim(&targets, &healths, struck) {
                    if let Ok(mut health) = healths.get_mut(victim) {
                        if health.is_alive() && config.damage > 0.0 {
                            health.damage(config.damage);
                            events.push(SimEvent::DamageApplied {
                                target: victim_id,
                                amount: config.damage,
                                remaining: health.current,
                            });
                            if !health.is_alive() {
                                debug!(target = victim_id, "target died");
                                events.push(SimEvent::Died { target: victim_id });
                            }
                        }
                    }
                }
            }
        }

        events.push(SimEvent::AmmoChanged {
            player: id.0,
            ammo: state.ammo,
            magazine: config.magazine_size,
        });
    }
}

/// Perturb `forward` by independent uniform pitch and yaw offsets, each in
/// `[-max_angle_deg, +max_angle_deg]`. Rectangular by design; see module doc.
pub fn perturb_direction(rng: &mut StdRng, forward: Vec3, max_angle_deg: f32) -> Vec3 {
    if max_angle_deg <= 0.0 {
        return forward;
    }
    let yaw = rng.gen_range(-max_angle_deg..=max_angle_deg).to_radians();
    let pitch = rng.gen_range(-max_angle_deg..=max_angle_deg).to_radians();
    (Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0) * forward).normalize()
}

/// Resolve which entity's health a hit on `struck` lands on: the struck
/// entity itself when it owns health, else the relay owner when the struck
/// collider is tagged damageable. Returns the health entity and its id.
fn resolve_victim(
    targets: &Query<(Entity, &TargetId, Option<&Damageable>, Option<&DamageRelay>)>,
    healths: &Query<&mut Health>,
    struck: u32,
) -> Option<(Entity, u32)> {
    let (entity, _, damageable, relay) = targets
        .iter()
        .find(|(_, target_id, _, _)| target_id.0 == struck)?;

    if healths.contains(entity) {
        return Some((entity, struck));
    }

    if damageable.is_some() {
        if let Some(relay) = relay {
            let owner = targets
                .iter()
                .find(|(_, target_id, _, _)| target_id.0 == relay.0)?;
            if healths.contains(owner.0) {
                return Some((owner.0, relay.0));
            }
        }
    }

    None
}

/// Start a timed reload if allowed: not already reloading and the magazine
/// is not full. Invalid intents are absorbed silently. Returns whether a
/// reload actually started.
pub fn try_start_reload(
    id: PlayerId,
    shooter: Entity,
    config: &WeaponConfig,
    state: &mut WeaponState,
    now: f32,
    timers: &mut TimerQueue,
    events: &mut SimEvents,
) -> bool {
    if state.reloading || state.ammo == config.magazine_size {
        return false;
    }
    state.reloading = true;
    events.push(SimEvent::ReloadingChanged {
        player: id.0,
        reloading: true,
    });
    timers.schedule_after(now, config.reload_time, Deferred::FinishReload { shooter });
    debug!(player = id.0, "reload started");
    true
}
