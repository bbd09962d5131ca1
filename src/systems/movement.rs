//! Movement controller system.
//!
//! Consumes directional/sprint/crouch intents and the injected ground
//! query; produces a world-space displacement per tick. Jump execution is
//! gated by two grace windows: coyote time (after leaving the ground) and
//! the jump buffer (before the ground is reached again).

use bevy_ecs::prelude::*;
use tracing::debug;

use crate::components::*;
use crate::interfaces::{ContactTest, GroundQuery};
use crate::scheduler::SimClock;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Crouch caps target speed to this fraction of walk speed, sprint or not.
pub const CROUCH_SPEED_FACTOR: f32 = 0.6;
/// Small downward velocity held while grounded, so the character stays
/// pressed into its ground contact instead of accumulating fall speed.
pub const GROUNDED_STICK_VELOCITY: f32 = -2.0;
/// Height differences below this snap without blending.
const HEIGHT_EPSILON: f32 = 0.01;

/// System that advances every player character's movement state by one tick.
///
/// ## Data Access
/// - Reads: DeltaTime, SimClock, GroundQuery, MoveIntent, Orientation, MovementConfig
/// - Writes: MovementState, Displacement, Position
pub fn movement_system(
    dt: Res<DeltaTime>,
    clock: Res<SimClock>,
    ground: Res<GroundQuery>,
    mut query: Query<(
        &PlayerId,
        &MoveIntent,
        &Orientation,
        &MovementConfig,
        &mut MovementState,
        &mut Displacement,
        &mut Position,
    )>,
) {
    let delta = dt.0;
    let now = clock.time;

    for (id, intent, orientation, config, mut state, mut displacement, mut position) in
        query.iter_mut()
    {
        // 1) Ground check: authoritative contact first, proximity probe when
        // the contact test cannot decide.
        let foot = position.0;
        let grounded = match ground.0.collider_contact(foot, config.ground_mask) {
            ContactTest::Grounded => true,
            ContactTest::Airborne => false,
            ContactTest::Ambiguous => ground.0.probe(
                foot + glam::Vec3::Y * config.probe_offset,
                config.probe_radius,
                config.ground_mask,
            ),
        };

        state.grounded = grounded;
        if grounded {
            state.last_grounded_time = now;
            state.jump_in_progress = false;
        }

        state.crouched = intent.crouch_requested;

        // 2) Jump buffering & coyote time. Stale requests expire silently;
        // repeated requests within one window collapsed into one timestamp.
        let within_coyote = now - state.last_grounded_time <= config.coyote_time;
        let buffered = now - state.last_jump_request_time <= config.jump_buffer_time;

        if buffered && within_coyote && !state.jump_in_progress {
            // Launch velocity reaching the configured apex: v = sqrt(2*g*h).
            state.vertical_velocity = (2.0 * config.gravity.abs() * config.jump_height).sqrt();
            state.jump_in_progress = true;
            state.last_jump_request_time = f32::NEG_INFINITY;
            debug!(player = id.0, tick = clock.tick, "jump executed");
        }

        // 3) Speed target (sprint/crouch), blended exponentially.
        let mut target_speed = config.walk_speed;
        if config.can_sprint && intent.sprint_held && !state.crouched {
            target_speed = config.run_speed;
        }
        if state.crouched {
            target_speed = target_speed.min(config.walk_speed * CROUCH_SPEED_FACTOR);
        }
        let blend = (config.accel * delta).clamp(0.0, 1.0);
        state.current_speed += (target_speed - state.current_speed) * blend;

        // 4) Compose velocity. Grounded and not rising: clamp to the stick
        // value before gravity accumulates.
        let move_dir = orientation.right() * intent.axes.x + orientation.forward() * intent.axes.y;
        let horizontal = move_dir * state.current_speed;

        if grounded && state.vertical_velocity < 0.0 {
            state.vertical_velocity = GROUNDED_STICK_VELOCITY;
        }
        state.vertical_velocity += config.gravity * delta;

        let step =
            glam::Vec3::new(horizontal.x, state.vertical_velocity, horizontal.z) * delta;
        displacement.0 = step;
        position.0 += step;

        // 5) Smooth crouch height, keeping the lower contact point fixed by
        // re-centering to half height.
        let desired_height = if state.crouched {
            config.crouch_height
        } else {
            config.stand_height
        };
        if (state.collider_height - desired_height).abs() > HEIGHT_EPSILON {
            let blend = (config.crouch_transition_speed * delta).clamp(0.0, 1.0);
            state.collider_height += (desired_height - state.collider_height) * blend;
            state.collider_center_y = state.collider_height * 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{FlatGround, GroundContact, LayerMask};
    use glam::{Vec2, Vec3};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Ground query scripted by the test: a shared flag decides contact.
    struct ScriptedGround(Arc<AtomicBool>);

    impl GroundContact for ScriptedGround {
        fn collider_contact(&self, _foot: Vec3, _mask: LayerMask) -> ContactTest {
            if self.0.load(Ordering::Relaxed) {
                ContactTest::Grounded
            } else {
                ContactTest::Airborne
            }
        }

        fn probe(&self, _origin: Vec3, _radius: f32, _mask: LayerMask) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn test_world(ground: Box<dyn GroundContact>) -> (World, Schedule, Entity) {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(SimClock::default());
        world.insert_resource(GroundQuery(ground));

        let config = MovementConfig::default();
        let entity = world
            .spawn((
                PlayerId(0),
                MoveIntent::default(),
                Orientation::default(),
                MovementState::new(&config),
                config,
                Displacement::default(),
                Position::default(),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        (world, schedule, entity)
    }

    fn run_tick(world: &mut World, schedule: &mut Schedule, dt: f32) {
        world.resource_mut::<DeltaTime>().0 = dt;
        world.resource_mut::<SimClock>().advance(dt);
        schedule.run(world);
    }

    #[test]
    fn test_coyote_and_buffer_windows_allow_airborne_jump() {
        let flag = Arc::new(AtomicBool::new(true));
        let (mut world, mut schedule, entity) =
            test_world(Box::new(ScriptedGround(flag.clone())));
        let dt = 0.02;

        // Grounded through t=0.04, airborne afterwards.
        run_tick(&mut world, &mut schedule, dt); // t=0.02
        run_tick(&mut world, &mut schedule, dt); // t=0.04
        flag.store(false, Ordering::Relaxed);
        run_tick(&mut world, &mut schedule, dt); // t=0.06
        run_tick(&mut world, &mut schedule, dt); // t=0.08
        assert!(!world.get::<MovementState>(entity).unwrap().grounded);

        // Jump requested at t=0.08, well inside both 0.12s windows
        // (buffer age 0.02s, coyote age 0.06s at the next tick).
        let now = world.resource::<SimClock>().time;
        world
            .get_mut::<MovementState>(entity)
            .unwrap()
            .last_jump_request_time = now;

        run_tick(&mut world, &mut schedule, dt); // t=0.10
        let state = world.get::<MovementState>(entity).unwrap();
        assert!(state.jump_in_progress, "jump should execute while airborne");
        let config = MovementConfig::default();
        let launch = (2.0 * config.gravity.abs() * config.jump_height).sqrt();
        // One tick of gravity has already been applied after launch.
        assert!(
            (state.vertical_velocity - (launch + config.gravity * dt)).abs() < 0.001,
            "launch velocity should be sqrt(2*g*h)"
        );
    }

    #[test]
    fn test_stale_jump_request_expires() {
        let flag = Arc::new(AtomicBool::new(false));
        let (mut world, mut schedule, entity) =
            test_world(Box::new(ScriptedGround(flag.clone())));

        // Request while airborne; last ground contact is long past.
        world
            .get_mut::<MovementState>(entity)
            .unwrap()
            .last_jump_request_time = 0.0;

        // Let the buffer window (0.12s) lapse before ever landing.
        for _ in 0..10 {
            run_tick(&mut world, &mut schedule, 0.05);
        }
        flag.store(true, Ordering::Relaxed);
        run_tick(&mut world, &mut schedule, 0.05);

        let state = world.get::<MovementState>(entity).unwrap();
        assert!(
            !state.jump_in_progress,
            "expired request must never be honored"
        );
    }

    #[test]
    fn test_repeated_requests_collapse_to_one_jump() {
        let (mut world, mut schedule, entity) =
            test_world(Box::new(FlatGround { surface_y: 0.0 }));
        let dt = 0.02;

        run_tick(&mut world, &mut schedule, dt);
        // Two requests inside the same buffer window.
        let now = world.resource::<SimClock>().time;
        world
            .get_mut::<MovementState>(entity)
            .unwrap()
            .last_jump_request_time = now;
        run_tick(&mut world, &mut schedule, dt);
        assert!(world.get::<MovementState>(entity).unwrap().jump_in_progress);

        // The buffered timestamp was consumed; no second jump is pending.
        let state = world.get::<MovementState>(entity).unwrap();
        assert_eq!(state.last_jump_request_time, f32::NEG_INFINITY);
    }

    #[test]
    fn test_crouch_caps_speed_regardless_of_sprint() {
        let (mut world, mut schedule, entity) =
            test_world(Box::new(FlatGround { surface_y: 0.0 }));

        {
            let mut intent = world.get_mut::<MoveIntent>(entity).unwrap();
            intent.axes = Vec2::new(0.0, 1.0);
            intent.sprint_held = true;
            intent.crouch_requested = true;
        }

        // Let the speed blend converge.
        for _ in 0..200 {
            run_tick(&mut world, &mut schedule, 0.02);
        }

        let state = world.get::<MovementState>(entity).unwrap();
        // walk_speed=3 -> crouched target <= 1.8 even with sprint held.
        assert!(
            state.current_speed <= 3.0 * CROUCH_SPEED_FACTOR + 0.01,
            "crouched speed {} exceeds cap",
            state.current_speed
        );
    }

    #[test]
    fn test_grounded_vertical_velocity_sticks() {
        let (mut world, mut schedule, entity) =
            test_world(Box::new(FlatGround { surface_y: 0.0 }));
        let dt = 0.02;

        for _ in 0..20 {
            run_tick(&mut world, &mut schedule, dt);
        }

        let state = world.get::<MovementState>(entity).unwrap();
        let config = MovementConfig::default();
        let expected = GROUNDED_STICK_VELOCITY + config.gravity * dt;
        assert!(state.grounded);
        assert!(
            (state.vertical_velocity - expected).abs() < 0.001,
            "vertical velocity must not accumulate while grounded"
        );
    }

    #[test]
    fn test_crouch_blend_keeps_bottom_fixed() {
        let (mut world, mut schedule, entity) =
            test_world(Box::new(FlatGround { surface_y: 0.0 }));

        world
            .get_mut::<MoveIntent>(entity)
            .unwrap()
            .crouch_requested = true;

        let config = MovementConfig::default();
        let mut last_height = config.stand_height;
        for _ in 0..100 {
            run_tick(&mut world, &mut schedule, 0.02);
            let state = world.get::<MovementState>(entity).unwrap();
            assert!(state.collider_height <= last_height + 0.0001);
            // Center at half height keeps the lower contact point in place.
            assert!((state.collider_center_y - state.collider_height * 0.5).abs() < 0.0001);
            last_height = state.collider_height;
        }
        assert!((last_height - config.crouch_height).abs() < HEIGHT_EPSILON * 2.0);
    }

    #[test]
    fn test_displacement_follows_intent_direction() {
        let (mut world, mut schedule, entity) =
            test_world(Box::new(FlatGround { surface_y: 0.0 }));

        world.get_mut::<MoveIntent>(entity).unwrap().axes = Vec2::new(0.0, 1.0);
        for _ in 0..10 {
            run_tick(&mut world, &mut schedule, 0.05);
        }

        let displacement = world.get::<Displacement>(entity).unwrap().0;
        // Yaw 0 faces +Z.
        assert!(displacement.z > 0.0);
        assert!(displacement.x.abs() < 0.0001);
        let position = world.get::<Position>(entity).unwrap().0;
        assert!(position.z > 0.0);
    }
}
