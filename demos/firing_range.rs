//! Firing-range demonstration of the first-person action core.
//!
//! Run with: cargo run --example firing_range

use fps_sim::components::{MovementConfig, WeaponConfig};
use fps_sim::interfaces::{FlatGround, LayerMask, RayHit, WorldRay};
use fps_sim::{SimConfig, SimWorld};
use glam::Vec3;

/// Ray adapter for a single static target slab at z = 10.
struct RangeBackstop;

impl WorldRay for RangeBackstop {
    fn cast(&self, origin: Vec3, dir: Vec3, max_dist: f32, _mask: LayerMask) -> Option<RayHit> {
        if dir.z <= 0.0 {
            return None;
        }
        let t = (10.0 - origin.z) / dir.z;
        if t < 0.0 || t > max_dist {
            return None;
        }
        Some(RayHit {
            point: origin + dir * t,
            normal: -Vec3::Z,
            target: Some(1),
            dynamic_body: false,
        })
    }
}

fn main() {
    println!("=== Firing Range Demo ===\n");

    let mut sim = SimWorld::with_config(
        SimConfig::default(),
        Box::new(FlatGround { surface_y: 0.0 }),
        Box::new(RangeBackstop),
    )
    .unwrap();
    sim.spawn_player(0, MovementConfig::default(), WeaponConfig::default())
        .unwrap();
    sim.spawn_target(1, Vec3::new(0.0, 1.0, 10.0), 200.0);
    sim.set_aim(
        0,
        Vec3::new(0.0, 1.6, 0.0),
        Vec3::Z,
        Vec3::new(0.2, 1.5, 0.5),
    );

    // Walk forward for a second, hop, then crouch and empty the magazine.
    sim.set_move_input(0, 0.0, 1.0);
    run_seconds(&mut sim, 1.0);
    sim.request_jump(0);
    run_seconds(&mut sim, 1.0);
    sim.set_move_input(0, 0.0, 0.0);
    sim.set_crouch(0, true);

    println!("Opening fire from a crouch...\n");
    for _ in 0..14 {
        sim.start_fire(0);
        run_seconds(&mut sim, 0.25);
        sim.stop_fire(0);

        for event in sim.drain_events() {
            println!("  event: {event:?}");
        }
    }

    println!("\nReloading...");
    sim.request_reload(0);
    run_seconds(&mut sim, 1.5);
    for event in sim.drain_events() {
        println!("  event: {event:?}");
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty().unwrap());
}

fn run_seconds(sim: &mut SimWorld, secs: f32) {
    let mut remaining = secs;
    while remaining > 0.0 {
        sim.step(1.0 / 60.0);
        remaining -= 1.0 / 60.0;
    }
}
