//! Outbound side-effect queue.
//!
//! Everything the core produces for external collaborators (look/aim recoil,
//! animation/UI state booleans, ammo counts, audio cues, health outcomes,
//! physics impulses) accumulates here during a tick and is drained by the
//! host afterwards. Fire-and-forget: no acknowledgment, no retry.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::Serialize;

/// One observable side effect of a simulation tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// Magazine count changed (after every successful shot and after reload
    /// completion).
    AmmoChanged { player: u32, ammo: u32, magazine: u32 },
    /// Visible firing flag for animation-style consumers.
    FiringChanged { player: u32, firing: bool },
    /// Reloading flag for animation-style consumers.
    ReloadingChanged { player: u32, reloading: bool },
    /// A fire attempt with zero ammo; distinct cue, no projectile.
    DryFire { player: u32 },
    /// Additive angular impulse for the external look/aim system, in
    /// degrees. Decay is the collaborator's concern.
    Recoil {
        player: u32,
        lateral: f32,
        vertical: f32,
    },
    /// Damage was applied to a target's health.
    DamageApplied {
        target: u32,
        amount: f32,
        remaining: f32,
    },
    /// A target's health reached zero. Delivered exactly once per target.
    Died { target: u32 },
    /// Physical impulse for a struck dynamic body, applied opposite the hit
    /// normal at the hit point. The target id is present only when the host
    /// tracks one for the struck body; the hit point locates it either way.
    Impulse {
        target: Option<u32>,
        impulse: Vec3,
        point: Vec3,
    },
}

/// Resource accumulating events during a tick.
#[derive(Resource, Debug, Default)]
pub struct SimEvents(pub Vec<SimEvent>);

impl SimEvents {
    pub fn push(&mut self, event: SimEvent) {
        self.0.push(event);
    }

    /// Take all accumulated events, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
