//! Locomotion: turn steering intents into movement.
//!
//! Velocity steers toward the intent, limited by the agent's max force and
//! max speed. A stampede raises the speed ceiling by the species'
//! multiplier. Agents are ground-bound: the vertical part of an intent is
//! ignored here.

use glam::DVec3;
use hecs::World;

use stampede_core::components::{
    EscapeState, Identity, Kinematics, Locomotion, PanicState, SteeringIntent, Vitals,
};
use stampede_core::store::ProfileStore;

/// Speeds below this leave the facing unchanged.
const FACING_MIN_SPEED: f64 = 1e-3;

/// Integrate movement for every agent.
pub fn run(world: &mut World, profiles: &ProfileStore) {
    for (_entity, (identity, kinematics, locomotion, intent, vitals, panic, escape)) in world
        .query_mut::<(
            &Identity,
            &mut Kinematics,
            &Locomotion,
            &SteeringIntent,
            &Vitals,
            &PanicState,
            &EscapeState,
        )>()
    {
        if vitals.health <= 0.0 || escape.is_frozen() {
            kinematics.velocity = DVec3::ZERO;
            continue;
        }

        let multiplier = if panic.is_panicking {
            profiles
                .profile(identity.species)
                .map_or(1.0, |p| p.stampede_speed_multiplier)
        } else {
            1.0
        };
        let cap = (locomotion.max_speed * multiplier).max(0.0);

        let desired = DVec3::new(intent.0.x, 0.0, intent.0.z).clamp_length_max(cap);
        let steer = (desired - kinematics.velocity).clamp_length_max(locomotion.max_force.max(0.0));
        kinematics.velocity = (kinematics.velocity + steer).clamp_length_max(cap);
        kinematics.position += kinematics.velocity;

        if kinematics.velocity.length() > FACING_MIN_SPEED {
            kinematics.facing = kinematics.velocity.normalize();
        }
    }
}
