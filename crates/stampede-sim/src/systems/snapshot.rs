//! Snapshot system: builds a `PopulationSnapshot` from the ECS world.
//!
//! Read-only; never modifies the world.

use hecs::World;

use stampede_core::components::*;
use stampede_core::events::CueEvent;
use stampede_core::state::{AgentSnapshot, PopulationSnapshot};
use stampede_core::types::SimTime;

/// Build a snapshot of every agent, sorted by id.
pub fn build_snapshot(world: &World, time: &SimTime, cues: Vec<CueEvent>) -> PopulationSnapshot {
    let mut agents: Vec<AgentSnapshot> = world
        .query::<(
            &Identity,
            &Kinematics,
            &SteeringIntent,
            &EscapeState,
            &PanicState,
            &AlarmState,
        )>()
        .iter()
        .map(
            |(_, (identity, kinematics, intent, escape, panic, alarm))| AgentSnapshot {
                id: identity.id,
                species: identity.species,
                position: kinematics.position,
                velocity: kinematics.velocity,
                intent: intent.0,
                strategy: escape.strategy,
                frozen: escape.is_frozen(),
                panicking: panic.is_panicking,
                fleeing: panic.is_fleeing,
                panic_intensity: panic.intensity,
                habituation: escape.habituation_level,
                last_threat: escape.last_threat,
                alarms_raised: alarm.total_alarms,
                herd_alerted: alarm.herd_alerted,
            },
        )
        .collect();

    agents.sort_by_key(|a| a.id);
    PopulationSnapshot {
        time: *time,
        agents,
        cues,
    }
}
