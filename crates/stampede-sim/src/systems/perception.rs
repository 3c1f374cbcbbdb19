//! Perception: freeze the population into read-only agent views.
//!
//! Views are taken once at the start of the step, before any agent is
//! evaluated, so every agent reads the same neighbour state regardless of
//! processing order.

use hecs::{Entity, World};

use stampede_core::components::{Disposition, Identity, Kinematics, PanicState, Vitals};
use stampede_core::types::AgentView;

fn make_view(
    identity: &Identity,
    kinematics: &Kinematics,
    vitals: &Vitals,
    disposition: &Disposition,
    panic: &PanicState,
) -> AgentView {
    AgentView {
        id: identity.id,
        species: identity.species,
        guild: identity.guild,
        position: kinematics.position,
        velocity: kinematics.velocity,
        facing: kinematics.facing,
        health: vitals.health,
        max_health: vitals.max_health,
        juvenile: vitals.juvenile,
        last_damaged_tick: vitals.last_damaged_tick,
        aggressive: disposition.aggressive,
        stealthy: disposition.stealthy,
        alive: vitals.health > 0.0,
        panicking: panic.is_panicking,
        fleeing: panic.is_fleeing,
    }
}

/// Views of every agent, sorted by id.
pub fn collect(world: &World) -> Vec<(Entity, AgentView)> {
    let mut views: Vec<(Entity, AgentView)> = world
        .query::<(&Identity, &Kinematics, &Vitals, &Disposition, &PanicState)>()
        .iter()
        .map(|(entity, (identity, kinematics, vitals, disposition, panic))| {
            (entity, make_view(identity, kinematics, vitals, disposition, panic))
        })
        .collect();
    views.sort_by_key(|(_, view)| view.id);
    views
}

/// Current view of a single agent.
pub fn view_of(world: &World, entity: Entity) -> Option<AgentView> {
    let mut query = world
        .query_one::<(&Identity, &Kinematics, &Vitals, &Disposition, &PanicState)>(entity)
        .ok()?;
    query
        .get()
        .map(|(identity, kinematics, vitals, disposition, panic)| {
            make_view(identity, kinematics, vitals, disposition, panic)
        })
}
