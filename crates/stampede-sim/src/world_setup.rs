//! Agent spawn factories.
//!
//! Every agent carries the same component bundle; species behaviour comes
//! from its profile, resolved by name once at spawn.

use glam::DVec3;
use hecs::{Entity, World};

use stampede_core::components::*;
use stampede_core::store::ProfileStore;
use stampede_core::types::AgentId;

use crate::error::SimError;

/// Description of an agent to spawn.
#[derive(Debug, Clone)]
pub struct AgentSpawn {
    /// Registered species name.
    pub species: String,
    pub position: DVec3,
    pub facing: DVec3,
    pub vitals: Vitals,
    pub disposition: Disposition,
    /// Falls back to the engine's default locomotion.
    pub locomotion: Option<Locomotion>,
}

impl AgentSpawn {
    pub fn new(species: impl Into<String>, position: DVec3) -> Self {
        Self {
            species: species.into(),
            position,
            facing: DVec3::NEG_Z,
            vitals: Vitals::default(),
            disposition: Disposition::default(),
            locomotion: None,
        }
    }

    pub fn facing(mut self, facing: DVec3) -> Self {
        self.facing = facing;
        self
    }

    pub fn juvenile(mut self) -> Self {
        self.vitals.juvenile = true;
        self
    }

    pub fn aggressive(mut self) -> Self {
        self.disposition.aggressive = true;
        self
    }

    pub fn stealthy(mut self) -> Self {
        self.disposition.stealthy = true;
        self
    }

    pub fn locomotion(mut self, locomotion: Locomotion) -> Self {
        self.locomotion = Some(locomotion);
        self
    }
}

/// Spawn one agent with the full threat-response bundle.
pub fn spawn_agent(
    world: &mut World,
    profiles: &ProfileStore,
    id: AgentId,
    spawn: &AgentSpawn,
    default_locomotion: Locomotion,
) -> Result<Entity, SimError> {
    let species = profiles.id_of(&spawn.species)?;
    let entry = profiles
        .entry(species)
        .ok_or(SimError::MissingProfile(species))?;

    let entity = world.spawn((
        Identity {
            id,
            species,
            guild: entry.guild,
        },
        Kinematics {
            position: spawn.position,
            velocity: DVec3::ZERO,
            facing: spawn.facing,
        },
        spawn.vitals,
        spawn.disposition,
        spawn.locomotion.unwrap_or(default_locomotion),
        SteeringIntent::default(),
        EscapeState::default(),
        PanicState::default(),
        AlarmState::default(),
    ));
    Ok(entity)
}
