//! Simulation engine.
//!
//! `SimulationEngine` owns the hecs ECS world, applies harness commands,
//! runs the systems, and produces `PopulationSnapshot`s. Headless and
//! deterministic for a given seed.

use std::collections::{HashMap, VecDeque};

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stampede_core::commands::HarnessCommand;
use stampede_core::components::*;
use stampede_core::enums::EscapeStrategy;
use stampede_core::events::{CueEvent, Signal};
use stampede_core::query::{OpenWorld, WorldQuery};
use stampede_core::state::PopulationSnapshot;
use stampede_core::store::ProfileStore;
use stampede_core::types::{AgentId, BehaviorWeights, SimTime};
use stampede_response::context::Environment;
use stampede_response::respond::{self, AgentStates};
use stampede_response::{alarm, escape, panic};

use crate::error::SimError;
use crate::spatial::SpatialIndex;
use crate::systems;
use crate::systems::response::StepContext;
use crate::world_setup::{self, AgentSpawn};

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Spatial index cell size (world units).
    pub cell_size: f64,
    pub weights: BehaviorWeights,
    /// Locomotion for agents spawned without their own.
    pub locomotion: Locomotion,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cell_size: 16.0,
            weights: BehaviorWeights::default(),
            locomotion: Locomotion::default(),
        }
    }
}

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    world: World,
    time: SimTime,
    rng: ChaCha8Rng,
    profiles: ProfileStore,
    index: SpatialIndex,
    terrain: Box<dyn WorldQuery + Send + Sync>,
    weights: BehaviorWeights,
    default_locomotion: Locomotion,
    next_agent_id: u64,
    command_queue: VecDeque<HarnessCommand>,
    signal_buffer: Vec<Signal>,
    cues: Vec<CueEvent>,
}

impl SimulationEngine {
    /// Create an engine over open terrain.
    pub fn new(config: SimConfig, profiles: ProfileStore) -> Result<Self, SimError> {
        Ok(Self {
            world: World::new(),
            time: SimTime::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            profiles,
            index: SpatialIndex::new(config.cell_size)?,
            terrain: Box::new(OpenWorld),
            weights: config.weights,
            default_locomotion: config.locomotion,
            next_agent_id: 0,
            command_queue: VecDeque::new(),
            signal_buffer: Vec::new(),
            cues: Vec::new(),
        })
    }

    /// Replace the terrain collaborator.
    pub fn set_terrain(&mut self, terrain: impl WorldQuery + Send + Sync + 'static) {
        self.terrain = Box::new(terrain);
    }

    /// Spawn an agent of a registered species.
    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> Result<AgentId, SimError> {
        let id = AgentId(self.next_agent_id);
        world_setup::spawn_agent(
            &mut self.world,
            &self.profiles,
            id,
            &spawn,
            self.default_locomotion,
        )?;
        self.next_agent_id += 1;
        debug!(agent = ?id, species = %spawn.species, "Agent spawned");
        Ok(id)
    }

    /// Queue a harness command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: HarnessCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = HarnessCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> PopulationSnapshot {
        self.process_commands();
        self.run_systems();
        self.time.advance();

        let cues = std::mem::take(&mut self.cues);
        systems::snapshot::build_snapshot(&self.world, &self.time, cues)
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Mutable world access for test setup.
    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Entity holding the given agent.
    pub fn entity_of(&self, agent: AgentId) -> Option<Entity> {
        self.world
            .query::<&Identity>()
            .iter()
            .find(|(_, identity)| identity.id == agent)
            .map(|(entity, _)| entity)
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Handle a single harness command.
    fn handle_command(&mut self, command: HarnessCommand) {
        let tick = self.time.tick;
        match command {
            HarnessCommand::ResetAll => {
                for (_entity, (escape, panic, alarm, intent)) in self.world.query_mut::<(
                    &mut EscapeState,
                    &mut PanicState,
                    &mut AlarmState,
                    &mut SteeringIntent,
                )>() {
                    respond::reset(AgentStates {
                        escape,
                        panic,
                        alarm,
                    });
                    intent.0 = Default::default();
                }
                debug!(tick, "All agents reset");
            }
            HarnessCommand::ResetAgent { agent } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                if let Ok((escape, panic, alarm, intent)) = self.world.query_one_mut::<(
                    &mut EscapeState,
                    &mut PanicState,
                    &mut AlarmState,
                    &mut SteeringIntent,
                )>(entity)
                {
                    respond::reset(AgentStates {
                        escape,
                        panic,
                        alarm,
                    });
                    intent.0 = Default::default();
                }
            }
            HarnessCommand::Damage { agent, amount } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                if let Ok((vitals, escape, panic)) = self
                    .world
                    .query_one_mut::<(&mut Vitals, &mut EscapeState, &PanicState)>(entity)
                {
                    vitals.health = (vitals.health - amount.max(0.0)).max(0.0);
                    vitals.last_damaged_tick = Some(tick);
                    respond::on_damage(escape, panic);
                    debug!(tick, ?agent, health = vitals.health, "Agent damaged");
                }
            }
            HarnessCommand::NonLethalEncounter { agent } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                if let Ok((identity, escape)) = self
                    .world
                    .query_one_mut::<(&Identity, &mut EscapeState)>(entity)
                {
                    if let Some(profile) = self.profiles.profile(identity.species) {
                        respond::on_non_lethal_encounter(&profile, escape);
                    }
                }
            }
            HarnessCommand::ForcePanic { agent, away_from } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                let Some(view) = systems::perception::view_of(&self.world, entity) else {
                    return;
                };
                let Some(profile) = self.profiles.profile(view.species) else {
                    return;
                };
                if let Ok((escape_state, panic_state)) = self
                    .world
                    .query_one_mut::<(&mut EscapeState, &mut PanicState)>(entity)
                {
                    if escape_state.strategy == EscapeStrategy::Freeze {
                        escape::break_freeze(&profile, escape_state);
                    }
                    panic::force_panic(&view, panic_state, away_from, tick, &mut self.rng);
                    self.cues.push(CueEvent::StampedeStarted {
                        agent,
                        intensity: panic_state.intensity,
                    });
                }
            }
            HarnessCommand::ForceEndPanic { agent } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                if let Ok(mut panic_state) = self.world.get::<&mut PanicState>(entity) {
                    if panic_state.is_panicking {
                        panic::force_end_panic(&mut panic_state);
                        self.cues.push(CueEvent::PanicEnded { agent });
                    }
                }
            }
            HarnessCommand::ForceAlarm { agent, threat } => {
                self.force_alarm(agent, threat);
            }
            HarnessCommand::SetFacing { agent, facing } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                if let Ok(mut kinematics) = self.world.get::<&mut Kinematics>(entity) {
                    kinematics.facing = facing;
                }
            }
            HarnessCommand::Despawn { agent } => {
                let Some(entity) = self.require(agent) else {
                    return;
                };
                let _ = self.world.despawn(entity);
                debug!(tick, ?agent, "Agent despawned");
            }
        }
    }

    /// Look up an agent named by a command, warning when it does not exist.
    fn require(&self, agent: AgentId) -> Option<Entity> {
        let entity = self.entity_of(agent);
        if entity.is_none() {
            warn!(tick = self.time.tick, ?agent, "Command for unknown agent");
        }
        entity
    }

    /// Raise an alarm immediately and deliver its alerts.
    fn force_alarm(&mut self, agent: AgentId, threat: AgentId) {
        let views = systems::perception::collect(&self.world);
        self.index.rebuild(views.iter().map(|(_, view)| *view).collect());
        let (caller, threat_view) = match (self.index.get(agent), self.index.get(threat)) {
            (Some(caller), Some(threat_view)) => (*caller, *threat_view),
            _ => {
                warn!(tick = self.time.tick, ?agent, ?threat, "Command for unknown agent");
                return;
            }
        };
        let Some(profile) = self.profiles.profile(caller.species) else {
            return;
        };
        let Some(entity) = views
            .iter()
            .find(|(_, view)| view.id == agent)
            .map(|(entity, _)| *entity)
        else {
            return;
        };

        let env = Environment::new(self.time.tick, &self.index, &*self.terrain);
        let outcome = match self.world.get::<&mut AlarmState>(entity) {
            Ok(mut alarm_state) => {
                alarm::force_alarm(&profile, &caller, &mut alarm_state, &threat_view, &env)
            }
            Err(_) => return,
        };
        self.cues.extend(outcome.cues);
        let entities = entity_map(&views);
        systems::signals::commit(&mut self.world, &entities, outcome.signals);
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        let tick = self.time.tick;

        // 1. Perception: start-of-step views and spatial index
        let views = systems::perception::collect(&self.world);
        self.index.rebuild(views.iter().map(|(_, view)| *view).collect());

        // 2. Threat response, signals buffered
        let ctx = StepContext {
            tick,
            profiles: &self.profiles,
            index: &self.index,
            terrain: &*self.terrain,
            weights: &self.weights,
        };
        systems::response::run(
            &mut self.world,
            &views,
            &ctx,
            &mut self.rng,
            &mut self.signal_buffer,
            &mut self.cues,
        );

        // 3. Locomotion
        systems::locomotion::run(&mut self.world, &self.profiles);

        // 4. Signal commit; an alert's facing holds until the next step
        let entities = entity_map(&views);
        systems::signals::commit(&mut self.world, &entities, self.signal_buffer.drain(..));
    }
}

fn entity_map(views: &[(Entity, stampede_core::types::AgentView)]) -> HashMap<AgentId, Entity> {
    views.iter().map(|(entity, view)| (view.id, *entity)).collect()
}
