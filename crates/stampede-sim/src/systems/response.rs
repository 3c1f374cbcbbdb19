//! Threat-response system.
//!
//! Evaluates every agent in ascending id order against the start-of-step
//! views. Each evaluation writes only to the agent's own components;
//! signals to other agents and cue events are buffered for the caller.

use hecs::{Entity, World};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use stampede_core::components::{AlarmState, EscapeState, Locomotion, PanicState, SteeringIntent};
use stampede_core::events::{CueEvent, Signal};
use stampede_core::query::WorldQuery;
use stampede_core::store::ProfileStore;
use stampede_core::types::{AgentView, BehaviorWeights};
use stampede_response::context::Environment;
use stampede_response::respond::{self, AgentStates};

use crate::spatial::SpatialIndex;

/// Read-only inputs shared by every evaluation in one step.
pub struct StepContext<'a> {
    pub tick: u64,
    pub profiles: &'a ProfileStore,
    pub index: &'a SpatialIndex,
    pub terrain: &'a dyn WorldQuery,
    pub weights: &'a BehaviorWeights,
}

/// Run threat response for every agent in `views` (sorted by id).
pub fn run(
    world: &mut World,
    views: &[(Entity, AgentView)],
    ctx: &StepContext,
    rng: &mut ChaCha8Rng,
    signals: &mut Vec<Signal>,
    cues: &mut Vec<CueEvent>,
) {
    let env = Environment::new(ctx.tick, ctx.index, ctx.terrain);

    for (entity, view) in views {
        let profile = match ctx.profiles.profile(view.species) {
            Some(profile) => profile,
            None => {
                warn!(
                    tick = ctx.tick,
                    agent = ?view.id,
                    species = ?view.species,
                    "No profile for species"
                );
                continue;
            }
        };
        let components = world.query_one_mut::<(
            &mut EscapeState,
            &mut PanicState,
            &mut AlarmState,
            &Locomotion,
            &mut SteeringIntent,
        )>(*entity);
        let (escape, panic, alarm, locomotion, intent) = match components {
            Ok(components) => components,
            Err(_) => continue,
        };

        let response = respond::evaluate(
            &profile,
            view,
            AgentStates {
                escape,
                panic,
                alarm,
            },
            &env,
            ctx.weights,
            locomotion.max_speed,
            rng,
        );
        intent.0 = response.intent;
        signals.extend(response.signals);
        cues.extend(response.cues);
    }
}
