//! Per-agent threat response for one simulation step.
//!
//! Runs the pipeline in order: threat detection, panic, freeze, the flee
//! decision, escape steering blended with the stampede, then alarm calls.
//! Writes only to the agent's own state; effects on other agents leave as
//! buffered `Signal`s for the caller to apply once the step is over.

use glam::DVec3;
use rand::Rng;
use stampede_core::components::{AlarmState, EscapeState, PanicState};
use stampede_core::constants::MIN_FLEE_TICKS;
use stampede_core::enums::EscapeStrategy;
use stampede_core::events::{CueEvent, Signal};
use stampede_core::profile::SpeciesFleeingProfile;
use stampede_core::types::{AgentView, BehaviorWeights};
use tracing::debug;

use crate::context::Environment;
use crate::escape::{self, FreezeProgress};
use crate::flight::{self, ThreatAssessment};
use crate::{alarm, panic};

/// Mutable threat-response state owned by one agent.
pub struct AgentStates<'a> {
    pub escape: &'a mut EscapeState,
    pub panic: &'a mut PanicState,
    pub alarm: &'a mut AlarmState,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Steering intent for the locomotion executor.
    pub intent: DVec3,
    /// Writes to other agents' panic flags.
    pub signals: Vec<Signal>,
    pub cues: Vec<CueEvent>,
}

/// Evaluate one agent for one step.
#[allow(clippy::too_many_arguments)]
pub fn evaluate<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    agent: &AgentView,
    states: AgentStates,
    env: &Environment,
    weights: &BehaviorWeights,
    max_speed: f64,
    rng: &mut R,
) -> Response {
    let AgentStates {
        escape,
        panic: panic_state,
        alarm: alarm_state,
    } = states;
    let mut response = Response::default();
    if !agent.alive {
        return response;
    }
    let tick = env.tick;

    alarm::advance_cooldown(alarm_state);

    let threats = flight::detect_threats(profile, agent, escape.habituation_level, env);
    let nearest = threats.first().copied();
    let herd = herd_within(agent, profile.panic_propagation_range, env);

    // Panic first: a trigger must break any freeze in the same step.
    let outcome = panic::evaluate(profile, agent, panic_state, &threats, &herd, tick, rng);
    response.signals.extend(outcome.signals);
    if outcome.triggered.is_some() {
        if escape.strategy == EscapeStrategy::Freeze {
            escape::break_freeze(profile, escape);
            debug!(tick, agent = ?agent.id, "Freeze broken by panic");
        }
        response.cues.push(CueEvent::StampedeStarted {
            agent: agent.id,
            intensity: panic_state.intensity,
        });
    }
    if outcome.ended {
        response.cues.push(CueEvent::PanicEnded { agent: agent.id });
    }

    let freeze = escape::update_freeze(profile, escape, nearest.map(|t| (t.distance, t.fid)));
    if freeze == FreezeProgress::Holding {
        return response;
    }

    let flee_now = match nearest {
        Some(t) if t.within_fid() => {
            flight::record_threat(escape, &t, tick);
            true
        }
        _ => false,
    };

    if flee_now && freeze == FreezeProgress::NotFrozen && !panic_state.is_fleeing {
        if let Some(t) = nearest {
            if !panic_state.is_panicking
                && escape::should_freeze(profile, agent, &t.threat, t.distance, t.fid, false)
            {
                escape::enter_freeze(profile, escape);
                response.cues.push(CueEvent::FreezeStarted {
                    agent: agent.id,
                    ticks: profile.freeze_duration,
                });
                return response;
            }
        }
    }

    let released = match freeze {
        FreezeProgress::Broken => true,
        FreezeProgress::Expired => flee_now,
        FreezeProgress::NotFrozen | FreezeProgress::Holding => false,
    };
    if flee_now || released || panic_state.is_panicking {
        panic_state.is_fleeing = true;
    }
    update_flee_episode(
        profile,
        agent,
        escape,
        panic_state,
        nearest.as_ref(),
        flee_now,
        tick,
        &mut response,
    );

    flight::advance_recovery(profile, escape, panic_state.is_fleeing, tick);

    if panic_state.is_fleeing {
        response.intent = steer(
            profile,
            agent,
            escape,
            panic_state,
            nearest.as_ref(),
            env,
            weights,
            max_speed,
            rng,
        );
    }

    if let Some(t) = nearest {
        if let Some(raised) = alarm::raise_alarm_if_needed(profile, agent, alarm_state, &t, env) {
            response.signals.extend(raised.signals);
            response.cues.extend(raised.cues);
        }
    }

    response
}

/// Start or end the flee episode around the current `is_fleeing` flag.
#[allow(clippy::too_many_arguments)]
fn update_flee_episode(
    profile: &SpeciesFleeingProfile,
    agent: &AgentView,
    escape: &mut EscapeState,
    panic_state: &mut PanicState,
    nearest: Option<&ThreatAssessment>,
    flee_now: bool,
    tick: u64,
    response: &mut Response,
) {
    if !panic_state.is_fleeing {
        return;
    }
    match escape.flee_started_tick {
        None => {
            escape.flee_started_tick = Some(tick);
            escape.injured_while_fleeing = false;
            escape.recovery_since = None;
            if escape.strategy == EscapeStrategy::Freeze {
                escape.freeze_timer = 0;
            }
            escape.strategy = escape::flight_strategy(profile);
            let threat = nearest.map(|t| t.threat.id);
            debug!(tick, agent = ?agent.id, ?threat, strategy = ?escape.strategy, "Flee started");
            response.cues.push(CueEvent::FleeStarted {
                agent: agent.id,
                threat,
            });
        }
        Some(started) => {
            let floor_reached = tick.saturating_sub(started) >= MIN_FLEE_TICKS;
            if !flee_now && !panic_state.is_panicking && floor_reached {
                panic_state.is_fleeing = false;
                escape.flee_started_tick = None;
                escape.last_threat = None;
                if !escape.injured_while_fleeing {
                    escape.recovery_since = Some(tick);
                }
                escape.injured_while_fleeing = false;
                debug!(tick, agent = ?agent.id, "Flee ended");
            }
        }
    }
}

/// Escape steering blended with the stampede force, capped at the agent's
/// speed limit (raised by the stampede multiplier while panicking).
#[allow(clippy::too_many_arguments)]
fn steer<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    agent: &AgentView,
    escape: &mut EscapeState,
    panic_state: &mut PanicState,
    nearest: Option<&ThreatAssessment>,
    env: &Environment,
    weights: &BehaviorWeights,
    max_speed: f64,
    rng: &mut R,
) -> DVec3 {
    let threat_position = nearest.map(|t| t.threat.position);
    if let Some(t) = nearest {
        escape::select_strategy(profile, escape, t.distance, t.fid);
    }
    let escape_vector = escape::calculate_escape_vector(
        profile,
        escape,
        agent,
        threat_position,
        env,
        rng,
        max_speed,
    ) * weights.escape;
    let stampede =
        panic::stampede_force(profile, agent, panic_state, threat_position, weights.stampede, rng)
            * max_speed;

    let cap = if panic_state.is_panicking {
        max_speed * profile.stampede_speed_multiplier
    } else {
        max_speed
    };
    (escape_vector + stampede).clamp_length_max(cap.max(0.0))
}

/// Live same-species neighbours within `radius`, excluding the agent itself.
fn herd_within(agent: &AgentView, radius: f64, env: &Environment) -> Vec<AgentView> {
    env.neighbors
        .agents_within(agent.position, radius)
        .into_iter()
        .filter(|a| a.alive && a.id != agent.id && a.species == agent.species)
        .collect()
}

/// Clear every timer, flag and cache for one agent.
pub fn reset(states: AgentStates) {
    escape::reset(states.escape);
    panic::reset(states.panic);
    alarm::reset(states.alarm);
}

/// The agent was hurt: habituation is lost and the current flight no
/// longer counts toward recovery.
pub fn on_damage(escape: &mut EscapeState, panic_state: &PanicState) {
    flight::on_damage(escape, panic_state.is_fleeing);
}

/// An encounter ended without harm.
pub fn on_non_lethal_encounter(profile: &SpeciesFleeingProfile, escape: &mut EscapeState) {
    flight::increase_habituation(escape, profile.habituation_rate);
}
