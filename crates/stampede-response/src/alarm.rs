//! Alarm calls.
//!
//! An agent that spots a significant threat at a middle distance, far
//! enough that calling beats running and close enough to matter, alerts
//! the herd and, for species that warn across species, any eavesdroppers
//! nearby. Listeners already watching the threat are left alone.

use glam::DVec3;
use stampede_core::components::AlarmState;
use stampede_core::constants::*;
use stampede_core::enums::SignalKind;
use stampede_core::events::{CueEvent, Signal};
use stampede_core::profile::SpeciesFleeingProfile;
use stampede_core::types::{AgentId, AgentView};
use tracing::debug;

use crate::classify::is_significant;
use crate::context::Environment;
use crate::flight::ThreatAssessment;

/// A raised alarm: the alerts to deliver and the cues to play.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmOutcome {
    pub signals: Vec<Signal>,
    pub cues: Vec<CueEvent>,
}

impl AlarmOutcome {
    pub fn alerted(&self) -> usize {
        self.signals.len()
    }
}

/// Count the cooldown down by one step.
pub fn advance_cooldown(alarm: &mut AlarmState) {
    alarm.cooldown = alarm.cooldown.saturating_sub(1);
}

/// Whether `threat` warrants an alarm right now.
pub fn should_raise(
    profile: &SpeciesFleeingProfile,
    alarm: &AlarmState,
    threat: &ThreatAssessment,
) -> bool {
    alarm.cooldown == 0
        && profile.alarm_call_range > 0.0
        && threat.distance >= threat.fid * ALARM_MIN_RATIO
        && threat.distance <= threat.fid * ALARM_MAX_RATIO
        && is_significant(&threat.threat)
}

/// Raise an alarm about `threat` when the gating conditions hold.
/// `None` means no alarm was raised.
pub fn raise_alarm_if_needed(
    profile: &SpeciesFleeingProfile,
    caller: &AgentView,
    alarm: &mut AlarmState,
    threat: &ThreatAssessment,
    env: &Environment,
) -> Option<AlarmOutcome> {
    if !should_raise(profile, alarm, threat) {
        return None;
    }
    Some(raise(profile, caller, alarm, &threat.threat, env))
}

/// Raise an alarm regardless of cooldown and distance gating.
pub fn force_alarm(
    profile: &SpeciesFleeingProfile,
    caller: &AgentView,
    alarm: &mut AlarmState,
    threat: &AgentView,
    env: &Environment,
) -> AlarmOutcome {
    raise(profile, caller, alarm, threat, env)
}

fn raise(
    profile: &SpeciesFleeingProfile,
    caller: &AgentView,
    alarm: &mut AlarmState,
    threat: &AgentView,
    env: &Environment,
) -> AlarmOutcome {
    let listeners = listeners(profile, caller, threat, env);
    let signals: Vec<Signal> = listeners
        .into_iter()
        .map(|target| Signal {
            source: caller.id,
            target,
            kind: SignalKind::Alert,
            threat_position: Some(threat.position),
        })
        .collect();

    alarm.cooldown = profile.alarm_cooldown;
    alarm.last_alarm_tick = Some(env.tick);
    alarm.last_threat = Some(threat.id);
    alarm.total_alarms += 1;
    alarm.herd_alerted += signals.len() as u32;

    debug!(
        tick = env.tick,
        agent = ?caller.id,
        threat = ?threat.id,
        alerted = signals.len(),
        "Alarm raised"
    );

    AlarmOutcome {
        signals,
        cues: vec![
            CueEvent::AlarmCall {
                agent: caller.id,
                position: caller.position,
            },
            CueEvent::VisualSignal {
                agent: caller.id,
                position: caller.position,
            },
        ],
    }
}

/// Agents that hear the call and are not yet aware of the threat,
/// sorted by id.
fn listeners(
    profile: &SpeciesFleeingProfile,
    caller: &AgentView,
    threat: &AgentView,
    env: &Environment,
) -> Vec<AgentId> {
    let range = profile.alarm_call_range.max(0.0);
    let mut ids: Vec<AgentId> = env
        .neighbors
        .agents_within(caller.position, range)
        .into_iter()
        .filter(|a| a.alive && a.id != caller.id && a.id != threat.id)
        .filter(|a| {
            a.species == caller.species
                || (profile.cross_species_warning && a.guild.eavesdrops())
        })
        .filter(|a| !is_aware(a, threat.position))
        .map(|a| a.id)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Whether `listener` is already looking roughly toward `threat_position`.
pub fn is_aware(listener: &AgentView, threat_position: DVec3) -> bool {
    let to_threat = (threat_position - listener.position).normalize_or_zero();
    listener.facing.normalize_or_zero().dot(to_threat) > AWARENESS_DOT
}

/// Clear cooldown and alarm bookkeeping.
pub fn reset(alarm: &mut AlarmState) {
    *alarm = AlarmState::default();
}

#[cfg(test)]
mod tests {
    use stampede_core::enums::{Guild, ThreatCategory};
    use stampede_core::types::SpeciesId;

    use super::*;

    fn agent(id: u64, species: u32, guild: Guild, position: DVec3) -> AgentView {
        AgentView {
            id: AgentId(id),
            species: SpeciesId(species),
            guild,
            position,
            velocity: DVec3::ZERO,
            facing: DVec3::NEG_Z,
            health: 10.0,
            max_health: 10.0,
            juvenile: false,
            last_damaged_tick: None,
            aggressive: false,
            stealthy: false,
            alive: true,
            panicking: false,
            fleeing: false,
        }
    }

    fn wolf_at(x: f64, fid: f64) -> ThreatAssessment {
        ThreatAssessment {
            threat: agent(99, 7, Guild::CursorialPredator, DVec3::new(x, 0.0, 0.0)),
            category: ThreatCategory::Cursorial,
            distance: x,
            fid,
        }
    }

    #[test]
    fn test_distance_gating() {
        let profile = SpeciesFleeingProfile::default();
        let alarm = AlarmState::default();
        assert!(!should_raise(&profile, &alarm, &wolf_at(2.5, 10.0)));
        assert!(should_raise(&profile, &alarm, &wolf_at(3.5, 10.0)));
        assert!(should_raise(&profile, &alarm, &wolf_at(14.5, 10.0)));
        assert!(!should_raise(&profile, &alarm, &wolf_at(15.5, 10.0)));
    }

    #[test]
    fn test_silent_species_never_calls() {
        let profile = SpeciesFleeingProfile::rabbit();
        assert!(!should_raise(&profile, &AlarmState::default(), &wolf_at(8.0, 10.0)));
    }

    #[test]
    fn test_insignificant_threat_ignored() {
        let profile = SpeciesFleeingProfile::default();
        let mut threat = wolf_at(8.0, 10.0);
        threat.threat.guild = Guild::Other;
        assert!(!should_raise(&profile, &AlarmState::default(), &threat));
        threat.threat.aggressive = true;
        assert!(should_raise(&profile, &AlarmState::default(), &threat));
    }

    #[test]
    fn test_cooldown_blocks_second_alarm() {
        let profile = SpeciesFleeingProfile::default();
        let caller = agent(1, 0, Guild::Prey, DVec3::ZERO);
        let mut alarm = AlarmState::default();
        let threat = wolf_at(8.0, 10.0);
        let env = Environment::empty(0);

        assert!(raise_alarm_if_needed(&profile, &caller, &mut alarm, &threat, &env).is_some());
        assert_eq!(alarm.cooldown, profile.alarm_cooldown);
        for _ in 1..profile.alarm_cooldown {
            advance_cooldown(&mut alarm);
            assert!(raise_alarm_if_needed(&profile, &caller, &mut alarm, &threat, &env).is_none());
        }
        advance_cooldown(&mut alarm);
        assert!(raise_alarm_if_needed(&profile, &caller, &mut alarm, &threat, &env).is_some());
        assert_eq!(alarm.total_alarms, 2);
    }

    #[test]
    fn test_alerts_unaware_herd_and_eavesdroppers() {
        let profile = SpeciesFleeingProfile::default();
        let caller = agent(1, 0, Guild::Prey, DVec3::ZERO);
        let threat = wolf_at(8.0, 10.0);

        let mut watching = agent(2, 0, Guild::Prey, DVec3::new(0.0, 0.0, 3.0));
        watching.facing = DVec3::X;
        let grazing = agent(3, 0, Guild::Prey, DVec3::new(0.0, 0.0, -3.0));
        let fox = agent(4, 5, Guild::CursorialPredator, DVec3::new(-3.0, 0.0, 0.0));
        let bee = agent(5, 6, Guild::AerialHazard, DVec3::new(-2.0, 0.0, 0.0));
        let far = agent(6, 0, Guild::Prey, DVec3::new(-100.0, 0.0, 0.0));
        let agents = vec![caller, watching, grazing, fox, bee, far, threat.threat];
        let env = Environment::new(3, &agents, &stampede_core::query::OpenWorld);

        let mut alarm = AlarmState::default();
        let outcome =
            raise_alarm_if_needed(&profile, &caller, &mut alarm, &threat, &env).unwrap();
        let targets: Vec<AgentId> = outcome.signals.iter().map(|s| s.target).collect();
        assert_eq!(targets, vec![AgentId(3), AgentId(4)]);
        assert!(outcome
            .signals
            .iter()
            .all(|s| s.kind == SignalKind::Alert
                && s.threat_position == Some(threat.threat.position)));
        assert_eq!(alarm.herd_alerted, 2);
        assert_eq!(alarm.last_alarm_tick, Some(3));
        assert_eq!(alarm.last_threat, Some(AgentId(99)));
        assert_eq!(outcome.cues.len(), 2);
    }

    #[test]
    fn test_no_cross_species_without_warning() {
        let profile = SpeciesFleeingProfile {
            cross_species_warning: false,
            ..SpeciesFleeingProfile::default()
        };
        let caller = agent(1, 0, Guild::Prey, DVec3::ZERO);
        let other_prey = agent(2, 3, Guild::Prey, DVec3::new(0.0, 0.0, 2.0));
        let agents = vec![caller, other_prey];
        let env = Environment::new(0, &agents, &stampede_core::query::OpenWorld);
        let mut alarm = AlarmState::default();
        let outcome = force_alarm(&profile, &caller, &mut alarm, &wolf_at(8.0, 10.0).threat, &env);
        assert_eq!(outcome.alerted(), 0);
        // Cooldown applies even when nobody heard.
        assert_eq!(alarm.cooldown, profile.alarm_cooldown);
    }

    #[test]
    fn test_awareness_threshold() {
        let mut listener = agent(1, 0, Guild::Prey, DVec3::ZERO);
        let threat = DVec3::new(10.0, 0.0, 0.0);
        listener.facing = DVec3::new(1.0, 0.0, 1.0);
        // cos 45° ≈ 0.707
        assert!(is_aware(&listener, threat));
        listener.facing = DVec3::new(1.0, 0.0, 2.0);
        // cos ≈ 0.447
        assert!(!is_aware(&listener, threat));
    }
}
