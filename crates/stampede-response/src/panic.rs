//! Panic coordination: stampede detection, contagion and wind-down.
//!
//! An agent panics when enough threats are detected at once, when one
//! comes very close, or when a herd member is already panicking. Panic is
//! broadcast to herd members as buffered signals; the receivers react on
//! their own next evaluation, so the wavefront advances one hop per step.

use std::f64::consts::TAU;

use glam::{DQuat, DVec3};
use rand::Rng;
use stampede_core::components::PanicState;
use stampede_core::constants::*;
use stampede_core::enums::SignalKind;
use stampede_core::events::Signal;
use stampede_core::profile::SpeciesFleeingProfile;
use stampede_core::types::{AgentId, AgentView};
use tracing::debug;

use crate::flight::ThreatAssessment;

/// Why panic triggered this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicCause {
    /// Threat count reached the species threshold.
    ThreatCount,
    /// A threat came within the critical share of its FID.
    CloseThreat,
    /// A herd member is panicking or signalled this agent.
    Contagion,
}

/// What changed during one panic evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicOutcome {
    pub triggered: Option<PanicCause>,
    pub ended: bool,
    /// Panic broadcasts for herd members, applied after the step.
    pub signals: Vec<Signal>,
}

/// Whether the detected threats alone justify panic.
pub fn direct_cause(
    profile: &SpeciesFleeingProfile,
    threats: &[ThreatAssessment],
) -> Option<PanicCause> {
    if !threats.is_empty() && threats.len() as u64 >= u64::from(profile.panic_threshold) {
        return Some(PanicCause::ThreatCount);
    }
    let very_close = threats
        .iter()
        .any(|t| t.fid_ratio() < PANIC_CRITICAL_RATIO);
    very_close.then_some(PanicCause::CloseThreat)
}

/// Panic intensity in 0..=1 from threat count, proximity and herd size.
pub fn panic_intensity(threats: &[ThreatAssessment], herd_size: usize) -> f64 {
    let mut intensity = (threats.len() as f64 / PANIC_INTENSITY_THREATS).min(1.0);
    if threats.iter().any(|t| t.fid_ratio() < PANIC_CRITICAL_RATIO) {
        intensity += PANIC_CLOSE_THREAT_BONUS;
    }
    if herd_size > PANIC_CROWD_SIZE {
        intensity += PANIC_CROWD_BONUS;
    }
    intensity.clamp(0.0, 1.0)
}

/// Evaluate panic for one agent.
///
/// `threats` are the agent's detected threats, nearest first. `herd` holds
/// live same-species neighbours within the propagation range, as seen at
/// the start of the step.
pub fn evaluate<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    panic: &mut PanicState,
    threats: &[ThreatAssessment],
    herd: &[AgentView],
    tick: u64,
    rng: &mut R,
) -> PanicOutcome {
    let mut outcome = PanicOutcome::default();

    let signalled = std::mem::take(&mut panic.signalled);
    let signal_source = panic.signal_source.take();
    panic.cooldown = panic.cooldown.saturating_sub(1);

    let direct = direct_cause(profile, threats);
    panic.threat_count = threats.len() as u32;

    if !panic.is_panicking {
        if panic.cooldown > 0 {
            return outcome;
        }
        let contagion = signalled || herd.iter().any(|a| a.panicking);
        let cause = match (direct, contagion) {
            (Some(cause), _) => cause,
            (None, true) => PanicCause::Contagion,
            (None, false) => return outcome,
        };
        trigger(observer, panic, threats, herd, signal_source, tick, rng);
        panic.intensity = panic_intensity(threats, herd.len());
        outcome.signals = broadcast(observer, herd, threat_focus(threats, signal_source));
        outcome.triggered = Some(cause);
        debug!(
            tick,
            agent = ?observer.id,
            ?cause,
            intensity = panic.intensity,
            alerted = outcome.signals.len(),
            "Panic triggered"
        );
        return outcome;
    }

    if let Some(nearest) = threats.first() {
        panic.primary_threat = Some(nearest.threat.id);
    }
    panic.intensity = panic_intensity(threats, herd.len());

    let flee_floor_reached = panic
        .triggered_at
        .map_or(true, |at| tick.saturating_sub(at) >= MIN_FLEE_TICKS);
    if direct.is_none() && flee_floor_reached {
        panic.timer = panic.timer.saturating_sub(PANIC_WIND_DOWN_RATE);
        if panic.timer == 0 {
            end(panic);
            outcome.ended = true;
            debug!(tick, agent = ?observer.id, "Panic ended");
        }
    }
    outcome
}

fn trigger<R: Rng + ?Sized>(
    observer: &AgentView,
    panic: &mut PanicState,
    threats: &[ThreatAssessment],
    herd: &[AgentView],
    signal_source: Option<DVec3>,
    tick: u64,
    rng: &mut R,
) {
    panic.is_panicking = true;
    panic.is_fleeing = true;
    panic.timer = PANIC_DURATION_TICKS;
    panic.triggered_at = Some(tick);
    panic.primary_threat = threats.first().map(|t| t.threat.id);
    let away_from = threat_focus(threats, signal_source)
        .or_else(|| panicking_neighbor_centroid(herd));
    panic.stampede_direction = resolve_direction(observer, away_from, DVec3::ZERO, rng);
}

/// Position the herd should flee from: the nearest visible threat, or
/// where a signal said the threat was.
fn threat_focus(threats: &[ThreatAssessment], signal_source: Option<DVec3>) -> Option<DVec3> {
    threats
        .first()
        .map(|t| t.threat.position)
        .or(signal_source)
}

/// Without a known threat, a stampede runs with the herd: away from the
/// centre of the neighbours already panicking.
fn panicking_neighbor_centroid(herd: &[AgentView]) -> Option<DVec3> {
    let (sum, count) = herd
        .iter()
        .filter(|a| a.panicking)
        .fold((DVec3::ZERO, 0usize), |(sum, n), a| (sum + a.position, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Panic signals for every herd member not already panicking.
pub fn broadcast(
    observer: &AgentView,
    herd: &[AgentView],
    threat_position: Option<DVec3>,
) -> Vec<Signal> {
    let mut targets: Vec<AgentId> = herd
        .iter()
        .filter(|a| a.id != observer.id && a.alive && !a.panicking)
        .map(|a| a.id)
        .collect();
    targets.sort();
    targets
        .into_iter()
        .map(|target| Signal {
            source: observer.id,
            target,
            kind: SignalKind::Panic,
            threat_position,
        })
        .collect()
}

/// Horizontal unit direction for the stampede. Prefers fleeing `away_from`,
/// then the cached direction, then the current heading, then a random one.
fn resolve_direction<R: Rng + ?Sized>(
    observer: &AgentView,
    away_from: Option<DVec3>,
    cached: DVec3,
    rng: &mut R,
) -> DVec3 {
    let horizontal = |v: DVec3| DVec3::new(v.x, 0.0, v.z);

    if let Some(threat) = away_from {
        let away = horizontal(observer.position - threat).normalize_or_zero();
        if away != DVec3::ZERO {
            return away;
        }
    }
    if cached.length() > STAMPEDE_DIRECTION_EPSILON {
        return horizontal(cached).normalize_or_zero();
    }
    let heading = horizontal(observer.velocity).normalize_or_zero();
    if heading != DVec3::ZERO {
        return heading;
    }
    let angle = rng.gen_range(0.0..TAU);
    DVec3::new(angle.cos(), 0.0, angle.sin())
}

/// Stampede steering for this step, before the caller's speed scaling.
/// Updates the cached direction; the returned vector has magnitude
/// `stampede_speed_multiplier * weight`.
pub fn stampede_force<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    panic: &mut PanicState,
    threat_position: Option<DVec3>,
    weight: f64,
    rng: &mut R,
) -> DVec3 {
    if !panic.is_panicking {
        return DVec3::ZERO;
    }
    let direction = resolve_direction(observer, threat_position, panic.stampede_direction, rng);
    panic.stampede_direction = direction;

    let noise = rng.gen_range(-1.0..=1.0) * STAMPEDE_NOISE * panic.intensity;
    let noisy = DQuat::from_rotation_y(noise) * direction;
    noisy * profile.stampede_speed_multiplier * weight
}

/// End panic and start the retrigger cooldown.
pub fn end(panic: &mut PanicState) {
    panic.is_panicking = false;
    panic.timer = 0;
    panic.cooldown = PANIC_COOLDOWN_TICKS;
    panic.intensity = 0.0;
    panic.stampede_direction = DVec3::ZERO;
    panic.primary_threat = None;
    panic.triggered_at = None;
}

/// Start a stampede directly, ignoring cooldown. Does not broadcast.
pub fn force_panic<R: Rng + ?Sized>(
    observer: &AgentView,
    panic: &mut PanicState,
    away_from: Option<DVec3>,
    tick: u64,
    rng: &mut R,
) {
    panic.cooldown = 0;
    trigger(observer, panic, &[], &[], away_from, tick, rng);
    panic.intensity = 1.0;
    debug!(tick, agent = ?observer.id, "Panic forced");
}

/// End a stampede directly. The cooldown still applies.
pub fn force_end_panic(panic: &mut PanicState) {
    if panic.is_panicking {
        end(panic);
    }
}

/// Clear all panic state, including the cooldown and pending signals.
pub fn reset(panic: &mut PanicState) {
    *panic = PanicState::default();
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use stampede_core::enums::{Guild, ThreatCategory};
    use stampede_core::types::SpeciesId;

    use super::*;

    fn agent(id: u64, x: f64) -> AgentView {
        AgentView {
            id: AgentId(id),
            species: SpeciesId(0),
            guild: Guild::Prey,
            position: DVec3::new(x, 0.0, 0.0),
            velocity: DVec3::ZERO,
            facing: DVec3::X,
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

    fn threat(id: u64, x: f64, fid: f64) -> ThreatAssessment {
        let mut view = agent(id, x);
        view.species = SpeciesId(9);
        view.guild = Guild::CursorialPredator;
        ThreatAssessment {
            threat: view,
            category: ThreatCategory::Cursorial,
            distance: x.abs(),
            fid,
        }
    }

    #[test]
    fn test_threshold_triggers() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let me = agent(1, 0.0);

        let mut panic = PanicState::default();
        let one = [threat(10, 8.0, 10.0)];
        let outcome = evaluate(&profile, &me, &mut panic, &one, &[], 0, &mut rng);
        assert_eq!(outcome.triggered, None);
        assert!(!panic.is_panicking);

        let two = [threat(10, 8.0, 10.0), threat(11, 9.0, 10.0)];
        let outcome = evaluate(&profile, &me, &mut panic, &two, &[], 1, &mut rng);
        assert_eq!(outcome.triggered, Some(PanicCause::ThreatCount));
        assert!(panic.is_panicking);
        assert!(panic.is_fleeing);
        assert_eq!(panic.threat_count, 2);
        assert_eq!(panic.primary_threat, Some(AgentId(10)));
        assert!(panic.stampede_direction.x < 0.0);
    }

    #[test]
    fn test_close_threat_triggers() {
        let profile = SpeciesFleeingProfile {
            panic_threshold: 5,
            ..SpeciesFleeingProfile::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut panic = PanicState::default();
        let close = [threat(10, 4.0, 10.0)];
        let outcome = evaluate(&profile, &agent(1, 0.0), &mut panic, &close, &[], 0, &mut rng);
        assert_eq!(outcome.triggered, Some(PanicCause::CloseThreat));
    }

    #[test]
    fn test_contagion_from_panicking_neighbor_broadcasts_to_rest() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut panic = PanicState::default();
        let mut leader = agent(2, 3.0);
        leader.panicking = true;
        let herd = [leader, agent(4, -3.0), agent(3, -2.0)];

        let outcome = evaluate(&profile, &agent(1, 0.0), &mut panic, &[], &herd, 0, &mut rng);
        assert_eq!(outcome.triggered, Some(PanicCause::Contagion));
        let targets: Vec<AgentId> = outcome.signals.iter().map(|s| s.target).collect();
        assert_eq!(targets, vec![AgentId(3), AgentId(4)]);
        // Runs with the herd, away from the panicking neighbour.
        assert!(panic.stampede_direction.x < 0.0);
    }

    #[test]
    fn test_signal_inbox_is_consumed() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut panic = PanicState {
            signalled: true,
            signal_source: Some(DVec3::new(0.0, 0.0, 10.0)),
            ..PanicState::default()
        };
        let outcome = evaluate(&profile, &agent(1, 0.0), &mut panic, &[], &[], 0, &mut rng);
        assert_eq!(outcome.triggered, Some(PanicCause::Contagion));
        assert!(!panic.signalled);
        assert!(panic.signal_source.is_none());
        assert!(panic.stampede_direction.z < 0.0);
    }

    #[test]
    fn test_cooldown_blocks_retrigger() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut panic = PanicState {
            cooldown: 10,
            ..PanicState::default()
        };
        let close = [threat(10, 1.0, 10.0)];
        let outcome = evaluate(&profile, &agent(1, 0.0), &mut panic, &close, &[], 0, &mut rng);
        assert_eq!(outcome.triggered, None);
        assert_eq!(panic.cooldown, 9);
    }

    #[test]
    fn test_wind_down_respects_flee_floor() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let me = agent(1, 0.0);
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, None, 0, &mut rng);

        for tick in 1..MIN_FLEE_TICKS {
            evaluate(&profile, &me, &mut panic, &[], &[], tick, &mut rng);
            assert_eq!(panic.timer, PANIC_DURATION_TICKS);
        }

        let mut tick = MIN_FLEE_TICKS;
        let mut ended_at = None;
        while ended_at.is_none() && tick < 10_000 {
            let outcome = evaluate(&profile, &me, &mut panic, &[], &[], tick, &mut rng);
            if outcome.ended {
                ended_at = Some(tick);
            }
            tick += 1;
        }
        let expected = MIN_FLEE_TICKS + u64::from(PANIC_DURATION_TICKS / PANIC_WIND_DOWN_RATE) - 1;
        assert_eq!(ended_at, Some(expected));
        assert!(!panic.is_panicking);
        assert_eq!(panic.cooldown, PANIC_COOLDOWN_TICKS);
    }

    #[test]
    fn test_direct_threat_holds_timer() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let me = agent(1, 0.0);
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, None, 0, &mut rng);
        let close = [threat(10, 1.0, 10.0)];
        evaluate(&profile, &me, &mut panic, &close, &[], 500, &mut rng);
        assert_eq!(panic.timer, PANIC_DURATION_TICKS);
    }

    #[test]
    fn test_panicking_neighbors_do_not_sustain_panic() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let me = agent(1, 0.0);
        let mut other = agent(2, 2.0);
        other.panicking = true;
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, None, 0, &mut rng);
        evaluate(&profile, &me, &mut panic, &[], &[other], MIN_FLEE_TICKS, &mut rng);
        assert!(panic.timer < PANIC_DURATION_TICKS);
    }

    #[test]
    fn test_intensity_bonuses() {
        let two = [threat(10, 8.0, 10.0), threat(11, 9.0, 10.0)];
        assert!((panic_intensity(&two, 0) - 0.4).abs() < 1e-12);
        let close = [threat(10, 2.0, 10.0)];
        assert!((panic_intensity(&close, 6) - 0.7).abs() < 1e-12);
        let many: Vec<_> = (0..8).map(|i| threat(10 + i, 2.0, 10.0)).collect();
        assert_eq!(panic_intensity(&many, 20), 1.0);
    }

    #[test]
    fn test_stampede_force_scales_and_caches() {
        let profile = SpeciesFleeingProfile::cattle();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let me = agent(1, 0.0);
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, Some(DVec3::new(4.0, 0.0, 0.0)), 0, &mut rng);

        let force = stampede_force(&profile, &me, &mut panic, None, 0.5, &mut rng);
        assert!((force.length() - profile.stampede_speed_multiplier * 0.5).abs() < 1e-9);
        assert!(force.x < 0.0);
        assert_eq!(panic.stampede_direction, DVec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_stampede_random_heading_when_blind() {
        let profile = SpeciesFleeingProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let me = agent(1, 0.0);
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, None, 0, &mut rng);
        assert!(panic.stampede_direction.length() > STAMPEDE_DIRECTION_EPSILON);
        let force = stampede_force(&profile, &me, &mut panic, None, 1.0, &mut rng);
        assert!(force.length() > 0.0);
    }

    #[test]
    fn test_force_end_panic_starts_cooldown() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let me = agent(1, 0.0);
        let mut panic = PanicState::default();
        force_panic(&me, &mut panic, None, 0, &mut rng);
        force_end_panic(&mut panic);
        assert!(!panic.is_panicking);
        assert_eq!(panic.cooldown, PANIC_COOLDOWN_TICKS);
        reset(&mut panic);
        assert_eq!(panic, PanicState::default());
    }
}
