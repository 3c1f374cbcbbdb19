//! Flight initiation distance.
//!
//! The FID is the base distance from the species profile scaled by the
//! threat category, the observer's condition, its surroundings and its
//! habituation. Every applicable factor composes multiplicatively.

use stampede_core::components::EscapeState;
use stampede_core::constants::*;
use stampede_core::enums::ThreatCategory;
use stampede_core::profile::SpeciesFleeingProfile;
use stampede_core::types::AgentView;
use tracing::{debug, trace};

use crate::classify::classify;
use crate::context::Environment;

/// A detected threat with its FID from the observer's point of view.
#[derive(Debug, Clone, Copy)]
pub struct ThreatAssessment {
    pub threat: AgentView,
    pub category: ThreatCategory,
    pub distance: f64,
    pub fid: f64,
}

impl ThreatAssessment {
    /// Whether the threat is inside its flight initiation distance.
    pub fn within_fid(&self) -> bool {
        self.distance <= self.fid
    }

    /// Distance as a share of FID.
    pub fn fid_ratio(&self) -> f64 {
        self.distance / self.fid
    }
}

/// Flight initiation distance of `observer` from a threat of `category`.
pub fn compute_fid(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    habituation: f64,
    category: ThreatCategory,
    env: &Environment,
) -> f64 {
    let fid = profile.base_fid
        * profile.threat_multiplier(category)
        * state_modifier(observer, env.tick)
        * environment_modifier(profile, observer, env)
        * habituation_factor(habituation);
    fid.max(FID_FLOOR)
}

/// FID scaling from the observer's own condition.
pub fn state_modifier(observer: &AgentView, tick: u64) -> f64 {
    let mut modifier = 1.0;

    let health = observer.health_ratio();
    if health < HEALTH_CRITICAL_RATIO {
        modifier *= HEALTH_CRITICAL_FACTOR;
    } else if health < HEALTH_INJURED_RATIO {
        modifier *= HEALTH_INJURED_FACTOR;
    }

    if observer.juvenile {
        modifier *= JUVENILE_FACTOR;
    }

    if let Some(damaged) = observer.last_damaged_tick {
        if tick.saturating_sub(damaged) < RECENT_DAMAGE_TICKS {
            modifier *= RECENT_DAMAGE_FACTOR;
        }
    }

    if observer.speed() < STATIONARY_SPEED {
        modifier *= STATIONARY_FACTOR;
    }

    modifier
}

/// FID scaling from refuge availability, herd size and light.
pub fn environment_modifier(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    env: &Environment,
) -> f64 {
    let mut modifier = 1.0;

    match env
        .world
        .nearest_refuge(observer.position, profile.refuge_detection_range)
    {
        None => modifier *= REFUGE_FAR_FACTOR,
        Some(refuge) if observer.distance_to(refuge) <= REFUGE_NEAR_DISTANCE => {
            modifier *= REFUGE_NEAR_FACTOR
        }
        Some(_) => {}
    }

    let herd = herd_count(observer, HERD_COUNT_RADIUS, env);
    if herd >= HERD_DILUTION_COUNT {
        modifier *= HERD_DILUTION_FACTOR;
    } else if herd == 0 {
        modifier *= ISOLATION_FACTOR;
    }

    if env.world.light_level(observer.position) < DARKNESS_LIGHT_LEVEL {
        modifier *= DARKNESS_FACTOR;
    }

    modifier
}

fn habituation_factor(habituation: f64) -> f64 {
    1.0 - HABITUATION_FID_REDUCTION * habituation.clamp(0.0, 1.0)
}

/// Live same-species neighbours within `radius`, excluding the observer.
pub fn herd_count(observer: &AgentView, radius: f64, env: &Environment) -> usize {
    env.neighbors
        .agents_within(observer.position, radius)
        .iter()
        .filter(|a| a.alive && a.id != observer.id && a.species == observer.species)
        .count()
}

/// Outer radius searched for threats: the largest FID any category could
/// reach for this observer, widened to the alarm band's outer edge.
pub fn search_radius(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    env_modifier: f64,
    tick: u64,
) -> f64 {
    let widest = profile.threat_search_radius() * state_modifier(observer, tick) * env_modifier;
    widest.max(FID_FLOOR * THREAT_SEARCH_FACTOR)
}

/// Every threat within `THREAT_SEARCH_FACTOR` of its own FID, nearest
/// first. Ties break on id.
pub fn detect_threats(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    habituation: f64,
    env: &Environment,
) -> Vec<ThreatAssessment> {
    // Environment modifier is per-observer; compute it once.
    let env_modifier = environment_modifier(profile, observer, env);
    let radius = search_radius(profile, observer, env_modifier, env.tick);
    let candidates = env.neighbors.agents_within(observer.position, radius);
    if candidates.is_empty() {
        return Vec::new();
    }

    let base = profile.base_fid
        * state_modifier(observer, env.tick)
        * env_modifier
        * habituation_factor(habituation);

    let mut threats: Vec<ThreatAssessment> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let category = classify(observer, &candidate)?;
            Some(ThreatAssessment {
                threat: candidate,
                category,
                distance: observer.distance_to(candidate.position),
                fid: (base * profile.threat_multiplier(category)).max(FID_FLOOR),
            })
        })
        .filter(|t| t.distance <= t.fid * THREAT_SEARCH_FACTOR)
        .collect();

    threats.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.threat.id.cmp(&b.threat.id))
    });
    threats
}

/// Nearest threat within the search radius.
pub fn detect_nearest_threat(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    habituation: f64,
    env: &Environment,
) -> Option<ThreatAssessment> {
    detect_threats(profile, observer, habituation, env)
        .into_iter()
        .next()
}

/// Whether `observer` should flee its nearest threat. Records the threat
/// and the tick when it does.
pub fn should_flee(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    escape: &mut EscapeState,
    env: &Environment,
) -> bool {
    match detect_nearest_threat(profile, observer, escape.habituation_level, env) {
        Some(nearest) if nearest.within_fid() => {
            record_threat(escape, &nearest, env.tick);
            true
        }
        _ => false,
    }
}

pub(crate) fn record_threat(escape: &mut EscapeState, threat: &ThreatAssessment, tick: u64) {
    if escape.last_threat != Some(threat.threat.id) {
        trace!(
            tick,
            threat = ?threat.threat.id,
            distance = threat.distance,
            fid = threat.fid,
            "Threat inside flight distance"
        );
    }
    escape.last_threat = Some(threat.threat.id);
    escape.last_threat_tick = Some(tick);
}

/// Record a non-lethal encounter. Habituation never exceeds 1.0.
pub fn increase_habituation(escape: &mut EscapeState, rate: f64) {
    escape.habituation_level = (escape.habituation_level + rate).clamp(0.0, 1.0);
}

pub fn reset_habituation(escape: &mut EscapeState) {
    escape.habituation_level = 0.0;
}

/// Injury: habituation is lost and any pending recovery is cancelled.
pub fn on_damage(escape: &mut EscapeState, fleeing: bool) {
    reset_habituation(escape);
    escape.recovery_since = None;
    if fleeing {
        escape.injured_while_fleeing = true;
    }
}

/// Advance post-flight recovery. Returns true when a calm period long
/// enough to count as a non-lethal encounter has just completed.
pub fn advance_recovery(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    fleeing: bool,
    tick: u64,
) -> bool {
    if fleeing {
        return false;
    }
    let Some(since) = escape.recovery_since else {
        return false;
    };
    if tick.saturating_sub(since) < u64::from(profile.recovery_time) {
        return false;
    }
    escape.recovery_since = None;
    increase_habituation(escape, profile.habituation_rate);
    debug!(
        tick,
        habituation = escape.habituation_level,
        "Recovered from non-lethal encounter"
    );
    true
}
