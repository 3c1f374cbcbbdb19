//! Escape strategy state machine.
//!
//! Four trajectories: straight run, protean zigzag, refuge seeking and
//! freeze. Selection runs each step while a flee condition holds; freeze
//! is entered explicitly and left on a timer or when the threat closes in.
//!
//! Trajectory functions return a direction of magnitude at most 1.0;
//! `calculate_escape_vector` scales the result to the caller's cap.

use glam::DVec3;
use rand::Rng;
use stampede_core::components::EscapeState;
use stampede_core::constants::*;
use stampede_core::enums::EscapeStrategy;
use stampede_core::profile::SpeciesFleeingProfile;
use stampede_core::query::WorldQuery;
use stampede_core::types::{horizontal_perpendicular, AgentView};
use tracing::debug;

use crate::context::Environment;

/// Strategy used when flight (re)starts. A profile whose primary is
/// Freeze runs its secondary instead; freeze is only ever entered
/// explicitly.
pub fn flight_strategy(profile: &SpeciesFleeingProfile) -> EscapeStrategy {
    [profile.primary_strategy, profile.secondary_strategy]
        .into_iter()
        .find(|s| *s != EscapeStrategy::Freeze)
        .unwrap_or(EscapeStrategy::Straight)
}

/// Per-step strategy selection from the threat's distance relative to FID.
/// Does nothing while frozen.
pub fn select_strategy(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    distance: f64,
    fid: f64,
) {
    if escape.strategy == EscapeStrategy::Freeze {
        return;
    }
    let next = if distance < fid * REFUGE_SWITCH_RATIO
        && profile.secondary_strategy == EscapeStrategy::Refuge
    {
        EscapeStrategy::Refuge
    } else if distance > fid * PRIMARY_REVERT_RATIO {
        flight_strategy(profile)
    } else {
        escape.strategy
    };
    if next != escape.strategy {
        debug!(from = ?escape.strategy, to = ?next, distance, fid, "Escape strategy switch");
        escape.strategy = next;
    }
}

/// Whether `threat` is looking toward `observer`.
pub fn is_threat_looking_at(threat: &AgentView, observer: &AgentView) -> bool {
    let to_observer = (observer.position - threat.position).normalize_or_zero();
    let facing = threat.facing.normalize_or_zero();
    facing.dot(to_observer) >= LOOKING_AT_DOT
}

/// Whether an agent that is about to flee should freeze instead:
/// the threat is still far enough, the species can freeze, the agent
/// is not yet fleeing, and the threat has not noticed it.
pub fn should_freeze(
    profile: &SpeciesFleeingProfile,
    observer: &AgentView,
    threat: &AgentView,
    distance: f64,
    fid: f64,
    already_fleeing: bool,
) -> bool {
    profile.can_freeze
        && !already_fleeing
        && profile.freeze_duration > 0
        && distance > fid * FREEZE_CONSIDER_RATIO
        && !is_threat_looking_at(threat, observer)
}

pub fn enter_freeze(profile: &SpeciesFleeingProfile, escape: &mut EscapeState) {
    escape.strategy = EscapeStrategy::Freeze;
    escape.freeze_timer = profile.freeze_duration;
    debug!(ticks = profile.freeze_duration, "Freeze started");
}

/// Result of advancing a freeze by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeProgress {
    /// Not frozen this step.
    NotFrozen,
    /// Still frozen.
    Holding,
    /// Threat closed in; bolted.
    Broken,
    /// Timer ran out.
    Expired,
}

/// Advance the freeze timer. `threat` is the nearest threat's
/// `(distance, fid)`, if any.
pub fn update_freeze(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    threat: Option<(f64, f64)>,
) -> FreezeProgress {
    if escape.strategy != EscapeStrategy::Freeze {
        return FreezeProgress::NotFrozen;
    }
    if let Some((distance, fid)) = threat {
        if distance < fid * FREEZE_BREAK_RATIO {
            break_freeze(profile, escape);
            debug!(distance, fid, "Freeze broken by approaching threat");
            return FreezeProgress::Broken;
        }
    }
    escape.freeze_timer = escape.freeze_timer.saturating_sub(1);
    if escape.freeze_timer == 0 {
        escape.strategy = flight_strategy(profile);
        return FreezeProgress::Expired;
    }
    FreezeProgress::Holding
}

/// Leave freeze immediately and resume the flight strategy.
pub fn break_freeze(profile: &SpeciesFleeingProfile, escape: &mut EscapeState) {
    escape.freeze_timer = 0;
    if escape.strategy == EscapeStrategy::Freeze {
        escape.strategy = flight_strategy(profile);
    }
}

/// Steering intent for the current strategy, capped at `max_magnitude`.
pub fn calculate_escape_vector<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    observer: &AgentView,
    threat_position: Option<DVec3>,
    env: &Environment,
    rng: &mut R,
    max_magnitude: f64,
) -> DVec3 {
    let direction = match escape.strategy {
        EscapeStrategy::Freeze => DVec3::ZERO,
        EscapeStrategy::Straight => straight_direction(observer, threat_position),
        EscapeStrategy::Zigzag => {
            zigzag_direction(profile, escape, observer, threat_position, rng)
        }
        EscapeStrategy::Refuge => {
            refuge_direction(profile, escape, observer, threat_position, env)
        }
    };
    (direction * max_magnitude).clamp_length_max(max_magnitude.max(0.0))
}

/// Directly away from the threat with a slight lift, or along the current
/// heading at reduced magnitude when no threat is known.
pub fn straight_direction(observer: &AgentView, threat_position: Option<DVec3>) -> DVec3 {
    let away = threat_position
        .map(|t| (observer.position - t).normalize_or_zero())
        .unwrap_or(DVec3::ZERO);
    if away == DVec3::ZERO {
        return heading_fallback(observer);
    }
    (away + DVec3::new(0.0, STRAIGHT_LIFT, 0.0)).normalize_or_zero()
}

fn heading_fallback(observer: &AgentView) -> DVec3 {
    let heading = if observer.velocity.length_squared() > 0.0 {
        observer.velocity
    } else {
        observer.facing
    };
    heading.normalize_or_zero() * HEADING_FALLBACK_SCALE
}

/// Advance the zigzag timer, redrawing side and intensity on interval
/// boundaries. Returns the signed lateral offset for this step.
pub fn advance_zigzag<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    rng: &mut R,
) -> f64 {
    escape.zigzag_timer = escape.zigzag_timer.wrapping_add(1);
    let interval = profile.zigzag_change_interval;
    if interval > 0 && escape.zigzag_timer % interval == 0 {
        escape.zigzag_direction = -escape.zigzag_direction;
        let drawn = rng.gen_range(ZIGZAG_INTENSITY_MIN..=ZIGZAG_INTENSITY_MAX);
        escape.zigzag_intensity = Some(drawn.min(profile.zigzag_intensity));
    }
    zigzag_offset(profile, escape)
}

/// Signed lateral offset for the current zigzag phase. Its magnitude never
/// exceeds the profile's zigzag intensity.
pub fn zigzag_offset(profile: &SpeciesFleeingProfile, escape: &EscapeState) -> f64 {
    let intensity = escape
        .zigzag_intensity
        .unwrap_or(profile.zigzag_intensity)
        .min(profile.zigzag_intensity)
        .max(0.0);
    escape.zigzag_direction.signum()
        * (escape.zigzag_timer as f64 * ZIGZAG_PHASE_RATE).sin()
        * intensity
}

fn zigzag_direction<R: Rng + ?Sized>(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    observer: &AgentView,
    threat_position: Option<DVec3>,
    rng: &mut R,
) -> DVec3 {
    let Some(threat) = threat_position else {
        return heading_fallback(observer);
    };
    let away = (observer.position - threat).normalize_or_zero();
    if away == DVec3::ZERO {
        return heading_fallback(observer);
    }

    let offset = advance_zigzag(profile, escape, rng);
    let lateral = horizontal_perpendicular(away).normalize_or_zero() * offset;
    let half_jitter = ZIGZAG_JITTER * 0.5;
    let jitter = DVec3::new(
        rng.gen_range(-half_jitter..=half_jitter),
        0.0,
        rng.gen_range(-half_jitter..=half_jitter),
    );

    let mut direction = (away + lateral + jitter).normalize_or_zero();
    if profile.jump_chance > 0.0 && rng.gen::<f64>() < profile.jump_chance {
        direction.y += ZIGZAG_HOP_LIFT;
        direction = direction.normalize_or_zero();
    }
    direction
}

/// Nearest refuge, refreshed at most every `REFUGE_CACHE_TTL_TICKS`.
pub fn find_refuge(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    position: DVec3,
    env: &Environment,
) -> Option<DVec3> {
    let fresh = escape
        .refuge_cached_at
        .is_some_and(|at| env.tick.saturating_sub(at) < REFUGE_CACHE_TTL_TICKS);
    if !fresh {
        escape.cached_refuge = env
            .world
            .nearest_refuge(position, profile.refuge_detection_range);
        escape.refuge_cached_at = Some(env.tick);
    }
    escape.cached_refuge
}

fn refuge_direction(
    profile: &SpeciesFleeingProfile,
    escape: &mut EscapeState,
    observer: &AgentView,
    threat_position: Option<DVec3>,
    env: &Environment,
) -> DVec3 {
    let Some(refuge) = find_refuge(profile, escape, observer.position, env) else {
        return straight_direction(observer, threat_position);
    };
    if observer.distance_to(refuge) <= REFUGE_ARRIVAL_DISTANCE {
        return DVec3::ZERO;
    }
    let waypoint = if is_path_clear(observer.position, refuge, env.world) {
        refuge
    } else {
        choose_detour(observer.position, refuge, env.world).unwrap_or(refuge)
    };
    (waypoint - observer.position).normalize_or_zero()
}

/// Whether the straight segment from `from` to `to` avoids solid terrain,
/// sampled at `OCCLUSION_SAMPLE_STEP` intervals. Endpoints are not sampled.
pub fn is_path_clear(from: DVec3, to: DVec3, world: &dyn WorldQuery) -> bool {
    let delta = to - from;
    let distance = delta.length();
    if distance <= OCCLUSION_SAMPLE_STEP {
        return true;
    }
    let direction = delta / distance;
    let steps = (distance / OCCLUSION_SAMPLE_STEP).floor() as u32;
    (1..steps).all(|i| !world.is_solid(from + direction * (i as f64 * OCCLUSION_SAMPLE_STEP)))
}

/// Pick a perpendicular detour around an occluded path. When both sides
/// are clear the one ending closer to the refuge wins; ties go to the
/// left-hand side.
pub fn choose_detour(from: DVec3, refuge: DVec3, world: &dyn WorldQuery) -> Option<DVec3> {
    let side = horizontal_perpendicular(refuge - from).normalize_or_zero();
    if side == DVec3::ZERO {
        return None;
    }
    let left = from + side * DETOUR_SAMPLE_DISTANCE;
    let right = from - side * DETOUR_SAMPLE_DISTANCE;
    match (is_path_clear(from, left, world), is_path_clear(from, right, world)) {
        (true, true) => {
            if left.distance(refuge) <= right.distance(refuge) {
                Some(left)
            } else {
                Some(right)
            }
        }
        (true, false) => Some(left),
        (false, true) => Some(right),
        (false, false) => None,
    }
}

/// Clear all escape state: timers, caches, habituation and threat record.
pub fn reset(escape: &mut EscapeState) {
    *escape = EscapeState::default();
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use stampede_core::enums::Guild;
    use stampede_core::query::NoNeighbors;
    use stampede_core::types::{AgentId, SpeciesId};

    use super::*;

    fn agent(id: u64, position: DVec3) -> AgentView {
        AgentView {
            id: AgentId(id),
            species: SpeciesId(0),
            guild: Guild::Prey,
            position,
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

    /// Solid blocks at listed integer cells; one refuge.
    struct Blocks {
        solid: Vec<(i64, i64, i64)>,
        refuge: Option<DVec3>,
    }

    impl WorldQuery for Blocks {
        fn is_solid(&self, p: DVec3) -> bool {
            let cell = (p.x.floor() as i64, p.y.floor() as i64, p.z.floor() as i64);
            self.solid.contains(&cell)
        }
        fn is_refuge(&self, p: DVec3) -> bool {
            self.refuge == Some(p)
        }
        fn nearest_refuge(&self, center: DVec3, range: f64) -> Option<DVec3> {
            self.refuge.filter(|r| r.distance(center) <= range)
        }
        fn light_level(&self, _p: DVec3) -> u8 {
            15
        }
    }

    #[test]
    fn test_selection_switches_to_refuge_when_close() {
        let profile = SpeciesFleeingProfile::default();
        let mut escape = EscapeState::default();
        select_strategy(&profile, &mut escape, 5.0, 10.0);
        assert_eq!(escape.strategy, EscapeStrategy::Refuge);
        // Between the thresholds: hold.
        select_strategy(&profile, &mut escape, 7.0, 10.0);
        assert_eq!(escape.strategy, EscapeStrategy::Refuge);
        select_strategy(&profile, &mut escape, 9.0, 10.0);
        assert_eq!(escape.strategy, EscapeStrategy::Straight);
    }

    #[test]
    fn test_selection_ignored_while_frozen() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState::default();
        enter_freeze(&profile, &mut escape);
        select_strategy(&profile, &mut escape, 1.0, 10.0);
        assert_eq!(escape.strategy, EscapeStrategy::Freeze);
    }

    #[test]
    fn test_freeze_breaks_when_threat_closes() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState::default();
        enter_freeze(&profile, &mut escape);
        assert_eq!(
            update_freeze(&profile, &mut escape, Some((8.0, 10.0))),
            FreezeProgress::Holding
        );
        assert_eq!(
            update_freeze(&profile, &mut escape, Some((2.0, 10.0))),
            FreezeProgress::Broken
        );
        assert_eq!(escape.strategy, EscapeStrategy::Zigzag);
        assert_eq!(escape.freeze_timer, 0);
    }

    #[test]
    fn test_freeze_expires() {
        let profile = SpeciesFleeingProfile {
            freeze_duration: 3,
            can_freeze: true,
            ..SpeciesFleeingProfile::default()
        };
        let mut escape = EscapeState::default();
        enter_freeze(&profile, &mut escape);
        assert_eq!(update_freeze(&profile, &mut escape, None), FreezeProgress::Holding);
        assert_eq!(update_freeze(&profile, &mut escape, None), FreezeProgress::Holding);
        assert_eq!(update_freeze(&profile, &mut escape, None), FreezeProgress::Expired);
        assert_eq!(escape.strategy, EscapeStrategy::Straight);
    }

    #[test]
    fn test_freeze_intent_is_zero() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState::default();
        enter_freeze(&profile, &mut escape);
        let observer = agent(1, DVec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let v = calculate_escape_vector(
            &profile,
            &mut escape,
            &observer,
            Some(DVec3::new(5.0, 0.0, 0.0)),
            &Environment::empty(0),
            &mut rng,
            1.0,
        );
        assert_eq!(v, DVec3::ZERO);
    }

    #[test]
    fn test_opportunistic_freeze_requires_unnoticed() {
        let profile = SpeciesFleeingProfile::rabbit();
        let observer = agent(1, DVec3::ZERO);
        let mut threat = agent(2, DVec3::new(9.0, 0.0, 0.0));
        threat.facing = DVec3::new(1.0, 0.0, 0.0);
        assert!(should_freeze(&profile, &observer, &threat, 9.0, 10.0, false));
        assert!(!should_freeze(&profile, &observer, &threat, 9.0, 10.0, true));
        assert!(!should_freeze(&profile, &observer, &threat, 6.0, 10.0, false));

        threat.facing = DVec3::new(-1.0, 0.0, 0.0);
        assert!(!should_freeze(&profile, &observer, &threat, 9.0, 10.0, false));

        let deer = SpeciesFleeingProfile::deer();
        threat.facing = DVec3::new(1.0, 0.0, 0.0);
        assert!(!should_freeze(&deer, &observer, &threat, 9.0, 10.0, false));
    }

    #[test]
    fn test_straight_runs_away_with_lift() {
        let observer = agent(1, DVec3::new(0.0, 64.0, 0.0));
        let dir = straight_direction(&observer, Some(DVec3::new(5.0, 64.0, 0.0)));
        let expected = DVec3::new(-1.0, STRAIGHT_LIFT, 0.0).normalize();
        assert!((dir - expected).length() < 1e-12);
    }

    #[test]
    fn test_straight_without_threat_follows_heading() {
        let mut observer = agent(1, DVec3::ZERO);
        observer.velocity = DVec3::new(0.0, 0.0, 2.0);
        let dir = straight_direction(&observer, None);
        assert!((dir - DVec3::new(0.0, 0.0, HEADING_FALLBACK_SCALE)).length() < 1e-12);
    }

    #[test]
    fn test_zigzag_flips_only_on_interval() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let interval = profile.zigzag_change_interval;
        let mut last = escape.zigzag_direction;
        for _ in 0..interval * 4 {
            advance_zigzag(&profile, &mut escape, &mut rng);
            if escape.zigzag_direction != last {
                assert_eq!(escape.zigzag_timer % interval, 0);
                last = escape.zigzag_direction;
            }
        }
        assert_eq!(escape.zigzag_timer, interval * 4);
    }

    #[test]
    fn test_zigzag_interval_zero_never_flips() {
        let profile = SpeciesFleeingProfile::cattle();
        let mut escape = EscapeState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            advance_zigzag(&profile, &mut escape, &mut rng);
        }
        assert_eq!(escape.zigzag_direction, 1.0);
        assert_eq!(escape.zigzag_intensity, None);
    }

    #[test]
    fn test_zigzag_moves_away_from_threat() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState {
            strategy: EscapeStrategy::Zigzag,
            ..EscapeState::default()
        };
        let observer = agent(1, DVec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let env = Environment::empty(0);
        for _ in 0..50 {
            let v = calculate_escape_vector(
                &profile,
                &mut escape,
                &observer,
                Some(DVec3::new(5.0, 0.0, 0.0)),
                &env,
                &mut rng,
                1.0,
            );
            assert!(v.x < 0.0, "zigzag must keep fleeing: {v:?}");
            assert!(v.length() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_refuge_falls_back_to_straight() {
        let profile = SpeciesFleeingProfile::deer();
        let mut escape = EscapeState {
            strategy: EscapeStrategy::Refuge,
            ..EscapeState::default()
        };
        let observer = agent(1, DVec3::ZERO);
        let threat = DVec3::new(0.0, 0.0, -5.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let v = calculate_escape_vector(
            &profile,
            &mut escape,
            &observer,
            Some(threat),
            &Environment::empty(0),
            &mut rng,
            1.0,
        );
        let expected = straight_direction(&observer, Some(threat));
        assert!((v - expected).length() < 1e-12);
    }

    #[test]
    fn test_refuge_cache_ttl() {
        let profile = SpeciesFleeingProfile::deer();
        let mut escape = EscapeState::default();
        let world = Blocks {
            solid: Vec::new(),
            refuge: Some(DVec3::new(10.0, 0.0, 0.0)),
        };
        let env = Environment::new(100, &NoNeighbors, &world);
        assert_eq!(
            find_refuge(&profile, &mut escape, DVec3::ZERO, &env),
            world.refuge
        );

        let moved = Blocks {
            solid: Vec::new(),
            refuge: Some(DVec3::new(0.0, 0.0, 10.0)),
        };
        let env = Environment::new(104, &NoNeighbors, &moved);
        assert_eq!(
            find_refuge(&profile, &mut escape, DVec3::ZERO, &env),
            world.refuge,
            "cached within ttl"
        );
        let env = Environment::new(105, &NoNeighbors, &moved);
        assert_eq!(
            find_refuge(&profile, &mut escape, DVec3::ZERO, &env),
            moved.refuge
        );
    }

    #[test]
    fn test_refuge_arrival_is_zero_intent() {
        let profile = SpeciesFleeingProfile::deer();
        let mut escape = EscapeState {
            strategy: EscapeStrategy::Refuge,
            ..EscapeState::default()
        };
        let world = Blocks {
            solid: Vec::new(),
            refuge: Some(DVec3::new(1.5, 0.0, 0.0)),
        };
        let env = Environment::new(0, &NoNeighbors, &world);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let v = calculate_escape_vector(
            &profile,
            &mut escape,
            &agent(1, DVec3::ZERO),
            None,
            &env,
            &mut rng,
            1.0,
        );
        assert_eq!(v, DVec3::ZERO);
    }

    #[test]
    fn test_occlusion_sampling() {
        let world = Blocks {
            solid: vec![(2, 0, 0)],
            refuge: None,
        };
        let from = DVec3::new(0.5, 0.5, 0.5);
        assert!(!is_path_clear(from, DVec3::new(5.5, 0.5, 0.5), &world));
        assert!(is_path_clear(from, DVec3::new(0.5, 0.5, 5.5), &world));
        // Shorter than one sample step: nothing to sample.
        assert!(is_path_clear(from, DVec3::new(1.0, 0.5, 0.5), &world));
    }

    #[test]
    fn test_refuge_detour_prefers_clear_side() {
        let from = DVec3::new(0.5, 0.5, 0.5);
        let refuge = DVec3::new(5.5, 0.5, 0.5);
        // Block the direct line and the +z side.
        let world = Blocks {
            solid: vec![(2, 0, 0), (0, 0, 2)],
            refuge: Some(refuge),
        };
        let detour = choose_detour(from, refuge, &world).unwrap();
        assert!(detour.z < from.z);
    }

    #[test]
    fn test_refuge_detour_tie_is_deterministic() {
        let from = DVec3::new(0.5, 0.5, 0.5);
        let refuge = DVec3::new(5.5, 0.5, 0.5);
        let world = Blocks {
            solid: vec![(2, 0, 0)],
            refuge: Some(refuge),
        };
        let first = choose_detour(from, refuge, &world).unwrap();
        let second = choose_detour(from, refuge, &world).unwrap();
        assert_eq!(first, second);
        let side = horizontal_perpendicular(refuge - from).normalize();
        assert!((first - (from + side * DETOUR_SAMPLE_DISTANCE)).length() < 1e-12);
    }

    #[test]
    fn test_reset_clears_everything() {
        let profile = SpeciesFleeingProfile::rabbit();
        let mut escape = EscapeState {
            habituation_level: 0.4,
            zigzag_timer: 12,
            cached_refuge: Some(DVec3::ONE),
            refuge_cached_at: Some(3),
            last_threat: Some(AgentId(9)),
            ..EscapeState::default()
        };
        enter_freeze(&profile, &mut escape);
        reset(&mut escape);
        assert_eq!(escape, EscapeState::default());
    }
}
