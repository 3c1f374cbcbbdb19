//! Threat classification.
//!
//! Decides whether one agent is a threat to another and, if so, which
//! FID multiplier category applies. Categories come from the guild
//! resolved at species registration; nothing is re-parsed per step.

use stampede_core::enums::{Guild, ThreatCategory};
use stampede_core::types::AgentView;

/// Category of `candidate` as a threat, ignoring who is observing.
/// `None` when the candidate is harmless.
pub fn category_of(candidate: &AgentView) -> Option<ThreatCategory> {
    if !candidate.alive {
        return None;
    }
    match candidate.guild {
        Guild::Human if candidate.stealthy => None,
        Guild::Human => Some(ThreatCategory::Human),
        Guild::AmbushPredator => Some(ThreatCategory::Ambush),
        Guild::CursorialPredator => Some(ThreatCategory::Cursorial),
        Guild::AerialHazard => Some(ThreatCategory::Aerial),
        Guild::Prey | Guild::Other if candidate.aggressive => Some(ThreatCategory::Unknown),
        Guild::Prey | Guild::Other => None,
    }
}

/// Classify `candidate` from the point of view of `observer`.
/// Self and herd members are never threats.
pub fn classify(observer: &AgentView, candidate: &AgentView) -> Option<ThreatCategory> {
    if candidate.id == observer.id || candidate.species == observer.species {
        return None;
    }
    category_of(candidate)
}

pub fn is_threat(observer: &AgentView, candidate: &AgentView) -> bool {
    classify(observer, candidate).is_some()
}

/// Whether a threat warrants an alarm call: humans, known predators,
/// and anything flagged aggressive. Stealth does not hide a threat that
/// has already been spotted.
pub fn is_significant(threat: &AgentView) -> bool {
    threat.guild == Guild::Human || threat.guild.is_predator() || threat.aggressive
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use stampede_core::types::{AgentId, SpeciesId};

    use super::*;

    fn agent(id: u64, species: u32, guild: Guild) -> AgentView {
        AgentView {
            id: AgentId(id),
            species: SpeciesId(species),
            guild,
            position: DVec3::ZERO,
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

    #[test]
    fn test_guild_categories() {
        let prey = agent(1, 0, Guild::Prey);
        let cases = [
            (Guild::AmbushPredator, Some(ThreatCategory::Ambush)),
            (Guild::CursorialPredator, Some(ThreatCategory::Cursorial)),
            (Guild::AerialHazard, Some(ThreatCategory::Aerial)),
            (Guild::Human, Some(ThreatCategory::Human)),
            (Guild::Prey, None),
            (Guild::Other, None),
        ];
        for (guild, expected) in cases {
            assert_eq!(classify(&prey, &agent(2, 1, guild)), expected, "{guild:?}");
        }
    }

    #[test]
    fn test_stealthy_human_is_not_a_threat() {
        let prey = agent(1, 0, Guild::Prey);
        let mut human = agent(2, 1, Guild::Human);
        human.stealthy = true;
        assert!(!is_threat(&prey, &human));
        // Still significant once noticed.
        assert!(is_significant(&human));
    }

    #[test]
    fn test_aggressive_unclassified_is_unknown() {
        let prey = agent(1, 0, Guild::Prey);
        let mut golem = agent(2, 1, Guild::Other);
        golem.aggressive = true;
        assert_eq!(classify(&prey, &golem), Some(ThreatCategory::Unknown));
    }

    #[test]
    fn test_same_species_never_threat() {
        let wolf_a = agent(1, 3, Guild::CursorialPredator);
        let mut wolf_b = agent(2, 3, Guild::CursorialPredator);
        wolf_b.aggressive = true;
        assert!(!is_threat(&wolf_a, &wolf_b));
        assert!(!is_threat(&wolf_a, &wolf_a));
    }

    #[test]
    fn test_dead_agents_are_harmless() {
        let prey = agent(1, 0, Guild::Prey);
        let mut wolf = agent(2, 1, Guild::CursorialPredator);
        wolf.alive = false;
        assert!(!is_threat(&prey, &wolf));
    }
}
