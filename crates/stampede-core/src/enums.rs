//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Threat category, used to pick the species' FID multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatCategory {
    /// Creeping, stealthy predators.
    Ambush,
    /// Chasing predators.
    Cursorial,
    /// Flying hazards.
    Aerial,
    /// Human controllers.
    Human,
    /// Generically aggressive, otherwise unclassified.
    Unknown,
}

/// Escape trajectory selected by the escape controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscapeStrategy {
    /// Directly away from the threat.
    #[default]
    Straight,
    /// Protean zigzag away from the threat.
    Zigzag,
    /// Toward the nearest refuge.
    Refuge,
    /// Immobile, waiting to go unnoticed.
    Freeze,
}

/// Ecological role of a species, resolved once at registration.
///
/// Drives threat classification and cross-species alarm eavesdropping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guild {
    /// Generic prey animal.
    #[default]
    Prey,
    /// Stalking predator (cats, spiders).
    AmbushPredator,
    /// Pursuit predator (wolves, foxes).
    CursorialPredator,
    /// Flying hazard (phantoms, bees).
    AerialHazard,
    /// Human controller.
    Human,
    /// Anything else: constructs, monsters, ambient mobs.
    Other,
}

impl Guild {
    /// Whether this guild listens to other species' alarm calls.
    /// Prey always do; ground predators listen to locate prey or avoid danger.
    pub fn eavesdrops(self) -> bool {
        matches!(
            self,
            Guild::Prey | Guild::AmbushPredator | Guild::CursorialPredator
        )
    }

    /// Whether this guild is a known predator category.
    pub fn is_predator(self) -> bool {
        matches!(
            self,
            Guild::AmbushPredator | Guild::CursorialPredator | Guild::AerialHazard
        )
    }
}

/// Kind of cross-agent signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Panic contagion broadcast from a herd member.
    Panic,
    /// Alarm call alert.
    Alert,
}
