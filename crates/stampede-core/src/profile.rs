//! Species fleeing profiles.
//!
//! One immutable profile per species, shared by every agent of that
//! species. Values follow the flight-initiation-distance literature
//! (Ydenberg & Dill 1986, Stankowich 2008). Caller-supplied values are
//! taken as-is; nothing here clamps them.

use serde::{Deserialize, Serialize};

use crate::enums::{EscapeStrategy, ThreatCategory};

/// Behavioral parameters governing how a species detects and escapes threats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesFleeingProfile {
    /// Base flight initiation distance (world units).
    pub base_fid: f64,
    pub ambush_multiplier: f64,
    pub cursorial_multiplier: f64,
    pub aerial_multiplier: f64,
    pub human_multiplier: f64,
    pub primary_strategy: EscapeStrategy,
    pub secondary_strategy: EscapeStrategy,
    /// Upper bound on the zigzag perpendicular offset.
    pub zigzag_intensity: f64,
    /// Ticks between zigzag direction redraws. Zero disables redraws.
    pub zigzag_change_interval: u32,
    /// Probability per zigzag tick of an obstacle hop.
    pub jump_chance: f64,
    pub refuge_detection_range: f64,
    pub freeze_duration: u32,
    /// Whether the opportunistic pre-flight freeze applies.
    pub can_freeze: bool,
    /// Concurrent threat count that triggers a stampede.
    pub panic_threshold: u32,
    pub stampede_speed_multiplier: f64,
    pub panic_propagation_range: f64,
    /// Zero disables alarm calls.
    pub alarm_call_range: f64,
    pub alarm_cooldown: u32,
    pub cross_species_warning: bool,
    /// Calm ticks after a flight before it counts as a non-lethal encounter.
    pub recovery_time: u32,
    /// Habituation gained per non-lethal encounter.
    pub habituation_rate: f64,
}

impl Default for SpeciesFleeingProfile {
    fn default() -> Self {
        Self {
            base_fid: 12.0,
            ambush_multiplier: 1.0,
            cursorial_multiplier: 1.0,
            aerial_multiplier: 1.2,
            human_multiplier: 1.0,
            primary_strategy: EscapeStrategy::Straight,
            secondary_strategy: EscapeStrategy::Refuge,
            zigzag_intensity: 0.3,
            zigzag_change_interval: 20,
            jump_chance: 0.0,
            refuge_detection_range: 24.0,
            freeze_duration: 30,
            can_freeze: false,
            panic_threshold: 2,
            stampede_speed_multiplier: 1.5,
            panic_propagation_range: 20.0,
            alarm_call_range: 24.0,
            alarm_cooldown: 150,
            cross_species_warning: true,
            recovery_time: 400,
            habituation_rate: 0.05,
        }
    }
}

impl SpeciesFleeingProfile {
    /// FID multiplier for a threat category. Unknown threats use 1.0.
    pub fn threat_multiplier(&self, category: ThreatCategory) -> f64 {
        match category {
            ThreatCategory::Ambush => self.ambush_multiplier,
            ThreatCategory::Cursorial => self.cursorial_multiplier,
            ThreatCategory::Aerial => self.aerial_multiplier,
            ThreatCategory::Human => self.human_multiplier,
            ThreatCategory::Unknown => 1.0,
        }
    }

    /// Largest category multiplier, never below 1.0.
    pub fn max_threat_multiplier(&self) -> f64 {
        [
            self.ambush_multiplier,
            self.cursorial_multiplier,
            self.aerial_multiplier,
            self.human_multiplier,
        ]
        .into_iter()
        .fold(1.0, f64::max)
    }

    /// Profile part of the threat search radius. The observer's state and
    /// environment modifiers scale it further.
    pub fn threat_search_radius(&self) -> f64 {
        self.base_fid * self.max_threat_multiplier() * crate::constants::THREAT_SEARCH_FACTOR
    }

    /// Rabbits: freeze first, then protean zigzag. No alarm calls.
    pub fn rabbit() -> Self {
        Self {
            base_fid: 12.0,
            primary_strategy: EscapeStrategy::Zigzag,
            secondary_strategy: EscapeStrategy::Freeze,
            zigzag_intensity: 0.8,
            zigzag_change_interval: 15,
            jump_chance: 0.15,
            refuge_detection_range: 20.0,
            freeze_duration: 40,
            can_freeze: true,
            ambush_multiplier: 0.8,
            cursorial_multiplier: 1.2,
            aerial_multiplier: 1.5,
            human_multiplier: 1.3,
            panic_threshold: 2,
            stampede_speed_multiplier: 1.6,
            panic_propagation_range: 16.0,
            alarm_call_range: 0.0,
            alarm_cooldown: 0,
            cross_species_warning: false,
            recovery_time: 300,
            habituation_rate: 0.05,
        }
    }

    /// Deer: run for cover, tail-flag to the herd.
    pub fn deer() -> Self {
        Self {
            base_fid: 18.0,
            primary_strategy: EscapeStrategy::Refuge,
            secondary_strategy: EscapeStrategy::Straight,
            zigzag_intensity: 0.2,
            zigzag_change_interval: 30,
            refuge_detection_range: 32.0,
            freeze_duration: 60,
            ambush_multiplier: 0.9,
            cursorial_multiplier: 1.0,
            aerial_multiplier: 1.3,
            human_multiplier: 1.2,
            panic_threshold: 3,
            stampede_speed_multiplier: 1.8,
            panic_propagation_range: 24.0,
            alarm_call_range: 32.0,
            alarm_cooldown: 200,
            cross_species_warning: true,
            recovery_time: 600,
            habituation_rate: 0.03,
            ..Self::default()
        }
    }

    /// Sheep: flock together and run straight.
    pub fn sheep() -> Self {
        Self {
            base_fid: 14.0,
            primary_strategy: EscapeStrategy::Straight,
            secondary_strategy: EscapeStrategy::Refuge,
            zigzag_intensity: 0.1,
            zigzag_change_interval: 40,
            refuge_detection_range: 24.0,
            freeze_duration: 30,
            ambush_multiplier: 0.9,
            cursorial_multiplier: 1.1,
            aerial_multiplier: 1.4,
            human_multiplier: 1.0,
            panic_threshold: 2,
            stampede_speed_multiplier: 1.5,
            panic_propagation_range: 20.0,
            alarm_call_range: 24.0,
            alarm_cooldown: 150,
            cross_species_warning: true,
            recovery_time: 400,
            habituation_rate: 0.08,
            ..Self::default()
        }
    }

    /// Cattle: low FID, strong stampede, slow recovery.
    pub fn cattle() -> Self {
        Self {
            base_fid: 10.0,
            primary_strategy: EscapeStrategy::Straight,
            secondary_strategy: EscapeStrategy::Refuge,
            zigzag_intensity: 0.0,
            zigzag_change_interval: 0,
            refuge_detection_range: 32.0,
            freeze_duration: 20,
            ambush_multiplier: 1.0,
            cursorial_multiplier: 1.2,
            aerial_multiplier: 1.5,
            human_multiplier: 0.9,
            panic_threshold: 3,
            stampede_speed_multiplier: 2.0,
            panic_propagation_range: 32.0,
            alarm_call_range: 28.0,
            alarm_cooldown: 180,
            cross_species_warning: true,
            recovery_time: 800,
            habituation_rate: 0.1,
            ..Self::default()
        }
    }

    /// Pigs: seek shelter aggressively.
    pub fn pig() -> Self {
        Self {
            base_fid: 12.0,
            primary_strategy: EscapeStrategy::Refuge,
            secondary_strategy: EscapeStrategy::Straight,
            zigzag_intensity: 0.1,
            zigzag_change_interval: 35,
            refuge_detection_range: 28.0,
            freeze_duration: 25,
            ambush_multiplier: 1.1,
            cursorial_multiplier: 1.1,
            aerial_multiplier: 1.3,
            human_multiplier: 1.0,
            panic_threshold: 2,
            stampede_speed_multiplier: 1.4,
            panic_propagation_range: 18.0,
            alarm_call_range: 20.0,
            alarm_cooldown: 120,
            cross_species_warning: true,
            recovery_time: 350,
            habituation_rate: 0.07,
            ..Self::default()
        }
    }

    /// Chickens: short FID, erratic zigzag, panic at the first threat.
    pub fn chicken() -> Self {
        Self {
            base_fid: 8.0,
            primary_strategy: EscapeStrategy::Zigzag,
            secondary_strategy: EscapeStrategy::Freeze,
            zigzag_intensity: 0.7,
            zigzag_change_interval: 10,
            jump_chance: 0.1,
            refuge_detection_range: 16.0,
            freeze_duration: 20,
            can_freeze: true,
            ambush_multiplier: 1.2,
            cursorial_multiplier: 1.3,
            aerial_multiplier: 0.8,
            human_multiplier: 1.1,
            panic_threshold: 1,
            stampede_speed_multiplier: 1.3,
            panic_propagation_range: 12.0,
            alarm_call_range: 16.0,
            alarm_cooldown: 100,
            cross_species_warning: true,
            recovery_time: 200,
            habituation_rate: 0.12,
        }
    }

    /// Built-in presets keyed by species name.
    pub fn presets() -> Vec<(&'static str, SpeciesFleeingProfile)> {
        vec![
            ("default", Self::default()),
            ("rabbit", Self::rabbit()),
            ("deer", Self::deer()),
            ("sheep", Self::sheep()),
            ("cattle", Self::cattle()),
            ("pig", Self::pig()),
            ("chicken", Self::chicken()),
        ]
    }
}
