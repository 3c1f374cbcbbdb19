//! Species profile store.
//!
//! Resolves species names to dense `SpeciesId`s once, at registration,
//! and serves shared read-only profiles afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::Guild;
use crate::profile::SpeciesFleeingProfile;
use crate::types::SpeciesId;

/// Errors raised while building or querying the profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to parse species profiles: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("species `{0}` is already registered")]
    DuplicateSpecies(String),
    #[error("species `{0}` is not registered")]
    UnknownSpecies(String),
}

/// On-disk definition of one species.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDefinition {
    #[serde(default)]
    pub guild: Guild,
    #[serde(default)]
    pub profile: SpeciesFleeingProfile,
}

/// A registered species.
#[derive(Debug, Clone)]
pub struct SpeciesEntry {
    pub id: SpeciesId,
    pub name: String,
    pub guild: Guild,
    pub profile: Arc<SpeciesFleeingProfile>,
}

/// Registry of species profiles. Append-only; entries never change once added.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    entries: Vec<SpeciesEntry>,
    by_name: HashMap<String, SpeciesId>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the built-in presets, all registered as prey.
    pub fn with_presets() -> Self {
        let mut store = Self::new();
        for (name, profile) in SpeciesFleeingProfile::presets() {
            store.insert(name, Guild::Prey, profile);
        }
        store
    }

    /// Parse a JSON object mapping species names to definitions.
    /// Species are registered in name order, so ids are stable for a given file.
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let definitions: BTreeMap<String, SpeciesDefinition> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for (name, def) in definitions {
            store.register(&name, def.guild, def.profile)?;
        }
        Ok(store)
    }

    /// Register a new species and return its id.
    pub fn register(
        &mut self,
        name: &str,
        guild: Guild,
        profile: SpeciesFleeingProfile,
    ) -> Result<SpeciesId, ProfileError> {
        if self.by_name.contains_key(name) {
            return Err(ProfileError::DuplicateSpecies(name.to_string()));
        }
        Ok(self.insert(name, guild, profile))
    }

    /// Append an entry. A repeated name keeps its first id.
    fn insert(&mut self, name: &str, guild: Guild, profile: SpeciesFleeingProfile) -> SpeciesId {
        let id = SpeciesId(self.entries.len() as u32);
        self.entries.push(SpeciesEntry {
            id,
            name: name.to_string(),
            guild,
            profile: Arc::new(profile),
        });
        *self.by_name.entry(name.to_string()).or_insert(id)
    }

    /// Look up a species id by name.
    pub fn id_of(&self, name: &str) -> Result<SpeciesId, ProfileError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ProfileError::UnknownSpecies(name.to_string()))
    }

    pub fn entry(&self, id: SpeciesId) -> Option<&SpeciesEntry> {
        self.entries.get(id.0 as usize)
    }

    /// Shared profile for a species.
    pub fn profile(&self, id: SpeciesId) -> Option<Arc<SpeciesFleeingProfile>> {
        self.entry(id).map(|e| Arc::clone(&e.profile))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
