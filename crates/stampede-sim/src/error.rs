//! Setup errors for the simulation engine.

use thiserror::Error;

use stampede_core::store::ProfileError;
use stampede_core::types::SpeciesId;

use crate::spatial::IndexError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("species {0:?} has no registered profile")]
    MissingProfile(SpeciesId),
}
