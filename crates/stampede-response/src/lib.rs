//! Threat response for STAMPEDE.
//!
//! Threat classification, flight initiation distance, the escape-strategy
//! state machine, panic contagion and alarm signalling. Pure functions over
//! plain data: no ECS dependency, collaborators are injected per call.

pub mod alarm;
pub mod classify;
pub mod context;
pub mod escape;
pub mod flight;
pub mod panic;
pub mod respond;

pub use stampede_core as core;
