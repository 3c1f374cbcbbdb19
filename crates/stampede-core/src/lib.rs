//! Core types and definitions for the STAMPEDE threat-response engine.
//!
//! This crate defines the vocabulary shared across all other crates:
//! agent views, components, species profiles, collaborator traits,
//! signals, cue events, commands, and constants.
//! It has no dependency on the ECS or any runtime framework.

pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod events;
pub mod profile;
pub mod query;
pub mod state;
pub mod store;
pub mod types;
