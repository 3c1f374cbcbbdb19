//! Simulation engine for STAMPEDE.
//!
//! Owns the hecs ECS world, runs the threat-response systems each tick,
//! and produces `PopulationSnapshot`s for harnesses and tests.

pub mod engine;
pub mod error;
pub mod spatial;
pub mod systems;
pub mod world_setup;

pub use engine::{SimConfig, SimulationEngine};
pub use error::SimError;
pub use stampede_core as core;
pub use stampede_terrain as terrain;
pub use world_setup::AgentSpawn;
