//! # Feels Auction Simulator
//!
//! Replays a scripted sequence of trades against the Dutch-auction engine
//! through an in-memory pool and reports the outcome.

pub mod config;
pub mod error;
pub mod pool;
pub mod runner;

pub use config::{create_example_config, ScriptedTrade, SimConfig};
pub use error::{SimError, SimResult};
pub use pool::{Quote, SimPool};
pub use runner::{run, SimReport, Simulation, SlugDump};
