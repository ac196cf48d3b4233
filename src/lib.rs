//! CodeArena: a deterministic bot-battle simulation engine, a fan-out
//! streaming gateway for bots and spectators, and a sandbox scheduler for
//! bot containers.

pub mod config;
pub mod engine;
pub mod match_registry;
pub mod metrics;
pub mod net;
pub mod persistence;
pub mod scheduler;
pub mod util;

pub use config::Config;
pub use match_registry::MatchRegistry;
pub use metrics::Metrics;
