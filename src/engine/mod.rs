//! The deterministic simulation engine: data model, physics evaluator,
//! tick-driving engine, and the game loop that paces it.

pub mod arena;
pub mod bot;
pub mod bullet;
pub mod constants;
pub mod events;
pub mod game_loop;
pub mod intent;
pub mod physics;
pub mod simulation;
pub mod world;
pub mod zone;

pub use arena::Arena;
pub use bot::{BotClass, BotState, Cooldown, PowerKind};
pub use bullet::BulletState;
pub use events::SimulationEvent;
pub use intent::BotIntent;
pub use simulation::{SimulationEngine, SimulationError};
pub use world::{MatchStatus, WorldState};
pub use zone::ZoneState;
