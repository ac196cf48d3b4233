//! Sandbox container scheduling: admission control over a fixed pool of
//! bot-runner slots, with FIFO overflow queueing.

pub mod sandbox;

pub use sandbox::{BotRunner, LoggingBotRunner, RuntimeStats, SandboxScheduler, SchedulerError, StartOutcome};
