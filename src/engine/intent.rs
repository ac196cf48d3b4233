//! The per-tick command a bot submits to the simulation.

use serde::{Deserialize, Serialize};

use crate::engine::bot::PowerKind;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BotIntent {
    /// Degrees to rotate the hull this tick, positive clockwise.
    pub turn_degrees: f32,
    /// Degrees to rotate the gun this tick, independent of hull heading.
    pub gun_turn_degrees: f32,
    /// Degrees to rotate the radar this tick, independent of hull/gun.
    pub radar_turn_degrees: f32,
    /// Distance to attempt to move along the hull heading this tick.
    pub move_distance: f32,
    /// Gun power to fire at, 0 meaning "hold fire".
    pub fire_power: f32,
    /// Special ability to attempt to activate this tick.
    pub use_power: PowerKind,
}
