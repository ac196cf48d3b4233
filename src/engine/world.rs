//! The full simulation snapshot returned to callers each tick.

use serde::{Deserialize, Serialize};

use crate::engine::bot::BotState;
use crate::engine::bullet::BulletState;
use crate::engine::events::SimulationEvent;
use crate::engine::zone::ZoneState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    Running,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub tick: u64,
    pub status: MatchStatus,
    pub bots: Vec<BotState>,
    pub bullets: Vec<BulletState>,
    pub zone: Option<ZoneState>,
    pub events: Vec<SimulationEvent>,
}

impl WorldState {
    pub fn new_pending() -> Self {
        Self {
            tick: 0,
            status: MatchStatus::Pending,
            bots: Vec::new(),
            bullets: Vec::new(),
            zone: None,
            events: Vec::new(),
        }
    }

    pub fn alive_count(&self) -> usize {
        self.bots.iter().filter(|b| b.is_alive).count()
    }
}
