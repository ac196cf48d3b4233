//! The tick-driving simulation engine for a single match.
//!
//! State lives behind a single `RwLock`; every method takes the lock for the
//! shortest span that touches shared state and never performs I/O while
//! holding it — persistence writes happen after the write guard is dropped,
//! mirroring the teacher's `LobbyManager` discipline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::arena::Arena;
use crate::engine::bot::BotState;
use crate::engine::events::SimulationEvent;
use crate::engine::intent::BotIntent;
use crate::engine::physics::{apply_tick, IntentMap};
use crate::engine::world::{MatchStatus, WorldState};
use crate::persistence::{BotRecord, EventLog, MatchRecord, Persistence, PersistenceError};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("bot not registered in this match: {0}")]
    UnknownBot(Uuid),
    #[error("match is not running")]
    NotRunning,
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Per-match running totals for a bot, tracked independently of
/// `WorldState.bots` because a dead bot is removed from that list the same
/// tick its `Death` event fires — by the time the match finishes (every bot
/// dead), `world.bots` is empty and carries no stats to read back.
#[derive(Debug, Clone, Default)]
struct RosterEntry {
    name: String,
    kills: u32,
    deaths: u32,
}

struct EngineState {
    world: WorldState,
    intents: IntentMap,
    /// Every bot ever registered in this match, with stats accumulated from
    /// each tick's `Death` events as they occur.
    roster: HashMap<Uuid, RosterEntry>,
}

pub struct SimulationEngine {
    match_id: String,
    arena: Arena,
    tick_duration: Duration,
    state: RwLock<EngineState>,
    persistence: Arc<dyn Persistence>,
}

impl SimulationEngine {
    pub fn new(match_id: String, arena: Arena, tick_duration: Duration, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            match_id,
            arena,
            tick_duration,
            state: RwLock::new(EngineState {
                world: WorldState::new_pending(),
                intents: IntentMap::new(),
                roster: HashMap::new(),
            }),
            persistence,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    /// Register or update a bot's full state. Starting the match transitions
    /// status from `Pending` to `Running` on the first bot added, matching
    /// the original's lazy-start semantics.
    pub async fn set_bot(&self, bot: BotState) {
        let mut state = self.state.write().await;
        state
            .roster
            .entry(bot.id)
            .or_insert_with(RosterEntry::default)
            .name = bot.name.clone();
        if let Some(existing) = state.world.bots.iter_mut().find(|b| b.id == bot.id) {
            *existing = bot;
        } else {
            state.world.bots.push(bot);
        }
        if state.world.status == MatchStatus::Pending {
            state.world.status = MatchStatus::Running;
        }
    }

    pub async fn set_bot_intent(&self, bot_id: Uuid, intent: BotIntent) -> Result<(), SimulationError> {
        let mut state = self.state.write().await;
        if !state.roster.contains_key(&bot_id) {
            return Err(SimulationError::UnknownBot(bot_id));
        }
        state.intents.insert(bot_id, intent);
        Ok(())
    }

    pub async fn get_world_state(&self) -> WorldState {
        self.state.read().await.world.clone()
    }

    /// `SimulationService::StartSimulation`: transition `Pending` to
    /// `Running` without waiting on the first `set_bot` call. A no-op once
    /// the match is already running or finished.
    pub async fn start_simulation(&self) {
        let mut state = self.state.write().await;
        if state.world.status == MatchStatus::Pending {
            state.world.status = MatchStatus::Running;
        }
    }

    /// `SimulationService::StopSimulation`: force the match to `Finished`
    /// without a winner, independent of the normal all-dead/tick-threshold
    /// win condition in `apply_tick`.
    pub async fn stop_simulation(&self) {
        let mut state = self.state.write().await;
        state.world.status = MatchStatus::Finished;
    }

    /// Advance the simulation by one tick, returning the new snapshot.
    ///
    /// Persistence writes (event log appends, final bot stats, match record
    /// update) happen strictly after the write lock is released.
    pub async fn tick(&self) -> Result<WorldState, SimulationError> {
        let (next, roster_snapshot) = {
            let mut state = self.state.write().await;
            if state.world.status != MatchStatus::Running {
                return Err(SimulationError::NotRunning);
            }
            let mut next = apply_tick(&state.world, &self.arena, &state.intents);
            next.tick = state.world.tick + 1;
            state.intents.clear();

            for event in &next.events {
                if let SimulationEvent::Death { bot_id, killer_id, .. } = event {
                    if let Some(entry) = state.roster.get_mut(bot_id) {
                        entry.deaths += 1;
                    }
                    if let Some(killer_id) = killer_id {
                        if let Some(entry) = state.roster.get_mut(killer_id) {
                            entry.kills += 1;
                        }
                    }
                }
            }

            state.world = next.clone();
            (next, state.roster.clone())
        };

        self.persist_events(&next);

        if next.status == MatchStatus::Finished {
            self.finalize_match(&next, &roster_snapshot);
        }

        Ok(next)
    }

    fn persist_events(&self, world: &WorldState) {
        for event in &world.events {
            let payload = match bincode::serde::encode_to_vec(event, bincode::config::standard()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(match_id = %self.match_id, error = %err, "failed to encode event for persistence");
                    continue;
                }
            };
            let log = EventLog {
                match_id: self.match_id.clone(),
                tick: event.tick(),
                event_type: event.type_tag().to_string(),
                payload,
            };
            if let Err(err) = self.persistence.append_event(log) {
                warn!(match_id = %self.match_id, error = %err, "failed to persist event");
            }
        }
    }

    fn finalize_match(&self, world: &WorldState, roster: &HashMap<Uuid, RosterEntry>) {
        info!(match_id = %self.match_id, tick = world.tick, "match finished");

        let winner_id = world
            .events
            .iter()
            .find_map(|e| match e {
                SimulationEvent::MatchFinished { winner_id, .. } => Some(*winner_id),
                _ => None,
            })
            .flatten();

        for (bot_id, entry) in roster {
            // upsert_bot replaces the whole record, so it only runs for a bot
            // seen for the first time; an existing record's accumulated wins
            // must survive across matches.
            if self.persistence.get_bot(*bot_id).is_err() {
                if let Err(err) = self.persistence.upsert_bot(BotRecord {
                    id: *bot_id,
                    name: entry.name.clone(),
                    image: String::new(),
                    wins: 0,
                    kills: 0,
                    deaths: 0,
                }) {
                    warn!(bot_id = %bot_id, error = %err, "failed to create bot record before stat recording");
                }
            }
            if let Err(err) = self.persistence.record_bot_stats(*bot_id, entry.kills, entry.deaths) {
                warn!(bot_id = %bot_id, error = %err, "failed to record bot stats");
            }
        }

        if let Some(winner) = winner_id {
            if let Err(err) = self.persistence.increment_bot_win(winner) {
                warn!(bot_id = %winner, error = %err, "failed to increment win count");
            }
        }

        let created_at_unix_ms = now_unix_ms() - (world.tick as i64 * self.tick_duration.as_millis() as i64);
        let record = MatchRecord {
            id: self.match_id.clone(),
            status: MatchStatus::Finished,
            winner_id,
            arena: self.arena,
            created_at_unix_ms,
            finished_at_unix_ms: Some(now_unix_ms()),
        };
        if self.persistence.get_match(&self.match_id).is_ok() {
            let _ = self.persistence.update_match(record);
        } else {
            let _ = self.persistence.create_match(record);
        }
    }
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
