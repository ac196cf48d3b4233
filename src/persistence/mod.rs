//! Storage interface for match records, event logs and bot stat tracking.
//!
//! No concrete database is wired up (out of scope); `InMemoryPersistence`
//! exists so the crate runs and tests standalone, and a real backend is a
//! drop-in implementation of the same trait.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{Arena, MatchStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub status: MatchStatus,
    pub winner_id: Option<Uuid>,
    pub arena: Arena,
    pub created_at_unix_ms: i64,
    pub finished_at_unix_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pub match_id: String,
    pub tick: u64,
    /// Stable type tag, see `SimulationEvent::type_tag`.
    pub event_type: String,
    /// Opaque bincode-encoded `SimulationEvent`, not interpreted here.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotRecord {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub wins: u32,
    pub kills: u32,
    pub deaths: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("match not found: {0}")]
    MatchNotFound(String),
    #[error("bot not found: {0}")]
    BotNotFound(Uuid),
}

pub trait Persistence: Send + Sync {
    fn create_match(&self, record: MatchRecord) -> Result<(), PersistenceError>;
    fn update_match(&self, record: MatchRecord) -> Result<(), PersistenceError>;
    fn get_match(&self, match_id: &str) -> Result<MatchRecord, PersistenceError>;
    fn list_matches(&self) -> Vec<MatchRecord>;

    fn append_event(&self, log: EventLog) -> Result<(), PersistenceError>;
    /// Events for a match, ordered by tick ascending. `start_tick`/`end_tick`
    /// bound the range; `None` on either side means unbounded.
    fn get_events(&self, match_id: &str, start_tick: Option<u64>, end_tick: Option<u64>) -> Vec<EventLog>;

    fn upsert_bot(&self, bot: BotRecord) -> Result<(), PersistenceError>;
    fn record_bot_stats(&self, bot_id: Uuid, kills: u32, deaths: u32) -> Result<(), PersistenceError>;
    fn increment_bot_win(&self, bot_id: Uuid) -> Result<(), PersistenceError>;
    fn get_bot(&self, bot_id: Uuid) -> Result<BotRecord, PersistenceError>;
}

#[derive(Default)]
pub struct InMemoryPersistence {
    matches: Mutex<HashMap<String, MatchRecord>>,
    events: Mutex<HashMap<String, Vec<EventLog>>>,
    bots: Mutex<HashMap<Uuid, BotRecord>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn create_match(&self, record: MatchRecord) -> Result<(), PersistenceError> {
        self.matches.lock().insert(record.id.clone(), record);
        Ok(())
    }

    fn update_match(&self, record: MatchRecord) -> Result<(), PersistenceError> {
        let mut matches = self.matches.lock();
        if !matches.contains_key(&record.id) {
            return Err(PersistenceError::MatchNotFound(record.id));
        }
        matches.insert(record.id.clone(), record);
        Ok(())
    }

    fn get_match(&self, match_id: &str) -> Result<MatchRecord, PersistenceError> {
        self.matches
            .lock()
            .get(match_id)
            .cloned()
            .ok_or_else(|| PersistenceError::MatchNotFound(match_id.to_string()))
    }

    fn list_matches(&self) -> Vec<MatchRecord> {
        let mut matches: Vec<MatchRecord> = self.matches.lock().values().cloned().collect();
        matches.sort_by_key(|m| std::cmp::Reverse(m.created_at_unix_ms));
        matches
    }

    fn append_event(&self, log: EventLog) -> Result<(), PersistenceError> {
        self.events.lock().entry(log.match_id.clone()).or_default().push(log);
        Ok(())
    }

    fn get_events(&self, match_id: &str, start_tick: Option<u64>, end_tick: Option<u64>) -> Vec<EventLog> {
        let mut logs = self.events.lock().get(match_id).cloned().unwrap_or_default();
        logs.sort_by_key(|l| l.tick);
        logs.retain(|l| {
            start_tick.map_or(true, |s| l.tick >= s) && end_tick.map_or(true, |e| l.tick <= e)
        });
        logs
    }

    fn upsert_bot(&self, bot: BotRecord) -> Result<(), PersistenceError> {
        self.bots.lock().insert(bot.id, bot);
        Ok(())
    }

    fn record_bot_stats(&self, bot_id: Uuid, kills: u32, deaths: u32) -> Result<(), PersistenceError> {
        let mut bots = self.bots.lock();
        let record = bots
            .get_mut(&bot_id)
            .ok_or(PersistenceError::BotNotFound(bot_id))?;
        record.kills += kills;
        record.deaths += deaths;
        Ok(())
    }

    fn increment_bot_win(&self, bot_id: Uuid) -> Result<(), PersistenceError> {
        let mut bots = self.bots.lock();
        let record = bots
            .get_mut(&bot_id)
            .ok_or(PersistenceError::BotNotFound(bot_id))?;
        record.wins += 1;
        Ok(())
    }

    fn get_bot(&self, bot_id: Uuid) -> Result<BotRecord, PersistenceError> {
        self.bots
            .lock()
            .get(&bot_id)
            .cloned()
            .ok_or(PersistenceError::BotNotFound(bot_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch_match() {
        let store = InMemoryPersistence::new();
        let record = MatchRecord {
            id: "match-1".into(),
            status: MatchStatus::Pending,
            winner_id: None,
            arena: Arena::default(),
            created_at_unix_ms: 0,
            finished_at_unix_ms: None,
        };
        store.create_match(record.clone()).unwrap();
        let fetched = store.get_match("match-1").unwrap();
        assert_eq!(fetched.id, record.id);
    }

    #[test]
    fn unknown_match_errors() {
        let store = InMemoryPersistence::new();
        assert!(matches!(
            store.get_match("nope"),
            Err(PersistenceError::MatchNotFound(_))
        ));
    }

    #[test]
    fn bot_stats_accumulate() {
        let store = InMemoryPersistence::new();
        let bot_id = Uuid::new_v4();
        store
            .upsert_bot(BotRecord {
                id: bot_id,
                name: "alpha".into(),
                ..Default::default()
            })
            .unwrap();
        store.record_bot_stats(bot_id, 2, 0).unwrap();
        store.record_bot_stats(bot_id, 1, 1).unwrap();
        store.increment_bot_win(bot_id).unwrap();

        let record = store.get_bot(bot_id).unwrap();
        assert_eq!(record.kills, 3);
        assert_eq!(record.deaths, 1);
        assert_eq!(record.wins, 1);
    }

    #[test]
    fn list_matches_is_ordered_newest_first() {
        let store = InMemoryPersistence::new();
        let make = |id: &str, created_at_unix_ms: i64| MatchRecord {
            id: id.to_string(),
            status: MatchStatus::Pending,
            winner_id: None,
            arena: Arena::default(),
            created_at_unix_ms,
            finished_at_unix_ms: None,
        };
        store.create_match(make("oldest", 100)).unwrap();
        store.create_match(make("newest", 300)).unwrap();
        store.create_match(make("middle", 200)).unwrap();

        let ids: Vec<String> = store.list_matches().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn get_events_filters_by_tick_range_and_sorts_ascending() {
        let store = InMemoryPersistence::new();
        for tick in [5, 1, 3] {
            store
                .append_event(EventLog {
                    match_id: "match-1".to_string(),
                    tick,
                    event_type: "*pb.SimulationEvent_Death".to_string(),
                    payload: vec![],
                })
                .unwrap();
        }

        let all = store.get_events("match-1", None, None);
        assert_eq!(all.iter().map(|l| l.tick).collect::<Vec<_>>(), vec![1, 3, 5]);

        let bounded = store.get_events("match-1", Some(2), Some(5));
        assert_eq!(bounded.iter().map(|l| l.tick).collect::<Vec<_>>(), vec![3, 5]);
    }
}
