//! `MatchService`-style read surface: which matches are live on this node,
//! what's been persisted, and how to subscribe to a match already in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::simulation::SimulationEngine;
use crate::engine::{Arena, SimulationEvent};
use crate::net::pubsub::PubSub;
use crate::net::watcher::pubsub_channel;
use crate::persistence::{EventLog, MatchRecord, Persistence, PersistenceError};

/// A single notable moment surfaced by `GetMatchHighlights`: a death or the
/// match's conclusion, with enough to sort and render without decoding the
/// underlying event payload again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightMoment {
    pub tick: u64,
    pub event_type: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchRegistryError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct MatchRegistry {
    persistence: Arc<dyn Persistence>,
    pubsub: Arc<dyn PubSub>,
    active: Mutex<HashMap<String, Arc<SimulationEngine>>>,
}

impl MatchRegistry {
    pub fn new(persistence: Arc<dyn Persistence>, pubsub: Arc<dyn PubSub>) -> Self {
        Self {
            persistence,
            pubsub,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_active(&self, engine: Arc<SimulationEngine>) {
        self.active.lock().insert(engine.match_id().to_string(), engine);
    }

    pub fn unregister_active(&self, match_id: &str) {
        self.active.lock().remove(match_id);
    }

    /// `SimulationService::StartSimulation`: build a fresh engine for the
    /// given arena, register it as active, and flip it into `Running`.
    /// `Arena` is fixed for the lifetime of an engine, so honoring a
    /// caller-supplied `ArenaConfig` means constructing a new engine here
    /// rather than mutating one already in flight.
    pub async fn start_simulation(&self, match_id: String, arena: Arena, tick_duration: Duration) -> Arc<SimulationEngine> {
        let engine = Arc::new(SimulationEngine::new(match_id, arena, tick_duration, self.persistence.clone()));
        engine.start_simulation().await;
        self.register_active(engine.clone());
        engine
    }

    /// `SimulationService::StopSimulation`: mark the engine finished and drop
    /// it from the active set. Returns `false` if no such match is active.
    pub async fn stop_simulation(&self, match_id: &str) -> bool {
        let engine = self.active.lock().get(match_id).cloned();
        let Some(engine) = engine else { return false };
        engine.stop_simulation().await;
        self.unregister_active(match_id);
        true
    }

    pub fn list_active_matches(&self) -> Vec<String> {
        self.active.lock().keys().cloned().collect()
    }

    pub fn list_matches(&self) -> Vec<MatchRecord> {
        self.persistence.list_matches()
    }

    /// `MatchService::GetMatchReplay`: the event log for a match, optionally
    /// scoped to `[start_tick, end_tick]`. `None` on either bound means
    /// unbounded in that direction.
    pub fn get_match_replay(&self, match_id: &str, start_tick: Option<u64>, end_tick: Option<u64>) -> Vec<EventLog> {
        self.persistence.get_events(match_id, start_tick, end_tick)
    }

    /// Decoded, stable-tag-filtered highlight moments for a finished match:
    /// deaths and the final match result, in tick order.
    pub fn get_match_highlights(
        &self,
        match_id: &str,
        name_of: impl Fn(Uuid) -> String,
    ) -> Vec<HighlightMoment> {
        let logs = self.persistence.get_events(match_id, None, None);

        logs.into_iter()
            .filter(|l| {
                l.event_type == "*pb.SimulationEvent_Death"
                    || l.event_type == "*pb.SimulationEvent_MatchFinished"
            })
            .filter_map(|l| {
                bincode::serde::decode_from_slice::<SimulationEvent, _>(&l.payload, bincode::config::standard())
                    .ok()
                    .map(|(event, _)| HighlightMoment {
                        tick: l.tick,
                        event_type: l.event_type,
                        description: event.describe(&name_of),
                    })
            })
            .collect()
    }

    /// Subscribe to the live fan-out stream for a match, regardless of which
    /// node is actually running its simulation.
    pub fn watch_match(&self, match_id: &str) -> broadcast::Receiver<Vec<u8>> {
        self.pubsub.subscribe(&pubsub_channel(match_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Arena;
    use crate::net::pubsub::InProcessPubSub;
    use crate::persistence::InMemoryPersistence;

    #[test]
    fn highlights_are_filtered_to_death_and_finish_tags() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let pubsub = Arc::new(InProcessPubSub::new());
        let registry = MatchRegistry::new(persistence.clone(), pubsub);

        let bot_id = Uuid::new_v4();
        let hit = SimulationEvent::HitByBullet {
            tick: 1,
            bullet_id: Uuid::new_v4(),
            target_id: bot_id,
            shooter_id: Uuid::new_v4(),
            damage: 5.0,
        };
        let death = SimulationEvent::Death {
            tick: 2,
            bot_id,
            killer_id: None,
        };
        for (tick, event) in [(1u64, &hit), (2, &death)] {
            let payload = bincode::serde::encode_to_vec(event, bincode::config::standard()).unwrap();
            persistence
                .append_event(EventLog {
                    match_id: "m1".to_string(),
                    tick,
                    event_type: event.type_tag().to_string(),
                    payload,
                })
                .unwrap();
        }

        let highlights = registry.get_match_highlights("m1", |_| "bot".to_string());
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].tick, 2);
        assert_eq!(highlights[0].event_type, "*pb.SimulationEvent_Death");
        assert!(highlights[0].description.contains("destroyed"));
    }

    #[test]
    fn get_match_replay_honors_tick_bounds() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let pubsub = Arc::new(InProcessPubSub::new());
        let registry = MatchRegistry::new(persistence.clone(), pubsub);

        for tick in [1u64, 5, 9] {
            persistence
                .append_event(EventLog {
                    match_id: "m1".to_string(),
                    tick,
                    event_type: "*pb.SimulationEvent_HitByBullet".to_string(),
                    payload: vec![],
                })
                .unwrap();
        }

        let full = registry.get_match_replay("m1", None, None);
        assert_eq!(full.len(), 3);

        let bounded = registry.get_match_replay("m1", Some(2), Some(9));
        assert_eq!(bounded.iter().map(|l| l.tick).collect::<Vec<_>>(), vec![5, 9]);
    }

    #[test]
    fn list_active_matches_reflects_registration() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let pubsub = Arc::new(InProcessPubSub::new());
        let registry = MatchRegistry::new(persistence.clone(), pubsub);
        let engine = Arc::new(SimulationEngine::new(
            "m2".to_string(),
            Arena::default(),
            std::time::Duration::from_millis(16),
            persistence,
        ));
        registry.register_active(engine);
        assert_eq!(registry.list_active_matches(), vec!["m2".to_string()]);
        registry.unregister_active("m2");
        assert!(registry.list_active_matches().is_empty());
    }
}
