//! Paces the simulation engine at a fixed tick rate.
//!
//! Timing policy: rate-paced via `tokio::time::interval`, no catch-up burst
//! after a stall and no wall-clock compensation — if a tick runs long the
//! next `interval` tick simply fires as soon as it can, it does not try to
//! replay missed ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error};

use crate::engine::simulation::{SimulationEngine, SimulationError};
use crate::engine::world::{MatchStatus, WorldState};
use crate::metrics::Metrics;

/// Drives `engine` one tick per `tick_duration` until the match finishes or
/// `shutdown` fires, publishing every resulting snapshot on `broadcast`.
pub async fn run(
    engine: Arc<SimulationEngine>,
    tick_duration: Duration,
    broadcast: mpsc::Sender<WorldState>,
    mut shutdown: mpsc::Receiver<()>,
    metrics: Arc<Metrics>,
) {
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.tick().await {
                    Ok(world) => {
                        metrics.record_tick();
                        let finished = world.status == MatchStatus::Finished;
                        if finished {
                            metrics.record_match_finished();
                        }
                        if broadcast.send(world).await.is_err() {
                            debug!(match_id = engine.match_id(), "broadcast receiver dropped, stopping loop");
                            return;
                        }
                        if finished {
                            debug!(match_id = engine.match_id(), "match finished, stopping game loop");
                            return;
                        }
                    }
                    Err(SimulationError::NotRunning) => {
                        // No bots registered yet; keep pacing until the first
                        // `set_bot` call transitions the match to Running.
                        continue;
                    }
                    Err(err) => {
                        error!(match_id = engine.match_id(), error = %err, "tick failed");
                        return;
                    }
                }
            }
            _ = shutdown.recv() => {
                debug!(match_id = engine.match_id(), "game loop received shutdown signal");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arena::Arena;
    use crate::engine::bot::{BotClass, BotState};
    use crate::persistence::InMemoryPersistence;
    use crate::util::vec2::Vec2;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn loop_stops_on_shutdown_signal() {
        let engine = Arc::new(SimulationEngine::new(
            "loop-test".to_string(),
            Arena::default(),
            Duration::from_millis(5),
            Arc::new(InMemoryPersistence::new()),
        ));
        engine
            .set_bot(BotState::new(Uuid::new_v4(), "a", BotClass::Tank, Vec2::new(10.0, 10.0)))
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let metrics = Arc::new(crate::metrics::Metrics::new());

        let handle = tokio::spawn(run(engine.clone(), Duration::from_millis(5), tx, shutdown_rx, metrics));
        let _ = rx.recv().await;
        shutdown_tx.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop task should exit promptly")
            .unwrap();
    }
}
