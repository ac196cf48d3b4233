//! Leader-elected watcher: exactly one node per match consumes the engine's
//! tick stream and republishes it on the shared pub/sub channel, so
//! horizontally scaled gateway nodes all see the same stream regardless of
//! which node is actually running the simulation.
//!
//! Election is a CAS over `LockStore`, keyed `match:watcher:<match_id>`,
//! with a 10s TTL. A dedicated heartbeat task refreshes the lease every 3s
//! in addition to the per-message refresh in the consume loop — a quiet (but
//! alive) match would otherwise risk losing the lease to another node
//! between ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::world::{MatchStatus, WorldState};
use crate::net::lock::LockStore;
use crate::net::protocol::{self, ArenaMessage};
use crate::net::pubsub::PubSub;

const LEASE_TTL: Duration = Duration::from_secs(10);
const ACQUIRE_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
const STREAM_ERROR_RETRY_INTERVAL: Duration = Duration::from_secs(2);

pub fn pubsub_channel(match_id: &str) -> String {
    format!("match:{match_id}")
}

fn lease_key(match_id: &str) -> String {
    format!("match:watcher:{match_id}")
}

/// Run the watcher for one match until the match finishes or `world_rx`
/// closes for good. Blocks (retrying every 5s) until this node wins the
/// election, and if the lease is lost mid-stream (rather than the match
/// finishing cleanly), sleeps 2s and retries the whole acquire-and-consume
/// cycle from the top, re-contesting the lock.
pub async fn run(
    match_id: String,
    node_id: String,
    lock: Arc<dyn LockStore>,
    pubsub: Arc<dyn PubSub>,
    mut world_rx: mpsc::Receiver<WorldState>,
) {
    let key = lease_key(&match_id);
    let channel = pubsub_channel(&match_id);

    loop {
        while !lock.try_acquire(&key, &node_id, LEASE_TTL) {
            tokio::time::sleep(ACQUIRE_RETRY_INTERVAL).await;
        }
        info!(match_id = %match_id, node_id = %node_id, "acquired watcher lease");

        let heartbeat = {
            let lock = lock.clone();
            let key = key.clone();
            let node_id = node_id.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
                loop {
                    ticker.tick().await;
                    if !lock.refresh(&key, &node_id, LEASE_TTL) {
                        warn!(match_id = %node_id, "heartbeat refresh failed, lease likely lost");
                        break;
                    }
                }
            })
        };

        let mut finished = false;
        let mut lease_lost = false;
        loop {
            let Some(world) = world_rx.recv().await else {
                // The channel closing without ever seeing `Finished` is a
                // stream error, not a clean shutdown: re-contest the lock.
                break;
            };
            finished = world.status == MatchStatus::Finished;
            match protocol::encode(&ArenaMessage::World(world)) {
                Ok(bytes) => pubsub.publish(&channel, bytes),
                Err(err) => warn!(match_id = %match_id, error = %err, "failed to encode world state"),
            }
            if finished {
                break;
            }
            if !lock.refresh(&key, &node_id, LEASE_TTL) {
                warn!(match_id = %match_id, node_id = %node_id, "lease refresh failed mid-stream, re-contesting");
                lease_lost = true;
                break;
            }
        }

        heartbeat.abort();
        lock.release(&key, &node_id);

        if finished {
            info!(match_id = %match_id, node_id = %node_id, "released watcher lease");
            return;
        }

        if lease_lost {
            warn!(match_id = %match_id, node_id = %node_id, "stream error, retrying from the top");
        } else {
            warn!(match_id = %match_id, node_id = %node_id, "world channel closed unexpectedly, retrying from the top");
        }
        tokio::time::sleep(STREAM_ERROR_RETRY_INTERVAL).await;
    }
}
