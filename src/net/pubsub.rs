//! Publish/subscribe substrate backing the fan-out hub across nodes.
//!
//! Only an in-process implementation ships here (single-node deployment);
//! a Redis-backed implementation of the same trait is a drop-in for a
//! horizontally scaled deployment, see DESIGN.md.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

pub trait PubSub: Send + Sync {
    fn publish(&self, channel: &str, payload: Vec<u8>);
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Vec<u8>>;
}

const CHANNEL_CAPACITY: usize = 256;

pub struct InProcessPubSub {
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl InProcessPubSub {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for InProcessPubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSub for InProcessPubSub {
    fn publish(&self, channel: &str, payload: Vec<u8>) {
        let sender = self.sender_for(channel);
        // No subscribers is not an error: a channel with nobody watching yet
        // simply drops the message, matching pub/sub-at-most-once semantics.
        let _ = sender.send(payload);
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Vec<u8>> {
        self.sender_for(channel).subscribe()
    }
}
