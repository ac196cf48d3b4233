//! Single cooperative reactor that fans a match's world-state stream out to
//! every locally connected spectator.
//!
//! Each spectator has a bounded channel; a slow spectator that can't keep up
//! has frames dropped rather than being allowed to back-pressure the whole
//! broadcast (`try_send`, never `send`).

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 32;

enum HubCommand {
    Register { id: Uuid, sender: mpsc::Sender<Vec<u8>> },
    Unregister { id: Uuid },
    Broadcast(Vec<u8>),
}

#[derive(Clone)]
pub struct FanoutHub {
    commands: mpsc::Sender<HubCommand>,
}

impl FanoutHub {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(reactor(rx));
        Self { commands: tx }
    }

    /// Register a new spectator and return the receiving half of its channel.
    pub async fn register(&self, id: Uuid) -> mpsc::Receiver<Vec<u8>> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let _ = self.commands.send(HubCommand::Register { id, sender }).await;
        receiver
    }

    pub async fn unregister(&self, id: Uuid) {
        let _ = self.commands.send(HubCommand::Unregister { id }).await;
    }

    pub async fn broadcast(&self, payload: Vec<u8>) {
        let _ = self.commands.send(HubCommand::Broadcast(payload)).await;
    }
}

async fn reactor(mut commands: mpsc::Receiver<HubCommand>) {
    let mut subscribers: HashMap<Uuid, mpsc::Sender<Vec<u8>>> = HashMap::new();
    while let Some(cmd) = commands.recv().await {
        match cmd {
            HubCommand::Register { id, sender } => {
                subscribers.insert(id, sender);
            }
            HubCommand::Unregister { id } => {
                subscribers.remove(&id);
            }
            HubCommand::Broadcast(payload) => {
                subscribers.retain(|_, sender| match sender.try_send(payload.clone()) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn registered_subscriber_receives_broadcast() {
        let hub = FanoutHub::spawn();
        let id = Uuid::new_v4();
        let mut rx = hub.register(id).await;
        hub.broadcast(b"tick".to_vec()).await;
        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, b"tick");
    }

    #[tokio::test]
    async fn unregistered_subscriber_receives_nothing() {
        let hub = FanoutHub::spawn();
        let id = Uuid::new_v4();
        let mut rx = hub.register(id).await;
        hub.unregister(id).await;
        hub.broadcast(b"tick".to_vec()).await;
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "should not have received a message after unregister");
    }

    #[tokio::test]
    async fn slow_subscriber_drops_frames_instead_of_blocking() {
        let hub = FanoutHub::spawn();
        let id = Uuid::new_v4();
        let _rx = hub.register(id).await; // never drained
        for i in 0..(SUBSCRIBER_CHANNEL_CAPACITY + 10) {
            hub.broadcast(vec![i as u8]).await;
        }
        // If broadcast blocked on a full subscriber channel this would hang
        // past the test harness timeout instead of returning.
    }
}
