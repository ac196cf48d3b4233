//! The stream gateway: bot duplex sessions, spectator read-only sessions,
//! and the entry point the game loop uses to fan a tick out to everyone
//! currently watching this node.
//!
//! Per-connection logic is written against `AsyncRead + AsyncWrite` rather
//! than a concrete `wtransport` stream type, so it is exercised directly in
//! tests over an in-memory duplex pipe; `serve_bot_connection` /
//! `serve_spectator_connection` are the thin adapters a real WebTransport
//! listener calls into.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::simulation::SimulationEngine;
use crate::engine::{constants, BotClass, BotState, WorldState};
use crate::net::auth::{self, AuthError};
use crate::net::framing::{self, FramingError};
use crate::net::hub::FanoutHub;
use crate::net::protocol::{self, ArenaMessage, BotMessage, ProtocolError};
use crate::util::vec2::Vec2;

/// Capacity of the per-gateway bot broadcast channel. A slow bot connection
/// lags rather than backs up the broadcaster; `broadcast::error::RecvError::
/// Lagged` is treated the same as a dropped frame (§4.4's "newest state wins"
/// channel policy).
const BOT_BROADCAST_CAPACITY: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("expected Hello as first message")]
    ExpectedHello,
    #[error("spectator token is not authorized for this match")]
    Unauthorized,
}

pub struct StreamGateway {
    engine: Arc<SimulationEngine>,
    hub: FanoutHub,
    jwt_secret: Vec<u8>,
    /// Raw (unfiltered) world-state broadcast consumed by each bot's send
    /// loop, which applies the per-bot stealth filter before writing.
    /// Separate from `hub`, which fans already-encoded, unfiltered frames
    /// out to spectators.
    bot_broadcast: broadcast::Sender<WorldState>,
}

impl StreamGateway {
    pub fn new(engine: Arc<SimulationEngine>, hub: FanoutHub, jwt_secret: Vec<u8>) -> Self {
        let (bot_broadcast, _) = broadcast::channel(BOT_BROADCAST_CAPACITY);
        Self {
            engine,
            hub,
            jwt_secret,
            bot_broadcast,
        }
    }

    /// Drive one bot's duplex session until it disconnects or the stream
    /// closes. The first message on the stream must be `Hello`. The read
    /// half decodes intents; a concurrent send loop on the write half pushes
    /// every tick's filtered world view, independent of how fast the bot
    /// reads.
    pub async fn handle_bot_stream<S>(&self, stream: S) -> Result<(), GatewayError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut read_half, mut write_half) = tokio::io::split(stream);

        let bytes = framing::read_message(&mut read_half).await?;
        let (bot_id, name, class) = match protocol::decode::<BotMessage>(&bytes)? {
            BotMessage::Hello { bot_id, name, class } => (bot_id, name, class),
            _ => return Err(GatewayError::ExpectedHello),
        };

        let arena = self.engine.arena();
        let spawn_index = self.engine.get_world_state().await.bots.len();
        let spawn = deterministic_spawn_point(&arena, spawn_index);
        self.engine.set_bot(BotState::new(bot_id, name.clone(), class, spawn)).await;
        info!(bot_id = %bot_id, name = %name, match_id = self.engine.match_id(), "bot connected");

        let welcome = ArenaMessage::Welcome {
            match_id: self.engine.match_id().to_string(),
            arena,
        };
        framing::write_message(&mut write_half, &protocol::encode(&welcome)?).await?;

        let mut world_rx = self.bot_broadcast.subscribe();
        let send_task = tokio::spawn(async move {
            loop {
                match world_rx.recv().await {
                    Ok(world) => {
                        let filtered = filter_world_for_bot(&world, bot_id);
                        let Ok(payload) = protocol::encode(&ArenaMessage::World(filtered)) else {
                            continue;
                        };
                        if framing::write_message(&mut write_half, &payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        loop {
            match framing::read_message(&mut read_half).await {
                Ok(bytes) => match protocol::decode::<BotMessage>(&bytes)? {
                    BotMessage::Intent(intent) => {
                        if let Err(err) = self.engine.set_bot_intent(bot_id, intent).await {
                            warn!(bot_id = %bot_id, error = %err, "rejected intent");
                        }
                    }
                    BotMessage::Disconnect => break,
                    BotMessage::Hello { .. } => {
                        // A duplicate Hello after the handshake is ignored
                        // rather than torn down; clients that reconnect
                        // on the same stream without opening a new one
                        // should not lose their slot.
                    }
                },
                Err(FramingError::ConnectionClosed) => break,
                Err(err) => {
                    send_task.abort();
                    return Err(err.into());
                }
            }
        }

        send_task.abort();
        info!(bot_id = %bot_id, match_id = self.engine.match_id(), "bot disconnected");
        Ok(())
    }

    /// Drive one spectator's read-only session until the hub channel closes
    /// or the write side fails. `token` must verify against `jwt_secret` and
    /// (if the claim is present) name this gateway's match.
    pub async fn handle_spectator_stream<S>(&self, mut stream: S, token: &str) -> Result<(), GatewayError>
    where
        S: AsyncWrite + Unpin,
    {
        let claims = auth::verify(token, &self.jwt_secret, now_unix())?;
        if let Some(match_id) = &claims.match_id {
            if match_id != self.engine.match_id() {
                return Err(GatewayError::Unauthorized);
            }
        }

        let id = Uuid::new_v4();
        let mut receiver = self.hub.register(id).await;
        while let Some(payload) = receiver.recv().await {
            if framing::write_message(&mut stream, &payload).await.is_err() {
                break;
            }
        }
        self.hub.unregister(id).await;
        Ok(())
    }

    /// Fan a new world snapshot out to every locally connected spectator
    /// (full state) and every connected bot (filtered per §4.4, via each
    /// bot's own send loop).
    pub async fn broadcast_state(&self, world: WorldState) -> Result<(), GatewayError> {
        let payload = protocol::encode(&ArenaMessage::World(world.clone()))?;
        self.hub.broadcast(payload).await;
        let _ = self.bot_broadcast.send(world);
        Ok(())
    }
}

/// Spawn position for the `index`-th bot to join this match: bot 0 at
/// (100, 100), bot 1 at (600, 400), later bots placed on a golden-angle
/// spiral around the arena center — deterministic in connection order, not
/// random, so replays land bots in the same place.
fn deterministic_spawn_point(arena: &crate::engine::Arena, index: usize) -> Vec2 {
    const GOLDEN_ANGLE_DEGREES: f32 = 137.5;

    match index {
        0 => Vec2::new(100.0, 100.0),
        1 => Vec2::new(600.0, 400.0),
        _ => {
            let (cx, cy) = arena.center();
            let half_extent = arena.width.min(arena.height) / 2.0 - constants::ROBOT_RADIUS * 2.0;
            let radius_fraction = 1.0 - 1.0 / (index as f32 + 1.0).sqrt();
            let angle = (GOLDEN_ANGLE_DEGREES * index as f32).to_radians();
            let r = radius_fraction * half_extent.max(0.0);
            let (x, y) = arena.clamp_position(cx + r * angle.cos(), cy + r * angle.sin(), constants::ROBOT_RADIUS);
            Vec2::new(x, y)
        }
    }
}

/// Apply the stealth-visibility rule to a snapshot for one bot's eyes: the
/// receiving bot always sees its own full state; other bots are hidden only
/// while stealthed and further than `STEALTH_VISIBILITY_RANGE` away.
fn filter_world_for_bot(world: &WorldState, viewer_id: Uuid) -> WorldState {
    let viewer_position = world.bots.iter().find(|b| b.id == viewer_id).map(|b| b.position);
    let Some(viewer_position) = viewer_position else {
        return world.clone();
    };

    let mut filtered = world.clone();
    filtered.bots.retain(|b| {
        b.id == viewer_id
            || !b.is_stealthed
            || viewer_position.distance_to(b.position) <= constants::STEALTH_VISIBILITY_RANGE
    });
    filtered
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arena::Arena;
    use crate::persistence::InMemoryPersistence;
    use std::time::Duration;
    use tokio::io::duplex;

    fn new_gateway() -> (StreamGateway, Arc<SimulationEngine>) {
        let engine = Arc::new(SimulationEngine::new(
            "match-gateway".to_string(),
            Arena::default(),
            Duration::from_millis(16),
            Arc::new(InMemoryPersistence::new()),
        ));
        let hub = FanoutHub::spawn();
        let gateway = StreamGateway::new(engine.clone(), hub, b"secret".to_vec());
        (gateway, engine)
    }

    #[tokio::test]
    async fn bot_handshake_registers_bot_and_sends_welcome() {
        let (gateway, engine) = new_gateway();
        let (mut client, server) = duplex(4096);

        let bot_id = Uuid::new_v4();
        let hello = BotMessage::Hello {
            bot_id,
            name: "alpha".to_string(),
            class: BotClass::Scout,
        };
        framing::write_message(&mut client, &protocol::encode(&hello).unwrap()).await.unwrap();
        framing::write_message(&mut client, &protocol::encode(&BotMessage::Disconnect).unwrap()).await.unwrap();

        gateway.handle_bot_stream(server).await.unwrap();

        let welcome_bytes = framing::read_message(&mut client).await.unwrap();
        let welcome: ArenaMessage = protocol::decode(&welcome_bytes).unwrap();
        assert!(matches!(welcome, ArenaMessage::Welcome { .. }));

        let world = engine.get_world_state().await;
        assert!(world.bots.iter().any(|b| b.id == bot_id));
    }

    #[tokio::test]
    async fn spectator_with_bad_token_is_rejected() {
        let (gateway, _engine) = new_gateway();
        let (_client, server) = duplex(4096);
        let result = gateway.handle_spectator_stream(server, "not-a-jwt").await;
        assert!(matches!(result, Err(GatewayError::Auth(_))));
    }
}
