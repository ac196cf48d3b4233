//! Wire message types exchanged over the framed duplex streams.
//!
//! `BotService::Connect` is a bidirectional stream of `BotMessage` from the
//! bot and `ArenaMessage` from the server. Spectators receive a one-way
//! stream of `ArenaMessage::World`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{Arena, BotClass, BotIntent, WorldState};
use crate::scheduler::RuntimeStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BotMessage {
    /// First message a bot must send after the stream opens.
    Hello {
        bot_id: Uuid,
        name: String,
        class: BotClass,
    },
    Intent(BotIntent),
    Disconnect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArenaMessage {
    Welcome { match_id: String, arena: Arena },
    World(WorldState),
    Error(String),
}

/// `SimulationService::StartSimulation`'s arena dimensions, carried
/// separately from `Arena` itself since a fresh match needs only width and
/// height, not the arena's other (currently none) derived state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
}

/// Message types backing `SimulationService`, realized as plain request/
/// response enums over the same framed transport as `BotMessage`/
/// `ArenaMessage` rather than a separate RPC stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationRequest {
    StartSimulation { match_id: String, arena: ArenaConfig },
    StopSimulation { match_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationResponse {
    Started { match_id: String },
    Stopped { found: bool },
}

/// Message types backing `RuntimeService`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuntimeRequest {
    StartBot { bot_id: Uuid, image: String },
    StopBot { bot_id: Uuid },
    GetRuntimeStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeResponse {
    StartBot {
        success: bool,
        container_id: Option<String>,
        queued: bool,
        queue_position: Option<usize>,
        error_message: Option<String>,
    },
    StopBot {
        success: bool,
    },
    RuntimeStats(RuntimeStats),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serde::encode_to_vec(message, bincode::config::standard()).map_err(Into::into)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_hello_roundtrips() {
        let msg = BotMessage::Hello {
            bot_id: Uuid::new_v4(),
            name: "alpha".to_string(),
            class: BotClass::Scout,
        };
        let bytes = encode(&msg).unwrap();
        let decoded: BotMessage = decode(&bytes).unwrap();
        match decoded {
            BotMessage::Hello { name, .. } => assert_eq!(name, "alpha"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn arena_error_roundtrips() {
        let msg = ArenaMessage::Error("bad intent".to_string());
        let bytes = encode(&msg).unwrap();
        let decoded: ArenaMessage = decode(&bytes).unwrap();
        match decoded {
            ArenaMessage::Error(text) => assert_eq!(text, "bad intent"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn simulation_request_roundtrips() {
        let msg = SimulationRequest::StartSimulation {
            match_id: "match-1".to_string(),
            arena: ArenaConfig { width: 800.0, height: 600.0 },
        };
        let bytes = encode(&msg).unwrap();
        let decoded: SimulationRequest = decode(&bytes).unwrap();
        match decoded {
            SimulationRequest::StartSimulation { match_id, arena } => {
                assert_eq!(match_id, "match-1");
                assert_eq!(arena.width, 800.0);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn runtime_stats_response_roundtrips() {
        let msg = RuntimeResponse::RuntimeStats(RuntimeStats {
            active_containers: 3,
            memory_usage_mb: 0.0,
            cpu_usage_percent: 0.0,
        });
        let bytes = encode(&msg).unwrap();
        let decoded: RuntimeResponse = decode(&bytes).unwrap();
        match decoded {
            RuntimeResponse::RuntimeStats(stats) => assert_eq!(stats.active_containers, 3),
            _ => panic!("wrong variant"),
        }
    }
}
