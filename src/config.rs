//! Environment-driven configuration. `CODEARENA_*` variables (dashes in the
//! option name become underscores), each with a default so the binary runs
//! out of the box. No CLI flag parser — the command-line front-end is out
//! of scope.

use std::env;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub grpc_port: u16,
    pub web_port: u16,
    pub realtime_port: u16,
    pub runtime_addr: String,
    pub no_realtime: bool,
    pub arena_width: f32,
    pub arena_height: f32,
    pub tick_rate: u32,
    pub redis_addr: String,
    pub db_path: String,
    pub max_concurrent_bots: usize,
    pub log_level: String,
    pub log_format: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            grpc_port: env_parse("CODEARENA_GRPC_PORT", 50051),
            web_port: env_parse("CODEARENA_WEB_PORT", 50052),
            realtime_port: env_parse("CODEARENA_REALTIME_PORT", 8081),
            runtime_addr: env_string("CODEARENA_RUNTIME_ADDR", "localhost:50053"),
            no_realtime: env_parse("CODEARENA_NO_REALTIME", false),
            arena_width: env_parse("CODEARENA_ARENA_WIDTH", 800.0),
            arena_height: env_parse("CODEARENA_ARENA_HEIGHT", 600.0),
            tick_rate: env_parse("CODEARENA_TICK_RATE", 60),
            redis_addr: env_string("CODEARENA_REDIS_ADDR", "localhost:6379"),
            db_path: env_string("CODEARENA_DB_PATH", "codearena.db"),
            max_concurrent_bots: env_parse("CODEARENA_MAX_CONCURRENT_BOTS", 10),
            log_level: env_string("CODEARENA_LOG_LEVEL", "info"),
            log_format: env_string("CODEARENA_LOG_FORMAT", "text"),
            jwt_secret: env_string("CODEARENA_JWT_SECRET", "dev-insecure-secret"),
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, raw, "invalid value, falling back to default");
            default
        }),
        Err(_) => default,
    }
}
