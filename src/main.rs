use std::sync::Arc;

use codearena_core::config::Config;
use codearena_core::engine::{game_loop, Arena};
use codearena_core::match_registry::MatchRegistry;
use codearena_core::metrics::Metrics;
use codearena_core::net::listener::WebTransportListener;
use codearena_core::net::{
    watcher, FanoutHub, InProcessLockStore, InProcessPubSub, LockStore, PubSub, StreamGateway,
};
use codearena_core::persistence::InMemoryPersistence;
use codearena_core::scheduler::{LoggingBotRunner, SandboxScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_tracing(&config);

    tracing::info!(
        realtime_port = config.realtime_port,
        tick_rate = config.tick_rate,
        "starting codearena"
    );

    let metrics = Arc::new(Metrics::new());
    let persistence = Arc::new(InMemoryPersistence::new());
    let pubsub: Arc<InProcessPubSub> = Arc::new(InProcessPubSub::new());
    let lock_store = Arc::new(InProcessLockStore::new());
    let node_id = uuid::Uuid::new_v4().to_string();

    let registry = Arc::new(MatchRegistry::new(persistence.clone(), pubsub.clone() as Arc<dyn PubSub>));
    // Handles RuntimeRequest::{StartBot,StopBot,GetRuntimeStats} via
    // handle_request; no gRPC surface is implemented in this binary, so the
    // dispatcher itself sits unused here, but runtime_stats() is read at
    // shutdown below.
    let scheduler = Arc::new(SandboxScheduler::new(
        Arc::new(LoggingBotRunner),
        config.max_concurrent_bots,
    ));

    let arena = Arena::new(config.arena_width, config.arena_height);
    let match_id = format!("match-{}", uuid::Uuid::new_v4());
    let engine = registry
        .start_simulation(match_id.clone(), arena, config.tick_duration())
        .await;

    let hub = FanoutHub::spawn();
    let gateway = Arc::new(StreamGateway::new(engine.clone(), hub.clone(), config.jwt_secret.clone().into_bytes()));

    let (world_tx, world_rx) = tokio::sync::mpsc::channel(64);
    let (loop_shutdown_tx, loop_shutdown_rx) = tokio::sync::mpsc::channel(1);

    let loop_handle = tokio::spawn(game_loop::run(
        engine.clone(),
        config.tick_duration(),
        world_tx,
        loop_shutdown_rx,
        metrics.clone(),
    ));

    let watcher_handle = if !config.no_realtime {
        let pubsub_dyn: Arc<dyn PubSub> = pubsub.clone();
        let lock_dyn: Arc<dyn LockStore> = lock_store.clone();
        Some(tokio::spawn(watcher::run(
            match_id.clone(),
            node_id.clone(),
            lock_dyn,
            pubsub_dyn,
            world_rx,
        )))
    } else {
        None
    };

    let listener = WebTransportListener::bind(config.realtime_port, gateway.clone()).await?;
    let listener_handle = tokio::spawn(async move {
        if let Err(err) = listener.run().await {
            tracing::error!(error = %err, "realtime listener exited");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    let _ = loop_shutdown_tx.send(()).await;
    listener_handle.abort();
    if let Err(err) = loop_handle.await {
        tracing::warn!(error = %err, "game loop task did not shut down cleanly");
    }
    if let Some(handle) = watcher_handle {
        handle.abort();
    }
    registry.stop_simulation(&match_id).await;

    let runtime_stats = scheduler.runtime_stats();
    tracing::info!(
        ticks = metrics.snapshot().ticks_processed,
        active_containers = runtime_stats.active_containers,
        "codearena shut down"
    );
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
