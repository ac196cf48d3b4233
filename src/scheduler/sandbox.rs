//! Sandbox scheduler: admission control and FIFO queueing for bot
//! containers, grounded directly in the original runtime scheduler.
//!
//! Capacity is reserved with a `PendingStart` sentinel *before* the
//! (slow, fallible) call into the container runtime, and released before
//! that call returns control to the caller — no I/O happens while the
//! scheduler's internal lock is held.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{info, warn};
use uuid::Uuid;

use crate::net::protocol::{RuntimeRequest, RuntimeResponse};

/// Sentinel container id for a slot that has been reserved but whose
/// `start_container` call hasn't returned yet, matching the scheduler's
/// own `active[bot_id] -> container_id | "pending_start"` data model.
const PENDING_START_CONTAINER_ID: &str = "pending_start";

/// Container lifecycle, out of scope to implement concretely; a real
/// implementation (Docker, Firecracker, ...) is supplied by the caller.
///
/// A generic parameter rather than `dyn BotRunner` is used here because
/// native async-fn-in-traits are not object-safe; this keeps the scheduler
/// free of a boxed-future adapter it would otherwise need for dynamic
/// dispatch.
pub trait BotRunner: Send + Sync + 'static {
    fn start_container(
        &self,
        bot_id: Uuid,
        image: &str,
    ) -> impl std::future::Future<Output = Result<String, SchedulerError>> + Send;
    fn stop_container(&self, bot_id: Uuid) -> impl std::future::Future<Output = Result<(), SchedulerError>> + Send;
}

/// A record-keeping fake `BotRunner`: every start/stop "succeeds" instantly
/// and is only logged. Used when no concrete container runtime is wired up
/// (the default for a standalone instance), and in tests.
#[derive(Default)]
pub struct LoggingBotRunner;

impl BotRunner for LoggingBotRunner {
    async fn start_container(&self, bot_id: Uuid, image: &str) -> Result<String, SchedulerError> {
        let container_id = format!("fake-{bot_id}");
        info!(bot_id = %bot_id, image, container_id, "starting bot container (fake runner)");
        Ok(container_id)
    }

    async fn stop_container(&self, bot_id: Uuid) -> Result<(), SchedulerError> {
        info!(bot_id = %bot_id, "stopping bot container (fake runner)");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("container runtime error for bot {0}: {1}")]
    RuntimeError(Uuid, String),
    #[error("bot {0} is already active or queued")]
    AlreadyActive(Uuid),
    #[error("bot {0} is not active")]
    NotActive(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    PendingStart,
    Active(String),
}

impl Slot {
    fn container_id(&self) -> String {
        match self {
            Slot::PendingStart => PENDING_START_CONTAINER_ID.to_string(),
            Slot::Active(container_id) => container_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct QueuedBot {
    bot_id: Uuid,
    image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started { container_id: String },
    Queued { position: usize },
}

/// Snapshot backing `RuntimeService::GetRuntimeStats`. `memory_usage_mb` and
/// `cpu_usage_percent` are honest placeholders: no concrete container
/// runtime is wired up here, only `LoggingBotRunner`'s fake one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub active_containers: usize,
    pub memory_usage_mb: f32,
    pub cpu_usage_percent: f32,
}

struct SchedulerState {
    slots: HashMap<Uuid, Slot>,
    queue: VecDeque<QueuedBot>,
}

const STOP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct SandboxScheduler<R: BotRunner> {
    runner: Arc<R>,
    max_concurrent: usize,
    state: Mutex<SchedulerState>,
    /// Bumped whenever a slot frees up, so a `notify_stop` background task
    /// waiting on a recursive retry doesn't need to poll.
    slot_freed: Arc<Notify>,
}

impl<R: BotRunner> SandboxScheduler<R> {
    pub fn new(runner: Arc<R>, max_concurrent: usize) -> Self {
        Self {
            runner,
            max_concurrent,
            state: Mutex::new(SchedulerState {
                slots: HashMap::new(),
                queue: VecDeque::new(),
            }),
            slot_freed: Arc::new(Notify::new()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn runtime_stats(&self) -> RuntimeStats {
        RuntimeStats {
            active_containers: self.active_count(),
            memory_usage_mb: 0.0,
            cpu_usage_percent: 0.0,
        }
    }

    /// Admit a bot, or queue it if the scheduler is at capacity. Idempotent:
    /// a bot already active or queued returns its existing outcome rather
    /// than being double-admitted or rejected.
    pub async fn start_bot(&self, bot_id: Uuid, image: &str) -> Result<StartOutcome, SchedulerError> {
        // The idempotency check and the reservation must share one critical
        // section: splitting them lets two concurrent calls for the same
        // bot_id both pass the check before either reserves, double-starting
        // a container for one bot.
        enum Admission {
            AlreadyStarted(String),
            AlreadyQueued(usize),
            Reserved,
            Queued(usize),
        }

        let admission = {
            let mut state = self.state.lock();
            if let Some(slot) = state.slots.get(&bot_id) {
                Admission::AlreadyStarted(slot.container_id())
            } else if let Some(position) = state.queue.iter().position(|q| q.bot_id == bot_id) {
                Admission::AlreadyQueued(position + 1)
            } else if state.slots.len() < self.max_concurrent {
                state.slots.insert(bot_id, Slot::PendingStart);
                Admission::Reserved
            } else {
                state.queue.push_back(QueuedBot {
                    bot_id,
                    image: image.to_string(),
                });
                Admission::Queued(state.queue.len())
            }
        };

        match admission {
            Admission::AlreadyStarted(container_id) => return Ok(StartOutcome::Started { container_id }),
            Admission::AlreadyQueued(position) => return Ok(StartOutcome::Queued { position }),
            Admission::Queued(position) => {
                info!(bot_id = %bot_id, position, "bot queued, at capacity");
                return Ok(StartOutcome::Queued { position });
            }
            Admission::Reserved => {}
        }

        // No lock held across this await: the reservation above has already
        // claimed the slot, so a concurrent start_bot can't oversubscribe.
        match self.runner.start_container(bot_id, image).await {
            Ok(container_id) => {
                self.state.lock().slots.insert(bot_id, Slot::Active(container_id.clone()));
                Ok(StartOutcome::Started { container_id })
            }
            Err(err) => {
                self.state.lock().slots.remove(&bot_id);
                self.slot_freed.notify_one();
                Err(err)
            }
        }
    }

    /// Stop a bot and, in the background, try to admit the next queued bot.
    /// That admission runs with a 2-minute timeout per attempt and recurses
    /// to the next queue entry on failure, so one bad image doesn't stall
    /// the rest of the queue indefinitely.
    pub async fn notify_stop(self: &Arc<Self>, bot_id: Uuid) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.lock();
            if state.slots.remove(&bot_id).is_none() {
                return Err(SchedulerError::NotActive(bot_id));
            }
        }
        self.runner.stop_container(bot_id).await?;
        self.slot_freed.notify_one();

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.drain_queue_once().await;
        });
        Ok(())
    }

    async fn drain_queue_once(self: Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            if state.slots.len() >= self.max_concurrent {
                return;
            }
            state.queue.pop_front()
        };

        let Some(next) = next else { return };
        self.state.lock().slots.insert(next.bot_id, Slot::PendingStart);

        let result = tokio::time::timeout(STOP_TIMEOUT, self.runner.start_container(next.bot_id, &next.image)).await;
        match result {
            Ok(Ok(container_id)) => {
                self.state.lock().slots.insert(next.bot_id, Slot::Active(container_id));
            }
            Ok(Err(err)) => {
                warn!(bot_id = %next.bot_id, error = %err, "queued bot failed to start, trying next");
                self.state.lock().slots.remove(&next.bot_id);
                Box::pin(self.drain_queue_once()).await;
            }
            Err(_) => {
                warn!(bot_id = %next.bot_id, "queued bot start timed out, trying next");
                self.state.lock().slots.remove(&next.bot_id);
                Box::pin(self.drain_queue_once()).await;
            }
        }
    }

    /// `RuntimeService` dispatch: route a request to the matching scheduler
    /// operation and translate its outcome into the wire response shape.
    pub async fn handle_request(self: &Arc<Self>, request: RuntimeRequest) -> RuntimeResponse {
        match request {
            RuntimeRequest::StartBot { bot_id, image } => match self.start_bot(bot_id, &image).await {
                Ok(StartOutcome::Started { container_id }) => RuntimeResponse::StartBot {
                    success: true,
                    container_id: Some(container_id),
                    queued: false,
                    queue_position: None,
                    error_message: None,
                },
                Ok(StartOutcome::Queued { position }) => RuntimeResponse::StartBot {
                    success: true,
                    container_id: None,
                    queued: true,
                    queue_position: Some(position),
                    error_message: None,
                },
                Err(err) => RuntimeResponse::StartBot {
                    success: false,
                    container_id: None,
                    queued: false,
                    queue_position: None,
                    error_message: Some(err.to_string()),
                },
            },
            RuntimeRequest::StopBot { bot_id } => {
                let success = self.notify_stop(bot_id).await.is_ok();
                RuntimeResponse::StopBot { success }
            }
            RuntimeRequest::GetRuntimeStats => RuntimeResponse::RuntimeStats(self.runtime_stats()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRunner {
        fail_images: Vec<String>,
        starts: AtomicUsize,
    }

    impl BotRunner for FakeRunner {
        async fn start_container(&self, bot_id: Uuid, image: &str) -> Result<String, SchedulerError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_images.iter().any(|i| i == image) {
                Err(SchedulerError::RuntimeError(bot_id, "boom".to_string()))
            } else {
                Ok(format!("ctr-{bot_id}"))
            }
        }

        async fn stop_container(&self, _bot_id: Uuid) -> Result<(), SchedulerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn admits_until_capacity_then_queues_fifo() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec![],
            starts: AtomicUsize::new(0),
        });
        let scheduler = SandboxScheduler::new(runner, 2);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert!(matches!(scheduler.start_bot(a, "img").await.unwrap(), StartOutcome::Started { .. }));
        assert!(matches!(scheduler.start_bot(b, "img").await.unwrap(), StartOutcome::Started { .. }));
        match scheduler.start_bot(c, "img").await.unwrap() {
            StartOutcome::Queued { position } => assert_eq!(position, 1),
            _ => panic!("expected queued"),
        }
        assert_eq!(scheduler.active_count(), 2);
        assert_eq!(scheduler.queue_len(), 1);
    }

    #[tokio::test]
    async fn starting_an_already_active_bot_is_idempotent() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec![],
            starts: AtomicUsize::new(0),
        });
        let scheduler = SandboxScheduler::new(runner, 2);
        let a = Uuid::new_v4();
        let first_container_id = match scheduler.start_bot(a, "img").await.unwrap() {
            StartOutcome::Started { container_id } => container_id,
            _ => panic!("expected started"),
        };
        let second = scheduler.start_bot(a, "img").await.unwrap();
        match second {
            StartOutcome::Started { container_id } => assert_eq!(container_id, first_container_id),
            _ => panic!("expected idempotent started"),
        }
        assert_eq!(scheduler.active_count(), 1);
    }

    #[tokio::test]
    async fn starting_an_already_queued_bot_is_idempotent() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec![],
            starts: AtomicUsize::new(0),
        });
        let scheduler = SandboxScheduler::new(runner, 1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        scheduler.start_bot(a, "img").await.unwrap();
        let first = scheduler.start_bot(b, "img").await.unwrap();
        let second = scheduler.start_bot(b, "img").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn notify_stop_drains_the_next_queued_bot() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec![],
            starts: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(SandboxScheduler::new(runner, 1));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        scheduler.start_bot(a, "img").await.unwrap();
        let outcome = scheduler.start_bot(b, "img").await.unwrap();
        assert!(matches!(outcome, StartOutcome::Queued { position: 1 }));

        scheduler.notify_stop(a).await.unwrap();
        // Background drain task needs a moment to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.active_count(), 1);
        assert_eq!(scheduler.queue_len(), 0);
    }

    #[tokio::test]
    async fn drain_skips_a_failing_image_and_tries_the_next() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec!["bad".to_string()],
            starts: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(SandboxScheduler::new(runner, 1));
        let a = Uuid::new_v4();
        let bad = Uuid::new_v4();
        let good = Uuid::new_v4();

        scheduler.start_bot(a, "img").await.unwrap();
        scheduler.start_bot(bad, "bad").await.unwrap();
        scheduler.start_bot(good, "img").await.unwrap();

        scheduler.notify_stop(a).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(scheduler.active_count() <= 1);
    }

    #[tokio::test]
    async fn handle_request_routes_start_stop_and_stats() {
        let runner = Arc::new(FakeRunner {
            fail_images: vec![],
            starts: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(SandboxScheduler::new(runner, 2));
        let bot_id = Uuid::new_v4();

        let started = scheduler
            .handle_request(RuntimeRequest::StartBot {
                bot_id,
                image: "img".to_string(),
            })
            .await;
        match started {
            RuntimeResponse::StartBot { success, container_id, queued, .. } => {
                assert!(success);
                assert!(!queued);
                assert!(container_id.is_some());
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let stats = scheduler.handle_request(RuntimeRequest::GetRuntimeStats).await;
        match stats {
            RuntimeResponse::RuntimeStats(stats) => assert_eq!(stats.active_containers, 1),
            other => panic!("wrong variant: {other:?}"),
        }

        let stopped = scheduler.handle_request(RuntimeRequest::StopBot { bot_id }).await;
        assert_eq!(stopped, RuntimeResponse::StopBot { success: true });
    }
}
