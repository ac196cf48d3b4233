//! Networking: wire protocol, framing, auth, the stream gateway, the
//! fan-out hub, and the leader-elected watcher that ties multiple gateway
//! nodes to a single upstream simulation.

pub mod auth;
pub mod framing;
pub mod gateway;
pub mod hub;
pub mod listener;
pub mod lock;
pub mod protocol;
pub mod pubsub;
pub mod tls;
pub mod watcher;

pub use gateway::{GatewayError, StreamGateway};
pub use hub::FanoutHub;
pub use lock::{InProcessLockStore, LockStore};
pub use pubsub::{InProcessPubSub, PubSub};
