//! Rendezvous-движок: передача значения от `publish` к `subscribe` по адресу.
//!
//! - `context`: отмена и дедлайн вызова.
//! - `registry`: адрес → множество ожидающих (без собственной синхронизации).
//! - `waiter`: одноразовая точка передачи и припаркованный вызов.
//! - `stats`: счётчики движка.
//! - `engine`: координатор, единственный владелец реестров.

pub mod context;
pub mod engine;
pub mod registry;
pub mod stats;
pub mod waiter;

pub use context::{CancelHandle, Context, ContextError};
pub use engine::{EngineConfig, PendingCounts, RendezvousEngine, DEFAULT_REQUEST_QUEUE_CAPACITY};
pub use registry::{WaiterId, WaiterRegistry};
pub use stats::{EngineStats, StatsSnapshot};
pub use waiter::{Handoff, Parked, Role};
