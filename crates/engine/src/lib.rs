//! The chore engine: single-owner state, command queue, timers.
//!
//! All chore/assignment state lives in one [`store::ChoreStore`] owned by
//! one task ([`service::ChoreService`]); every mutation (user commands,
//! sweep ticks, reset ticks) flows through its serialized command queue.
//! The overdue/reminder sweep and the cycle-reset orchestrator run on
//! independent, cancellable timers and submit commands rather than touching
//! state directly.

pub mod config;
pub mod persistence;
pub mod reset;
pub mod service;
pub mod store;
pub mod sweep;

pub use config::EngineConfig;
pub use persistence::{ChoreSnapshot, MemoryGateway, PersistenceGateway};
pub use service::{ChoreHandle, ChoreService};
pub use store::ChoreStore;
