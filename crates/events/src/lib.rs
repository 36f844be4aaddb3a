//! In-process event stream for chore lifecycle events.
//!
//! Consumers (points, badges, notification dispatch) subscribe to the
//! [`bus::EventBus`] and react asynchronously; nothing here is awaited
//! inside a state transition.

pub mod bus;

pub use bus::{ChoreEvent, ChoreEventKind, EventBus};
