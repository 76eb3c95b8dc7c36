//! Event log implementation.
//!
//! Events are kept in an append-only log ordered by their global id, with a
//! per-booking index for direct access to one booking's history.

mod index;
mod log;

pub use index::BookingIndex;
pub use log::EventLog;
