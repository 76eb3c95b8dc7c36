//! # Booking Ledger
//!
//! Tracks home-service bookings through a fixed lifecycle and records every
//! state change as an immutable event.
//!
//! ## Core Concepts
//!
//! - **Bookings**: Current-state records, mutated only by the store
//! - **Lifecycle**: `PENDING -> ASSIGNED -> IN_PROGRESS -> COMPLETED`, with
//!   `CANCELLED` and `FAILED` exits; terminal statuses accept nothing
//! - **Event Log**: Append-only ledger of every creation and transition
//! - **Subscriptions**: Live, filtered feeds of the event log
//!
//! ## Example
//!
//! ```ignore
//! use booking_ledger::{BookingStatus, BookingStore, Timestamp};
//!
//! let store = BookingStore::default();
//!
//! let booking = store.create("Alice", "Plumbing", Timestamp::now())?;
//! store.transition(booking.id, BookingStatus::Assigned, Some("P1"), None)?;
//! store.transition(booking.id, BookingStatus::InProgress, None, None)?;
//!
//! for event in store.events_for(booking.id) {
//!     println!("{:?} -> {}", event.from_status, event.to_status);
//! }
//! ```

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use events::{BookingIndex, EventLog};
pub use lifecycle::{check_transition, BookingStatus};
pub use store::{BookingStore, StoreConfig};
pub use subscriptions::{
    DropReason, Notification, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
