//! Subscription system for live event-log updates.
//!
//! Observability callers can follow the event log as it grows:
//! - Filtering by booking id or by the status an event enters
//! - Historical catch-up from a given event id
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let store = BookingStore::default();
//!
//! // Follow every cancellation, replaying history from the first event
//! let config = SubscriptionConfig {
//!     filter: SubscriptionFilter::entering(vec![BookingStatus::Cancelled]),
//!     from_event: Some(EventId(1)),
//!     ..Default::default()
//! };
//! let handle = store.subscribe(config)?;
//!
//! loop {
//!     match handle.recv() {
//!         Ok(Notification::Event { event }) => println!("cancelled: {}", event.booking_id),
//!         Ok(Notification::CaughtUp) => println!("Now live!"),
//!         Ok(Notification::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, Notification, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
