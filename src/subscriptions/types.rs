//! Subscription types for live event-log updates.

use crate::lifecycle::BookingStatus;
use crate::types::{BookingId, Event, EventId};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered notifications before dropping the subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// First event id to replay (None = live only).
    pub from_event: Option<EventId>,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            from_event: None,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria for subscriptions. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only events for these bookings.
    pub booking_ids: Option<Vec<BookingId>>,

    /// Only events entering one of these statuses.
    pub statuses: Option<Vec<BookingStatus>>,
}

impl SubscriptionFilter {
    /// Every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Events for specific bookings.
    pub fn bookings(ids: Vec<BookingId>) -> Self {
        Self {
            booking_ids: Some(ids),
            ..Default::default()
        }
    }

    /// Events entering specific statuses.
    pub fn entering(statuses: Vec<BookingStatus>) -> Self {
        Self {
            statuses: Some(statuses),
            ..Default::default()
        }
    }

    /// Check if an event passes this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref ids) = self.booking_ids {
            if !ids.contains(&event.booking_id) {
                return false;
            }
        }

        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&event.to_status) {
                return false;
            }
        }

        true
    }
}

/// Notifications delivered to subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An event was appended (or replayed during catch-up).
    Event { event: Event },

    /// Finished historical catch-up, now streaming live.
    CaughtUp,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to receive notifications for a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive notifications.
    pub receiver: crossbeam_channel::Receiver<Notification>,
    /// Dropping the handle releases this, which lets the manager forget the
    /// subscription even if no event ever matches its filter again.
    pub(crate) liveness: std::sync::Arc<()>,
}

impl SubscriptionHandle {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<Notification, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<Notification, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Notification, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain whatever is currently buffered.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }
}
