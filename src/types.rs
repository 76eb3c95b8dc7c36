//! Core types for the booking store.

use crate::lifecycle::BookingStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a booking.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Debug for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BookingId({})", self.0)
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the global event sequence (shared by all bookings).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl EventId {
    pub fn next(self) -> Self {
        EventId(self.0 + 1)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// One hour, in microseconds.
    pub const HOUR: i64 = 3_600_000_000;

    /// Current wall-clock time.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();
        Timestamp(micros)
    }

    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Transition-specific context attached to an event.
///
/// Creation events carry `customerName`, `serviceType` and `scheduledTime`;
/// transition events carry `providerId` and `reason` (null when not given).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single customer service request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Unique identifier (assigned by store).
    pub id: BookingId,

    pub customer_name: String,

    pub service_type: String,

    /// When the service is to be performed.
    pub scheduled_time: Timestamp,

    /// Current lifecycle status.
    pub status: BookingStatus,

    /// Provider assigned on entry into `ASSIGNED`. Never cleared.
    pub provider_id: Option<String>,

    pub created_at: Timestamp,

    /// Time of the most recent accepted transition.
    pub updated_at: Timestamp,
}

impl Booking {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An immutable record of one creation or transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Global sequence number (assigned by the log).
    pub id: EventId,

    /// Booking this event belongs to.
    pub booking_id: BookingId,

    /// Status before the change; `None` only for the creation event.
    pub from_status: Option<BookingStatus>,

    /// Status entered by this event.
    pub to_status: BookingStatus,

    /// Equals the booking's `updated_at` right after the change.
    pub timestamp: Timestamp,

    pub metadata: Metadata,
}

impl Event {
    /// Whether this event records the creation of its booking.
    pub fn is_creation(&self) -> bool {
        self.from_status.is_none()
    }
}

/// Input for appending an event (before its id is assigned).
#[derive(Clone, Debug)]
pub struct EventInput {
    pub booking_id: BookingId,
    pub from_status: Option<BookingStatus>,
    pub to_status: BookingStatus,
    pub timestamp: Timestamp,
    pub metadata: Metadata,
}

impl EventInput {
    /// Creation event for a freshly allocated booking.
    pub fn created(booking: &Booking) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("customerName".into(), booking.customer_name.clone().into());
        metadata.insert("serviceType".into(), booking.service_type.clone().into());
        metadata.insert("scheduledTime".into(), booking.scheduled_time.0.into());

        Self {
            booking_id: booking.id,
            from_status: None,
            to_status: booking.status,
            timestamp: booking.created_at,
            metadata,
        }
    }

    /// Transition event. Both metadata keys are always present.
    pub fn transition(
        booking: &Booking,
        from: BookingStatus,
        provider_id: Option<&str>,
        reason: Option<&str>,
    ) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("providerId".into(), provider_id.into());
        metadata.insert("reason".into(), reason.into());

        Self {
            booking_id: booking.id,
            from_status: Some(from),
            to_status: booking.status,
            timestamp: booking.updated_at,
            metadata,
        }
    }
}

/// Aggregate counters over bookings and events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub booking_count: usize,
    pub event_count: usize,
    /// Bookings not yet in a terminal status.
    pub active_count: usize,
    /// Bookings per status; statuses with no bookings are absent.
    pub status_counts: BTreeMap<BookingStatus, usize>,
    /// Accepted transitions keyed by `(from, to)`. Creations excluded.
    pub transition_counts: BTreeMap<(BookingStatus, BookingStatus), usize>,
    /// Events per hour over the trailing window, oldest bucket first.
    pub activity: Vec<usize>,
}

impl StoreStats {
    /// Number of bookings currently in `status`.
    pub fn count_for(&self, status: BookingStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}
