//! Append-only event log.

use super::index::BookingIndex;
use crate::types::{BookingId, Event, EventId, EventInput};

/// Append-only event log.
///
/// There is no update or delete path: events are only ever added, and only
/// the booking store can add them.
#[derive(Debug)]
pub struct EventLog {
    /// Events in id order. `events[i].id == EventId(i + 1)`.
    events: Vec<Event>,

    /// Next event id to assign.
    next_id: EventId,

    /// Booking id to positions in `events`.
    index: BookingIndex,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty log with room for `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            next_id: EventId(1),
            index: BookingIndex::new(),
        }
    }

    /// Append an event, assigning the next global id.
    pub(crate) fn append(&mut self, input: EventInput) -> Event {
        let id = self.next_id;
        self.next_id = id.next();

        let event = Event {
            id,
            booking_id: input.booking_id,
            from_status: input.from_status,
            to_status: input.to_status,
            timestamp: input.timestamp,
            metadata: input.metadata,
        };

        self.index.add(event.booking_id, self.events.len());
        self.events.push(event.clone());

        event
    }

    /// All events for a booking, oldest first.
    ///
    /// Unknown bookings yield an empty list.
    pub fn for_booking(&self, booking: BookingId) -> Vec<Event> {
        self.index
            .positions(booking)
            .iter()
            .map(|&pos| self.events[pos].clone())
            .collect()
    }

    /// Every event, oldest first.
    pub fn all(&self) -> Vec<Event> {
        self.events.clone()
    }

    /// Newest event for a booking.
    pub fn last_for(&self, booking: BookingId) -> Option<&Event> {
        self.index.last(booking).map(|pos| &self.events[pos])
    }

    /// Events with id `>= from`, oldest first.
    pub fn since(&self, from: EventId) -> impl Iterator<Item = &Event> + '_ {
        let start = (from.0.saturating_sub(1) as usize).min(self.events.len());
        self.events[start..].iter()
    }

    /// Iterate every event, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
