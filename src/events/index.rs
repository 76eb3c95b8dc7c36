//! Per-booking positions into the event log.

use crate::types::BookingId;
use std::collections::HashMap;

/// Index mapping booking ids to positions in the log.
///
/// Positions for a booking are pushed in append order, so they are always
/// ascending.
#[derive(Debug, Default)]
pub struct BookingIndex {
    positions: HashMap<BookingId, Vec<usize>>,
}

impl BookingIndex {
    /// Create a new index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the event at `position` belongs to `booking`.
    pub fn add(&mut self, booking: BookingId, position: usize) {
        self.positions.entry(booking).or_default().push(position);
    }

    /// Positions for a booking, oldest first.
    pub fn positions(&self, booking: BookingId) -> &[usize] {
        self.positions
            .get(&booking)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Position of the newest event for a booking.
    pub fn last(&self, booking: BookingId) -> Option<usize> {
        self.positions(booking).last().copied()
    }

    /// Number of bookings with at least one event.
    pub fn booking_count(&self) -> usize {
        self.positions.len()
    }
}
