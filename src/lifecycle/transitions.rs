//! Status enumeration and transition table.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl BookingStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Assigned,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Failed,
    ];

    /// Statuses reachable in one step from `self`.
    pub fn allowed_transitions(self) -> &'static [BookingStatus] {
        use BookingStatus::*;

        match self {
            Pending => &[Assigned, Cancelled],
            Assigned => &[InProgress, Cancelled, Failed],
            InProgress => &[Completed, Failed],
            Completed | Cancelled | Failed => &[],
        }
    }

    pub fn can_transition_to(self, target: BookingStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Wire name (`IN_PROGRESS` etc).
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Assigned => "ASSIGNED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Failed => "FAILED",
        }
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StoreError::UnknownStatus(s.to_string()))
    }
}

/// Validate a move from `from` to `to`.
///
/// The error carries the current status, the rejected target and the full
/// list of valid targets (empty for terminal statuses).
pub fn check_transition(from: BookingStatus, to: BookingStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            from,
            to: to.as_str().to_string(),
            valid: from.allowed_transitions().to_vec(),
        })
    }
}
