//! Error types for the booking store.

use crate::lifecycle::BookingStatus;
use crate::types::BookingId;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error(
        "Invalid transition from {from} to {to}. Valid transitions: {}",
        join_statuses(.valid)
    )]
    InvalidTransition {
        from: BookingStatus,
        to: String,
        valid: Vec<BookingStatus>,
    },

    #[error("Unknown booking status: {0}")]
    UnknownStatus(String),

    #[error("Subscription dropped")]
    SubscriptionDropped,
}

impl StoreError {
    /// The valid targets carried by an `InvalidTransition`, if this is one.
    pub fn valid_targets(&self) -> Option<&[BookingStatus]> {
        match self {
            StoreError::InvalidTransition { valid, .. } => Some(valid),
            _ => None,
        }
    }
}

fn join_statuses(statuses: &[BookingStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = StoreError::InvalidTransition {
            from: BookingStatus::Assigned,
            to: "COMPLETED".to_string(),
            valid: BookingStatus::Assigned.allowed_transitions().to_vec(),
        };

        assert_eq!(
            err.to_string(),
            "Invalid transition from ASSIGNED to COMPLETED. \
             Valid transitions: IN_PROGRESS, CANCELLED, FAILED"
        );
    }

    #[test]
    fn test_terminal_message_lists_nothing() {
        let err = StoreError::InvalidTransition {
            from: BookingStatus::Failed,
            to: "PENDING".to_string(),
            valid: Vec::new(),
        };

        assert_eq!(
            err.to_string(),
            "Invalid transition from FAILED to PENDING. Valid transitions: "
        );
        assert_eq!(err.valid_targets(), Some(&[][..]));
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::BookingNotFound(BookingId(999));
        assert_eq!(err.to_string(), "Booking not found: 999");
        assert!(err.valid_targets().is_none());
    }
}
