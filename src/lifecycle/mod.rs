//! Booking lifecycle.
//!
//! Every booking starts in `PENDING` and moves along the transition table
//! until it reaches one of the terminal statuses. The table is an exhaustive
//! match, so adding a status forces every transition rule to be revisited.

mod transitions;

pub use transitions::{check_transition, BookingStatus};
