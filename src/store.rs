//! Main BookingStore struct tying the lifecycle, event log and
//! subscriptions together.

use crate::error::{Result, StoreError};
use crate::events::EventLog;
use crate::lifecycle::{check_transition, BookingStatus};
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{
    Booking, BookingId, Event, EventId, EventInput, StoreStats, Timestamp,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Event log slots to pre-allocate.
    pub event_capacity: usize,

    /// Trailing window, in hours, covered by `StoreStats::activity`.
    pub activity_window_hours: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            activity_window_hours: 24,
        }
    }
}

/// Everything guarded by the store lock.
struct Inner {
    /// Current state of every booking, in id order.
    bookings: BTreeMap<BookingId, Booking>,

    /// Next booking ID to assign.
    next_id: u64,

    /// Transition ledger.
    log: EventLog,

    /// Last timestamp handed out; ticks never go backwards.
    last_tick: Timestamp,
}

impl Inner {
    fn tick(&mut self) -> Timestamp {
        let now = Timestamp::now().max(self.last_tick);
        self.last_tick = now;
        now
    }
}

/// The booking store.
///
/// Sole mutator of booking state. Every accepted mutation appends exactly
/// one event to the log while the write lock is held, so readers always see
/// a booking and its history in agreement.
pub struct BookingStore {
    /// Store configuration.
    config: StoreConfig,

    /// Bookings, id allocator, clock and event log under one lock.
    inner: RwLock<Inner>,

    /// Live event feeds.
    subscriptions: SubscriptionManager,
}

impl BookingStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let inner = Inner {
            bookings: BTreeMap::new(),
            next_id: 1,
            log: EventLog::with_capacity(config.event_capacity),
            last_tick: Timestamp::default(),
        };

        tracing::debug!(
            event_capacity = config.event_capacity,
            "booking store created"
        );

        Self {
            config,
            inner: RwLock::new(inner),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Booking Operations ---

    /// Create a booking in `PENDING` and record its creation event.
    pub fn create(
        &self,
        customer_name: impl Into<String>,
        service_type: impl Into<String>,
        scheduled_time: Timestamp,
    ) -> Result<Booking> {
        let customer_name = customer_name.into();
        let service_type = service_type.into();
        require_field("customerName", &customer_name)?;
        require_field("serviceType", &service_type)?;

        let mut inner = self.inner.write();

        let now = inner.tick();
        let id = BookingId(inner.next_id);
        inner.next_id += 1;

        let booking = Booking {
            id,
            customer_name,
            service_type,
            scheduled_time,
            status: BookingStatus::Pending,
            provider_id: None,
            created_at: now,
            updated_at: now,
        };

        let event = inner.log.append(EventInput::created(&booking));
        inner.bookings.insert(id, booking.clone());

        tracing::debug!(
            booking_id = %id,
            event_id = %event.id,
            service_type = %booking.service_type,
            "booking created"
        );

        self.subscriptions.broadcast_event(&event);

        Ok(booking)
    }

    /// Get a booking by ID.
    pub fn get(&self, id: BookingId) -> Result<Booking> {
        self.inner
            .read()
            .bookings
            .get(&id)
            .cloned()
            .ok_or(StoreError::BookingNotFound(id))
    }

    /// Snapshot of every booking, in creation order.
    pub fn list_all(&self) -> Vec<Booking> {
        self.inner.read().bookings.values().cloned().collect()
    }

    /// The `limit` most recently created bookings, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Booking> {
        self.inner
            .read()
            .bookings
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Move a booking to `new_status`.
    ///
    /// `provider_id` is stored on the booking only when entering `ASSIGNED`
    /// and non-empty; on any other transition it is accepted but only shows
    /// up in the event metadata. Either the status changes and one event is
    /// appended, or nothing changes.
    pub fn transition(
        &self,
        id: BookingId,
        new_status: BookingStatus,
        provider_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let mut inner = self.inner.write();

        let current = inner
            .bookings
            .get(&id)
            .map(|b| b.status)
            .ok_or(StoreError::BookingNotFound(id))?;

        if let Err(err) = check_transition(current, new_status) {
            tracing::debug!(booking_id = %id, from = %current, to = %new_status, "transition rejected");
            return Err(err);
        }

        self.apply_transition(&mut inner, id, new_status, provider_id, reason)
    }

    /// Like [`transition`](Self::transition), with the target given by name.
    ///
    /// Lookup happens first, so an unknown booking is always `BookingNotFound`.
    /// A name that is not a status is rejected as an invalid transition
    /// listing the targets valid from the current status.
    pub fn transition_by_name(
        &self,
        id: BookingId,
        new_status: &str,
        provider_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let mut inner = self.inner.write();

        let current = inner
            .bookings
            .get(&id)
            .map(|b| b.status)
            .ok_or(StoreError::BookingNotFound(id))?;

        let target = match new_status.parse::<BookingStatus>() {
            Ok(status) => status,
            Err(_) => {
                tracing::debug!(booking_id = %id, from = %current, to = new_status, "unknown target status");
                return Err(StoreError::InvalidTransition {
                    from: current,
                    to: new_status.to_string(),
                    valid: current.allowed_transitions().to_vec(),
                });
            }
        };

        if let Err(err) = check_transition(current, target) {
            tracing::debug!(booking_id = %id, from = %current, to = %target, "transition rejected");
            return Err(err);
        }
        self.apply_transition(&mut inner, id, target, provider_id, reason)
    }

    /// Apply an already validated transition.
    fn apply_transition(
        &self,
        inner: &mut Inner,
        id: BookingId,
        new_status: BookingStatus,
        provider_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let now = inner.tick();

        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or(StoreError::BookingNotFound(id))?;

        let old_status = booking.status;
        booking.status = new_status;
        booking.updated_at = now;

        if new_status == BookingStatus::Assigned {
            if let Some(provider) = provider_id.filter(|p| !p.is_empty()) {
                booking.provider_id = Some(provider.to_string());
            }
        }

        let booking = booking.clone();
        let event = inner.log.append(EventInput::transition(
            &booking,
            old_status,
            provider_id,
            reason,
        ));

        tracing::debug!(
            booking_id = %id,
            event_id = %event.id,
            from = %old_status,
            to = %new_status,
            "booking transitioned"
        );

        self.subscriptions.broadcast_event(&event);

        Ok(booking)
    }

    // --- Event Log Operations ---

    /// Events for a booking, oldest first. Empty for unknown bookings.
    pub fn events_for(&self, id: BookingId) -> Vec<Event> {
        self.inner.read().log.for_booking(id)
    }

    /// Every event, oldest first.
    pub fn all_events(&self) -> Vec<Event> {
        self.inner.read().log.all()
    }

    /// Events with id `>= from`, oldest first.
    pub fn events_since(&self, from: EventId) -> Vec<Event> {
        self.inner.read().log.since(from).cloned().collect()
    }

    // --- Subscriptions ---

    /// Subscribe to appended events.
    ///
    /// With `from_event` set, matching history is replayed first. A
    /// `CaughtUp` notification always precedes live events. Replay runs
    /// under the read lock, so no event is missed or delivered twice.
    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        let inner = self.inner.read();

        let from_event = config.from_event;
        let handle = self.subscriptions.subscribe(config);

        if let Some(from) = from_event {
            let mut replayed = 0usize;
            for event in inner.log.since(from) {
                if !self.subscriptions.replay_to(handle.id, event) {
                    self.subscriptions.drop_overflowed(handle.id);
                    return Err(StoreError::SubscriptionDropped);
                }
                replayed += 1;
            }
            tracing::trace!(subscription = handle.id.0, from = %from, replayed, "catch-up replayed");
        }

        self.subscriptions.mark_caught_up(handle.id)?;

        Ok(handle)
    }

    /// Stop a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    // --- Utility ---

    /// Get store statistics as of now.
    pub fn stats(&self) -> StoreStats {
        self.stats_at(Timestamp::now())
    }

    /// Get store statistics with `now` as the end of the activity window.
    pub fn stats_at(&self, now: Timestamp) -> StoreStats {
        let inner = self.inner.read();

        let mut stats = StoreStats {
            booking_count: inner.bookings.len(),
            event_count: inner.log.len(),
            ..Default::default()
        };

        for booking in inner.bookings.values() {
            *stats.status_counts.entry(booking.status).or_default() += 1;
            if !booking.is_terminal() {
                stats.active_count += 1;
            }
        }

        let window = self.config.activity_window_hours.max(1) as usize;
        stats.activity = vec![0; window];

        for event in inner.log.iter() {
            if let Some(from) = event.from_status {
                *stats
                    .transition_counts
                    .entry((from, event.to_status))
                    .or_default() += 1;
            }

            let age = match now.0.checked_sub(event.timestamp.0) {
                Some(age) if age >= 0 => age,
                _ => continue,
            };
            let hours_ago = (age / Timestamp::HOUR) as usize;
            if hours_ago < window {
                stats.activity[window - 1 - hours_ago] += 1;
            }
        }

        stats
    }
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        tracing::debug!(field = name, "rejected booking with empty field");
        return Err(StoreError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn seeded_store() -> (BookingStore, Booking) {
        let store = BookingStore::default();
        let booking = store
            .create("Alice", "Plumbing", Timestamp(1_700_000_000_000_000))
            .unwrap();
        (store, booking)
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let store = BookingStore::default();

        let a = store.create("Alice", "Plumbing", Timestamp(1)).unwrap();
        let b = store.create("Bob", "Cleaning", Timestamp(2)).unwrap();

        assert_eq!(a.id, BookingId(1));
        assert_eq!(b.id, BookingId(2));
        assert_eq!(a.status, BookingStatus::Pending);
        assert_eq!(a.created_at, a.updated_at);
        assert!(a.provider_id.is_none());
    }

    #[test]
    fn test_create_rejects_empty_fields() {
        let store = BookingStore::default();

        let err = store.create("", "Plumbing", Timestamp(1)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store.create("Alice", "", Timestamp(1)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        assert!(store.list_all().is_empty());
        assert!(store.all_events().is_empty());

        // Rejected calls must not burn an id.
        let booking = store.create("Alice", "Plumbing", Timestamp(1)).unwrap();
        assert_eq!(booking.id, BookingId(1));
    }

    #[test]
    fn test_provider_only_set_on_assign() {
        let (store, booking) = seeded_store();

        let assigned = store
            .transition(booking.id, BookingStatus::Assigned, Some("P1"), None)
            .unwrap();
        assert_eq!(assigned.provider_id.as_deref(), Some("P1"));

        let started = store
            .transition(booking.id, BookingStatus::InProgress, Some("P2"), None)
            .unwrap();
        assert_eq!(started.provider_id.as_deref(), Some("P1"));

        let failed = store
            .transition(booking.id, BookingStatus::Failed, None, Some("no show"))
            .unwrap();
        assert_eq!(failed.provider_id.as_deref(), Some("P1"));

        let events = store.events_for(booking.id);
        assert_eq!(events[2].metadata["providerId"], "P2");
        assert_eq!(events[3].metadata["reason"], "no show");
    }

    #[test]
    fn test_empty_provider_is_not_stored() {
        let (store, booking) = seeded_store();

        let assigned = store
            .transition(booking.id, BookingStatus::Assigned, Some(""), None)
            .unwrap();
        assert!(assigned.provider_id.is_none());

        let events = store.events_for(booking.id);
        assert_eq!(events[1].metadata["providerId"], "");
        assert_eq!(events[1].metadata["reason"], Value::Null);
    }

    #[test]
    fn test_transition_by_name() {
        let (store, booking) = seeded_store();

        let cancelled = store
            .transition_by_name(booking.id, "CANCELLED", None, Some("customer request"))
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let err = store
            .transition_by_name(BookingId(42), "NOT_A_STATUS", None, None)
            .unwrap_err();
        assert_eq!(err, StoreError::BookingNotFound(BookingId(42)));
    }

    #[test]
    fn test_unknown_status_name_is_invalid_transition() {
        let (store, booking) = seeded_store();

        let err = store
            .transition_by_name(booking.id, "ON_HOLD", None, None)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid transition from PENDING to ON_HOLD. Valid transitions: ASSIGNED, CANCELLED"
        );
        assert_eq!(store.events_for(booking.id).len(), 1);
    }

    #[test]
    fn test_timestamps_follow_events() {
        let (store, booking) = seeded_store();

        store
            .transition(booking.id, BookingStatus::Assigned, Some("P1"), None)
            .unwrap();
        let current = store.get(booking.id).unwrap();
        let last = store.events_for(booking.id).pop().unwrap();

        assert_eq!(current.updated_at, last.timestamp);
        assert!(current.updated_at >= current.created_at);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = BookingStore::default();
        for i in 0..5 {
            store.create(format!("Customer {}", i), "Cleaning", Timestamp(i)).unwrap();
        }

        let ids: Vec<u64> = store.recent(3).iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(store.recent(100).len(), 5);
    }

    #[test]
    fn test_stats_counts() {
        let store = BookingStore::default();
        let a = store.create("Alice", "Plumbing", Timestamp(1)).unwrap();
        let b = store.create("Bob", "Cleaning", Timestamp(2)).unwrap();
        store.create("Carol", "Painting", Timestamp(3)).unwrap();

        store.transition(a.id, BookingStatus::Assigned, Some("P1"), None).unwrap();
        store.transition(b.id, BookingStatus::Cancelled, None, None).unwrap();

        let stats = store.stats();
        assert_eq!(stats.booking_count, 3);
        assert_eq!(stats.event_count, 5);
        assert_eq!(stats.active_count, 2);
        assert_eq!(stats.count_for(BookingStatus::Pending), 1);
        assert_eq!(stats.count_for(BookingStatus::Assigned), 1);
        assert_eq!(stats.count_for(BookingStatus::Cancelled), 1);
        assert_eq!(stats.count_for(BookingStatus::Completed), 0);
        assert_eq!(
            stats.transition_counts[&(BookingStatus::Pending, BookingStatus::Assigned)],
            1
        );
        assert_eq!(stats.transition_counts.len(), 2);

        assert_eq!(stats.activity.len(), 24);
        assert_eq!(stats.activity[23], 5);
        assert_eq!(stats.activity.iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_activity_window() {
        let store = BookingStore::new(StoreConfig {
            activity_window_hours: 3,
            ..Default::default()
        });
        store.create("Alice", "Plumbing", Timestamp(1)).unwrap();
        let created_at = store.all_events()[0].timestamp;

        let stats = store.stats_at(Timestamp(created_at.0 + 2 * Timestamp::HOUR + 1));
        assert_eq!(stats.activity, vec![1, 0, 0]);

        let stats = store.stats_at(Timestamp(created_at.0 + 3 * Timestamp::HOUR));
        assert_eq!(stats.activity, vec![0, 0, 0]);

        // Events after the reference time are not counted.
        let stats = store.stats_at(Timestamp(created_at.0 - 1));
        assert_eq!(stats.activity, vec![0, 0, 0]);
    }

    #[test]
    fn test_stats_at_extreme_reference_times() {
        let (store, booking) = seeded_store();
        store
            .transition(booking.id, BookingStatus::Assigned, Some("P1"), None)
            .unwrap();

        for now in [Timestamp(i64::MIN), Timestamp(i64::MAX)] {
            let stats = store.stats_at(now);
            assert_eq!(stats.booking_count, 1);
            assert_eq!(stats.event_count, 2);
            assert_eq!(stats.count_for(BookingStatus::Assigned), 1);
            assert!(stats.activity.iter().all(|&n| n == 0));
        }
    }

    #[test]
    fn test_whitespace_names_are_accepted() {
        let store = BookingStore::default();

        let booking = store.create("   ", "\t", Timestamp(1)).unwrap();
        assert_eq!(booking.id, BookingId(1));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.customer_name, "   ");
        assert_eq!(booking.service_type, "\t");
        assert_eq!(store.events_for(booking.id).len(), 1);
    }

    #[test]
    fn test_transition_by_name_rejects_known_status_out_of_order() {
        let (store, booking) = seeded_store();

        let err = store
            .transition_by_name(booking.id, "COMPLETED", None, None)
            .unwrap_err();
        match err {
            StoreError::InvalidTransition { from, to, valid } => {
                assert_eq!(from, BookingStatus::Pending);
                assert_eq!(to, "COMPLETED");
                assert_eq!(valid, vec![BookingStatus::Assigned, BookingStatus::Cancelled]);
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }

        assert_eq!(store.get(booking.id).unwrap(), booking);
        assert_eq!(store.events_for(booking.id).len(), 1);
    }
}
