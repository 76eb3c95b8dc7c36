//! Fan-out of appended events to live subscribers.

use crate::error::{Result, StoreError};
use crate::types::Event;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::types::{
    DropReason, Notification, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

struct Subscriber {
    config: SubscriptionConfig,
    sender: Sender<Notification>,
    holder: Weak<()>,
    /// Set once replay has finished; live events are held back until then.
    live: bool,
}

impl Subscriber {
    fn deliver(&self, notification: Notification) -> bool {
        self.sender.try_send(notification).is_ok()
    }

    fn wants(&self, event: &Event) -> bool {
        self.config.filter.matches(event)
    }

    fn is_held(&self) -> bool {
        self.holder.strong_count() > 0
    }
}

/// Why a subscriber is leaving the table.
enum Removal {
    Overflow,
    Abandoned,
}

/// Table of subscribers fed by the booking store.
pub struct SubscriptionManager {
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber. Live events are withheld until
    /// [`mark_caught_up`](Self::mark_caught_up) is called for it.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));
        let liveness = Arc::new(());

        self.subscribers.write().insert(
            id,
            Subscriber {
                config,
                sender,
                holder: Arc::downgrade(&liveness),
                live: false,
            },
        );

        SubscriptionHandle {
            id,
            receiver,
            liveness,
        }
    }

    /// Remove a subscriber and tell it why. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.subscribers.write().remove(&id);
        if let Some(subscriber) = removed {
            subscriber.deliver(Notification::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Switch a subscriber from replay to live delivery.
    pub fn mark_caught_up(&self, id: SubscriptionId) -> Result<()> {
        let mut subscribers = self.subscribers.write();
        let delivered = match subscribers.get_mut(&id) {
            Some(subscriber) => {
                subscriber.live = true;
                subscriber.deliver(Notification::CaughtUp)
            }
            None => return Ok(()),
        };

        if !delivered {
            subscribers.remove(&id);
            tracing::warn!(subscription = id.0, "subscriber dropped before catch-up finished");
            return Err(StoreError::SubscriptionDropped);
        }
        Ok(())
    }

    /// Number of subscribers whose handle is still alive.
    pub fn subscription_count(&self) -> usize {
        self.subscribers
            .read()
            .values()
            .filter(|subscriber| subscriber.is_held())
            .count()
    }

    /// Push an appended event to every live subscriber whose filter matches.
    ///
    /// Subscribers that cannot take the event are removed with a
    /// `BufferOverflow` notice. Subscribers whose handle has been dropped are
    /// removed as well, whether or not the event matched them.
    pub fn broadcast_event(&self, event: &Event) {
        let removals: Vec<(SubscriptionId, Removal)> = self
            .subscribers
            .read()
            .iter()
            .filter_map(|(id, subscriber)| {
                if !subscriber.is_held() {
                    return Some((*id, Removal::Abandoned));
                }
                let overflowed = subscriber.live
                    && subscriber.wants(event)
                    && !subscriber.deliver(Notification::Event {
                        event: event.clone(),
                    });
                overflowed.then_some((*id, Removal::Overflow))
            })
            .collect();

        if removals.is_empty() {
            return;
        }

        let mut subscribers = self.subscribers.write();
        for (id, removal) in removals {
            let Some(subscriber) = subscribers.remove(&id) else {
                continue;
            };
            match removal {
                Removal::Overflow => {
                    tracing::warn!(subscription = id.0, "dropping slow subscriber");
                    subscriber.deliver(Notification::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
                Removal::Abandoned => {
                    tracing::debug!(subscription = id.0, "forgetting subscriber with dropped handle");
                }
            }
        }
    }

    /// Deliver one replayed event if it passes the subscriber's filter.
    /// Returns false once the subscriber is gone or its buffer is full.
    pub fn replay_to(&self, id: SubscriptionId, event: &Event) -> bool {
        let subscribers = self.subscribers.read();
        let Some(subscriber) = subscribers.get(&id) else {
            return false;
        };
        !subscriber.wants(event)
            || subscriber.deliver(Notification::Event {
                event: event.clone(),
            })
    }

    pub(crate) fn drop_overflowed(&self, id: SubscriptionId) {
        if self.subscribers.write().remove(&id).is_some() {
            tracing::warn!(subscription = id.0, "subscriber overflowed during catch-up");
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
