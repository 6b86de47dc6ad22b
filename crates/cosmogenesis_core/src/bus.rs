//! Typed publish/subscribe event routing with bounded history.
//!
//! Delivery is synchronous and in subscription order. The subscriber list is
//! snapshotted at publish time: a handler that subscribes or unsubscribes
//! mid-delivery affects subsequent publishes only, so no handler is skipped
//! or double-invoked within the publish that observed it. A handler that
//! publishes re-enters the bus depth-first - the nested publish completes
//! before the outer delivery resumes.
//!
//! Handler failures are isolated: an `Err` is logged and never aborts
//! delivery to the remaining handlers, and never propagates to the publisher.

use cosmogenesis_data::{Payload, Topic};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// A delivered event: the payload plus bus-assigned bookkeeping.
#[derive(Debug, Clone)]
pub struct BusEvent {
    /// Monotonic publish sequence number, unique per bus.
    pub seq: u64,
    pub topic: Topic,
    pub payload: Payload,
    pub timestamp: String,
}

/// Handle returned by [`EventBus::subscribe`]; pass to
/// [`EventBus::unsubscribe`] to stop receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BusEvent) -> anyhow::Result<()>>;

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: Rc<RefCell<Handler>>,
}

pub struct EventBus {
    subscribers: RefCell<HashMap<Topic, Vec<Subscriber>>>,
    history: RefCell<VecDeque<BusEvent>>,
    history_capacity: usize,
    next_subscription: Cell<u64>,
    next_seq: Cell<u64>,
}

impl EventBus {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            subscribers: RefCell::new(HashMap::new()),
            history: RefCell::new(VecDeque::with_capacity(history_capacity.min(1024))),
            history_capacity,
            next_subscription: Cell::new(0),
            next_seq: Cell::new(0),
        }
    }

    /// Registers a handler for one topic. Handlers run in subscription order.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&BusEvent) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(Subscriber {
                id,
                handler: Rc::new(RefCell::new(Box::new(handler))),
            });
        id
    }

    /// Removes a subscription. Takes effect for publishes that have not yet
    /// snapshotted their subscriber list.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        for subs in self.subscribers.borrow_mut().values_mut() {
            subs.retain(|s| s.id != id);
        }
    }

    /// Publishes one event: appends it to history, then delivers it to every
    /// subscriber of its topic.
    pub fn publish(&self, payload: Payload) {
        let topic = payload.topic();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let event = BusEvent {
            seq,
            topic,
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        {
            let mut history = self.history.borrow_mut();
            while history.len() >= self.history_capacity.max(1) {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // Snapshot before delivery so mid-delivery (un)subscribes cannot
        // skip or double-invoke handlers for this event.
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        for subscriber in snapshot {
            // A handler that re-enters itself through a nested publish is
            // still borrowed; skip it for the nested delivery.
            let Ok(mut handler) = subscriber.handler.try_borrow_mut() else {
                tracing::warn!(topic = topic.name(), "skipping re-entered handler");
                continue;
            };
            if let Err(err) = handler(&event) {
                tracing::warn!(
                    topic = topic.name(),
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }

    /// The most recent events, oldest first, optionally filtered by topic.
    #[must_use]
    pub fn history(&self, topic: Option<Topic>, limit: usize) -> Vec<BusEvent> {
        let history = self.history.borrow();
        let filtered: Vec<BusEvent> = history
            .iter()
            .filter(|e| topic.map_or(true, |t| e.topic == t))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmogenesis_data::Vec3;

    fn sector_payload(tick: u64) -> Payload {
        Payload::SectorGenerated {
            coord: [0, 0, 0],
            object_count: 1,
            tick,
        }
    }

    fn died_payload(id: u64) -> Payload {
        Payload::ParticleDied {
            id,
            final_energy: 0.0,
            age: 1.0,
            position: Vec3::ZERO,
            tick: 0,
        }
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new(16);
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                order.borrow_mut().push(tag);
                Ok(())
            });
        }
        bus.publish(sector_payload(0));
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_each_handler_invoked_exactly_once() {
        let bus = EventBus::new(16);
        let count = Rc::new(Cell::new(0));
        for _ in 0..5 {
            let count = Rc::clone(&count);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                count.set(count.get() + 1);
                Ok(())
            });
        }
        bus.publish(sector_payload(0));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_unsubscribed_handler_not_invoked() {
        let bus = EventBus::new(16);
        let count = Rc::new(Cell::new(0));
        let id = {
            let count = Rc::clone(&count);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                count.set(count.get() + 1);
                Ok(())
            })
        };
        bus.publish(sector_payload(0));
        bus.unsubscribe(id);
        bus.publish(sector_payload(1));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe_during_delivery_does_not_skip_peers() {
        let bus = Rc::new(EventBus::new(16));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let victim = {
            let seen = Rc::clone(&seen);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                seen.borrow_mut().push("victim");
                Ok(())
            })
        };
        {
            let bus2 = Rc::clone(&bus);
            let seen = Rc::clone(&seen);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                seen.borrow_mut().push("saboteur");
                bus2.unsubscribe(victim);
                Ok(())
            });
        }
        {
            let seen = Rc::clone(&seen);
            bus.subscribe(Topic::SectorGenerated, move |_| {
                seen.borrow_mut().push("last");
                Ok(())
            });
        }

        // victim subscribed first, so it already ran; the snapshot protects
        // "last" from being skipped by the mid-delivery unsubscribe.
        bus.publish(sector_payload(0));
        assert_eq!(*seen.borrow(), vec!["victim", "saboteur", "last"]);

        seen.borrow_mut().clear();
        bus.publish(sector_payload(1));
        assert_eq!(*seen.borrow(), vec!["saboteur", "last"]);
    }

    #[test]
    fn test_handler_error_does_not_abort_delivery() {
        let bus = EventBus::new(16);
        let reached = Rc::new(Cell::new(false));
        bus.subscribe(Topic::ParticleDied, |_| anyhow::bail!("handler exploded"));
        {
            let reached = Rc::clone(&reached);
            bus.subscribe(Topic::ParticleDied, move |_| {
                reached.set(true);
                Ok(())
            });
        }
        bus.publish(died_payload(7));
        assert!(reached.get());
    }

    #[test]
    fn test_reentrant_publish_is_depth_first() {
        let bus = Rc::new(EventBus::new(16));
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let bus2 = Rc::clone(&bus);
            let order = Rc::clone(&order);
            bus.subscribe(Topic::SectorGenerated, move |event| {
                order.borrow_mut().push(format!("outer-{}", event.seq));
                if let Payload::SectorGenerated { tick: 0, .. } = event.payload {
                    bus2.publish(died_payload(1));
                }
                Ok(())
            });
        }
        {
            let order = Rc::clone(&order);
            bus.subscribe(Topic::ParticleDied, move |event| {
                order.borrow_mut().push(format!("nested-{}", event.seq));
                Ok(())
            });
        }
        bus.publish(sector_payload(0));
        assert_eq!(*order.borrow(), vec!["outer-0", "nested-1"]);
    }

    #[test]
    fn test_history_ring_evicts_oldest() {
        let bus = EventBus::new(3);
        for tick in 0..5 {
            bus.publish(sector_payload(tick));
        }
        let events = bus.history(None, 10);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].seq, 2);
        assert_eq!(events[2].seq, 4);
    }

    #[test]
    fn test_history_topic_filter_and_limit() {
        let bus = EventBus::new(16);
        bus.publish(sector_payload(0));
        bus.publish(died_payload(1));
        bus.publish(sector_payload(2));

        let sectors = bus.history(Some(Topic::SectorGenerated), 10);
        assert_eq!(sectors.len(), 2);

        let latest = bus.history(None, 1);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].topic, Topic::SectorGenerated);
    }
}
