//! # Blocking Handoff
//!
//! The two halves of a blocking exchange.
//!
//! - **Handoff**: a single slot shared between the contexts, guarded by a
//!   mutex and a condition variable. The caller blocks on it with a timeout,
//!   the transport context fills it exactly once.
//! - **Rendezvous**: lives inside the transport endpoint. It queues responses
//!   that arrived while an exchange was blocking and pairs them with at most
//!   one registered handoff.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

struct Slot<T> {
    value: Option<T>,
    abandoned: bool,
}

/// A capacity-one slot the caller can block on.
pub struct Handoff<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot { value: None, abandoned: false }),
            ready: Condvar::new(),
        }
    }

    // The slot holds no invariant a panicking holder could break halfway.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fills the slot and wakes the waiter.
    ///
    /// Returns the value back if the waiter gave up or the slot is already
    /// full.
    pub fn offer(&self, value: T) -> Result<(), T> {
        let mut slot = self.lock();
        if slot.abandoned || slot.value.is_some() {
            return Err(value);
        }
        slot.value = Some(value);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until a value is offered or `timeout` elapses.
    ///
    /// On timeout the handoff is marked abandoned, so later offers fail and
    /// the transport context can recycle its consumer slot.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let slot = self.lock();
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |slot| slot.value.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let value = slot.value.take();
        if value.is_none() {
            slot.abandoned = true;
        }
        value
    }

    pub fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Handoff<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.lock();
        f.debug_struct("Handoff")
            .field("filled", &slot.value.is_some())
            .field("abandoned", &slot.abandoned)
            .finish()
    }
}

/// Outcome of registering a consumer on a `Rendezvous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consume {
    /// A queued value was handed over immediately.
    Delivered,
    /// The consumer will receive the next pushed value.
    Registered,
    /// Another live consumer is already waiting; this one was dropped.
    Rejected,
    /// The consumer gave up before it was registered. Its reply is discarded.
    Abandoned,
}

/// Outcome of pushing a value into a `Rendezvous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Delivered,
    Queued,
    /// The value answered an abandoned exchange and was discarded.
    Discarded,
}

/// Single-consumer queue between inbound responses and blocking waiters.
///
/// Every consumer is owed exactly one value. When a consumer gives up before
/// its value arrives, the value is still owed and is dropped on arrival, so a
/// later consumer never sees a reply meant for an earlier exchange.
pub struct Rendezvous<T> {
    pending: VecDeque<T>,
    consumer: Option<Arc<Handoff<T>>>,
    owed: usize,
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            consumer: None,
            owed: 0,
        }
    }

    pub fn push(&mut self, value: T) -> Push {
        if self.owed > 0 {
            self.owed -= 1;
            return Push::Discarded;
        }

        match self.consumer.take() {
            Some(consumer) => match consumer.offer(value) {
                Ok(()) => Push::Delivered,
                Err(_stale) => Push::Discarded,
            },
            None => {
                self.pending.push_back(value);
                Push::Queued
            }
        }
    }

    /// Pushes a value that ends every outstanding exchange, such as a lost
    /// transport. Replies still owed to abandoned consumers will never come.
    pub fn interrupt(&mut self, value: T) -> Push {
        self.owed = 0;
        self.push(value)
    }

    pub fn consume(&mut self, handoff: Arc<Handoff<T>>) -> Consume {
        if let Some(current) = &self.consumer {
            if !current.is_abandoned() {
                return Consume::Rejected;
            }
            // the replaced consumer's value is still in flight
            self.consumer = None;
            self.owed += 1;
        }

        if let Some(value) = self.pending.pop_front() {
            return match handoff.offer(value) {
                Ok(()) => Consume::Delivered,
                Err(_stale) => Consume::Abandoned,
            };
        }

        if handoff.is_abandoned() {
            self.owed += 1;
            return Consume::Abandoned;
        }

        self.consumer = Some(handoff);
        Consume::Registered
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn owed_len(&self) -> usize {
        self.owed
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.is_some()
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_offer_then_take() {
        let handoff = Handoff::new();
        handoff.offer(7).unwrap();
        assert_eq!(handoff.take_timeout(Duration::from_millis(10)), Some(7));
    }

    #[test]
    fn test_take_wakes_on_offer_from_other_thread() {
        let handoff = Arc::new(Handoff::new());
        let producer = handoff.clone();

        let join = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.offer("late").unwrap();
        });

        let start = Instant::now();
        assert_eq!(handoff.take_timeout(Duration::from_secs(5)), Some("late"));
        assert!(start.elapsed() < Duration::from_secs(5));
        join.join().unwrap();
    }

    #[test]
    fn test_timeout_abandons_and_rejects_late_offer() {
        let handoff: Handoff<u32> = Handoff::new();
        assert_eq!(handoff.take_timeout(Duration::from_millis(5)), None);
        assert!(handoff.is_abandoned());
        assert_eq!(handoff.offer(1), Err(1));
    }

    #[test]
    fn test_rendezvous_queues_until_consumed() {
        let mut rendezvous = Rendezvous::new();
        assert_eq!(rendezvous.push(1), Push::Queued);
        assert_eq!(rendezvous.push(2), Push::Queued);

        let handoff = Arc::new(Handoff::new());
        assert_eq!(rendezvous.consume(handoff.clone()), Consume::Delivered);
        assert_eq!(handoff.take_timeout(Duration::ZERO), Some(1));
        assert_eq!(rendezvous.pending_len(), 1);
    }

    #[test]
    fn test_rendezvous_delivers_to_registered_consumer() {
        let mut rendezvous = Rendezvous::new();
        let handoff = Arc::new(Handoff::new());
        assert_eq!(rendezvous.consume(handoff.clone()), Consume::Registered);
        assert_eq!(rendezvous.push(9), Push::Delivered);
        assert!(!rendezvous.has_consumer());
        assert_eq!(handoff.take_timeout(Duration::ZERO), Some(9));
    }

    #[test]
    fn test_rendezvous_rejects_second_live_consumer() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        let first = Arc::new(Handoff::new());
        let second = Arc::new(Handoff::new());

        assert_eq!(rendezvous.consume(first.clone()), Consume::Registered);
        assert_eq!(rendezvous.consume(second.clone()), Consume::Rejected);

        // the first consumer still gets the value
        rendezvous.push(3);
        assert_eq!(first.take_timeout(Duration::ZERO), Some(3));
    }

    #[test]
    fn test_rendezvous_replaces_abandoned_consumer() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        let stale = Arc::new(Handoff::new());
        assert_eq!(rendezvous.consume(stale.clone()), Consume::Registered);
        assert_eq!(stale.take_timeout(Duration::from_millis(1)), None);

        let fresh = Arc::new(Handoff::new());
        assert_eq!(rendezvous.consume(fresh.clone()), Consume::Registered);
        assert_eq!(rendezvous.owed_len(), 1);

        // the late reply to the first exchange lands after the second registered
        assert_eq!(rendezvous.push(3), Push::Discarded);
        assert_eq!(rendezvous.push(4), Push::Delivered);
        assert_eq!(fresh.take_timeout(Duration::ZERO), Some(4));
        assert_eq!(rendezvous.owed_len(), 0);
    }

    #[test]
    fn test_consumer_abandoned_before_registration_discards_its_reply() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        let stale = Arc::new(Handoff::new());
        assert_eq!(stale.take_timeout(Duration::ZERO), None);
        assert_eq!(rendezvous.consume(stale), Consume::Abandoned);

        assert_eq!(rendezvous.push(1), Push::Discarded);
        assert_eq!(rendezvous.push(2), Push::Queued);

        let fresh = Arc::new(Handoff::new());
        assert_eq!(rendezvous.consume(fresh.clone()), Consume::Delivered);
        assert_eq!(fresh.take_timeout(Duration::ZERO), Some(2));
    }

    #[test]
    fn test_queued_reply_for_abandoned_consumer_is_dropped() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        assert_eq!(rendezvous.push(1), Push::Queued);

        let stale = Arc::new(Handoff::new());
        assert_eq!(stale.take_timeout(Duration::ZERO), None);
        assert_eq!(rendezvous.consume(stale), Consume::Abandoned);
        assert_eq!(rendezvous.pending_len(), 0);
        assert_eq!(rendezvous.owed_len(), 0);
    }

    #[test]
    fn test_interrupt_reaches_consumer_despite_owed_replies() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        let stale = Arc::new(Handoff::new());
        rendezvous.consume(stale.clone());
        stale.take_timeout(Duration::from_millis(1));

        let fresh = Arc::new(Handoff::new());
        rendezvous.consume(fresh.clone());
        assert_eq!(rendezvous.interrupt(0), Push::Delivered);
        assert_eq!(fresh.take_timeout(Duration::ZERO), Some(0));
        assert_eq!(rendezvous.owed_len(), 0);
    }

    #[test]
    fn test_push_to_abandoned_consumer_discards() {
        let mut rendezvous: Rendezvous<u8> = Rendezvous::new();
        let stale = Arc::new(Handoff::new());
        rendezvous.consume(stale.clone());
        stale.take_timeout(Duration::from_millis(1));

        assert_eq!(rendezvous.push(5), Push::Discarded);
        assert_eq!(rendezvous.pending_len(), 0);
    }
}
