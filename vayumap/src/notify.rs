//! Synchronous change notification.
//!
//! The map surface redraws as a same-tick reaction to viewport and marker
//! mutations. This module provides the small publish/subscribe list that
//! carries those notifications: subscribers register a callback and hold a
//! [`Subscription`] guard; dropping the guard unsubscribes.
//!
//! Emission is synchronous and happens on the mutating caller's stack, so a
//! state change and the redraw it causes occur within one logical event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CallbackList<T> = Mutex<Vec<(u64, Callback<T>)>>;

/// A list of subscribers notified synchronously on [`Subscribers::emit`].
pub struct Subscribers<T> {
    list: Arc<CallbackList<T>>,
    next_id: AtomicU64,
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            list: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback, returning a guard that unsubscribes on drop.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.list.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            list: Arc::downgrade(&self.list),
        }
    }

    /// Invokes every live subscriber with the given value.
    ///
    /// Callbacks run outside the internal lock, so a subscriber may freely
    /// subscribe or unsubscribe while being notified.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .list
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for a registered subscriber; unsubscribes when dropped.
pub struct Subscription<T> {
    id: u64,
    list: Weak<CallbackList<T>>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_subscriber() {
        let subscribers = Subscribers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_cb = Arc::clone(&count);
        let _sub = subscribers.subscribe(move |v: &u32| {
            count_cb.fetch_add(*v as usize, Ordering::SeqCst);
        });

        subscribers.emit(&2);
        subscribers.emit(&3);
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_dropped_subscription_stops_delivery() {
        let subscribers = Subscribers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_cb = Arc::clone(&count);
        let sub = subscribers.subscribe(move |_: &()| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        subscribers.emit(&());
        drop(sub);
        subscribers.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn test_multiple_subscribers_all_notified() {
        let subscribers = Subscribers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&count);
        let _sub_a = subscribers.subscribe(move |_: &()| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let b = Arc::clone(&count);
        let _sub_b = subscribers.subscribe(move |_: &()| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        subscribers.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(subscribers.len(), 2);
    }

    #[test]
    fn test_subscription_outliving_list_is_harmless() {
        let subscribers: Subscribers<()> = Subscribers::new();
        let sub = subscribers.subscribe(|_| {});
        drop(subscribers);
        drop(sub);
    }
}
