//! A one-shot, multi-waiter "done" latch.
//!
//! The pump exposes three of these (reader-done, writer-done, pump-done);
//! any number of callers may be waiting on `output`/`do_request` when one
//! fires, so a [`tokio::sync::oneshot`] (single consumer) isn't enough. A
//! `Notify` alone isn't either: a waiter that starts waiting *after* the
//! signal already fired would block forever on a bare `notified().await`.
//! The `AtomicBool` plus check-then-wait-then-recheck loop below closes
//! that race.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct DoneSignal {
    fired: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// True once `fire` has been called.
    pub fn is_done(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Latch the signal and wake every current and future waiter.
    ///
    /// Idempotent: firing an already-fired signal is a no-op.
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.notify.notify_waiters();
            // Any waiter that subscribed after the swap but before this
            // notify would otherwise miss it; notify_one/waiters only wakes
            // those already registered, so wake once more after a `yield`
            // would still be racy. The is_done() recheck inside `wait()`
            // is what actually closes the gap, not this second notify.
        }
    }

    /// Resolve immediately if already fired, otherwise wait for `fire`.
    pub async fn wait(&self) {
        loop {
            if self.is_done() {
                return;
            }
            let notified = self.notify.notified();
            // Recheck between subscribing and awaiting: `notify_waiters`
            // only wakes tasks that called `notified()` before it ran.
            if self.is_done() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for DoneSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_if_already_fired() {
        let signal = DoneSignal::new();
        signal.fire();
        tokio::time::timeout(Duration::from_millis(50), signal.wait())
            .await
            .expect("wait should not block after fire");
    }

    #[tokio::test]
    async fn wait_unblocks_when_fired_later() {
        let signal = DoneSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        signal.fire();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("waiter should resolve after fire")
            .unwrap();
    }

    #[tokio::test]
    async fn fire_is_idempotent() {
        let signal = DoneSignal::new();
        signal.fire();
        signal.fire();
        assert!(signal.is_done());
    }

    #[tokio::test]
    async fn multiple_waiters_all_wake() {
        let signal = DoneSignal::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let waiter = signal.clone();
            handles.push(tokio::spawn(async move { waiter.wait().await }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.fire();

        for handle in handles {
            tokio::time::timeout(Duration::from_millis(100), handle)
                .await
                .expect("all waiters should resolve")
                .unwrap();
        }
    }
}
