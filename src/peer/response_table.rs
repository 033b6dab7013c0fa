//! The correlation table between an outstanding `do_request` call and the
//! `P,<id>\n` response that eventually answers it.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::PeerError;

#[derive(Default)]
pub struct ResponseTable {
    pending: Mutex<HashMap<String, oneshot::Sender<Bytes>>>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`. Fails if `id` is already registered,
    /// which would mean the id counter produced a duplicate.
    pub fn register(&self, id: String, tx: oneshot::Sender<Bytes>) -> Result<(), PeerError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.contains_key(&id) {
            return Err(PeerError::DuplicateRequestId);
        }
        pending.insert(id, tx);
        Ok(())
    }

    /// Remove a waiter without delivering anything, e.g. because its
    /// caller was canceled or the enqueue itself failed.
    pub fn remove(&self, id: &str) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    /// Deliver `body` to the waiter registered for `id`. Returns `false`
    /// if there is no such waiter (an unknown or already-resolved id).
    pub fn route(&self, id: &str, body: Bytes) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        match sender {
            Some(tx) => tx.send(body).is_ok(),
            None => false,
        }
    }

    /// Release every pending waiter without a response, e.g. because the
    /// pump stopped. Dropping each sender makes the matching receiver
    /// resolve to a `RecvError`, which `Peer::do_request` turns into
    /// [`PeerError::Stopped`].
    pub fn fail_all(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.clear();
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
