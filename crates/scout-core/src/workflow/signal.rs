//! In-memory waiter registry for correlated external signals.
//!
//! One waiter per job id at a time -- steps within a job run sequentially,
//! so a job can only be parked on a single `wait_for_event` at once.
//! Delivery is correlated strictly by job id: a signal for one job can
//! never reach another job's waiter.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

/// Registry of suspended `wait_for_event` calls, keyed by job id.
#[derive(Default)]
pub struct SignalHub {
    waiters: DashMap<String, oneshot::Sender<Value>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a waiter for the given job. Replaces any stale previous waiter.
    pub fn register(&self, job_id: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(job_id.to_string(), tx);
        rx
    }

    /// Remove the waiter for a job (timeout, cancellation, or consumption).
    pub fn unregister(&self, job_id: &str) {
        self.waiters.remove(job_id);
    }

    /// Take the parked waiter for a job, if one exists.
    pub fn take_waiter(&self, job_id: &str) -> Option<oneshot::Sender<Value>> {
        self.waiters.remove(job_id).map(|(_, tx)| tx)
    }

    /// Number of currently parked waiters.
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_waiter_receives_payload() {
        let hub = SignalHub::new();
        let rx = hub.register("j1");
        let tx = hub.take_waiter("j1").unwrap();
        tx.send(json!({"ok": true})).unwrap();
        assert_eq!(rx.await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_waiters_keyed_by_job() {
        let hub = SignalHub::new();
        let _rx1 = hub.register("j1");
        assert!(hub.take_waiter("j2").is_none());
        assert!(hub.take_waiter("j1").is_some());
    }

    #[tokio::test]
    async fn test_unregister_drops_waiter() {
        let hub = SignalHub::new();
        let _rx = hub.register("j1");
        hub.unregister("j1");
        assert_eq!(hub.waiting(), 0);
    }
}
