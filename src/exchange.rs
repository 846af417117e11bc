//! Hand-off store between background description tasks and caption requests
//!
//! Each upload registers a pending entry keyed by its `uid`. The background
//! task fills it in exactly once and the caption request takes it out exactly
//! once. Waiting consumers are woken by a [`Notify`] when the value lands and
//! otherwise re-check on a fixed interval until their deadline passes.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Observable state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Ready,
    /// Never begun, already consumed, or expired.
    Unknown,
}

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(String),
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    created_at: Instant,
    ready: Arc<Notify>,
}

impl Entry {
    fn new(slot: Slot) -> Self {
        Self {
            slot,
            created_at: Instant::now(),
            ready: Arc::new(Notify::new()),
        }
    }
}

/// Process-wide single-producer/single-consumer rendezvous keyed by upload id.
#[derive(Debug, Clone, Default)]
pub struct ResultExchange {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl ResultExchange {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register that a result for `uid` is on its way.
    pub fn begin(&self, uid: &str) {
        self.lock()
            .entry(uid.to_string())
            .or_insert_with(|| Entry::new(Slot::Pending));
        tracing::debug!("Session {} pending", uid);
    }

    /// Store the result for `uid` and wake a waiting consumer, if any.
    ///
    /// A second `put` for the same `uid` is ignored.
    pub fn put(&self, uid: &str, value: String) {
        let mut entries = self.lock();
        let entry = entries
            .entry(uid.to_string())
            .or_insert_with(|| Entry::new(Slot::Pending));

        if let Slot::Ready(_) = entry.slot {
            tracing::warn!("Session {} already has a result; ignoring second write", uid);
            return;
        }

        entry.slot = Slot::Ready(value);
        // notify_one stores a permit, so a consumer that is between checks
        // still observes the wake-up.
        entry.ready.notify_one();
        tracing::debug!("Session {} ready", uid);
    }

    /// Take the result for `uid`, waiting up to `max_wait` for it to arrive.
    ///
    /// Returns `None` when the value did not arrive in time or when `uid` is
    /// not known. A delivered value is removed, so at most one caller ever
    /// receives it.
    pub async fn take(
        &self,
        uid: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Option<String> {
        // A wait too long to represent is treated as unbounded.
        let deadline = Instant::now().checked_add(max_wait);
        let poll_interval = poll_interval.max(Duration::from_millis(1));

        loop {
            let ready = {
                let mut entries = self.lock();
                let waiter = match entries.get(uid) {
                    None => return None,
                    Some(entry) => match entry.slot {
                        Slot::Pending => Some(entry.ready.clone()),
                        Slot::Ready(_) => None,
                    },
                };
                match waiter {
                    Some(ready) => ready,
                    // Check and removal happen under the same lock.
                    None => {
                        return match entries.remove(uid) {
                            Some(Entry {
                                slot: Slot::Ready(value),
                                ..
                            }) => Some(value),
                            _ => None,
                        };
                    }
                }
            };

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!("Timed out waiting for session {}", uid);
                        return None;
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            let _ = tokio::time::timeout(wait, ready.notified()).await;
        }
    }

    pub fn status(&self, uid: &str) -> SessionStatus {
        match self.lock().get(uid).map(|entry| &entry.slot) {
            Some(Slot::Pending) => SessionStatus::Pending,
            Some(Slot::Ready(_)) => SessionStatus::Ready,
            None => SessionStatus::Unknown,
        }
    }

    /// Drop entries older than `ttl`, returning how many were removed.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created_at) < ttl);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!("Expired {} stale session(s)", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(10);
    const POLL: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_take_unknown_uid_is_unavailable_immediately() {
        let exchange = ResultExchange::new();
        let started = std::time::Instant::now();

        assert_eq!(exchange.take("never-begun", WAIT, POLL).await, None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_put_then_take_delivers_once() {
        let exchange = ResultExchange::new();
        exchange.begin("abc");
        exchange.put("abc", "a dog on a beach".to_string());

        assert_eq!(
            exchange.take("abc", WAIT, POLL).await.as_deref(),
            Some("a dog on a beach")
        );
        assert_eq!(exchange.take("abc", WAIT, POLL).await, None);
        assert!(exchange.is_empty());
    }

    #[tokio::test]
    async fn test_put_without_begin_is_still_deliverable() {
        let exchange = ResultExchange::new();
        exchange.put("late", "value".to_string());

        assert_eq!(exchange.status("late"), SessionStatus::Ready);
        assert_eq!(
            exchange.take("late", WAIT, POLL).await.as_deref(),
            Some("value")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_before_put_catches_late_write() {
        let exchange = ResultExchange::new();
        exchange.begin("slow");

        let producer = exchange.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            producer.put("slow", "finally".to_string());
        });

        assert_eq!(
            exchange.take("slow", WAIT, POLL).await.as_deref(),
            Some("finally")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_with_unrepresentable_wait_still_delivers() {
        let exchange = ResultExchange::new();
        exchange.begin("forever");

        let producer = exchange.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            producer.put("forever", "eventually".to_string());
        });

        assert_eq!(
            exchange.take("forever", Duration::MAX, POLL).await.as_deref(),
            Some("eventually")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_is_woken_before_next_poll() {
        let exchange = ResultExchange::new();
        exchange.begin("fast");

        let producer = exchange.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.put("fast", "done".to_string());
        });

        let started = Instant::now();
        let value = exchange
            .take("fast", WAIT, Duration::from_secs(60))
            .await;
        assert_eq!(value.as_deref(), Some("done"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_times_out_on_pending_entry() {
        let exchange = ResultExchange::new();
        exchange.begin("stuck");

        let started = Instant::now();
        assert_eq!(exchange.take("stuck", WAIT, POLL).await, None);
        assert!(started.elapsed() >= WAIT);

        // The entry survives a timeout so a slow producer can still land.
        assert_eq!(exchange.status("stuck"), SessionStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_takes_deliver_exactly_once() {
        let exchange = ResultExchange::new();
        exchange.begin("race");

        let first = tokio::spawn({
            let exchange = exchange.clone();
            async move { exchange.take("race", WAIT, POLL).await }
        });
        let second = tokio::spawn({
            let exchange = exchange.clone();
            async move { exchange.take("race", WAIT, POLL).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        exchange.put("race", "only once".to_string());

        let results = [first.await.unwrap(), second.await.unwrap()];
        let delivered: Vec<_> = results.iter().flatten().collect();
        assert_eq!(delivered, vec!["only once"]);
    }

    #[tokio::test]
    async fn test_second_put_is_ignored() {
        let exchange = ResultExchange::new();
        exchange.begin("twice");
        exchange.put("twice", "first".to_string());
        exchange.put("twice", "second".to_string());

        assert_eq!(
            exchange.take("twice", WAIT, POLL).await.as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let exchange = ResultExchange::new();
        assert_eq!(exchange.status("uid"), SessionStatus::Unknown);

        exchange.begin("uid");
        assert_eq!(exchange.status("uid"), SessionStatus::Pending);

        exchange.put("uid", "text".to_string());
        assert_eq!(exchange.status("uid"), SessionStatus::Ready);

        exchange.take("uid", WAIT, POLL).await;
        assert_eq!(exchange.status("uid"), SessionStatus::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_removes_stale_entries() {
        let exchange = ResultExchange::new();
        exchange.begin("old");
        exchange.put("old", "stale".to_string());

        tokio::time::advance(Duration::from_secs(120)).await;
        exchange.begin("fresh");

        assert_eq!(exchange.sweep_expired(Duration::from_secs(60)), 1);
        assert_eq!(exchange.len(), 1);
        assert_eq!(exchange.take("old", WAIT, POLL).await, None);
        assert_eq!(exchange.status("fresh"), SessionStatus::Pending);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
