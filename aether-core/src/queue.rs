//! Bounded-latency handoff buffer between the WebSocket reader and the
//! synchronizer.
//!
//! Multi-producer / single-consumer FIFO. Producers never block beyond
//! the lock; the consumer parks on a [`Notify`] until an event arrives.
//! The lock is never held across an await point.

use crate::events::BufferedEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// FIFO of [`BufferedEvent`]s carrying depth updates from the reader to
/// the synchronizer.
///
/// Insertion order is preserved per producer; in this system only the
/// WebSocket reader pushes, making the queue a pure FIFO.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<BufferedEvent>>,
    notify: Notify,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and wakes one waiting consumer.
    pub fn push(&self, event: BufferedEvent) {
        self.inner.lock().push_back(event);
        self.notify.notify_one();
    }

    /// Removes and returns the oldest event, waiting until one arrives.
    ///
    /// `Notify` stores a permit when nobody is parked, so a push between
    /// the emptiness check and the await cannot be missed.
    pub async fn pop(&self) -> BufferedEvent {
        loop {
            if let Some(event) = self.inner.lock().pop_front() {
                return event;
            }
            self.notify.notified().await;
        }
    }

    /// Snapshot of the current length; advisory only.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is currently empty; advisory only.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the first update id of the head event without removing it,
    /// or `None` when the queue is empty.
    pub fn peek_first_u(&self) -> Option<u64> {
        self.inner
            .lock()
            .front()
            .map(|ev| ev.event.first_update_id)
    }

    /// Atomically removes and returns every event in insertion order.
    pub fn drain_all(&self) -> Vec<BufferedEvent> {
        self.inner.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DepthEvent;
    use std::sync::Arc;
    use std::time::Duration;

    fn buffered(first: u64, last: u64) -> BufferedEvent {
        BufferedEvent {
            event: DepthEvent {
                first_update_id: first,
                final_update_id: last,
                bids: vec![],
                asks: vec![],
            },
            raw: format!("{{\"U\":{first},\"u\":{last}}}"),
            recv_ts_us: 0,
        }
    }

    #[tokio::test]
    async fn preserves_fifo_order() {
        let queue = EventQueue::new();
        queue.push(buffered(1, 2));
        queue.push(buffered(3, 4));
        queue.push(buffered(5, 6));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().await.event.first_update_id, 1);
        assert_eq!(queue.pop().await.event.first_update_id, 3);
        assert_eq!(queue.pop().await.event.first_update_id, 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn peeks_without_removing() {
        let queue = EventQueue::new();
        assert_eq!(queue.peek_first_u(), None);

        queue.push(buffered(42, 50));
        queue.push(buffered(51, 60));
        assert_eq!(queue.peek_first_u(), Some(42));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drains_everything_in_order() {
        let queue = EventQueue::new();
        for i in 0..5 {
            queue.push(buffered(i, i + 1));
        }
        let drained = queue.drain_all();
        assert_eq!(drained.len(), 5);
        assert!(queue.is_empty());
        let firsts: Vec<u64> = drained.iter().map(|ev| ev.event.first_update_id).collect();
        assert_eq!(firsts, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn pop_wakes_on_cross_task_push() {
        let queue = Arc::new(EventQueue::new());
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.push(buffered(9, 10));
        });

        let ev = tokio::time::timeout(Duration::from_secs(1), queue.pop())
            .await
            .expect("pop should be woken by the producer");
        assert_eq!(ev.event.first_update_id, 9);
    }
}
