//! Async FIFO for values queued by test code
//!
//! Tests steer the provider by queueing the next user, the next
//! authorization code or the next error response. Each of those is a
//! [`Queue`] shared between the test-control handle and the request handlers.

use std::collections::VecDeque;

use tokio::sync::Mutex;

/// First-in, first-out queue safe to share across request handlers.
#[derive(Debug)]
pub struct Queue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Queue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item` to the back of the queue.
    pub async fn push(&self, item: T) {
        self.items.lock().await.push_back(item);
    }

    /// Removes and returns the front item, if any.
    pub async fn pop(&self) -> Option<T> {
        self.items.lock().await.pop_front()
    }
}
