use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::Queue;

/// Coarse-grained baseline: one lock around a plain FIFO.
pub struct LockQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for LockQueue<T> {
    fn default() -> Self {
        let inner = Mutex::new(VecDeque::new());
        Self { inner }
    }
}

impl<T> LockQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn push(&self, item: T) {
        let mut guard = self.inner.lock();
        guard.push_back(item);
    }

    pub fn pop(&self) -> Option<T> {
        let mut guard = self.inner.lock();
        guard.pop_front()
    }
}

impl<T: Send> Queue<T> for LockQueue<T> {
    const NAME: &'static str = "mutex queue";

    fn enqueue(&self, item: T) -> Result<(), T> {
        self.push(item);
        Ok(())
    }

    fn dequeue(&self) -> Option<T> {
        self.pop()
    }
}
