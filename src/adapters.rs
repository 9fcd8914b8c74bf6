// crossbeam's queues behind the same capability, for comparison

use crossbeam::queue::{ArrayQueue, SegQueue};

use crate::Queue;

impl<T: Send> Queue<T> for SegQueue<T> {
    const NAME: &'static str = "crossbeam SegQueue";

    #[inline]
    fn enqueue(&self, item: T) -> Result<(), T> {
        self.push(item);
        Ok(())
    }

    #[inline]
    fn dequeue(&self) -> Option<T> {
        self.pop()
    }
}

impl<T: Send> Queue<T> for ArrayQueue<T> {
    const NAME: &'static str = "crossbeam ArrayQueue";

    #[inline]
    fn enqueue(&self, item: T) -> Result<(), T> {
        self.push(item)
    }

    #[inline]
    fn dequeue(&self) -> Option<T> {
        self.pop()
    }
}
