// Michael-Scott queue on top of crossbeam's epoch reclamation.
// Retired sentinels go through defer_destroy, so a dequeuer still
// holding the old head never touches freed memory.

use std::{mem::MaybeUninit, sync::atomic::Ordering};

use crossbeam::{epoch, utils::CachePadded};
use epoch::{Atomic, Guard, Owned, Shared};

use crate::Queue;

type NodePtr<T> = Atomic<Node<T>>;

struct Node<T> {
    // uninit for the sentinel; read exactly once by the dequeuer
    // that turns this node into the new sentinel
    item: MaybeUninit<T>,
    next: NodePtr<T>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            item: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn new(item: T) -> Self {
        Self {
            item: MaybeUninit::new(item),
            next: Atomic::null(),
        }
    }
}

pub struct LinkedQueue<T> {
    head: CachePadded<NodePtr<T>>,
    tail: CachePadded<NodePtr<T>>,
}

unsafe impl<T: Send> Send for LinkedQueue<T> {}
unsafe impl<T: Send> Sync for LinkedQueue<T> {}

impl<T> Default for LinkedQueue<T> {
    fn default() -> Self {
        let head = Atomic::new(Node::sentinel());
        let tail = head.clone();
        Self {
            head: CachePadded::new(head),
            tail: CachePadded::new(tail),
        }
    }
}

impl<T> LinkedQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        // SAFETY: head always points at a live sentinel while pinned
        unsafe { head.deref() }.next.load(Ordering::Acquire, guard).is_null()
    }

    pub fn push(&self, item: T) {
        let guard = &epoch::pin();
        let node = Owned::new(Node::new(item)).into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: tail is never null and cannot be reclaimed while pinned
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if tail != self.tail.load(Ordering::Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(
                        Shared::null(),
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    )
                    .is_ok()
                {
                    // may fail: someone already helped us along
                    let _ = self.tail.compare_exchange(
                        tail,
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    );
                    return;
                }
            } else {
                self.help_tail(tail, next, guard);
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: head is never null and cannot be reclaimed while pinned
            let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);

            if head != self.head.load(Ordering::Acquire, guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                self.help_tail(tail, next, guard);
                continue;
            }

            // SAFETY: next is protected by the guard
            let Some(next_ref) = (unsafe { next.as_ref() }) else {
                continue;
            };
            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // SAFETY: only the CAS winner reads the item, and `next` is
                // now the sentinel so nobody reads it again. The old head is
                // unreachable from the queue; the epoch frees it once every
                // thread that might still see it has unpinned.
                unsafe {
                    guard.defer_destroy(head);
                    return Some(next_ref.item.assume_init_read());
                }
            }
        }
    }

    fn help_tail<'g>(&self, tail: Shared<'g, Node<T>>, next: Shared<'g, Node<T>>, guard: &'g Guard) {
        let _ = self
            .tail
            .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
    }
}

impl<T> Drop for LinkedQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        // SAFETY: &mut self, no other thread can reach the last sentinel
        unsafe {
            let guard = epoch::unprotected();
            let sentinel = self.head.load(Ordering::Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T: Send> Queue<T> for LinkedQueue<T> {
    const NAME: &'static str = "linked list";

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
