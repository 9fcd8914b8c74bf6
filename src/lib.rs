//! Concurrent queues used as job-dispatch backends, and a harness that
//! measures them under multi-producer / multi-consumer load.
//!
//! Every queue implements [`Queue`]. The harness ([`JobSystem`],
//! [`Benchmark`]) is generic over it, so a run is monomorphised per queue and
//! the hot path carries no dynamic dispatch.

pub mod adapters;
pub mod benchmark;
pub mod error;
pub mod job;
pub mod job_system;
pub mod linked_queue;
pub mod lock_queue;
pub mod ring_queue;
pub mod stopwatch;
pub mod suite;

pub use benchmark::{Benchmark, LatencyResult, ThroughputResult};
pub use error::Error;
pub use job::{Job, JobPool, JobTicket};
pub use job_system::{JobSystem, Mode};
pub use linked_queue::LinkedQueue;
pub use lock_queue::LockQueue;
pub use ring_queue::RingQueue;
pub use stopwatch::Stopwatch;
pub use suite::{LatencyRecord, SuiteConfig, ThreadCount, ThroughputRecord};

/// Non-blocking FIFO shared between any number of producers and consumers.
pub trait Queue<T>: Send + Sync {
    /// Label used in benchmark records.
    const NAME: &'static str;

    /// Appends `item`. Bounded queues hand the item back when full.
    fn enqueue(&self, item: T) -> Result<(), T>;

    /// Removes the oldest item, or `None` if the queue is empty.
    fn dequeue(&self) -> Option<T>;
}
