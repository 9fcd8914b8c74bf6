use std::{
    fmt, hint,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use rand::Rng;

use crate::Error;

/// A unit of work. Jobs are shared by every consumer and run through `&self`.
pub trait Job: Send + Sync {
    fn run(&self);
}

impl<F> Job for F
where
    F: Fn() + Send + Sync,
{
    fn run(&self) {
        self()
    }
}

/// What actually moves through a queue: an index into the [`JobPool`],
/// plus the moment it was enqueued when latency is being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTicket {
    pub job: usize,
    pub enqueued_at: Option<Instant>,
}

/// Read-only set of jobs that producers cycle through.
pub struct JobPool {
    jobs: Vec<Box<dyn Job>>,
}

impl JobPool {
    pub fn new(jobs: Vec<Box<dyn Job>>) -> Result<Self, Error> {
        if jobs.is_empty() {
            return Err(Error::EmptyJobPool);
        }
        Ok(Self { jobs })
    }

    /// Allocation, no-op and random-branch jobs.
    pub fn default_pool() -> Self {
        let jobs: Vec<Box<dyn Job>> = vec![
            Box::new(AllocJob::new(1024)),
            Box::new(NoOpJob::default()),
            Box::new(RandomBranchJob::default()),
        ];
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Job> {
        self.jobs.get(index).map(|job| job.as_ref())
    }

    #[inline]
    pub(crate) fn run(&self, index: usize) {
        self.jobs[index].run();
    }
}

impl fmt::Debug for JobPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPool").field("len", &self.jobs.len()).finish()
    }
}

/// Does nothing but count, to expose the queue's own overhead.
#[derive(Debug, Default)]
pub struct NoOpJob {
    runs: AtomicUsize,
}

impl NoOpJob {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}

impl Job for NoOpJob {
    fn run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Allocates and frees `size` bytes.
#[derive(Debug)]
pub struct AllocJob {
    size: usize,
}

impl AllocJob {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Job for AllocJob {
    fn run(&self) {
        hint::black_box(vec![0u8; self.size]);
    }
}

/// Busy-waits for a fixed duration.
#[derive(Debug)]
pub struct SpinJob {
    duration: Duration,
}

impl SpinJob {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Job for SpinJob {
    fn run(&self) {
        let start = Instant::now();
        while start.elapsed() < self.duration {
            hint::spin_loop();
        }
    }
}

/// Sleeps for a fixed duration, standing in for blocking I/O.
#[derive(Debug)]
pub struct SleepJob {
    duration: Duration,
}

impl SleepJob {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Job for SleepJob {
    fn run(&self) {
        thread::sleep(self.duration);
    }
}

/// Takes one of two branches at random.
#[derive(Debug, Default)]
pub struct RandomBranchJob {
    heads: AtomicUsize,
    tails: AtomicUsize,
}

impl RandomBranchJob {
    pub fn counts(&self) -> (usize, usize) {
        (
            self.heads.load(Ordering::Relaxed),
            self.tails.load(Ordering::Relaxed),
        )
    }
}

impl Job for RandomBranchJob {
    fn run(&self) {
        if rand::thread_rng().gen_bool(0.5) {
            self.heads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tails.fetch_add(1, Ordering::Relaxed);
        }
    }
}
