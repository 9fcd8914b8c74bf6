//! Producer/consumer worker pool around a single [`Queue`].
//!
//! Producers cycle through the shared [`JobPool`] pushing [`JobTicket`]s;
//! consumers pop them, run the job and bump one atomic completion counter.
//! All workers park on a start gate until every thread has been spawned, so
//! a run starts at one well-defined moment.

use std::{
    mem,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use crate::{Error, JobPool, JobTicket, Queue, Stopwatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Throughput,
    /// Producers stamp every ticket and consumers record enqueue-to-dequeue delay.
    Latency,
}

/// Closed until every worker of a run has been spawned.
#[derive(Default)]
struct StartGate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl StartGate {
    fn close(&self) {
        *self.open.lock() = false;
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
    }
}

struct Shared<Q> {
    queue: Q,
    pool: Arc<JobPool>,
    mode: Mode,
    running: AtomicBool,
    gate: StartGate,

    job_limit: AtomicUsize,
    // completion slots handed out to consumers, never above job_limit
    reserved: AtomicUsize,
    completed: AtomicUsize,
    // lowest target any waiter is blocked on, usize::MAX with no waiters
    wait_target: AtomicUsize,
    // targets of the waiters currently blocked
    waiters: Mutex<Vec<usize>>,
    completion: Condvar,

    latencies: Mutex<Vec<Duration>>,
}

impl<Q: Queue<JobTicket>> Shared<Q> {
    fn reset(&self) {
        self.reserved.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        {
            let waiters = self.waiters.lock();
            let lowest = waiters.iter().copied().min().unwrap_or(usize::MAX);
            self.wait_target.store(lowest, Ordering::SeqCst);
        }
        self.latencies.lock().clear();
        self.gate.close();
    }

    fn produce(&self, index: usize) {
        self.gate.wait();
        let pool_len = self.pool.len();
        let mut cursor = index % pool_len;

        while self.running.load(Ordering::Acquire) {
            let ticket = JobTicket {
                job: cursor,
                enqueued_at: match self.mode {
                    Mode::Latency => Some(Instant::now()),
                    Mode::Throughput => None,
                },
            };
            cursor += 1;
            if cursor == pool_len {
                cursor = 0;
            }
            // full bounded queue: just go round again
            let _ = self.queue.enqueue(ticket);
        }
    }

    fn consume(&self) {
        self.gate.wait();
        let mut samples = Vec::new();

        while self.running.load(Ordering::Acquire) {
            let Some(ticket) = self.queue.dequeue() else {
                continue;
            };
            if !self.reserve() {
                break;
            }
            if let Some(enqueued_at) = ticket.enqueued_at {
                samples.push(enqueued_at.elapsed());
            }
            self.pool.run(ticket.job);
            self.complete();
        }

        if !samples.is_empty() {
            self.latencies.lock().append(&mut samples);
        }
    }

    fn reserve(&self) -> bool {
        let limit = self.job_limit.load(Ordering::Relaxed);
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .is_ok()
    }

    fn complete(&self) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if done >= self.wait_target.load(Ordering::SeqCst) {
            let _guard = self.waiters.lock();
            self.completion.notify_all();
        }
    }

    fn wake_waiters(&self) {
        let _guard = self.waiters.lock();
        self.completion.notify_all();
    }
}

pub struct JobSystem<Q> {
    shared: Arc<Shared<Q>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<Q: Queue<JobTicket> + 'static> JobSystem<Q> {
    pub fn new(queue: Q, pool: Arc<JobPool>, mode: Mode) -> Self {
        let shared = Shared {
            queue,
            pool,
            mode,
            running: AtomicBool::new(false),
            gate: StartGate::default(),
            job_limit: AtomicUsize::new(usize::MAX),
            reserved: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            wait_target: AtomicUsize::new(usize::MAX),
            waiters: Mutex::new(Vec::new()),
            completion: Condvar::new(),
            latencies: Mutex::new(Vec::new()),
        };
        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Caps the number of jobs consumers will run in one start/stop cycle.
    /// Tickets dequeued past the cap are dropped and consumers exit.
    pub fn with_job_limit(self, limit: usize) -> Self {
        self.shared.job_limit.store(limit, Ordering::Relaxed);
        self
    }

    pub fn mode(&self) -> Mode {
        self.shared.mode
    }

    pub fn queue(&self) -> &Q {
        &self.shared.queue
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn completed_jobs(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Latency samples merged by consumers as they exit. Complete once
    /// [`stop_workers`](Self::stop_workers) has returned.
    pub fn take_latencies(&self) -> Vec<Duration> {
        mem::take(&mut *self.shared.latencies.lock())
    }

    /// Spawns the workers and opens the start gate. The returned stopwatch
    /// starts at the moment the gate opens.
    pub fn start_workers(&self, producers: usize, consumers: usize) -> Result<Stopwatch, Error> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(Error::AlreadyRunning);
        }

        let shared = &self.shared;
        shared.reset();
        shared.running.store(true, Ordering::SeqCst);

        let mut spawned = Vec::with_capacity(producers + consumers);
        let result = (0..producers)
            .map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("producer-{}", i))
                    .spawn(move || shared.produce(i))
            })
            .chain((0..consumers).map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("consumer-{}", i))
                    .spawn(move || shared.consume())
            }))
            .try_for_each(|handle| handle.map(|h| spawned.push(h)));

        if let Err(e) = result {
            error!("spawning workers failed after {} threads: {}", spawned.len(), e);
            shared.running.store(false, Ordering::SeqCst);
            shared.gate.open();
            join_all(spawned);
            return Err(e.into());
        }

        *workers = spawned;
        debug!(
            "starting {} producers and {} consumers on {}",
            producers,
            consumers,
            Q::NAME
        );
        let stopwatch = Stopwatch::new();
        shared.gate.open();
        Ok(stopwatch)
    }

    /// Blocks until `target` jobs (capped at the job limit) have completed,
    /// or the workers are stopped.
    pub fn wait_for_jobs(&self, target: usize) {
        let shared = &self.shared;
        let target = target.min(shared.job_limit.load(Ordering::Relaxed));

        let mut waiters = shared.waiters.lock();
        waiters.push(target);
        shared.wait_target.fetch_min(target, Ordering::SeqCst);
        while shared.completed.load(Ordering::SeqCst) < target
            && shared.running.load(Ordering::SeqCst)
        {
            shared.completion.wait(&mut waiters);
        }

        // withdraw this target; no waiters leaves the threshold at usize::MAX
        if let Some(i) = waiters.iter().position(|&t| t == target) {
            waiters.swap_remove(i);
        }
        let lowest = waiters.iter().copied().min().unwrap_or(usize::MAX);
        shared.wait_target.store(lowest, Ordering::SeqCst);
    }

    /// Stops and joins every worker. Safe to call any number of times.
    pub fn stop_workers(&self) {
        let shared = &self.shared;
        shared.running.store(false, Ordering::SeqCst);
        // workers may still be parked at the gate
        shared.gate.open();
        shared.wake_waiters();

        let workers = mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        let count = workers.len();
        join_all(workers);
        debug!(
            "stopped {} workers on {} after {} jobs",
            count,
            Q::NAME,
            self.completed_jobs()
        );
    }
}

impl<Q> Drop for JobSystem<Q> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.gate.open();
        join_all(mem::take(self.workers.get_mut()));
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        let name = handle.thread().name().unwrap_or("worker").to_owned();
        if handle.join().is_err() {
            error!("{} panicked", name);
        }
    }
}
