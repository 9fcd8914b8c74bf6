use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use crate::{Error, JobPool, JobSystem, JobTicket, Mode, Queue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputResult {
    pub completed: usize,
    pub elapsed: Duration,
}

impl ThroughputResult {
    pub fn jobs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyResult {
    pub latencies: Vec<Duration>,
}

impl LatencyResult {
    pub fn average(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(mean(total, self.latencies.len()))
    }
}

fn mean(total: Duration, count: usize) -> Duration {
    let nanos = total.as_nanos() / count as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Runs one queue type through repeated, isolated job-system runs.
///
/// Every run gets a fresh queue from the factory and a fresh [`JobSystem`];
/// only the job pool is shared, and it is built the first time a run needs it.
pub struct Benchmark<Q> {
    make_queue: fn() -> Q,
    pool: OnceLock<Arc<JobPool>>,
}

impl<Q: Queue<JobTicket> + Default + 'static> Benchmark<Q> {
    pub fn new() -> Self {
        Self::with_queue(Q::default)
    }
}

impl<Q: Queue<JobTicket> + Default + 'static> Default for Benchmark<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Queue<JobTicket> + 'static> Benchmark<Q> {
    pub fn with_queue(make_queue: fn() -> Q) -> Self {
        Self {
            make_queue,
            pool: OnceLock::new(),
        }
    }

    /// Replaces the job pool, including one already built by [`pool`](Self::pool).
    pub fn with_pool(mut self, pool: Arc<JobPool>) -> Self {
        self.pool = OnceLock::from(pool);
        self
    }

    pub fn name(&self) -> &'static str {
        Q::NAME
    }

    pub fn pool(&self) -> &Arc<JobPool> {
        self.pool.get_or_init(|| Arc::new(JobPool::default_pool()))
    }

    /// Time for `job_count` jobs to complete.
    pub fn run_throughput(
        &self,
        job_count: usize,
        producers: usize,
        consumers: usize,
    ) -> Result<ThroughputResult, Error> {
        check_workers(job_count, producers, consumers)?;
        if job_count == 0 {
            return Ok(ThroughputResult {
                completed: 0,
                elapsed: Duration::ZERO,
            });
        }

        let system = self.job_system(Mode::Throughput, job_count);
        let mut stopwatch = system.start_workers(producers, consumers)?;
        system.wait_for_jobs(job_count);
        let elapsed = stopwatch.tick();
        system.stop_workers();

        Ok(ThroughputResult {
            completed: system.completed_jobs(),
            elapsed,
        })
    }

    /// Enqueue-to-dequeue delay of each of `job_count` jobs.
    pub fn run_latency(
        &self,
        job_count: usize,
        producers: usize,
        consumers: usize,
    ) -> Result<LatencyResult, Error> {
        check_workers(job_count, producers, consumers)?;
        if job_count == 0 {
            return Ok(LatencyResult::default());
        }

        let system = self.job_system(Mode::Latency, job_count);
        system.start_workers(producers, consumers)?;
        system.wait_for_jobs(job_count);
        system.stop_workers();

        Ok(LatencyResult {
            latencies: system.take_latencies(),
        })
    }

    fn job_system(&self, mode: Mode, job_count: usize) -> JobSystem<Q> {
        JobSystem::new((self.make_queue)(), self.pool().clone(), mode).with_job_limit(job_count)
    }
}

fn check_workers(job_count: usize, producers: usize, consumers: usize) -> Result<(), Error> {
    if job_count > 0 && (producers == 0 || consumers == 0) {
        return Err(Error::NoWorkers {
            producers,
            consumers,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use crossbeam::queue::ArrayQueue;

    use super::{mean, Benchmark, LatencyResult, ThroughputResult};
    use crate::{Error, Job, JobPool, JobTicket, LinkedQueue, RingQueue};

    #[test]
    fn test_pool_built_once() {
        let bench = Benchmark::<LinkedQueue<JobTicket>>::new();
        let first = bench.pool().clone();
        bench.run_throughput(1_000, 1, 1).unwrap();
        bench.run_throughput(1_000, 2, 2).unwrap();
        assert!(Arc::ptr_eq(&first, bench.pool()));
    }

    #[test]
    fn test_pool_replaced_after_lazy_init() {
        let hits = Arc::new(AtomicUsize::new(0));
        let job: Box<dyn Job> = {
            let hits = hits.clone();
            Box::new(move || {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        };
        let custom = Arc::new(JobPool::new(vec![job]).unwrap());

        let bench = Benchmark::<RingQueue<JobTicket>>::new();
        bench.pool();
        let bench = bench.with_pool(custom.clone());
        assert!(Arc::ptr_eq(bench.pool(), &custom));
        bench.run_throughput(1_000, 1, 1).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1_000);
    }

    #[test]
    fn test_runs_are_isolated() {
        let bench = Benchmark::<RingQueue<JobTicket>>::new();
        let a = bench.run_throughput(2_000, 2, 2).unwrap();
        let b = bench.run_throughput(500, 2, 2).unwrap();
        assert_eq!(a.completed, 2_000);
        assert_eq!(b.completed, 500);
    }

    #[test]
    fn test_custom_factory() {
        let bench = Benchmark::with_queue(|| ArrayQueue::<JobTicket>::new(32));
        assert_eq!(bench.name(), "crossbeam ArrayQueue");
        let result = bench.run_throughput(3_000, 4, 4).unwrap();
        assert_eq!(result.completed, 3_000);
    }

    #[test]
    fn test_no_workers_rejected() {
        let bench = Benchmark::<RingQueue<JobTicket>>::new();
        assert!(matches!(
            bench.run_throughput(10, 0, 1),
            Err(Error::NoWorkers { producers: 0, consumers: 1 })
        ));
        assert!(matches!(
            bench.run_latency(10, 1, 0),
            Err(Error::NoWorkers { .. })
        ));
    }

    #[test]
    fn test_zero_jobs() {
        let bench = Benchmark::<RingQueue<JobTicket>>::new();
        assert_eq!(bench.run_throughput(0, 0, 0).unwrap().completed, 0);
        assert!(bench.run_latency(0, 1, 1).unwrap().latencies.is_empty());
    }

    #[test]
    fn test_average() {
        let result = LatencyResult {
            latencies: vec![
                Duration::from_micros(100),
                Duration::from_micros(200),
                Duration::from_micros(300),
            ],
        };
        assert_eq!(result.average(), Some(Duration::from_micros(200)));
        assert_eq!(LatencyResult::default().average(), None);
    }

    #[test]
    fn test_mean_keeps_full_count() {
        let count = 1usize << 32;
        let total = Duration::from_nanos(3 << 32);
        assert_eq!(mean(total, count), Duration::from_nanos(3));
        assert_eq!(mean(Duration::from_nanos(3), 2), Duration::from_nanos(1));
    }

    #[test]
    fn test_jobs_per_second() {
        let result = ThroughputResult {
            completed: 500,
            elapsed: Duration::from_millis(250),
        };
        assert_eq!(result.jobs_per_second(), 2000.0);
    }
}
