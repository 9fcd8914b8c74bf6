//! Sweeps a [`Benchmark`] across job counts and thread counts.
//!
//! The records produced here are what an external reporting layer writes out;
//! this module performs no I/O.

use log::info;
use serde::{Deserialize, Serialize};

use crate::{Benchmark, Error, JobTicket, Queue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCount {
    pub producers: usize,
    pub consumers: usize,
}

impl ThreadCount {
    pub fn new(producers: usize, consumers: usize) -> Self {
        Self {
            producers,
            consumers,
        }
    }

    /// Every producer count paired with every consumer count.
    pub fn grid(producers: &[usize], consumers: &[usize]) -> Vec<Self> {
        producers
            .iter()
            .flat_map(|&p| consumers.iter().map(move |&c| Self::new(p, c)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuiteConfig {
    pub iterations: usize,
    pub job_counts: Vec<usize>,
    pub threads: Vec<ThreadCount>,
}

const DEFAULT_ITERATIONS: usize = 6;
const DEFAULT_THREADS: [usize; 5] = [1, 2, 4, 6, 8];

impl SuiteConfig {
    pub fn throughput_defaults() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            job_counts: vec![1_000_000, 5_000_000, 10_000_000],
            threads: ThreadCount::grid(&DEFAULT_THREADS, &DEFAULT_THREADS),
        }
    }

    pub fn latency_defaults() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            job_counts: vec![100_000, 500_000, 1_000_000],
            threads: ThreadCount::grid(&DEFAULT_THREADS, &DEFAULT_THREADS),
        }
    }

    /// Number of runs one queue goes through.
    pub fn runs(&self) -> usize {
        self.iterations * self.job_counts.len() * self.threads.len()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.job_counts.is_empty() {
            return Err(Error::InvalidConfig("no job counts".into()));
        }
        if self.threads.is_empty() {
            return Err(Error::InvalidConfig("no thread counts".into()));
        }
        if let Some(t) = self
            .threads
            .iter()
            .find(|t| t.producers == 0 || t.consumers == 0)
        {
            return Err(Error::InvalidConfig(format!(
                "{} producers / {} consumers can never finish a run",
                t.producers, t.consumers
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputRecord {
    pub queue: &'static str,
    pub job_count: usize,
    pub producer_count: usize,
    pub consumer_count: usize,
    pub completed_count: usize,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyRecord {
    pub queue: &'static str,
    pub job_count: usize,
    pub producer_count: usize,
    pub consumer_count: usize,
    pub average_latency_ns: f64,
}

impl LatencyRecord {
    /// Latency sweeps are reported per thread count; producers and
    /// consumers are expected to be equal there.
    pub fn thread_count(&self) -> usize {
        self.producer_count
    }
}

pub fn run_throughput_suite<Q>(
    bench: &Benchmark<Q>,
    config: &SuiteConfig,
) -> Result<Vec<ThroughputRecord>, Error>
where
    Q: Queue<JobTicket> + 'static,
{
    config.validate()?;
    info!("[throughput] queue: {}", Q::NAME);

    let mut records = Vec::with_capacity(config.runs());
    let mut run = 1;
    for _ in 0..config.iterations {
        for &job_count in &config.job_counts {
            for t in &config.threads {
                info!("[throughput]   iteration {} / {}", run, config.runs());
                run += 1;

                let result = bench.run_throughput(job_count, t.producers, t.consumers)?;
                records.push(ThroughputRecord {
                    queue: Q::NAME,
                    job_count,
                    producer_count: t.producers,
                    consumer_count: t.consumers,
                    completed_count: result.completed,
                    elapsed_seconds: result.elapsed.as_secs_f64(),
                });
            }
        }
    }
    Ok(records)
}

pub fn run_latency_suite<Q>(
    bench: &Benchmark<Q>,
    config: &SuiteConfig,
) -> Result<Vec<LatencyRecord>, Error>
where
    Q: Queue<JobTicket> + 'static,
{
    config.validate()?;
    info!("[latency] queue: {}", Q::NAME);

    let mut records = Vec::with_capacity(config.runs());
    let mut run = 1;
    for _ in 0..config.iterations {
        for &job_count in &config.job_counts {
            for t in &config.threads {
                info!("[latency]   iteration {} / {}", run, config.runs());
                run += 1;

                let result = bench.run_latency(job_count, t.producers, t.consumers)?;
                let average = result.average().unwrap_or_default();
                records.push(LatencyRecord {
                    queue: Q::NAME,
                    job_count,
                    producer_count: t.producers,
                    consumer_count: t.consumers,
                    average_latency_ns: average.as_nanos() as f64,
                });
            }
        }
    }
    Ok(records)
}
