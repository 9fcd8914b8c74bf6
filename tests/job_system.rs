use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crossbeam::queue::SegQueue;
use qbench::{
    job::NoOpJob, Job, JobPool, JobSystem, JobTicket, LinkedQueue, LockQueue, Mode, Queue,
    RingQueue,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn noop_pool() -> Arc<JobPool> {
    let job: Box<dyn Job> = Box::new(NoOpJob::default());
    Arc::new(JobPool::new(vec![job]).unwrap())
}

fn run_exact<Q: Queue<JobTicket> + 'static>(make: impl Fn() -> Q, target: usize) {
    for producers in [1, 2, 4, 8] {
        for consumers in [1, 2, 4, 8] {
            let system = JobSystem::new(make(), noop_pool(), Mode::Throughput)
                .with_job_limit(target);
            system.start_workers(producers, consumers).unwrap();
            system.wait_for_jobs(target);
            system.stop_workers();
            assert_eq!(
                system.completed_jobs(),
                target,
                "{} with {}P/{}C",
                Q::NAME,
                producers,
                consumers
            );
        }
    }
}

#[test]
fn one_producer_one_consumer_million_noops() {
    init_logger();
    let pool = noop_pool();
    let system = JobSystem::new(RingQueue::<JobTicket>::default(), pool, Mode::Throughput)
        .with_job_limit(1_000_000);
    system.start_workers(1, 1).unwrap();
    system.wait_for_jobs(1_000_000);
    system.stop_workers();
    assert_eq!(system.completed_jobs(), 1_000_000);
    assert_eq!(system.worker_count(), 0);
}

#[test]
fn exact_count_ring_queue() {
    init_logger();
    run_exact(RingQueue::<JobTicket>::default, 20_000);
}

#[test]
fn exact_count_linked_queue() {
    init_logger();
    run_exact(LinkedQueue::<JobTicket>::new, 20_000);
}

#[test]
fn exact_count_lock_queue() {
    init_logger();
    run_exact(LockQueue::<JobTicket>::new, 20_000);
}

#[test]
fn exact_count_seg_queue() {
    init_logger();
    run_exact(SegQueue::<JobTicket>::new, 20_000);
}

#[test]
fn every_pool_entry_is_used() {
    init_logger();
    let hits: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let jobs: Vec<Box<dyn Job>> = hits
        .iter()
        .map(|h| {
            let h = h.clone();
            Box::new(move || {
                h.fetch_add(1, Ordering::Relaxed);
            }) as Box<dyn Job>
        })
        .collect();
    let system = JobSystem::new(
        RingQueue::<JobTicket>::default(),
        Arc::new(JobPool::new(jobs).unwrap()),
        Mode::Throughput,
    )
    .with_job_limit(3_000);
    system.start_workers(1, 1).unwrap();
    system.wait_for_jobs(3_000);
    system.stop_workers();

    // a single producer walks the pool round robin
    for h in &hits {
        assert_eq!(h.load(Ordering::Relaxed), 1_000);
    }
}

#[test]
fn stop_wakes_waiter() {
    init_logger();
    let system = Arc::new(JobSystem::new(
        LockQueue::<JobTicket>::new(),
        noop_pool(),
        Mode::Throughput,
    ));
    system.start_workers(1, 1).unwrap();

    let waiter = {
        let system = system.clone();
        thread::spawn(move || system.wait_for_jobs(usize::MAX))
    };
    thread::sleep(Duration::from_millis(20));
    system.stop_workers();
    waiter.join().unwrap();
    assert!(!system.is_running());
}

#[test]
fn drop_joins_workers() {
    init_logger();
    let seen = Arc::new(AtomicUsize::new(0));
    let pool = {
        let seen = seen.clone();
        let job: Box<dyn Job> = Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        Arc::new(JobPool::new(vec![job]).unwrap())
    };
    {
        let system = JobSystem::new(
            LinkedQueue::<JobTicket>::new(),
            pool.clone(),
            Mode::Throughput,
        );
        system.start_workers(2, 2).unwrap();
        system.wait_for_jobs(100);
    }
    // every worker held a reference to the pool through the shared state
    assert_eq!(Arc::strong_count(&pool), 1);
    let after_drop = seen.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(seen.load(Ordering::SeqCst), after_drop);
}
