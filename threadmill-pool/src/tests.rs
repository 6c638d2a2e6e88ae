//!
//! Unit tests
//!
use std::sync::Once;

static INIT: Once = Once::new();

pub fn setup() {
    // Init setup
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

//
// Pool + collector integration
//
use crate::{Builder, JobPriority};
use std::time::Duration;
use threadmill_mon::{MetricsCollector, MonitorOptions};

#[test]
fn test_pool_feeds_collector() {
    setup();

    let mut builder = Builder::new(JobPriority::all());
    builder.name("integration").worker(JobPriority::all());
    let mut pool = builder.start().unwrap();

    let collector = MetricsCollector::new(
        MonitorOptions::default()
            .with_interval(Duration::from_millis(5))
            .with_buffer_size(32)
            .unwrap(),
    );
    collector.register_thread_pool(pool.metrics());
    collector.register_worker(pool.worker_metrics()[0].clone());
    collector.start().unwrap();

    for _ in 0..50 {
        pool.enqueue_fn(JobPriority::Normal, || Ok(())).unwrap();
    }
    pool.stop(true);
    std::thread::sleep(Duration::from_millis(20));
    collector.stop();

    let snapshot = collector.current_snapshot();
    assert_eq!(snapshot.thread_pool.jobs_completed, 50);
    assert_eq!(snapshot.thread_pool.worker_threads, 1);
    assert_eq!(snapshot.worker.jobs_processed, 50);

    let stats = collector.collection_stats();
    assert!(stats.total_collections > 0);

    // History reflects the final counter value in its newest entry
    let recent = collector.recent_snapshots(100);
    assert!(!recent.is_empty());
    assert_eq!(recent.last().unwrap().thread_pool.jobs_completed, 50);
}
