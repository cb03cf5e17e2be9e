// Integration tests for satchel::config

use std::time::Duration;

use satchel::config::{DEFAULT_IDLE_WAIT, DEFAULT_THREAD_NAME_PREFIX};
use satchel::{Bag, BagConfig, PoolConfig, StoreKind, Termination, WorkerPool};

#[test]
fn test_pool_config_defaults() {
    let config = PoolConfig::default();
    assert_eq!(config.worker_count, num_cpus::get());
    assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
    assert_eq!(config.termination, Termination::OnEmpty);
    assert_eq!(config.idle_wait, DEFAULT_IDLE_WAIT);
    assert!(!config.enable_detailed_logging);
}

#[test]
fn test_builder_carries_every_setting() {
    let pool = WorkerPool::builder()
        .worker_count(5)
        .thread_name_prefix("ingest")
        .termination(Termination::OnClose)
        .idle_wait(Duration::from_millis(50))
        .detailed_logging(true)
        .build()
        .unwrap();

    let config = pool.config();
    assert_eq!(config.worker_count, 5);
    assert_eq!(config.thread_name_prefix, "ingest");
    assert_eq!(config.termination, Termination::OnClose);
    assert_eq!(config.idle_wait, Duration::from_millis(50));
    assert!(config.enable_detailed_logging);
}

#[test]
fn test_bag_config_selects_store() {
    assert_eq!(BagConfig::default().store, StoreKind::Segmented);

    let bag: Bag<u8> = Bag::with_config(&BagConfig { store: StoreKind::Locked });
    assert!(format!("{bag:?}").contains("LockedStore"));

    let bag: Bag<u8> = Bag::with_config(&BagConfig::default());
    assert!(format!("{bag:?}").contains("SegmentedStore"));
}
