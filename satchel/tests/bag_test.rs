// Concurrency tests for satchel::Bag on every storage backend

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Barrier};
use std::thread;

use satchel::{Bag, BagConfig, StoreKind, run_workers};

const STORES: [StoreKind; 2] = [StoreKind::Segmented, StoreKind::Locked];

fn bag_on<T: Send + 'static>(store: StoreKind) -> Bag<T> {
    Bag::with_config(&BagConfig { store })
}

#[test]
fn test_try_remove_on_fresh_bag() {
    for store in STORES {
        let bag: Bag<i32> = bag_on(store);
        assert_eq!(bag.try_remove(), None, "{store:?}");
        assert!(bag.is_empty());
    }
}

#[test]
fn test_concurrent_producers_then_drain() {
    for store in STORES {
        let bag: Arc<Bag<u32>> = Arc::new(bag_on(store));
        let start = Arc::new(Barrier::new(4));

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let bag = Arc::clone(&bag);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    for i in 0..25 {
                        bag.insert((p * 25 + i) % 100);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(bag.len(), 100);
        assert_eq!(bag.inserted(), 100);

        let report = run_workers(&bag, 4, |_| {}).unwrap();

        assert_eq!(report.processed(), 100, "{store:?}");
        assert_eq!(bag.len(), 0);
        assert_eq!(bag.removed(), 100);
    }
}

#[test]
fn test_concurrent_removals_are_exclusive() {
    for store in STORES {
        let bag: Arc<Bag<u32>> = Arc::new(bag_on(store));
        bag.extend(0..10_000);
        let start = Arc::new(Barrier::new(8));

        let consumers: Vec<_> = (0..8)
            .map(|_| {
                let bag = Arc::clone(&bag);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut taken = Vec::new();
                    while let Some(item) = bag.try_remove() {
                        taken.push(item);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                assert!(seen.insert(item), "{store:?} delivered {item} twice");
            }
        }
        assert_eq!(seen.len(), 10_000);
        assert!(bag.try_remove().is_none());
    }
}

#[test]
fn test_conservation_with_interleaved_producers_and_consumers() {
    for store in STORES {
        let bag: Arc<Bag<(usize, usize)>> = Arc::new(bag_on(store));
        let start = Arc::new(Barrier::new(6));

        let producers: Vec<_> = (0..3)
            .map(|p| {
                let bag = Arc::clone(&bag);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    for i in 0..2_000 {
                        bag.insert((p, i));
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let bag = Arc::clone(&bag);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut taken = Vec::new();
                    for _ in 0..4_000 {
                        if let Some(item) = bag.try_remove() {
                            taken.push(item);
                        }
                        let stats = bag.stats();
                        assert!(stats.removed <= stats.inserted);
                    }
                    taken
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                *counts.entry(item).or_default() += 1;
            }
        }
        for item in bag.drain() {
            *counts.entry(item).or_default() += 1;
        }

        assert_eq!(counts.len(), 6_000, "{store:?} lost items");
        assert!(counts.values().all(|&n| n == 1), "{store:?} duplicated items");
        assert_eq!(bag.inserted(), bag.removed());
        assert!(bag.is_empty());
    }
}

#[test]
fn test_duplicate_values_are_kept_apart() {
    let bag: Bag<&str> = bag_on(StoreKind::Locked);
    bag.extend(["job", "job", "job"]);
    assert_eq!(bag.len(), 3);
    assert_eq!(bag.drain(), vec!["job", "job", "job"]);
}

#[test]
fn test_cancel_while_consumers_race() {
    let bag: Arc<Bag<u32>> = Arc::new((0..100_000).collect());
    let start = Arc::new(Barrier::new(5));

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let bag = Arc::clone(&bag);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut taken = 0usize;
                while bag.try_remove().is_some() {
                    taken += 1;
                }
                taken
            })
        })
        .collect();

    start.wait();
    bag.cancel();

    let taken: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    let left = bag.drain().len();
    assert_eq!(taken + left, 100_000);
    assert_eq!(bag.removed(), 100_000);
}
