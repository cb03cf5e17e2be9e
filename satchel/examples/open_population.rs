//! Producers and workers running at the same time.
//!
//! Workers cannot treat an empty bag as the end of the work here: a producer
//! may be about to insert. They wait instead, and stop once the producers have
//! closed the bag and it has been emptied.
//!
//! Run with: cargo run --example open_population

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use satchel::{Bag, Termination, WorkerPool, logging};

const PRODUCERS: u64 = 3;
const ITEMS_PER_PRODUCER: u64 = 40;

fn main() -> anyhow::Result<()> {
    logging::init_development();

    let bag: Arc<Bag<u64>> = Arc::new(Bag::new());
    let total = Arc::new(AtomicU64::new(0));

    let pool = WorkerPool::builder()
        .worker_count(4)
        .termination(Termination::OnClose)
        .idle_wait(Duration::from_millis(20))
        .build()?;

    let sum = Arc::clone(&total);
    let workers = pool.spawn(Arc::clone(&bag), move |_ctx, item| {
        sum.fetch_add(item, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(1));
        Ok(())
    })?;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let bag = Arc::clone(&bag);
            thread::spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    bag.insert(p * ITEMS_PER_PRODUCER + i);
                    thread::sleep(Duration::from_millis(2));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }
    bag.close();

    let report = workers.join();
    let n = PRODUCERS * ITEMS_PER_PRODUCER;
    println!(
        "processed {} items, sum {} (expected {})",
        report.processed(),
        total.load(Ordering::Relaxed),
        n * (n - 1) / 2
    );
    Ok(())
}
