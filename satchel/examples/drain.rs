//! Fifty numbered jobs, two workers racing to take them.
//!
//! Run with: cargo run --example drain

use satchel::{Bag, WorkerPool, logging};

fn main() -> anyhow::Result<()> {
    logging::init_default();

    let bag: Bag<u32> = (1..=50).collect();

    let pool = WorkerPool::builder().worker_count(2).build()?;
    let report = pool.run(&bag, |ctx, item| {
        println!("{item} was picked by worker {}", ctx.id());
        Ok(())
    })?;

    for worker in report.workers() {
        println!("worker {} took {} items", worker.id, worker.processed);
    }
    println!("DONE");
    Ok(())
}
