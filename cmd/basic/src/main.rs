//! Basic work-thread example
//!
//! A worker drains a shared counter; the main thread refills it and
//! wakes the worker, then cancels, resumes, and finally destroys it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wthread::{FnActivity, Wthread};

fn wait_for_zero(counter: &AtomicI64, timeout: Duration) {
    let start = Instant::now();
    while counter.load(Ordering::SeqCst) > 0 {
        if start.elapsed() > timeout {
            println!("WARNING: timeout waiting for drain!");
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== wthread Basic Example ===\n");

    let pending = Arc::new(AtomicI64::new(0));
    let drained = Arc::new(AtomicI64::new(0));

    let (p1, p2, d) = (pending.clone(), pending.clone(), drained.clone());
    let wt = Wthread::create(
        "drain",
        FnActivity::new(
            move |_| p1.load(Ordering::SeqCst) > 0,
            move |_| {
                p2.fetch_sub(1, Ordering::SeqCst);
                d.fetch_add(1, Ordering::SeqCst);
            },
        ),
    )?;

    println!("Created worker '{}'", wt.name());

    // Refill and wake a few times.
    for round in 1..=3 {
        pending.fetch_add(5, Ordering::SeqCst);
        wt.wakeup();
        wait_for_zero(&pending, Duration::from_secs(5));
        println!(
            "Round {}: drained {} items total",
            round,
            drained.load(Ordering::SeqCst)
        );
    }

    // Pause the worker, queue work while it is stopped, resume.
    wt.cancel();
    println!("\nWorker cancelled; queueing work while stopped...");
    pending.fetch_add(5, Ordering::SeqCst);

    wt.resume()?;
    wt.wakeup();
    wait_for_zero(&pending, Duration::from_secs(5));
    println!(
        "Resumed worker drained the backlog: {} items total",
        drained.load(Ordering::SeqCst)
    );

    wt.cancel();
    wt.destroy();
    println!("\nDone.");
    Ok(())
}
