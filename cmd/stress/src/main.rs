//! Stress test - concurrent requests against one work thread
//!
//! Spawns requester threads that issue random wakeup/cancel/resume calls
//! against a single handle, then verifies the handle still cancels and
//! destroys cleanly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wthread::{FnActivity, Wthread};

fn xorshift(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== wthread Stress Test ===\n");

    let num_requesters: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    let ops_per_requester: usize = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    println!(
        "{} requesters x {} requests each\n",
        num_requesters, ops_per_requester
    );

    let checks = Arc::new(AtomicUsize::new(0));
    let work_items = Arc::new(AtomicUsize::new(0));

    let (c, w) = (checks.clone(), work_items.clone());
    let wt = Wthread::create(
        "stress",
        FnActivity::new(
            move |_| c.fetch_add(1, Ordering::SeqCst) % 7 == 0,
            move |_| {
                w.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_micros(100));
            },
        ),
    )?;

    let start = Instant::now();
    let mut requesters = Vec::with_capacity(num_requesters);
    for i in 0..num_requesters {
        let wt = Arc::clone(&wt);
        requesters.push(std::thread::spawn(move || {
            let mut rng = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            for _ in 0..ops_per_requester {
                match xorshift(&mut rng) % 3 {
                    0 => wt.wakeup(),
                    1 => wt.cancel(),
                    _ => wt.resume().expect("resume failed"),
                }
            }
        }));
    }
    for r in requesters {
        r.join().expect("requester panicked");
    }

    let elapsed = start.elapsed();
    println!("All requests done in {:?}", elapsed);
    println!(
        "Rate: {:.0} requests/sec",
        (num_requesters * ops_per_requester) as f64 / elapsed.as_secs_f64()
    );
    println!(
        "Worker saw {} checks, ran {} work items",
        checks.load(Ordering::SeqCst),
        work_items.load(Ordering::SeqCst)
    );

    wt.cancel();
    wt.destroy();
    println!("\nHandle cancelled and destroyed cleanly.");
    Ok(())
}
