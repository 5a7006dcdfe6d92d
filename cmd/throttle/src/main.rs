//! Admission-control example
//!
//! A yield budget truncates an infinite stream exactly; a rate target
//! paces delivery through the worker-side pacer.

use std::time::Instant;

use weft::{combine, Flow, Style};

fn counter() -> Flow<u64> {
    let mut n = 0u64;
    Flow::from_fn(move || {
        n += 1;
        Some(n)
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== weft throttle example ===\n");

    // A yield budget stops the workers, not just the consumer
    let budgeted = combine(Style::Ahead, counter(), Flow::empty()).max_yields(Some(8));
    println!("max_yields(8) on 1..      -> {:?}", budgeted.to_vec().unwrap());

    // A rate target holds delivery to ~50 yields/second
    let started = Instant::now();
    let paced = combine(Style::Ahead, counter(), Flow::empty())
        .max_yields(Some(20))
        .max_rate(50.0);
    let values = paced.to_vec().unwrap();
    println!(
        "max_rate(50/s), 20 yields -> {} values in {:?} (~380ms expected)",
        values.len(),
        started.elapsed()
    );
}
