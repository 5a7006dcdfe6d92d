//! Basic weft example
//!
//! Demonstrates the sequential styles and the stream adapters.
//! Run with `RUST_LOG=trace` to watch the evaluator's internals.

use weft::{combine, Flow, Style};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== weft basic example ===\n");

    // Serial: depth-first, source order
    let serial = combine(
        Style::Serial,
        Flow::from_iter(vec![1, 2]),
        Flow::from_iter(vec![3, 4]),
    );
    println!("serial  [1,2] + [3,4]        -> {:?}", serial.to_vec().unwrap());

    // WSerial: one element from each branch in turn
    let wserial = combine(
        Style::WSerial,
        Flow::from_iter(vec![1, 2, 3]),
        Flow::from_iter(vec![10, 20, 30]),
    );
    println!(
        "wserial [1,2,3] + [10,20,30] -> {:?}",
        wserial.to_vec().unwrap()
    );

    // Adapters compose lazily on either representation
    let processed = Flow::from_iter(0..100)
        .map(|v| v * v)
        .filter(|v| v % 3 == 0)
        .take(5);
    println!(
        "squares, 3|v, take 5         -> {:?}",
        processed.to_vec().unwrap()
    );

    // Folding is the terminal operation
    let total = Flow::from_iter(1..=100).fold(0u64, |a, v| a + v).unwrap();
    println!("sum 1..=100                  -> {}", total);
}
