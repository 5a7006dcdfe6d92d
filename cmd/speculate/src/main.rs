//! Speculative evaluation example
//!
//! Three producers sleep for 300ms, 200ms and 100ms before yielding
//! their index. Ahead runs them concurrently yet reports them in source
//! order; Async reports them as they arrive.

use std::time::{Duration, Instant};

use weft::{combine, Flow, Step, Stream, Style};

fn sleepy(index: u32, delay: Duration) -> Flow<u32> {
    Flow::from_stream(Stream::new(move || {
        std::thread::sleep(delay);
        Ok(Step::Single(index))
    }))
}

fn three_producers(style: Style) -> Flow<u32> {
    let mut flow = sleepy(1, Duration::from_millis(300));
    flow = combine(style, flow, sleepy(2, Duration::from_millis(200)));
    combine(style, flow, sleepy(3, Duration::from_millis(100)))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== weft speculation example ===\n");

    for style in [Style::Ahead, Style::Async] {
        let started = Instant::now();
        let values = three_producers(style).to_vec().unwrap();
        println!(
            "{:<8} -> {:?} in {:?} (sequential would be ~600ms)",
            style.name(),
            values,
            started.elapsed()
        );
    }
}
