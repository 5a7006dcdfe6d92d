//! End-to-end scenarios across the six evaluation styles

use std::sync::Arc;
use std::time::{Duration, Instant};

use weft::{
    combine, concat_map_with, create_svar, pull_stream, push_stream, EvalConfig, EvalError,
    EvalResult, Flow, Step, Stream, Style,
};

/// A producer that sleeps, then yields its index once
fn sleepy(index: u32, delay: Duration) -> Flow<u32> {
    Flow::from_stream(Stream::new(move || {
        std::thread::sleep(delay);
        Ok(Step::Single(index))
    }))
}

fn counter() -> Flow<u64> {
    let mut n = 0u64;
    Flow::from_fn(move || {
        n += 1;
        Some(n)
    })
}

#[test]
fn serial_appends_in_source_order() {
    let flow = combine(
        Style::Serial,
        Flow::from_iter(vec![1, 2]),
        Flow::from_iter(vec![3, 4]),
    );
    assert_eq!(flow.to_vec().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn wserial_interleaves_branches() {
    let flow = combine(
        Style::WSerial,
        Flow::from_iter(vec![1, 2, 3]),
        Flow::from_iter(vec![10, 20, 30]),
    );
    assert_eq!(flow.to_vec().unwrap(), vec![1, 10, 2, 20, 3, 30]);
}

#[test]
fn ahead_runs_concurrently_but_keeps_source_order() {
    let flow = combine(
        Style::Ahead,
        combine(
            Style::Ahead,
            sleepy(1, Duration::from_millis(300)),
            sleepy(2, Duration::from_millis(200)),
        ),
        sleepy(3, Duration::from_millis(100)),
    );

    let started = Instant::now();
    assert_eq!(flow.to_vec().unwrap(), vec![1, 2, 3]);
    let elapsed = started.elapsed();

    // Wall clock tracks the slowest producer, not the sum
    assert!(elapsed >= Duration::from_millis(290), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(550), "{elapsed:?}");
}

#[test]
fn async_yields_every_value_in_arrival_order() {
    let flow = combine(
        Style::Async,
        combine(
            Style::Async,
            sleepy(1, Duration::from_millis(150)),
            sleepy(2, Duration::from_millis(100)),
        ),
        sleepy(3, Duration::from_millis(50)),
    );

    let mut values = flow.to_vec().unwrap();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn parallel_respects_thread_cap() {
    let mut flow = sleepy(0, Duration::from_millis(200));
    for i in 1..5 {
        flow = combine(Style::Parallel, flow, sleepy(i, Duration::from_millis(200)));
    }
    let flow = flow.max_threads(2);

    let started = Instant::now();
    let mut values = flow.to_vec().unwrap();
    let elapsed = started.elapsed();
    values.sort_unstable();

    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    // Five 200ms producers through two workers take three rounds
    assert!(elapsed >= Duration::from_millis(550), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
}

#[test]
fn yield_budget_truncates_infinite_ahead_stream() {
    let flow = combine(Style::Ahead, counter(), Flow::empty()).max_yields(Some(5));
    assert_eq!(flow.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn async_failure_on_third_item() {
    let failing = Flow::from_stream(
        Stream::from_iter(vec![1, 2]).append(Stream::fail(EvalError::Producer("third".into()))),
    );
    let flow = combine(Style::Async, failing, Flow::empty());

    let mut seen = Vec::new();
    let mut failure = None;
    for item in flow {
        match item {
            Ok(v) => seen.push(v),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    assert!(seen.len() <= 2);
    assert_eq!(failure, Some(EvalError::Producer("third".into())));
}

#[test]
fn ahead_output_matches_serial_output() {
    let build = |style: Style| {
        let mut flow = Flow::from_iter(0..7);
        for chunk in 1..6 {
            let lo = chunk * 7;
            flow = combine(style, flow, Flow::from_iter(lo..lo + 7));
        }
        flow
    };

    let serial = build(Style::Serial).to_vec().unwrap();
    let ahead = build(Style::Ahead).to_vec().unwrap();
    assert_eq!(serial, ahead);
}

#[test]
fn deterministic_styles_are_idempotent() {
    for style in [Style::Serial, Style::WSerial, Style::Ahead] {
        let build = || {
            combine(
                style,
                Flow::from_iter(vec![1, 2, 3]),
                Flow::from_iter(vec![4, 5, 6]),
            )
        };
        assert_eq!(build().to_vec().unwrap(), build().to_vec().unwrap());
    }
}

#[test]
fn dropping_the_consumer_quiesces_workers() {
    let svar = create_svar(Style::Async, &EvalConfig::default()).unwrap();
    let mut n = 0u64;
    push_stream(
        &svar,
        Stream::from_fn(move || {
            n += 1;
            std::thread::sleep(Duration::from_millis(1));
            Some(n)
        }),
    );

    let flow = pull_stream(Arc::clone(&svar));
    let mut iter = flow.into_iter();
    assert!(matches!(iter.next(), Some(Ok(_))));
    drop(iter);

    let deadline = Instant::now() + Duration::from_secs(2);
    while svar.active_workers() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(svar.active_workers(), 0);
}

#[test]
fn worker_count_stays_under_cap() {
    let config = EvalConfig::new().max_threads(2);
    let svar = create_svar(Style::Async, &config).unwrap();
    for i in 0..6u32 {
        push_stream(
            &svar,
            Stream::new(move || {
                std::thread::sleep(Duration::from_millis(30));
                Ok(Step::Single(i))
            }),
        );
    }

    let flow = pull_stream(Arc::clone(&svar));
    let mut peak = 0;
    let mut values = Vec::new();
    for item in flow {
        peak = peak.max(svar.active_workers());
        values.push(item.unwrap());
    }
    peak = peak.max(svar.active_workers());

    assert!(peak <= 2, "peak workers {peak}");
    assert!(svar.workers_dispatched() >= 1);
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn ahead_bind_preserves_outer_order() {
    let flow = concat_map_with(Style::Ahead, Flow::from_iter(vec![1u32, 2, 3]), |i| {
        Flow::from_iter(vec![i * 10, i * 10 + 1])
    });
    assert_eq!(flow.to_vec().unwrap(), vec![10, 11, 20, 21, 30, 31]);
}

#[test]
fn async_bind_yields_every_inner_value() {
    let flow = concat_map_with(Style::Async, Flow::from_iter(vec![1u32, 2, 3]), |i| {
        Flow::from_iter(vec![i * 10, i * 10 + 1])
    });
    let mut values = flow.to_vec().unwrap();
    values.sort_unstable();
    assert_eq!(values, vec![10, 11, 20, 21, 30, 31]);
}

#[test]
fn rate_target_slows_delivery() {
    let flow = combine(Style::Ahead, Flow::from_iter(0..10), Flow::empty()).max_rate(100.0);

    let started = Instant::now();
    assert_eq!(flow.to_vec().unwrap(), (0..10).collect::<Vec<_>>());
    let elapsed = started.elapsed();

    // Nine paced gaps at 100/s is 90ms of mandatory sleep
    assert!(elapsed >= Duration::from_millis(60), "{elapsed:?}");
}

#[test]
fn invalid_rate_is_rejected_at_creation() {
    let flow = combine(
        Style::Async,
        Flow::from_iter(vec![1]),
        Flow::from_iter(vec![2]),
    )
    .max_rate(0.0);

    let result: EvalResult<Vec<i32>> = flow.to_vec();
    assert!(matches!(result, Err(EvalError::Config(_))));
}

#[test]
fn latency_hint_is_visible_on_the_svar() {
    let config = EvalConfig::new().serial_latency(Duration::from_micros(250));
    let svar = create_svar::<u32>(Style::Ahead, &config).unwrap();
    assert_eq!(svar.measured_latency(), Some(Duration::from_micros(250)));
}

#[test]
fn take_on_concurrent_flow_shuts_down_cleanly() {
    let flow = combine(Style::Ahead, counter(), Flow::empty()).take(3);
    assert_eq!(flow.to_vec().unwrap(), vec![1, 2, 3]);
}
