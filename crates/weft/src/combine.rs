//! Style composition
//!
//! `combine` is the monoid operator of each evaluation style. Serial and
//! WSerial compose on the pure representation and never touch an SVar;
//! the concurrent styles queue both operands for one. Combining onto an
//! already-deferred flow of the same style appends to its job list, so a
//! left-heavy chain shares a single SVar and its queue stays small.

use weft_core::{Step, Stream, Style};
use weft_runtime::Work;

use crate::flow::Flow;

/// Compose two flows under `style`
pub fn combine<T: Send + 'static>(style: Style, left: Flow<T>, right: Flow<T>) -> Flow<T> {
    match style {
        Style::Serial => {
            let config = left.take_config();
            Flow::from_stream(left.into_stream().append(right.into_stream())).apply_config(config)
        }
        Style::WSerial => {
            let config = left.take_config();
            Flow::from_stream(left.into_stream().interleave(right.into_stream()))
                .apply_config(config)
        }
        _ => {
            if left.queued_style() == Some(style) && left.can_append() {
                let mut left = left;
                left.push_job(Work::Stream(right.into_stream()));
                left
            } else {
                let config = left.take_config();
                Flow::queued(
                    style,
                    vec![
                        Work::Stream(left.into_stream()),
                        Work::Stream(right.into_stream()),
                    ],
                    config,
                )
            }
        }
    }
}

/// Monadic bind inheriting `style` across iterations: each outer element
/// expands into `f(element)`, spawned onto the same SVar for the
/// concurrent styles, so iterations run concurrently while the style's
/// ordering guarantee holds.
pub fn concat_map_with<T, U>(
    style: Style,
    flow: Flow<T>,
    f: impl Fn(T) -> Flow<U> + Send + 'static,
) -> Flow<U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    let config = flow.take_config();
    match style {
        Style::Serial => {
            let stream = flow.into_stream().concat_map(move |v| f(v).into_stream());
            Flow::from_stream(stream).apply_config(config)
        }
        Style::WSerial => {
            let inner = move |v: T| f(v).into_stream();
            Flow::from_stream(interleave_map(flow.into_stream(), inner)).apply_config(config)
        }
        _ => {
            let inner = flow.into_stream().map(move |v| f(v).into_stream());
            Flow::queued(style, vec![Work::Expand(inner)], config)
        }
    }
}

/// WSerial bind: each expansion is interleaved with the rest
fn interleave_map<T, U, F>(outer: Stream<T>, f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Stream<U> + Send + 'static,
{
    Stream::new(move || match outer.step()? {
        Step::Yield(v, rest) => {
            let head = f(v);
            head.interleave(interleave_map(rest, f)).step()
        }
        Step::Single(v) => f(v).step(),
        Step::Stop => Ok(Step::Stop),
    })
}
