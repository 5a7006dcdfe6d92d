//! Evaluation styles
//!
//! A style fixes the traversal order, the output ordering guarantee and
//! the concurrency of a composed stream:
//!
//! | Style    | Traversal               | Ordering      | Concurrency             |
//! |----------|-------------------------|---------------|-------------------------|
//! | Serial   | depth-first             | source order  | 1                       |
//! | WSerial  | breadth-first           | interleaved   | 1                       |
//! | Ahead    | depth-first speculative | source order  | many                    |
//! | Async    | depth-first             | arrival order | many                    |
//! | WAsync   | breadth-first           | arrival order | many                    |
//! | Parallel | eager                   | arrival order | one worker per producer |

use core::fmt;

/// The evaluation discipline applied to a composed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// Depth-first, source order, no worker pool
    Serial,

    /// Breadth-first interleave of branches, no worker pool
    WSerial,

    /// Speculative workers; results restored to source order
    Ahead,

    /// Depth-first workers, newest work first, arrival order
    Async,

    /// Breadth-first workers, round-robin across branches, arrival order
    WAsync,

    /// One worker per producer, never paused by back-pressure
    Parallel,
}

impl Style {
    /// Styles that schedule work on an SVar's worker pool
    #[inline]
    pub const fn is_concurrent(self) -> bool {
        !matches!(self, Style::Serial | Style::WSerial)
    }

    /// Styles whose output order is deterministic for pure streams
    #[inline]
    pub const fn is_ordered(self) -> bool {
        matches!(self, Style::Serial | Style::WSerial | Style::Ahead)
    }

    /// Short name for logs and diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Style::Serial => "serial",
            Style::WSerial => "wserial",
            Style::Ahead => "ahead",
            Style::Async => "async",
            Style::WAsync => "wasync",
            Style::Parallel => "parallel",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_split() {
        assert!(!Style::Serial.is_concurrent());
        assert!(!Style::WSerial.is_concurrent());
        assert!(Style::Ahead.is_concurrent());
        assert!(Style::Async.is_concurrent());
        assert!(Style::WAsync.is_concurrent());
        assert!(Style::Parallel.is_concurrent());
    }

    #[test]
    fn test_ordering_split() {
        assert!(Style::Serial.is_ordered());
        assert!(Style::WSerial.is_ordered());
        assert!(Style::Ahead.is_ordered());
        assert!(!Style::Async.is_ordered());
        assert!(!Style::WAsync.is_ordered());
        assert!(!Style::Parallel.is_ordered());
    }
}
