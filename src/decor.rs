use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Progress state handed to a decorator on every render tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Expected final count, `-1` when unknown.
    pub total: i64,
    pub current: i64,
    pub completed: bool,
}

impl Statistics {
    pub fn new(total: i64, current: i64) -> Self {
        Self { total, current, completed: false }
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// One piece of per-tick display text for a progress bar.
///
/// `decor` is the only required capability. Hosts probe the optional ones
/// through the `as_*` accessors, which return `None` unless a decorator
/// overrides them.
pub trait Decorator: Send {
    fn decor(&mut self, stats: &Statistics) -> String;

    fn as_amount_receiver(&mut self) -> Option<&mut dyn AmountReceiver> {
        None
    }

    fn as_complete_messenger(&mut self) -> Option<&mut dyn CompleteMessenger> {
        None
    }

    fn as_average_adjuster(&mut self) -> Option<&mut dyn AverageAdjuster> {
        None
    }
}

pub trait AmountReceiver {
    fn next_amount(&mut self, n: i64, elapsed: Duration);
}

/// Accepts a message shown in place of the live value once the bar completes.
pub trait CompleteMessenger {
    fn on_complete_message(&mut self, msg: String);
}

pub trait AverageAdjuster {
    fn average_adjust(&mut self, start: Instant);
}

impl<F> Decorator for F
where
    F: FnMut(&Statistics) -> String + Send,
{
    fn decor(&mut self, stats: &Statistics) -> String {
        self(stats)
    }
}
