use std::time::Instant;

use tracing::trace;

use crate::decor::{AverageAdjuster, CompleteMessenger, Decorator, Statistics};
use crate::error::FormatError;
use crate::units::{SpeedFormat, UnitSystem};

use super::{SpeedConfig, SpeedMessage};

/// Speed decorator reporting `current / time since start`, without smoothing.
pub struct AverageSpeed {
    message: SpeedMessage,
    start: Instant,
}

impl AverageSpeed {
    pub fn new(unit: UnitSystem, format: &str, config: SpeedConfig) -> Result<Self, FormatError> {
        Self::with_start(unit, format, Instant::now(), config)
    }

    pub fn with_start(
        unit: UnitSystem,
        format: &str,
        start: Instant,
        config: SpeedConfig,
    ) -> Result<Self, FormatError> {
        let format = SpeedFormat::parse(format)?;
        Ok(Self::with_format(unit, format, start, config))
    }

    pub fn with_format(unit: UnitSystem, format: SpeedFormat, start: Instant, config: SpeedConfig) -> Self {
        Self { message: SpeedMessage::new(unit, format, config), start }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// Renders as if the clock read `now`.
    pub fn decor_at(&mut self, stats: &Statistics, now: Instant) -> String {
        if stats.completed {
            return self.message.finished();
        }
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let speed = stats.current as f64 / elapsed;
        if elapsed == 0.0 || !speed.is_finite() {
            return self.message.cached();
        }
        self.message.refresh(speed)
    }
}

impl Decorator for AverageSpeed {
    fn decor(&mut self, stats: &Statistics) -> String {
        self.decor_at(stats, Instant::now())
    }

    fn as_complete_messenger(&mut self) -> Option<&mut dyn CompleteMessenger> {
        Some(self)
    }

    fn as_average_adjuster(&mut self) -> Option<&mut dyn AverageAdjuster> {
        Some(self)
    }
}

impl CompleteMessenger for AverageSpeed {
    fn on_complete_message(&mut self, msg: String) {
        self.message.set_complete(msg);
    }
}

impl AverageAdjuster for AverageSpeed {
    fn average_adjust(&mut self, start: Instant) {
        trace!(shift = ?start.saturating_duration_since(self.start), "average start moved");
        self.start = start;
    }
}
