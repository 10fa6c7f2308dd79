use std::time::Duration;

use crate::average::{moving_average, MovingAverage};
use crate::decor::{AmountReceiver, CompleteMessenger, Decorator, Statistics};
use crate::error::FormatError;
use crate::units::{SpeedFormat, UnitSystem};

use super::{SpeedConfig, SpeedMessage};

// samples are kept in kilo-units per second
const SAMPLE_SCALE: f64 = 1000.0;

/// Speed decorator backed by a [`MovingAverage`] of per-chunk rates.
///
/// With [`UnitSystem::Binary`] a format of `"%.1f"` renders `"1.0MiB/s"`,
/// `"% .1f"` renders `"1.0 MiB/s"`.
pub struct MovingAverageSpeed {
    message: SpeedMessage,
    average: Box<dyn MovingAverage>,
}

impl MovingAverageSpeed {
    pub fn new(
        unit: UnitSystem,
        format: &str,
        average: Box<dyn MovingAverage>,
        config: SpeedConfig,
    ) -> Result<Self, FormatError> {
        let format = SpeedFormat::parse(format)?;
        Ok(Self::with_format(unit, format, average, config))
    }

    pub fn with_format(
        unit: UnitSystem,
        format: SpeedFormat,
        average: Box<dyn MovingAverage>,
        config: SpeedConfig,
    ) -> Self {
        Self { message: SpeedMessage::new(unit, format, config), average }
    }

    /// The running average, in kilo-units per second.
    pub fn average(&self) -> &dyn MovingAverage {
        self.average.as_ref()
    }
}

// Undoes the kilo-unit scaling, snapping back onto whole units that the
// divide-then-multiply round trip missed by an ulp or so.
fn unscale(kilo: f64) -> f64 {
    let speed = kilo * SAMPLE_SCALE;
    let nearest = speed.round();
    if (speed - nearest).abs() <= speed.abs() * 1e-12 {
        nearest
    } else {
        speed
    }
}

/// Smoothed speed decorator using an exponentially weighted average of `age`.
pub fn ewma_speed(
    unit: UnitSystem,
    format: &str,
    age: f64,
    config: SpeedConfig,
) -> Result<MovingAverageSpeed, FormatError> {
    MovingAverageSpeed::new(unit, format, moving_average(age), config)
}

impl Decorator for MovingAverageSpeed {
    fn decor(&mut self, stats: &Statistics) -> String {
        if stats.completed {
            return self.message.finished();
        }
        self.message.refresh(unscale(self.average.value()))
    }

    fn as_amount_receiver(&mut self) -> Option<&mut dyn AmountReceiver> {
        Some(self)
    }

    fn as_complete_messenger(&mut self) -> Option<&mut dyn CompleteMessenger> {
        Some(self)
    }
}

impl AmountReceiver for MovingAverageSpeed {
    fn next_amount(&mut self, n: i64, elapsed: Duration) {
        let speed = n as f64 / elapsed.as_secs_f64() / SAMPLE_SCALE;
        if !speed.is_finite() {
            return;
        }
        self.average.add(speed);
    }
}

impl CompleteMessenger for MovingAverageSpeed {
    fn on_complete_message(&mut self, msg: String) {
        self.message.set_complete(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::width::Justify;

    fn running() -> Statistics {
        Statistics::new(100 << 20, 1 << 20)
    }

    #[test]
    fn one_mebibyte_in_one_second() {
        let mut d = ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(1_048_576, Duration::from_secs(1));
        assert_eq!(d.decor(&running()), "1.0MiB/s");
    }

    #[test]
    fn samples_are_kilo_units() {
        let mut d = ewma_speed(UnitSystem::Decimal, "%.1f", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(4000, Duration::from_secs(2));
        assert!((d.average().value() - 2.0).abs() < 1e-12);
        assert_eq!(d.decor(&running()), "2.0kB/s");
    }

    #[test]
    fn zero_duration_is_discarded() {
        let mut d = ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(2048, Duration::from_secs(1));
        let before = d.decor(&running());
        let value = d.average().value();

        d.next_amount(4096, Duration::ZERO);
        d.next_amount(0, Duration::ZERO);
        assert_eq!(d.average().value(), value);
        assert_eq!(d.decor(&running()), before);
    }

    #[test]
    fn whole_rates_survive_kilo_scaling() {
        let mut d = ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(1023, Duration::from_secs(1));
        assert_eq!(d.decor(&running()), "1023b/s");

        let mut d = ewma_speed(UnitSystem::None, "%d", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(1001, Duration::from_secs(1));
        assert_eq!(d.decor(&running()), "1001");
    }

    #[test]
    fn unscale_leaves_fractions_alone() {
        assert!((unscale(1.0235) - 1023.5).abs() < 1e-9);
        assert_eq!(unscale(0.0), 0.0);
    }

    #[test]
    fn nothing_recorded_renders_zero() {
        let mut d = ewma_speed(UnitSystem::Decimal, "% .2f", 30.0, SpeedConfig::default()).unwrap();
        assert_eq!(d.decor(&running()), "0 b/s");
    }

    #[test]
    fn completion_message_wins() {
        let cfg = SpeedConfig::default().width(10).justify(Justify::Left);
        let mut d = ewma_speed(UnitSystem::Binary, "%.1f", 30.0, cfg).unwrap();
        d.next_amount(1_048_576, Duration::from_secs(1));
        d.decor(&running());
        d.on_complete_message("done".into());

        let done = running().completed();
        assert_eq!(d.decor(&done), "done      ");
        d.next_amount(1, Duration::from_millis(1));
        d.next_amount(1 << 40, Duration::from_secs(1));
        assert_eq!(d.decor(&done), "done      ");
    }

    #[test]
    fn completion_freezes_last_value() {
        let mut d = ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap();
        d.next_amount(2048, Duration::from_secs(1));
        assert_eq!(d.decor(&running()), "2.0KiB/s");
        d.next_amount(1 << 30, Duration::from_secs(1));
        assert_eq!(d.decor(&running().completed()), "2.0KiB/s");
    }

    #[test]
    fn bad_format_is_rejected() {
        let err = ewma_speed(UnitSystem::Binary, "%q", 30.0, SpeedConfig::default()).err();
        assert!(matches!(err, Some(FormatError::UnknownVerb { verb: 'q', .. })));
    }

    #[test]
    fn exposes_its_capabilities() {
        let mut d = ewma_speed(UnitSystem::None, "%d", 30.0, SpeedConfig::default()).unwrap();
        assert!(d.as_amount_receiver().is_some());
        assert!(d.as_complete_messenger().is_some());
        assert!(d.as_average_adjuster().is_none());
    }
}
