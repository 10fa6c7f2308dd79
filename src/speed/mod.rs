//! Speed decorators: a smoothed one driven by per-chunk timings and a
//! cumulative one averaging over the whole run.

mod cumulative;
mod smoothed;

pub use cumulative::AverageSpeed;
pub use smoothed::{ewma_speed, MovingAverageSpeed};

use crate::units::{SpeedFormat, UnitSystem};
use crate::width::{Justify, WidthConfig};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpeedConfig {
    pub width: WidthConfig,
}

impl SpeedConfig {
    pub fn width(mut self, width: usize) -> Self {
        self.width.width = width;
        self
    }

    pub fn justify(mut self, justify: Justify) -> Self {
        self.width.justify = justify;
        self
    }
}

/// Message state common to both speed decorators: the last rendered value and
/// the optional override shown after completion.
#[derive(Clone, Debug)]
struct SpeedMessage {
    wc: WidthConfig,
    unit: UnitSystem,
    format: SpeedFormat,
    msg: String,
    complete_msg: Option<String>,
}

impl SpeedMessage {
    fn new(unit: UnitSystem, format: SpeedFormat, config: SpeedConfig) -> Self {
        let mut wc = config.width;
        wc.init();
        Self { wc, unit, format, msg: String::new(), complete_msg: None }
    }

    fn finished(&self) -> String {
        match &self.complete_msg {
            Some(done) => self.wc.format_msg(done),
            None => self.cached(),
        }
    }

    fn cached(&self) -> String {
        self.wc.format_msg(&self.msg)
    }

    fn refresh(&mut self, speed: f64) -> String {
        self.msg = self.format.render(speed, self.unit);
        self.cached()
    }

    fn set_complete(&mut self, msg: String) {
        self.complete_msg = Some(msg);
    }
}
