//! Throughput decorators for terminal progress bars.
//!
//! A decorator turns raw progress counters into display text. The speed
//! decorators here report a unit-scaled rate such as `1.2 MiB/s`, either
//! smoothed through a [`MovingAverage`] ([`MovingAverageSpeed`]) or averaged
//! over the whole run ([`AverageSpeed`]).

pub mod average;
pub mod decor;
pub mod error;
pub mod pipeline;
pub mod speed;
pub mod units;
pub mod width;

pub use average::{moving_average, ExponentialAverage, MovingAverage, SimpleAverage};
pub use decor::{AmountReceiver, AverageAdjuster, CompleteMessenger, Decorator, Statistics};
pub use error::FormatError;
pub use pipeline::{Capabilities, Decorators, SharedDecorator};
pub use speed::{ewma_speed, AverageSpeed, MovingAverageSpeed, SpeedConfig};
pub use units::{render, SpeedFormat, UnitSystem};
pub use width::{Justify, WidthConfig};
