/// Samples averaged by plain mean before exponential decay kicks in.
pub const WARMUP_SAMPLES: u32 = 10;

pub const DEFAULT_AGE: f64 = 30.0;

/// A running rate estimate fed with discrete samples.
///
/// Implementations are not synchronized; the estimator owning one serializes
/// access through `&mut self`.
pub trait MovingAverage: Send {
    fn add(&mut self, sample: f64);
    /// Current estimate, 0 before any sample.
    fn value(&self) -> f64;
    fn set(&mut self, value: f64);
}

fn decay_for(age: f64) -> f64 {
    2.0 / (age + 1.0)
}

/// Exponentially weighted moving average with a warm-up phase.
///
/// The first [`WARMUP_SAMPLES`] samples are combined as an unweighted mean so
/// the very first sample does not dominate; after that each sample moves the
/// estimate by `decay * (sample - estimate)` with `decay = 2 / (age + 1)`.
#[derive(Clone, Debug)]
pub struct ExponentialAverage {
    decay: f64,
    value: f64,
    count: u32,
}

impl ExponentialAverage {
    pub fn new(age: f64) -> Self {
        Self { decay: decay_for(age), value: 0.0, count: 0 }
    }

    pub fn is_warm(&self) -> bool {
        self.count >= WARMUP_SAMPLES
    }
}

impl Default for ExponentialAverage {
    fn default() -> Self {
        Self::new(DEFAULT_AGE)
    }
}

impl MovingAverage for ExponentialAverage {
    fn add(&mut self, sample: f64) {
        if self.count < WARMUP_SAMPLES {
            self.count += 1;
            self.value += (sample - self.value) / f64::from(self.count);
        } else {
            self.value += self.decay * (sample - self.value);
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn set(&mut self, value: f64) {
        self.value = value;
        self.count = WARMUP_SAMPLES;
    }
}

/// EWMA with a fixed age of [`DEFAULT_AGE`] and no warm-up: the first sample
/// seeds the estimate.
#[derive(Clone, Debug, Default)]
pub struct SimpleAverage {
    value: Option<f64>,
}

impl MovingAverage for SimpleAverage {
    fn add(&mut self, sample: f64) {
        self.value = Some(match self.value {
            None => sample,
            Some(v) => v + decay_for(DEFAULT_AGE) * (sample - v),
        });
    }

    fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    fn set(&mut self, value: f64) {
        self.value = Some(value);
    }
}

/// Picks an implementation for `age`: zero selects [`SimpleAverage`],
/// anything else an [`ExponentialAverage`] of that age.
pub fn moving_average(age: f64) -> Box<dyn MovingAverage> {
    if age == 0.0 {
        Box::new(SimpleAverage::default())
    } else {
        Box::new(ExponentialAverage::new(age))
    }
}
