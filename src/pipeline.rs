use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::decor::{AmountReceiver, AverageAdjuster, CompleteMessenger, Decorator, Statistics};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub amount: bool,
    pub complete_message: bool,
    pub average_adjust: bool,
}

impl Capabilities {
    pub fn probe(d: &mut dyn Decorator) -> Self {
        Self {
            amount: d.as_amount_receiver().is_some(),
            complete_message: d.as_complete_messenger().is_some(),
            average_adjust: d.as_average_adjuster().is_some(),
        }
    }
}

struct Entry {
    decorator: Box<dyn Decorator>,
    caps: Capabilities,
}

/// Ordered decorators of one bar.
///
/// Capabilities are probed once at composition; updates are only forwarded to
/// the decorators that take them.
#[derive(Default)]
pub struct Decorators {
    entries: Vec<Entry>,
}

impl Decorators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<D: Decorator + 'static>(&mut self, decorator: D) -> Capabilities {
        self.push_boxed(Box::new(decorator))
    }

    pub fn push_boxed(&mut self, mut decorator: Box<dyn Decorator>) -> Capabilities {
        let caps = Capabilities::probe(decorator.as_mut());
        debug!(index = self.entries.len(), ?caps, "Decorator added");
        self.entries.push(Entry { decorator, caps });
        caps
    }

    pub fn with<D: Decorator + 'static>(mut self, decorator: D) -> Self {
        self.push(decorator);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capabilities> + '_ {
        self.entries.iter().map(|e| e.caps)
    }

    pub fn next_amount(&mut self, n: i64, elapsed: Duration) {
        for e in self.entries.iter_mut().filter(|e| e.caps.amount) {
            if let Some(r) = e.decorator.as_amount_receiver() {
                r.next_amount(n, elapsed);
            }
        }
    }

    pub fn on_complete_message(&mut self, msg: &str) {
        for e in self.entries.iter_mut().filter(|e| e.caps.complete_message) {
            if let Some(m) = e.decorator.as_complete_messenger() {
                m.on_complete_message(msg.to_string());
            }
        }
    }

    pub fn average_adjust(&mut self, start: Instant) {
        for e in self.entries.iter_mut().filter(|e| e.caps.average_adjust) {
            if let Some(a) = e.decorator.as_average_adjuster() {
                a.average_adjust(start);
            }
        }
    }

    pub fn render(&mut self, stats: &Statistics) -> Vec<String> {
        self.entries.iter_mut().map(|e| e.decorator.decor(stats)).collect()
    }

    pub fn render_line(&mut self, stats: &Statistics, sep: &str) -> String {
        self.render(stats).join(sep)
    }
}

/// Cloneable, lock-protected handle to one decorator.
///
/// A producer thread can feed amounts while a render thread calls `decor`;
/// every call takes the same lock, so the two never overlap.
#[derive(Clone)]
pub struct SharedDecorator {
    inner: Arc<Mutex<Box<dyn Decorator>>>,
    caps: Capabilities,
}

impl SharedDecorator {
    pub fn new<D: Decorator + 'static>(decorator: D) -> Self {
        let mut boxed: Box<dyn Decorator> = Box::new(decorator);
        let caps = Capabilities::probe(boxed.as_mut());
        Self { inner: Arc::new(Mutex::new(boxed)), caps }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    // Decorator state has no invariant a panicking caller could break halfway.
    fn lock(&self) -> MutexGuard<'_, Box<dyn Decorator>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn decor(&self, stats: &Statistics) -> String {
        self.lock().decor(stats)
    }

    // false when the decorator does not take amounts
    pub fn next_amount(&self, n: i64, elapsed: Duration) -> bool {
        match self.lock().as_amount_receiver() {
            Some(r) => {
                r.next_amount(n, elapsed);
                true
            }
            None => false,
        }
    }

    pub fn on_complete_message(&self, msg: &str) -> bool {
        match self.lock().as_complete_messenger() {
            Some(m) => {
                m.on_complete_message(msg.to_string());
                true
            }
            None => false,
        }
    }

    pub fn average_adjust(&self, start: Instant) -> bool {
        match self.lock().as_average_adjuster() {
            Some(a) => {
                a.average_adjust(start);
                true
            }
            None => false,
        }
    }
}

impl Decorator for SharedDecorator {
    fn decor(&mut self, stats: &Statistics) -> String {
        SharedDecorator::decor(self, stats)
    }

    fn as_amount_receiver(&mut self) -> Option<&mut dyn AmountReceiver> {
        if self.caps.amount { Some(self as &mut dyn AmountReceiver) } else { None }
    }

    fn as_complete_messenger(&mut self) -> Option<&mut dyn CompleteMessenger> {
        if self.caps.complete_message { Some(self as &mut dyn CompleteMessenger) } else { None }
    }

    fn as_average_adjuster(&mut self) -> Option<&mut dyn AverageAdjuster> {
        if self.caps.average_adjust { Some(self as &mut dyn AverageAdjuster) } else { None }
    }
}

impl AmountReceiver for SharedDecorator {
    fn next_amount(&mut self, n: i64, elapsed: Duration) {
        SharedDecorator::next_amount(self, n, elapsed);
    }
}

impl CompleteMessenger for SharedDecorator {
    fn on_complete_message(&mut self, msg: String) {
        SharedDecorator::on_complete_message(self, &msg);
    }
}

impl AverageAdjuster for SharedDecorator {
    fn average_adjust(&mut self, start: Instant) {
        SharedDecorator::average_adjust(self, start);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::speed::{ewma_speed, AverageSpeed, SpeedConfig};
    use crate::units::UnitSystem;

    fn running() -> Statistics {
        Statistics::new(1 << 30, 1 << 20)
    }

    #[test]
    fn probes_capabilities_on_push() {
        let mut set = Decorators::new();
        let smoothed = set.push(ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap());
        let cumulative = set.push(AverageSpeed::new(UnitSystem::Decimal, "%.1f", SpeedConfig::default()).unwrap());
        let plain = set.push(|_: &Statistics| "|".to_string());

        assert_eq!(smoothed, Capabilities { amount: true, complete_message: true, average_adjust: false });
        assert_eq!(cumulative, Capabilities { amount: false, complete_message: true, average_adjust: true });
        assert_eq!(plain, Capabilities::default());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn fans_out_only_to_capable_members() {
        let mut set = Decorators::new()
            .with(ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap())
            .with(|st: &Statistics| format!("{}%", st.current * 100 / st.total));

        set.next_amount(1_048_576, Duration::from_secs(1));
        let stats = Statistics::new(4, 1);
        assert_eq!(set.render_line(&stats, " "), "1.0MiB/s 25%");

        set.on_complete_message("done");
        set.average_adjust(Instant::now());
        assert_eq!(set.render(&stats.completed()), vec!["done".to_string(), "25%".to_string()]);
    }

    #[test]
    fn shared_handle_reports_missing_capability() {
        let shared = SharedDecorator::new(AverageSpeed::new(UnitSystem::Binary, "%.1f", SpeedConfig::default()).unwrap());
        assert!(!shared.next_amount(10, Duration::from_secs(1)));
        assert!(shared.average_adjust(Instant::now()));
        assert!(shared.on_complete_message("fin"));
        assert_eq!(shared.decor(&running().completed()), "fin");
    }

    #[test]
    fn shared_handle_keeps_capabilities_in_a_set() {
        let smoothed = SharedDecorator::new(ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap());
        let cumulative = SharedDecorator::new(AverageSpeed::new(UnitSystem::Binary, "%.1f", SpeedConfig::default()).unwrap());
        let mut set = Decorators::new();
        let caps = set.push(smoothed.clone());
        assert_eq!(caps, smoothed.capabilities());
        assert_eq!(set.push(cumulative), Capabilities { amount: false, complete_message: true, average_adjust: true });

        set.next_amount(1_048_576, Duration::from_secs(1));
        assert_eq!(set.render(&running())[0], "1.0MiB/s");
        assert_eq!(smoothed.decor(&running()), "1.0MiB/s");

        set.on_complete_message("done");
        assert_eq!(set.render_line(&running().completed(), " "), "done done");
    }

    #[test]
    fn shared_handle_across_threads() {
        let shared = SharedDecorator::new(ewma_speed(UnitSystem::Binary, "%.1f", 30.0, SpeedConfig::default()).unwrap());
        let producer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    shared.next_amount(1_048_576, Duration::from_secs(1));
                }
            })
        };
        for _ in 0..100 {
            let _ = shared.decor(&running());
        }
        producer.join().unwrap();
        assert_eq!(shared.decor(&running()), "1.0MiB/s");
    }
}
