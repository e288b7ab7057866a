use std::time::{Duration, Instant};

/// Default quiet period for search input.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Trailing-edge debouncer driven by an explicit clock.
///
/// Each [`schedule`](Self::schedule) replaces the pending value and restarts
/// the quiet period, so a burst of keystrokes collapses into one delivery of
/// the last value. Nothing runs on a timer: the caller polls with the current
/// instant from its own event loop.
///
/// # Examples
///
/// ```
/// use paddock::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let mut search = Debouncer::new(Duration::from_millis(300));
/// let t0 = Instant::now();
///
/// search.schedule("po", t0);
/// search.schedule("pors", t0 + Duration::from_millis(100));
/// assert_eq!(search.poll(t0 + Duration::from_millis(350)), None);
/// assert_eq!(search.poll(t0 + Duration::from_millis(400)), Some("pors"));
/// assert_eq!(search.poll(t0 + Duration::from_millis(900)), None);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value with `value`, due `delay` after `now`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }
        self.cancel()
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without delivering it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Debouncer::new(DEFAULT_DELAY)
    }
}
