//! Coalesces a burst of triggers into one firing after things go quiet.

use std::time::Duration;

use super::Animated;

#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Debouncer {
            wait,
            deadline: None,
        }
    }

    /// Restart the quiet period.
    pub fn trigger(&mut self, now: Duration) {
        self.deadline = Some(now + self.wait);
    }
}

impl Animated for Debouncer {
    /// Whether the debounced action should run now.
    type Output = bool;

    fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(due) if due <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_fires_once_after_quiet_period() {
        let ms = Duration::from_millis;
        let mut d = Debouncer::new(ms(10));
        d.trigger(ms(0));
        d.trigger(ms(6));
        assert!(!d.poll(ms(12)));
        d.trigger(ms(12));
        assert!(!d.poll(ms(21)));
        assert!(d.poll(ms(22)));
        assert!(!d.poll(ms(100)));
    }

    #[test]
    fn flush_fires_only_when_pending() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        assert!(!d.flush());
        d.trigger(Duration::ZERO);
        assert!(d.flush());
        assert!(!d.is_pending());
    }
}
