//! Hand-drawn reveal: a precomputed path becomes visible one point at a time.

use std::time::Duration;

use super::Animated;

#[derive(Debug, Clone)]
pub struct IncrementalReveal<P> {
    points: Vec<P>,
    cursor: usize,
    interval: Duration,
    deadline: Option<Duration>,
}

impl<P> IncrementalReveal<P> {
    /// A reveal that has not started: nothing is visible yet.
    pub fn new(points: Vec<P>, interval: Duration) -> Self {
        IncrementalReveal {
            points,
            cursor: 0,
            interval,
            deadline: None,
        }
    }

    /// A reveal with every point already visible.
    pub fn complete(points: Vec<P>) -> Self {
        let cursor = points.len();
        IncrementalReveal {
            points,
            cursor,
            interval: Duration::ZERO,
            deadline: None,
        }
    }

    /// Show the first point now and schedule the rest.
    pub fn start(&mut self, now: Duration) {
        self.deadline = Some(now);
        self.poll(now);
    }

    pub fn revealed(&self) -> &[P] {
        &self.points[..self.cursor]
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.points.len()
    }

    /// Swap the underlying path. A finished reveal shows all of the new
    /// points; an unfinished one keeps its progress.
    pub fn set_points(&mut self, points: Vec<P>) {
        let was_complete = self.is_complete();
        self.points = points;
        self.cursor = if was_complete {
            self.points.len()
        } else {
            self.cursor.min(self.points.len())
        };
        if self.is_complete() {
            self.deadline = None;
        }
    }
}

impl<P> Animated for IncrementalReveal<P> {
    /// Whether any point became visible.
    type Output = bool;

    fn poll(&mut self, now: Duration) -> bool {
        let mut changed = false;
        while let Some(due) = self.deadline {
            if due > now || self.is_complete() {
                break;
            }
            self.cursor += 1;
            changed = true;
            self.deadline = if self.is_complete() {
                None
            } else {
                Some(due + self.interval)
            };
        }
        if self.is_complete() {
            self.deadline = None;
        }
        changed
    }

    fn flush(&mut self) -> bool {
        self.deadline = None;
        let changed = !self.is_complete();
        self.cursor = self.points.len();
        changed
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

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn start_shows_first_point_and_schedules_next() {
        let mut reveal = IncrementalReveal::new(vec![1, 2, 3, 4], ms(5));
        assert!(reveal.revealed().is_empty());
        reveal.start(ms(100));
        assert_eq!(reveal.revealed(), &[1]);
        assert_eq!(reveal.next_deadline(), Some(ms(105)));
    }

    #[test]
    fn poll_reveals_every_due_point() {
        let mut reveal = IncrementalReveal::new(vec![1, 2, 3, 4], ms(5));
        reveal.start(ms(0));
        assert!(!reveal.poll(ms(4)));
        assert!(reveal.poll(ms(10)));
        assert_eq!(reveal.revealed(), &[1, 2, 3]);
        assert!(reveal.poll(ms(15)));
        assert!(reveal.is_complete());
        assert_eq!(reveal.next_deadline(), None);
    }

    #[test]
    fn flush_completes_synchronously_and_disarms() {
        let mut reveal = IncrementalReveal::new((0..50).collect::<Vec<_>>(), ms(5));
        reveal.start(ms(0));
        reveal.poll(ms(5));
        assert!(reveal.flush());
        assert_eq!(reveal.revealed().len(), 50);
        assert!(!reveal.is_pending());
        assert!(!reveal.poll(ms(10_000)));
        assert!(!reveal.flush());
    }

    #[test]
    fn cancel_freezes_progress() {
        let mut reveal = IncrementalReveal::new(vec![1, 2, 3], ms(5));
        reveal.start(ms(0));
        reveal.cancel();
        assert!(!reveal.poll(ms(100)));
        assert_eq!(reveal.revealed(), &[1]);
    }

    #[test]
    fn set_points_keeps_completion() {
        let mut reveal = IncrementalReveal::complete(vec![1, 2]);
        reveal.set_points(vec![7, 8, 9]);
        assert_eq!(reveal.revealed(), &[7, 8, 9]);

        let mut partial = IncrementalReveal::new(vec![1, 2, 3], ms(5));
        partial.start(ms(0));
        partial.set_points(vec![4, 5]);
        assert_eq!(partial.revealed(), &[4]);
    }

    #[test]
    fn empty_reveal_is_complete() {
        let mut reveal: IncrementalReveal<u8> = IncrementalReveal::new(Vec::new(), ms(5));
        reveal.start(ms(0));
        assert!(reveal.is_complete());
        assert!(!reveal.is_pending());
    }
}
