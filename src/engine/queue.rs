//! Staggered delivery of an ordered list: each item is handed out once, in
//! order, with a delay after it that grows with the item's weight.

use std::collections::VecDeque;
use std::time::Duration;

use super::Animated;

/// How long an item keeps the queue busy.
pub trait Weighted {
    fn weight(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTiming {
    pub per_unit: Duration,
    pub floor: Duration,
}

impl QueueTiming {
    pub fn fixed(delay: Duration) -> Self {
        QueueTiming {
            per_unit: Duration::ZERO,
            floor: delay,
        }
    }

    pub fn delay_for(&self, weight: f64) -> Duration {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self.per_unit.mul_f64(weight).max(self.floor)
    }
}

#[derive(Debug, Clone)]
pub struct PausableQueue<T> {
    pending: VecDeque<T>,
    delivered: usize,
    timing: QueueTiming,
    deadline: Option<Duration>,
}

impl<T: Weighted> PausableQueue<T> {
    /// An idle queue. Nothing is delivered until `resume`.
    pub fn new(items: Vec<T>, timing: QueueTiming) -> Self {
        PausableQueue {
            pending: items.into(),
            delivered: 0,
            timing,
            deadline: None,
        }
    }

    /// Stop delivering. The item at the cursor stays queued.
    pub fn pause(&mut self) {
        self.deadline = None;
    }

    /// Re-arm from the cursor: the next item is due at `now`.
    pub fn resume(&mut self, now: Duration) {
        if !self.pending.is_empty() && self.deadline.is_none() {
            self.deadline = Some(now);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.deadline.is_none() && !self.pending.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of items already delivered.
    pub fn cursor(&self) -> usize {
        self.delivered
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn deliver_next(&mut self, out: &mut Vec<T>) -> Option<Duration> {
        let item = self.pending.pop_front()?;
        let delay = self.timing.delay_for(item.weight());
        self.delivered += 1;
        out.push(item);
        Some(delay)
    }
}

impl<T: Weighted> Animated for PausableQueue<T> {
    /// Items handed out, in order.
    type Output = Vec<T>;

    fn poll(&mut self, now: Duration) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(due) = self.deadline {
            if due > now {
                break;
            }
            self.deadline = match self.deliver_next(&mut out) {
                Some(delay) if !self.pending.is_empty() => Some(due + delay),
                _ => None,
            };
        }
        out
    }

    fn flush(&mut self) -> Vec<T> {
        self.pause();
        let mut out = Vec::with_capacity(self.pending.len());
        while self.deliver_next(&mut out).is_some() {}
        out
    }

    fn cancel(&mut self) {
        self.pause();
        self.pending.clear();
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Item(u32, f64);

    impl Weighted for Item {
        fn weight(&self) -> f64 {
            self.1
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn five() -> PausableQueue<Item> {
        let items = (0..5).map(|i| Item(i, 1.0)).collect();
        PausableQueue::new(items, QueueTiming::fixed(ms(100)))
    }

    fn ids(items: &[Item]) -> Vec<u32> {
        items.iter().map(|i| i.0).collect()
    }

    #[test]
    fn nothing_is_delivered_before_resume() {
        let mut queue = five();
        assert!(queue.poll(ms(10_000)).is_empty());
        assert!(queue.is_paused());
    }

    #[test]
    fn pause_holds_the_cursor_until_resume() {
        let mut queue = five();
        queue.resume(ms(0));
        assert_eq!(ids(&queue.poll(ms(0))), vec![0]);
        assert_eq!(ids(&queue.poll(ms(150))), vec![1]);

        queue.pause();
        assert!(queue.poll(ms(5_000)).is_empty());
        assert_eq!(queue.cursor(), 2);

        queue.resume(ms(5_000));
        let mut after = ids(&queue.poll(ms(5_000)));
        after.extend(ids(&queue.poll(ms(5_100))));
        after.extend(ids(&queue.poll(ms(5_200))));
        assert_eq!(after, vec![2, 3, 4]);
        assert!(queue.is_exhausted());
        assert!(queue.poll(ms(99_999)).is_empty());
    }

    #[test]
    fn flush_delivers_the_rest_once() {
        let mut queue = five();
        queue.resume(ms(0));
        queue.poll(ms(0));
        assert_eq!(ids(&queue.flush()), vec![1, 2, 3, 4]);
        assert_eq!(queue.next_deadline(), None);
        assert!(queue.flush().is_empty());
        queue.resume(ms(10));
        assert!(queue.poll(ms(10_000)).is_empty());
    }

    #[test]
    fn delay_follows_weight_with_floor() {
        let timing = QueueTiming {
            per_unit: ms(10),
            floor: ms(40),
        };
        assert_eq!(timing.delay_for(1.0), ms(40));
        assert_eq!(timing.delay_for(12.0), ms(120));
        assert_eq!(timing.delay_for(f64::NAN), ms(40));

        let mut queue = PausableQueue::new(vec![Item(0, 12.0), Item(1, 1.0), Item(2, 1.0)], timing);
        queue.resume(ms(0));
        queue.poll(ms(0));
        assert_eq!(queue.next_deadline(), Some(ms(120)));
        queue.poll(ms(120));
        assert_eq!(queue.next_deadline(), Some(ms(160)));
    }

    #[test]
    fn cancel_drops_pending_items() {
        let mut queue = five();
        queue.resume(ms(0));
        queue.cancel();
        assert!(queue.is_exhausted());
        assert!(queue.flush().is_empty());
    }

    proptest! {
        #[test]
        fn any_schedule_delivers_each_item_once_in_order(
            ops in proptest::collection::vec((0u8..4, 0u64..400), 0..40)
        ) {
            let mut queue = PausableQueue::new(
                (0..8).map(|i| Item(i, 1.0)).collect(),
                QueueTiming::fixed(ms(50)),
            );
            let mut seen = Vec::new();
            let mut now = ms(0);
            for (op, advance) in ops {
                now += ms(advance);
                match op {
                    0 => queue.resume(now),
                    1 => queue.pause(),
                    2 => seen.extend(ids(&queue.poll(now))),
                    _ => seen.extend(ids(&queue.flush())),
                }
            }
            seen.extend(ids(&queue.flush()));
            prop_assert_eq!(seen, (0..8).collect::<Vec<_>>());
        }
    }
}
