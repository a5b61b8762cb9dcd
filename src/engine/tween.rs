//! Attribute transitions: numeric vectors interpolated from a start state to
//! an end state over a fixed duration.

use std::time::Duration;

use super::Animated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    /// Symmetric cubic ease, the usual default for chart transitions.
    #[default]
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
        }
    }
}

/// One animated target. Values past the end of `from` jump straight to `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<K> {
    pub key: K,
    pub from: Vec<f64>,
    pub to: Vec<f64>,
}

impl<K: Copy> Track<K> {
    pub fn new(key: K, from: Vec<f64>, to: Vec<f64>) -> Self {
        Track { key, from, to }
    }

    fn sample(&self, eased: f64) -> (K, Vec<f64>) {
        let values = self
            .to
            .iter()
            .enumerate()
            .map(|(i, &end)| match self.from.get(i) {
                Some(&start) => start + (end - start) * eased,
                None => end,
            })
            .collect();
        (self.key, values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { start: Duration, last: Duration },
    Done,
}

#[derive(Debug, Clone)]
pub struct Tween<K> {
    tracks: Vec<Track<K>>,
    duration: Duration,
    easing: Easing,
    /// Polling cadence while running.
    frame: Duration,
    phase: Phase,
}

/// Interpolated values for every track at one instant.
pub type TweenSample<K> = Vec<(K, Vec<f64>)>;

impl<K: Copy> Tween<K> {
    pub fn new(tracks: Vec<Track<K>>, duration: Duration) -> Self {
        Tween {
            tracks,
            duration,
            easing: Easing::default(),
            frame: Duration::from_millis(16),
            phase: Phase::Idle,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame.max(Duration::from_millis(1));
        self
    }

    pub fn start(&mut self, now: Duration) {
        self.phase = Phase::Running { start: now, last: now };
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn tracks(&self) -> &[Track<K>] {
        &self.tracks
    }

    fn sample(&self, t: f64) -> TweenSample<K> {
        let eased = self.easing.apply(t);
        self.tracks.iter().map(|track| track.sample(eased)).collect()
    }
}

impl<K: Copy> Animated for Tween<K> {
    /// Values to apply, if the tween was running.
    type Output = Option<TweenSample<K>>;

    fn poll(&mut self, now: Duration) -> Option<TweenSample<K>> {
        let Phase::Running { start, .. } = self.phase else {
            return None;
        };
        let elapsed = now.saturating_sub(start);
        let t = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / self.duration.as_secs_f64()
        };
        self.phase = if t >= 1.0 {
            Phase::Done
        } else {
            Phase::Running { start, last: now }
        };
        Some(self.sample(t.min(1.0)))
    }

    fn flush(&mut self) -> Option<TweenSample<K>> {
        if !self.is_running() {
            return None;
        }
        self.phase = Phase::Done;
        Some(self.sample(1.0))
    }

    /// Interrupt: the targets stay wherever the last poll left them.
    fn cancel(&mut self) {
        if self.is_running() {
            self.phase = Phase::Done;
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        match self.phase {
            Phase::Running { start, last } => {
                let end = start + self.duration;
                Some((last + self.frame).min(end))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tween() -> Tween<u8> {
        Tween::new(vec![Track::new(1, vec![0.0, 10.0], vec![100.0, 10.0, 7.0])], ms(1000))
            .with_easing(Easing::Linear)
    }

    #[test]
    fn idle_tween_produces_nothing() {
        let mut t = tween();
        assert_eq!(t.poll(ms(500)), None);
        assert_eq!(t.flush(), None);
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn poll_interpolates_and_finishes() {
        let mut t = tween();
        t.start(ms(1000));
        let half = t.poll(ms(1500)).unwrap();
        assert_eq!(half, vec![(1, vec![50.0, 10.0, 7.0])]);
        assert!(t.is_running());
        let end = t.poll(ms(2500)).unwrap();
        assert_eq!(end, vec![(1, vec![100.0, 10.0, 7.0])]);
        assert!(t.is_done());
        assert_eq!(t.poll(ms(3000)), None);
    }

    #[test]
    fn flush_jumps_to_the_end() {
        let mut t = tween();
        t.start(ms(0));
        assert_eq!(t.flush().unwrap()[0].1[0], 100.0);
        assert!(t.is_done());
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn zero_duration_completes_on_first_poll() {
        let mut t = Tween::new(vec![Track::new(0u8, vec![1.0], vec![2.0])], Duration::ZERO);
        t.start(ms(5));
        assert_eq!(t.poll(ms(5)).unwrap(), vec![(0, vec![2.0])]);
        assert!(t.is_done());
    }

    #[test]
    fn deadline_follows_frame_cadence_and_end() {
        let mut t = tween().with_frame(ms(16));
        t.start(ms(0));
        assert_eq!(t.next_deadline(), Some(ms(16)));
        t.poll(ms(990));
        assert_eq!(t.next_deadline(), Some(ms(1000)));
    }

    #[test]
    fn cubic_easing_is_symmetric() {
        let e = Easing::CubicInOut;
        assert_eq!(e.apply(0.0), 0.0);
        assert_eq!(e.apply(0.5), 0.5);
        assert_eq!(e.apply(1.0), 1.0);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-12);
    }
}
