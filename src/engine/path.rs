//! The zigzag "ribbon" used to draw counts: one point per unit, walking a
//! fixed number of steps right, then left, then right again, shifting the
//! value by a fixed amount after every completed pass.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub step: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation {
    pub total_steps: usize,
    pub step_length: f64,
    pub initial_value: f64,
    pub value_change: f64,
    pub increasing: bool,
    /// Points per pass before the walk turns around.
    pub cycle_length: usize,
}

impl Oscillation {
    /// Number of passes that complete within `total_steps`.
    pub fn completed_cycles(&self) -> usize {
        self.total_steps / self.cycle_length.max(1)
    }

    /// Value of the last point.
    pub fn final_value(&self) -> f64 {
        let cycles = self.total_steps.saturating_sub(1) / self.cycle_length.max(1);
        self.shifted(cycles)
    }

    fn shifted(&self, cycles: usize) -> f64 {
        let delta = self.value_change * cycles as f64;
        if self.increasing {
            self.initial_value + delta
        } else {
            self.initial_value - delta
        }
    }
}

/// Generate the path. Pure: the same input always yields the same points.
/// A trailing partial pass keeps the value of the pass it belongs to.
pub fn oscillating_path(osc: &Oscillation) -> Vec<PathPoint> {
    let cycle = osc.cycle_length.max(1);
    (0..osc.total_steps)
        .map(|i| {
            let pass = i / cycle;
            let offset = i % cycle;
            let index = if pass % 2 == 0 { offset } else { cycle - 1 - offset };
            PathPoint {
                step: index as f64 * osc.step_length,
                value: osc.shifted(pass),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn zigzag(total: usize) -> Oscillation {
        Oscillation {
            total_steps: total,
            step_length: 2.0,
            initial_value: 100.0,
            value_change: 5.0,
            increasing: false,
            cycle_length: 10,
        }
    }

    #[test]
    fn value_drops_once_per_completed_cycle() {
        let path = oscillating_path(&zigzag(25));
        assert_eq!(path.len(), 25);
        assert_eq!(path[0].value, 100.0);
        assert_eq!(path[9].value, 100.0);
        assert_eq!(path[10].value, 95.0);
        assert_eq!(path[20].value, 90.0);
        assert_eq!(path[24].value, 90.0);
    }

    #[test]
    fn walk_turns_around_every_cycle() {
        let path = oscillating_path(&zigzag(30));
        let forward: Vec<f64> = path[0..10].iter().map(|p| p.step).collect();
        let back: Vec<f64> = path[10..20].iter().map(|p| p.step).collect();
        let again: Vec<f64> = path[20..30].iter().map(|p| p.step).collect();
        let expected: Vec<f64> = (0..10).map(|i| i as f64 * 2.0).collect();
        assert_eq!(forward, expected);
        assert_eq!(back, expected.iter().rev().copied().collect::<Vec<_>>());
        assert_eq!(again, expected);
    }

    #[test]
    fn increasing_paths_climb() {
        let mut s = zigzag(21);
        s.increasing = true;
        let path = oscillating_path(&s);
        assert_eq!(path[20].value, 110.0);
        assert_eq!(s.final_value(), 110.0);
    }

    #[test]
    fn zero_cycle_length_is_treated_as_one() {
        let mut s = zigzag(3);
        s.cycle_length = 0;
        let path = oscillating_path(&s);
        assert_eq!(path.iter().map(|p| p.value).collect::<Vec<_>>(), vec![100.0, 95.0, 90.0]);
        assert!(path.iter().all(|p| p.step == 0.0));
    }

    #[test]
    fn empty_path() {
        assert!(oscillating_path(&zigzag(0)).is_empty());
        assert_eq!(zigzag(0).completed_cycles(), 0);
    }

    proptest! {
        #[test]
        fn generation_is_deterministic_and_bounded(
            total in 0usize..400,
            cycle in 1usize..60,
            length in 0.1f64..4.0,
        ) {
            let s = Oscillation { total_steps: total, step_length: length, initial_value: 50.0, value_change: 1.5, increasing: false, cycle_length: cycle };
            let a = oscillating_path(&s);
            let b = oscillating_path(&s);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len(), total);
            for p in &a {
                prop_assert!(p.step >= 0.0 && p.step <= (cycle - 1) as f64 * length + 1e-9);
            }
            if let Some(last) = a.last() {
                prop_assert_eq!(last.value, s.final_value());
            }
        }
    }
}
