use std::time::Duration;

use permit_story::error::StoryError;
use permit_story::story::{Activations, StepController};
use proptest::prelude::*;

/// Remembers every handler call; tracks what the scene would show.
struct Tape {
    count: usize,
    calls: Vec<usize>,
}

impl Activations for Tape {
    fn step_count(&self) -> usize {
        self.count
    }

    fn run_step(&mut self, index: usize, _now: Duration) -> Result<(), StoryError> {
        self.calls.push(index);
        Ok(())
    }
}

proptest! {
    #[test]
    fn every_jump_runs_a_contiguous_run_ending_at_the_target(
        count in 1usize..12,
        jumps in prop::collection::vec(0usize..12, 1..20),
    ) {
        let mut tape = Tape { count, calls: Vec::new() };
        let mut controller = StepController::new();
        for jump in jumps {
            let index = jump % count;
            let before = controller.last_index();
            tape.calls.clear();
            let ran = controller.go_to(&mut tape, index, Duration::ZERO).unwrap();
            prop_assert_eq!(&ran, &tape.calls);
            prop_assert_eq!(controller.last_index(), Some(index));
            match before {
                Some(last) if last == index => prop_assert!(ran.is_empty()),
                Some(last) => {
                    prop_assert_eq!(ran.len(), last.abs_diff(index));
                    prop_assert_eq!(ran.last().copied(), Some(index));
                    for pair in ran.windows(2) {
                        prop_assert_eq!(pair[0].abs_diff(pair[1]), 1);
                    }
                }
                None => prop_assert_eq!(ran, (0..=index).collect::<Vec<_>>()),
            }
        }
    }
}

#[test]
fn stepping_past_the_end_is_an_error() {
    let mut tape = Tape { count: 8, calls: Vec::new() };
    let mut controller = StepController::new();
    let err = controller.go_to(&mut tape, 8, Duration::ZERO).unwrap_err();
    assert!(matches!(err, StoryError::UnknownStep { index: 8, len: 8 }));
    assert!(tape.calls.is_empty());
    assert_eq!(controller.last_index(), None);
}
