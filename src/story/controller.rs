//! Step transitions: turn the active section index into handler calls.
//!
//! Moving from step `j` to step `i` runs every handler strictly after `j` up
//! to and including `i`, in the direction of travel. Nothing is skipped, so
//! each handler sees the scene its neighbour left behind.

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::StoryError;

use super::scene::SceneContext;
use super::steps::Step;

/// An ordered set of step handlers.
pub trait Activations {
    fn step_count(&self) -> usize;

    fn run_step(&mut self, index: usize, now: Duration) -> Result<(), StoryError>;
}

impl Activations for SceneContext {
    fn step_count(&self) -> usize {
        Step::ALL.len()
    }

    fn run_step(&mut self, index: usize, now: Duration) -> Result<(), StoryError> {
        let step = Step::from_index(index).ok_or(StoryError::UnknownStep {
            index,
            len: Step::ALL.len(),
        })?;
        self.activate(step, now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepController {
    last_index: Option<usize>,
    failures: usize,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The step the scene was last brought to, if any.
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Handlers that have failed so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Bring `target` to step `index`, returning the indices whose handlers
    /// ran, in order. The first call runs every step from the start.
    ///
    /// A failing handler is logged and the replay carries on; the controller
    /// still records `index` as current. An out-of-range index is rejected
    /// without touching anything.
    pub fn go_to<A: Activations>(
        &mut self,
        target: &mut A,
        index: usize,
        now: Duration,
    ) -> Result<Vec<usize>, StoryError> {
        let len = target.step_count();
        if index >= len {
            return Err(StoryError::UnknownStep { index, len });
        }

        let replay: Vec<usize> = match self.last_index {
            None => (0..=index).collect(),
            Some(last) if index >= last => (last + 1..=index).collect(),
            Some(last) => (index..last).rev().collect(),
        };
        if replay.len() > 1 {
            info!("moving from {:?} to {index}, replaying {replay:?}", self.last_index);
        }

        for &k in &replay {
            debug!("activating step {k}");
            if let Err(e) = target.run_step(k, now) {
                self.failures += 1;
                warn!("step {k} failed: {e}");
            }
        }
        self.last_index = Some(index);
        Ok(replay)
    }
}
