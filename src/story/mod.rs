//! Story: the scroll-driven narrative.
//!
//! The scroller turns a column offset into an active section; the controller
//! turns a change of section into an ordered run of step handlers; each
//! handler rewrites the shared `SceneContext`. Resizes re-place whatever the
//! current step shows.

pub mod controller;
pub mod lines;
pub mod resize;
pub mod scene;
pub mod scroller;
pub mod steps;

pub use controller::{Activations, StepController};
pub use resize::{Dimensions, ResizeHandler, relayout};
pub use scene::{Popup, SceneContext};
pub use scroller::{Scroller, Section, story_sections};
pub use steps::Step;
