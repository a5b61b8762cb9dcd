//! Engine: the timed animation primitives.
//!
//! Nothing in here runs on its own. Each primitive stores the deadline of its
//! next piece of work and does it when polled with the current time, so the
//! whole story runs on one cooperative loop and tests can drive it with
//! synthetic timestamps. Cancelling means forgetting the deadline.

pub mod debounce;
pub mod path;
pub mod queue;
pub mod reveal;
pub mod tween;

use std::time::Duration;

/// The handle shared by every timed primitive, so the scene can poll, flush
/// or cancel in-flight work of any kind the same way.
pub trait Animated {
    /// What one poll or flush produced.
    type Output;

    /// Do every piece of work whose deadline is at or before `now`.
    fn poll(&mut self, now: Duration) -> Self::Output;

    /// Do all remaining work immediately. Nothing fires afterwards.
    fn flush(&mut self) -> Self::Output;

    /// Drop remaining work without doing it.
    fn cancel(&mut self);

    /// When the primitive next needs polling, if it has pending work.
    fn next_deadline(&self) -> Option<Duration>;

    fn is_pending(&self) -> bool {
        self.next_deadline().is_some()
    }
}

/// The earliest of several optional deadlines.
pub fn earliest<I>(deadlines: I) -> Option<Duration>
where
    I: IntoIterator<Item = Option<Duration>>,
{
    deadlines.into_iter().flatten().min()
}
