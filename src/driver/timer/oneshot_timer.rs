use std::time::Duration;

/// Completion callback of a one-shot timer, called from the timer context.
pub type TimerCallback = Box<dyn FnMut() + Send>;

/// A single hardware style one-shot timer.
///
/// - `init` registers the completion callback, once, at startup
/// - `arm` drops any pending arming and fires the callback once after `delay`
/// - arming again from inside the callback is the normal way to chain phases
/// - the callback is never entered twice at the same time
pub trait OneshotTimer {
    fn init(&mut self, callback: TimerCallback);

    fn arm(&mut self, delay: Duration);

    fn cancel(&mut self);
}
