pub mod oneshot_timer;
pub mod thread_timer;

pub use oneshot_timer::{OneshotTimer, TimerCallback};
pub use thread_timer::ThreadTimer;
