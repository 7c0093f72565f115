mod error;
mod event;
mod event_loop;
mod interval;
mod repeating;
mod scheduler;

#[cfg(feature = "_test")]
pub mod tests;

pub use error::{Error, Result};
pub use event::{Listener, TimerEvent};
pub use event_loop::{ClockMode, EventLoop, EventLoopOptions};
pub use interval::Interval;
pub use repeating::{RepeatingTimer, TimerOptions, WeakTimer};
