use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::Error;

/// A callback registered on a [`RepeatingTimer`](crate::RepeatingTimer).
///
/// Listeners are compared by identity, so keep the `Rc` around to remove one later.
pub type Listener = Rc<dyn Fn()>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TimerEvent {
    /// Fired on every tick.
    Tick,
    /// Fired once after the final repetition.
    Complete,
}

impl TimerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEvent::Tick => "TIMER",
            TimerEvent::Complete => "TIMER_COMPLETE",
        }
    }
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TIMER" => Ok(TimerEvent::Tick),
            "TIMER_COMPLETE" => Ok(TimerEvent::Complete),
            _ => Err(Error::UnknownEvent(s.to_owned())),
        }
    }
}

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<Listener>,
}

impl Listeners {
    pub fn push(&mut self, listener: Listener) {
        self.entries.push(listener);
    }

    /// Removes every registration of `listener`, returning how many were removed.
    pub fn remove(&mut self, listener: &Listener) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !Rc::ptr_eq(entry, listener));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn snapshot(&self) -> Vec<Listener> {
        self.entries.clone()
    }
}
