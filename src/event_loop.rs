use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::scheduler::{Clock, Timers};
use crate::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockMode {
    /// Deadlines follow the monotonic system clock.
    System,
    /// Time stands still until [`EventLoop::advance`] moves it.
    Manual,
}

#[derive(Clone, Debug)]
pub struct EventLoopOptions {
    pub(crate) clock: ClockMode,
}

impl Default for EventLoopOptions {
    fn default() -> Self {
        EventLoopOptions {
            clock: ClockMode::System,
        }
    }
}

impl EventLoopOptions {
    pub fn new() -> EventLoopOptions {
        Self::default()
    }

    pub fn clock(&mut self, clock: ClockMode) -> &mut Self {
        self.clock = clock;
        self
    }

    pub fn build(&self) -> Result<EventLoop> {
        let clock = match self.clock {
            ClockMode::System => Clock::System,
            ClockMode::Manual => Clock::Manual(Cell::new(Instant::now())),
        };

        Ok(EventLoop {
            state: Rc::new(EventLoopState {
                clock,
                timers: Timers::new(),
                exit: Cell::new(false),
            }),
            _marker: PhantomData,
        })
    }
}

pub(crate) struct EventLoopState {
    pub(crate) clock: Clock,
    pub(crate) timers: Timers,
    exit: Cell<bool>,
}

/// Single-threaded driver for periodic callbacks.
///
/// Cloning yields another handle to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    pub(crate) state: Rc<EventLoopState>,
    // ensure !Send and !Sync
    _marker: PhantomData<*mut ()>,
}

impl EventLoop {
    pub fn new() -> Result<EventLoop> {
        EventLoopOptions::default().build()
    }

    pub fn now(&self) -> Instant {
        self.state.clock.now()
    }

    pub fn clock_mode(&self) -> ClockMode {
        match self.state.clock {
            Clock::System => ClockMode::System,
            Clock::Manual(_) => ClockMode::Manual,
        }
    }

    /// Number of live repeating registrations.
    pub fn pending(&self) -> usize {
        self.state.timers.len()
    }

    /// Fires every registration that is due, each at most once.
    pub fn poll(&self) -> Result<()> {
        self.state.timers.poll(self.now());
        Ok(())
    }

    /// Moves a manual clock forward and polls.
    pub fn advance(&self, duration: Duration) -> Result<()> {
        let Clock::Manual(now) = &self.state.clock else {
            return Err(Error::ClockNotManual);
        };

        let next = now.get().checked_add(duration).ok_or(Error::ClockOverflow(duration))?;
        now.set(next);
        self.poll()
    }

    /// Polls until [`exit`](Self::exit) is called or nothing is left to fire.
    ///
    /// With a manual clock the loop jumps straight to each deadline instead of sleeping.
    pub fn run(&self) -> Result<()> {
        self.state.exit.set(false);

        while !self.state.exit.get() {
            let Some(next_time) = self.state.timers.next_time() else {
                log::debug!("event loop idle, returning");
                break;
            };

            match &self.state.clock {
                Clock::System => {
                    let now = Instant::now();
                    if next_time > now {
                        std::thread::sleep(next_time - now);
                    }
                }
                Clock::Manual(now) => {
                    if next_time > now.get() {
                        now.set(next_time);
                    }
                }
            }

            self.poll()?;
        }

        self.state.exit.set(false);
        Ok(())
    }

    pub fn exit(&self) {
        self.state.exit.set(true);
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("EventLoop").finish_non_exhaustive()
    }
}
