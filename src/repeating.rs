//! The repeating timer state machine.
//!
//! A [`RepeatingTimer`] fires its tick listeners every `delay` milliseconds while running.
//! With a non-zero repeat count it stops itself after that many ticks and then fires its
//! complete listeners. `stop` keeps progress, `reset` discards it, and changing the delay or
//! the repeat count always resets first.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::event::Listeners;
use crate::{Error, EventLoop, Interval, Listener, Result, TimerEvent};

fn validate_delay(value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidArgument {
            name: "delay",
            value: value.to_string(),
        })
    }
}

fn validate_repeat_count(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidArgument {
        name: "repeat count",
        value: value.to_string(),
    })
}

fn millis_to_duration(millis: f64) -> Duration {
    Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
}

#[derive(Clone, Debug)]
pub struct TimerOptions {
    pub(crate) delay: Duration,
    pub(crate) repeat_count: u32,
}

impl Default for TimerOptions {
    fn default() -> Self {
        TimerOptions {
            delay: Duration::from_secs(1),
            repeat_count: 0,
        }
    }
}

impl TimerOptions {
    pub fn new() -> TimerOptions {
        Self::default()
    }

    pub fn delay(&mut self, delay: Duration) -> &mut Self {
        self.delay = delay;
        self
    }

    /// Number of ticks before the timer completes. Zero repeats forever.
    pub fn repeat_count(&mut self, repeat_count: u32) -> &mut Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn build(&self, event_loop: &EventLoop) -> Result<RepeatingTimer> {
        Ok(RepeatingTimer::from_parts(
            event_loop,
            self.delay.as_secs_f64() * 1000.0,
            self.repeat_count,
        ))
    }
}

struct TimerState {
    event_loop: EventLoop,
    delay: Cell<f64>,
    repeat_count: Cell<u32>,
    current_count: Cell<u32>,
    running: Cell<bool>,
    // Bumped on every start so that a stale tick from an earlier run is ignored
    generation: Cell<u64>,
    interval: RefCell<Option<Interval>>,
    tick_listeners: RefCell<Listeners>,
    complete_listeners: RefCell<Listeners>,
}

impl TimerState {
    fn listeners(&self, event: TimerEvent) -> &RefCell<Listeners> {
        match event {
            TimerEvent::Tick => &self.tick_listeners,
            TimerEvent::Complete => &self.complete_listeners,
        }
    }

    fn is_live(&self, generation: u64) -> bool {
        self.running.get() && self.generation.get() == generation
    }

    fn is_exhausted(&self) -> bool {
        let repeat_count = self.repeat_count.get();
        repeat_count != 0 && self.current_count.get() >= repeat_count
    }

    fn dispatch(&self, event: TimerEvent) {
        // Listeners may add or remove listeners, so never hold the borrow while calling them
        let listeners = self.listeners(event).borrow().snapshot();
        for listener in listeners {
            listener();
        }
    }

    fn tick(&self, generation: u64, repeat_count: u32) {
        if !self.is_live(generation) {
            return;
        }

        // Counted even if a listener stopped the timer; `stop` below is then a no-op
        self.dispatch(TimerEvent::Tick);

        let current_count = self.current_count.get().saturating_add(1);
        self.current_count.set(current_count);
        log::trace!("tick {current_count}/{repeat_count}");

        if repeat_count != 0 && current_count >= repeat_count {
            log::debug!("timer finished after {current_count} ticks");
            self.stop();
            self.dispatch(TimerEvent::Complete);
        }
    }

    fn stop(&self) {
        if !self.running.get() {
            return;
        }

        // Dropping the interval cancels it; keep that outside the borrow
        let interval = self.interval.borrow_mut().take();
        drop(interval);
        self.running.set(false);

        log::debug!("timer stopped at {}", self.current_count.get());
    }

    fn reset(&self) {
        self.stop();
        self.current_count.set(0);
    }
}

/// A timer that ticks every `delay` milliseconds, optionally a bounded number of times.
///
/// `RepeatingTimer` is a handle: clones refer to the same timer, and the scheduled callback
/// is cancelled once the last handle is dropped. Listeners that need to reach their own timer
/// should capture a [`WeakTimer`] to avoid a reference cycle.
#[derive(Clone)]
pub struct RepeatingTimer {
    state: Rc<TimerState>,
    // ensure !Send and !Sync
    _marker: PhantomData<*mut ()>,
}

impl RepeatingTimer {
    /// Creates a stopped timer.
    ///
    /// `delay` is in milliseconds and must be finite and non-negative. `repeat_count` must be
    /// non-negative; zero means the timer repeats until stopped.
    pub fn new(event_loop: &EventLoop, delay: f64, repeat_count: i64) -> Result<RepeatingTimer> {
        let repeat_count = validate_repeat_count(repeat_count)?;
        let delay = validate_delay(delay)?;

        Ok(RepeatingTimer::from_parts(event_loop, delay, repeat_count))
    }

    fn from_parts(event_loop: &EventLoop, delay: f64, repeat_count: u32) -> RepeatingTimer {
        RepeatingTimer {
            state: Rc::new(TimerState {
                event_loop: event_loop.clone(),
                delay: Cell::new(delay),
                repeat_count: Cell::new(repeat_count),
                current_count: Cell::new(0),
                running: Cell::new(false),
                generation: Cell::new(0),
                interval: RefCell::new(None),
                tick_listeners: RefCell::new(Listeners::default()),
                complete_listeners: RefCell::new(Listeners::default()),
            }),
            _marker: PhantomData,
        }
    }

    pub fn downgrade(&self) -> WeakTimer {
        WeakTimer {
            state: Rc::downgrade(&self.state),
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.state.event_loop
    }

    /// Starts ticking, unless already running or exhausted.
    ///
    /// The repeat count in effect now applies for the whole run.
    pub fn start(&self) {
        let state = &self.state;
        if state.running.get() || state.is_exhausted() {
            return;
        }

        let generation = state.generation.get().wrapping_add(1);
        state.generation.set(generation);
        state.running.set(true);

        let repeat_count = state.repeat_count.get();
        let delay = millis_to_duration(state.delay.get());
        let weak = Rc::downgrade(state);
        let interval = Interval::repeat(delay, &state.event_loop, move || {
            if let Some(state) = weak.upgrade() {
                state.tick(generation, repeat_count);
            }
        });
        *state.interval.borrow_mut() = Some(interval);

        log::debug!(
            "timer started every {delay:?} at {}/{repeat_count}",
            state.current_count.get()
        );
    }

    /// Stops ticking. The current count is kept, so a later `start` resumes the run.
    pub fn stop(&self) {
        self.state.stop();
    }

    /// Stops if running and sets the current count back to zero.
    pub fn reset(&self) {
        self.state.reset();
    }

    /// Calls every complete listener, whether or not the timer has finished.
    pub fn complete(&self) {
        self.state.dispatch(TimerEvent::Complete);
    }

    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// Ticks fired since the last reset.
    pub fn current_count(&self) -> u32 {
        self.state.current_count.get()
    }

    /// Whether the repeat count has been reached. `start` does nothing until a reset.
    pub fn is_exhausted(&self) -> bool {
        self.state.is_exhausted()
    }

    /// Milliseconds between ticks.
    pub fn delay(&self) -> f64 {
        self.state.delay.get()
    }

    pub fn delay_duration(&self) -> Duration {
        millis_to_duration(self.state.delay.get())
    }

    /// Resets the timer, then changes the delay.
    ///
    /// The reset happens even if `delay` is rejected.
    pub fn set_delay(&self, delay: f64) -> Result<()> {
        self.reset();
        let delay = validate_delay(delay)?;
        self.state.delay.set(delay);
        Ok(())
    }

    pub fn repeat_count(&self) -> u32 {
        self.state.repeat_count.get()
    }

    /// Resets the timer, then changes the repeat count.
    ///
    /// The reset happens even if `repeat_count` is rejected.
    pub fn set_repeat_count(&self, repeat_count: i64) -> Result<()> {
        self.reset();
        let repeat_count = validate_repeat_count(repeat_count)?;
        self.state.repeat_count.set(repeat_count);
        Ok(())
    }

    pub fn add_event_listener(&self, event: TimerEvent, listener: Listener) {
        self.state.listeners(event).borrow_mut().push(listener);
    }

    /// Registers a listener by legacy event name (`"TIMER"` or `"TIMER_COMPLETE"`).
    pub fn add_named_event_listener(&self, event: &str, listener: Listener) -> Result<()> {
        let event = event.parse::<TimerEvent>()?;
        self.add_event_listener(event, listener);
        Ok(())
    }

    /// Removes every registration of `listener` for `event` and returns how many there were.
    pub fn remove_event_listener(&self, event: TimerEvent, listener: &Listener) -> usize {
        self.state.listeners(event).borrow_mut().remove(listener)
    }

    pub fn listener_count(&self, event: TimerEvent) -> usize {
        self.state.listeners(event).borrow().len()
    }

    pub fn on_tick<F>(&self, f: F) -> Listener
    where
        F: Fn() + 'static,
    {
        let listener: Listener = Rc::new(f);
        self.add_event_listener(TimerEvent::Tick, Rc::clone(&listener));
        listener
    }

    pub fn on_complete<F>(&self, f: F) -> Listener
    where
        F: Fn() + 'static,
    {
        let listener: Listener = Rc::new(f);
        self.add_event_listener(TimerEvent::Complete, Rc::clone(&listener));
        listener
    }
}

impl fmt::Debug for RepeatingTimer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("RepeatingTimer")
            .field("delay", &self.delay())
            .field("repeat_count", &self.repeat_count())
            .field("current_count", &self.current_count())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// A non-owning reference to a [`RepeatingTimer`].
#[derive(Clone)]
pub struct WeakTimer {
    state: Weak<TimerState>,
}

impl WeakTimer {
    pub fn upgrade(&self) -> Option<RepeatingTimer> {
        self.state.upgrade().map(|state| RepeatingTimer {
            state,
            _marker: PhantomData,
        })
    }
}

impl fmt::Debug for WeakTimer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("WeakTimer").finish_non_exhaustive()
    }
}
