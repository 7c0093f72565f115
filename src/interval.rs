use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::scheduler::TimerId;
use crate::EventLoop;

/// A live repeating registration with an [`EventLoop`].
///
/// The callback fires every `period` until the `Interval` is cancelled or dropped.
pub struct Interval {
    event_loop: EventLoop,
    timer_id: Cell<Option<TimerId>>,
    period: Duration,
    // ensure !Send and !Sync
    _marker: PhantomData<*mut ()>,
}

impl Interval {
    pub fn repeat<F>(period: Duration, event_loop: &EventLoop, callback: F) -> Interval
    where
        F: FnMut() + 'static,
    {
        let state = &event_loop.state;
        let timer_id = state.timers.repeat(state.clock.now(), period, Box::new(callback));

        Interval {
            event_loop: event_loop.clone(),
            timer_id: Cell::new(Some(timer_id)),
            period,
            _marker: PhantomData,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.timer_id.get().map_or(false, |id| self.event_loop.state.timers.contains(id))
    }

    pub fn cancel(&self) {
        if let Some(timer_id) = self.timer_id.take() {
            self.event_loop.state.timers.cancel(timer_id);
        }
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Interval")
            .field("period", &self.period)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
