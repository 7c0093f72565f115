use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub type TimerId = usize;

// Stand-in deadline for periods too long to represent as an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

fn deadline(from: Instant, period: Duration) -> Instant {
    from.checked_add(period).or_else(|| from.checked_add(FAR_FUTURE)).unwrap_or(from)
}

pub enum Clock {
    System,
    Manual(Cell<Instant>),
}

impl Clock {
    pub fn now(&self) -> Instant {
        match self {
            Clock::System => Instant::now(),
            Clock::Manual(now) => now.get(),
        }
    }
}

struct TimerState {
    period: Duration,
    callback: RefCell<Box<dyn FnMut()>>,
}

impl TimerState {
    fn handle_timer(&self) -> Option<()> {
        // Busy if the callback re-entered the loop and we came back around to it
        let mut callback = self.callback.try_borrow_mut().ok()?;
        (*callback)();
        Some(())
    }
}

#[derive(Clone)]
struct QueueEntry {
    time: Instant,
    seq: u64,
    timer_id: TimerId,
}

impl QueueEntry {
    fn key(&self) -> (Instant, u64) {
        (self.time, self.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key()).reverse()
    }
}

pub struct Timers {
    next_id: Cell<TimerId>,
    next_seq: Cell<u64>,
    timers: RefCell<HashMap<TimerId, Rc<TimerState>>>,
    queue: RefCell<BinaryHeap<QueueEntry>>,
}

impl Timers {
    pub fn new() -> Timers {
        Timers {
            next_id: Cell::new(0),
            next_seq: Cell::new(0),
            timers: RefCell::new(HashMap::new()),
            queue: RefCell::new(BinaryHeap::new()),
        }
    }

    fn push(&self, time: Instant, timer_id: TimerId) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        self.queue.borrow_mut().push(QueueEntry {
            time,
            seq,
            timer_id,
        });
    }

    pub fn repeat(&self, now: Instant, period: Duration, callback: Box<dyn FnMut()>) -> TimerId {
        let timer_id = self.next_id.get();
        self.next_id.set(timer_id + 1);

        let state = Rc::new(TimerState {
            period,
            callback: RefCell::new(callback),
        });
        self.timers.borrow_mut().insert(timer_id, state);
        self.push(deadline(now, period), timer_id);

        log::trace!("registered timer {timer_id} every {period:?}");

        timer_id
    }

    pub fn cancel(&self, timer_id: TimerId) -> bool {
        // The queue entry is left behind and discarded when it comes up.
        // `state` must outlive the map borrow: dropping a callback may cancel other timers.
        let state = self.timers.borrow_mut().remove(&timer_id);
        if state.is_some() {
            log::trace!("cancelled timer {timer_id}");
        }
        state.is_some()
    }

    pub fn contains(&self, timer_id: TimerId) -> bool {
        self.timers.borrow().contains_key(&timer_id)
    }

    pub fn len(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn next_time(&self) -> Option<Instant> {
        let timers = self.timers.borrow();
        let mut queue = self.queue.borrow_mut();

        while let Some(entry) = queue.peek() {
            if timers.contains_key(&entry.timer_id) {
                return Some(entry.time);
            }
            queue.pop();
        }

        None
    }

    pub fn poll(&self, now: Instant) {
        // Anything pushed from here on, including re-armed entries, waits for the next poll
        let horizon = self.next_seq.get();

        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                match queue.peek() {
                    Some(entry) if entry.time <= now && entry.seq < horizon => queue.pop(),
                    _ => None,
                }
            };
            let Some(next) = next else {
                break;
            };

            // If we don't find the timer in `self.timers`, it has been canceled
            let timer_state = self.timers.borrow().get(&next.timer_id).cloned();
            if let Some(timer_state) = timer_state {
                // If we fall behind by more than one timer interval, reset the timer's phase.
                // Re-armed before firing, so a panicking callback leaves the timer scheduled.
                let next_time = deadline(next.time, timer_state.period).max(now);
                self.push(next_time, next.timer_id);

                timer_state.handle_timer();
            }
        }
    }
}
