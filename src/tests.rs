use std::cell::Cell;
use std::rc::Rc;

use crate::{ClockMode, EventLoopOptions, RepeatingTimer};

pub fn leak() {
    let event_loop = EventLoopOptions::new().clock(ClockMode::Manual).build().unwrap();
    let event_loop_weak = Rc::downgrade(&event_loop.state);

    let timer = RepeatingTimer::new(&event_loop, 10.0, 3).unwrap();
    let timer_weak = timer.downgrade();

    let ticks = Rc::new(Cell::new(0));
    {
        let ticks = Rc::clone(&ticks);
        let timer_weak = timer.downgrade();
        timer.on_tick(move || {
            ticks.set(ticks.get() + 1);
            let timer = timer_weak.upgrade().unwrap();
            assert!(timer.is_running());
        });
    }

    let completed = Rc::new(Cell::new(false));
    let listener_weak = {
        let completed = Rc::clone(&completed);
        let listener = timer.on_complete(move || completed.set(true));
        Rc::downgrade(&listener)
    };

    timer.start();
    event_loop.run().unwrap();
    assert_eq!(ticks.get(), 3);
    assert!(completed.get());

    // Leave it running so the loop holds a registration when the timer goes away
    timer.reset();
    timer.start();
    assert_eq!(event_loop.pending(), 1);

    assert!(event_loop_weak.upgrade().is_some());
    assert!(timer_weak.upgrade().is_some());
    assert!(listener_weak.upgrade().is_some());

    drop(timer);
    assert_eq!(event_loop.pending(), 0);
    drop(event_loop);

    assert!(event_loop_weak.upgrade().is_none());
    assert!(timer_weak.upgrade().is_none());
    assert!(listener_weak.upgrade().is_none());
}
