/// A callback run by a timer every time it counts down.
pub trait TimerCallback {
    /// Called after the timer decremented its value.
    fn handle(&mut self);
}

/// Used for timers that do not have to notify anybody.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallback;

impl TimerCallback for NoCallback {
    fn handle(&mut self) {}
}

/// Represents a timer inside of the chip
/// infrastruture, it will count down to
/// zero from what ever number given, once
/// per tick.
#[derive(Debug, Clone)]
pub struct Timer<S: TimerCallback = NoCallback> {
    /// will store the value of the timer
    value: u8,
    /// runs whenever the value counts down
    callback: S,
}

impl Timer<NoCallback> {
    /// Will create a new timer with the given value.
    pub fn new(value: u8) -> Self {
        Self::with_callback(value, NoCallback)
    }
}

impl<S: TimerCallback> Timer<S> {
    /// Will create a new timer that notifies the callback on each count down.
    pub fn with_callback(value: u8, callback: S) -> Self {
        Self { value, callback }
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Will get the value that the counter is currently at.
    pub fn get_value(&self) -> u8 {
        self.value
    }

    /// Counts down by one, a timer at zero stays at zero.
    pub fn tick(&mut self) {
        if self.value > 0 {
            self.value -= 1;
            self.callback.handle();
        }
    }

    pub fn get_callback(&self) -> &S {
        &self.callback
    }
}

/// Decides on which cpu cycles the timers have to be ticked, so that they
/// run at their own rate independent of the cpu speed.
#[derive(Debug, Clone)]
pub struct TickDivider {
    cycles_per_tick: u64,
    cycles: u64,
}

impl TickDivider {
    /// `cpu_hz` cycles per second are divided into `timer_hz` ticks per second.
    pub fn new(cpu_hz: u64, timer_hz: u64) -> Self {
        let cycles_per_tick = (cpu_hz / timer_hz.max(1)).max(1);
        Self {
            cycles_per_tick,
            cycles: 0,
        }
    }

    /// Registers a finished cycle and returns true if the timers are due.
    pub fn cycle(&mut self) -> bool {
        self.cycles += 1;
        if self.cycles >= self.cycles_per_tick {
            self.cycles = 0;
            true
        } else {
            false
        }
    }

    pub fn cycles_per_tick(&self) -> u64 {
        self.cycles_per_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingCallback {
        count: usize,
    }

    impl TimerCallback for CountingCallback {
        fn handle(&mut self) {
            self.count += 1;
        }
    }

    #[test]
    fn test_timer() {
        let mut timer = Timer::new(3);
        for expected in (0..3).rev() {
            timer.tick();
            assert_eq!(timer.get_value(), expected);
        }
    }

    #[test]
    fn test_timer_floor() {
        let mut timer = Timer::new(0);
        for _ in 0..300 {
            timer.tick();
            assert_eq!(timer.get_value(), 0);
        }
    }

    #[test]
    fn test_callback_only_when_counting() {
        let mut timer = Timer::with_callback(2, CountingCallback::default());
        for _ in 0..5 {
            timer.tick();
        }
        assert_eq!(timer.get_callback().count, 2);

        timer.set_value(1);
        timer.tick();
        assert_eq!(timer.get_callback().count, 3);
    }

    #[test]
    fn test_tick_divider() {
        let mut divider = TickDivider::new(480, 60);
        assert_eq!(divider.cycles_per_tick(), 8);

        let ticks = (0..80).filter(|_| divider.cycle()).count();
        assert_eq!(ticks, 10);
    }

    #[test]
    fn test_tick_divider_slow_cpu() {
        // a cpu slower than the timers still ticks once per cycle
        let mut divider = TickDivider::new(30, 60);
        assert_eq!(divider.cycles_per_tick(), 1);
        assert!(divider.cycle());
        assert!(divider.cycle());
    }
}
