//! Countdown state machine
//!
//! Pure state; the controller owns the clock. Each countdown cycle carries
//! a number so a tick scheduled in an earlier cycle can be recognised and
//! ignored after a cancel.

use serde::Serialize;
use std::fmt;

/// Visible state of the SOS control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CountdownState {
    Idle,
    /// Ticks remaining before dispatch
    Counting(u32),
    /// Position lookup and trigger call in progress
    Dispatched,
    /// Transient; the machine returns to `Idle` straight after
    Cancelled,
}

impl fmt::Display for CountdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownState::Idle => write!(f, "idle"),
            CountdownState::Counting(n) => write!(f, "sending in {}", n),
            CountdownState::Dispatched => write!(f, "sending"),
            CountdownState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Countdown {
    start: u32,
    state: CountdownState,
    cycle: u64,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            state: CountdownState::Idle,
            cycle: 0,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Identifies the current countdown cycle
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// SOS pressed. Only starts a countdown from `Idle`.
    pub fn press(&mut self) -> bool {
        if self.state != CountdownState::Idle {
            return false;
        }
        self.cycle += 1;
        self.state = CountdownState::Counting(self.start);
        true
    }

    /// One tick elapsed in `cycle`. Stale or out-of-place ticks are ignored.
    pub fn tick(&mut self, cycle: u64) -> CountdownState {
        if cycle == self.cycle {
            if let CountdownState::Counting(n) = self.state {
                if n > 0 {
                    self.state = CountdownState::Counting(n - 1);
                }
            }
        }
        self.state
    }

    /// Leave `Counting(0)` for `Dispatched`. Returns whether this call did
    /// so; a cycle can be dispatched at most once.
    pub fn fire(&mut self, cycle: u64) -> bool {
        if cycle == self.cycle && self.state == CountdownState::Counting(0) {
            self.state = CountdownState::Dispatched;
            true
        } else {
            false
        }
    }

    /// Cancel a running countdown. Invalidates every pending tick of the
    /// current cycle before returning.
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.state, CountdownState::Counting(_)) {
            return false;
        }
        self.cycle += 1;
        self.state = CountdownState::Cancelled;
        true
    }

    /// Abandon whatever was in progress and start over from `Idle`
    pub fn reset(&mut self) {
        self.cycle += 1;
        self.state = CountdownState::Idle;
    }

    /// Return to `Idle` after a cancel or once the trigger call settled
    pub fn settle(&mut self) {
        if matches!(self.state, CountdownState::Dispatched | CountdownState::Cancelled) {
            self.state = CountdownState::Idle;
        }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(crate::constants::sos::COUNTDOWN_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut c = Countdown::default();
        assert_eq!(c.state(), CountdownState::Idle);

        assert!(c.press());
        let cycle = c.cycle();
        assert_eq!(c.state(), CountdownState::Counting(3));

        assert_eq!(c.tick(cycle), CountdownState::Counting(2));
        assert_eq!(c.tick(cycle), CountdownState::Counting(1));
        assert_eq!(c.tick(cycle), CountdownState::Counting(0));
        assert_eq!(c.tick(cycle), CountdownState::Counting(0));

        assert!(c.fire(cycle));
        assert_eq!(c.state(), CountdownState::Dispatched);
        assert!(!c.fire(cycle), "a cycle dispatches once");

        c.settle();
        assert_eq!(c.state(), CountdownState::Idle);
    }

    #[test]
    fn test_fire_requires_zero() {
        let mut c = Countdown::new(2);
        c.press();
        assert!(!c.fire(c.cycle()));
        assert_eq!(c.state(), CountdownState::Counting(2));
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut c = Countdown::default();
        c.press();
        c.tick(c.cycle());

        assert!(c.cancel());
        assert_eq!(c.state(), CountdownState::Cancelled);
        assert!(!c.cancel());

        c.settle();
        assert_eq!(c.state(), CountdownState::Idle);
    }

    #[test]
    fn test_stale_tick_after_cancel_is_ignored() {
        let mut c = Countdown::new(1);
        c.press();
        let old = c.cycle();
        c.cancel();

        assert_eq!(c.tick(old), CountdownState::Cancelled);
        assert!(!c.fire(old));
        c.settle();

        // A new press starts a fresh cycle; old ticks still do nothing.
        c.press();
        assert_eq!(c.tick(old), CountdownState::Counting(1));
        assert_eq!(c.tick(c.cycle()), CountdownState::Counting(0));
        assert!(!c.fire(old));
        assert!(c.fire(c.cycle()));
    }

    #[test]
    fn test_press_ignored_unless_idle() {
        let mut c = Countdown::default();
        assert!(c.press());
        assert!(!c.press());

        let cycle = c.cycle();
        for _ in 0..3 {
            c.tick(cycle);
        }
        c.fire(cycle);
        assert!(!c.press(), "no new countdown while dispatched");
        assert!(!c.cancel(), "dispatch cannot be cancelled");
    }

    #[test]
    fn test_reset_invalidates_cycle() {
        let mut c = Countdown::new(1);
        c.press();
        let old = c.cycle();
        c.reset();

        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.tick(old), CountdownState::Idle);
        assert!(c.press());
    }

    #[test]
    fn test_zero_start_fires_immediately() {
        let mut c = Countdown::new(0);
        c.press();
        assert!(c.fire(c.cycle()));
    }

    #[test]
    fn test_display() {
        assert_eq!(CountdownState::Counting(2).to_string(), "sending in 2");
        assert_eq!(CountdownState::Idle.to_string(), "idle");
    }
}
