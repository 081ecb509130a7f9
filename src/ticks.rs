//! Periodic callbacks that drive the timer
//!
//! Three independent ticks exist: a frame tick for animation and repaint, a
//! logic tick for the authoritative countdown recomputation, and a blink tick
//! for the colon flag. Which ones are armed is a pure function of the
//! countdown state and whether anything on screen is animating.

use std::time::Duration;

use crate::countdown::TimerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    Frame,
    Logic,
    Blink,
}

impl Tick {
    pub const ALL: [Tick; 3] = [Tick::Frame, Tick::Logic, Tick::Blink];

    pub fn interval(self) -> Duration {
        match self {
            Tick::Frame => Duration::from_millis(16),
            Tick::Logic => Duration::from_millis(1000),
            Tick::Blink => Duration::from_millis(500),
        }
    }
}

/// Set of ticks that should currently be armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSchedule {
    pub frame: bool,
    pub logic: bool,
    pub blink: bool,
}

impl TickSchedule {
    pub fn for_state(state: TimerState, animating: bool) -> Self {
        let running = state == TimerState::Running;
        Self {
            frame: running || animating,
            logic: running,
            blink: running,
        }
    }

    pub fn contains(&self, tick: Tick) -> bool {
        match tick {
            Tick::Frame => self.frame,
            Tick::Logic => self.logic,
            Tick::Blink => self.blink,
        }
    }
}
