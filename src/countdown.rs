//! Countdown state machine and wall-clock arithmetic
//!
//! The controller never reads the clock itself. Every operation takes the
//! current wall-clock `now`, and remaining time is always recomputed from the
//! session's start instant rather than decremented, so missed or late ticks
//! (or a suspended host) self-correct on the next tick.

use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Remaining time at or below this is treated as exactly finished
pub const FINISH_EPSILON_SECS: f64 = 0.001;

/// Sessions at least this long display as `HH:MM:SS`
const HOUR_FORMAT_THRESHOLD_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Side effects the alarm collaborator must carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmSignal {
    Start,
    Stop,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    #[error("Please set a time greater than 0.")]
    ZeroDuration,
}

/// Duration read off the time wheels at the moment a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickedDuration {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl PickedDuration {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn from_total_seconds(total: u64) -> Self {
        Self {
            hours: (total / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

/// One run of the timer from a chosen duration to completion or cancellation
#[derive(Debug, Clone)]
pub struct CountdownSession {
    total_seconds: u64,
    remaining_seconds: f64,
    start_instant: Timestamp,
    end_instant: Timestamp,
}

impl CountdownSession {
    fn begin(total_seconds: u64, now: Timestamp) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds as f64,
            start_instant: now,
            end_instant: now + SignedDuration::from_secs(total_seconds as i64),
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> f64 {
        self.remaining_seconds
    }

    /// Remaining time derived from the wall clock, clamped to `[0, total]`
    fn remaining_at(&self, now: Timestamp) -> f64 {
        let elapsed = now.duration_since(self.start_instant).as_secs_f64();
        (self.total_seconds as f64 - elapsed).clamp(0.0, self.total_seconds as f64)
    }

    /// Shift the reference point so that elapsed time excludes the pause
    fn rebase(&mut self, now: Timestamp) {
        let elapsed_so_far = self.total_seconds as f64 - self.remaining_seconds;
        self.start_instant = now - secs_to_duration(elapsed_so_far);
        self.end_instant = now + secs_to_duration(self.remaining_seconds);
    }

    pub fn progress(&self) -> f32 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        (self.remaining_seconds / self.total_seconds as f64) as f32
    }
}

fn secs_to_duration(secs: f64) -> SignedDuration {
    SignedDuration::from_millis((secs * 1000.0).round() as i64)
}

/// What the presentation layer renders for the current session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub state: TimerState,
    pub time: String,
    pub completes_at: String,
    pub progress: f32,
    pub remaining_seconds: f64,
    pub total_seconds: u64,
}

/// Owns the countdown session and drives its state transitions
#[derive(Debug)]
pub struct CountdownController {
    state: TimerState,
    session: Option<CountdownSession>,
    alarm_active: bool,
    colon_visible: bool,
}

impl CountdownController {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            session: None,
            alarm_active: false,
            colon_visible: true,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn session(&self) -> Option<&CountdownSession> {
        self.session.as_ref()
    }

    pub fn remaining_seconds(&self) -> f64 {
        self.session
            .as_ref()
            .map(CountdownSession::remaining_seconds)
            .unwrap_or(0.0)
    }

    pub fn colon_visible(&self) -> bool {
        self.colon_visible
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    /// Start a new session from IDLE or FINISHED.
    ///
    /// A zero duration is rejected and leaves the state untouched. Starting
    /// while RUNNING or PAUSED does nothing. Restarting from FINISHED returns
    /// `AlarmSignal::Stop` when the previous alarm is still sounding.
    pub fn start(
        &mut self,
        picked: PickedDuration,
        now: Timestamp,
    ) -> Result<Option<AlarmSignal>, StartRejected> {
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            debug!(state = ?self.state, "start ignored, session already active");
            return Ok(None);
        }

        let total = picked.total_seconds();
        if total == 0 {
            warn!("Selected time is 0, refusing to start");
            return Err(StartRejected::ZeroDuration);
        }

        let signal = self.silence_alarm();
        self.session = Some(CountdownSession::begin(total, now));
        self.enter(TimerState::Running);
        info!(total_seconds = total, "countdown started");
        Ok(signal)
    }

    /// Freeze the remaining time.
    ///
    /// Pausing after the deadline has passed finishes the session instead and
    /// returns `AlarmSignal::Start`, exactly as the next tick would have.
    pub fn pause(&mut self, now: Timestamp) -> Option<AlarmSignal> {
        if self.state != TimerState::Running {
            return None;
        }
        let session = self.session.as_mut()?;
        let remaining = session.remaining_at(now).min(session.remaining_seconds);
        session.remaining_seconds = remaining;

        if remaining <= FINISH_EPSILON_SECS {
            return Some(self.finish());
        }
        debug!(remaining, "countdown paused");
        self.enter(TimerState::Paused);
        None
    }

    pub fn resume(&mut self, now: Timestamp) {
        if self.state != TimerState::Paused {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.rebase(now);
            debug!(remaining = session.remaining_seconds, "countdown resumed");
        }
        self.enter(TimerState::Running);
    }

    /// Start, pause, or resume depending on the current state
    pub fn toggle(
        &mut self,
        picked: PickedDuration,
        now: Timestamp,
    ) -> Result<Option<AlarmSignal>, StartRejected> {
        match self.state {
            TimerState::Idle | TimerState::Finished => self.start(picked, now),
            TimerState::Running => Ok(self.pause(now)),
            TimerState::Paused => {
                self.resume(now);
                Ok(None)
            }
        }
    }

    /// Discard the session and return to IDLE
    pub fn cancel(&mut self) -> Option<AlarmSignal> {
        if self.state == TimerState::Idle {
            return None;
        }
        info!(state = ?self.state, "countdown cancelled");
        self.session = None;
        self.enter(TimerState::Idle);
        self.silence_alarm()
    }

    /// Recompute remaining time from the wall clock.
    ///
    /// Returns `AlarmSignal::Start` on the tick that finishes the session.
    pub fn tick(&mut self, now: Timestamp) -> Option<AlarmSignal> {
        if self.state != TimerState::Running {
            return None;
        }
        let session = self.session.as_mut()?;

        // Never let a wall-clock step backwards add time back.
        let remaining = session.remaining_at(now).min(session.remaining_seconds);
        session.remaining_seconds = remaining;

        if remaining <= FINISH_EPSILON_SECS {
            return Some(self.finish());
        }
        None
    }

    fn finish(&mut self) -> AlarmSignal {
        if let Some(session) = self.session.as_mut() {
            session.remaining_seconds = 0.0;
        }
        self.enter(TimerState::Finished);
        self.alarm_active = true;
        info!("countdown finished");
        AlarmSignal::Start
    }

    /// Flip the colon flag; only has an effect while RUNNING
    pub fn blink(&mut self) {
        if self.state == TimerState::Running {
            self.colon_visible = !self.colon_visible;
        }
    }

    /// Display values for the current session, `None` while IDLE
    pub fn readout(&self, tz: &TimeZone) -> Option<Readout> {
        let session = self.session.as_ref()?;
        let time = format_remaining(session.remaining_seconds, session.total_seconds);
        let time = if self.state == TimerState::Running {
            mask_colons(&time, self.colon_visible)
        } else {
            time
        };
        let completes_at = match self.state {
            TimerState::Finished | TimerState::Idle => String::new(),
            TimerState::Running | TimerState::Paused => {
                let zoned = session.end_instant.to_zoned(tz.clone());
                format_clock(zoned.hour(), zoned.minute())
            }
        };

        Some(Readout {
            state: self.state,
            time,
            completes_at,
            progress: session.progress(),
            remaining_seconds: session.remaining_seconds,
            total_seconds: session.total_seconds,
        })
    }

    fn enter(&mut self, state: TimerState) {
        self.state = state;
        self.colon_visible = true;
    }

    fn silence_alarm(&mut self) -> Option<AlarmSignal> {
        if self.alarm_active {
            self.alarm_active = false;
            Some(AlarmSignal::Stop)
        } else {
            None
        }
    }
}

impl Default for CountdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Format remaining time, rounding up so the last second reads "00:01"
pub fn format_remaining(remaining_seconds: f64, total_seconds: u64) -> String {
    let display = remaining_seconds.max(0.0).ceil() as u64;
    let h = display / 3600;
    let m = (display % 3600) / 60;
    let s = display % 60;
    if total_seconds >= HOUR_FORMAT_THRESHOLD_SECS {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Format a wall-clock time as "h:mm am"
pub fn format_clock(hour: i8, minute: i8) -> String {
    let suffix = if hour < 12 { "am" } else { "pm" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, minute, suffix)
}

/// Replace colons with spaces while the blink flag is off
pub fn mask_colons(time: &str, visible: bool) -> String {
    if visible {
        time.to_string()
    } else {
        time.replace(':', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap() + secs_to_duration(secs)
    }

    fn started(total: u64) -> CountdownController {
        let mut cd = CountdownController::new();
        cd.start(PickedDuration::from_total_seconds(total), at(0.0))
            .unwrap();
        cd
    }

    #[test]
    fn test_start_sets_full_remaining() {
        for total in [1, 59, 60, 3599, 3600, 86_399] {
            let cd = started(total);
            assert_eq!(cd.state(), TimerState::Running);
            assert_eq!(cd.remaining_seconds(), total as f64);
            assert_eq!(cd.session().unwrap().progress(), 1.0);
        }
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut cd = CountdownController::new();
        let result = cd.start(PickedDuration::default(), at(0.0));
        assert_eq!(result, Err(StartRejected::ZeroDuration));
        assert_eq!(cd.state(), TimerState::Idle);
        assert!(cd.session().is_none());
    }

    #[test]
    fn test_pause_twice_is_idempotent() {
        let mut cd = started(100);
        cd.pause(at(40.0));
        let first = cd.remaining_seconds();
        cd.pause(at(55.0));
        assert_eq!(cd.remaining_seconds(), first);
        assert_eq!(cd.state(), TimerState::Paused);
    }

    #[test]
    fn test_pause_past_deadline_finishes() {
        let mut cd = started(5);
        assert_eq!(cd.pause(at(8.0)), Some(AlarmSignal::Start));
        assert_eq!(cd.state(), TimerState::Finished);
        assert_eq!(cd.remaining_seconds(), 0.0);
        assert!(cd.alarm_active());
        assert_eq!(cd.tick(at(9.0)), None);
    }

    #[test]
    fn test_toggle_past_deadline_signals_alarm() {
        let mut cd = started(2);
        let picked = PickedDuration::from_total_seconds(2);
        assert_eq!(cd.toggle(picked, at(2.0)), Ok(Some(AlarmSignal::Start)));
        assert_eq!(cd.state(), TimerState::Finished);
    }

    #[test]
    fn test_resume_without_elapsed_time_keeps_remaining() {
        let mut cd = started(100);
        cd.pause(at(12.5));
        let paused = cd.remaining_seconds();
        cd.resume(at(12.5));
        cd.tick(at(12.5));
        assert!((cd.remaining_seconds() - paused).abs() < 1e-3);
    }

    #[test]
    fn test_paused_duration_excluded() {
        let mut cd = started(100);
        cd.tick(at(70.0));
        cd.pause(at(70.0));
        assert!((cd.remaining_seconds() - 30.0).abs() < 1e-9);

        cd.resume(at(80.0));
        cd.tick(at(85.0));
        assert!((cd.remaining_seconds() - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_ticks_are_monotonic() {
        let mut cd = started(10);
        let mut last = cd.remaining_seconds();
        // Includes a late tick and a wall clock that steps backwards
        for t in [0.5, 1.0, 3.7, 3.2, 6.0, 6.0, 9.9] {
            cd.tick(at(t));
            assert!(cd.remaining_seconds() <= last);
            last = cd.remaining_seconds();
        }
    }

    #[test]
    fn test_finishes_and_stays_finished() {
        let mut cd = started(3);
        assert_eq!(cd.tick(at(2.9995)), Some(AlarmSignal::Start));
        assert_eq!(cd.state(), TimerState::Finished);
        assert_eq!(cd.remaining_seconds(), 0.0);

        assert_eq!(cd.tick(at(10.0)), None);
        cd.pause(at(11.0));
        cd.resume(at(12.0));
        assert_eq!(cd.state(), TimerState::Finished);
    }

    #[test]
    fn test_two_second_scenario() {
        let mut cd = CountdownController::new();
        cd.start(PickedDuration::new(0, 0, 2), at(0.0)).unwrap();

        assert_eq!(cd.tick(at(1.0)), None);
        let readout = cd.readout(&TimeZone::UTC).unwrap();
        assert_eq!(readout.time, "00:01");

        assert_eq!(cd.tick(at(2.0)), Some(AlarmSignal::Start));
        let readout = cd.readout(&TimeZone::UTC).unwrap();
        assert_eq!(readout.state, TimerState::Finished);
        assert_eq!(readout.time, "00:00");
        assert_eq!(readout.completes_at, "");
        assert_eq!(readout.progress, 0.0);
    }

    #[test]
    fn test_hour_sessions_use_long_format() {
        let cd = started(3600);
        let readout = cd.readout(&TimeZone::UTC).unwrap();
        assert_eq!(readout.time, "01:00:00");

        let cd = started(3599);
        assert_eq!(cd.readout(&TimeZone::UTC).unwrap().time, "59:59");
    }

    #[test]
    fn test_display_rounds_up() {
        assert_eq!(format_remaining(0.2, 10), "00:01");
        assert_eq!(format_remaining(59.01, 100), "01:00");
        assert_eq!(format_remaining(0.0, 10), "00:00");
        assert_eq!(format_remaining(0.0, 7200), "00:00:00");
        assert_eq!(format_remaining(3661.0, 7200), "01:01:01");
    }

    #[test]
    fn test_cancel_stops_alarm_only_when_sounding() {
        let mut cd = started(5);
        assert_eq!(cd.cancel(), None);
        assert_eq!(cd.state(), TimerState::Idle);
        assert!(cd.readout(&TimeZone::UTC).is_none());

        let mut cd = started(1);
        cd.tick(at(1.0));
        assert!(cd.alarm_active());
        assert_eq!(cd.cancel(), Some(AlarmSignal::Stop));
        assert!(!cd.alarm_active());
        assert_eq!(cd.cancel(), None);
    }

    #[test]
    fn test_restart_from_finished_stops_alarm() {
        let mut cd = started(1);
        cd.tick(at(1.0));
        let signal = cd.start(PickedDuration::new(0, 1, 0), at(5.0)).unwrap();
        assert_eq!(signal, Some(AlarmSignal::Stop));
        assert_eq!(cd.state(), TimerState::Running);
        assert_eq!(cd.remaining_seconds(), 60.0);
    }

    #[test]
    fn test_start_while_running_is_ignored() {
        let mut cd = started(30);
        cd.tick(at(10.0));
        assert_eq!(cd.start(PickedDuration::new(1, 0, 0), at(11.0)), Ok(None));
        assert_eq!(cd.session().unwrap().total_seconds(), 30);
    }

    #[test]
    fn test_toggle_cycles_start_pause_resume() {
        let mut cd = CountdownController::new();
        let picked = PickedDuration::new(0, 0, 30);
        cd.toggle(picked, at(0.0)).unwrap();
        assert_eq!(cd.state(), TimerState::Running);
        cd.toggle(picked, at(5.0)).unwrap();
        assert_eq!(cd.state(), TimerState::Paused);
        cd.toggle(picked, at(9.0)).unwrap();
        assert_eq!(cd.state(), TimerState::Running);
        cd.tick(at(10.0));
        assert!((cd.remaining_seconds() - 24.0).abs() < 1e-3);
    }

    #[test]
    fn test_blink_only_while_running() {
        let mut cd = started(90);
        cd.blink();
        assert!(!cd.colon_visible());
        assert_eq!(cd.readout(&TimeZone::UTC).unwrap().time, "01 30");

        cd.pause(at(0.0));
        assert!(cd.colon_visible());
        cd.blink();
        assert!(cd.colon_visible());
        assert_eq!(cd.readout(&TimeZone::UTC).unwrap().time, "01:30");
    }

    #[test]
    fn test_completion_time_tracks_resume() {
        // 1_700_000_000 is 22:13:20 UTC
        let mut cd = started(60);
        assert_eq!(cd.readout(&TimeZone::UTC).unwrap().completes_at, "10:14 pm");

        cd.pause(at(30.0));
        cd.resume(at(30.0 + 3600.0));
        assert_eq!(cd.readout(&TimeZone::UTC).unwrap().completes_at, "11:14 pm");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0, 5), "12:05 am");
        assert_eq!(format_clock(9, 41), "9:41 am");
        assert_eq!(format_clock(12, 0), "12:00 pm");
        assert_eq!(format_clock(13, 41), "1:41 pm");
    }

    #[test]
    fn test_picked_duration_total() {
        assert_eq!(PickedDuration::new(1, 2, 3).total_seconds(), 3723);
        assert_eq!(PickedDuration::from_total_seconds(3723), PickedDuration::new(1, 2, 3));
    }
}
