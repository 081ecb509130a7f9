//! Overlay state: countdown, picker, toggle and pointer handling
//!
//! Everything here is independent of Wayland so that input routing and the
//! transparency policy can be exercised in tests.

use jiff::Timestamp;
use jiff::tz::TimeZone;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::alarm::{self, Alarm};
use crate::config::Settings;
use crate::countdown::{CountdownController, Readout, TimerState};
use crate::overlay::layout::{Layout, RegionId};
use crate::overlay::widgets::ToggleSwitch;
use crate::ticks::{Tick, TickSchedule};
use crate::wheel::{TimePicker, Unit};

/// Longest frame step fed to the wheel animations after a stall
const MAX_FRAME_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
struct WheelDrag {
    unit: Unit,
    last_y: f32,
}

pub struct OverlayState {
    controller: CountdownController,
    picker: TimePicker,
    toggle: ToggleSwitch,
    layout: Layout,
    alarm: Box<dyn Alarm>,
    tz: TimeZone,
    warning: Option<String>,
    transparent_opacity: f32,
    pointer: Option<(f32, f32)>,
    drag: Option<WheelDrag>,
    last_frame: Option<Instant>,
    needs_redraw: bool,
    input_dirty: bool,
    exit: bool,
}

impl OverlayState {
    pub fn new(settings: &Settings, alarm: Box<dyn Alarm>, tz: TimeZone) -> Self {
        let layout = Layout::new(settings.width, settings.height);
        let mut picker = TimePicker::new();
        picker.set_item_height(layout.item_height);

        Self {
            controller: CountdownController::new(),
            picker,
            toggle: ToggleSwitch::new(settings.start_transparent),
            layout,
            alarm,
            tz,
            warning: None,
            transparent_opacity: settings.transparent_opacity,
            pointer: None,
            drag: None,
            last_frame: None,
            needs_redraw: true,
            input_dirty: true,
            exit: false,
        }
    }

    pub fn controller(&self) -> &CountdownController {
        &self.controller
    }

    pub fn picker(&self) -> &TimePicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut TimePicker {
        &mut self.picker
    }

    pub fn toggle(&self) -> &ToggleSwitch {
        &self.toggle
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn readout(&self) -> Option<Readout> {
        self.controller.readout(&self.tz)
    }

    pub fn should_exit(&self) -> bool {
        self.exit
    }

    pub fn is_transparent(&self) -> bool {
        self.toggle.is_on()
    }

    /// Painted opacity: faded only while hovering in transparent mode
    pub fn opacity(&self) -> f32 {
        if self.is_transparent() && self.pointer.is_some() {
            self.transparent_opacity
        } else {
            1.0
        }
    }

    pub fn is_animating(&self) -> bool {
        self.picker.is_animating() || self.toggle.is_animating()
    }

    pub fn schedule(&self) -> TickSchedule {
        TickSchedule::for_state(self.controller.state(), self.is_animating())
    }

    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn take_input_dirty(&mut self) -> bool {
        std::mem::take(&mut self.input_dirty)
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let layout = Layout::new(width, height);
        if layout == self.layout {
            return;
        }
        debug!(width, height, scale = layout.scale, "Layout resized");
        self.picker.set_item_height(layout.item_height);
        self.layout = layout;
        self.needs_redraw = true;
        self.input_dirty = true;
    }

    /// Rectangles that currently accept pointer input
    pub fn input_rects(&self) -> Vec<crate::overlay::layout::Bounds> {
        self.layout
            .input_rects(self.is_transparent(), self.warning.is_some())
    }

    pub fn on_tick(&mut self, tick: Tick, now: Instant, wall: Timestamp) {
        match tick {
            Tick::Frame => self.frame(now),
            Tick::Logic => {
                if let Some(signal) = self.controller.tick(wall) {
                    alarm::dispatch(self.alarm.as_mut(), signal);
                }
                self.needs_redraw = true;
            }
            Tick::Blink => {
                self.controller.blink();
                self.needs_redraw = true;
            }
        }
    }

    fn frame(&mut self, now: Instant) {
        let dt = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).min(MAX_FRAME_STEP))
            .unwrap_or(Tick::Frame.interval());
        self.last_frame = Some(now);

        self.picker.step(dt);
        self.toggle.tick(now);
        if !self.is_animating() {
            self.last_frame = None;
        }
        self.needs_redraw = true;
    }

    pub fn pointer_enter(&mut self, x: f32, y: f32) {
        self.pointer = Some((x, y));
        if self.is_transparent() {
            self.needs_redraw = true;
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer = None;
        self.end_drag();
        if self.is_transparent() {
            self.needs_redraw = true;
        }
    }

    pub fn pointer_motion(&mut self, x: f32, y: f32) {
        self.pointer = Some((x, y));
        if let Some(drag) = self.drag.as_mut() {
            let dy = y - drag.last_y;
            drag.last_y = y;
            let unit = drag.unit;
            self.picker.wheel_mut(unit).drag_by(dy);
            self.needs_redraw = true;
        }
    }

    pub fn pointer_press(&mut self, x: f32, y: f32, now: Instant, wall: Timestamp) {
        self.pointer = Some((x, y));
        let hit = self
            .layout
            .hit_test(x, y, self.is_transparent(), self.warning.is_some());
        let Some(region) = hit else {
            return;
        };
        debug!(?region, x, y, "Pointer press");

        match region {
            RegionId::Warning => {
                self.warning = None;
                self.input_dirty = true;
            }
            RegionId::Close => {
                info!("Close requested");
                self.exit = true;
            }
            RegionId::Toggle => {
                let on = self.toggle.flip(now);
                info!(transparent = on, "Transparent mode toggled");
                self.input_dirty = true;
            }
            RegionId::Primary => self.press_primary(wall),
            RegionId::Cancel => self.press_cancel(),
            RegionId::Wheel(unit) => {
                if self.controller.state() == TimerState::Idle {
                    self.picker.wheel_mut(unit).begin_drag();
                    self.drag = Some(WheelDrag { unit, last_y: y });
                }
            }
            RegionId::TitleBar | RegionId::Content => {}
        }
        self.needs_redraw = true;
    }

    pub fn pointer_release(&mut self) {
        self.end_drag();
    }

    /// Scroll wheel or touchpad axis; positive `dy` scrolls towards larger values
    pub fn scroll(&mut self, x: f32, y: f32, dy: f32) {
        if self.controller.state() != TimerState::Idle || self.warning.is_some() {
            return;
        }
        let hit = self.layout.hit_test(x, y, self.is_transparent(), false);
        if let Some(RegionId::Wheel(unit)) = hit {
            self.picker.wheel_mut(unit).scroll_by(-dy);
            self.needs_redraw = true;
        }
    }

    fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.picker.wheel_mut(drag.unit).release();
            self.needs_redraw = true;
        }
    }

    fn press_primary(&mut self, wall: Timestamp) {
        match self.controller.toggle(self.picker.picked(), wall) {
            Ok(Some(signal)) => alarm::dispatch(self.alarm.as_mut(), signal),
            Ok(None) => {}
            Err(e) => {
                self.warning = Some(e.to_string());
                self.input_dirty = true;
            }
        }
    }

    fn press_cancel(&mut self) {
        if self.controller.state() == TimerState::Idle {
            return;
        }
        if let Some(signal) = self.controller.cancel() {
            alarm::dispatch(self.alarm.as_mut(), signal);
        }
        self.picker.reset();
    }

    /// Stop any sounding alarm before the overlay shuts down
    pub fn shutdown(&mut self) {
        if let Some(signal) = self.controller.cancel() {
            alarm::dispatch(self.alarm.as_mut(), signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::{AlarmSignal, PickedDuration};
    use jiff::SignedDuration;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct RecordingAlarm {
        signals: Rc<RefCell<Vec<AlarmSignal>>>,
    }

    impl Alarm for RecordingAlarm {
        fn start(&mut self) {
            self.signals.borrow_mut().push(AlarmSignal::Start);
        }

        fn stop(&mut self) {
            self.signals.borrow_mut().push(AlarmSignal::Stop);
        }

        fn is_playing(&self) -> bool {
            self.signals.borrow().last() == Some(&AlarmSignal::Start)
        }
    }

    fn overlay() -> (OverlayState, RecordingAlarm) {
        let alarm = RecordingAlarm::default();
        let state = OverlayState::new(&Settings::default(), Box::new(alarm.clone()), TimeZone::UTC);
        (state, alarm)
    }

    fn wall(secs: i64) -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap() + SignedDuration::from_secs(secs)
    }

    fn click(state: &mut OverlayState, (x, y): (f32, f32), secs: i64) {
        state.pointer_press(x, y, Instant::now(), wall(secs));
        state.pointer_release();
    }

    #[test]
    fn test_zero_start_shows_modal_warning() {
        let (mut state, _) = overlay();
        let primary = state.layout().primary.centre();
        click(&mut state, primary, 0);

        assert_eq!(state.controller().state(), TimerState::Idle);
        assert_eq!(state.warning(), Some("Please set a time greater than 0."));

        // Any click only dismisses the warning
        let toggle = state.layout().toggle.centre();
        click(&mut state, toggle, 0);
        assert_eq!(state.warning(), None);
        assert!(!state.is_transparent());
    }

    #[test]
    fn test_run_to_completion_and_cancel() {
        let (mut state, alarm) = overlay();
        state.picker_mut().set(PickedDuration::new(0, 0, 2));

        let primary = state.layout().primary.centre();
        click(&mut state, primary, 0);
        assert_eq!(state.controller().state(), TimerState::Running);
        assert!(state.schedule().logic);

        let now = Instant::now();
        state.on_tick(Tick::Logic, now, wall(1));
        state.on_tick(Tick::Logic, now, wall(2));
        assert_eq!(state.controller().state(), TimerState::Finished);
        assert_eq!(*alarm.signals.borrow(), vec![AlarmSignal::Start]);
        assert_eq!(state.readout().unwrap().time, "00:00");

        let cancel = state.layout().cancel.centre();
        click(&mut state, cancel, 3);
        assert_eq!(state.controller().state(), TimerState::Idle);
        assert_eq!(*alarm.signals.borrow(), vec![AlarmSignal::Start, AlarmSignal::Stop]);
        assert_eq!(state.picker().picked(), PickedDuration::default());
    }

    #[test]
    fn test_primary_pauses_and_resumes() {
        let (mut state, _) = overlay();
        state.picker_mut().set(PickedDuration::new(0, 1, 40));
        let primary = state.layout().primary.centre();

        click(&mut state, primary, 0);
        click(&mut state, primary, 30);
        assert_eq!(state.controller().state(), TimerState::Paused);
        assert!(!state.schedule().logic);

        click(&mut state, primary, 40);
        assert_eq!(state.controller().state(), TimerState::Running);
        assert!((state.controller().remaining_seconds() - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_pause_after_deadline_rings_alarm() {
        let (mut state, alarm) = overlay();
        state.picker_mut().set(PickedDuration::new(0, 0, 5));
        let primary = state.layout().primary.centre();

        click(&mut state, primary, 0);
        click(&mut state, primary, 8);
        assert_eq!(state.controller().state(), TimerState::Finished);
        assert_eq!(*alarm.signals.borrow(), vec![AlarmSignal::Start]);
    }

    #[test]
    fn test_transparent_mode_policy() {
        let (mut state, _) = overlay();
        state.take_input_dirty();

        let toggle = state.layout().toggle.centre();
        click(&mut state, toggle, 0);
        assert!(state.is_transparent());
        assert!(state.take_input_dirty());
        assert!(state.input_rects().iter().all(|r| r.y + r.height <= 31.0));

        // Opacity follows the pointer, not the toggle alone
        state.pointer_leave();
        assert_eq!(state.opacity(), 1.0);
        state.pointer_enter(20.0, 10.0);
        assert_eq!(state.opacity(), 0.1);
        state.pointer_leave();
        assert_eq!(state.opacity(), 1.0);

        // Content is click-through
        state.picker_mut().set(PickedDuration::new(0, 0, 5));
        let primary = state.layout().primary.centre();
        click(&mut state, primary, 0);
        assert_eq!(state.controller().state(), TimerState::Idle);
    }

    #[test]
    fn test_close_requests_exit() {
        let (mut state, _) = overlay();
        let close = state.layout().close.centre();
        click(&mut state, close, 0);
        assert!(state.should_exit());
    }

    #[test]
    fn test_drag_wheel_selects_next_value() {
        let (mut state, _) = overlay();
        let item = state.layout().item_height;
        let (x, y) = state.layout().wheel(Unit::Minutes).centre();

        state.pointer_press(x, y, Instant::now(), wall(0));
        state.pointer_motion(x, y - item);
        state.pointer_motion(x, y - item);
        state.pointer_release();
        assert!(state.is_animating());
        assert!(state.schedule().frame);

        let start = Instant::now();
        for i in 1..=60 {
            state.on_tick(Tick::Frame, start + Tick::Frame.interval() * i, wall(0));
        }
        assert!(!state.is_animating());
        assert_eq!(state.picker().picked(), PickedDuration::new(0, 1, 0));
    }

    #[test]
    fn test_scroll_over_wheel() {
        let (mut state, _) = overlay();
        let item = state.layout().item_height;
        let (x, y) = state.layout().wheel(Unit::Hours).centre();

        state.scroll(x, y, -item);
        let start = Instant::now();
        for i in 1..=60 {
            state.on_tick(Tick::Frame, start + Tick::Frame.interval() * i, wall(0));
        }
        assert_eq!(state.picker().picked().hours, 23);
    }

    #[test]
    fn test_wheels_locked_while_running() {
        let (mut state, _) = overlay();
        state.picker_mut().set(PickedDuration::new(0, 0, 30));
        let primary = state.layout().primary.centre();
        click(&mut state, primary, 0);

        let (x, y) = state.layout().wheel(Unit::Seconds).centre();
        state.scroll(x, y, 40.0);
        assert!(!state.is_animating());
    }

    #[test]
    fn test_blink_masks_colons() {
        let (mut state, _) = overlay();
        state.picker_mut().set(PickedDuration::new(0, 5, 0));
        let primary = state.layout().primary.centre();
        click(&mut state, primary, 0);

        state.on_tick(Tick::Blink, Instant::now(), wall(0));
        assert_eq!(state.readout().unwrap().time, "05 00");
        state.on_tick(Tick::Blink, Instant::now(), wall(0));
        assert_eq!(state.readout().unwrap().time, "05:00");
    }
}
