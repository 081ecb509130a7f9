//! Time-wheel picker model
//!
//! A wheel maps a continuous scroll offset onto a discrete value with cyclic
//! wraparound. The offset is measured in pixels, positive when the content
//! has been dragged downwards (towards smaller values).

use std::time::Duration;

use tracing::{debug, warn};

use crate::animation::ease_out_quad;
use crate::countdown::PickedDuration;

/// Velocity multiplier applied on every coasting step
pub const DECAY_FACTOR: f32 = 0.95;
/// Below this speed (px per step) coasting stops and the wheel snaps
pub const STOP_THRESHOLD: f32 = 1.0;
pub const DEFAULT_ITEM_HEIGHT: f32 = 40.0;

const SNAP_MS_PER_PX: f32 = 2.0;
const SNAP_MAX_MS: f32 = 300.0;

/// Closed integer interval a wheel cycles through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelRange {
    pub low: i32,
    pub high: i32,
}

impl WheelRange {
    pub const HOURS: WheelRange = WheelRange { low: 0, high: 23 };
    pub const SIXTY: WheelRange = WheelRange { low: 0, high: 59 };

    pub fn size(&self) -> i64 {
        i64::from(self.high) - i64::from(self.low) + 1
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.low..=self.high).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Hours,
    Minutes,
    Seconds,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Hours, Unit::Minutes, Unit::Seconds];

    pub fn range(self) -> WheelRange {
        match self {
            Unit::Hours => WheelRange::HOURS,
            Unit::Minutes | Unit::Seconds => WheelRange::SIXTY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Hours => "hours",
            Unit::Minutes => "min",
            Unit::Seconds => "sec",
        }
    }
}

/// Whole items scrolled past the centre for a given offset
fn items_scrolled(offset: f32, item_height: f32) -> i64 {
    if item_height <= 0.0 {
        return 0;
    }
    (-offset / item_height).round() as i64
}

/// Resolve the value under the centre line.
///
/// `base_index` is the logical index of the centred item at zero offset,
/// where index 0 corresponds to `range.low`. The result always lies within
/// `range`, however far the offset has drifted.
pub fn resolve_selected_value(
    offset: f32,
    item_height: f32,
    base_index: i64,
    range: WheelRange,
) -> i32 {
    let index = base_index + items_scrolled(offset, item_height);
    range.low + index.rem_euclid(range.size()) as i32
}

/// Eased offset animation onto the nearest whole item
#[derive(Debug, Clone, PartialEq)]
pub struct SnapAnimation {
    from: f32,
    to: f32,
    items: i64,
    elapsed: Duration,
    duration: Duration,
}

impl SnapAnimation {
    pub fn new(offset: f32, item_height: f32) -> Self {
        let items = items_scrolled(offset, item_height);
        let to = -(items as f32) * item_height;
        let ms = ((offset - to).abs() * SNAP_MS_PER_PX).min(SNAP_MAX_MS);
        Self {
            from: offset,
            to,
            items,
            elapsed: Duration::ZERO,
            duration: Duration::from_millis(ms as u64),
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Advance by `dt`, returning the new offset and whether the snap is done
    fn advance(&mut self, dt: Duration) -> (f32, bool) {
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            return (self.to, true);
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        (self.from + (self.to - self.from) * ease_out_quad(t), false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Idle,
    Dragging,
    Coasting { velocity: f32 },
    Snapping(SnapAnimation),
}

/// Decide how a released wheel comes to rest
pub fn settle(offset: f32, velocity: f32, item_height: f32) -> Motion {
    if velocity.abs() > STOP_THRESHOLD {
        Motion::Coasting { velocity }
    } else {
        Motion::Snapping(SnapAnimation::new(offset, item_height))
    }
}

/// A single-unit value picker
#[derive(Debug, Clone)]
pub struct TimeWheel {
    unit: Unit,
    range: WheelRange,
    base_index: i64,
    offset: f32,
    item_height: f32,
    motion: Motion,
    last_delta: f32,
}

impl TimeWheel {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            range: unit.range(),
            base_index: 0,
            offset: 0.0,
            item_height: DEFAULT_ITEM_HEIGHT,
            motion: Motion::Idle,
            last_delta: 0.0,
        }
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn item_height(&self) -> f32 {
        self.item_height
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn set_item_height(&mut self, item_height: f32) {
        if item_height > 0.0 {
            self.item_height = item_height;
        }
    }

    pub fn selected_value(&self) -> i32 {
        resolve_selected_value(self.offset, self.item_height, self.base_index, self.range)
    }

    /// Value at `index` positions away from the centre, for painting
    pub fn value_at(&self, index: i64) -> i32 {
        self.range.low + index.rem_euclid(self.range.size()) as i32
    }

    /// Fractional index of the item currently under the centre line
    pub fn centre_position(&self) -> f32 {
        self.base_index as f32 - self.offset / self.item_height
    }

    /// Centre `value` with no residual offset
    pub fn set_value(&mut self, value: i32) {
        if !self.range.contains(value) {
            warn!(
                value,
                low = self.range.low,
                high = self.range.high,
                unit = self.unit.label(),
                "value out of range for wheel"
            );
            return;
        }
        self.base_index = i64::from(value - self.range.low);
        self.offset = 0.0;
        self.motion = Motion::Idle;
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.motion, Motion::Coasting { .. } | Motion::Snapping(_))
    }

    pub fn is_dragging(&self) -> bool {
        self.motion == Motion::Dragging
    }

    pub fn begin_drag(&mut self) {
        self.motion = Motion::Dragging;
        self.last_delta = 0.0;
    }

    pub fn drag_by(&mut self, dy: f32) {
        if !self.is_dragging() {
            return;
        }
        self.offset += dy;
        self.last_delta = dy;
    }

    pub fn release(&mut self) {
        if !self.is_dragging() {
            return;
        }
        self.motion = settle(self.offset, self.last_delta, self.item_height);
        debug!(unit = self.unit.label(), motion = ?self.motion, "wheel released");
    }

    /// Discrete scroll (mouse wheel / touchpad axis)
    pub fn scroll_by(&mut self, dy: f32) {
        if self.is_dragging() {
            return;
        }
        if let Motion::Snapping(_) = self.motion {
            self.fold_offset();
        }
        self.offset += dy;
        self.motion = settle(self.offset, 0.0, self.item_height);
    }

    /// Advance one animation frame
    pub fn step(&mut self, dt: Duration) {
        match &mut self.motion {
            Motion::Idle | Motion::Dragging => {}
            Motion::Coasting { velocity } => {
                self.offset += *velocity;
                *velocity *= DECAY_FACTOR;
                if velocity.abs() < STOP_THRESHOLD {
                    let snap = SnapAnimation::new(self.offset, self.item_height);
                    self.motion = Motion::Snapping(snap);
                }
            }
            Motion::Snapping(snap) => {
                let (offset, done) = snap.advance(dt);
                self.offset = offset;
                if done {
                    self.base_index += snap.items;
                    self.offset = 0.0;
                    self.motion = Motion::Idle;
                    self.base_index = self.base_index.rem_euclid(self.range.size());
                    debug!(
                        unit = self.unit.label(),
                        value = self.selected_value(),
                        "wheel settled"
                    );
                }
            }
        }
    }

    /// Fold whole items of the current offset into the base index
    fn fold_offset(&mut self) {
        let items = items_scrolled(self.offset, self.item_height);
        self.base_index = (self.base_index + items).rem_euclid(self.range.size());
        self.offset += items as f32 * self.item_height;
    }
}

/// Hours, minutes and seconds wheels side by side
#[derive(Debug, Clone)]
pub struct TimePicker {
    wheels: [TimeWheel; 3],
}

impl TimePicker {
    pub fn new() -> Self {
        Self {
            wheels: Unit::ALL.map(TimeWheel::new),
        }
    }

    pub fn wheel(&self, unit: Unit) -> &TimeWheel {
        &self.wheels[unit as usize]
    }

    pub fn wheel_mut(&mut self, unit: Unit) -> &mut TimeWheel {
        &mut self.wheels[unit as usize]
    }

    pub fn wheels(&self) -> impl Iterator<Item = &TimeWheel> {
        self.wheels.iter()
    }

    pub fn picked(&self) -> PickedDuration {
        let value = |unit: Unit| self.wheel(unit).selected_value().max(0) as u32;
        PickedDuration::new(value(Unit::Hours), value(Unit::Minutes), value(Unit::Seconds))
    }

    pub fn set(&mut self, picked: PickedDuration) {
        self.wheel_mut(Unit::Hours).set_value(picked.hours as i32);
        self.wheel_mut(Unit::Minutes).set_value(picked.minutes as i32);
        self.wheel_mut(Unit::Seconds).set_value(picked.seconds as i32);
    }

    pub fn reset(&mut self) {
        self.set(PickedDuration::default());
    }

    pub fn set_item_height(&mut self, item_height: f32) {
        for wheel in &mut self.wheels {
            wheel.set_item_height(item_height);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.wheels.iter().any(TimeWheel::is_animating)
    }

    pub fn step(&mut self, dt: Duration) {
        for wheel in &mut self.wheels {
            wheel.step(dt);
        }
    }
}

impl Default for TimePicker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn run_to_rest(wheel: &mut TimeWheel) {
        for _ in 0..1000 {
            if !wheel.is_animating() {
                return;
            }
            wheel.step(FRAME);
        }
        panic!("wheel never came to rest");
    }

    #[test]
    fn test_wraps_past_upper_bound() {
        let h = DEFAULT_ITEM_HEIGHT;
        assert_eq!(resolve_selected_value(-25.0 * h, h, 0, WheelRange::HOURS), 1);
        assert_eq!(resolve_selected_value(-24.0 * h, h, 0, WheelRange::HOURS), 0);
    }

    #[test]
    fn test_wraps_past_lower_bound() {
        let h = DEFAULT_ITEM_HEIGHT;
        assert_eq!(resolve_selected_value(h, h, 0, WheelRange::HOURS), 23);
        assert_eq!(resolve_selected_value(61.0 * h, h, 0, WheelRange::SIXTY), 59);
    }

    #[test]
    fn test_resolution_rounds_to_nearest_item() {
        let h = 40.0;
        assert_eq!(resolve_selected_value(-19.0, h, 5, WheelRange::SIXTY), 5);
        assert_eq!(resolve_selected_value(-21.0, h, 5, WheelRange::SIXTY), 6);
    }

    #[test]
    fn test_resolution_stays_in_range_for_large_drift() {
        let range = WheelRange { low: 3, high: 9 };
        for offset in [-1.0e6, -12_345.6, 0.0, 777.7, 1.0e6] {
            let value = resolve_selected_value(offset, 40.0, -1_000, range);
            assert!(range.contains(value), "{} out of range", value);
        }
    }

    #[test]
    fn test_set_value_centres() {
        let mut wheel = TimeWheel::new(Unit::Minutes);
        wheel.set_value(42);
        assert_eq!(wheel.selected_value(), 42);
        assert_eq!(wheel.offset(), 0.0);
    }

    #[test]
    fn test_set_value_out_of_range_is_ignored() {
        let mut wheel = TimeWheel::new(Unit::Hours);
        wheel.set_value(7);
        wheel.set_value(24);
        wheel.set_value(-1);
        assert_eq!(wheel.selected_value(), 7);
    }

    #[test]
    fn test_slow_release_snaps_immediately() {
        let mut wheel = TimeWheel::new(Unit::Seconds);
        wheel.begin_drag();
        wheel.drag_by(-96.0);
        wheel.drag_by(-0.5);
        wheel.release();

        match wheel.motion() {
            Motion::Snapping(snap) => {
                assert_eq!(snap.target(), -80.0);
                assert_eq!(snap.duration(), Duration::from_millis(33));
            }
            other => panic!("expected snap, got {:?}", other),
        }

        run_to_rest(&mut wheel);
        assert_eq!(wheel.selected_value(), 2);
        assert_eq!(wheel.offset(), 0.0);
    }

    #[test]
    fn test_fast_release_coasts_then_settles_aligned() {
        let mut wheel = TimeWheel::new(Unit::Minutes);
        wheel.begin_drag();
        wheel.drag_by(-30.0);
        wheel.release();
        assert!(matches!(wheel.motion(), Motion::Coasting { .. }));

        let mut last_offset = wheel.offset();
        while let Motion::Coasting { .. } = wheel.motion() {
            wheel.step(FRAME);
            assert!(wheel.offset() <= last_offset);
            assert!(WheelRange::SIXTY.contains(wheel.selected_value()));
            last_offset = wheel.offset();
        }

        let expected =
            resolve_selected_value(wheel.offset(), wheel.item_height(), 0, WheelRange::SIXTY);
        run_to_rest(&mut wheel);
        assert_eq!(wheel.offset(), 0.0);
        assert_eq!(wheel.selected_value(), expected);
    }

    #[test]
    fn test_snap_duration_is_capped() {
        let snap = SnapAnimation::new(-10_019.0, 40.0);
        assert_eq!(snap.duration(), Duration::from_millis(38));
        let far = SnapAnimation::new(-190.0, 400.0);
        assert_eq!(far.duration(), Duration::from_millis(300));
    }

    #[test]
    fn test_value_stable_through_snap_fold() {
        let mut wheel = TimeWheel::new(Unit::Hours);
        wheel.scroll_by(-3.0 * DEFAULT_ITEM_HEIGHT - 7.0);
        let during = wheel.selected_value();
        run_to_rest(&mut wheel);
        assert_eq!(during, 3);
        assert_eq!(wheel.selected_value(), 3);
    }

    #[test]
    fn test_scroll_backwards_wraps() {
        let mut wheel = TimeWheel::new(Unit::Hours);
        wheel.scroll_by(DEFAULT_ITEM_HEIGHT);
        run_to_rest(&mut wheel);
        assert_eq!(wheel.selected_value(), 23);
    }

    #[test]
    fn test_picker_reads_and_resets() {
        let mut picker = TimePicker::new();
        picker.set(PickedDuration::new(1, 30, 15));
        assert_eq!(picker.picked(), PickedDuration::new(1, 30, 15));
        assert_eq!(picker.picked().total_seconds(), 5415);

        picker.reset();
        assert_eq!(picker.picked().total_seconds(), 0);
    }
}
