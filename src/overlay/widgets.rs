//! Toggle switch animation and button styling

use std::time::{Duration, Instant};
use tiny_skia::Color;

use crate::animation::{Tween, ease_in_out_quad};
use crate::countdown::TimerState;

const TOGGLE_DURATION: Duration = Duration::from_millis(200);

/// iOS-style on/off switch with an animated slider
#[derive(Debug, Clone)]
pub struct ToggleSwitch {
    on: bool,
    position: f32,
    tween: Option<Tween>,
}

impl ToggleSwitch {
    pub fn new(on: bool) -> Self {
        Self {
            on,
            position: if on { 1.0 } else { 0.0 },
            tween: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Slider position, 0.0 = off and 1.0 = on
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Flip the switch and return the new state
    pub fn flip(&mut self, now: Instant) -> bool {
        self.on = !self.on;
        let target = if self.on { 1.0 } else { 0.0 };
        self.tween = Some(Tween::new(
            self.position,
            target,
            TOGGLE_DURATION,
            ease_in_out_quad,
            now,
        ));
        self.on
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(tween) = &self.tween else {
            return;
        };
        let (position, done) = tween.tick(now);
        self.position = position;
        if done {
            self.tween = None;
        }
    }

    pub fn track_color(&self) -> Color {
        lerp_color(light_grey(), green(), self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonStyle {
    pub label: &'static str,
    pub fill: Color,
    pub text: Color,
    pub enabled: bool,
}

pub fn primary_button(state: TimerState) -> ButtonStyle {
    let (label, fill) = match state {
        TimerState::Idle | TimerState::Finished => ("Start", start_fill()),
        TimerState::Running => ("Pause", pause_fill()),
        TimerState::Paused => ("Resume", pause_fill()),
    };
    ButtonStyle {
        label,
        fill,
        text: white(),
        enabled: true,
    }
}

pub fn cancel_button(state: TimerState) -> ButtonStyle {
    let enabled = state != TimerState::Idle;
    ButtonStyle {
        label: "Cancel",
        fill: if enabled { cancel_fill() } else { disabled_fill() },
        text: if enabled { white() } else { disabled_text() },
        enabled,
    }
}

fn lerp_color(from: Color, to: Color, t: f32) -> Color {
    if t >= 1.0 {
        return to;
    }
    let t = t.max(0.0);
    let mix = |a: f32, b: f32| a + (b - a) * t;
    Color::from_rgba(
        mix(from.red(), to.red()),
        mix(from.green(), to.green()),
        mix(from.blue(), to.blue()),
        mix(from.alpha(), to.alpha()),
    )
    .unwrap_or(to)
}

// Color helper functions
pub fn green() -> Color {
    Color::from_rgba8(76, 217, 100, 255)
}

pub fn light_grey() -> Color {
    Color::from_rgba8(189, 189, 191, 255)
}

pub fn orange() -> Color {
    Color::from_rgba8(255, 149, 0, 255)
}

pub fn white() -> Color {
    Color::from_rgba8(255, 255, 255, 255)
}

pub fn label_grey() -> Color {
    Color::from_rgba8(138, 138, 142, 255)
}

pub fn title_grey() -> Color {
    Color::from_rgba8(204, 204, 204, 255)
}

fn start_fill() -> Color {
    Color::from_rgba8(50, 205, 50, 77)
}

fn pause_fill() -> Color {
    Color::from_rgba8(255, 149, 0, 77)
}

fn cancel_fill() -> Color {
    Color::from_rgba8(58, 58, 60, 77)
}

fn disabled_fill() -> Color {
    Color::from_rgba8(51, 51, 51, 77)
}

fn disabled_text() -> Color {
    Color::from_rgba8(119, 119, 119, 255)
}
