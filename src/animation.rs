//! Animation utilities for UI state transitions

use std::time::{Duration, Instant};

pub fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Value animation between two floats
#[derive(Debug, Clone)]
pub struct Tween {
    started_at: Instant,
    duration: Duration,
    from: f32,
    to: f32,
    easing: fn(f32) -> f32,
}

impl Tween {
    pub fn new(
        from: f32,
        to: f32,
        duration: Duration,
        easing: fn(f32) -> f32,
        now: Instant,
    ) -> Self {
        Self {
            started_at: now,
            duration,
            from,
            to,
            easing,
        }
    }

    /// Get current animated value and whether animation is complete
    pub fn tick(&self, now: Instant) -> (f32, bool) {
        if self.duration.is_zero() {
            return (self.to, true);
        }
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f32();
        let t = (elapsed / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        let value = self.from + (self.to - self.from) * (self.easing)(t);
        (value, t >= 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for ease in [ease_out_quad, ease_in_out_quad] {
            assert_eq!(ease(0.0), 0.0);
            assert_eq!(ease(1.0), 1.0);
        }
        assert_eq!(ease_in_out_quad(0.5), 0.5);
    }

    #[test]
    fn test_tween_progresses_and_completes() {
        let start = Instant::now();
        let tween = Tween::new(0.0, 1.0, Duration::from_millis(200), ease_out_quad, start);

        let (value, done) = tween.tick(start);
        assert_eq!(value, 0.0);
        assert!(!done);

        let (value, done) = tween.tick(start + Duration::from_millis(100));
        assert!((value - 0.75).abs() < 1e-4);
        assert!(!done);

        let (value, done) = tween.tick(start + Duration::from_millis(500));
        assert_eq!(value, 1.0);
        assert!(done);
    }
}
