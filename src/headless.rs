//! Terminal countdown without the overlay

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Timestamp;
use jiff::tz::TimeZone;
use thiserror::Error;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::alarm::{self, Alarm};
use crate::countdown::{CountdownController, PickedDuration, Readout, TimerState};
use crate::ticks::Tick;

/// Longest duration the picker can express: 23:59:59
pub const MAX_DURATION_SECS: u64 = 23 * 3600 + 59 * 60 + 59;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Duration is empty")]
    Empty,
    #[error("Invalid duration '{0}', expected HH:MM:SS, MM:SS, SS or a form like 1h2m3s")]
    Invalid(String),
    #[error("Minutes and seconds must be below 60 in '{0}'")]
    OutOfRange(String),
    #[error("Duration of {0}s exceeds the 23:59:59 maximum")]
    TooLong(u64),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Bar,
    Json,
}

/// Parse `HH:MM:SS`, `MM:SS`, `SS` or unit-suffixed forms like `1h30m`
pub fn parse_duration(input: &str) -> Result<PickedDuration, DurationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let total = if input.contains(':') {
        parse_clock(input)?
    } else if input.chars().all(|c| c.is_ascii_digit()) {
        parse_number(input, input)?
    } else {
        parse_units(input)?
    };

    if total > MAX_DURATION_SECS {
        return Err(DurationParseError::TooLong(total));
    }
    Ok(PickedDuration::from_total_seconds(total))
}

fn parse_number(part: &str, input: &str) -> Result<u64, DurationParseError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(DurationParseError::Invalid(input.to_string()));
    }
    part.parse()
        .map_err(|_| DurationParseError::Invalid(input.to_string()))
}

fn parse_clock(input: &str) -> Result<u64, DurationParseError> {
    let parts = input
        .split(':')
        .map(|part| parse_number(part, input))
        .collect::<Result<Vec<_>, _>>()?;

    let (leading, rest) = match parts.as_slice() {
        [m, s] => (m.saturating_mul(60), vec![*s]),
        [h, m, s] => (h.saturating_mul(3600), vec![*m, *s]),
        _ => return Err(DurationParseError::Invalid(input.to_string())),
    };
    if rest.iter().any(|&v| v >= 60) {
        return Err(DurationParseError::OutOfRange(input.to_string()));
    }

    let tail = rest.iter().fold(0, |acc, v| acc * 60 + v);
    // Saturated totals fall through to the `TooLong` check
    Ok(leading.saturating_add(tail))
}

fn parse_units(input: &str) -> Result<u64, DurationParseError> {
    let invalid = || DurationParseError::Invalid(input.to_string());
    let mut total = 0u64;
    let mut seen = Vec::with_capacity(3);
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = c.to_ascii_lowercase();
        let factor = match unit {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(invalid()),
        };
        if digits.is_empty() || seen.contains(&unit) {
            return Err(invalid());
        }
        seen.push(unit);
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        total = total.saturating_add(value.saturating_mul(factor));
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

fn progress_bar(total_seconds: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_seconds);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.yellow/blue}] {prefix}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("#>-"),
    );
    pb
}

fn report(readout: &Readout, bar: Option<&ProgressBar>) -> Result<()> {
    match bar {
        Some(pb) => {
            let remaining = readout.remaining_seconds.ceil() as u64;
            pb.set_position(readout.total_seconds.saturating_sub(remaining));
            pb.set_message(readout.time.clone());
            if readout.completes_at.is_empty() {
                pb.set_prefix("");
            } else {
                pb.set_prefix(format!("done at {}", readout.completes_at));
            }
        }
        None => println!("{}", serde_json::to_string(readout)?),
    }
    Ok(())
}

/// Run one countdown in the terminal; Ctrl-C cancels it
pub async fn run_countdown(
    picked: PickedDuration,
    format: OutputFormat,
    mut alarm: Box<dyn Alarm>,
) -> Result<()> {
    let tz = TimeZone::system();
    let mut controller = CountdownController::new();
    controller.start(picked, Timestamp::now())?;

    let bar = match format {
        OutputFormat::Bar => Some(progress_bar(picked.total_seconds())),
        OutputFormat::Json => None,
    };

    let mut logic = interval(Tick::Logic.interval());
    let mut blink = interval(Tick::Blink.interval());
    logic.set_missed_tick_behavior(MissedTickBehavior::Skip);
    blink.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = logic.tick() => {
                if let Some(signal) = controller.tick(Timestamp::now()) {
                    alarm::dispatch(alarm.as_mut(), signal);
                }
                if let Some(readout) = controller.readout(&tz) {
                    report(&readout, bar.as_ref())?;
                }
                if controller.state() == TimerState::Finished {
                    break;
                }
            }
            _ = blink.tick() => {
                controller.blink();
                if let (Some(pb), Some(readout)) = (bar.as_ref(), controller.readout(&tz)) {
                    pb.set_message(readout.time);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl-C received");
                if let Some(signal) = controller.cancel() {
                    alarm::dispatch(alarm.as_mut(), signal);
                }
                if let Some(pb) = &bar {
                    pb.abandon_with_message("Cancelled");
                }
                info!("Countdown cancelled");
                return Ok(());
            }
        }
    }

    if let Some(pb) = &bar {
        pb.finish_with_message("00:00 Time's up!");
    }

    if alarm.is_playing() {
        info!("Alarm ringing, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        if let Some(signal) = controller.cancel() {
            alarm::dispatch(alarm.as_mut(), signal);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_duration("01:02:03"), Ok(PickedDuration::new(1, 2, 3)));
        assert_eq!(parse_duration("05:00"), Ok(PickedDuration::new(0, 5, 0)));
        assert_eq!(parse_duration("90:00"), Ok(PickedDuration::new(1, 30, 0)));
        assert_eq!(parse_duration("45"), Ok(PickedDuration::new(0, 0, 45)));
        assert_eq!(parse_duration(" 125 "), Ok(PickedDuration::new(0, 2, 5)));
    }

    #[test]
    fn test_parse_unit_forms() {
        assert_eq!(parse_duration("1h2m3s"), Ok(PickedDuration::new(1, 2, 3)));
        assert_eq!(parse_duration("90s"), Ok(PickedDuration::new(0, 1, 30)));
        assert_eq!(parse_duration("2H"), Ok(PickedDuration::new(2, 0, 0)));
        assert_eq!(parse_duration("10m"), Ok(PickedDuration::new(0, 10, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        for bad in ["1x", "m5", "1h1h", "12:", "1:2:3:4", "5m30", "-5"] {
            assert!(
                matches!(parse_duration(bad), Err(DurationParseError::Invalid(_))),
                "{bad} should be invalid"
            );
        }
        assert_eq!(
            parse_duration("00:75"),
            Err(DurationParseError::OutOfRange("00:75".to_string()))
        );
    }

    #[test]
    fn test_parse_caps_at_picker_range() {
        assert_eq!(parse_duration("23:59:59"), Ok(PickedDuration::new(23, 59, 59)));
        assert_eq!(parse_duration("24h"), Err(DurationParseError::TooLong(86_400)));
    }

    #[test]
    fn test_parse_huge_fields_do_not_wrap() {
        for huge in ["5124095576030432:00:00", "307445734561825861:00", "5124095576030432h"] {
            assert!(
                matches!(parse_duration(huge), Err(DurationParseError::TooLong(_))),
                "{huge} should exceed the maximum"
            );
        }
    }

    #[test]
    fn test_zero_parses_but_cannot_start() {
        let picked = parse_duration("0").unwrap();
        let mut controller = CountdownController::new();
        assert!(controller.start(picked, Timestamp::now()).is_err());
    }
}
