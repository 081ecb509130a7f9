//! Alarm playback for finished countdowns
//!
//! The countdown controller only emits start/stop signals. Everything here
//! is best effort: a missing sound file or audio device is logged and the
//! timer carries on silently.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::countdown::AlarmSignal;

pub const DEFAULT_SOUND_FILE: &str = "alarm.wav";

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("{} not found in any of: {}", DEFAULT_SOUND_FILE, format_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("Failed to decode WAV file: {0}")]
    Decode(#[from] hound::Error),
    #[error("WAV file contains no samples")]
    Empty,
    #[error("No default output device found")]
    NoOutputDevice,
    #[error("Audio stream error: {0}")]
    Stream(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Start/stop collaborator for the countdown's alarm signal
pub trait Alarm {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Route a controller signal to the alarm
pub fn dispatch(alarm: &mut dyn Alarm, signal: AlarmSignal) {
    match signal {
        AlarmSignal::Start => alarm.start(),
        AlarmSignal::Stop => alarm.stop(),
    }
}

/// Build the alarm described by the settings, falling back to silence
pub fn from_settings(settings: &Settings) -> Box<dyn Alarm> {
    if !settings.alarm_enabled {
        info!("Alarm sound disabled");
        return Box::new(SilentAlarm::default());
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();

    let sound = resolve_sound_path(
        settings.alarm_sound.as_deref(),
        exe_dir.as_deref(),
        cwd.as_deref(),
    )
    .and_then(|path| {
        info!(path = %path.display(), "Loading alarm sound");
        AlarmSound::load(&path)
    });

    match sound {
        Ok(sound) => Box::new(WavAlarm::new(sound)),
        Err(e) => {
            warn!("Error: {}, alarm will be silent", e);
            Box::new(SilentAlarm::default())
        }
    }
}

/// Find the alarm file: configured path, then next to the executable, then the working directory
pub fn resolve_sound_path(
    configured: Option<&Path>,
    exe_dir: Option<&Path>,
    cwd: Option<&Path>,
) -> Result<PathBuf, AlarmError> {
    let candidates: Vec<PathBuf> = match configured {
        Some(path) => vec![path.to_path_buf()],
        None => [exe_dir, cwd]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(DEFAULT_SOUND_FILE))
            .collect(),
    };

    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or(AlarmError::NotFound {
            searched: candidates,
        })
}

/// Decoded, interleaved alarm samples
#[derive(Debug)]
pub struct AlarmSound {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AlarmSound {
    pub fn load(path: &Path) -> Result<Self, AlarmError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        if samples.is_empty() || spec.channels == 0 {
            return Err(AlarmError::Empty);
        }

        debug!(
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            samples = samples.len(),
            "Decoded alarm sound"
        );

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample for `channel` of `frame`; extra output channels repeat the last source channel
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let channel = channel.min(channels - 1);
        self.samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Loops a WAV file on the default output device until stopped
pub struct WavAlarm {
    sound: Arc<AlarmSound>,
    stream: Option<cpal::Stream>,
}

impl WavAlarm {
    pub fn new(sound: AlarmSound) -> Self {
        Self {
            sound: Arc::new(sound),
            stream: None,
        }
    }

    fn open_stream(&self) -> Result<cpal::Stream, AlarmError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AlarmError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AlarmError::Stream(e.to_string()))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let stream = match format {
            SampleFormat::F32 => build_looping_stream::<f32>(&device, &config, self.sound.clone()),
            SampleFormat::I16 => build_looping_stream::<i16>(&device, &config, self.sound.clone()),
            SampleFormat::U16 => build_looping_stream::<u16>(&device, &config, self.sound.clone()),
            SampleFormat::I32 => build_looping_stream::<i32>(&device, &config, self.sound.clone()),
            other => Err(AlarmError::Stream(format!("Unsupported sample format: {:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AlarmError::Stream(e.to_string()))?;
        Ok(stream)
    }
}

impl Alarm for WavAlarm {
    fn start(&mut self) {
        if self.stream.is_some() {
            return;
        }
        match self.open_stream() {
            Ok(stream) => {
                info!("Playing alarm");
                self.stream = Some(stream);
            }
            Err(e) => error!("Failed to play alarm: {}", e),
        }
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("Alarm sound stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.stream.is_some()
    }
}

fn build_looping_stream<T>(
    device: &Device,
    config: &StreamConfig,
    sound: Arc<AlarmSound>,
) -> Result<cpal::Stream, AlarmError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let out_channels = config.channels as usize;
    // Nearest-neighbour resampling is plenty for an alarm tone
    let step = f64::from(sound.sample_rate()) / f64::from(config.sample_rate.0);
    let frames = sound.frames();
    let mut cursor = 0.0_f64;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(out_channels) {
                    let index = cursor as usize;
                    for (channel, out) in frame.iter_mut().enumerate() {
                        *out = <T as cpal::Sample>::from_sample(sound.sample(index, channel));
                    }
                    cursor += step;
                    if cursor as usize >= frames {
                        cursor = 0.0;
                    }
                }
            },
            |err| error!("Alarm stream error: {}", err),
            None,
        )
        .map_err(|e| AlarmError::Stream(e.to_string()))
}

/// Logs alarm signals without making a sound
#[derive(Debug, Default)]
pub struct SilentAlarm {
    playing: bool,
}

impl Alarm for SilentAlarm {
    fn start(&mut self) {
        info!("Countdown finished (silent alarm)");
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rate: Option<u32>,
}

pub fn list_output_devices() -> anyhow::Result<Vec<OutputDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut infos = Vec::new();
    for device in host.output_devices()? {
        let name = device.name().unwrap_or("Unknown Device".to_string());
        let sample_rate = device
            .default_output_config()
            .ok()
            .map(|c| c.sample_rate().0);
        infos.push(OutputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            sample_rate,
        });
    }
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("bell.wav");
        fs::write(&custom, b"").unwrap();
        fs::write(dir.path().join(DEFAULT_SOUND_FILE), b"").unwrap();

        let found = resolve_sound_path(Some(&custom), Some(dir.path()), None).unwrap();
        assert_eq!(found, custom);
    }

    #[test]
    fn test_missing_configured_path_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_SOUND_FILE), b"").unwrap();

        let result = resolve_sound_path(Some(&dir.path().join("nope.wav")), Some(dir.path()), None);
        assert!(matches!(result, Err(AlarmError::NotFound { .. })));
    }

    #[test]
    fn test_exe_dir_before_working_dir() {
        let exe_dir = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        fs::write(cwd.path().join(DEFAULT_SOUND_FILE), b"").unwrap();

        let found = resolve_sound_path(None, Some(exe_dir.path()), Some(cwd.path())).unwrap();
        assert_eq!(found, cwd.path().join(DEFAULT_SOUND_FILE));

        fs::write(exe_dir.path().join(DEFAULT_SOUND_FILE), b"").unwrap();
        let found = resolve_sound_path(None, Some(exe_dir.path()), Some(cwd.path())).unwrap();
        assert_eq!(found, exe_dir.path().join(DEFAULT_SOUND_FILE));
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_sound_path(None, Some(dir.path()), None).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_SOUND_FILE));
    }

    #[test]
    fn test_load_normalises_int_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 2, &[16384, -16384, 0, 32767]);

        let sound = AlarmSound::load(&path).unwrap();
        assert_eq!(sound.channels(), 2);
        assert_eq!(sound.frames(), 2);
        assert_eq!(sound.sample(0, 0), 0.5);
        assert_eq!(sound.sample(0, 1), -0.5);
        // Extra output channels repeat the last source channel
        assert_eq!(sound.sample(1, 5), 32767.0 / 32768.0);
        assert_eq!(sound.sample(9, 0), 0.0);
    }

    #[test]
    fn test_empty_wav_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, &[]);
        assert!(matches!(AlarmSound::load(&path), Err(AlarmError::Empty)));
    }

    #[test]
    fn test_dispatch_routes_signals() {
        let mut alarm = SilentAlarm::default();
        dispatch(&mut alarm, AlarmSignal::Start);
        assert!(alarm.is_playing());
        dispatch(&mut alarm, AlarmSignal::Stop);
        assert!(!alarm.is_playing());
    }
}
