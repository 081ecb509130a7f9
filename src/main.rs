mod alarm;
mod animation;
mod config;
mod countdown;
mod headless;
mod overlay;
mod ticks;
mod wheel;

use crate::config::Settings;
use crate::countdown::PickedDuration;
use crate::headless::{OutputFormat, parse_duration};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flip-timer")]
#[command(about = "Pill-shaped countdown timer overlay for Wayland")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/flip-timer/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the timer overlay (default)
    Overlay(OverlayArgs),

    /// Run a countdown in the terminal
    Countdown {
        /// Duration as HH:MM:SS, MM:SS, SS or 1h2m3s
        #[arg(value_parser = parse_duration)]
        duration: PickedDuration,

        /// Output format
        #[arg(long, value_enum, default_value = "bar")]
        format: OutputFormat,

        #[command(flatten)]
        alarm: AlarmArgs,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List available audio output devices
    Devices,
}

#[derive(clap::Args, Default)]
struct OverlayArgs {
    /// Start in transparent (click-through) mode
    #[arg(long)]
    transparent: bool,

    /// Surface width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels
    #[arg(long)]
    height: Option<u32>,

    #[command(flatten)]
    alarm: AlarmArgs,
}

#[derive(clap::Args, Default)]
struct AlarmArgs {
    /// WAV file to play when the countdown finishes
    #[arg(long)]
    alarm_sound: Option<PathBuf>,

    /// Finish silently
    #[arg(long)]
    no_alarm: bool,
}

impl AlarmArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.alarm_sound {
            settings.alarm_sound = Some(path.clone());
        }
        if self.no_alarm {
            settings.alarm_enabled = false;
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective settings
    Show,
    /// Write the default settings to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "flip_timer=debug"
    } else {
        "flip_timer=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Settings::load()),
    }
}

fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config::config_path().context("Could not determine config directory"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Overlay(OverlayArgs::default()));

    match command {
        Commands::Overlay(args) => {
            let mut settings = load_settings(cli.config.as_ref())?;
            args.alarm.apply(&mut settings);
            if args.transparent {
                settings.start_transparent = true;
            }
            if let Some(width) = args.width {
                settings.width = width;
            }
            if let Some(height) = args.height {
                settings.height = height;
            }
            let settings = settings.normalized();
            overlay::run_overlay(&settings)?;
        }

        Commands::Countdown {
            duration,
            format,
            alarm: alarm_args,
        } => {
            let mut settings = load_settings(cli.config.as_ref())?;
            alarm_args.apply(&mut settings);
            info!(
                hours = duration.hours,
                minutes = duration.minutes,
                seconds = duration.seconds,
                "Starting terminal countdown"
            );

            let alarm = alarm::from_settings(&settings);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(headless::run_countdown(duration, format, alarm))?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Path => {
                println!("{}", resolve_config_path(cli.config)?.display());
            }
            ConfigAction::Show => {
                let settings = load_settings(cli.config.as_ref())?;
                println!("{}", toml::to_string_pretty(&settings)?);
            }
            ConfigAction::Init { force } => {
                let path = resolve_config_path(cli.config)?;
                if path.exists() && !force {
                    bail!(
                        "Config already exists at {} (use --force to overwrite)",
                        path.display()
                    );
                }
                Settings::default()
                    .save_to(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote default settings to {}", path.display());
            }
        },

        Commands::Devices => {
            println!("Listing audio output devices");

            let devices = alarm::list_output_devices()?;
            println!("{:<40} {:<10} Sample Rate", "Name", "Default");
            println!("{}", "-".repeat(64));

            for device in devices {
                let default_str = if device.is_default { "YES" } else { "NO" };
                let sample_rate = device
                    .sample_rate
                    .map(|sr| sr.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let name: String = device.name.chars().take(40).collect();
                println!("{:<40} {:<10} {}", name, default_str, sample_rate);
            }
        }
    }

    Ok(())
}
