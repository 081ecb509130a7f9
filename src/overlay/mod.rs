//! Countdown timer overlay for Wayland
//!
//! A layer-shell surface painted with tiny-skia. Input routing, layout and
//! the transparency policy live in plain Rust modules; `wayland` only adapts
//! compositor events onto them.

mod layout;
mod render;
mod state;
mod wayland;
mod widgets;

use anyhow::{Context, Result, anyhow};
use calloop::EventLoop;
use jiff::tz::TimeZone;
use smithay_client_toolkit::reexports::calloop_wayland_source::WaylandSource;
use tracing::info;
use wayland_client::{Connection, globals::registry_queue_init};

use crate::alarm;
use crate::config::Settings;

use self::state::OverlayState;
use self::wayland::OverlayApp;

/// Run the timer overlay until it is closed
pub fn run_overlay(settings: &Settings) -> Result<()> {
    info!("Starting Wayland overlay");

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland compositor")?;
    let (globals, event_queue) = registry_queue_init(&conn)?;
    let qh = event_queue.handle();

    let mut event_loop: EventLoop<OverlayApp> =
        EventLoop::try_new().context("Failed to create event loop")?;
    WaylandSource::new(conn.clone(), event_queue)
        .insert(event_loop.handle())
        .map_err(|e| anyhow!("Failed to insert Wayland source: {}", e.error))?;

    let tz = TimeZone::system();
    let state = OverlayState::new(settings, alarm::from_settings(settings), tz);
    let mut app = OverlayApp::new(&globals, &qh, event_loop.handle(), state)?;
    app.create_layer_surface(&qh, settings);

    info!("Layer surface created, entering event loop");
    while !app.exit {
        event_loop.dispatch(None, &mut app)?;
        app.sync();
    }

    app.state.shutdown();
    conn.flush()?;
    info!("Overlay shut down");
    Ok(())
}
