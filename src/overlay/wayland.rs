//! Wayland layer-shell integration

use anyhow::{Context, Result, anyhow};
use calloop::{
    LoopHandle, RegistrationToken,
    timer::{TimeoutAction, Timer},
};
use jiff::Timestamp;
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState, Region},
    delegate_compositor, delegate_layer, delegate_output, delegate_pointer, delegate_registry,
    delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        Capability, SeatHandler, SeatState,
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
    },
    shell::{
        WaylandSurface,
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
    },
    shm::{
        Shm, ShmHandler,
        slot::{Buffer, SlotPool},
    },
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use wayland_client::{
    Connection, QueueHandle,
    globals::GlobalList,
    protocol::{wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
};

use crate::config::Settings;
use crate::overlay::{render, state::OverlayState};
use crate::ticks::Tick;

/// linux/input-event-codes.h
const BTN_LEFT: u32 = 0x110;

pub struct OverlayApp {
    // Registry state
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    compositor_state: CompositorState,
    shm: Shm,
    layer_shell: LayerShell,

    loop_handle: LoopHandle<'static, OverlayApp>,
    timers: HashMap<Tick, RegistrationToken>,
    pub state: OverlayState,

    // Wayland surface
    layer_surface: Option<LayerSurface>,
    pointer: Option<wl_pointer::WlPointer>,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,
    pub exit: bool,
}

impl OverlayApp {
    pub fn new(
        globals: &GlobalList,
        qh: &QueueHandle<Self>,
        loop_handle: LoopHandle<'static, OverlayApp>,
        state: OverlayState,
    ) -> Result<Self> {
        let registry_state = RegistryState::new(globals);
        let seat_state = SeatState::new(globals, qh);
        let output_state = OutputState::new(globals, qh);
        let compositor_state =
            CompositorState::bind(globals, qh).context("wl_compositor not available")?;
        let shm = Shm::bind(globals, qh).context("wl_shm not available")?;
        let layer_shell =
            LayerShell::bind(globals, qh).context("Compositor does not support wlr-layer-shell")?;

        let width = state.layout().width as u32;
        let height = state.layout().height as u32;

        Ok(Self {
            registry_state,
            seat_state,
            output_state,
            compositor_state,
            shm,
            layer_shell,
            loop_handle,
            timers: HashMap::new(),
            state,
            layer_surface: None,
            pointer: None,
            pool: None,
            buffer: None,
            width,
            height,
            configured: false,
            exit: false,
        })
    }

    pub fn create_layer_surface(&mut self, qh: &QueueHandle<Self>, settings: &Settings) {
        let surface = self.compositor_state.create_surface(qh);

        let layer_surface = self.layer_shell.create_layer_surface(
            qh,
            surface,
            Layer::Overlay,
            Some("flip-timer"),
            None, // None = compositor chooses output
        );

        layer_surface.set_anchor(Anchor::TOP | Anchor::LEFT);
        layer_surface.set_margin(settings.margin_top, 0, 0, settings.margin_left);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        layer_surface.set_size(self.width, self.height);
        layer_surface.set_exclusive_zone(0);

        // Commit initial configuration
        layer_surface.wl_surface().commit();

        self.layer_surface = Some(layer_surface);
    }

    /// Bring timers, input region and buffer in line with the overlay state
    pub fn sync(&mut self) {
        if self.state.should_exit() {
            self.exit = true;
            return;
        }

        self.reconcile_timers();

        if !self.configured {
            return;
        }

        if self.state.take_input_dirty() {
            if let Err(e) = self.apply_input_region() {
                warn!("Failed to update input region: {}", e);
            }
        }

        if self.state.take_redraw() {
            if let Err(e) = self.draw() {
                error!("Draw error: {}", e);
            }
        }
    }

    fn reconcile_timers(&mut self) {
        let schedule = self.state.schedule();

        for tick in Tick::ALL {
            let wanted = schedule.contains(tick);
            let armed = self.timers.contains_key(&tick);

            if wanted && !armed {
                let interval = tick.interval();
                let inserted = self.loop_handle.insert_source(
                    Timer::from_duration(interval),
                    move |_deadline, _, app: &mut OverlayApp| {
                        app.state.on_tick(tick, Instant::now(), Timestamp::now());
                        TimeoutAction::ToDuration(interval)
                    },
                );
                match inserted {
                    Ok(token) => {
                        debug!(?tick, "Timer armed");
                        self.timers.insert(tick, token);
                    }
                    Err(e) => error!(?tick, "Failed to arm timer: {}", e.error),
                }
            } else if !wanted && armed {
                if let Some(token) = self.timers.remove(&tick) {
                    self.loop_handle.remove(token);
                    debug!(?tick, "Timer disarmed");
                }
            }
        }
    }

    fn apply_input_region(&self) -> Result<()> {
        let Some(layer_surface) = &self.layer_surface else {
            return Ok(());
        };

        let region = Region::new(&self.compositor_state)?;
        for rect in self.state.input_rects() {
            let (x, y, w, h) = rect.to_pixels();
            region.add(x, y, w, h);
        }

        let surface = layer_surface.wl_surface();
        surface.set_input_region(Some(region.wl_region()));
        surface.commit();
        debug!(transparent = self.state.is_transparent(), "Input region updated");
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let Some(layer_surface) = &self.layer_surface else {
            return Ok(());
        };

        let stride = self.width as i32 * 4;
        let len = (self.width * self.height * 4) as usize;
        if self.pool.is_none() {
            self.pool = Some(SlotPool::new(len, &self.shm)?);
        }
        let Some(pool) = self.pool.as_mut() else {
            return Ok(());
        };

        let mut pixmap = tiny_skia::Pixmap::new(self.width, self.height)
            .ok_or_else(|| anyhow!("Failed to create {}x{} pixmap", self.width, self.height))?;
        render::render(&mut pixmap, &self.state);

        let (buffer, canvas) = pool.create_buffer(
            self.width as i32,
            self.height as i32,
            stride,
            wl_shm::Format::Argb8888,
        )?;

        // tiny-skia is premultiplied RGBA, Argb8888 is premultiplied BGRA in memory
        for (dst, src) in canvas.chunks_exact_mut(4).zip(pixmap.data().chunks_exact(4)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }

        let surface = layer_surface.wl_surface();
        surface.attach(Some(buffer.wl_buffer()), 0, 0);
        surface.damage_buffer(0, 0, self.width as i32, self.height as i32);
        surface.commit();

        self.buffer = Some(buffer);
        Ok(())
    }
}

delegate_compositor!(OverlayApp);
delegate_output!(OverlayApp);
delegate_shm!(OverlayApp);
delegate_seat!(OverlayApp);
delegate_pointer!(OverlayApp);
delegate_layer!(OverlayApp);
delegate_registry!(OverlayApp);

impl CompositorHandler for OverlayApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for OverlayApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}

    fn update_output(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}

    fn output_destroyed(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}
}

impl LayerShellHandler for OverlayApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("Layer surface closed by compositor");
        self.exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let (width, height) = configure.new_size;
        if width > 0 && height > 0 && (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.pool = None; // Recreate pool with new size
            self.buffer = None;
        }
        self.state.resize(self.width, self.height);

        if !self.configured {
            info!(width = self.width, height = self.height, "Layer surface configured");
        }
        self.configured = true;
        self.state.request_redraw();
    }
}

impl SeatHandler for OverlayApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer && self.pointer.is_none() {
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.pointer = Some(pointer),
                Err(e) => warn!("Failed to get pointer: {}", e),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer {
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
        }
    }

    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
}

impl PointerHandler for OverlayApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        let Some(layer_surface) = &self.layer_surface else {
            return;
        };
        let surface = layer_surface.wl_surface().clone();
        let item_height = self.state.layout().item_height;

        for event in events.iter().filter(|e| e.surface == surface) {
            let (x, y) = (event.position.0 as f32, event.position.1 as f32);
            match &event.kind {
                PointerEventKind::Enter { .. } => self.state.pointer_enter(x, y),
                PointerEventKind::Leave { .. } => self.state.pointer_leave(),
                PointerEventKind::Motion { .. } => self.state.pointer_motion(x, y),
                PointerEventKind::Press { button, .. } if *button == BTN_LEFT => {
                    self.state
                        .pointer_press(x, y, Instant::now(), Timestamp::now());
                }
                PointerEventKind::Release { button, .. } if *button == BTN_LEFT => {
                    self.state.pointer_release();
                }
                PointerEventKind::Axis { vertical, .. } => {
                    let dy = if vertical.discrete != 0 {
                        vertical.discrete as f32 * item_height
                    } else {
                        vertical.absolute as f32
                    };
                    if dy != 0.0 {
                        self.state.scroll(x, y, dy);
                    }
                }
                _ => {}
            }
        }
    }
}

impl ShmHandler for OverlayApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for OverlayApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }
    registry_handlers![OutputState, SeatState];
}
