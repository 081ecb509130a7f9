//! Scaled geometry and hit regions for the timer surface

use crate::wheel::Unit;

pub const BASE_WIDTH: f32 = 380.0;
pub const BASE_HEIGHT: f32 = 480.0;
pub const TITLE_BAR_HEIGHT: f32 = 30.0;
pub const CORNER_RADIUS: f32 = 20.0;
pub const TOGGLE_WIDTH: f32 = 51.0;
pub const TOGGLE_HEIGHT: f32 = 31.0;
pub const CLOSE_SIZE: f32 = 25.0;
pub const RING_THICKNESS: f32 = 8.0;

const MIN_SCALE: f32 = 0.5;
const BUTTON_SIZE: f32 = 60.0;
const MIN_BUTTON_SIZE: f32 = 40.0;
const BUTTON_SPACING: f32 = 70.0;
const MIN_BUTTON_SPACING: f32 = 30.0;
const MIN_RING_DIAMETER: f32 = 150.0;
const WHEEL_ITEM_HEIGHT: f32 = 40.0;
const WHEEL_LABEL_HEIGHT: f32 = 20.0;

/// Axis-aligned rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn centre(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn to_skia(&self) -> Option<tiny_skia::Rect> {
        tiny_skia::Rect::from_xywh(self.x, self.y, self.width, self.height)
    }

    /// Integer rectangle covering these bounds, for the Wayland input region
    pub fn to_pixels(&self) -> (i32, i32, i32, i32) {
        let x = self.x.floor() as i32;
        let y = self.y.floor() as i32;
        let right = (self.x + self.width).ceil() as i32;
        let bottom = (self.y + self.height).ceil() as i32;
        (x, y, right - x, bottom - y)
    }
}

/// Whether a region receives pointer input or lets it fall through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Clickable,
    ClickThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    Warning,
    Close,
    Toggle,
    TitleBar,
    Cancel,
    Primary,
    Wheel(Unit),
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub bounds: Bounds,
    pub interaction: Interaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub title_bar: Bounds,
    pub toggle: Bounds,
    pub close: Bounds,
    pub content: Bounds,
    /// Area above the buttons holding either the picker or the countdown
    pub stage: Bounds,
    pub wheels: [Bounds; 3],
    pub wheel_labels: [Bounds; 3],
    pub cancel: Bounds,
    pub primary: Bounds,
    pub warning: Bounds,
    pub ring_centre: (f32, f32),
    pub ring_radius: f32,
    pub item_height: f32,
}

pub fn scale_for(width: f32, height: f32) -> f32 {
    (width / BASE_WIDTH).min(height / BASE_HEIGHT).max(MIN_SCALE)
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width as f32;
        let height = height as f32;
        let scale = scale_for(width, height);

        let title_bar = Bounds::new(0.0, 0.0, width, TITLE_BAR_HEIGHT);
        let toggle = Bounds::new(
            12.0,
            (TITLE_BAR_HEIGHT - TOGGLE_HEIGHT) / 2.0,
            TOGGLE_WIDTH,
            TOGGLE_HEIGHT,
        );
        let close = Bounds::new(
            width - 12.0 - CLOSE_SIZE,
            (TITLE_BAR_HEIGHT - CLOSE_SIZE) / 2.0,
            CLOSE_SIZE,
            CLOSE_SIZE,
        );
        let content = Bounds::new(0.0, TITLE_BAR_HEIGHT, width, height - TITLE_BAR_HEIGHT);

        let button = (BUTTON_SIZE * scale).max(MIN_BUTTON_SIZE);
        let spacing = (BUTTON_SPACING * scale).max(MIN_BUTTON_SPACING);
        let bottom_margin = (24.0 * scale).max(12.0);
        let button_y = height - bottom_margin - button;
        let cancel = Bounds::new(width / 2.0 - spacing / 2.0 - button, button_y, button, button);
        let primary = Bounds::new(width / 2.0 + spacing / 2.0, button_y, button, button);

        let stage_top = TITLE_BAR_HEIGHT + 10.0 * scale;
        let stage_height = (button_y - 10.0 * scale - stage_top).max(0.0);
        let stage = Bounds::new(0.0, stage_top, width, stage_height);

        let ring_diameter = (stage.width.min(stage.height) * 0.9).max(MIN_RING_DIAMETER * scale);
        let ring_radius = ring_diameter / 2.0;

        let label_height = WHEEL_LABEL_HEIGHT * scale;
        let column_width = (90.0 * scale).min(stage.width / 3.5);
        let column_gap = 10.0 * scale;
        let columns_width = column_width * 3.0 + column_gap * 2.0;
        let columns_x = (width - columns_width) / 2.0;
        let wheel_height = (stage.height - label_height).max(0.0);
        let wheels = [0, 1, 2].map(|i| {
            Bounds::new(
                columns_x + i as f32 * (column_width + column_gap),
                stage.y,
                column_width,
                wheel_height,
            )
        });
        let wheel_labels = wheels.map(|w| Bounds::new(w.x, w.y + w.height, w.width, label_height));

        let warning_width = (300.0 * scale).min(width - 20.0);
        let warning_height = 120.0 * scale;
        let warning = Bounds::new(
            (width - warning_width) / 2.0,
            (height - warning_height) / 2.0,
            warning_width,
            warning_height,
        );

        Self {
            width,
            height,
            scale,
            title_bar,
            toggle,
            close,
            content,
            ring_centre: stage.centre(),
            stage,
            wheels,
            wheel_labels,
            cancel,
            primary,
            warning,
            ring_radius,
            item_height: WHEEL_ITEM_HEIGHT * scale,
        }
    }

    pub fn wheel(&self, unit: Unit) -> Bounds {
        self.wheels[unit as usize]
    }

    /// Largest bitmap pixel size that fits `chars` glyphs inside the ring
    pub fn digit_pixel(&self, chars: usize) -> f32 {
        let available = self.ring_radius * 2.0 * 0.6;
        (available / (chars.max(1) as f32 * 6.0)).floor().max(2.0)
    }

    /// All regions, topmost first
    pub fn regions(&self, transparent: bool, warning_visible: bool) -> Vec<Region> {
        let content_interaction = if transparent {
            Interaction::ClickThrough
        } else {
            Interaction::Clickable
        };
        let clickable = |id, bounds| Region {
            id,
            bounds,
            interaction: Interaction::Clickable,
        };
        let content = |id, bounds| Region {
            id,
            bounds,
            interaction: content_interaction,
        };

        let mut regions = Vec::with_capacity(10);
        if warning_visible {
            // Modal: swallows every click on the surface
            regions.push(clickable(
                RegionId::Warning,
                Bounds::new(0.0, 0.0, self.width, self.height),
            ));
        }
        regions.push(clickable(RegionId::Close, self.close));
        regions.push(clickable(RegionId::Toggle, self.toggle));
        regions.push(clickable(RegionId::TitleBar, self.title_bar));
        regions.push(content(RegionId::Cancel, self.cancel));
        regions.push(content(RegionId::Primary, self.primary));
        for unit in Unit::ALL {
            regions.push(content(RegionId::Wheel(unit), self.wheel(unit)));
        }
        regions.push(content(RegionId::Content, self.content));
        regions
    }

    /// Topmost clickable region under the pointer
    pub fn hit_test(
        &self,
        x: f32,
        y: f32,
        transparent: bool,
        warning_visible: bool,
    ) -> Option<RegionId> {
        self.regions(transparent, warning_visible)
            .into_iter()
            .filter(|r| r.interaction == Interaction::Clickable)
            .find(|r| r.bounds.contains(x, y))
            .map(|r| r.id)
    }

    /// Rectangles that should receive pointer input from the compositor
    pub fn input_rects(&self, transparent: bool, warning_visible: bool) -> Vec<Bounds> {
        self.regions(transparent, warning_visible)
            .into_iter()
            .filter(|r| r.interaction == Interaction::Clickable)
            .map(|r| r.bounds)
            .collect()
    }
}
