//! tiny-skia rendering for the timer surface

use std::f32::consts::PI;
use tiny_skia::*;

use crate::countdown::TimerState;
use crate::overlay::layout::{Bounds, Layout, CORNER_RADIUS, RING_THICKNESS};
use crate::overlay::state::OverlayState;
use crate::overlay::widgets::{self, ButtonStyle, ToggleSwitch};
use crate::wheel::TimeWheel;

/// Glyph cell width in font pixels (5 columns plus 1 spacing)
const GLYPH_ADVANCE: f32 = 6.0;
const GLYPH_ROWS: f32 = 7.0;

/// Render the whole surface, applying the transparency fade last
pub fn render(pixmap: &mut Pixmap, state: &OverlayState) {
    pixmap.fill(Color::TRANSPARENT);

    let opacity = state.opacity();
    if opacity >= 1.0 {
        draw_surface(pixmap, state);
        return;
    }

    let Some(mut content) = Pixmap::new(pixmap.width(), pixmap.height()) else {
        return;
    };
    draw_surface(&mut content, state);
    let paint = PixmapPaint {
        opacity,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, content.as_ref(), &paint, Transform::identity(), None);
}

fn draw_surface(pixmap: &mut Pixmap, state: &OverlayState) {
    let layout = state.layout();
    let timer = state.controller().state();

    draw_background(pixmap, layout);
    draw_toggle(pixmap, layout.toggle, state.toggle());
    draw_close(pixmap, layout.close);

    match timer {
        TimerState::Idle => {
            for wheel in state.picker().wheels() {
                draw_wheel(pixmap, layout, wheel);
            }
        }
        TimerState::Running | TimerState::Paused | TimerState::Finished => {
            if let Some(readout) = state.readout() {
                if timer != TimerState::Finished {
                    draw_progress_ring(pixmap, layout, readout.progress);
                }
                draw_countdown(pixmap, layout, &readout.time, &readout.completes_at);
            }
        }
    }

    draw_button(pixmap, layout.cancel, &widgets::cancel_button(timer));
    draw_button(pixmap, layout.primary, &widgets::primary_button(timer));

    if let Some(message) = state.warning() {
        draw_warning(pixmap, layout, message);
    }
}

fn fill(pixmap: &mut Pixmap, path: &Path, color: Color, anti_alias: bool) {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = anti_alias;
    pixmap.fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn with_alpha(color: Color, alpha: f32) -> Color {
    Color::from_rgba(color.red(), color.green(), color.blue(), color.alpha() * alpha)
        .unwrap_or(color)
}

fn draw_background(pixmap: &mut Pixmap, layout: &Layout) {
    let Some(rect) = Rect::from_xywh(0.0, 0.0, layout.width, layout.height) else {
        return;
    };
    let path = create_rounded_rect(rect, CORNER_RADIUS);
    fill(pixmap, &path, Color::BLACK, true);
}

fn draw_toggle(pixmap: &mut Pixmap, bounds: Bounds, toggle: &ToggleSwitch) {
    let Some(rect) = bounds.to_skia() else {
        return;
    };
    let radius = bounds.height / 2.0;
    let track = create_rounded_rect(rect, radius);
    fill(pixmap, &track, toggle.track_color(), true);

    let handle = bounds.height - 4.0;
    let travel = bounds.width - handle - 4.0;
    let cx = bounds.x + 2.0 + handle / 2.0 + travel * toggle.position();
    let cy = bounds.y + bounds.height / 2.0;
    if let Some(circle) = PathBuilder::from_circle(cx, cy, handle / 2.0) {
        fill(pixmap, &circle, widgets::white(), true);
    }
}

fn draw_close(pixmap: &mut Pixmap, bounds: Bounds) {
    let inset = bounds.width * 0.3;
    let mut pb = PathBuilder::new();
    pb.move_to(bounds.x + inset, bounds.y + inset);
    pb.line_to(bounds.x + bounds.width - inset, bounds.y + bounds.height - inset);
    pb.move_to(bounds.x + bounds.width - inset, bounds.y + inset);
    pb.line_to(bounds.x + inset, bounds.y + bounds.height - inset);
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(widgets::title_grey());
    paint.anti_alias = true;
    let stroke = Stroke {
        width: 2.0,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Visual falloff of a wheel item `distance` pixels from the centre line
fn item_falloff(distance: f32, half_height: f32) -> (f32, f32) {
    if half_height <= 0.0 {
        return (1.0, 1.0);
    }
    let normalized = (distance / (half_height * 0.8)).min(1.0);
    let opacity = (1.0 - normalized).powi(2).max(0.3);
    let scale = (1.0 - normalized * 0.3).max(0.7);
    (opacity, scale)
}

fn draw_wheel(pixmap: &mut Pixmap, layout: &Layout, wheel: &TimeWheel) {
    let bounds = layout.wheel(wheel.unit());
    let item_height = wheel.item_height();
    let half = bounds.height / 2.0;
    let centre_y = bounds.y + half;
    let centre_x = bounds.x + bounds.width / 2.0;
    let base_pixel = (item_height * 0.6 / GLYPH_ROWS).max(1.0);

    // Selection lines around the centred item
    for y in [centre_y - item_height / 2.0, centre_y + item_height / 2.0] {
        if let Some(rect) = Rect::from_xywh(bounds.x, y, bounds.width, 1.0) {
            fill(
                pixmap,
                &PathBuilder::from_rect(rect),
                Color::from_rgba8(50, 50, 50, 150),
                false,
            );
        }
    }

    let centre = wheel.centre_position();
    let visible = (half / item_height).ceil() as i64 + 1;
    let first = centre.floor() as i64 - visible;
    let last = centre.ceil() as i64 + visible;

    for index in first..=last {
        let item_y = centre_y + (index as f32 - centre) * item_height;
        let (opacity, scale) = item_falloff((item_y - centre_y).abs(), half);
        let pixel = base_pixel * scale;
        let text = format!("{:02}", wheel.value_at(index));
        let glyph_height = GLYPH_ROWS * pixel;
        let top = item_y - glyph_height / 2.0;
        if top < bounds.y || top + glyph_height > bounds.y + bounds.height {
            continue;
        }
        let x = centre_x - text_width(&text, pixel) / 2.0;
        draw_text(pixmap, &text, x, top, pixel, with_alpha(widgets::white(), opacity));
    }

    let label = layout.wheel_labels[wheel.unit() as usize];
    let pixel = (1.5 * layout.scale).max(1.0);
    let text = wheel.unit().label();
    draw_text(
        pixmap,
        text,
        label.x + (label.width - text_width(text, pixel)) / 2.0,
        label.y + (label.height - GLYPH_ROWS * pixel) / 2.0,
        pixel,
        widgets::label_grey(),
    );
}

/// Arc of `progress` of a full turn, starting at 12 o'clock and running counter-clockwise
fn progress_arc(cx: f32, cy: f32, radius: f32, progress: f32) -> Option<Path> {
    let progress = progress.clamp(0.0, 1.0);
    if progress <= 0.0 {
        return None;
    }
    if progress >= 0.999 {
        return PathBuilder::from_circle(cx, cy, radius);
    }

    let sweep = progress * 2.0 * PI;
    let segments = ((progress * 180.0).ceil() as usize).max(2);
    let mut pb = PathBuilder::new();
    pb.move_to(cx, cy - radius);
    for i in 1..=segments {
        let angle = sweep * i as f32 / segments as f32;
        pb.line_to(cx - radius * angle.sin(), cy - radius * angle.cos());
    }
    pb.finish()
}

fn draw_progress_ring(pixmap: &mut Pixmap, layout: &Layout, progress: f32) {
    let (cx, cy) = layout.ring_centre;
    let radius = layout.ring_radius - RING_THICKNESS / 2.0;
    let Some(path) = progress_arc(cx, cy, radius, progress) else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(widgets::orange());
    paint.anti_alias = true;
    let stroke = Stroke {
        width: RING_THICKNESS,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn draw_countdown(pixmap: &mut Pixmap, layout: &Layout, time: &str, completes_at: &str) {
    let (cx, cy) = layout.ring_centre;
    let pixel = layout.digit_pixel(time.chars().count());
    let digits_height = GLYPH_ROWS * pixel;
    draw_text(
        pixmap,
        time,
        cx - text_width(time, pixel) / 2.0,
        cy - digits_height / 2.0,
        pixel,
        widgets::white(),
    );

    if completes_at.is_empty() {
        return;
    }

    let small = (2.0 * layout.scale).max(1.5);
    let bell = GLYPH_ROWS * small;
    let gap = small * 3.0;
    let row_width = bell + gap + text_width(completes_at, small);
    let x = cx - row_width / 2.0;
    let y = cy + digits_height / 2.0 + digits_height * 0.6;
    draw_bell(pixmap, x, y, bell);
    draw_text(pixmap, completes_at, x + bell + gap, y, small, widgets::label_grey());
}

fn draw_bell(pixmap: &mut Pixmap, x: f32, y: f32, size: f32) {
    let mut pb = PathBuilder::new();
    let mid = x + size / 2.0;
    pb.move_to(mid, y);
    pb.quad_to(x + size * 0.85, y, x + size * 0.85, y + size * 0.55);
    pb.line_to(x + size, y + size * 0.8);
    pb.line_to(x, y + size * 0.8);
    pb.line_to(x + size * 0.15, y + size * 0.55);
    pb.quad_to(x + size * 0.15, y, mid, y);
    pb.close();
    if let Some(body) = pb.finish() {
        fill(pixmap, &body, widgets::orange(), true);
    }
    if let Some(clapper) = PathBuilder::from_circle(mid, y + size * 0.9, size * 0.12) {
        fill(pixmap, &clapper, widgets::orange(), true);
    }
}

fn draw_button(pixmap: &mut Pixmap, bounds: Bounds, style: &ButtonStyle) {
    let (cx, cy) = bounds.centre();
    let radius = bounds.width.min(bounds.height) / 2.0;
    if let Some(circle) = PathBuilder::from_circle(cx, cy, radius) {
        fill(pixmap, &circle, style.fill, true);
    }

    let chars = style.label.chars().count().max(1) as f32;
    let pixel = (radius * 2.0 * 0.8 / (chars * GLYPH_ADVANCE)).clamp(1.0, 2.0);
    draw_text(
        pixmap,
        style.label,
        cx - text_width(style.label, pixel) / 2.0,
        cy - GLYPH_ROWS * pixel / 2.0,
        pixel,
        style.text,
    );
}

fn draw_warning(pixmap: &mut Pixmap, layout: &Layout, message: &str) {
    // Dim everything behind the banner
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, layout.width, layout.height) {
        let path = create_rounded_rect(rect, CORNER_RADIUS);
        fill(pixmap, &path, Color::from_rgba8(0, 0, 0, 160), true);
    }

    let bounds = layout.warning;
    let Some(rect) = bounds.to_skia() else {
        return;
    };
    let panel = create_rounded_rect(rect, 12.0 * layout.scale.max(0.5));
    fill(pixmap, &panel, Color::from_rgba8(44, 44, 46, 250), true);

    let pixel = (2.0 * layout.scale).max(1.0);
    let padding = 12.0 * layout.scale;
    let mut y = bounds.y + padding;
    draw_text(pixmap, "Warning", bounds.x + padding, y, pixel, widgets::orange());
    y += GLYPH_ROWS * pixel * 2.0;

    let body_pixel = (1.5 * layout.scale).max(1.0);
    let available = bounds.width - padding * 2.0;
    let max_chars = (available / (GLYPH_ADVANCE * body_pixel)).floor() as usize;
    for line in wrap_text(message, max_chars) {
        draw_text(pixmap, &line, bounds.x + padding, y, body_pixel, widgets::white());
        y += GLYPH_ROWS * body_pixel * 1.6;
    }

    let hint = "Click to dismiss";
    draw_text(
        pixmap,
        hint,
        bounds.x + bounds.width - padding - text_width(hint, body_pixel),
        bounds.y + bounds.height - padding - GLYPH_ROWS * body_pixel,
        body_pixel,
        widgets::label_grey(),
    );
}

/// Greedy word wrap on character count
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            word.len()
        } else {
            line.len() + 1 + word.len()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn text_width(text: &str, pixel: f32) -> f32 {
    let chars = text.chars().count() as f32;
    if chars == 0.0 {
        return 0.0;
    }
    chars * GLYPH_ADVANCE * pixel - pixel
}

/// Draw simple text using rectangles (bitmap-style font)
fn draw_text(pixmap: &mut Pixmap, text: &str, x: f32, y: f32, pixel_size: f32, color: Color) {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false; // Sharp pixels for text

    for (i, ch) in text.chars().enumerate() {
        let char_x = x + i as f32 * GLYPH_ADVANCE * pixel_size;
        draw_char(pixmap, ch, char_x, y, pixel_size, &paint);
    }
}

fn draw_char(pixmap: &mut Pixmap, ch: char, x: f32, y: f32, pixel_size: f32, paint: &Paint) {
    let pattern = glyph(ch);
    let mut pb = PathBuilder::new();
    for (row, &bits) in pattern.iter().enumerate() {
        for col in 0..5 {
            if (bits >> (4 - col)) & 1 == 1 {
                let px = x + col as f32 * pixel_size;
                let py = y + row as f32 * pixel_size;
                if let Some(rect) = Rect::from_xywh(px, py, pixel_size, pixel_size) {
                    pb.push_rect(rect);
                }
            }
        }
    }
    if let Some(path) = pb.finish() {
        pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// 5x7 bitmap patterns (1 = filled); lowercase letters share the uppercase shapes
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10011, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        _ => [0; 7], // Unknown char = blank
    }
}

fn create_rounded_rect(rect: Rect, radius: f32) -> Path {
    let mut pb = PathBuilder::new();

    let x = rect.x();
    let y = rect.y();
    let w = rect.width();
    let h = rect.height();
    let radius = radius.min(w / 2.0).min(h / 2.0);

    pb.move_to(x + radius, y);
    pb.line_to(x + w - radius, y);
    pb.quad_to(x + w, y, x + w, y + radius);
    pb.line_to(x + w, y + h - radius);
    pb.quad_to(x + w, y + h, x + w - radius, y + h);
    pb.line_to(x + radius, y + h);
    pb.quad_to(x, y + h, x, y + h - radius);
    pb.line_to(x, y + radius);
    pb.quad_to(x, y, x + radius, y);
    pb.close();

    // Fall back to a plain rect if path building fails
    pb.finish().unwrap_or_else(|| PathBuilder::from_rect(rect))
}
