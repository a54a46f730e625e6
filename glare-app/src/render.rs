//! Software rasterization of the stimulus scene with tiny-skia.
//!
//! Positions arrive in centimetres from the screen centre (y up) and are
//! converted with the configured display density. On-screen text is laid
//! out with ab_glyph and blitted line by line.

use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use glare_core::{Position, StimulusId};
use glare_experiment::Background;
use std::collections::BTreeMap;
use std::path::Path;
use tiny_skia::{
    Color, FillRule, GradientStop, Paint, PathBuilder, Pixmap, PixmapPaint, Point,
    PremultipliedColorU8, RadialGradient, Rect, SpreadMode, Transform,
};

/// Edge length of the square stimuli.
const STIMULUS_CM: f32 = 4.0;
const FIXATION_CM: f32 = 0.3;
fn gray() -> Color {
    Color::from_rgba8(128, 128, 128, 255)
}

/// What should currently be on screen.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub visible: BTreeMap<StimulusId, Position>,
    pub message: Option<String>,
    pub background: Background,
}

/// Glyph rasterizer for instruction and break-screen text.
pub struct TextRenderer {
    font: FontVec,
    scale: PxScale,
}

impl TextRenderer {
    pub fn load(path: &Path, size_px: f32) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("loading font {}: {e}", path.display()))?;
        Ok(Self {
            font,
            scale: PxScale::from(size_px),
        })
    }

    pub fn line_height(&self) -> f32 {
        let sf = self.font.as_scaled(self.scale);
        sf.height() + sf.line_gap()
    }

    /// One line of black text on a transparent pixmap; `None` for blank lines.
    pub fn render_line(&self, text: &str) -> Option<Pixmap> {
        let sf = self.font.as_scaled(self.scale);
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale: self.scale,
                position: point(pen_x, sf.ascent()),
            });
            pen_x += sf.h_advance(id);
        }

        let outlines: Vec<_> = glyphs
            .into_iter()
            .filter_map(|g| self.font.outline_glyph(g))
            .collect();
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for out in &outlines {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
        if outlines.is_empty() {
            return None;
        }

        let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
        let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
        let mut pm = Pixmap::new(w, h)?;
        let stride = w as usize;
        let dst = pm.pixels_mut();
        for out in &outlines {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                let ix = (x as f32 + b.min.x - min_x).floor() as i64;
                let iy = (y as f32 + b.min.y - min_y).floor() as i64;
                if ix < 0 || iy < 0 || ix >= w as i64 || iy >= h as i64 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;
                // black ink: premultiplied rgb stays 0, coverage accumulates in alpha
                let a = (cov.clamp(0.0, 1.0) * 255.0) as u8;
                let alpha = dst[i].alpha().max(a);
                if let Some(px) = PremultipliedColorU8::from_rgba(0, 0, 0, alpha) {
                    dst[i] = px;
                }
            });
        }
        Some(pm)
    }
}

/// Top edge of a text block: centred on an empty screen, below the
/// stimulus band when stimuli are up.
fn text_top(screen_height: f32, block_height: f32, stimuli_visible: bool) -> f32 {
    if stimuli_visible {
        screen_height * 0.75 - block_height * 0.5
    } else {
        (screen_height - block_height) * 0.5
    }
}

struct RenderedMessage {
    text: String,
    lines: Vec<Option<Pixmap>>,
}

pub struct Painter {
    width: u32,
    height: u32,
    pixels_per_cm: f32,
    text: Option<TextRenderer>,
    message: Option<RenderedMessage>,
}

impl Painter {
    pub fn new(width: u32, height: u32, pixels_per_cm: f32, text: Option<TextRenderer>) -> Self {
        Self {
            width,
            height,
            pixels_per_cm,
            text,
            message: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn to_px(&self, p: Position) -> (f32, f32) {
        (
            self.width as f32 * 0.5 + p.x * self.pixels_per_cm,
            self.height as f32 * 0.5 - p.y * self.pixels_per_cm,
        )
    }

    pub fn paint(&mut self, scene: &Scene, canvas: &mut Pixmap) {
        canvas.fill(match scene.background {
            Background::Gray => gray(),
            Background::White => Color::WHITE,
        });
        for (&id, &at) in &scene.visible {
            self.draw(canvas, id, at);
        }
        if let Some(text) = &scene.message {
            self.draw_message(canvas, text, !scene.visible.is_empty());
        }
    }

    fn draw_message(&mut self, canvas: &mut Pixmap, text: &str, stimuli_visible: bool) {
        let Some(renderer) = &self.text else {
            return;
        };
        if self.message.as_ref().is_none_or(|m| m.text != text) {
            self.message = Some(RenderedMessage {
                text: text.to_owned(),
                lines: text.lines().map(|l| renderer.render_line(l)).collect(),
            });
        }
        let Some(message) = &self.message else {
            return;
        };

        let line_height = renderer.line_height();
        let block = line_height * message.lines.len() as f32;
        let mut y = text_top(self.height as f32, block, stimuli_visible);
        for line in &message.lines {
            if let Some(pm) = line {
                let x = (self.width as f32 - pm.width() as f32) * 0.5;
                canvas.draw_pixmap(
                    x.round() as i32,
                    y.round() as i32,
                    pm.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
            y += line_height;
        }
    }

    fn draw(&self, canvas: &mut Pixmap, id: StimulusId, at: Position) {
        let (cx, cy) = self.to_px(at);
        let half = STIMULUS_CM * self.pixels_per_cm * 0.5;
        match id {
            StimulusId::Fixation => {
                disc(canvas, cx, cy, FIXATION_CM * self.pixels_per_cm * 0.5, Color::BLACK)
            }
            // luminance ramps toward the centre read as glare
            StimulusId::Glare => {
                gradient_square(canvas, cx, cy, half, Color::WHITE, Color::BLACK);
                disc(canvas, cx, cy, half * 0.3, Color::WHITE);
            }
            StimulusId::Nonglare | StimulusId::NonglareLeft | StimulusId::NonglareRight => {
                gradient_square(canvas, cx, cy, half, Color::BLACK, Color::WHITE);
                disc(canvas, cx, cy, half * 0.3, Color::WHITE);
            }
            StimulusId::Iso => {
                square(canvas, cx, cy, half, gray());
                disc(canvas, cx, cy, half * 0.3, Color::WHITE);
            }
            StimulusId::White => square(canvas, cx, cy, half, Color::WHITE),
            StimulusId::Black => disc(canvas, cx, cy, half, Color::BLACK),
            StimulusId::DistractorPlus => cross(canvas, cx, cy, half, Transform::identity()),
            StimulusId::DistractorCross => {
                cross(canvas, cx, cy, half, Transform::from_rotate_at(45.0, cx, cy))
            }
        }
    }
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;
    paint
}

fn square(canvas: &mut Pixmap, cx: f32, cy: f32, half: f32, color: Color) {
    if let Some(rect) = Rect::from_xywh(cx - half, cy - half, half * 2.0, half * 2.0) {
        canvas.fill_rect(rect, &solid(color), Transform::identity(), None);
    }
}

fn disc(canvas: &mut Pixmap, cx: f32, cy: f32, radius: f32, color: Color) {
    if let Some(path) = PathBuilder::from_circle(cx, cy, radius.max(0.5)) {
        canvas.fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
    }
}

fn gradient_square(canvas: &mut Pixmap, cx: f32, cy: f32, half: f32, inner: Color, outer: Color) {
    let centre = Point::from_xy(cx, cy);
    let shader = RadialGradient::new(
        centre,
        centre,
        half,
        vec![GradientStop::new(0.0, inner), GradientStop::new(1.0, outer)],
        SpreadMode::Pad,
        Transform::identity(),
    );
    let Some(shader) = shader else {
        square(canvas, cx, cy, half, outer);
        return;
    };
    let paint = Paint {
        shader,
        anti_alias: false,
        ..Paint::default()
    };
    if let Some(rect) = Rect::from_xywh(cx - half, cy - half, half * 2.0, half * 2.0) {
        canvas.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

/// Plus-shaped bars; rotated 45 degrees for the cross distractor.
fn cross(canvas: &mut Pixmap, cx: f32, cy: f32, half: f32, transform: Transform) {
    let bar = (half * 0.25).max(1.0);
    let paint = solid(Color::BLACK);
    let bars = [
        Rect::from_xywh(cx - half, cy - bar * 0.5, half * 2.0, bar),
        Rect::from_xywh(cx - bar * 0.5, cy - half, bar, half * 2.0),
    ];
    for rect in bars.into_iter().flatten() {
        canvas.fill_rect(rect, &paint, transform, None);
    }
}
