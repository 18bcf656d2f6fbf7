//! Procedural texture synthesis.
//!
//! Each recipe paints into a CPU-side [`Canvas`] (an `image::RgbaImage` with
//! source-over blending) and returns an immutable [`Texture`] tagged with its
//! wrap mode and repeat factor. Recipes never cache: every call repaints.
//!
//! If a canvas cannot be allocated (zero or oversized dimensions) the recipe
//! degrades to a blank 1x1 texture and logs a warning.

use std::sync::Arc;

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::rng::SceneRng;

/// Largest edge a canvas may have.
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Default edge for the wood, code and floor recipes.
pub const STANDARD_SIZE: u32 = 512;

/// Default edge for the wall recipe.
pub const WALL_SIZE: u32 = 1024;

/// Lines shown on the monitor.
pub const CODE_LINES: [&str; 12] = [
    "// Learning System",
    "function learn() {",
    "  const skill = study();",
    "  const knowledge = practice();",
    "  return skill + knowledge;",
    "}",
    "",
    "const user = {",
    "  name: \"学习者\",",
    "  progress: 75,",
    "  goals: [\"React\", \"TypeScript\"]",
    "};",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

/// How the sampler should interpret the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// sRGB colour data.
    Color,
    /// Tangent-space normals stored linearly.
    Normal,
}

/// Immutable RGBA pixel buffer plus sampling parameters.
#[derive(Debug, Clone)]
pub struct Texture {
    pub label: &'static str,
    pub kind: TextureKind,
    pub wrap: WrapMode,
    pub repeat: [f32; 2],
    image: RgbaImage,
}

impl Texture {
    /// Fallback used when the canvas is unavailable.
    pub fn blank(label: &'static str, kind: TextureKind, wrap: WrapMode, repeat: [f32; 2]) -> Self {
        Self {
            label,
            kind,
            wrap,
            repeat,
            image: RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn is_blank(&self) -> bool {
        self.width() == 1 && self.height() == 1
    }

    pub fn with_repeat(mut self, x: f32, y: f32) -> Self {
        self.repeat = [x, y];
        self
    }
}

// ============================================================================
// Canvas
// ============================================================================

/// Minimal 2D painter over an RGBA image.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// `None` when the size is zero or exceeds [`MAX_TEXTURE_SIZE`].
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
            return None;
        }
        Some(Self {
            image: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn fill(&mut self, rgb: [u8; 3]) {
        for p in self.image.pixels_mut() {
            *p = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        }
    }

    /// Top-to-bottom gradient through `(offset, colour)` stops sorted by offset.
    pub fn fill_vertical_gradient(&mut self, stops: &[(f32, [u8; 3])]) {
        let Some(first) = stops.first() else {
            return;
        };
        let height = self.height();
        for y in 0..height {
            let t = if height > 1 {
                y as f32 / (height - 1) as f32
            } else {
                0.0
            };
            let mut rgb = first.1;
            for pair in stops.windows(2) {
                let (t0, c0) = pair[0];
                let (t1, c1) = pair[1];
                if t >= t0 && t <= t1 {
                    let k = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                    rgb = [
                        lerp_u8(c0[0], c1[0], k),
                        lerp_u8(c0[1], c1[1], k),
                        lerp_u8(c0[2], c1[2], k),
                    ];
                    break;
                }
                if t > t1 {
                    rgb = c1;
                }
            }
            for x in 0..self.width() {
                self.image.put_pixel(x, y, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
    }

    /// Source-over blend of a single pixel. Out-of-bounds writes are dropped.
    pub fn blend_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for i in 0..3 {
            dst.0[i] = (rgb[i] as f32 * a + dst.0[i] as f32 * (1.0 - a)).round() as u8;
        }
        dst.0[3] = ((a + dst.0[3] as f32 / 255.0 * (1.0 - a)) * 255.0).round() as u8;
    }

    /// Anti-aliased line with butt caps.
    pub fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, rgb: [u8; 3], alpha: f32) {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON || width <= 0.0 {
            return;
        }
        let half = width * 0.5;

        // Walk the major axis; each step paints a short span across the minor axis.
        let horizontal = delta.x.abs() >= delta.y.abs();
        let (major_from, major_to, minor_from, minor_delta, major_delta) = if horizontal {
            (from.x, to.x, from.y, delta.y, delta.x)
        } else {
            (from.y, to.y, from.x, delta.x, delta.y)
        };
        let cos = major_delta.abs() / length;
        let span = half / cos.max(1e-3);

        let (lo, hi) = if major_from <= major_to {
            (major_from, major_to)
        } else {
            (major_to, major_from)
        };
        let start = lo.floor() as i64;
        let end = hi.ceil() as i64;

        for m in start..end {
            let mc = m as f32 + 0.5;
            if mc < lo || mc > hi {
                continue;
            }
            let t = (mc - major_from) / major_delta;
            let center = minor_from + minor_delta * t;
            let n0 = (center - span - 1.0).floor() as i64;
            let n1 = (center + span + 1.0).ceil() as i64;
            for n in n0..=n1 {
                let coverage = (span + 0.5 - (n as f32 + 0.5 - center).abs()).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let (x, y) = if horizontal { (m, n) } else { (n, m) };
                self.blend_pixel(x, y, rgb, alpha * coverage);
            }
        }
    }

    /// Closed polyline through `points`.
    pub fn stroke_polygon(&mut self, points: &[Vec2], width: f32, rgb: [u8; 3], alpha: f32) {
        if points.len() < 2 {
            return;
        }
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            self.stroke_line(a, b, width, rgb, alpha);
        }
    }

    pub fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, rgb: [u8; 3], alpha: f32) {
        let min = a.min(b).min(c).floor();
        let max = a.max(b).max(c).ceil();
        let area = edge(a, b, c);
        if area.abs() <= f32::EPSILON {
            return;
        }
        for y in min.y as i64..max.y as i64 {
            for x in min.x as i64..max.x as i64 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b, c, p) / area;
                let w1 = edge(c, a, p) / area;
                let w2 = edge(a, b, p) / area;
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    self.blend_pixel(x, y, rgb, alpha);
                }
            }
        }
    }

    /// Draw text with the 8x8 bitmap font scaled to `size` pixels per glyph cell.
    /// `(x, baseline)` is the left end of the baseline. Characters without an 8x8 bitmap
    /// (CJK ideographs among them) render as a hollow box.
    pub fn fill_text(&mut self, text: &str, x: f32, baseline: f32, size: f32, rgb: [u8; 3], alpha: f32) {
        let cell = size.max(1.0);
        let top = baseline - cell;
        let cell_px = cell.ceil() as i64;

        for (col, ch) in text.chars().enumerate() {
            let glyph = glyph_for_char(ch);
            let left = x + col as f32 * cell;
            for py in 0..cell_px {
                let gy = ((py as f32 + 0.5) / cell * 8.0) as usize;
                if gy >= 8 {
                    continue;
                }
                let bits = glyph[gy];
                for px in 0..cell_px {
                    let gx = ((px as f32 + 0.5) / cell * 8.0) as usize;
                    if gx >= 8 || (bits >> gx) & 0x01 == 0 {
                        continue;
                    }
                    self.blend_pixel(
                        (left + px as f32) as i64,
                        (top + py as f32) as i64,
                        rgb,
                        alpha,
                    );
                }
            }
        }
    }

    pub fn into_texture(self, label: &'static str, kind: TextureKind, wrap: WrapMode, repeat: [f32; 2]) -> Texture {
        Texture {
            label,
            kind,
            wrap,
            repeat,
            image: self.image,
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Hollow box drawn for characters the bitmap font has no glyph for.
const MISSING_GLYPH: [u8; 8] = [0xff, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xff];

fn glyph_for_char(ch: char) -> [u8; 8] {
    use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, HIRAGANA_FONTS, LATIN_FONTS, MISC_FONTS};
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| HIRAGANA_FONTS.get(ch))
        .or_else(|| MISC_FONTS.get(ch))
        .unwrap_or(MISSING_GLYPH)
}

fn canvas_or_warn(label: &'static str, width: u32, height: u32) -> Option<Canvas> {
    let canvas = Canvas::new(width, height);
    if canvas.is_none() {
        log::warn!(
            "texture '{}' requested at {}x{}; canvas unavailable, using blank texture",
            label,
            width,
            height
        );
    }
    canvas
}

// ============================================================================
// Recipes
// ============================================================================

/// Brown wood with `strokes` randomised translucent grain lines.
pub fn wood_grain(rng: &mut SceneRng, size: u32, strokes: u32) -> Texture {
    const LABEL: &str = "wood";
    let repeat = [2.0, 2.0];
    let Some(mut canvas) = canvas_or_warn(LABEL, size, size) else {
        return Texture::blank(LABEL, TextureKind::Color, WrapMode::Repeat, repeat);
    };

    let s = size as f32;
    canvas.fill([0x8b, 0x45, 0x13]);
    for _ in 0..strokes {
        let alpha = 0.1 + rng.next_f32() * 0.2;
        let width = 1.0 + rng.next_f32() * 2.0;
        let y0 = rng.next_f32() * s;
        let y1 = rng.next_f32() * s;
        canvas.stroke_line(Vec2::new(0.0, y0), Vec2::new(s, y1), width, [139, 69, 19], alpha);
    }

    canvas.into_texture(LABEL, TextureKind::Color, WrapMode::Repeat, repeat)
}

/// Neutral normal map with faint grain ridges.
pub fn wood_normal_map(rng: &mut SceneRng, size: u32, strokes: u32) -> Texture {
    const LABEL: &str = "wood-normal";
    let repeat = [2.0, 2.0];
    let Some(mut canvas) = canvas_or_warn(LABEL, size, size) else {
        return Texture::blank(LABEL, TextureKind::Normal, WrapMode::Repeat, repeat);
    };

    let s = size as f32;
    canvas.fill([0x80, 0x80, 0xff]);
    for _ in 0..strokes {
        let blue = (200.0 + rng.next_f32() * 55.0) as u8;
        let width = 2.0 + rng.next_f32() * 3.0;
        let y0 = rng.next_f32() * s;
        let y1 = rng.next_f32() * s;
        canvas.stroke_line(Vec2::new(0.0, y0), Vec2::new(s, y1), width, [128, 128, blue], 0.3);
    }

    canvas.into_texture(LABEL, TextureKind::Normal, WrapMode::Repeat, repeat)
}

/// Syntax category used to colour a code line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeToken {
    Plain,
    Comment,
    Keyword,
    String,
}

impl CodeToken {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            CodeToken::Plain => [0x58, 0xa6, 0xff],
            CodeToken::Comment => [0x7c, 0x3a, 0xed],
            CodeToken::Keyword => [0xf9, 0x73, 0x16],
            CodeToken::String => [0x10, 0xb9, 0x81],
        }
    }
}

/// Whole-line classification; later rules override earlier ones.
pub fn classify_code_line(line: &str) -> CodeToken {
    let mut token = CodeToken::Plain;
    if line.contains("//") {
        token = CodeToken::Comment;
    }
    if line.contains("function") || line.contains("const") {
        token = CodeToken::Keyword;
    }
    if line.contains('"') {
        token = CodeToken::String;
    }
    token
}

/// Dark editor background with coloured code lines.
pub fn code_editor(size: u32, lines: &[&str]) -> Texture {
    const LABEL: &str = "code-editor";
    let repeat = [1.0, 1.0];
    let Some(mut canvas) = canvas_or_warn(LABEL, size, size) else {
        return Texture::blank(LABEL, TextureKind::Color, WrapMode::Repeat, repeat);
    };

    // Layout is specified for a 512 canvas; scale it with the requested size.
    let k = size as f32 / STANDARD_SIZE as f32;
    canvas.fill([0x0d, 0x11, 0x17]);
    for (i, line) in lines.iter().enumerate() {
        let rgb = classify_code_line(line).rgb();
        canvas.fill_text(line, 20.0 * k, (40.0 + i as f32 * 20.0) * k, 12.0 * k, rgb, 1.0);
    }

    canvas.into_texture(LABEL, TextureKind::Color, WrapMode::Repeat, repeat)
}

/// Dark floor tile: square grid plus a staggered hexagon lattice.
pub fn floor_pattern(size: u32) -> Texture {
    const LABEL: &str = "floor-pattern";
    let repeat = [4.0, 4.0];
    let Some(mut canvas) = canvas_or_warn(LABEL, size, size) else {
        return Texture::blank(LABEL, TextureKind::Color, WrapMode::Repeat, repeat);
    };

    let s = size as f32;
    canvas.fill([0x1a, 0x1a, 0x2e]);

    let grid = [0x2a, 0x2a, 0x3e];
    let mut i = 0.0;
    while i < s {
        canvas.stroke_line(Vec2::new(i, 0.0), Vec2::new(i, s), 1.0, grid, 1.0);
        canvas.stroke_line(Vec2::new(0.0, i), Vec2::new(s, i), 1.0, grid, 1.0);
        i += 32.0;
    }

    // 64px cells, odd columns shifted half a cell; the lattice tiles at any multiple of 64.
    let cell = 64.0;
    let radius = 20.0;
    let hex = [0x3c, 0x3c, 0x64];
    let cols = (s / cell).ceil() as i32;
    let rows = (s / cell).ceil() as i32;
    for col in 0..=cols {
        for row in -1..=rows {
            let offset = if col % 2 == 1 { cell * 0.5 } else { 0.0 };
            let center = Vec2::new(col as f32 * cell, row as f32 * cell + offset);
            let corners: Vec<Vec2> = (0..6)
                .map(|k| {
                    let angle = std::f32::consts::FRAC_PI_3 * k as f32;
                    center + Vec2::new(angle.cos(), angle.sin()) * radius
                })
                .collect();
            canvas.stroke_polygon(&corners, 1.5, hex, 0.5);
        }
    }

    canvas.into_texture(LABEL, TextureKind::Color, WrapMode::Repeat, repeat)
}

/// Blue-violet gradient wall with gold hourglass stamps and faint vertical streaks.
pub fn wall_pattern(rng: &mut SceneRng, size: u32) -> Texture {
    const LABEL: &str = "wall";
    let repeat = [2.0, 1.0];
    let Some(mut canvas) = canvas_or_warn(LABEL, size, size) else {
        return Texture::blank(LABEL, TextureKind::Color, WrapMode::Repeat, repeat);
    };

    let k = size as f32 / WALL_SIZE as f32;
    let s = size as f32;
    canvas.fill_vertical_gradient(&[
        (0.0, [0x5a, 0x5a, 0x9a]),
        (0.5, [0x4a, 0x4a, 0x8a]),
        (1.0, [0x3a, 0x3a, 0x7a]),
    ]);

    for i in 0..15u32 {
        let x = ((i % 5) as f32 * 200.0 + 100.0) * k;
        let y = ((i / 5) as f32 * 250.0 + 150.0) * k;
        let stamp = (80.0 + rng.next_f32() * 40.0) * k;
        draw_hourglass(&mut canvas, x, y, stamp);
    }

    for _ in 0..10 {
        let x0 = rng.next_f32() * s;
        let x1 = rng.next_f32() * s;
        canvas.stroke_line(Vec2::new(x0, 0.0), Vec2::new(x1, s), 2.0, [255, 255, 255], 0.1);
    }

    canvas.into_texture(LABEL, TextureKind::Color, WrapMode::Repeat, repeat)
}

/// Hourglass glyph occupying a `size` em box whose baseline starts at `(x, baseline)`.
fn draw_hourglass(canvas: &mut Canvas, x: f32, baseline: f32, size: f32) {
    let gold = [255, 215, 0];
    let alpha = 0.3;
    let cx = x + size * 0.5;
    let top = baseline - size * 0.9;
    let bottom = baseline - size * 0.1;
    let mid = (top + bottom) * 0.5;
    let half_w = size * 0.3;
    let cap = size * 0.06;

    canvas.fill_triangle(
        Vec2::new(cx - half_w, top + cap),
        Vec2::new(cx + half_w, top + cap),
        Vec2::new(cx, mid),
        gold,
        alpha,
    );
    canvas.fill_triangle(
        Vec2::new(cx, mid),
        Vec2::new(cx + half_w, bottom - cap),
        Vec2::new(cx - half_w, bottom - cap),
        gold,
        alpha,
    );
    // frame bars
    let bar = half_w * 1.2;
    for y in [top + cap * 0.5, bottom - cap * 0.5] {
        canvas.stroke_line(Vec2::new(cx - bar, y), Vec2::new(cx + bar, y), cap, gold, alpha);
    }
}

// ============================================================================
// Texture set
// ============================================================================

/// Every texture a mounted scene uses, generated once at mount.
#[derive(Debug, Clone)]
pub struct SceneTextures {
    pub wood: Arc<Texture>,
    pub wood_normal: Arc<Texture>,
    pub code: Arc<Texture>,
    pub floor_pattern: Arc<Texture>,
    pub floor_wood: Arc<Texture>,
    pub wall: Arc<Texture>,
}

impl SceneTextures {
    pub fn generate(rng: &mut SceneRng) -> Self {
        let wood = Arc::new(wood_grain(rng, STANDARD_SIZE, 50));
        let wood_normal = Arc::new(wood_normal_map(rng, STANDARD_SIZE, 30));
        let code = Arc::new(code_editor(STANDARD_SIZE, &CODE_LINES));
        let floor_pattern = Arc::new(floor_pattern(STANDARD_SIZE));
        let floor_wood = Arc::new(wood_grain(rng, STANDARD_SIZE, 50).with_repeat(8.0, 8.0));
        let wall = Arc::new(wall_pattern(rng, WALL_SIZE));

        log::debug!("generated 6 procedural textures");

        Self {
            wood,
            wood_normal,
            code,
            floor_pattern,
            floor_wood,
            wall,
        }
    }

    pub fn all(&self) -> [&Arc<Texture>; 6] {
        [
            &self.wood,
            &self.wood_normal,
            &self.code,
            &self.floor_pattern,
            &self.floor_wood,
            &self.wall,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_rejects_bad_sizes() {
        assert!(Canvas::new(0, 512).is_none());
        assert!(Canvas::new(MAX_TEXTURE_SIZE + 1, 16).is_none());
        assert!(Canvas::new(16, 16).is_some());
    }

    #[test]
    fn test_wood_grain_structure() {
        let mut rng = SceneRng::new(3);
        let tex = wood_grain(&mut rng, 512, 50);
        assert_eq!((tex.width(), tex.height()), (512, 512));
        assert_eq!(tex.wrap, WrapMode::Repeat);
        assert_eq!(tex.repeat, [2.0, 2.0]);
        assert_eq!(tex.pixels().len(), 512 * 512 * 4);
    }

    #[test]
    fn test_wood_grain_same_structure_different_seed() {
        let a = wood_grain(&mut SceneRng::new(1), 128, 20);
        let b = wood_grain(&mut SceneRng::new(2), 128, 20);
        assert_eq!((a.width(), a.height(), a.wrap, a.repeat), (b.width(), b.height(), b.wrap, b.repeat));
    }

    #[test]
    fn test_zero_size_degrades_to_blank() {
        let tex = wood_grain(&mut SceneRng::new(1), 0, 50);
        assert!(tex.is_blank());
        assert_eq!(tex.wrap, WrapMode::Repeat);
        assert_eq!(tex.repeat, [2.0, 2.0]);
    }

    #[test]
    fn test_normal_map_stays_bluish() {
        let tex = wood_normal_map(&mut SceneRng::new(9), 64, 30);
        assert_eq!(tex.kind, TextureKind::Normal);
        for p in tex.image().pixels() {
            assert!(p.0[2] >= 200, "blue channel dipped to {}", p.0[2]);
        }
    }

    #[test]
    fn test_classify_code_line_later_rules_win() {
        assert_eq!(classify_code_line("return x;"), CodeToken::Plain);
        assert_eq!(classify_code_line("// Learning System"), CodeToken::Comment);
        assert_eq!(classify_code_line("function learn() {"), CodeToken::Keyword);
        assert_eq!(classify_code_line("  const s = \"a\";"), CodeToken::String);
    }

    #[test]
    fn test_code_editor_draws_glyphs() {
        let tex = code_editor(512, &CODE_LINES);
        let background = Rgba([0x0d, 0x11, 0x17, 255]);
        let painted = tex.image().pixels().filter(|p| **p != background).count();
        assert!(painted > 500, "only {} painted pixels", painted);
        assert_eq!(tex.repeat, [1.0, 1.0]);
        assert_eq!(tex.wrap, WrapMode::Repeat);
    }

    #[test]
    fn test_code_lines_are_fixed() {
        assert_eq!(CODE_LINES.len(), 12);
        assert_eq!(CODE_LINES[0], "// Learning System");
        assert_eq!(CODE_LINES[6], "");
        assert_eq!(CODE_LINES[8], "  name: \"学习者\",");
        assert_eq!(CODE_LINES[10], "  goals: [\"React\", \"TypeScript\"]");
        assert_eq!(classify_code_line(CODE_LINES[8]), CodeToken::String);
    }

    #[test]
    fn test_glyph_lookup_falls_back_to_box() {
        assert_eq!(glyph_for_char('学'), MISSING_GLYPH);
        assert_ne!(glyph_for_char('A'), MISSING_GLYPH);
        assert_ne!(glyph_for_char('é'), MISSING_GLYPH);
        assert_eq!(glyph_for_char(' '), [0; 8]);
    }

    #[test]
    fn test_ideographs_still_paint_a_cell() {
        let tex = code_editor(512, &CODE_LINES);
        let string_rgb = CodeToken::String.rgb();
        // Tenth column of the ninth line holds the first ideograph.
        let painted = (188..200)
            .flat_map(|y| (128..140).map(move |x| (x, y)))
            .filter(|&(x, y)| tex.image().get_pixel(x, y).0[..3] == string_rgb)
            .count();
        assert!(painted > 0);
    }

    #[test]
    fn test_floor_pattern_grid_lines() {
        let tex = floor_pattern(512);
        assert_eq!(tex.repeat, [4.0, 4.0]);
        let corner = tex.image().get_pixel(0, 100);
        assert_ne!(corner.0[..3], [0x1a, 0x1a, 0x2e]);
    }

    #[test]
    fn test_wall_gradient_darkens_downwards() {
        let tex = wall_pattern(&mut SceneRng::new(5), 256);
        assert_eq!(tex.repeat, [2.0, 1.0]);
        // column 0 row 0 vs last row; streaks are faint enough not to flip the order
        let top = tex.image().get_pixel(0, 0).0[2];
        let bottom = tex.image().get_pixel(0, 255).0[2];
        assert!(top > bottom);
    }

    #[test]
    fn test_stroke_line_blends_partially() {
        let mut canvas = Canvas::new(8, 8).unwrap();
        canvas.fill([0, 0, 0]);
        canvas.stroke_line(Vec2::new(0.0, 4.0), Vec2::new(8.0, 4.0), 2.0, [255, 255, 255], 0.5);
        let tex = canvas.into_texture("t", TextureKind::Color, WrapMode::Repeat, [1.0, 1.0]);
        let v = tex.image().get_pixel(4, 4).0[0];
        assert!((120..=135).contains(&v), "got {}", v);
        assert_eq!(tex.image().get_pixel(4, 0).0[0], 0);
    }

    #[test]
    fn test_scene_textures_generates_six() {
        let set = SceneTextures::generate(&mut SceneRng::new(11));
        assert_eq!(set.all().len(), 6);
        assert_eq!(set.floor_wood.repeat, [8.0, 8.0]);
        assert_eq!(set.wall.width(), WALL_SIZE);
    }
}
