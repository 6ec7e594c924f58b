//! Pixel surfaces and collision masks.
//!
//! The terrain buffer is both what gets shown and what gets collided with:
//! every tick the map art is written into it, ships test their masks against
//! it, then shots, debris and ships are painted on top. Any pixel that is not
//! the background colour is solid.

use serde::{Deserialize, Serialize};

/// 24-bit colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const WHITE: Color = Color(255, 255, 255);

    pub const fn grey(level: u8) -> Self {
        Color(level, level, level)
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}

/// Binary opacity bitmap used for pixel-exact overlap tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: i32,
    height: i32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    /// Sample the mask. Anything outside the bitmap is "not set".
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.bits[i])
    }

    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if let Some(i) = self.index(x, y) {
            self.bits[i] = value;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }

    /// First set pixel shared by `self` and `other` placed at `offset`
    /// relative to `self`'s origin, in `self`'s coordinates.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(i32, i32)> {
        let (dx, dy) = offset;
        let shared = Rect::new(0, 0, self.width, self.height)
            .intersection(&Rect::new(dx, dy, other.width, other.height));
        if shared.is_empty() {
            return None;
        }

        for y in shared.y..shared.y + shared.height {
            for x in shared.x..shared.x + shared.width {
                if self.get(x, y) && other.get(x - dx, y - dy) {
                    return Some((x, y));
                }
            }
        }
        None
    }
}

/// Colour-keyed sprite. Pixels equal to the key are transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
    key: Color,
}

impl Sprite {
    pub fn new(width: i32, height: i32, key: Color) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            pixels: vec![key; (width * height) as usize],
            key,
        }
    }

    /// Build a sprite from row-major pixels. Returns `None` when the pixel
    /// count does not match the dimensions.
    pub fn from_pixels(width: i32, height: i32, pixels: Vec<Color>, key: Color) -> Option<Self> {
        if width < 0 || height < 0 || pixels.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
            key,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn key(&self) -> Color {
        self.key
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn set(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.pixels[(y * self.width + x) as usize] = color;
    }

    pub fn mask(&self) -> Mask {
        let mut mask = Mask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y).is_some_and(|c| c != self.key) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    /// Rotate counter-clockwise by `angle_degrees` (nearest neighbour).
    ///
    /// The result is sized to the bounding box of the rotated image, so it
    /// is larger than the source for angles that are not multiples of 90.
    pub fn rotated(&self, angle_degrees: f32) -> Sprite {
        let angle = angle_degrees.rem_euclid(360.0);
        if angle == 0.0 {
            return self.clone();
        }

        let (sin, cos) = angle.to_radians().sin_cos();
        let w = self.width as f32;
        let h = self.height as f32;
        let out_w = bounding_extent(w * cos.abs() + h * sin.abs());
        let out_h = bounding_extent(w * sin.abs() + h * cos.abs());

        let mut out = Sprite::new(out_w, out_h, self.key);
        let (src_cx, src_cy) = (w / 2.0, h / 2.0);
        let (dst_cx, dst_cy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);

        for oy in 0..out_h {
            for ox in 0..out_w {
                let rx = ox as f32 + 0.5 - dst_cx;
                let ry = oy as f32 + 0.5 - dst_cy;
                // inverse of a counter-clockwise turn with y pointing down
                let sx = rx * cos - ry * sin + src_cx;
                let sy = rx * sin + ry * cos + src_cy;
                if let Some(color) = self.get(sx.floor() as i32, sy.floor() as i32) {
                    out.set(ox, oy, color);
                }
            }
        }
        out
    }
}

fn bounding_extent(length: f32) -> i32 {
    // absorb float noise so that 90 degree turns keep the source size
    (length - 1e-3).ceil().max(1.0) as i32
}

/// Mutable pixel surface with a reserved background colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainBuffer {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
    background: Color,
}

impl TerrainBuffer {
    /// An empty surface filled with `background`.
    pub fn new(width: i32, height: i32, background: Color) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            pixels: vec![background; (width * height) as usize],
            background,
        }
    }

    /// Wrap externally loaded map art. Returns `None` on a size mismatch.
    pub fn from_pixels(
        width: i32,
        height: i32,
        pixels: Vec<Color>,
        background: Color,
    ) -> Option<Self> {
        if width < 0 || height < 0 || pixels.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
            background,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    /// Overwrite the whole surface with `map`. Sizes must match; a smaller
    /// map is copied into the top-left corner and the rest cleared.
    pub fn blit_map(&mut self, map: &TerrainBuffer) {
        if map.width == self.width && map.height == self.height {
            self.pixels.copy_from_slice(&map.pixels);
            return;
        }
        self.pixels.fill(self.background);
        for y in 0..map.height.min(self.height) {
            for x in 0..map.width.min(self.width) {
                if let (Some(dst), Some(src)) = (self.index(x, y), map.index(x, y)) {
                    self.pixels[dst] = map.pixels[src];
                }
            }
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Writes outside the surface are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// `Some(true)` for a non-background pixel, `None` outside the surface.
    pub fn is_solid(&self, x: i32, y: i32) -> Option<bool> {
        self.get_pixel(x, y).map(|c| c != self.background)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = rect.intersection(&self.bounds());
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Collision mask of `region`, clipped to the surface. Returns the mask
    /// and the origin of the clipped region.
    pub fn solid_mask(&self, region: Rect) -> (Mask, (i32, i32)) {
        let clipped = region.intersection(&self.bounds());
        let mut mask = Mask::new(clipped.width, clipped.height);
        for y in 0..clipped.height {
            for x in 0..clipped.width {
                if self.is_solid(clipped.x + x, clipped.y + y) == Some(true) {
                    mask.set(x, y, true);
                }
            }
        }
        (mask, (clipped.x, clipped.y))
    }

    /// Mask of the whole surface.
    pub fn full_mask(&self) -> Mask {
        self.solid_mask(self.bounds()).0
    }

    /// Composite a colour-keyed sprite with its top-left corner at (x, y).
    pub fn blit_sprite(&mut self, sprite: &Sprite, x: i32, y: i32) {
        for sy in 0..sprite.height() {
            for sx in 0..sprite.width() {
                if let Some(color) = sprite.get(sx, sy)
                    && color != sprite.key()
                {
                    self.set_pixel(x + sx, y + sy, color);
                }
            }
        }
    }
}
