//! Output-texture traversal.
//!
//! Columns are the outer loop and rows the inner loop. The texture coordinate starts at the
//! centre of the first texel and is advanced by accumulation (`u += 1/width`, `v += 1/height`)
//! rather than recomputed, so every backend that walks with this iterator sees bit-identical
//! coordinates.

use crate::vec4::Vec4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub u: f32,
    pub v: f32,
}

impl Pixel {
    /// Texture coordinate register value, `(u, v, 0, 0)`.
    pub fn coord(&self) -> Vec4 {
        Vec4::from((self.u, self.v))
    }
}

#[derive(Debug, Clone)]
pub struct PixelWalk {
    width: u32,
    height: u32,
    wq: f32,
    hq: f32,
    x: u32,
    y: u32,
    u: f32,
    v: f32,
}

impl PixelWalk {
    pub fn new(width: u32, height: u32) -> Self {
        let wq = 1.0 / width as f32;
        let hq = 1.0 / height as f32;
        Self {
            width,
            height,
            wq,
            hq,
            // An empty texture produces no pixels.
            x: if height == 0 { width } else { 0 },
            y: 0,
            u: wq / 2.0,
            v: hq / 2.0,
        }
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for PixelWalk {
    type Item = Pixel;

    fn next(&mut self) -> Option<Pixel> {
        if self.x >= self.width {
            return None;
        }
        let pixel = Pixel {
            x: self.x,
            y: self.y,
            u: self.u,
            v: self.v,
        };
        self.y += 1;
        self.v += self.hq;
        if self.y == self.height {
            self.y = 0;
            self.v = self.hq / 2.0;
            self.x += 1;
            self.u += self.wq;
        }
        Some(pixel)
    }
}
