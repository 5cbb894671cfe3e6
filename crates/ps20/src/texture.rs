//! Texture storage and nearest-neighbour sampling.
//!
//! Texels are packed RGBA8 with red in the low byte.

use std::sync::Arc;

use tracing::trace;

use crate::vec4::Vec4;

/// Packs a color as `R | G << 8 | B << 16 | A << 24`, each lane clamped to `[0, 1]` and rounded.
pub fn pack_color(color: Vec4) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    channel(color.x) | channel(color.y) << 8 | channel(color.z) << 16 | channel(color.w) << 24
}

pub fn unpack_color(texel: u32) -> Vec4 {
    let channel = |shift: u32| ((texel >> shift) & 0xFF) as f32 / 255.0;
    Vec4::new(channel(0), channel(8), channel(16), channel(24))
}

pub trait Texture {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn read(&self, x: u32, y: u32) -> u32;
    fn write(&mut self, x: u32, y: u32, texel: u32);

    fn read_color(&self, x: u32, y: u32) -> Vec4 {
        unpack_color(self.read(x, y))
    }

    fn write_color(&mut self, x: u32, y: u32, color: Vec4) {
        let texel = pack_color(color);
        trace!(x, y, %color, texel = format_args!("{texel:08x}"), "store");
        self.write(x, y, texel);
    }
}

/// Row-major in-memory texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaTexture {
    width: u32,
    height: u32,
    texels: Vec<u32>,
}

impl RgbaTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: u32, height: u32, texel: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![texel; width as usize * height as usize],
        }
    }

    /// Returns `None` when `texels.len() != width * height`.
    pub fn from_texels(width: u32, height: u32, texels: Vec<u32>) -> Option<Self> {
        (texels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            texels,
        })
    }

    pub fn texels(&self) -> &[u32] {
        &self.texels
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }
}

impl Texture for RgbaTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    /// Out-of-range reads return transparent black.
    fn read(&self, x: u32, y: u32) -> u32 {
        self.offset(x, y).map_or(0, |i| self.texels[i])
    }

    /// Out-of-range writes are dropped.
    fn write(&mut self, x: u32, y: u32, texel: u32) {
        if let Some(i) = self.offset(x, y) {
            self.texels[i] = texel;
        }
    }
}

/// Upper bound used when clamping the sampled row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RowClamp {
    #[default]
    Height,
    /// Clamp rows against the texture width. Only matches the texture bounds for square
    /// textures; kept to reproduce output rendered by older tooling.
    LegacyWidth,
}

pub type SharedTexture = Arc<dyn Texture + Send + Sync>;

#[derive(Clone)]
pub struct Sampler {
    texture: SharedTexture,
    row_clamp: RowClamp,
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("width", &self.texture.width())
            .field("height", &self.texture.height())
            .field("row_clamp", &self.row_clamp)
            .finish()
    }
}

fn clamp_texel(v: f32, size: u32, max: u32) -> u32 {
    let i = (v * size as f32) as i64;
    i.clamp(0, i64::from(max.max(1)) - 1) as u32
}

impl Sampler {
    pub fn new(texture: impl Texture + Send + Sync + 'static) -> Self {
        Self::from_shared(Arc::new(texture))
    }

    pub fn from_shared(texture: SharedTexture) -> Self {
        Self {
            texture,
            row_clamp: RowClamp::default(),
        }
    }

    pub fn with_row_clamp(mut self, row_clamp: RowClamp) -> Self {
        self.row_clamp = row_clamp;
        self
    }

    pub fn row_clamp(&self) -> RowClamp {
        self.row_clamp
    }

    pub fn texture(&self) -> &(dyn Texture + Send + Sync) {
        &*self.texture
    }

    /// Nearest-neighbour lookup at `coord.xy`; coordinates are clamped to the texture edge.
    pub fn sample(&self, coord: Vec4) -> Vec4 {
        let (width, height) = (self.texture.width(), self.texture.height());
        if width == 0 || height == 0 {
            return Vec4::ZERO;
        }
        let row_max = match self.row_clamp {
            RowClamp::Height => height,
            RowClamp::LegacyWidth => width,
        };
        let x = clamp_texel(coord.x, width, width);
        let y = clamp_texel(coord.y, height, row_max);
        let color = self.texture.read_color(x, y);
        trace!(%coord, x, y, %color, "sample");
        color
    }
}
