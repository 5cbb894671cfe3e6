//! Four-lane `f32` value type used for every shader register.
//!
//! Lane arithmetic is scalar per lane. Masked stores and `cmp` selects operate on the raw lane
//! bits (`and`/`or`/`and_not`), the same way an SSE implementation would, so a partial write
//! never rounds or canonicalizes the lanes it keeps.

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

const ALL_BITS: u32 = u32::MAX;

impl Vec4 {
    pub const ZERO: Vec4 = Vec4::splat(0.0);
    pub const ONE: Vec4 = Vec4::splat(1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn from_array(lanes: [f32; 4]) -> Self {
        bytemuck::cast(lanes)
    }

    pub fn to_array(self) -> [f32; 4] {
        bytemuck::cast(self)
    }

    pub fn from_bits(bits: [u32; 4]) -> Self {
        bytemuck::cast(bits)
    }

    pub fn to_bits(self) -> [u32; 4] {
        bytemuck::cast(self)
    }

    /// Returns lane `index & 3` (0 = x/r, 3 = w/a).
    pub fn lane(self, index: usize) -> f32 {
        self.to_array()[index & 3]
    }

    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z), f(self.w))
    }

    pub fn zip_map(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self::new(
            f(self.x, other.x),
            f(self.y, other.y),
            f(self.z, other.z),
            f(self.w, other.w),
        )
    }

    /// Lane permutation: output lane `i` is input lane `selectors[i] & 3`.
    pub fn shuffle(self, selectors: [u8; 4]) -> Self {
        let lanes = self.to_array();
        Self::new(
            lanes[usize::from(selectors[0] & 3)],
            lanes[usize::from(selectors[1] & 3)],
            lanes[usize::from(selectors[2] & 3)],
            lanes[usize::from(selectors[3] & 3)],
        )
    }

    pub fn min(self, other: Self) -> Self {
        self.zip_map(other, f32::min)
    }

    pub fn max(self, other: Self) -> Self {
        self.zip_map(other, f32::max)
    }

    pub fn abs(self) -> Self {
        self.map(f32::abs)
    }

    fn zip_bits(self, other: Self, f: impl Fn(u32, u32) -> u32) -> Self {
        let a = self.to_bits();
        let b = other.to_bits();
        Self::from_bits([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }

    /// Bitwise `!self & other`, matching the SSE `andnps` operand order.
    pub fn and_not(self, other: Self) -> Self {
        self.zip_bits(other, |a, b| !a & b)
    }

    /// Lane mask with all bits set where `self < other`.
    pub fn lt_mask(self, other: Self) -> Self {
        let a = self.to_array();
        let b = other.to_array();
        let bit = |i: usize| if a[i] < b[i] { ALL_BITS } else { 0 };
        Self::from_bits([bit(0), bit(1), bit(2), bit(3)])
    }

    /// Lane mask with all bits set for every lane whose bit is set in `bits` (bit 0 = x).
    pub fn lane_mask(bits: u8) -> Self {
        let bit = |i: u8| if bits & (1 << i) != 0 { ALL_BITS } else { 0 };
        Self::from_bits([bit(0), bit(1), bit(2), bit(3)])
    }

    /// Branchless per-lane select: `(mask & on) | (!mask & off)`.
    pub fn blend(mask: Self, on: Self, off: Self) -> Self {
        (mask & on) | mask.and_not(off)
    }
}

impl Add for Vec4 {
    type Output = Vec4;

    fn add(self, rhs: Self) -> Self {
        self.zip_map(rhs, |a, b| a + b)
    }
}

impl Sub for Vec4 {
    type Output = Vec4;

    fn sub(self, rhs: Self) -> Self {
        self.zip_map(rhs, |a, b| a - b)
    }
}

impl Mul for Vec4 {
    type Output = Vec4;

    fn mul(self, rhs: Self) -> Self {
        self.zip_map(rhs, |a, b| a * b)
    }
}

impl Div for Vec4 {
    type Output = Vec4;

    fn div(self, rhs: Self) -> Self {
        self.zip_map(rhs, |a, b| a / b)
    }
}

impl Neg for Vec4 {
    type Output = Vec4;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl BitAnd for Vec4 {
    type Output = Vec4;

    fn bitand(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| a & b)
    }
}

impl BitOr for Vec4 {
    type Output = Vec4;

    fn bitor(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| a | b)
    }
}

impl From<f32> for Vec4 {
    fn from(v: f32) -> Self {
        Self::splat(v)
    }
}

impl From<[f32; 4]> for Vec4 {
    fn from(lanes: [f32; 4]) -> Self {
        Self::from_array(lanes)
    }
}

/// A coordinate pair; the remaining lanes are zero.
impl From<(f32, f32)> for Vec4 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }
}

impl From<Vec4> for [f32; 4] {
    fn from(v: Vec4) -> Self {
        v.to_array()
    }
}

impl fmt::Display for Vec4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}
