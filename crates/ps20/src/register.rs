//! Register parameter tokens.
//!
//! Source and destination parameters share the register-number and register-type fields:
//!
//! ```text
//!  31  30..28   27..24    23..16          13   12..11   10..0
//!  1   type lo  srcmod    swizzle / mask       type hi  number
//! ```
//!
//! Destination tokens reuse bits 16..19 as the write mask and bits 20..23 as result modifier
//! flags (bit 21 partial precision, bit 22 centroid).

use std::fmt;

use bitflags::bitflags;

use crate::error::RegisterDecodeError;

const REGNUM_MASK: u32 = 0x0000_03FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterKind {
    Temp,
    Input,
    Constant,
    Texture,
    ConstantInt,
    ColorOut,
    DepthOut,
    SamplerState,
    ConstantBool,
    LoopCounter,
    HalfTemp,
    Misc,
    Label,
    Predicate,
}

impl RegisterKind {
    /// Maps the 5-bit register type code onto a kind plus the offset folded into the register
    /// number. Codes 11..=13 address the upper constant banks.
    pub fn from_code(code: u8) -> Result<(Self, u32), RegisterDecodeError> {
        Ok(match code {
            0 => (Self::Temp, 0),
            1 => (Self::Input, 0),
            2 => (Self::Constant, 0),
            3 => (Self::Texture, 0),
            4..=6 => return Err(RegisterDecodeError::ReservedKind(code)),
            7 => (Self::ConstantInt, 0),
            8 => (Self::ColorOut, 0),
            9 => (Self::DepthOut, 0),
            10 => (Self::SamplerState, 0),
            11 => (Self::Constant, 2048),
            12 => (Self::Constant, 4096),
            13 => (Self::Constant, 6144),
            14 => (Self::ConstantBool, 0),
            15 => (Self::LoopCounter, 0),
            16 => (Self::HalfTemp, 0),
            17 => (Self::Misc, 0),
            18 => (Self::Label, 0),
            19 => (Self::Predicate, 0),
            other => return Err(RegisterDecodeError::InvalidKind(other)),
        })
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Temp => "r",
            Self::Input => "v",
            Self::Constant => "c",
            Self::Texture => "t",
            Self::ConstantInt => "i",
            Self::ColorOut => "oC",
            Self::DepthOut => "oDepth",
            Self::SamplerState => "s",
            Self::ConstantBool => "b",
            Self::LoopCounter => "aL",
            Self::HalfTemp => "h",
            Self::Misc => "misc",
            Self::Label => "l",
            Self::Predicate => "p",
        }
    }
}

/// Register type code split across bits 28..30 (low three bits) and 11..12 (high two bits).
fn kind_code(token: u32) -> u8 {
    (((token >> 28) & 0x7) | (((token >> 11) & 0x3) << 3)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub kind: RegisterKind,
    pub number: u32,
}

impl Register {
    pub const fn new(kind: RegisterKind, number: u32) -> Self {
        Self { kind, number }
    }

    pub fn decode(token: u32) -> Result<Self, RegisterDecodeError> {
        let (kind, bank_offset) = RegisterKind::from_code(kind_code(token))?;
        Ok(Self {
            kind,
            number: (token & REGNUM_MASK) + bank_offset,
        })
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RegisterKind::DepthOut | RegisterKind::LoopCounter => {
                f.write_str(self.kind.short_name())
            }
            _ => write!(f, "{}{}", self.kind.short_name(), self.number),
        }
    }
}

/// Four 2-bit lane selectors, lane x in bits 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub u8);

impl Swizzle {
    pub const IDENTITY: Swizzle = make_swizzle(0, 1, 2, 3);

    pub fn selectors(self) -> [u8; 4] {
        let sel = |shift: u8| (self.0 >> shift) & 0b11;
        [sel(0), sel(2), sel(4), sel(6)]
    }

    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }
}

impl Default for Swizzle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sel in self.selectors() {
            f.write_str(["x", "y", "z", "w"][usize::from(sel)])?;
        }
        Ok(())
    }
}

/// Builds a swizzle byte from four lane indices (each `0..=3`).
pub const fn make_swizzle(r: u8, g: u8, b: u8, a: u8) -> Swizzle {
    Swizzle((r & 3) | ((g & 3) << 2) | ((b & 3) << 4) | ((a & 3) << 6))
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct WriteMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

impl WriteMask {
    pub const RG: WriteMask = WriteMask::R.union(WriteMask::G);

    pub fn is_full(self) -> bool {
        self == Self::all()
    }
}

impl Default for WriteMask {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, name) in [
            (Self::R, "x"),
            (Self::G, "y"),
            (Self::B, "z"),
            (Self::A, "w"),
        ] {
            if self.contains(bit) {
                f.write_str(name)?;
            }
        }
        Ok(())
    }
}

pub fn make_write_mask(r: bool, g: bool, b: bool, a: bool) -> WriteMask {
    let mut mask = WriteMask::empty();
    mask.set(WriteMask::R, r);
    mask.set(WriteMask::G, g);
    mask.set(WriteMask::B, b);
    mask.set(WriteMask::A, a);
    mask
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SrcModifier {
    None,
    Negate,
    Bias,
    BiasAndNegate,
    Sign,
    SignAndNegate,
    Complement,
    Double,
    DoubleAndNegate,
    DivideByZ,
    DivideByW,
    Abs,
    AbsAndNegate,
    Not,
}

impl SrcModifier {
    pub fn from_raw(raw: u8) -> Result<Self, RegisterDecodeError> {
        Ok(match raw {
            0x0 => Self::None,
            0x1 => Self::Negate,
            0x2 => Self::Bias,
            0x3 => Self::BiasAndNegate,
            0x4 => Self::Sign,
            0x5 => Self::SignAndNegate,
            0x6 => Self::Complement,
            0x7 => Self::Double,
            0x8 => Self::DoubleAndNegate,
            0x9 => Self::DivideByZ,
            0xA => Self::DivideByW,
            0xB => Self::Abs,
            0xC => Self::AbsAndNegate,
            0xD => Self::Not,
            other => return Err(RegisterDecodeError::InvalidModifier(other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRegister {
    pub reg: Register,
    pub swizzle: Swizzle,
    pub modifier: SrcModifier,
}

impl SourceRegister {
    pub const fn new(kind: RegisterKind, number: u32) -> Self {
        Self {
            reg: Register::new(kind, number),
            swizzle: Swizzle::IDENTITY,
            modifier: SrcModifier::None,
        }
    }

    pub fn decode(token: u32) -> Result<Self, RegisterDecodeError> {
        let reg = Register::decode(token)?;
        let modifier = SrcModifier::from_raw(((token >> 24) & 0xF) as u8)?;
        Ok(Self {
            reg,
            swizzle: Swizzle(((token >> 16) & 0xFF) as u8),
            modifier,
        })
    }

    pub fn with_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.swizzle = swizzle;
        self
    }

    pub fn with_modifier(mut self, modifier: SrcModifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn kind(&self) -> RegisterKind {
        self.reg.kind
    }

    pub fn number(&self) -> u32 {
        self.reg.number
    }
}

impl fmt::Display for SourceRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, suffix) = match self.modifier {
            SrcModifier::None => ("", ""),
            SrcModifier::Negate => ("-", ""),
            SrcModifier::Bias => ("", "_bias"),
            SrcModifier::BiasAndNegate => ("-", "_bias"),
            SrcModifier::Sign => ("", "_bx2"),
            SrcModifier::SignAndNegate => ("-", "_bx2"),
            SrcModifier::Complement => ("1-", ""),
            SrcModifier::Double => ("", "_x2"),
            SrcModifier::DoubleAndNegate => ("-", "_x2"),
            SrcModifier::DivideByZ => ("", "_dz"),
            SrcModifier::DivideByW => ("", "_dw"),
            SrcModifier::Abs => ("", "_abs"),
            SrcModifier::AbsAndNegate => ("-", "_abs"),
            SrcModifier::Not => ("!", ""),
        };
        write!(f, "{prefix}{}{suffix}", self.reg)?;
        if !self.swizzle.is_identity() {
            write!(f, ".{}", self.swizzle)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestRegister {
    pub reg: Register,
    pub write_mask: WriteMask,
    /// `_pp`; decoded but not honoured, all math is full precision.
    pub partial_precision: bool,
    /// `_centroid`; decoded but not honoured.
    pub centroid: bool,
}

impl DestRegister {
    pub const fn new(kind: RegisterKind, number: u32) -> Self {
        Self {
            reg: Register::new(kind, number),
            write_mask: WriteMask::all(),
            partial_precision: false,
            centroid: false,
        }
    }

    pub fn decode(token: u32) -> Result<Self, RegisterDecodeError> {
        let reg = Register::decode(token)?;
        Ok(Self {
            reg,
            write_mask: WriteMask::from_bits_truncate(((token >> 16) & 0xF) as u8),
            partial_precision: token & (1 << 21) != 0,
            centroid: token & (1 << 22) != 0,
        })
    }

    pub fn with_mask(mut self, write_mask: WriteMask) -> Self {
        self.write_mask = write_mask;
        self
    }

    pub fn kind(&self) -> RegisterKind {
        self.reg.kind
    }

    pub fn number(&self) -> u32 {
        self.reg.number
    }
}

impl fmt::Display for DestRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reg)?;
        if !self.write_mask.is_full() {
            write!(f, ".{}", self.write_mask)?;
        }
        if self.partial_precision {
            f.write_str("_pp")?;
        }
        if self.centroid {
            f.write_str("_centroid")?;
        }
        Ok(())
    }
}
