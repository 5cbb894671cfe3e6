//! Decoded instruction set.
//!
//! The list is flat: `ps_2_0` programs handled here carry no flow control, so every pass over a
//! program is a single `match` per instruction.

use std::fmt;

use crate::register::{DestRegister, RegisterKind, SourceRegister};
use crate::vec4::Vec4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Max,
    Min,
    Dp3,
    Dp4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOpKind {
    Rcp,
    Frc,
    Rsq,
    Abs,
    Exp,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TernaryOpKind {
    Mad,
    Cmp,
    SinCos,
    Lrp,
    Dp2Add,
}

impl BinaryOpKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Max => "max",
            Self::Min => "min",
            Self::Dp3 => "dp3",
            Self::Dp4 => "dp4",
        }
    }
}

impl UnaryOpKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Rcp => "rcp",
            Self::Frc => "frc",
            Self::Rsq => "rsq",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Log => "log",
        }
    }
}

impl TernaryOpKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Mad => "mad",
            Self::Cmp => "cmp",
            Self::SinCos => "sincos",
            Self::Lrp => "lrp",
            Self::Dp2Add => "dp2add",
        }
    }
}

/// Sampler dimension carried by a `dcl` token (`D3DSAMPLER_TEXTURE_TYPE`, bits 27..30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Unknown,
    Text2d,
    Cube,
    Volume,
}

impl TextureKind {
    pub fn from_dcl_token(token: u32) -> Self {
        match (token >> 27) & 0xF {
            2 => Self::Text2d,
            3 => Self::Cube,
            4 => Self::Volume,
            _ => Self::Unknown,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Text2d => "_2d",
            Self::Cube => "_cube",
            Self::Volume => "_volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Nop,
    /// `def c#, x, y, z, w`
    SetConst { index: u32, value: Vec4 },
    /// `dcl`; declares an input texture coordinate or a sampler.
    DefVar {
        texture_kind: TextureKind,
        dest: DestRegister,
    },
    TexLoad {
        dest: DestRegister,
        sampler: SourceRegister,
        coord: SourceRegister,
    },
    Mov {
        dest: DestRegister,
        src: SourceRegister,
    },
    Binary {
        op: BinaryOpKind,
        dest: DestRegister,
        a: SourceRegister,
        b: SourceRegister,
    },
    Unary {
        op: UnaryOpKind,
        dest: DestRegister,
        src: SourceRegister,
    },
    Ternary {
        op: TernaryOpKind,
        dest: DestRegister,
        a: SourceRegister,
        b: SourceRegister,
        c: SourceRegister,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Op,
    /// Predicate register; decoded but never evaluated.
    pub predicate: Option<SourceRegister>,
}

impl Instruction {
    pub const fn new(op: Op) -> Self {
        Self {
            op,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: SourceRegister) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Register written by an arithmetic or texture instruction.
    pub fn dest(&self) -> Option<&DestRegister> {
        match &self.op {
            Op::TexLoad { dest, .. }
            | Op::Mov { dest, .. }
            | Op::Binary { dest, .. }
            | Op::Unary { dest, .. }
            | Op::Ternary { dest, .. } => Some(dest),
            Op::Nop | Op::SetConst { .. } | Op::DefVar { .. } => None,
        }
    }

    /// Source operands in encoding order (the sampler of a `texld` comes after its coordinate).
    pub fn sources(&self) -> impl Iterator<Item = SourceRegister> {
        let srcs = match self.op {
            Op::Nop | Op::SetConst { .. } | Op::DefVar { .. } => [None, None, None],
            Op::TexLoad { sampler, coord, .. } => [Some(coord), Some(sampler), None],
            Op::Mov { src, .. } | Op::Unary { src, .. } => [Some(src), None, None],
            Op::Binary { a, b, .. } => [Some(a), Some(b), None],
            Op::Ternary { a, b, c, .. } => [Some(a), Some(b), Some(c)],
        };
        srcs.into_iter().flatten()
    }
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        Self::new(op)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pred) = &self.predicate {
            write!(f, "({pred}) ")?;
        }
        match &self.op {
            Op::Nop => f.write_str("nop"),
            Op::SetConst { index, value } => write!(
                f,
                "def c{index}, {}, {}, {}, {}",
                value.x, value.y, value.z, value.w
            ),
            Op::DefVar { texture_kind, dest } => {
                if dest.kind() == RegisterKind::SamplerState {
                    write!(f, "dcl{} {dest}", texture_kind.suffix())
                } else {
                    write!(f, "dcl {dest}")
                }
            }
            Op::TexLoad {
                dest,
                sampler,
                coord,
            } => write!(f, "texld {dest}, {coord}, {sampler}"),
            Op::Mov { dest, src } => write!(f, "mov {dest}, {src}"),
            Op::Binary { op, dest, a, b } => write!(f, "{} {dest}, {a}, {b}", op.mnemonic()),
            Op::Unary { op, dest, src } => write!(f, "{} {dest}, {src}", op.mnemonic()),
            Op::Ternary { op, dest, a, b, c } => {
                write!(f, "{} {dest}, {a}, {b}, {c}", op.mnemonic())
            }
        }
    }
}
