//! Per-op math shared by the interpreter and the compiled kernel.
//!
//! Both backends call into these functions for every lane computation, so for a given program
//! they agree bit for bit; they differ only in how operands are located.

use std::collections::BTreeSet;

use crate::error::ShaderError;
use crate::instruction::{BinaryOpKind, Instruction, Op, TernaryOpKind, TextureKind, UnaryOpKind};
use crate::limits::MAX_REGISTER_SLOTS;
use crate::register::{
    DestRegister, Register, RegisterKind, SourceRegister, SrcModifier, WriteMask,
};
use crate::vec4::Vec4;

/// Failure raised while handling one instruction, before the instruction context is attached.
#[derive(Debug)]
pub(crate) enum Fault {
    Unsupported(String),
    Error(ShaderError),
}

impl From<ShaderError> for Fault {
    fn from(err: ShaderError) -> Self {
        Self::Error(err)
    }
}

impl Fault {
    pub fn at(self, index: usize, ins: &Instruction) -> ShaderError {
        match self {
            Self::Unsupported(reason) => ShaderError::unsupported(index, ins, reason),
            Self::Error(err) => err,
        }
    }
}

pub(crate) fn unsupported<T>(reason: impl Into<String>) -> Result<T, Fault> {
    Err(Fault::Unsupported(reason.into()))
}

/// Register-file slot of `reg`.
pub(crate) fn slot(reg: Register) -> Result<usize, Fault> {
    if reg.number >= MAX_REGISTER_SLOTS {
        return unsupported(format!("register {reg} is out of range"));
    }
    Ok(reg.number as usize)
}

/// Whether a source modifier negates. Modifiers other than negate are not implemented.
pub(crate) fn negates(modifier: SrcModifier) -> Result<bool, Fault> {
    match modifier {
        SrcModifier::None => Ok(false),
        SrcModifier::Negate => Ok(true),
        other => unsupported(format!("source modifier {other:?} is not supported")),
    }
}

/// Swizzle, then negate.
pub(crate) fn read_source(value: Vec4, selectors: [u8; 4], negate: bool) -> Vec4 {
    let v = value.shuffle(selectors);
    if negate {
        -v
    } else {
        v
    }
}

fn check_color_out(reg: Register) -> Result<usize, Fault> {
    if reg.number != 0 {
        return unsupported(format!("{reg} is not bound to an output texture"));
    }
    Ok(0)
}

pub(crate) fn check_dest(dest: &DestRegister) -> Result<usize, Fault> {
    match dest.kind() {
        RegisterKind::Temp => slot(dest.reg),
        RegisterKind::ColorOut => check_color_out(dest.reg),
        other => unsupported(format!("cannot write {other:?} registers")),
    }
}

/// Validates a source operand and returns its slot and whether it negates.
///
/// Only `t0` is ever written by the pixel walk and only `oC0` reaches the output texture, so
/// those are the only texture and color registers accepted.
pub(crate) fn check_source(src: &SourceRegister) -> Result<(usize, bool), Fault> {
    let slot = match src.kind() {
        RegisterKind::Temp | RegisterKind::Constant => slot(src.reg)?,
        RegisterKind::ColorOut => check_color_out(src.reg)?,
        RegisterKind::Texture if src.number() == 0 => 0,
        RegisterKind::Texture => {
            return unsupported(format!("texture coordinate {} is never set", src.reg))
        }
        other => return unsupported(format!("cannot read {other:?} registers")),
    };
    Ok((slot, negates(src.modifier)?))
}

pub(crate) fn check_sampler_operand(src: &SourceRegister) -> Result<u32, Fault> {
    if src.kind() != RegisterKind::SamplerState {
        return unsupported(format!("{} is not a sampler", src.reg));
    }
    slot(src.reg)?;
    Ok(src.number())
}

/// Tracks `def`/`dcl` declarations so each register is declared at most once.
#[derive(Debug, Default)]
pub(crate) struct Declarations {
    constants: BTreeSet<u32>,
    samplers: BTreeSet<u32>,
    texcoord: bool,
}

/// What a declaration binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Declared {
    Constant(u32),
    Sampler(u32),
    TexCoord,
    Ignored,
}

impl Declarations {
    pub fn declare(&mut self, op: &Op) -> Result<Declared, Fault> {
        match *op {
            Op::SetConst { index, .. } => {
                slot(Register::new(RegisterKind::Constant, index))?;
                if !self.constants.insert(index) {
                    return unsupported(format!("c{index} is defined more than once"));
                }
                Ok(Declared::Constant(index))
            }
            Op::DefVar { texture_kind, dest } => match dest.kind() {
                RegisterKind::SamplerState => {
                    slot(dest.reg)?;
                    if texture_kind != TextureKind::Text2d {
                        return unsupported(format!(
                            "{texture_kind:?} samplers are not supported"
                        ));
                    }
                    if !self.samplers.insert(dest.number()) {
                        return unsupported(format!("{} is declared more than once", dest.reg));
                    }
                    Ok(Declared::Sampler(dest.number()))
                }
                RegisterKind::Texture => {
                    if self.texcoord {
                        return unsupported("only one texture coordinate can be declared");
                    }
                    if dest.number() != 0 {
                        return unsupported(format!("{} is never set", dest.reg));
                    }
                    if dest.write_mask != WriteMask::RG {
                        return unsupported(format!(
                            "texture coordinate mask .{} is not supported",
                            dest.write_mask
                        ));
                    }
                    self.texcoord = true;
                    Ok(Declared::TexCoord)
                }
                _ => Ok(Declared::Ignored),
            },
            _ => Ok(Declared::Ignored),
        }
    }
}

/// Static operand checks for one instruction: destination kind, readable sources, modifiers,
/// and the sincos mask.
pub(crate) fn check_operands(op: &Op) -> Result<(), Fault> {
    match op {
        Op::Nop | Op::SetConst { .. } | Op::DefVar { .. } => Ok(()),
        Op::TexLoad {
            dest,
            sampler,
            coord,
        } => {
            check_dest(dest)?;
            check_source(coord)?;
            check_sampler_operand(sampler)?;
            Ok(())
        }
        Op::Mov { dest, src } | Op::Unary { dest, src, .. } => {
            check_dest(dest)?;
            check_source(src)?;
            Ok(())
        }
        Op::Binary { dest, a, b, .. } => {
            check_dest(dest)?;
            check_source(a)?;
            check_source(b)?;
            Ok(())
        }
        Op::Ternary { op, dest, a, b, c } => {
            check_dest(dest)?;
            if *op == TernaryOpKind::SinCos {
                check_sincos_mask(dest.write_mask)?;
            }
            check_source(a)?;
            check_source(b)?;
            check_source(c)?;
            Ok(())
        }
    }
}

pub(crate) fn check_sincos_mask(mask: WriteMask) -> Result<(), Fault> {
    if mask.is_empty() || !WriteMask::RG.contains(mask) {
        return unsupported(format!("sincos write mask .{mask} is not supported"));
    }
    Ok(())
}

/// Lane-select constant for a write mask.
pub(crate) fn mask_lanes(mask: WriteMask) -> Vec4 {
    Vec4::lane_mask(mask.bits())
}

/// Masked store: lanes outside `mask` keep `prev`.
pub(crate) fn store(prev: Vec4, value: Vec4, mask: WriteMask) -> Vec4 {
    if mask.is_full() {
        value
    } else {
        Vec4::blend(mask_lanes(mask), value, prev)
    }
}

fn sum3(v: Vec4) -> f32 {
    (v.x + v.y) + v.z
}

pub(crate) type BinaryFn = fn(Vec4, Vec4) -> Vec4;
pub(crate) type UnaryFn = fn(Vec4) -> Vec4;
pub(crate) type TernaryFn = fn(Vec4, Vec4, Vec4) -> Vec4;

pub(crate) fn binary_fn(op: BinaryOpKind) -> BinaryFn {
    match op {
        BinaryOpKind::Add => |a, b| a + b,
        BinaryOpKind::Sub => |a, b| a - b,
        BinaryOpKind::Mul => |a, b| a * b,
        BinaryOpKind::Max => Vec4::max,
        BinaryOpKind::Min => Vec4::min,
        BinaryOpKind::Dp3 => |a, b| Vec4::splat(sum3(a * b)),
        BinaryOpKind::Dp4 => |a, b| {
            let m = a * b;
            Vec4::splat(sum3(m) + m.w)
        },
    }
}

pub(crate) fn unary_fn(op: UnaryOpKind) -> UnaryFn {
    match op {
        // Full division; a reciprocal estimate is not precise enough.
        UnaryOpKind::Rcp => |a| Vec4::ONE / a,
        UnaryOpKind::Frc => |a| a.map(|v| v - v.trunc()),
        UnaryOpKind::Rsq => |a| Vec4::splat(1.0 / a.x.abs().sqrt()),
        UnaryOpKind::Abs => Vec4::abs,
        UnaryOpKind::Exp => |a| Vec4::splat(a.x.exp2()),
        UnaryOpKind::Log => |a| Vec4::splat(a.x.abs().log2()),
    }
}

pub(crate) fn ternary_fn(op: TernaryOpKind) -> TernaryFn {
    match op {
        TernaryOpKind::Mad => |a, b, c| a * b + c,
        // a >= 0 ? b : c, selecting on the sign test `a < 0`.
        TernaryOpKind::Cmp => |a, b, c| Vec4::blend(a.lt_mask(Vec4::ZERO), c, b),
        TernaryOpKind::SinCos => |a, _, _| Vec4::new(a.x.cos(), a.x.sin(), 0.0, 0.0),
        TernaryOpKind::Lrp => |a, b, c| a * b + (Vec4::ONE - a) * c,
        TernaryOpKind::Dp2Add => |a, b, c| Vec4::splat(a.x * b.x + a.y * b.y + c.x),
    }
}

pub(crate) fn binary(op: BinaryOpKind, a: Vec4, b: Vec4) -> Vec4 {
    binary_fn(op)(a, b)
}

pub(crate) fn unary(op: UnaryOpKind, a: Vec4) -> Vec4 {
    unary_fn(op)(a)
}

pub(crate) fn ternary(op: TernaryOpKind, a: Vec4, b: Vec4, c: Vec4) -> Vec4 {
    ternary_fn(op)(a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::make_swizzle;

    #[test]
    fn store_obeys_mask_for_every_mask() {
        let prev = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let value = Vec4::new(-1.0, -2.0, -3.0, -4.0);
        for bits in 0u8..16 {
            let mask = WriteMask::from_bits_truncate(bits);
            let out = store(prev, value, mask).to_array();
            for lane in 0..4 {
                let expected = if bits & (1 << lane) != 0 {
                    value.lane(lane)
                } else {
                    prev.lane(lane)
                };
                assert_eq!(out[lane], expected, "mask {bits:04b} lane {lane}");
            }
        }
    }

    #[test]
    fn identity_swizzle_is_noop() {
        let v = Vec4::new(0.5, -1.0, f32::INFINITY, 7.0);
        let sel = make_swizzle(0, 1, 2, 3).selectors();
        assert_eq!(read_source(v, sel, false), v);
        assert_eq!(read_source(v, sel, true), -v);
    }

    #[test]
    fn modifiers_beyond_negate_are_rejected() {
        assert!(!negates(SrcModifier::None).unwrap());
        assert!(negates(SrcModifier::Negate).unwrap());
        assert!(matches!(negates(SrcModifier::Abs), Err(Fault::Unsupported(_))));
    }

    #[test]
    fn dot_products_broadcast() {
        let a = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vec4::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(binary(BinaryOpKind::Dp3, a, b), Vec4::splat(38.0));
        assert_eq!(binary(BinaryOpKind::Dp4, a, b), Vec4::splat(70.0));
        assert_eq!(
            ternary(TernaryOpKind::Dp2Add, a, b, Vec4::splat(0.5)),
            Vec4::splat(17.5)
        );
    }

    #[test]
    fn cmp_selects_on_sign() {
        let a = Vec4::new(-1.0, 0.0, 2.0, -0.0);
        let b = Vec4::splat(10.0);
        let c = Vec4::splat(20.0);
        assert_eq!(
            ternary(TernaryOpKind::Cmp, a, b, c),
            Vec4::new(20.0, 10.0, 10.0, 10.0)
        );
    }

    #[test]
    fn frc_and_lrp() {
        let v = unary(UnaryOpKind::Frc, Vec4::new(1.25, -1.25, 3.0, -0.5));
        assert_eq!(v, Vec4::new(0.25, -0.25, 0.0, -0.5));
        let l = ternary(
            TernaryOpKind::Lrp,
            Vec4::splat(0.25),
            Vec4::splat(4.0),
            Vec4::splat(8.0),
        );
        assert_eq!(l, Vec4::splat(7.0));
    }

    #[test]
    fn scalar_unaries_read_x() {
        let v = Vec4::new(4.0, 100.0, 100.0, 100.0);
        assert_eq!(unary(UnaryOpKind::Rsq, v), Vec4::splat(0.5));
        assert_eq!(unary(UnaryOpKind::Exp, v), Vec4::splat(16.0));
        assert_eq!(unary(UnaryOpKind::Log, -v), Vec4::splat(2.0));
        assert_eq!(unary(UnaryOpKind::Rcp, v), Vec4::new(0.25, 0.01, 0.01, 0.01));
    }

    #[test]
    fn sincos_writes_cosine_to_r_and_sine_to_g() {
        let angle = Vec4::new(0.5, 3.0, 3.0, 3.0);
        let res = ternary(TernaryOpKind::SinCos, angle, Vec4::ZERO, Vec4::ZERO);
        let (cos, sin) = (0.5f32.cos(), 0.5f32.sin());
        let prev = Vec4::splat(9.0);
        assert_eq!(store(prev, res, WriteMask::R), Vec4::new(cos, 9.0, 9.0, 9.0));
        assert_eq!(store(prev, res, WriteMask::G), Vec4::new(9.0, sin, 9.0, 9.0));
        assert_eq!(store(prev, res, WriteMask::RG), Vec4::new(cos, sin, 9.0, 9.0));
        assert!((cos - 0.877_582_6).abs() < 1e-6);
        assert!((sin - 0.479_425_55).abs() < 1e-6);
    }

    #[test]
    fn lanewise_arithmetic() {
        let a = Vec4::new(1.0, -2.0, 3.0, -4.0);
        let b = Vec4::new(0.0, 0.0, 5.0, -5.0);
        assert_eq!(binary(BinaryOpKind::Add, a, b), Vec4::new(1.0, -2.0, 8.0, -9.0));
        assert_eq!(binary(BinaryOpKind::Min, a, b), Vec4::new(0.0, -2.0, 3.0, -5.0));
        assert_eq!(binary(BinaryOpKind::Max, a, b), Vec4::new(1.0, 0.0, 5.0, -4.0));
        assert_eq!(
            ternary(TernaryOpKind::Mad, a, Vec4::splat(2.0), Vec4::splat(0.5)),
            Vec4::new(2.5, -3.5, 6.5, -7.5)
        );
        assert_eq!(
            unary(UnaryOpKind::Abs, Vec4::new(1.0, -2.0, -0.5, f32::NEG_INFINITY)),
            Vec4::new(1.0, 2.0, 0.5, f32::INFINITY)
        );
    }

    #[test]
    fn declarations_reject_duplicates() {
        let mut decls = Declarations::default();
        let def = Op::SetConst {
            index: 2,
            value: Vec4::ONE,
        };
        assert_eq!(decls.declare(&def).unwrap(), Declared::Constant(2));
        assert!(matches!(decls.declare(&def), Err(Fault::Unsupported(_))));

        let sampler = Op::DefVar {
            texture_kind: TextureKind::Text2d,
            dest: DestRegister::new(RegisterKind::SamplerState, 1),
        };
        assert_eq!(decls.declare(&sampler).unwrap(), Declared::Sampler(1));
        assert!(decls.declare(&sampler).is_err());

        let cube = Op::DefVar {
            texture_kind: TextureKind::Cube,
            dest: DestRegister::new(RegisterKind::SamplerState, 2),
        };
        assert!(decls.declare(&cube).is_err());

        let t0 = Op::DefVar {
            texture_kind: TextureKind::Unknown,
            dest: DestRegister::new(RegisterKind::Texture, 0).with_mask(WriteMask::RG),
        };
        assert_eq!(decls.declare(&t0).unwrap(), Declared::TexCoord);
        assert!(decls.declare(&t0).is_err());

        let v0 = Op::DefVar {
            texture_kind: TextureKind::Unknown,
            dest: DestRegister::new(RegisterKind::Input, 0),
        };
        assert_eq!(decls.declare(&v0).unwrap(), Declared::Ignored);
    }

    #[test]
    fn texcoord_needs_rg_mask() {
        let t0 = Op::DefVar {
            texture_kind: TextureKind::Unknown,
            dest: DestRegister::new(RegisterKind::Texture, 0),
        };
        assert!(Declarations::default().declare(&t0).is_err());
    }

    #[test]
    fn operand_kinds() {
        let mov = |dest: DestRegister, src: SourceRegister| Op::Mov { dest, src };
        let r0 = DestRegister::new(RegisterKind::Temp, 0);
        assert!(check_operands(&mov(r0, SourceRegister::new(RegisterKind::Texture, 0))).is_ok());
        assert!(check_operands(&mov(r0, SourceRegister::new(RegisterKind::Texture, 1))).is_err());
        assert!(check_operands(&mov(r0, SourceRegister::new(RegisterKind::Input, 0))).is_err());
        assert!(check_operands(&mov(
            DestRegister::new(RegisterKind::Constant, 0),
            SourceRegister::new(RegisterKind::Temp, 0)
        ))
        .is_err());
    }

    #[test]
    fn sincos_masks() {
        assert!(check_sincos_mask(WriteMask::R).is_ok());
        assert!(check_sincos_mask(WriteMask::G).is_ok());
        assert!(check_sincos_mask(WriteMask::RG).is_ok());
        assert!(check_sincos_mask(WriteMask::all()).is_err());
        assert!(check_sincos_mask(WriteMask::empty()).is_err());
    }
}
