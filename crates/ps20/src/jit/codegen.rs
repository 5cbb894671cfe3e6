//! Third pass: one closure per instruction, operands resolved to frame slots.

use tracing::debug;

use crate::decode::Program;
use crate::error::ShaderError;
use crate::instruction::{Op, TernaryOpKind};
use crate::ops::{self, Fault};
use crate::register::{DestRegister, RegisterKind, SourceRegister};
use crate::vec4::Vec4;

use super::{CodeGenContext, Frame, Thunk};

#[derive(Debug, Clone, Copy)]
struct Operand {
    slot: usize,
    selectors: [u8; 4],
    negate: bool,
}

impl Operand {
    #[inline]
    fn load(&self, regs: &[Vec4]) -> Vec4 {
        ops::read_source(regs[self.slot], self.selectors, self.negate)
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Full(usize),
    /// `(mask & value) | (!mask & prev)`, with the lane-select constant in `mask`.
    Masked { slot: usize, mask: usize },
}

impl Target {
    #[inline]
    fn store(&self, regs: &mut [Vec4], value: Vec4) {
        match *self {
            Target::Full(slot) => regs[slot] = value,
            Target::Masked { slot, mask } => {
                regs[slot] = Vec4::blend(regs[mask], value, regs[slot]);
            }
        }
    }
}

fn operand(cx: &mut CodeGenContext, src: &SourceRegister) -> Result<Operand, Fault> {
    let (_, negate) = ops::check_source(src)?;
    let slot = match src.kind() {
        RegisterKind::Texture => cx.texcoord_slot(),
        _ => cx.register_slot(src.reg),
    };
    Ok(Operand {
        slot,
        selectors: src.swizzle.selectors(),
        negate,
    })
}

fn target(cx: &mut CodeGenContext, dest: &DestRegister) -> Result<Target, Fault> {
    ops::check_dest(dest)?;
    let slot = cx.register_slot(dest.reg);
    Ok(if dest.write_mask.is_full() {
        Target::Full(slot)
    } else {
        Target::Masked {
            slot,
            mask: cx.mask_slot(dest.write_mask),
        }
    })
}

fn lower(cx: &mut CodeGenContext, op: &Op) -> Result<Option<Thunk>, Fault> {
    let thunk: Thunk = match *op {
        Op::Nop | Op::SetConst { .. } | Op::DefVar { .. } => return Ok(None),
        Op::TexLoad {
            dest,
            sampler,
            coord,
        } => {
            let t = target(cx, &dest)?;
            let coord = operand(cx, &coord)?;
            let s = cx.sampler_slot(ops::check_sampler_operand(&sampler)?);
            Box::new(move |f: &mut Frame<'_>| {
                let value = f.samplers[s].sample(coord.load(&f.regs));
                t.store(&mut f.regs, value);
            })
        }
        Op::Mov { dest, src } => {
            let t = target(cx, &dest)?;
            let a = operand(cx, &src)?;
            Box::new(move |f: &mut Frame<'_>| {
                let value = a.load(&f.regs);
                t.store(&mut f.regs, value);
            })
        }
        Op::Binary { op, dest, a, b } => {
            let t = target(cx, &dest)?;
            let (a, b) = (operand(cx, &a)?, operand(cx, &b)?);
            let k = ops::binary_fn(op);
            Box::new(move |f: &mut Frame<'_>| {
                let value = k(a.load(&f.regs), b.load(&f.regs));
                t.store(&mut f.regs, value);
            })
        }
        Op::Unary { op, dest, src } => {
            let t = target(cx, &dest)?;
            let a = operand(cx, &src)?;
            let k = ops::unary_fn(op);
            Box::new(move |f: &mut Frame<'_>| {
                let value = k(a.load(&f.regs));
                t.store(&mut f.regs, value);
            })
        }
        Op::Ternary { op, dest, a, b, c } => {
            if op == TernaryOpKind::SinCos {
                ops::check_sincos_mask(dest.write_mask)?;
            }
            let t = target(cx, &dest)?;
            let (a, b, c) = (operand(cx, &a)?, operand(cx, &b)?, operand(cx, &c)?);
            let k = ops::ternary_fn(op);
            Box::new(move |f: &mut Frame<'_>| {
                let value = k(a.load(&f.regs), b.load(&f.regs), c.load(&f.regs));
                t.store(&mut f.regs, value);
            })
        }
    };
    Ok(Some(thunk))
}

pub(crate) fn emit(
    program: &Program,
    cx: &mut CodeGenContext,
) -> Result<Vec<Thunk>, ShaderError> {
    let mut body = Vec::with_capacity(program.instructions.len());
    for (index, ins) in program.instructions.iter().enumerate() {
        if ins.predicate.is_some() {
            debug!(index, %ins, "predicate ignored");
        }
        if let Some(thunk) = lower(cx, &ins.op).map_err(|fault| fault.at(index, ins))? {
            body.push(thunk);
        }
    }
    Ok(body)
}
