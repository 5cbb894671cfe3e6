//! Tree-walking backend: evaluates the instruction list once per output pixel.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::binding::ShaderData;
use crate::decode::Program;
use crate::error::ShaderError;
use crate::instruction::{Instruction, Op, TernaryOpKind};
use crate::limits::{MAX_REGISTER_SLOTS, MAX_SAMPLER_SLOTS};
use crate::ops::{self, Fault};
use crate::register::{DestRegister, Register, RegisterKind, SourceRegister};
use crate::texture::Sampler;
use crate::vec4::Vec4;
use crate::walk::PixelWalk;

const SLOTS: usize = MAX_REGISTER_SLOTS as usize;

/// Samplers resolved once per run, indexed by sampler number.
type SamplerTable<'a> = [Option<&'a Sampler>; MAX_SAMPLER_SLOTS as usize];

/// Register files for one pixel.
#[derive(Debug, Clone)]
pub struct ShaderContext {
    pub temps: [Vec4; SLOTS],
    pub texcoords: [Vec4; SLOTS],
    pub constants: [Vec4; SLOTS],
    pub color_out: [Vec4; SLOTS],
}

impl Default for ShaderContext {
    fn default() -> Self {
        Self {
            temps: [Vec4::ZERO; SLOTS],
            texcoords: [Vec4::ZERO; SLOTS],
            constants: [Vec4::ZERO; SLOTS],
            color_out: [Vec4::ZERO; SLOTS],
        }
    }
}

impl ShaderContext {
    /// Clears every register file and reloads the externally bound constants. Constants outside
    /// the addressable range are not visible to the program.
    pub fn reset(&mut self, constants: &BTreeMap<u32, Vec4>) {
        *self = Self::default();
        for (&index, &value) in constants.range(..MAX_REGISTER_SLOTS) {
            self.constants[index as usize] = value;
        }
    }

    fn file(&self, kind: RegisterKind) -> &[Vec4; SLOTS] {
        match kind {
            RegisterKind::Constant => &self.constants,
            RegisterKind::Texture => &self.texcoords,
            RegisterKind::ColorOut => &self.color_out,
            _ => &self.temps,
        }
    }

    fn file_mut(&mut self, kind: RegisterKind) -> &mut [Vec4; SLOTS] {
        match kind {
            RegisterKind::ColorOut => &mut self.color_out,
            _ => &mut self.temps,
        }
    }

    fn read(&self, src: &SourceRegister) -> Result<Vec4, Fault> {
        let (slot, negate) = ops::check_source(src)?;
        let value = self.file(src.kind())[slot];
        Ok(ops::read_source(value, src.swizzle.selectors(), negate))
    }

    fn store(&mut self, dest: &DestRegister, value: Vec4) -> Result<(), Fault> {
        let slot = ops::check_dest(dest)?;
        let reg = &mut self.file_mut(dest.kind())[slot];
        *reg = ops::store(*reg, value, dest.write_mask);
        Ok(())
    }
}

/// Executes a [`Program`] pixel by pixel.
#[derive(Debug)]
pub struct Interpreter<'p> {
    program: &'p Program,
    samplers: Vec<u32>,
}

impl<'p> Interpreter<'p> {
    /// Checks every instruction up front so that an unsupported program fails before any pixel
    /// is written.
    pub fn new(program: &'p Program) -> Result<Self, ShaderError> {
        let mut decls = ops::Declarations::default();
        let mut samplers = Vec::new();
        for (index, ins) in program.instructions.iter().enumerate() {
            decls
                .declare(&ins.op)
                .and_then(|_| ops::check_operands(&ins.op))
                .map_err(|fault| fault.at(index, ins))?;
            if let Op::TexLoad { sampler, .. } = &ins.op {
                let number = ops::check_sampler_operand(sampler).map_err(|f| f.at(index, ins))?;
                if !samplers.contains(&number) {
                    samplers.push(number);
                }
            }
            if ins.predicate.is_some() {
                debug!(index, %ins, "predicate ignored");
            }
        }
        Ok(Self { program, samplers })
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Renders every pixel of the bound output texture.
    pub fn run(&self, data: &mut ShaderData) -> Result<(), ShaderError> {
        let (bindings, output) = data.split_for_render()?;
        let mut samplers: SamplerTable<'_> = [None; MAX_SAMPLER_SLOTS as usize];
        for &number in &self.samplers {
            samplers[number as usize] = Some(bindings.sampler(number)?);
        }
        let (width, height) = (output.width(), output.height());
        debug!(width, height, "interpreting");

        let mut ctx = ShaderContext::default();
        for pixel in PixelWalk::new(width, height) {
            ctx.reset(bindings.constants());
            ctx.texcoords[0] = pixel.coord();
            trace!(x = pixel.x, y = pixel.y, coord = %ctx.texcoords[0], "pixel");
            self.shade(&mut ctx, &samplers)?;
            output.write_color(pixel.x, pixel.y, ctx.color_out[0]);
        }
        Ok(())
    }

    /// Runs the instruction list against an already reset context.
    pub(crate) fn shade(
        &self,
        ctx: &mut ShaderContext,
        samplers: &SamplerTable<'_>,
    ) -> Result<(), ShaderError> {
        for (index, ins) in self.program.instructions.iter().enumerate() {
            step(ctx, samplers, ins).map_err(|fault| fault.at(index, ins))?;
        }
        Ok(())
    }
}

fn step(
    ctx: &mut ShaderContext,
    samplers: &SamplerTable<'_>,
    ins: &Instruction,
) -> Result<(), Fault> {
    match ins.op {
        Op::Nop | Op::DefVar { .. } => {}
        Op::SetConst { index, value } => {
            let slot = ops::slot(Register::new(RegisterKind::Constant, index))?;
            ctx.constants[slot] = value;
        }
        Op::TexLoad {
            dest,
            sampler,
            coord,
        } => {
            let coord = ctx.read(&coord)?;
            let index = ops::check_sampler_operand(&sampler)?;
            let sampler = samplers[index as usize].ok_or(ShaderError::UnboundSampler { index })?;
            let res = sampler.sample(coord);
            trace!(%ins, %coord, %res);
            ctx.store(&dest, res)?;
        }
        Op::Mov { dest, src } => {
            let a = ctx.read(&src)?;
            trace!(%ins, %a);
            ctx.store(&dest, a)?;
        }
        Op::Binary { op, dest, a, b } => {
            let (a, b) = (ctx.read(&a)?, ctx.read(&b)?);
            let res = ops::binary(op, a, b);
            trace!(%ins, %a, %b, %res);
            ctx.store(&dest, res)?;
        }
        Op::Unary { op, dest, src } => {
            let a = ctx.read(&src)?;
            let res = ops::unary(op, a);
            trace!(%ins, %a, %res);
            ctx.store(&dest, res)?;
        }
        Op::Ternary { op, dest, a, b, c } => {
            if op == TernaryOpKind::SinCos {
                ops::check_sincos_mask(dest.write_mask)?;
            }
            let (a, b, c) = (ctx.read(&a)?, ctx.read(&b)?, ctx.read(&c)?);
            let res = ops::ternary(op, a, b, c);
            trace!(%ins, %a, %b, %c, %res);
            ctx.store(&dest, res)?;
        }
    }
    Ok(())
}
