//! Compiled backend.
//!
//! A program is lowered once into a flat frame of `Vec4` slots plus a list of prebuilt closures,
//! one per instruction, with every operand already resolved to a slot index and every swizzle,
//! modifier and write mask specialized. Lowering runs in three passes:
//!
//! 1. [`requisites`]: which constants come from the binding context and which partial write
//!    masks need a lane-select constant.
//! 2. [`header`]: frame slots for literals, external constants, masks, samplers and the texture
//!    coordinate.
//! 3. [`codegen`]: the instruction bodies.
//!
//! The resulting [`CompiledShader`] owns the pixel loop: it binds constants and samplers once per
//! run, then resets the frame, runs the body and writes `oC0` for every pixel.

mod codegen;
mod header;
mod requisites;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

use crate::binding::ShaderData;
use crate::decode::Program;
use crate::error::ShaderError;
use crate::register::{Register, RegisterKind, WriteMask};
use crate::texture::Sampler;
use crate::vec4::Vec4;
use crate::walk::PixelWalk;

/// Per-run register frame.
pub(crate) struct Frame<'a> {
    pub regs: Vec<Vec4>,
    pub samplers: Vec<&'a Sampler>,
}

pub(crate) type Thunk = Box<dyn Fn(&mut Frame<'_>) + Send + Sync>;

/// Generation state for one compilation. Never shared between compilations.
#[derive(Debug, Default)]
pub(crate) struct CodeGenContext {
    entry: Vec<Vec4>,
    registers: HashMap<Register, usize>,
    masks: BTreeMap<WriteMask, usize>,
    externals: Vec<(usize, u32)>,
    samplers: Vec<u32>,
    texcoord: Option<usize>,
}

impl CodeGenContext {
    fn alloc(&mut self, init: Vec4) -> usize {
        self.entry.push(init);
        self.entry.len() - 1
    }

    /// Slot holding `reg`, allocating a zeroed one on first use.
    pub fn register_slot(&mut self, reg: Register) -> usize {
        if let Some(&slot) = self.registers.get(&reg) {
            return slot;
        }
        let slot = self.alloc(Vec4::ZERO);
        self.registers.insert(reg, slot);
        if reg.kind == RegisterKind::Texture {
            self.texcoord = Some(slot);
        }
        slot
    }

    /// Binds `c{index}` to a literal folded into the entry frame.
    pub fn define_constant(&mut self, index: u32, value: Vec4) {
        let slot = self.register_slot(Register::new(RegisterKind::Constant, index));
        self.entry[slot] = value;
    }

    /// Binds `c{index}` to a value loaded from the binding context at kernel entry.
    pub fn load_constant(&mut self, index: u32) {
        let slot = self.register_slot(Register::new(RegisterKind::Constant, index));
        self.externals.push((slot, index));
    }

    pub fn texcoord_slot(&mut self) -> usize {
        self.register_slot(Register::new(RegisterKind::Texture, 0))
    }

    pub fn mask_slot(&mut self, mask: WriteMask) -> usize {
        if let Some(&slot) = self.masks.get(&mask) {
            return slot;
        }
        let slot = self.alloc(crate::ops::mask_lanes(mask));
        self.masks.insert(mask, slot);
        slot
    }

    /// Frame sampler index for binding slot `index`.
    pub fn sampler_slot(&mut self, index: u32) -> usize {
        if let Some(pos) = self.samplers.iter().position(|&s| s == index) {
            return pos;
        }
        self.samplers.push(index);
        self.samplers.len() - 1
    }

    fn finish(self, body: Vec<Thunk>) -> CompiledShader {
        let color_out = self
            .registers
            .get(&Register::new(RegisterKind::ColorOut, 0))
            .copied();
        debug!(
            slots = self.entry.len(),
            externals = self.externals.len(),
            masks = self.masks.len(),
            samplers = self.samplers.len(),
            texcoord = self.texcoord.is_some(),
            "allocated kernel frame"
        );
        CompiledShader {
            entry: self.entry,
            externals: self.externals,
            samplers: self.samplers,
            texcoord: self.texcoord,
            color_out,
            body,
        }
    }
}

/// A program lowered to a reusable kernel.
pub struct CompiledShader {
    entry: Vec<Vec4>,
    externals: Vec<(usize, u32)>,
    samplers: Vec<u32>,
    texcoord: Option<usize>,
    color_out: Option<usize>,
    body: Vec<Thunk>,
}

impl fmt::Debug for CompiledShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledShader")
            .field("frame_len", &self.entry.len())
            .field("externals", &self.externals)
            .field("samplers", &self.samplers)
            .field("texcoord", &self.texcoord)
            .field("color_out", &self.color_out)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl CompiledShader {
    /// Number of `Vec4` slots in the kernel frame.
    pub fn frame_len(&self) -> usize {
        self.entry.len()
    }

    /// Constant indices loaded from the binding context at kernel entry.
    pub fn external_constants(&self) -> impl Iterator<Item = u32> + '_ {
        self.externals.iter().map(|&(_, index)| index)
    }

    /// Renders every pixel of the bound output texture.
    pub fn run(&self, data: &mut ShaderData) -> Result<(), ShaderError> {
        let (bindings, output) = data.split_for_render()?;

        let mut entry = self.entry.clone();
        for &(slot, index) in &self.externals {
            entry[slot] = bindings.constant_or_zero(index);
        }
        let samplers = self
            .samplers
            .iter()
            .map(|&index| bindings.sampler(index))
            .collect::<Result<Vec<_>, _>>()?;

        let (width, height) = (output.width(), output.height());
        debug!(width, height, "running compiled kernel");

        let mut frame = Frame {
            regs: entry.clone(),
            samplers,
        };
        for pixel in PixelWalk::new(width, height) {
            frame.regs.copy_from_slice(&entry);
            if let Some(slot) = self.texcoord {
                frame.regs[slot] = pixel.coord();
            }
            for thunk in &self.body {
                thunk(&mut frame);
            }
            let color = self.color_out.map_or(Vec4::ZERO, |slot| frame.regs[slot]);
            output.write_color(pixel.x, pixel.y, color);
        }
        Ok(())
    }
}

/// Lowers `program` into a [`CompiledShader`].
pub fn compile(program: &Program) -> Result<CompiledShader, ShaderError> {
    let req = requisites::analyze(program);
    let mut cx = CodeGenContext::default();
    header::emit(program, &req, &mut cx)?;
    let body = codegen::emit(program, &mut cx)?;
    Ok(cx.finish(body))
}
