//! Second pass: frame slots for declarations, external constants and write masks.

use tracing::debug;

use crate::decode::Program;
use crate::error::ShaderError;
use crate::instruction::Op;
use crate::limits::MAX_REGISTER_SLOTS;
use crate::ops::{Declarations, Declared};

use super::requisites::Requisites;
use super::CodeGenContext;

pub(crate) fn emit(
    program: &Program,
    req: &Requisites,
    cx: &mut CodeGenContext,
) -> Result<(), ShaderError> {
    let mut decls = Declarations::default();
    for (index, ins) in program.instructions.iter().enumerate() {
        match decls.declare(&ins.op).map_err(|fault| fault.at(index, ins))? {
            Declared::Constant(c) => {
                if let Op::SetConst { value, .. } = ins.op {
                    cx.define_constant(c, value);
                }
            }
            Declared::TexCoord => {
                cx.texcoord_slot();
            }
            // Samplers are bound by the first `texld` that reads them, so a declared but unused
            // sampler does not need a binding.
            Declared::Sampler(s) => debug!(index, sampler = s, "sampler declared"),
            Declared::Ignored => {
                if matches!(ins.op, Op::DefVar { .. }) {
                    debug!(index, %ins, "declaration ignored");
                }
            }
        }
    }

    // Out-of-range reads are rejected by codegen with the offending instruction.
    for &index in req.external_constants.range(..MAX_REGISTER_SLOTS) {
        cx.load_constant(index);
    }
    for &mask in &req.masks {
        cx.mask_slot(mask);
    }
    Ok(())
}
