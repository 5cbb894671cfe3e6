//! First pass: what the kernel needs before its body can run.

use std::collections::BTreeSet;

use crate::decode::Program;
use crate::instruction::Op;
use crate::register::{RegisterKind, WriteMask};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Requisites {
    /// Constants read by the program but never defined by it; loaded from the binding context.
    pub external_constants: BTreeSet<u32>,
    /// Distinct partial write masks, each materialized once as a lane-select constant.
    pub masks: BTreeSet<WriteMask>,
}

pub(crate) fn analyze(program: &Program) -> Requisites {
    let defined: BTreeSet<u32> = program
        .instructions
        .iter()
        .filter_map(|ins| match ins.op {
            Op::SetConst { index, .. } => Some(index),
            _ => None,
        })
        .collect();

    let mut req = Requisites::default();
    for ins in &program.instructions {
        for src in ins.sources() {
            if src.kind() == RegisterKind::Constant && !defined.contains(&src.number()) {
                req.external_constants.insert(src.number());
            }
        }
        if let Some(dest) = ins.dest() {
            if !dest.write_mask.is_full() {
                req.masks.insert(dest.write_mask);
            }
        }
    }
    req
}
