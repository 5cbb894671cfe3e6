use std::fmt;

use tracing::info_span;

use crate::binding::ShaderData;
use crate::decode::Program;
use crate::error::ShaderError;
use crate::interp::Interpreter;
use crate::jit::compile;

/// Execution strategy for [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    Interpreter,
    #[default]
    Compiler,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interpreter => "interpreter",
            Self::Compiler => "compiler",
        })
    }
}

/// Runs `program` over every pixel of the output texture bound in `data`.
///
/// Fails without writing any pixel if the program uses something the backend does not support
/// or a required binding is missing.
pub fn render(
    program: &Program,
    data: &mut ShaderData,
    backend: Backend,
) -> Result<(), ShaderError> {
    let _span = info_span!("render", %backend).entered();
    match backend {
        Backend::Interpreter => Interpreter::new(program)?.run(data),
        Backend::Compiler => compile(program)?.run(data),
    }
}
