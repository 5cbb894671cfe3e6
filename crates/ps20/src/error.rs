use thiserror::Error;

use crate::instruction::Instruction;
use crate::register::{RegisterKind, WriteMask};

/// Failure classes shared by the decoder and both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token stream itself is not a valid `ps_2_0` program.
    MalformedBytecode,
    /// The program is well formed but uses something a backend does not implement.
    UnsupportedOperation,
    /// A sampler, output texture or required constant was not bound.
    InvalidBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterDecodeError {
    #[error("reserved register type {0}")]
    ReservedKind(u8),
    #[error("invalid register type {0}")]
    InvalidKind(u8),
    #[error("unsupported source modifier 0x{0:x}")]
    InvalidModifier(u8),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("shader bytecode length {len} exceeds maximum {max} bytes")]
    BytecodeTooLarge { len: usize, max: usize },
    #[error("shader bytecode is empty")]
    Empty,
    #[error("unexpected end of token stream at token {token_index}")]
    Truncated { token_index: usize },
    #[error("version token 0x{token:08x} is not a pixel shader")]
    NotPixelShader { token: u32 },
    #[error("unsupported pixel shader version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("unknown or unsupported opcode 0x{opcode:04x} at token {token_index}")]
    UnsupportedOpcode { opcode: u16, token_index: usize },
    #[error("bad register token at token {token_index}")]
    Register {
        token_index: usize,
        #[source]
        source: RegisterDecodeError,
    },
    #[error("register {kind:?} {number} at token {token_index} is out of range")]
    RegisterIndexOutOfRange {
        token_index: usize,
        kind: RegisterKind,
        number: u32,
    },
    #[error("def at token {token_index} targets {kind:?}, expected a constant register")]
    DefNonConstant {
        token_index: usize,
        kind: RegisterKind,
    },
    #[error("def at token {token_index} has partial write mask .{mask}")]
    DefPartialMask { token_index: usize, mask: WriteMask },
    #[error("instruction {instruction} `{text}`: {reason}")]
    Unsupported {
        instruction: usize,
        text: String,
        reason: String,
    },
    #[error("sampler slot {index} is not bound")]
    UnboundSampler { index: u32 },
    #[error("output texture slot {index} is not bound")]
    UnboundOutputTexture { index: u32 },
    #[error("constant c{index} is not set")]
    MissingConstant { index: u32 },
    #[error("{what} slot {index} exceeds maximum {max}")]
    SlotOutOfRange {
        what: &'static str,
        index: u32,
        max: u32,
    },
}

impl ShaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BytecodeTooLarge { .. }
            | Self::Empty
            | Self::Truncated { .. }
            | Self::NotPixelShader { .. }
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedOpcode { .. }
            | Self::Register { .. }
            | Self::RegisterIndexOutOfRange { .. }
            | Self::DefNonConstant { .. }
            | Self::DefPartialMask { .. } => ErrorKind::MalformedBytecode,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Self::UnboundSampler { .. }
            | Self::UnboundOutputTexture { .. }
            | Self::MissingConstant { .. }
            | Self::SlotOutOfRange { .. } => ErrorKind::InvalidBinding,
        }
    }

    pub(crate) fn unsupported(index: usize, ins: &Instruction, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            instruction: index,
            text: ins.to_string(),
            reason: reason.into(),
        }
    }
}
