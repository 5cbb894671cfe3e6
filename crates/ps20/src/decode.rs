//! `ps_2_0` token stream decoding.
//!
//! The stream is read one little-endian DWORD at a time. Unlike SM3 decoders this does not rely
//! on the instruction-length field: each opcode has a fixed operand shape and the decoder
//! consumes exactly that many tokens, followed by the predicate token when bit 28 is set.

use std::fmt;

use tracing::debug;

use crate::error::{RegisterDecodeError, ShaderError};
use crate::instruction::{BinaryOpKind, Instruction, Op, TernaryOpKind, TextureKind, UnaryOpKind};
use crate::limits::{MAX_REGISTER_SLOTS, MAX_SHADER_BYTECODE_BYTES};
use crate::register::{DestRegister, Register, RegisterKind, SourceRegister};
use crate::vec4::Vec4;

const PIXEL_SHADER_TYPE: u32 = 0xFFFF;
const END_TOKEN: u16 = 0xFFFF;
const COMMENT_TOKEN: u16 = 0xFFFE;
const PREDICATED_BIT: u32 = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVersion {
    pub major: u8,
    pub minor: u8,
}

impl ShaderVersion {
    pub const PS_2_0: ShaderVersion = ShaderVersion { major: 2, minor: 0 };

    fn decode(token: u32) -> Result<Self, ShaderError> {
        if token >> 16 != PIXEL_SHADER_TYPE {
            return Err(ShaderError::NotPixelShader { token });
        }
        let version = Self {
            major: ((token >> 8) & 0xFF) as u8,
            minor: (token & 0xFF) as u8,
        };
        if version != Self::PS_2_0 {
            return Err(ShaderError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }
        Ok(version)
    }
}

impl fmt::Display for ShaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ps_{}_{}", self.major, self.minor)
    }
}

/// A decoded pixel shader. Immutable once decoded; backends only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub version: ShaderVersion,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn decode(bytes: &[u8]) -> Result<Self, ShaderError> {
        decode(bytes)
    }

    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            version: ShaderVersion::PS_2_0,
            instructions,
        }
    }

    /// One instruction per line, preceded by the version line.
    pub fn disassemble(&self) -> String {
        let mut out = format!("{}\n", self.version);
        for ins in &self.instructions {
            out.push_str(&ins.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

struct TokenReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn token_index(&self) -> usize {
        self.pos / 4
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn read_u32(&mut self) -> Result<u32, ShaderError> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + 4)
            .ok_or(ShaderError::Truncated {
                token_index: self.token_index(),
            })?;
        self.pos += 4;
        Ok(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn read_f32(&mut self) -> Result<f32, ShaderError> {
        self.read_u32().map(f32::from_bits)
    }

    fn skip(&mut self, tokens: usize) -> Result<(), ShaderError> {
        let end = self.pos + tokens * 4;
        if end > self.bytes.len() {
            return Err(ShaderError::Truncated {
                token_index: self.bytes.len() / 4,
            });
        }
        self.pos = end;
        Ok(())
    }
}

fn check_index(reg: Register, token_index: usize) -> Result<(), ShaderError> {
    if reg.number >= MAX_REGISTER_SLOTS {
        return Err(ShaderError::RegisterIndexOutOfRange {
            token_index,
            kind: reg.kind,
            number: reg.number,
        });
    }
    Ok(())
}

fn register_error(token_index: usize) -> impl FnOnce(RegisterDecodeError) -> ShaderError {
    move |source| ShaderError::Register {
        token_index,
        source,
    }
}

struct Decoder<'a> {
    reader: TokenReader<'a>,
}

impl Decoder<'_> {
    fn dest(&mut self) -> Result<DestRegister, ShaderError> {
        let token_index = self.reader.token_index();
        let token = self.reader.read_u32()?;
        let dest = DestRegister::decode(token).map_err(register_error(token_index))?;
        check_index(dest.reg, token_index)?;
        Ok(dest)
    }

    fn src(&mut self) -> Result<SourceRegister, ShaderError> {
        let token_index = self.reader.token_index();
        let token = self.reader.read_u32()?;
        let src = SourceRegister::decode(token).map_err(register_error(token_index))?;
        check_index(src.reg, token_index)?;
        Ok(src)
    }

    fn binary(&mut self, op: BinaryOpKind) -> Result<Op, ShaderError> {
        Ok(Op::Binary {
            op,
            dest: self.dest()?,
            a: self.src()?,
            b: self.src()?,
        })
    }

    fn unary(&mut self, op: UnaryOpKind) -> Result<Op, ShaderError> {
        Ok(Op::Unary {
            op,
            dest: self.dest()?,
            src: self.src()?,
        })
    }

    fn ternary(&mut self, op: TernaryOpKind) -> Result<Op, ShaderError> {
        Ok(Op::Ternary {
            op,
            dest: self.dest()?,
            a: self.src()?,
            b: self.src()?,
            c: self.src()?,
        })
    }

    fn dcl(&mut self) -> Result<Op, ShaderError> {
        let dcl_token = self.reader.read_u32()?;
        Ok(Op::DefVar {
            texture_kind: TextureKind::from_dcl_token(dcl_token),
            dest: self.dest()?,
        })
    }

    fn texld(&mut self) -> Result<Op, ShaderError> {
        let dest = self.dest()?;
        let coord = self.src()?;
        let sampler = self.src()?;
        Ok(Op::TexLoad {
            dest,
            sampler,
            coord,
        })
    }

    fn def(&mut self) -> Result<Op, ShaderError> {
        let token_index = self.reader.token_index();
        let dest = self.dest()?;
        let value = Vec4::new(
            self.reader.read_f32()?,
            self.reader.read_f32()?,
            self.reader.read_f32()?,
            self.reader.read_f32()?,
        );
        if dest.kind() != RegisterKind::Constant {
            return Err(ShaderError::DefNonConstant {
                token_index,
                kind: dest.kind(),
            });
        }
        if !dest.write_mask.is_full() {
            return Err(ShaderError::DefPartialMask {
                token_index,
                mask: dest.write_mask,
            });
        }
        Ok(Op::SetConst {
            index: dest.number(),
            value,
        })
    }

    fn instruction(&mut self, opcode: u16, token_index: usize) -> Result<Op, ShaderError> {
        match opcode {
            0x00 => Ok(Op::Nop),
            0x01 => Ok(Op::Mov {
                dest: self.dest()?,
                src: self.src()?,
            }),
            0x02 => self.binary(BinaryOpKind::Add),
            0x03 => self.binary(BinaryOpKind::Sub),
            0x04 => self.ternary(TernaryOpKind::Mad),
            0x05 => self.binary(BinaryOpKind::Mul),
            0x06 => self.unary(UnaryOpKind::Rcp),
            0x07 => self.unary(UnaryOpKind::Rsq),
            0x08 => self.binary(BinaryOpKind::Dp3),
            0x09 => self.binary(BinaryOpKind::Dp4),
            0x0A => self.binary(BinaryOpKind::Min),
            0x0B => self.binary(BinaryOpKind::Max),
            0x0E => self.unary(UnaryOpKind::Exp),
            0x0F => self.unary(UnaryOpKind::Log),
            0x12 => self.ternary(TernaryOpKind::Lrp),
            0x13 => self.unary(UnaryOpKind::Frc),
            0x1F => self.dcl(),
            0x23 => self.unary(UnaryOpKind::Abs),
            0x25 => self.ternary(TernaryOpKind::SinCos),
            0x42 => self.texld(), // D3DSIO_TEX
            0x51 => self.def(),
            0x58 => self.ternary(TernaryOpKind::Cmp),
            // D3DSIO_DP2ADD is 0x59; older assemblers emitted 0x5A.
            0x59 | 0x5A => self.ternary(TernaryOpKind::Dp2Add),
            _ => Err(ShaderError::UnsupportedOpcode {
                opcode,
                token_index,
            }),
        }
    }
}

/// Decodes a `ps_2_0` token stream.
///
/// Decoding stops at the end token or at the end of the buffer; anything after the end token is
/// ignored. Any malformed token aborts the whole decode.
pub fn decode(bytes: &[u8]) -> Result<Program, ShaderError> {
    if bytes.len() > MAX_SHADER_BYTECODE_BYTES {
        return Err(ShaderError::BytecodeTooLarge {
            len: bytes.len(),
            max: MAX_SHADER_BYTECODE_BYTES,
        });
    }
    if bytes.is_empty() {
        return Err(ShaderError::Empty);
    }

    let mut dec = Decoder {
        reader: TokenReader::new(bytes),
    };
    let version = ShaderVersion::decode(dec.reader.read_u32()?)?;

    let mut instructions = Vec::new();
    while !dec.reader.at_end() {
        let token_index = dec.reader.token_index();
        let token = dec.reader.read_u32()?;
        let opcode = (token & 0xFFFF) as u16;
        if opcode == END_TOKEN {
            break;
        }
        if opcode == COMMENT_TOKEN {
            let len = ((token >> 16) & 0x7FFF) as usize;
            debug!(token_index, len, "skipping comment block");
            dec.reader.skip(len)?;
            continue;
        }

        let op = dec.instruction(opcode, token_index)?;
        let mut ins = Instruction::new(op);
        if token & PREDICATED_BIT != 0 {
            ins = ins.with_predicate(dec.src()?);
        }
        instructions.push(ins);
    }

    debug!(
        %version,
        instructions = instructions.len(),
        "decoded pixel shader"
    );
    Ok(Program {
        version,
        instructions,
    })
}
