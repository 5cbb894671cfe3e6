//! Pixel shader 2.0 bytecode decoding and execution.
//!
//! A `ps_2_0` token stream is decoded into a flat [`Instruction`] list ([`decode`]) and then
//! executed once per output pixel by one of two backends:
//!
//! - [`Interpreter`]: walks the instruction list for every pixel against a freshly reset
//!   register context.
//! - [`jit`]: lowers the instruction list once into a register-allocated kernel of prebuilt
//!   closures ([`CompiledShader`]) which then runs the whole image traversal itself.
//!
//! Both backends share the per-op math in `ops` and the pixel traversal in [`walk`], so for a
//! given program and binding context they produce the same image.

pub mod binding;
pub mod cache;
pub mod decode;
pub mod error;
pub mod instruction;
pub mod interp;
pub mod jit;
pub mod limits;
mod ops;
pub mod register;
pub mod render;
pub mod texture;
pub mod vec4;
pub mod walk;

pub use binding::ShaderData;
pub use cache::{KernelCache, KernelLookup, KernelSource};
pub use decode::{decode, Program, ShaderVersion};
pub use error::{ErrorKind, ShaderError};
pub use instruction::{BinaryOpKind, Instruction, Op, TernaryOpKind, TextureKind, UnaryOpKind};
pub use interp::Interpreter;
pub use jit::{compile, CompiledShader};
pub use register::{
    make_swizzle, make_write_mask, DestRegister, Register, RegisterKind, SourceRegister,
    SrcModifier, Swizzle, WriteMask,
};
pub use render::{render, Backend};
pub use texture::{RgbaTexture, RowClamp, Sampler, Texture};
pub use vec4::Vec4;
