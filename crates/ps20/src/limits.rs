//! Centralized limits for `ps_2_0` decoding and execution.

/// Maximum accepted shader bytecode length in bytes.
///
/// Real `ps_2_0` programs are a few hundred tokens at most; this only bounds the work done on a
/// corrupted or hostile blob.
pub const MAX_SHADER_BYTECODE_BYTES: usize = 256 * 1024; // 256 KiB

/// Number of addressable registers per register file (`r#`, `c#`, `t#`, `oC#`).
///
/// Every register referenced by a decoded instruction has an index below this.
pub const MAX_REGISTER_SLOTS: u32 = 32;

/// Number of sampler slots in a [`crate::ShaderData`] binding context.
pub const MAX_SAMPLER_SLOTS: u32 = 32;

/// Number of output texture slots in a [`crate::ShaderData`] binding context.
pub const MAX_OUTPUT_TEXTURE_SLOTS: u32 = 1;
