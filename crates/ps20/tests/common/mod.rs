#![allow(dead_code)]

use ps20::{decode, render, Backend, Program, RgbaTexture, Sampler, ShaderData, ShaderError, Vec4};

pub const TEMP: u8 = 0;
pub const INPUT: u8 = 1;
pub const CONST: u8 = 2;
pub const TEXTURE: u8 = 3;
pub const COLOR_OUT: u8 = 8;
pub const SAMPLER: u8 = 10;
pub const PREDICATE: u8 = 19;

pub const XYZW: u8 = 0xE4;
pub const XXXX: u8 = 0x00;
pub const WZYX: u8 = 0x1B;

pub const NEG: u8 = 1;

pub const END: u32 = 0x0000_FFFF;

pub fn version_token(major: u8, minor: u8) -> u32 {
    0xFFFF_0000 | ((major as u32) << 8) | (minor as u32)
}

// The decoder relies on fixed operand shapes, but real assemblers also fill in the instruction
// length (bits 24..27, counting the opcode token), so the helpers do too.
pub fn opcode_token(op: u16, operand_tokens: u8) -> u32 {
    (op as u32) | (((operand_tokens as u32) + 1) << 24)
}

pub fn reg_token(regtype: u8, index: u32) -> u32 {
    let low3 = (regtype as u32) & 0x7;
    let high2 = (regtype as u32) & 0x18;
    0x8000_0000 | (low3 << 28) | (high2 << 8) | (index & 0x7FF)
}

pub fn dst_token(regtype: u8, index: u32, mask: u8) -> u32 {
    reg_token(regtype, index) | ((mask as u32) << 16)
}

pub fn src_token(regtype: u8, index: u32, swizzle: u8, srcmod: u8) -> u32 {
    reg_token(regtype, index) | ((swizzle as u32) << 16) | ((srcmod as u32) << 24)
}

pub fn src(regtype: u8, index: u32) -> u32 {
    src_token(regtype, index, XYZW, 0)
}

pub fn to_bytes(tokens: &[u32]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

/// `ps_2_0` header, the given body, and the end token.
pub fn shader(body: &[u32]) -> Vec<u8> {
    let mut tokens = vec![version_token(2, 0)];
    tokens.extend_from_slice(body);
    tokens.push(END);
    to_bytes(&tokens)
}

pub fn def(index: u32, value: [f32; 4]) -> Vec<u32> {
    let mut tokens = vec![opcode_token(0x51, 5), dst_token(CONST, index, 0xF)];
    tokens.extend(value.iter().map(|v| v.to_bits()));
    tokens
}

/// `dcl t0.xy` and `dcl_2d s0`.
pub fn dcl_t0_s0() -> Vec<u32> {
    vec![
        opcode_token(0x1F, 2),
        0x8000_0000,
        dst_token(TEXTURE, 0, 0x3),
        opcode_token(0x1F, 2),
        0x9000_0000,
        dst_token(SAMPLER, 0, 0xF),
    ]
}

/// `texld dst, t0, s0`
pub fn texld(dst: u32) -> Vec<u32> {
    vec![opcode_token(0x42, 3), dst, src(TEXTURE, 0), src(SAMPLER, 0)]
}

pub fn op(opcode: u16, dst: u32, srcs: &[u32]) -> Vec<u32> {
    let mut tokens = vec![opcode_token(opcode, 1 + srcs.len() as u8), dst];
    tokens.extend_from_slice(srcs);
    tokens
}

pub fn program(body: &[u32]) -> Program {
    decode(&shader(body)).expect("test shader decodes")
}

/// Deterministic input texture with every channel varying across the image.
pub fn gradient(width: u32, height: u32) -> RgbaTexture {
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = x * 255 / width.saturating_sub(1).max(1);
            let g = y * 255 / height.saturating_sub(1).max(1);
            let b = (x * 37 + y * 91) % 256;
            let a = 255 - ((x * 13 + y * 7) % 128);
            texels.push(r | (g << 8) | (b << 16) | (a << 24));
        }
    }
    RgbaTexture::from_texels(width, height, texels).expect("texel count matches")
}

#[derive(Debug, Clone)]
pub struct Setup {
    pub width: u32,
    pub height: u32,
    pub input: Option<RgbaTexture>,
    pub constants: Vec<(u32, Vec4)>,
}

impl Setup {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            input: None,
            constants: Vec::new(),
        }
    }

    pub fn input(mut self, texture: RgbaTexture) -> Self {
        self.input = Some(texture);
        self
    }

    pub fn constant(mut self, index: u32, value: impl Into<Vec4>) -> Self {
        self.constants.push((index, value.into()));
        self
    }

    pub fn data(&self) -> ShaderData {
        let mut data = ShaderData::new();
        for &(index, value) in &self.constants {
            data.set_constant(index, value);
        }
        if let Some(input) = &self.input {
            data.set_sampler(0, Sampler::new(input.clone())).unwrap();
        }
        data.set_output_texture(0, RgbaTexture::new(self.width, self.height))
            .unwrap();
        data
    }
}

/// Renders and returns the output texels in row-major order.
pub fn render_texels(
    program: &Program,
    backend: Backend,
    setup: &Setup,
) -> Result<Vec<u32>, ShaderError> {
    let mut data = setup.data();
    render(program, &mut data, backend)?;
    let out = data.take_output_texture(0)?;
    let mut texels = Vec::with_capacity((setup.width * setup.height) as usize);
    for y in 0..out.height() {
        for x in 0..out.width() {
            texels.push(out.read(x, y));
        }
    }
    Ok(texels)
}

pub fn channels(texel: u32) -> [u8; 4] {
    texel.to_le_bytes()
}

/// Every channel of every texel within `tolerance`.
pub fn assert_texels_close(actual: &[u32], expected: &[u32], tolerance: u8) {
    assert_eq!(actual.len(), expected.len());
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        for (ca, ce) in channels(a).into_iter().zip(channels(e)) {
            assert!(
                ca.abs_diff(ce) <= tolerance,
                "texel {i}: {a:08x} vs {e:08x}"
            );
        }
    }
}

/// Renders with both backends and checks they agree.
pub fn render_both(program: &Program, setup: &Setup) -> Vec<u32> {
    let interp = render_texels(program, Backend::Interpreter, setup).expect("interpreter");
    let compiled = render_texels(program, Backend::Compiler, setup).expect("compiler");
    assert_texels_close(&compiled, &interp, 1);
    compiled
}
