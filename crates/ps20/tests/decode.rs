mod common;

use common::*;
use pretty_assertions::assert_eq;
use ps20::{
    decode, BinaryOpKind, DestRegister, ErrorKind, Instruction, Op, Register, RegisterKind,
    ShaderError, SourceRegister, SrcModifier, Swizzle, TernaryOpKind, TextureKind, WriteMask,
};

#[test]
fn minimal_mov_round_trips() {
    let program = decode(&shader(&[
        opcode_token(0x01, 2),
        dst_token(COLOR_OUT, 0, 0x3),
        src_token(TEMP, 7, WZYX, NEG),
    ]))
    .unwrap();

    assert_eq!(program.instructions.len(), 1);
    let Op::Mov { dest, src } = program.instructions[0].op else {
        panic!("expected mov, got {:?}", program.instructions[0]);
    };
    assert_eq!(dest.reg, Register::new(RegisterKind::ColorOut, 0));
    assert_eq!(dest.write_mask, WriteMask::RG);
    assert!(!dest.partial_precision);
    assert!(!dest.centroid);
    assert_eq!(src.reg, Register::new(RegisterKind::Temp, 7));
    assert_eq!(src.swizzle, Swizzle(WZYX));
    assert_eq!(src.swizzle.selectors(), [3, 2, 1, 0]);
    assert_eq!(src.modifier, SrcModifier::Negate);
}

#[test]
fn register_type_codes() {
    for code in 0u8..32 {
        let result = decode(&shader(&[
            opcode_token(0x01, 2),
            dst_token(TEMP, 0, 0xF),
            src_token(code, 1, XYZW, 0),
        ]));
        match code {
            4..=6 | 20.. => {
                let err = result.unwrap_err();
                assert!(
                    matches!(err, ShaderError::Register { token_index: 3, .. }),
                    "code {code}: {err:?}"
                );
                assert_eq!(err.kind(), ErrorKind::MalformedBytecode);
            }
            // Upper constant banks put the register number past the addressable range.
            11..=13 => assert!(matches!(
                result.unwrap_err(),
                ShaderError::RegisterIndexOutOfRange {
                    kind: RegisterKind::Constant,
                    ..
                }
            )),
            _ => assert!(result.is_ok(), "code {code}"),
        }
    }
}

#[test]
fn upper_constant_banks_offset_number() {
    for (code, offset) in [(11u8, 2048u32), (12, 4096), (13, 6144)] {
        let reg = SourceRegister::decode(src_token(code, 9, XYZW, 0)).unwrap();
        assert_eq!(reg.reg, Register::new(RegisterKind::Constant, 9 + offset));
    }
}

#[test]
fn every_supported_opcode() {
    let dst = dst_token(TEMP, 0, 0xF);
    let (a, b, c) = (src(TEMP, 1), src(CONST, 2), src(TEMP, 3));
    let cases = [
        (vec![opcode_token(0x00, 0)], "nop"),
        (op(0x01, dst, &[a]), "mov"),
        (op(0x02, dst, &[a, b]), "add"),
        (op(0x03, dst, &[a, b]), "sub"),
        (op(0x04, dst, &[a, b, c]), "mad"),
        (op(0x05, dst, &[a, b]), "mul"),
        (op(0x06, dst, &[a]), "rcp"),
        (op(0x07, dst, &[a]), "rsq"),
        (op(0x08, dst, &[a, b]), "dp3"),
        (op(0x09, dst, &[a, b]), "dp4"),
        (op(0x0A, dst, &[a, b]), "min"),
        (op(0x0B, dst, &[a, b]), "max"),
        (op(0x0E, dst, &[a]), "exp"),
        (op(0x0F, dst, &[a]), "log"),
        (op(0x12, dst, &[a, b, c]), "lrp"),
        (op(0x13, dst, &[a]), "frc"),
        (op(0x23, dst, &[a]), "abs"),
        (op(0x25, dst_token(TEMP, 0, 0x3), &[a, b, c]), "sincos"),
        (op(0x58, dst, &[a, b, c]), "cmp"),
        (op(0x59, dst, &[a, b, c]), "dp2add"),
        (op(0x5A, dst, &[a, b, c]), "dp2add"),
    ];

    for (tokens, mnemonic) in cases {
        let program = decode(&shader(&tokens)).unwrap();
        assert_eq!(program.instructions.len(), 1, "{tokens:08x?}");
        let text = program.instructions[0].to_string();
        assert_eq!(text.split_whitespace().next(), Some(mnemonic), "{text}");
    }

    let program = decode(&shader(&op(0x09, dst, &[a, b]))).unwrap();
    assert!(matches!(
        program.instructions[0].op,
        Op::Binary {
            op: BinaryOpKind::Dp4,
            ..
        }
    ));
    let program = decode(&shader(&op(0x59, dst, &[a, b, c]))).unwrap();
    assert!(matches!(
        program.instructions[0].op,
        Op::Ternary {
            op: TernaryOpKind::Dp2Add,
            ..
        }
    ));
}

#[test]
fn texld_and_dcl_shapes() {
    let mut body = dcl_t0_s0();
    body.extend(texld(dst_token(TEMP, 2, 0xF)));
    let program = decode(&shader(&body)).unwrap();

    assert_eq!(
        program.instructions,
        vec![
            Instruction::new(Op::DefVar {
                texture_kind: TextureKind::Unknown,
                dest: DestRegister::new(RegisterKind::Texture, 0).with_mask(WriteMask::RG),
            }),
            Instruction::new(Op::DefVar {
                texture_kind: TextureKind::Text2d,
                dest: DestRegister::new(RegisterKind::SamplerState, 0),
            }),
            Instruction::new(Op::TexLoad {
                dest: DestRegister::new(RegisterKind::Temp, 2),
                sampler: SourceRegister::new(RegisterKind::SamplerState, 0),
                coord: SourceRegister::new(RegisterKind::Texture, 0),
            }),
        ]
    );
}

#[test]
fn truncated_operands_fail() {
    let mut tokens = vec![version_token(2, 0), opcode_token(0x02, 3)];
    tokens.push(dst_token(TEMP, 0, 0xF));
    tokens.push(src(TEMP, 1));
    let err = decode(&to_bytes(&tokens)).unwrap_err();
    assert_eq!(err, ShaderError::Truncated { token_index: 4 });

    let mut tokens = vec![version_token(2, 0)];
    tokens.extend(def(0, [1.0, 2.0, 3.0, 4.0]));
    tokens.truncate(tokens.len() - 1);
    assert!(matches!(
        decode(&to_bytes(&tokens)).unwrap_err(),
        ShaderError::Truncated { .. }
    ));
}

#[test]
fn oversized_bytecode_is_rejected() {
    let bytes = vec![0u8; ps20::limits::MAX_SHADER_BYTECODE_BYTES + 4];
    assert!(matches!(
        decode(&bytes).unwrap_err(),
        ShaderError::BytecodeTooLarge { .. }
    ));
}

#[test]
fn modifier_field_is_validated() {
    let err = decode(&shader(&op(
        0x01,
        dst_token(TEMP, 0, 0xF),
        &[src_token(TEMP, 1, XYZW, 0xE)],
    )))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedBytecode);

    // Recognized modifiers decode; whether a backend implements them is a separate question.
    let program = decode(&shader(&op(
        0x01,
        dst_token(TEMP, 0, 0xF),
        &[src_token(TEMP, 1, XYZW, 0xB)],
    )))
    .unwrap();
    let Op::Mov { src, .. } = program.instructions[0].op else {
        panic!("expected mov");
    };
    assert_eq!(src.modifier, SrcModifier::Abs);
}

#[test]
fn predicated_instruction() {
    let program = decode(&shader(&[
        opcode_token(0x02, 4) | 0x1000_0000,
        dst_token(TEMP, 0, 0xF),
        src(TEMP, 1),
        src(TEMP, 2),
        src_token(PREDICATE, 0, XXXX, 0),
    ]))
    .unwrap();
    let ins = &program.instructions[0];
    assert_eq!(
        ins.predicate,
        Some(SourceRegister::new(RegisterKind::Predicate, 0).with_swizzle(Swizzle(XXXX)))
    );
    assert_eq!(ins.to_string(), "(p0.xxxx) add r0, r1, r2");
}

#[test]
fn disassembly_listing() {
    let mut body = def(0, [1.0, 0.5, 0.0, 1.0]);
    body.extend(dcl_t0_s0());
    body.extend(texld(dst_token(TEMP, 0, 0xF)));
    body.extend(op(
        0x04,
        dst_token(COLOR_OUT, 0, 0x7),
        &[src(TEMP, 0), src_token(CONST, 0, XXXX, NEG), src(CONST, 1)],
    ));
    // A comment block in the middle is skipped.
    body.extend([0x0001_FFFE, 0x4141_4141]);
    body.extend(op(0x01, dst_token(COLOR_OUT, 0, 0x8), &[src(CONST, 0)]));

    let program = decode(&shader(&body)).unwrap();
    assert_eq!(
        program.disassemble(),
        "ps_2_0\n\
         def c0, 1, 0.5, 0, 1\n\
         dcl t0.xy\n\
         dcl_2d s0\n\
         texld r0, t0, s0\n\
         mad oC0.xyz, r0, -c0.xxxx, c1\n\
         mov oC0.w, c0\n"
    );
}
