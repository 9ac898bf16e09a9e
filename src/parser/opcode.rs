//! MVP opcode table: byte values, text names and the shape of the inline
//! immediates that follow each opcode in a code body.

use once_cell::sync::Lazy;

use super::reader::{decode_vs64, decode_vu32, VarintError};

/// Inline operand layout following an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    None,
    BlockType,
    VarU32,
    VarS32,
    VarS64,
    F32,
    F64,
    /// Two varuints: alignment hint and offset.
    MemArg,
    /// Type index followed by a reserved table index.
    CallIndirect,
    /// A count, then count + 1 label depths.
    BrTable,
    /// Reserved memory index byte of memory.size / memory.grow.
    Reserved,
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub immediate: Immediate,
}

macro_rules! opcodes {
    ($( $byte:literal $konst:ident $name:literal $imm:ident ;)*) => {
        $( pub const $konst: u8 = $byte; )*

        static TABLE: Lazy<[Option<OpInfo>; 256]> = Lazy::new(|| {
            let mut table = [None; 256];
            $( table[$byte as usize] = Some(OpInfo { name: $name, immediate: Immediate::$imm }); )*
            table
        });
    };
}

opcodes! {
    0x00 UNREACHABLE "unreachable" None;
    0x01 NOP "nop" None;
    0x02 BLOCK "block" BlockType;
    0x03 LOOP "loop" BlockType;
    0x04 IF "if" BlockType;
    0x05 ELSE "else" None;
    0x0b END "end" None;
    0x0c BR "br" VarU32;
    0x0d BR_IF "br_if" VarU32;
    0x0e BR_TABLE "br_table" BrTable;
    0x0f RETURN "return" None;
    0x10 CALL "call" VarU32;
    0x11 CALL_INDIRECT "call_indirect" CallIndirect;
    0x1a DROP "drop" None;
    0x1b SELECT "select" None;
    0x20 LOCAL_GET "local.get" VarU32;
    0x21 LOCAL_SET "local.set" VarU32;
    0x22 LOCAL_TEE "local.tee" VarU32;
    0x23 GLOBAL_GET "global.get" VarU32;
    0x24 GLOBAL_SET "global.set" VarU32;
    0x28 I32_LOAD "i32.load" MemArg;
    0x29 I64_LOAD "i64.load" MemArg;
    0x2a F32_LOAD "f32.load" MemArg;
    0x2b F64_LOAD "f64.load" MemArg;
    0x2c I32_LOAD8_S "i32.load8_s" MemArg;
    0x2d I32_LOAD8_U "i32.load8_u" MemArg;
    0x2e I32_LOAD16_S "i32.load16_s" MemArg;
    0x2f I32_LOAD16_U "i32.load16_u" MemArg;
    0x30 I64_LOAD8_S "i64.load8_s" MemArg;
    0x31 I64_LOAD8_U "i64.load8_u" MemArg;
    0x32 I64_LOAD16_S "i64.load16_s" MemArg;
    0x33 I64_LOAD16_U "i64.load16_u" MemArg;
    0x34 I64_LOAD32_S "i64.load32_s" MemArg;
    0x35 I64_LOAD32_U "i64.load32_u" MemArg;
    0x36 I32_STORE "i32.store" MemArg;
    0x37 I64_STORE "i64.store" MemArg;
    0x38 F32_STORE "f32.store" MemArg;
    0x39 F64_STORE "f64.store" MemArg;
    0x3a I32_STORE8 "i32.store8" MemArg;
    0x3b I32_STORE16 "i32.store16" MemArg;
    0x3c I64_STORE8 "i64.store8" MemArg;
    0x3d I64_STORE16 "i64.store16" MemArg;
    0x3e I64_STORE32 "i64.store32" MemArg;
    0x3f MEMORY_SIZE "memory.size" Reserved;
    0x40 MEMORY_GROW "memory.grow" Reserved;
    0x41 I32_CONST "i32.const" VarS32;
    0x42 I64_CONST "i64.const" VarS64;
    0x43 F32_CONST "f32.const" F32;
    0x44 F64_CONST "f64.const" F64;
    0x45 I32_EQZ "i32.eqz" None;
    0x46 I32_EQ "i32.eq" None;
    0x47 I32_NE "i32.ne" None;
    0x48 I32_LT_S "i32.lt_s" None;
    0x49 I32_LT_U "i32.lt_u" None;
    0x4a I32_GT_S "i32.gt_s" None;
    0x4b I32_GT_U "i32.gt_u" None;
    0x4c I32_LE_S "i32.le_s" None;
    0x4d I32_LE_U "i32.le_u" None;
    0x4e I32_GE_S "i32.ge_s" None;
    0x4f I32_GE_U "i32.ge_u" None;
    0x50 I64_EQZ "i64.eqz" None;
    0x51 I64_EQ "i64.eq" None;
    0x52 I64_NE "i64.ne" None;
    0x53 I64_LT_S "i64.lt_s" None;
    0x54 I64_LT_U "i64.lt_u" None;
    0x55 I64_GT_S "i64.gt_s" None;
    0x56 I64_GT_U "i64.gt_u" None;
    0x57 I64_LE_S "i64.le_s" None;
    0x58 I64_LE_U "i64.le_u" None;
    0x59 I64_GE_S "i64.ge_s" None;
    0x5a I64_GE_U "i64.ge_u" None;
    0x5b F32_EQ "f32.eq" None;
    0x5c F32_NE "f32.ne" None;
    0x5d F32_LT "f32.lt" None;
    0x5e F32_GT "f32.gt" None;
    0x5f F32_LE "f32.le" None;
    0x60 F32_GE "f32.ge" None;
    0x61 F64_EQ "f64.eq" None;
    0x62 F64_NE "f64.ne" None;
    0x63 F64_LT "f64.lt" None;
    0x64 F64_GT "f64.gt" None;
    0x65 F64_LE "f64.le" None;
    0x66 F64_GE "f64.ge" None;
    0x67 I32_CLZ "i32.clz" None;
    0x68 I32_CTZ "i32.ctz" None;
    0x69 I32_POPCNT "i32.popcnt" None;
    0x6a I32_ADD "i32.add" None;
    0x6b I32_SUB "i32.sub" None;
    0x6c I32_MUL "i32.mul" None;
    0x6d I32_DIV_S "i32.div_s" None;
    0x6e I32_DIV_U "i32.div_u" None;
    0x6f I32_REM_S "i32.rem_s" None;
    0x70 I32_REM_U "i32.rem_u" None;
    0x71 I32_AND "i32.and" None;
    0x72 I32_OR "i32.or" None;
    0x73 I32_XOR "i32.xor" None;
    0x74 I32_SHL "i32.shl" None;
    0x75 I32_SHR_S "i32.shr_s" None;
    0x76 I32_SHR_U "i32.shr_u" None;
    0x77 I32_ROTL "i32.rotl" None;
    0x78 I32_ROTR "i32.rotr" None;
    0x79 I64_CLZ "i64.clz" None;
    0x7a I64_CTZ "i64.ctz" None;
    0x7b I64_POPCNT "i64.popcnt" None;
    0x7c I64_ADD "i64.add" None;
    0x7d I64_SUB "i64.sub" None;
    0x7e I64_MUL "i64.mul" None;
    0x7f I64_DIV_S "i64.div_s" None;
    0x80 I64_DIV_U "i64.div_u" None;
    0x81 I64_REM_S "i64.rem_s" None;
    0x82 I64_REM_U "i64.rem_u" None;
    0x83 I64_AND "i64.and" None;
    0x84 I64_OR "i64.or" None;
    0x85 I64_XOR "i64.xor" None;
    0x86 I64_SHL "i64.shl" None;
    0x87 I64_SHR_S "i64.shr_s" None;
    0x88 I64_SHR_U "i64.shr_u" None;
    0x89 I64_ROTL "i64.rotl" None;
    0x8a I64_ROTR "i64.rotr" None;
    0x8b F32_ABS "f32.abs" None;
    0x8c F32_NEG "f32.neg" None;
    0x8d F32_CEIL "f32.ceil" None;
    0x8e F32_FLOOR "f32.floor" None;
    0x8f F32_TRUNC "f32.trunc" None;
    0x90 F32_NEAREST "f32.nearest" None;
    0x91 F32_SQRT "f32.sqrt" None;
    0x92 F32_ADD "f32.add" None;
    0x93 F32_SUB "f32.sub" None;
    0x94 F32_MUL "f32.mul" None;
    0x95 F32_DIV "f32.div" None;
    0x96 F32_MIN "f32.min" None;
    0x97 F32_MAX "f32.max" None;
    0x98 F32_COPYSIGN "f32.copysign" None;
    0x99 F64_ABS "f64.abs" None;
    0x9a F64_NEG "f64.neg" None;
    0x9b F64_CEIL "f64.ceil" None;
    0x9c F64_FLOOR "f64.floor" None;
    0x9d F64_TRUNC "f64.trunc" None;
    0x9e F64_NEAREST "f64.nearest" None;
    0x9f F64_SQRT "f64.sqrt" None;
    0xa0 F64_ADD "f64.add" None;
    0xa1 F64_SUB "f64.sub" None;
    0xa2 F64_MUL "f64.mul" None;
    0xa3 F64_DIV "f64.div" None;
    0xa4 F64_MIN "f64.min" None;
    0xa5 F64_MAX "f64.max" None;
    0xa6 F64_COPYSIGN "f64.copysign" None;
    0xa7 I32_WRAP_I64 "i32.wrap_i64" None;
    0xa8 I32_TRUNC_F32_S "i32.trunc_f32_s" None;
    0xa9 I32_TRUNC_F32_U "i32.trunc_f32_u" None;
    0xaa I32_TRUNC_F64_S "i32.trunc_f64_s" None;
    0xab I32_TRUNC_F64_U "i32.trunc_f64_u" None;
    0xac I64_EXTEND_I32_S "i64.extend_i32_s" None;
    0xad I64_EXTEND_I32_U "i64.extend_i32_u" None;
    0xae I64_TRUNC_F32_S "i64.trunc_f32_s" None;
    0xaf I64_TRUNC_F32_U "i64.trunc_f32_u" None;
    0xb0 I64_TRUNC_F64_S "i64.trunc_f64_s" None;
    0xb1 I64_TRUNC_F64_U "i64.trunc_f64_u" None;
    0xb2 F32_CONVERT_I32_S "f32.convert_i32_s" None;
    0xb3 F32_CONVERT_I32_U "f32.convert_i32_u" None;
    0xb4 F32_CONVERT_I64_S "f32.convert_i64_s" None;
    0xb5 F32_CONVERT_I64_U "f32.convert_i64_u" None;
    0xb6 F32_DEMOTE_F64 "f32.demote_f64" None;
    0xb7 F64_CONVERT_I32_S "f64.convert_i32_s" None;
    0xb8 F64_CONVERT_I32_U "f64.convert_i32_u" None;
    0xb9 F64_CONVERT_I64_S "f64.convert_i64_s" None;
    0xba F64_CONVERT_I64_U "f64.convert_i64_u" None;
    0xbb F64_PROMOTE_F32 "f64.promote_f32" None;
    0xbc I32_REINTERPRET_F32 "i32.reinterpret_f32" None;
    0xbd I64_REINTERPRET_F64 "i64.reinterpret_f64" None;
    0xbe F32_REINTERPRET_I32 "f32.reinterpret_i32" None;
    0xbf F64_REINTERPRET_I64 "f64.reinterpret_i64" None;
}

pub fn info(op: u8) -> Option<OpInfo> {
    TABLE[op as usize]
}

pub fn name(op: u8) -> &'static str {
    info(op).map_or("<invalid>", |info| info.name)
}

/// Returns the offset just past the immediates of `op`, whose opcode byte
/// sits immediately before `pos`. Unknown opcodes carry no immediates.
pub fn skip_immediates(code: &[u8], pos: usize, op: u8) -> Result<usize, VarintError> {
    let immediate = info(op).map_or(Immediate::None, |info| info.immediate);
    let fixed = |width: usize| {
        if pos + width <= code.len() {
            Ok(pos + width)
        } else {
            Err(VarintError::UnexpectedEof)
        }
    };
    match immediate {
        Immediate::None => Ok(pos),
        Immediate::BlockType | Immediate::VarS32 | Immediate::VarS64 => {
            decode_vs64(code, pos).map(|(_, next)| next)
        }
        Immediate::VarU32 | Immediate::Reserved => decode_vu32(code, pos).map(|(_, next)| next),
        Immediate::MemArg | Immediate::CallIndirect => {
            let (_, next) = decode_vu32(code, pos)?;
            decode_vu32(code, next).map(|(_, next)| next)
        }
        Immediate::BrTable => {
            let (count, mut next) = decode_vu32(code, pos)?;
            for _ in 0..=count {
                next = decode_vu32(code, next)?.1;
            }
            Ok(next)
        }
        Immediate::F32 => fixed(4),
        Immediate::F64 => fixed(8),
    }
}
