//! Bitwise instructions: and, or, xor, shifts and rotations.
//!
//! Shift and rotate counts are taken modulo the operand width.

use super::{RuntimeError, Stack, Value};

/// i32.and
pub fn i32_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1 & c2));
    Ok(())
}

/// i32.or
pub fn i32_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1 | c2));
    Ok(())
}

/// i32.xor
pub fn i32_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1 ^ c2));
    Ok(())
}

/// i32.shl
/// 1. Pop value c2 (shift count) from stack
/// 2. Pop value c1 from stack
/// 3. Let k be c2 modulo 32
/// 4. Push c1 shifted left by k bits
pub fn i32_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.wrapping_shl(c2 as u32)));
    Ok(())
}

/// i32.shr_s - Arithmetic shift right, replicating the sign bit
pub fn i32_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.wrapping_shr(c2 as u32)));
    Ok(())
}

/// i32.shr_u - Logical shift right, filling with zeros
pub fn i32_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()? as u32;
    stack.push_value(Value::I32(c1.wrapping_shr(c2 as u32) as i32));
    Ok(())
}

pub fn i32_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.rotate_left(c2 as u32 % 32)));
    Ok(())
}

pub fn i32_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.rotate_right(c2 as u32 % 32)));
    Ok(())
}

/// i64.and
pub fn i64_and(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1 & c2));
    Ok(())
}

/// i64.or
pub fn i64_or(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1 | c2));
    Ok(())
}

/// i64.xor
pub fn i64_xor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1 ^ c2));
    Ok(())
}

/// i64.shl
/// Shift count is c2 modulo 64
pub fn i64_shl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.wrapping_shl(c2 as u32)));
    Ok(())
}

pub fn i64_shr_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.wrapping_shr(c2 as u32)));
    Ok(())
}

pub fn i64_shr_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()? as u64;
    stack.push_value(Value::I64(c1.wrapping_shr(c2 as u32) as i64));
    Ok(())
}

pub fn i64_rotl(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.rotate_left((c2 as u64 % 64) as u32)));
    Ok(())
}

pub fn i64_rotr(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.rotate_right((c2 as u64 % 64) as u32)));
    Ok(())
}
