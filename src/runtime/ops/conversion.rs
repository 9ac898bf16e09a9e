//! Conversion instructions: wrap, extend, truncate, convert, demote, promote
//! and reinterpret.

use super::{RuntimeError, Stack, Value};

// ============================================================================
// Integer width conversions
// ============================================================================

/// i32.wrap_i64 - Keep the low 32 bits
pub fn i32_wrap_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::I32(value as i32));
    Ok(())
}

/// i64.extend_i32_s - Sign-extend
pub fn i64_extend_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::I64(value as i64));
    Ok(())
}

/// i64.extend_i32_u - Zero-extend
pub fn i64_extend_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::I64(value as u32 as i64));
    Ok(())
}

// ============================================================================
// Truncation (float to integer, trapping)
// ============================================================================

/// Rejects NaN and values whose truncation falls outside `(lower, upper)`,
/// both bounds exclusive.
fn check_trunc(value: f64, lower: f64, upper: f64) -> Result<f64, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::FloatUnrepresentable("NaN".to_string()));
    }
    let truncated = value.trunc();
    if truncated <= lower || truncated >= upper {
        return Err(RuntimeError::FloatUnrepresentable(value.to_string()));
    }
    Ok(truncated)
}

const I32_LOWER_S: f64 = -2147483649.0;
const I32_UPPER_S: f64 = 2147483648.0;
const I32_UPPER_U: f64 = 4294967296.0;
const I64_UPPER_S: f64 = 9223372036854775808.0;
const I64_UPPER_U: f64 = 18446744073709551616.0;

/// i32.trunc_f32_s
/// 1. Pop value c1 from stack
/// 2. If c1 is NaN or infinite, trap
/// 3. Truncate toward zero; if the result is outside i32 range, trap
/// 4. Push result to stack
pub fn i32_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    let truncated = check_trunc(value as f64, I32_LOWER_S, I32_UPPER_S)?;
    stack.push_value(Value::I32(truncated as i32));
    Ok(())
}

/// i32.trunc_f32_u
/// Values in (-1, 0] truncate to 0.
pub fn i32_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    let truncated = check_trunc(value as f64, -1.0, I32_UPPER_U)?;
    stack.push_value(Value::I32(truncated as u32 as i32));
    Ok(())
}

pub fn i32_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    let truncated = check_trunc(value, I32_LOWER_S, I32_UPPER_S)?;
    stack.push_value(Value::I32(truncated as i32));
    Ok(())
}

pub fn i32_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    let truncated = check_trunc(value, -1.0, I32_UPPER_U)?;
    stack.push_value(Value::I32(truncated as u32 as i32));
    Ok(())
}

// i64::MIN is exactly representable as a float, so the lower bound is inclusive.
fn check_trunc_i64_s(value: f64) -> Result<i64, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::FloatUnrepresentable("NaN".to_string()));
    }
    let truncated = value.trunc();
    if truncated < -I64_UPPER_S || truncated >= I64_UPPER_S {
        return Err(RuntimeError::FloatUnrepresentable(value.to_string()));
    }
    Ok(truncated as i64)
}

pub fn i64_trunc_f32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::I64(check_trunc_i64_s(value as f64)?));
    Ok(())
}

pub fn i64_trunc_f32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    let truncated = check_trunc(value as f64, -1.0, I64_UPPER_U)?;
    stack.push_value(Value::I64(truncated as u64 as i64));
    Ok(())
}

pub fn i64_trunc_f64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::I64(check_trunc_i64_s(value)?));
    Ok(())
}

pub fn i64_trunc_f64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    let truncated = check_trunc(value, -1.0, I64_UPPER_U)?;
    stack.push_value(Value::I64(truncated as u64 as i64));
    Ok(())
}

// ============================================================================
// Integer to float
// ============================================================================

pub fn f32_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::F32(value as f32));
    Ok(())
}

pub fn f32_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::F32(value as u32 as f32));
    Ok(())
}

pub fn f32_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::F32(value as f32));
    Ok(())
}

pub fn f32_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::F32(value as u64 as f32));
    Ok(())
}

pub fn f64_convert_i32_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::F64(value as f64));
    Ok(())
}

pub fn f64_convert_i32_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::F64(value as u32 as f64));
    Ok(())
}

pub fn f64_convert_i64_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::F64(value as f64));
    Ok(())
}

pub fn f64_convert_i64_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::F64(value as u64 as f64));
    Ok(())
}

// ============================================================================
// Float precision
// ============================================================================

/// f32.demote_f64 - Round to nearest f32
pub fn f32_demote_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F32(value as f32));
    Ok(())
}

/// f64.promote_f32 - Exact widening
pub fn f64_promote_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F64(value as f64));
    Ok(())
}

// ============================================================================
// Reinterpretation (bit pattern unchanged)
// ============================================================================

pub fn i32_reinterpret_f32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::I32(value.to_bits() as i32));
    Ok(())
}

pub fn i64_reinterpret_f64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::I64(value.to_bits() as i64));
    Ok(())
}

pub fn f32_reinterpret_i32(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::F32(f32::from_bits(value as u32)));
    Ok(())
}

pub fn f64_reinterpret_i64(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::F64(f64::from_bits(value as u64)));
    Ok(())
}
