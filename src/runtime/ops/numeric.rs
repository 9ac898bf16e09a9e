//! Numeric instructions: constants, integer and float arithmetic.
//!
//! Binary operations pop `c2` then `c1` and push `c1 op c2`. Integer
//! arithmetic wraps modulo 2^N. Unsigned variants reinterpret their operands
//! as the same-width unsigned type before computing.

use super::{RuntimeError, Stack, Value};

// ============================================================================
// Constants
// ============================================================================

pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), RuntimeError> {
    stack.push_value(Value::I32(value));
    Ok(())
}

pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), RuntimeError> {
    stack.push_value(Value::I64(value));
    Ok(())
}

pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), RuntimeError> {
    stack.push_value(Value::F32(value));
    Ok(())
}

pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), RuntimeError> {
    stack.push_value(Value::F64(value));
    Ok(())
}

// ============================================================================
// i32 Binary Operations
// ============================================================================

/// i32.add
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. Compute c1 + c2 modulo 2^32
/// 5. Push result to stack
pub fn i32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.wrapping_add(c2)));
    Ok(())
}

/// i32.sub
/// Computes c1 - c2 modulo 2^32
pub fn i32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.wrapping_sub(c2)));
    Ok(())
}

/// i32.mul
/// Computes c1 * c2 modulo 2^32
pub fn i32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push_value(Value::I32(c1.wrapping_mul(c2)));
    Ok(())
}

/// i32.div_s
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If c2 is 0, trap
/// 4. If c1 is INT32_MIN and c2 is -1, trap (2^31 is not representable)
/// 5. Compute signed division, truncating toward zero
/// 6. Push result to stack
pub fn i32_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    if c1 == i32::MIN && c2 == -1 {
        return Err(RuntimeError::NotRepresentable);
    }
    stack.push_value(Value::I32(c1 / c2));
    Ok(())
}

/// i32.div_u
/// Traps if c2 is 0, otherwise divides the operands as u32.
pub fn i32_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I32((c1 / c2) as i32));
    Ok(())
}

/// i32.rem_s
/// Traps if c2 is 0. The result takes the sign of the dividend, and
/// INT32_MIN rem -1 is 0.
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I32(c1.wrapping_rem(c2)));
    Ok(())
}

/// i32.rem_u
pub fn i32_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I32((c1 % c2) as i32));
    Ok(())
}

// ============================================================================
// Integer Unary Operations
// ============================================================================

/// i32.clz - Count leading zeros
pub fn i32_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::I32(value.leading_zeros() as i32));
    Ok(())
}

/// i32.ctz - Count trailing zeros
pub fn i32_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::I32(value.trailing_zeros() as i32));
    Ok(())
}

/// i32.popcnt - Count of set bits
pub fn i32_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    stack.push_value(Value::I32(value.count_ones() as i32));
    Ok(())
}

pub fn i64_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::I64(value.leading_zeros() as i64));
    Ok(())
}

pub fn i64_ctz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::I64(value.trailing_zeros() as i64));
    Ok(())
}

pub fn i64_popcnt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    stack.push_value(Value::I64(value.count_ones() as i64));
    Ok(())
}

// ============================================================================
// i64 Binary Operations
// ============================================================================

/// i64.add
/// Computes c1 + c2 modulo 2^64
pub fn i64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.wrapping_add(c2)));
    Ok(())
}

/// i64.sub
pub fn i64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.wrapping_sub(c2)));
    Ok(())
}

/// i64.mul
pub fn i64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push_value(Value::I64(c1.wrapping_mul(c2)));
    Ok(())
}

/// i64.div_s
/// Traps on a zero divisor and on INT64_MIN / -1.
pub fn i64_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    if c1 == i64::MIN && c2 == -1 {
        return Err(RuntimeError::NotRepresentable);
    }
    stack.push_value(Value::I64(c1 / c2));
    Ok(())
}

/// i64.div_u
pub fn i64_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I64((c1 / c2) as i64));
    Ok(())
}

/// i64.rem_s
pub fn i64_rem_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I64(c1.wrapping_rem(c2)));
    Ok(())
}

/// i64.rem_u
pub fn i64_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    stack.push_value(Value::I64((c1 % c2) as i64));
    Ok(())
}

// ============================================================================
// Float Unary Operations
// ============================================================================

pub fn f32_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.abs()));
    Ok(())
}

pub fn f32_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(-value));
    Ok(())
}

pub fn f32_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.sqrt()));
    Ok(())
}

pub fn f32_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.ceil()));
    Ok(())
}

pub fn f32_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.floor()));
    Ok(())
}

/// f32.trunc - Round toward zero
pub fn f32_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.trunc()));
    Ok(())
}

/// f32.nearest - Round to nearest, ties to even
pub fn f32_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    stack.push_value(Value::F32(value.round_ties_even()));
    Ok(())
}

pub fn f64_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.abs()));
    Ok(())
}

pub fn f64_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(-value));
    Ok(())
}

pub fn f64_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.sqrt()));
    Ok(())
}

pub fn f64_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.ceil()));
    Ok(())
}

pub fn f64_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.floor()));
    Ok(())
}

pub fn f64_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.trunc()));
    Ok(())
}

pub fn f64_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    stack.push_value(Value::F64(value.round_ties_even()));
    Ok(())
}

// ============================================================================
// Float Binary Operations
// ============================================================================

pub fn f32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push_value(Value::F32(c1 + c2));
    Ok(())
}

pub fn f32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push_value(Value::F32(c1 - c2));
    Ok(())
}

pub fn f32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push_value(Value::F32(c1 * c2));
    Ok(())
}

/// f32.div
/// Division by zero yields an infinity or NaN, never a trap.
pub fn f32_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push_value(Value::F32(c1 / c2));
    Ok(())
}

/// f32.min
/// A NaN operand propagates; -0.0 is less than +0.0.
pub fn f32_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    let result = if c1.is_nan() {
        c1
    } else if c2.is_nan() {
        c2
    } else if c1 == 0.0 && c2 == 0.0 && c1.is_sign_negative() != c2.is_sign_negative() {
        -0.0
    } else {
        c1.min(c2)
    };
    stack.push_value(Value::F32(result));
    Ok(())
}

/// f32.max
/// A NaN operand propagates; +0.0 is greater than -0.0.
pub fn f32_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    let result = if c1.is_nan() {
        c1
    } else if c2.is_nan() {
        c2
    } else if c1 == 0.0 && c2 == 0.0 && c1.is_sign_negative() != c2.is_sign_negative() {
        0.0
    } else {
        c1.max(c2)
    };
    stack.push_value(Value::F32(result));
    Ok(())
}

/// f32.copysign
/// Returns c1 with the sign of c2
pub fn f32_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push_value(Value::F32(c1.copysign(c2)));
    Ok(())
}

pub fn f64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push_value(Value::F64(c1 + c2));
    Ok(())
}

pub fn f64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push_value(Value::F64(c1 - c2));
    Ok(())
}

pub fn f64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push_value(Value::F64(c1 * c2));
    Ok(())
}

pub fn f64_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push_value(Value::F64(c1 / c2));
    Ok(())
}

pub fn f64_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    let result = if c1.is_nan() {
        c1
    } else if c2.is_nan() {
        c2
    } else if c1 == 0.0 && c2 == 0.0 && c1.is_sign_negative() != c2.is_sign_negative() {
        -0.0
    } else {
        c1.min(c2)
    };
    stack.push_value(Value::F64(result));
    Ok(())
}

pub fn f64_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    let result = if c1.is_nan() {
        c1
    } else if c2.is_nan() {
        c2
    } else if c1 == 0.0 && c2 == 0.0 && c1.is_sign_negative() != c2.is_sign_negative() {
        0.0
    } else {
        c1.max(c2)
    };
    stack.push_value(Value::F64(result));
    Ok(())
}

pub fn f64_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push_value(Value::F64(c1.copysign(c2)));
    Ok(())
}
