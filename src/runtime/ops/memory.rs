//! Memory instructions: loads, stores, memory.size and memory.grow.
//!
//! The effective address of an access is the popped i32 address, read as
//! unsigned, plus the static offset of the memarg. It is computed in 64 bits
//! so that it cannot wrap.

use super::{Memory, RuntimeError, Stack, Value};

/// Static operand of a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Alignment hint, as a power of two. Not enforced.
    pub align: u32,
    pub offset: u32,
}

fn effective_address(stack: &mut Stack, memarg: &MemArg) -> Result<u64, RuntimeError> {
    let addr = stack.pop_i32()? as u32;
    Ok(addr as u64 + memarg.offset as u64)
}

// ============================================================================
// Loads
// ============================================================================

/// i32.load
/// [i32] -> [i32]
/// 1. Pop the address and add the static offset
/// 2. If ea + 4 exceeds the memory size, trap
/// 3. Read 4 bytes little-endian and push them
pub fn i32_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u32(ea)?;
    stack.push_value(Value::I32(value as i32));
    Ok(())
}

pub fn i32_load8_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u8(ea)?;
    stack.push_value(Value::I32(value as i8 as i32));
    Ok(())
}

pub fn i32_load8_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u8(ea)?;
    stack.push_value(Value::I32(value as i32));
    Ok(())
}

pub fn i32_load16_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u16(ea)?;
    stack.push_value(Value::I32(value as i16 as i32));
    Ok(())
}

pub fn i32_load16_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u16(ea)?;
    stack.push_value(Value::I32(value as i32));
    Ok(())
}

pub fn i64_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u64(ea)?;
    stack.push_value(Value::I64(value as i64));
    Ok(())
}

pub fn i64_load8_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u8(ea)?;
    stack.push_value(Value::I64(value as i8 as i64));
    Ok(())
}

pub fn i64_load8_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u8(ea)?;
    stack.push_value(Value::I64(value as i64));
    Ok(())
}

pub fn i64_load16_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u16(ea)?;
    stack.push_value(Value::I64(value as i16 as i64));
    Ok(())
}

pub fn i64_load16_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u16(ea)?;
    stack.push_value(Value::I64(value as i64));
    Ok(())
}

pub fn i64_load32_s(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u32(ea)?;
    stack.push_value(Value::I64(value as i32 as i64));
    Ok(())
}

pub fn i64_load32_u(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_u32(ea)?;
    stack.push_value(Value::I64(value as i64));
    Ok(())
}

pub fn f32_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_f32(ea)?;
    stack.push_value(Value::F32(value));
    Ok(())
}

pub fn f64_load(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let ea = effective_address(stack, memarg)?;
    let value = memory.read_f64(ea)?;
    stack.push_value(Value::F64(value));
    Ok(())
}

// ============================================================================
// Stores
// ============================================================================

/// i32.store
/// [i32 i32] -> []
/// 1. Pop the value, then the address
/// 2. If ea + 4 exceeds the memory size, trap
/// 3. Write the value as 4 bytes little-endian
pub fn i32_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u32(ea, value as u32)
}

/// i32.store8 - Store the low 8 bits
pub fn i32_store8(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u8(ea, value as u8)
}

/// i32.store16 - Store the low 16 bits
pub fn i32_store16(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u16(ea, value as u16)
}

pub fn i64_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u64(ea, value as u64)
}

pub fn i64_store8(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u8(ea, value as u8)
}

pub fn i64_store16(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u16(ea, value as u16)
}

pub fn i64_store32(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_u32(ea, value as u32)
}

pub fn f32_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_f32()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_f32(ea, value)
}

pub fn f64_store(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_f64()?;
    let ea = effective_address(stack, memarg)?;
    memory.write_f64(ea, value)
}

// ============================================================================
// Size and growth
// ============================================================================

/// memory.size
/// Push the current size in pages.
pub fn memory_size(stack: &mut Stack, memory: &Memory) -> Result<(), RuntimeError> {
    stack.push_value(Value::I32(memory.size() as i32));
    Ok(())
}

/// memory.grow
/// 1. Pop the page delta n, read as unsigned
/// 2. Try to grow the memory by n pages
/// 3. Push the previous size in pages, or -1 if the memory could not grow
pub fn memory_grow(stack: &mut Stack, memory: &mut Memory) -> Result<(), RuntimeError> {
    let delta = stack.pop_i32()? as u32;
    let previous = memory.grow(delta);
    stack.push_value(Value::I32(previous));
    Ok(())
}
