//! Variable instructions: locals of the current activation and module globals.

use super::{RuntimeError, Stack};
use crate::runtime::instance::GlobalInstance;

/// local.get x
/// 1. Let F be the current activation frame
/// 2. If x is not a local of F, trap
/// 3. Push the value of local x
pub fn local_get(stack: &mut Stack, index: u32) -> Result<(), RuntimeError> {
    let value = *stack
        .activation()
        .ok_or(RuntimeError::NoActivation)?
        .locals
        .get(index as usize)
        .ok_or(RuntimeError::LocalIndexOutOfBounds(index))?;
    stack.push_value(value);
    Ok(())
}

/// local.set x
/// Pops a value of the local's declared type and stores it.
pub fn local_set(stack: &mut Stack, index: u32) -> Result<(), RuntimeError> {
    let typ = stack
        .activation()
        .ok_or(RuntimeError::NoActivation)?
        .locals
        .get(index as usize)
        .ok_or(RuntimeError::LocalIndexOutOfBounds(index))?
        .typ();
    let value = stack.pop_typed(typ)?;
    if let Some(local) = stack
        .activation_mut()
        .and_then(|activation| activation.locals.get_mut(index as usize))
    {
        *local = value;
    }
    Ok(())
}

/// local.tee x
/// Like local.set, but leaves the value on the stack.
pub fn local_tee(stack: &mut Stack, index: u32) -> Result<(), RuntimeError> {
    local_set(stack, index)?;
    local_get(stack, index)
}

/// global.get x
pub fn global_get(stack: &mut Stack, globals: &[GlobalInstance], index: u32) -> Result<(), RuntimeError> {
    let global = globals
        .get(index as usize)
        .ok_or(RuntimeError::GlobalIndexOutOfBounds(index))?;
    stack.push_value(global.value);
    Ok(())
}

/// global.set x
/// 1. If x is not a global, trap
/// 2. If the global is immutable, trap
/// 3. Pop a value of the global's type and store it
pub fn global_set(stack: &mut Stack, globals: &mut [GlobalInstance], index: u32) -> Result<(), RuntimeError> {
    let global = globals
        .get_mut(index as usize)
        .ok_or(RuntimeError::GlobalIndexOutOfBounds(index))?;
    if !global.mutable {
        return Err(RuntimeError::ImmutableGlobal(index));
    }
    global.value = stack.pop_typed(global.value.typ())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::module::ValueType;
    use crate::parser::opcode::*;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn params_are_locals() {
        ExecutorTest::new()
            .args(vec![Value::I32(3), Value::I64(4)])
            .inst(LOCAL_GET)
            .imm_u32(1)
            .inst(LOCAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::I64, ValueType::I32])
            .expect_stack(vec![Value::I64(4), Value::I32(3)]);
    }

    #[test]
    fn declared_locals_start_at_zero() {
        ExecutorTest::new()
            .local(ValueType::F64)
            .inst(LOCAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::F64])
            .expect_stack(vec![Value::F64(0.0)]);
    }

    #[test]
    fn set_and_tee() {
        ExecutorTest::new()
            .local(ValueType::I32)
            .i32_const(7)
            .inst(LOCAL_TEE)
            .imm_u32(0)
            .i32_const(8)
            .inst(LOCAL_SET)
            .imm_u32(0)
            .inst(LOCAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::I32, ValueType::I32])
            .expect_stack(vec![Value::I32(7), Value::I32(8)]);
    }

    #[test]
    fn local_errors() {
        ExecutorTest::new()
            .inst(LOCAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::I32])
            .expect_code("ILLEGAL_LOCAL_IDX");

        ExecutorTest::new()
            .local(ValueType::I32)
            .f32_const(1.0)
            .inst(LOCAL_SET)
            .imm_u32(0)
            .expect_code("STACK_VAL_TYPE_MISMATCH");
    }

    #[test]
    fn globals() {
        ExecutorTest::new()
            .global(Value::I32(5), true)
            .inst(GLOBAL_GET)
            .imm_u32(0)
            .i32_const(2)
            .inst(I32_MUL)
            .inst(GLOBAL_SET)
            .imm_u32(0)
            .inst(GLOBAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(10)]);
    }

    #[test]
    fn global_errors() {
        ExecutorTest::new()
            .global(Value::I64(1), false)
            .i64_const(2)
            .inst(GLOBAL_SET)
            .imm_u32(0)
            .expect_code("IMMUTABLE_GLOBAL_CHANGED");

        ExecutorTest::new()
            .global(Value::I64(1), true)
            .i32_const(2)
            .inst(GLOBAL_SET)
            .imm_u32(0)
            .expect_code("STACK_VAL_TYPE_MISMATCH");

        ExecutorTest::new()
            .inst(GLOBAL_GET)
            .imm_u32(3)
            .returns(vec![ValueType::I32])
            .expect_code("GLOBAL_ACCESS_OOB");
    }
}
