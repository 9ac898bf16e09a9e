//! Parametric instructions: drop and select.

use super::{RuntimeError, Stack};

/// drop
/// Pop and discard one value of any type.
pub fn drop(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.pop_value()?;
    Ok(())
}

/// select
/// 1. Pop the i32 condition c
/// 2. Pop value val2, then val1; both must have the same type
/// 3. Push val1 if c is non-zero, val2 otherwise
pub fn select(stack: &mut Stack) -> Result<(), RuntimeError> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop_value()?;
    let val1 = stack.pop_typed(val2.typ())?;
    stack.push_value(if condition != 0 { val1 } else { val2 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::module::ValueType;
    use crate::parser::opcode::*;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn drop_discards_top() {
        ExecutorTest::new()
            .i32_const(1)
            .i64_const(2)
            .inst(DROP)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1)]);
    }

    #[test]
    fn drop_empty_stack() {
        ExecutorTest::new()
            .inst(DROP)
            .expect_code("EXHAUSTED_STACK_ACCESS");
    }

    #[test]
    fn select_picks_first_when_true() {
        ExecutorTest::new()
            .i64_const(10)
            .i64_const(20)
            .i32_const(1)
            .inst(SELECT)
            .returns(vec![ValueType::I64])
            .expect_stack(vec![Value::I64(10)]);
    }

    #[test]
    fn select_picks_second_when_false() {
        ExecutorTest::new()
            .f32_const(1.0)
            .f32_const(2.0)
            .i32_const(0)
            .inst(SELECT)
            .returns(vec![ValueType::F32])
            .expect_stack(vec![Value::F32(2.0)]);
    }

    #[test]
    fn select_operand_types_must_match() {
        ExecutorTest::new()
            .i32_const(10)
            .i64_const(20)
            .i32_const(1)
            .inst(SELECT)
            .returns(vec![ValueType::I64])
            .expect_code("STACK_VAL_TYPE_MISMATCH");
    }
}
