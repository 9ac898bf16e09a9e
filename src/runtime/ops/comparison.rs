//! Test and comparison instructions. All of them push an i32 that is 1 when
//! the relation holds and 0 otherwise.

use super::{RuntimeError, Stack, Value};

fn push_bool(stack: &mut Stack, condition: bool) -> Result<(), RuntimeError> {
    stack.push_value(Value::I32(condition as i32));
    Ok(())
}

macro_rules! compare {
    ($name:ident, $pop:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let $b = stack.$pop()?;
            let $a = stack.$pop()?;
            push_bool(stack, $body)
        }
    };
}

// ============================================================================
// Integer tests
// ============================================================================

/// i32.eqz
/// 1. Pop value c1 from stack
/// 2. Push 1 if c1 is zero, 0 otherwise
pub fn i32_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    push_bool(stack, value == 0)
}

/// i64.eqz
pub fn i64_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let value = stack.pop_i64()?;
    push_bool(stack, value == 0)
}

// ============================================================================
// i32 comparisons
// ============================================================================

compare!(i32_eq, pop_i32, |a, b| a == b);
compare!(i32_ne, pop_i32, |a, b| a != b);
compare!(i32_lt_s, pop_i32, |a, b| a < b);
compare!(i32_lt_u, pop_i32, |a, b| (a as u32) < (b as u32));
compare!(i32_gt_s, pop_i32, |a, b| a > b);
compare!(i32_gt_u, pop_i32, |a, b| (a as u32) > (b as u32));
compare!(i32_le_s, pop_i32, |a, b| a <= b);
compare!(i32_le_u, pop_i32, |a, b| (a as u32) <= (b as u32));
compare!(i32_ge_s, pop_i32, |a, b| a >= b);
compare!(i32_ge_u, pop_i32, |a, b| (a as u32) >= (b as u32));

// ============================================================================
// i64 comparisons
// ============================================================================

compare!(i64_eq, pop_i64, |a, b| a == b);
compare!(i64_ne, pop_i64, |a, b| a != b);
compare!(i64_lt_s, pop_i64, |a, b| a < b);
compare!(i64_lt_u, pop_i64, |a, b| (a as u64) < (b as u64));
compare!(i64_gt_s, pop_i64, |a, b| a > b);
compare!(i64_gt_u, pop_i64, |a, b| (a as u64) > (b as u64));
compare!(i64_le_s, pop_i64, |a, b| a <= b);
compare!(i64_le_u, pop_i64, |a, b| (a as u64) <= (b as u64));
compare!(i64_ge_s, pop_i64, |a, b| a >= b);
compare!(i64_ge_u, pop_i64, |a, b| (a as u64) >= (b as u64));

// ============================================================================
// Float comparisons (IEEE 754: any comparison with NaN is false, except ne)
// ============================================================================

compare!(f32_eq, pop_f32, |a, b| a == b);
compare!(f32_ne, pop_f32, |a, b| a != b);
compare!(f32_lt, pop_f32, |a, b| a < b);
compare!(f32_gt, pop_f32, |a, b| a > b);
compare!(f32_le, pop_f32, |a, b| a <= b);
compare!(f32_ge, pop_f32, |a, b| a >= b);

compare!(f64_eq, pop_f64, |a, b| a == b);
compare!(f64_ne, pop_f64, |a, b| a != b);
compare!(f64_lt, pop_f64, |a, b| a < b);
compare!(f64_gt, pop_f64, |a, b| a > b);
compare!(f64_le, pop_f64, |a, b| a <= b);
compare!(f64_ge, pop_f64, |a, b| a >= b);

#[cfg(test)]
mod tests {
    use crate::parser::module::ValueType;
    use crate::parser::opcode::*;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;
    use rstest::rstest;

    #[rstest]
    #[case(I32_EQ, 3, 3, 1)]
    #[case(I32_NE, 3, 3, 0)]
    #[case(I32_LT_S, -1, 0, 1)]
    #[case(I32_LT_U, -1, 0, 0)]
    #[case(I32_GT_S, -1, 0, 0)]
    #[case(I32_GT_U, -1, 0, 1)]
    #[case(I32_LE_S, 5, 5, 1)]
    #[case(I32_LE_U, i32::MIN, 1, 0)]
    #[case(I32_GE_S, i32::MIN, 1, 0)]
    #[case(I32_GE_U, i32::MIN, 1, 1)]
    fn i32_relations(#[case] op: u8, #[case] c1: i32, #[case] c2: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .i32_const(c1)
            .i32_const(c2)
            .inst(op)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(I64_EQ, 1, 2, 0)]
    #[case(I64_NE, 1, 2, 1)]
    #[case(I64_LT_S, -5, 2, 1)]
    #[case(I64_LT_U, -5, 2, 0)]
    #[case(I64_GT_U, -5, 2, 1)]
    #[case(I64_LE_U, 2, 2, 1)]
    #[case(I64_GE_S, -5, 2, 0)]
    fn i64_relations(#[case] op: u8, #[case] c1: i64, #[case] c2: i64, #[case] expected: i32) {
        ExecutorTest::new()
            .i64_const(c1)
            .i64_const(c2)
            .inst(op)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[test]
    fn eqz() {
        ExecutorTest::new()
            .i32_const(0)
            .inst(I32_EQZ)
            .i64_const(7)
            .inst(I64_EQZ)
            .returns(vec![ValueType::I32, ValueType::I32])
            .expect_stack(vec![Value::I32(1), Value::I32(0)]);
    }

    #[rstest]
    #[case(F32_EQ, 0.0, -0.0, 1)]
    #[case(F32_NE, f32::NAN, f32::NAN, 1)]
    #[case(F32_EQ, f32::NAN, f32::NAN, 0)]
    #[case(F32_LT, 1.0, 2.0, 1)]
    #[case(F32_GT, f32::NAN, 0.0, 0)]
    #[case(F32_LE, 2.0, 2.0, 1)]
    #[case(F32_GE, 1.0, 2.0, 0)]
    fn f32_relations(#[case] op: u8, #[case] c1: f32, #[case] c2: f32, #[case] expected: i32) {
        ExecutorTest::new()
            .f32_const(c1)
            .f32_const(c2)
            .inst(op)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(F64_EQ, 1.5, 1.5, 1)]
    #[case(F64_NE, 1.5, 1.5, 0)]
    #[case(F64_LT, f64::NEG_INFINITY, 0.0, 1)]
    #[case(F64_GT, 0.0, f64::NAN, 0)]
    #[case(F64_LE, f64::NAN, 0.0, 0)]
    #[case(F64_GE, 3.0, 2.0, 1)]
    fn f64_relations(#[case] op: u8, #[case] c1: f64, #[case] c2: f64, #[case] expected: i32) {
        ExecutorTest::new()
            .f64_const(c1)
            .f64_const(c2)
            .inst(op)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }
}
