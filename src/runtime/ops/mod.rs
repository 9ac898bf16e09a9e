//! Instruction implementations, grouped by category, and the opcode dispatch
//! table the executor indexes by opcode byte.
//!
//! Pure stack operations take only the [`Stack`]. Instructions with
//! immediates or that touch control flow take the [`Executor`], which decodes
//! immediates from the current pc.

pub mod bitwise;
pub mod comparison;
pub mod control;
pub mod conversion;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

use once_cell::sync::Lazy;

pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{RuntimeError, Value};

use crate::parser::opcode::*;
use crate::runtime::executor::Executor;

pub type Handler = fn(&mut Executor) -> Result<(), RuntimeError>;

type Table = [Option<Handler>; 256];

fn set(table: &mut Table, op: u8, handler: Handler) {
    table[op as usize] = Some(handler);
}

macro_rules! stack_ops {
    ($table:ident; $( $op:ident => $f:path ),* $(,)?) => {
        $( set(&mut $table, $op, |e| $f(&mut e.runtime.stack)); )*
    };
}

macro_rules! load_ops {
    ($table:ident; $( $op:ident => $f:path ),* $(,)?) => {
        $( set(&mut $table, $op, |e| {
            let memarg = e.read_memarg()?;
            let runtime = &mut e.runtime;
            let memory = runtime.memories.first().ok_or(RuntimeError::NoMemory)?;
            $f(&mut runtime.stack, memory, &memarg)
        }); )*
    };
}

macro_rules! store_ops {
    ($table:ident; $( $op:ident => $f:path ),* $(,)?) => {
        $( set(&mut $table, $op, |e| {
            let memarg = e.read_memarg()?;
            let runtime = &mut e.runtime;
            let memory = runtime.memories.first_mut().ok_or(RuntimeError::NoMemory)?;
            $f(&mut runtime.stack, memory, &memarg)
        }); )*
    };
}

pub(crate) static HANDLERS: Lazy<Table> = Lazy::new(|| {
    let mut table: Table = [None; 256];

    // Control
    set(&mut table, UNREACHABLE, control::unreachable);
    set(&mut table, NOP, control::nop);
    set(&mut table, BLOCK, control::block);
    set(&mut table, LOOP, control::loop_);
    set(&mut table, IF, control::if_);
    set(&mut table, ELSE, control::else_);
    set(&mut table, END, control::end);
    set(&mut table, BR, control::br);
    set(&mut table, BR_IF, control::br_if);
    set(&mut table, BR_TABLE, control::br_table);
    set(&mut table, RETURN, control::return_);
    set(&mut table, CALL, control::call);
    set(&mut table, CALL_INDIRECT, control::call_indirect);

    // Parametric
    stack_ops!(table;
        DROP => parametric::drop,
        SELECT => parametric::select,
    );

    // Variables
    set(&mut table, LOCAL_GET, |e| {
        let index = e.read_vu32()?;
        variable::local_get(&mut e.runtime.stack, index)
    });
    set(&mut table, LOCAL_SET, |e| {
        let index = e.read_vu32()?;
        variable::local_set(&mut e.runtime.stack, index)
    });
    set(&mut table, LOCAL_TEE, |e| {
        let index = e.read_vu32()?;
        variable::local_tee(&mut e.runtime.stack, index)
    });
    set(&mut table, GLOBAL_GET, |e| {
        let index = e.read_vu32()?;
        let runtime = &mut e.runtime;
        variable::global_get(&mut runtime.stack, &runtime.globals, index)
    });
    set(&mut table, GLOBAL_SET, |e| {
        let index = e.read_vu32()?;
        let runtime = &mut e.runtime;
        variable::global_set(&mut runtime.stack, &mut runtime.globals, index)
    });

    // Memory
    load_ops!(table;
        I32_LOAD => memory::i32_load,
        I64_LOAD => memory::i64_load,
        F32_LOAD => memory::f32_load,
        F64_LOAD => memory::f64_load,
        I32_LOAD8_S => memory::i32_load8_s,
        I32_LOAD8_U => memory::i32_load8_u,
        I32_LOAD16_S => memory::i32_load16_s,
        I32_LOAD16_U => memory::i32_load16_u,
        I64_LOAD8_S => memory::i64_load8_s,
        I64_LOAD8_U => memory::i64_load8_u,
        I64_LOAD16_S => memory::i64_load16_s,
        I64_LOAD16_U => memory::i64_load16_u,
        I64_LOAD32_S => memory::i64_load32_s,
        I64_LOAD32_U => memory::i64_load32_u,
    );
    store_ops!(table;
        I32_STORE => memory::i32_store,
        I64_STORE => memory::i64_store,
        F32_STORE => memory::f32_store,
        F64_STORE => memory::f64_store,
        I32_STORE8 => memory::i32_store8,
        I32_STORE16 => memory::i32_store16,
        I64_STORE8 => memory::i64_store8,
        I64_STORE16 => memory::i64_store16,
        I64_STORE32 => memory::i64_store32,
    );
    set(&mut table, MEMORY_SIZE, |e| {
        e.read_vu32()?;
        let runtime = &mut e.runtime;
        let memory = runtime.memories.first().ok_or(RuntimeError::NoMemory)?;
        memory::memory_size(&mut runtime.stack, memory)
    });
    set(&mut table, MEMORY_GROW, |e| {
        e.read_vu32()?;
        let runtime = &mut e.runtime;
        let memory = runtime.memories.first_mut().ok_or(RuntimeError::NoMemory)?;
        memory::memory_grow(&mut runtime.stack, memory)
    });

    // Constants
    set(&mut table, I32_CONST, |e| {
        let value = e.read_vs32()?;
        numeric::i32_const(&mut e.runtime.stack, value)
    });
    set(&mut table, I64_CONST, |e| {
        let value = e.read_vs64()?;
        numeric::i64_const(&mut e.runtime.stack, value)
    });
    set(&mut table, F32_CONST, |e| {
        let value = e.read_f32()?;
        numeric::f32_const(&mut e.runtime.stack, value)
    });
    set(&mut table, F64_CONST, |e| {
        let value = e.read_f64()?;
        numeric::f64_const(&mut e.runtime.stack, value)
    });

    // Tests and comparisons
    stack_ops!(table;
        I32_EQZ => comparison::i32_eqz,
        I32_EQ => comparison::i32_eq,
        I32_NE => comparison::i32_ne,
        I32_LT_S => comparison::i32_lt_s,
        I32_LT_U => comparison::i32_lt_u,
        I32_GT_S => comparison::i32_gt_s,
        I32_GT_U => comparison::i32_gt_u,
        I32_LE_S => comparison::i32_le_s,
        I32_LE_U => comparison::i32_le_u,
        I32_GE_S => comparison::i32_ge_s,
        I32_GE_U => comparison::i32_ge_u,
        I64_EQZ => comparison::i64_eqz,
        I64_EQ => comparison::i64_eq,
        I64_NE => comparison::i64_ne,
        I64_LT_S => comparison::i64_lt_s,
        I64_LT_U => comparison::i64_lt_u,
        I64_GT_S => comparison::i64_gt_s,
        I64_GT_U => comparison::i64_gt_u,
        I64_LE_S => comparison::i64_le_s,
        I64_LE_U => comparison::i64_le_u,
        I64_GE_S => comparison::i64_ge_s,
        I64_GE_U => comparison::i64_ge_u,
        F32_EQ => comparison::f32_eq,
        F32_NE => comparison::f32_ne,
        F32_LT => comparison::f32_lt,
        F32_GT => comparison::f32_gt,
        F32_LE => comparison::f32_le,
        F32_GE => comparison::f32_ge,
        F64_EQ => comparison::f64_eq,
        F64_NE => comparison::f64_ne,
        F64_LT => comparison::f64_lt,
        F64_GT => comparison::f64_gt,
        F64_LE => comparison::f64_le,
        F64_GE => comparison::f64_ge,
    );

    // Integer arithmetic
    stack_ops!(table;
        I32_CLZ => numeric::i32_clz,
        I32_CTZ => numeric::i32_ctz,
        I32_POPCNT => numeric::i32_popcnt,
        I32_ADD => numeric::i32_add,
        I32_SUB => numeric::i32_sub,
        I32_MUL => numeric::i32_mul,
        I32_DIV_S => numeric::i32_div_s,
        I32_DIV_U => numeric::i32_div_u,
        I32_REM_S => numeric::i32_rem_s,
        I32_REM_U => numeric::i32_rem_u,
        I32_AND => bitwise::i32_and,
        I32_OR => bitwise::i32_or,
        I32_XOR => bitwise::i32_xor,
        I32_SHL => bitwise::i32_shl,
        I32_SHR_S => bitwise::i32_shr_s,
        I32_SHR_U => bitwise::i32_shr_u,
        I32_ROTL => bitwise::i32_rotl,
        I32_ROTR => bitwise::i32_rotr,
        I64_CLZ => numeric::i64_clz,
        I64_CTZ => numeric::i64_ctz,
        I64_POPCNT => numeric::i64_popcnt,
        I64_ADD => numeric::i64_add,
        I64_SUB => numeric::i64_sub,
        I64_MUL => numeric::i64_mul,
        I64_DIV_S => numeric::i64_div_s,
        I64_DIV_U => numeric::i64_div_u,
        I64_REM_S => numeric::i64_rem_s,
        I64_REM_U => numeric::i64_rem_u,
        I64_AND => bitwise::i64_and,
        I64_OR => bitwise::i64_or,
        I64_XOR => bitwise::i64_xor,
        I64_SHL => bitwise::i64_shl,
        I64_SHR_S => bitwise::i64_shr_s,
        I64_SHR_U => bitwise::i64_shr_u,
        I64_ROTL => bitwise::i64_rotl,
        I64_ROTR => bitwise::i64_rotr,
    );

    // Float arithmetic
    stack_ops!(table;
        F32_ABS => numeric::f32_abs,
        F32_NEG => numeric::f32_neg,
        F32_CEIL => numeric::f32_ceil,
        F32_FLOOR => numeric::f32_floor,
        F32_TRUNC => numeric::f32_trunc,
        F32_NEAREST => numeric::f32_nearest,
        F32_SQRT => numeric::f32_sqrt,
        F32_ADD => numeric::f32_add,
        F32_SUB => numeric::f32_sub,
        F32_MUL => numeric::f32_mul,
        F32_DIV => numeric::f32_div,
        F32_MIN => numeric::f32_min,
        F32_MAX => numeric::f32_max,
        F32_COPYSIGN => numeric::f32_copysign,
        F64_ABS => numeric::f64_abs,
        F64_NEG => numeric::f64_neg,
        F64_CEIL => numeric::f64_ceil,
        F64_FLOOR => numeric::f64_floor,
        F64_TRUNC => numeric::f64_trunc,
        F64_NEAREST => numeric::f64_nearest,
        F64_SQRT => numeric::f64_sqrt,
        F64_ADD => numeric::f64_add,
        F64_SUB => numeric::f64_sub,
        F64_MUL => numeric::f64_mul,
        F64_DIV => numeric::f64_div,
        F64_MIN => numeric::f64_min,
        F64_MAX => numeric::f64_max,
        F64_COPYSIGN => numeric::f64_copysign,
    );

    // Conversions
    stack_ops!(table;
        I32_WRAP_I64 => conversion::i32_wrap_i64,
        I32_TRUNC_F32_S => conversion::i32_trunc_f32_s,
        I32_TRUNC_F32_U => conversion::i32_trunc_f32_u,
        I32_TRUNC_F64_S => conversion::i32_trunc_f64_s,
        I32_TRUNC_F64_U => conversion::i32_trunc_f64_u,
        I64_EXTEND_I32_S => conversion::i64_extend_i32_s,
        I64_EXTEND_I32_U => conversion::i64_extend_i32_u,
        I64_TRUNC_F32_S => conversion::i64_trunc_f32_s,
        I64_TRUNC_F32_U => conversion::i64_trunc_f32_u,
        I64_TRUNC_F64_S => conversion::i64_trunc_f64_s,
        I64_TRUNC_F64_U => conversion::i64_trunc_f64_u,
        F32_CONVERT_I32_S => conversion::f32_convert_i32_s,
        F32_CONVERT_I32_U => conversion::f32_convert_i32_u,
        F32_CONVERT_I64_S => conversion::f32_convert_i64_s,
        F32_CONVERT_I64_U => conversion::f32_convert_i64_u,
        F32_DEMOTE_F64 => conversion::f32_demote_f64,
        F64_CONVERT_I32_S => conversion::f64_convert_i32_s,
        F64_CONVERT_I32_U => conversion::f64_convert_i32_u,
        F64_CONVERT_I64_S => conversion::f64_convert_i64_s,
        F64_CONVERT_I64_U => conversion::f64_convert_i64_u,
        F64_PROMOTE_F32 => conversion::f64_promote_f32,
        I32_REINTERPRET_F32 => conversion::i32_reinterpret_f32,
        I64_REINTERPRET_F64 => conversion::i64_reinterpret_f64,
        F32_REINTERPRET_I32 => conversion::f32_reinterpret_i32,
        F64_REINTERPRET_I64 => conversion::f64_reinterpret_i64,
    );

    table
});
