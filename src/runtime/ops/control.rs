//! Control instructions: structured blocks, branches, calls and returns.
//!
//! Branches are resolved against the labels of the current activation. With
//! `L` labels above the activation, a branch depth below `L` targets a label,
//! a depth equal to `L` returns from the function, and anything deeper traps.

use log::trace;

use super::RuntimeError;
use crate::runtime::executor::Executor;
use crate::runtime::instance::Callee;
use crate::runtime::stack::{
    ActivationFrame, CodeRef, Continuation, Frame, FrameKind, LabelFrame, LabelKind,
};

/// unreachable
pub fn unreachable(_: &mut Executor) -> Result<(), RuntimeError> {
    Err(RuntimeError::Unreachable)
}

/// nop
pub fn nop(_: &mut Executor) -> Result<(), RuntimeError> {
    Ok(())
}

/// block bt
/// Push a label whose continuation is just past the matching `end`.
pub fn block(executor: &mut Executor) -> Result<(), RuntimeError> {
    let block_type = executor.read_block_type()?;
    let targets = executor.block_targets()?;
    executor.runtime.stack.push_label(LabelFrame {
        kind: LabelKind::Block,
        block_type,
        continuation: targets.end_pos + 1,
    });
    Ok(())
}

/// loop bt
/// Push a label whose continuation is the `loop` opcode itself, so a branch
/// to it re-enters the loop.
pub fn loop_(executor: &mut Executor) -> Result<(), RuntimeError> {
    let block_type = executor.read_block_type()?;
    executor.runtime.stack.push_label(LabelFrame {
        kind: LabelKind::Loop,
        block_type,
        continuation: executor.op_offset,
    });
    Ok(())
}

/// if bt
/// 1. Pop the i32 condition c
/// 2. Push a label whose continuation is just past the matching `end`
/// 3. If c is non-zero, continue into the then-arm
/// 4. Otherwise continue after the `else`, or at the `end` if there is none
pub fn if_(executor: &mut Executor) -> Result<(), RuntimeError> {
    let block_type = executor.read_block_type()?;
    let condition = executor.runtime.stack.pop_i32()?;
    let targets = executor.block_targets()?;
    executor.runtime.stack.push_label(LabelFrame {
        kind: LabelKind::If,
        block_type,
        continuation: targets.end_pos + 1,
    });
    if condition == 0 {
        executor.pc.offset = match targets.else_pos {
            Some(else_pos) => else_pos + 1,
            None => targets.end_pos,
        };
    }
    Ok(())
}

/// else
/// Reached at the end of a then-arm: leave the `if` as a branch to depth 0.
pub fn else_(executor: &mut Executor) -> Result<(), RuntimeError> {
    branch(executor, 0)
}

/// end
/// Pops the innermost label, keeping its results, and falls through. With no
/// label left in the activation it returns from the function.
pub fn end(executor: &mut Executor) -> Result<(), RuntimeError> {
    let stack = &mut executor.runtime.stack;
    if stack.labels_above_activation() == 0 {
        return do_return(executor);
    }
    let position = stack.label_position(0).ok_or(RuntimeError::StackExhausted)?;
    let label = stack.label(0).cloned().ok_or(RuntimeError::StackExhausted)?;
    stack.unwind_to(position, label.result_arity())?;
    Ok(())
}

/// br l
pub fn br(executor: &mut Executor) -> Result<(), RuntimeError> {
    let depth = executor.read_vu32()?;
    branch(executor, depth)
}

/// br_if l
/// Pop the i32 condition and branch to l if it is non-zero.
pub fn br_if(executor: &mut Executor) -> Result<(), RuntimeError> {
    let depth = executor.read_vu32()?;
    if executor.runtime.stack.pop_i32()? != 0 {
        branch(executor, depth)?;
    }
    Ok(())
}

/// br_table l* l_default
/// Pop the i32 index i, read as unsigned, and branch to l[i], or to
/// l_default when i is out of range.
pub fn br_table(executor: &mut Executor) -> Result<(), RuntimeError> {
    let count = executor.read_vu32()?;
    let mut targets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        targets.push(executor.read_vu32()?);
    }
    let default = executor.read_vu32()?;
    let index = executor.runtime.stack.pop_i32()? as u32;
    let depth = targets.get(index as usize).copied().unwrap_or(default);
    branch(executor, depth)
}

/// return
pub fn return_(executor: &mut Executor) -> Result<(), RuntimeError> {
    do_return(executor)
}

/// call x
pub fn call(executor: &mut Executor) -> Result<(), RuntimeError> {
    let index = executor.read_vu32()?;
    call_function(executor, index)
}

/// call_indirect x
/// 1. Pop the i32 table index i
/// 2. If there is no table, or i is outside it, trap
/// 3. If the slot is empty, trap
/// 4. If the callee's type differs from type x, trap
/// 5. Call the callee
pub fn call_indirect(executor: &mut Executor) -> Result<(), RuntimeError> {
    let type_index = executor.read_vu32()?;
    let _table_index = executor.read_vu32()?;
    let expected = executor
        .runtime
        .types
        .get(type_index as usize)
        .cloned()
        .ok_or(RuntimeError::TypeIndexOutOfBounds(type_index))?;

    let slot = executor.runtime.stack.pop_i32()? as u32;
    let function = executor
        .runtime
        .table()?
        .get(slot)?
        .ok_or(RuntimeError::UninitializedElement(slot))?;
    let actual = executor.runtime.signature(function)?;
    if actual != expected {
        return Err(RuntimeError::IndirectCallTypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    call_function(executor, function)
}

/// Transfers control to the target of a branch of `depth`.
pub(crate) fn branch(executor: &mut Executor, depth: u32) -> Result<(), RuntimeError> {
    let stack = &mut executor.runtime.stack;
    let labels = stack.labels_above_activation();
    let d = depth as usize;
    if d == labels {
        return do_return(executor);
    }
    if d > labels {
        return Err(RuntimeError::BreakLevelExceeded { depth, labels });
    }

    let position = stack.label_position(d).ok_or(RuntimeError::StackExhausted)?;
    let label = stack.label(d).cloned().ok_or(RuntimeError::StackExhausted)?;
    stack.unwind_to(position, label.branch_arity())?;
    executor.pc.offset = label.continuation;
    Ok(())
}

/// Unwinds the current activation, keeping its results, and resumes the
/// caller. Returning from the outermost activation halts execution.
pub(crate) fn do_return(executor: &mut Executor) -> Result<(), RuntimeError> {
    let stack = &mut executor.runtime.stack;
    let position = stack.activation_position().ok_or(RuntimeError::NoActivation)?;
    let signature = stack
        .activation()
        .map(|activation| activation.signature.clone())
        .ok_or(RuntimeError::NoActivation)?;
    match stack.unwind_to(position, &signature.return_types)? {
        Frame::Activation(ActivationFrame {
            return_to: Some(continuation),
            ..
        }) => executor.pc = continuation,
        Frame::Activation(_) => executor.halted = true,
        _ => return Err(RuntimeError::NoActivation),
    }
    Ok(())
}

/// Pushes an activation for function `index`, with its parameters popped
/// from the stack into the first locals, and jumps to its body.
pub(crate) fn call_function(executor: &mut Executor, index: u32) -> Result<(), RuntimeError> {
    let (defined, signature, mut locals) = match executor.runtime.callee(index)? {
        Callee::Imported(import) => {
            return Err(RuntimeError::UnresolvedImport {
                module: import.module.clone(),
                name: import.name.clone(),
            })
        }
        Callee::Defined(defined, function) => (
            defined,
            function.signature.clone(),
            function.locals_default.clone(),
        ),
    };

    let stack = &mut executor.runtime.stack;
    let depth = stack.count(FrameKind::Activation);
    if depth > executor.config.max_call_depth {
        return Err(RuntimeError::CallStackExhausted(depth));
    }

    for (i, expected) in signature.parameters.iter().enumerate().rev() {
        match stack.pop_value() {
            Ok(value) if value.typ() == *expected => locals[i] = value,
            other => {
                return Err(RuntimeError::MissingFunctionParams {
                    expected: signature.to_string(),
                    actual: other.map_or("nothing".to_string(), |value| value.typ().to_string()),
                })
            }
        }
    }

    trace!("call func[{}] {} depth={}", index, signature, depth);
    stack.push_activation(ActivationFrame {
        function: Some(index),
        locals,
        return_to: Some(executor.pc),
        signature,
    });
    executor.runtime.functions[defined as usize].execution_count += 1;
    executor.pc = Continuation {
        code: CodeRef::Function(defined),
        offset: 0,
    };
    Ok(())
}
