//! Structured control flow resolution.
//!
//! Code is kept in its binary form, so the delimiters of a `block`, `loop` or
//! `if` are found by scanning forward over the instruction stream, skipping
//! immediates, until the matching `end`. The executor memoizes the result in
//! its continuation cache.

use super::cache::BlockTargets;
use super::RuntimeError;
use crate::parser::opcode::{self, BLOCK, ELSE, END, IF, LOOP};

/// Finds the level-0 `else` and the matching `end` of the block whose body
/// starts at `start` (the byte after its block type).
pub fn resolve(code: &[u8], start: usize) -> Result<BlockTargets, RuntimeError> {
    let mut depth = 0usize;
    let mut else_pos = None;
    let mut pos = start;
    while pos < code.len() {
        let at = pos;
        let op = code[pos];
        pos = opcode::skip_immediates(code, pos + 1, op)?;
        match op {
            BLOCK | LOOP | IF => depth += 1,
            ELSE if depth == 0 && else_pos.is_none() => else_pos = Some(at),
            END if depth == 0 => {
                return Ok(BlockTargets {
                    else_pos,
                    end_pos: at,
                })
            }
            END => depth -= 1,
            _ => {}
        }
    }
    Err(RuntimeError::IllFormedStructure(start))
}
