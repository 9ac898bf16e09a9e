//! Memo tables keyed by code position.
//!
//! Both caches are keyed by `(CodeRef, offset)`: the code buffer and the byte
//! offset of the immediate or block opcode. Entries stay valid for the life of
//! the buffer, which is immutable once instantiated.

use std::collections::HashMap;

use super::stack::CodeRef;

/// Matching delimiters of a structured block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTargets {
    /// Offset of the level-0 `else`, if the block is an `if` that has one.
    pub else_pos: Option<usize>,
    /// Offset of the matching `end`.
    pub end_pos: usize,
}

#[derive(Debug, Default)]
pub struct ContinuationCache {
    targets: HashMap<(CodeRef, usize), BlockTargets>,
}

impl ContinuationCache {
    pub fn get(&self, code: CodeRef, offset: usize) -> Option<BlockTargets> {
        self.targets.get(&(code, offset)).copied()
    }

    pub fn insert(&mut self, code: CodeRef, offset: usize, targets: BlockTargets) {
        self.targets.insert((code, offset), targets);
    }

    pub fn invalidate(&mut self, code: CodeRef) {
        self.targets.retain(|(c, _), _| *c != code);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Decoded LEB128 immediates and the offset just past them.
///
/// Unsigned 32-bit immediates are widened into the same slot type as signed
/// ones; the reader narrows them back.
#[derive(Debug, Default)]
pub struct ImmediateCache {
    entries: HashMap<(CodeRef, usize), (i64, usize)>,
    hits: u64,
}

impl ImmediateCache {
    pub fn get(&mut self, code: CodeRef, offset: usize) -> Option<(i64, usize)> {
        let entry = self.entries.get(&(code, offset)).copied();
        if entry.is_some() {
            self.hits += 1;
        }
        entry
    }

    pub fn insert(&mut self, code: CodeRef, offset: usize, value: i64, next: usize) {
        self.entries.insert((code, offset), (value, next));
    }

    pub fn invalidate(&mut self, code: CodeRef) {
        self.entries.retain(|(c, _), _| *c != code);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
