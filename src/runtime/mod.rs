//! Execution engine: runtime state built from a module, the evaluation stack,
//! and the interpreter that drives it.

pub mod cache;
pub mod control;
pub mod executor;
pub mod instance;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod table;
pub mod value;

#[cfg(test)]
pub mod test_utils;

pub use executor::Executor;
pub use instance::{FuncDescriptor, Instantiator, Runtime};
pub use memory::Memory;
pub use stack::Stack;
pub use table::Table;
pub use value::Value;

use crate::parser::reader::VarintError;

/// Instantiation failures and traps. Both are unrecoverable for the running module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    // Instantiation ----------------------------------------------------------
    #[error("The amount of initial memory pages ({initial}) exceeds the maximum ({maximum})")]
    MemoryExceedsMax { initial: u32, maximum: u32 },
    #[error("The initialized data exceed the memory size: {len} bytes at offset {offset}, memory is {size} bytes")]
    DataExceedsMemory { offset: u32, len: usize, size: usize },
    #[error("The amount of initial table entries ({initial}) exceeds the maximum ({maximum})")]
    TableExceedsMax { initial: u32, maximum: u32 },
    #[error("The initialized elements exceed the table entries: {len} at offset {offset}, table has {size}")]
    ElementsExceedTable { offset: u32, len: usize, size: u32 },
    #[error("No table available")]
    NoTable,
    #[error("No memory available")]
    NoMemory,
    #[error("Invalid initializer expression: {0}")]
    InvalidInitExpr(String),
    #[error("Unsupported import {module}.{name}")]
    UnsupportedImport { module: String, name: String },
    #[error("Entry function not found: {0}")]
    EntryNotFound(String),

    // Traps ------------------------------------------------------------------
    #[error("Memory access out of bound: {width} bytes at {address}, memory is {size} bytes")]
    MemoryAccessOutOfBounds { address: u64, width: usize, size: usize },
    #[error("Table access out of bound: {0}")]
    TableAccessOutOfBounds(u32),
    #[error("Uninitialized table element: {0}")]
    UninitializedElement(u32),
    #[error("Missing function params: expected {expected}, got {actual}")]
    MissingFunctionParams { expected: String, actual: String },
    #[error("Stack value type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Unreachable instruction executed")]
    Unreachable,
    #[error("Illegal local index: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("Exhausted stack access")]
    StackExhausted,
    #[error("Illegal break level {depth}, {labels} labels in scope")]
    BreakLevelExceeded { depth: u32, labels: usize },
    #[error("Arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: String, actual: String },
    #[error("No activation frame on the stack")]
    NoActivation,
    #[error("Ill-formed structure: no matching end for the block at offset {0}")]
    IllFormedStructure(usize),
    #[error("Function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("Function type index out of bounds: {0}")]
    TypeIndexOutOfBounds(u32),
    #[error("Global index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("Indirect call type mismatch: expected {expected}, got {actual}")]
    IndirectCallTypeMismatch { expected: String, actual: String },
    #[error("Immutable global changed: {0}")]
    ImmutableGlobal(u32),
    #[error("Integer division by zero")]
    DivisionByZero,
    #[error("Integer overflow, value not representable")]
    NotRepresentable,
    #[error("Float unrepresentable in integer range: {0}")]
    FloatUnrepresentable(String),
    #[error("Invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
    #[error("Malformed immediate: {0}")]
    MalformedImmediate(VarintError),
    #[error("Unresolved import {module}.{name} called")]
    UnresolvedImport { module: String, name: String },
    #[error("Call stack exhausted at depth {0}")]
    CallStackExhausted(usize),
    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    /// A trap tagged with the module byte offset of the faulting opcode.
    #[error("{source}")]
    At {
        offset: usize,
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// Attaches a byte offset, keeping the innermost one if already tagged.
    pub fn at(self, offset: usize) -> RuntimeError {
        match self {
            RuntimeError::At { .. } => self,
            source => RuntimeError::At {
                offset,
                source: Box::new(source),
            },
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            RuntimeError::At { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// The error without any offset tag.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::At { source, .. } => source.root(),
            _ => self,
        }
    }

    pub fn code(&self) -> &'static str {
        use RuntimeError::*;
        match self {
            MemoryExceedsMax { .. } => "MEM_EXCEED_MAX",
            DataExceedsMemory { .. } => "MEM_DATA_EXCEED_MAX",
            TableExceedsMax { .. } => "TBL_EXCEED_MAX",
            ElementsExceedTable { .. } => "TBL_ELEM_EXCEED_MAX",
            NoTable => "NO_AVAILABLE_TABLES_EXIST",
            NoMemory => "NO_AVAILABLE_MEM",
            InvalidInitExpr(_) => "INVALID_GLOBAL_SIG",
            UnsupportedImport { .. } => "UNSUPPORTED_IMPORT",
            EntryNotFound(_) => "ENTRY_NOT_FOUND",
            MemoryAccessOutOfBounds { .. } => "MEM_ACCESS_OOB",
            TableAccessOutOfBounds(_) | UninitializedElement(_) => "TBL_ACCESS_OOB",
            MissingFunctionParams { .. } => "MISSING_FUNC_PARAMS",
            TypeMismatch { .. } => "STACK_VAL_TYPE_MISMATCH",
            Unreachable => "UNREACHABLE",
            LocalIndexOutOfBounds(_) => "ILLEGAL_LOCAL_IDX",
            StackExhausted => "EXHAUSTED_STACK_ACCESS",
            BreakLevelExceeded { .. } => "BREAK_LEVEL_EXCEEDED",
            ArityMismatch { .. } => "ARITY_TYPE_MISMATCH",
            NoActivation => "NO_ACTIV_ON_STACK",
            IllFormedStructure(_) | MalformedImmediate(_) => "ILLFORMED_STRUCTURE",
            FunctionIndexOutOfBounds(_) | TypeIndexOutOfBounds(_) => "FUNC_TYPE_ACCESS_OOB",
            GlobalIndexOutOfBounds(_) => "GLOBAL_ACCESS_OOB",
            IndirectCallTypeMismatch { .. } => "FUNC_TYPE_MISMATCH",
            ImmutableGlobal(_) => "IMMUTABLE_GLOBAL_CHANGED",
            DivisionByZero => "DIVISION_BY_ZERO",
            NotRepresentable => "VAL_NOT_REPRESENTABLE",
            FloatUnrepresentable(_) => "FLOAT_UNREPRESENTABLE",
            InvalidOpcode(_) => "INVALID_OPCODE",
            UnresolvedImport { .. } => "UNRESOLVED_IMPORT",
            CallStackExhausted(_) => "CALL_STACK_EXHAUSTED",
            StepLimitExceeded(_) => "STEP_LIMIT_EXCEEDED",
            At { source, .. } => source.code(),
        }
    }
}

impl From<VarintError> for RuntimeError {
    fn from(e: VarintError) -> Self {
        RuntimeError::MalformedImmediate(e)
    }
}
