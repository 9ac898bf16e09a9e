//! Runtime state of an instantiated module and the instantiator that builds it.

use std::rc::Rc;

use log::debug;

use super::memory::Memory;
use super::stack::Stack;
use super::table::Table;
use super::{RuntimeError, Value};
use crate::config::Config;
use crate::parser::module::{ExternalKind, FunctionType, Module, ValueType};
use crate::parser::opcode;
use crate::parser::reader::{decode_vs32, decode_vs64};

/// Everything the interpreter needs to call a defined function.
#[derive(Debug)]
pub struct FuncDescriptor {
    /// Index in the module's function index space.
    pub index: u32,
    pub type_index: u32,
    pub signature: Rc<FunctionType>,
    /// Code bytes, ending with the function's final `end`.
    pub code: Vec<u8>,
    /// Offset of `code[0]` within the module binary.
    pub position: usize,
    /// Parameters followed by declared locals, all zeroed.
    pub locals_default: Vec<Value>,
    pub execution_count: u64,
}

#[derive(Debug)]
pub struct ImportedFunction {
    pub module: String,
    pub name: String,
    pub signature: Rc<FunctionType>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalInstance {
    pub value: Value,
    pub mutable: bool,
}

/// Mutable state of one module instance. Owned by a single execution.
#[derive(Debug)]
pub struct Runtime {
    pub types: Vec<Rc<FunctionType>>,
    pub imported: Vec<ImportedFunction>,
    pub functions: Vec<FuncDescriptor>,
    pub memories: Vec<Memory>,
    pub tables: Vec<Table>,
    pub globals: Vec<GlobalInstance>,
    pub start: Option<u32>,
    /// Function index of the configured entry export, if the module has one.
    pub entry: Option<u32>,
    pub stack: Stack,
}

/// A function in the index space, resolved.
pub enum Callee<'r> {
    Imported(&'r ImportedFunction),
    Defined(u32, &'r FuncDescriptor),
}

impl Runtime {
    pub fn callee(&self, index: u32) -> Result<Callee<'_>, RuntimeError> {
        let imported = self.imported.len() as u32;
        if index < imported {
            return Ok(Callee::Imported(&self.imported[index as usize]));
        }
        let defined = index - imported;
        self.functions
            .get(defined as usize)
            .map(|descriptor| Callee::Defined(defined, descriptor))
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(index))
    }

    pub fn signature(&self, index: u32) -> Result<Rc<FunctionType>, RuntimeError> {
        Ok(match self.callee(index)? {
            Callee::Imported(import) => import.signature.clone(),
            Callee::Defined(_, descriptor) => descriptor.signature.clone(),
        })
    }

    pub fn function_count(&self) -> u32 {
        (self.imported.len() + self.functions.len()) as u32
    }

    pub fn memory(&self) -> Result<&Memory, RuntimeError> {
        self.memories.first().ok_or(RuntimeError::NoMemory)
    }

    pub fn table(&self) -> Result<&Table, RuntimeError> {
        self.tables.first().ok_or(RuntimeError::NoTable)
    }
}

pub struct Instantiator;

impl Instantiator {
    /// Builds runtime state from `module`: globals, function descriptors,
    /// memories and their data, tables and their elements, then the entry point.
    pub fn instantiate(module: &Module, config: &Config) -> Result<Runtime, RuntimeError> {
        let types: Vec<Rc<FunctionType>> = module.types.iter().cloned().map(Rc::new).collect();
        let signature_of = |type_index: u32| {
            types
                .get(type_index as usize)
                .cloned()
                .ok_or(RuntimeError::TypeIndexOutOfBounds(type_index))
        };

        let mut imported = vec![];
        for import in &module.imports {
            match import.external_kind {
                ExternalKind::Function(type_index) => imported.push(ImportedFunction {
                    module: import.module.clone(),
                    name: import.name.clone(),
                    signature: signature_of(type_index)?,
                }),
                _ => {
                    return Err(RuntimeError::UnsupportedImport {
                        module: import.module.clone(),
                        name: import.name.clone(),
                    })
                }
            }
        }

        // (1) globals
        let globals = module
            .globals
            .iter()
            .map(|global| {
                let value = evaluate_const(&global.init)?;
                if value.typ() != global.global_type.value_type {
                    return Err(RuntimeError::InvalidInitExpr(format!(
                        "{} initializer for a {} global",
                        value.typ(),
                        global.global_type.value_type
                    )));
                }
                Ok(GlobalInstance {
                    value,
                    mutable: global.global_type.mutable,
                })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;
        debug!("instantiated {} globals", globals.len());

        // (2) function descriptors
        let first_index = imported.len() as u32;
        let mut functions = Vec::with_capacity(module.functions.len());
        for (i, (type_index, body)) in module.functions.iter().zip(&module.code).enumerate() {
            let signature = signature_of(*type_index)?;
            let locals_default = signature
                .parameters
                .iter()
                .chain(&body.locals)
                .map(|typ| Value::default_for(*typ))
                .collect();
            functions.push(FuncDescriptor {
                index: first_index + i as u32,
                type_index: *type_index,
                signature,
                code: body.code.clone(),
                position: body.position,
                locals_default,
                execution_count: 0,
            });
        }
        debug!("built {} function descriptors", functions.len());

        // (3) memories
        let mut memories = module
            .memories
            .iter()
            .map(|limits| Memory::new(limits.min, limits.max, config.max_pages))
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        // (4) data segments
        for data in &module.data {
            let offset = evaluate_offset(&data.offset)?;
            let memory = memories
                .get_mut(data.memory_index as usize)
                .ok_or(RuntimeError::NoMemory)?;
            let size = memory.size_bytes();
            memory
                .write_bytes(offset as u64, &data.bytes)
                .map_err(|_| RuntimeError::DataExceedsMemory {
                    offset,
                    len: data.bytes.len(),
                    size,
                })?;
        }
        debug!(
            "allocated {} memories, copied {} data segments",
            memories.len(),
            module.data.len()
        );

        // (5) tables
        let mut tables = module
            .tables
            .iter()
            .map(|table| Table::new(table.limits, config.max_table_size))
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        // (6) element segments
        let function_count = first_index + functions.len() as u32;
        for element in &module.elements {
            let offset = evaluate_offset(&element.offset)?;
            if let Some(bad) = element.functions.iter().find(|f| **f >= function_count) {
                return Err(RuntimeError::FunctionIndexOutOfBounds(*bad));
            }
            tables
                .get_mut(element.table_index as usize)
                .ok_or(RuntimeError::NoTable)?
                .initialize(offset, &element.functions)?;
        }

        // (7) entry point
        if let Some(start) = module.start {
            if start >= function_count {
                return Err(RuntimeError::FunctionIndexOutOfBounds(start));
            }
        }
        let entry = module.exported_function(&config.entry);
        match entry {
            Some(index) => debug!("entry '{}' is func[{}]", config.entry, index),
            None => debug!("no function exported as '{}'", config.entry),
        }

        Ok(Runtime {
            types,
            imported,
            functions,
            memories,
            tables,
            globals,
            start: module.start,
            entry,
            stack: Stack::new(),
        })
    }
}

/// Evaluates an initializer expression, which must be exactly one constant
/// instruction followed by `end`.
pub fn evaluate_const(expr: &[u8]) -> Result<Value, RuntimeError> {
    let invalid = || RuntimeError::InvalidInitExpr(format!("expected a single constant, got {}", hex::encode(expr)));
    let op = *expr.first().ok_or_else(invalid)?;
    let (value, next) = match op {
        opcode::I32_CONST => decode_vs32(expr, 1).map(|(v, next)| (Value::I32(v), next)),
        opcode::I64_CONST => decode_vs64(expr, 1).map(|(v, next)| (Value::I64(v), next)),
        opcode::F32_CONST if expr.len() >= 5 => Ok((
            Value::F32(f32::from_le_bytes([expr[1], expr[2], expr[3], expr[4]])),
            5,
        )),
        opcode::F64_CONST if expr.len() >= 9 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&expr[1..9]);
            Ok((Value::F64(f64::from_le_bytes(bytes)), 9))
        }
        _ => return Err(invalid()),
    }
    .map_err(|_| invalid())?;

    if expr.get(next) != Some(&opcode::END) || expr.len() != next + 1 {
        return Err(invalid());
    }
    Ok(value)
}

fn evaluate_offset(expr: &[u8]) -> Result<u32, RuntimeError> {
    match evaluate_const(expr)? {
        Value::I32(offset) => Ok(offset as u32),
        other => Err(RuntimeError::InvalidInitExpr(format!(
            "segment offset must be i32, got {}",
            other.typ()
        ))),
    }
}

impl FuncDescriptor {
    pub fn result_types(&self) -> &[ValueType] {
        &self.signature.return_types
    }
}
