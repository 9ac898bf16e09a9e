use std::fmt;

use super::LoadErrorKind;

/// Static description of a loaded module. Read-only once the loader returns it.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub version: u32,

    pub types: Vec<FunctionType>,
    pub imports: Vec<Import>,
    /// Signature index of each function defined by the module.
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<Limits>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<Element>,
    pub code: Vec<FunctionBody>,
    pub data: Vec<Data>,
    pub custom: Vec<CustomSection>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_string(),
            version: 1,
            ..Default::default()
        }
    }

    /// Number of imported functions, which occupy the low end of the function index space.
    pub fn imported_function_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|import| matches!(import.external_kind, ExternalKind::Function(_)))
            .count() as u32
    }

    /// Signature of any function in the index space, imported or defined.
    pub fn function_type(&self, index: u32) -> Option<&FunctionType> {
        let imported = self.imported_function_count();
        let type_index = if index < imported {
            self.imports
                .iter()
                .filter_map(|import| match import.external_kind {
                    ExternalKind::Function(type_index) => Some(type_index),
                    _ => None,
                })
                .nth(index as usize)?
        } else {
            *self.functions.get((index - imported) as usize)?
        };
        self.types.get(type_index as usize)
    }

    pub fn exported_function(&self, name: &str) -> Option<u32> {
        self.exports.iter().find_map(|export| match export.index {
            ExportIndex::Function(index) if export.name == name => Some(index),
            _ => None,
        })
    }

    pub fn get_function_name(&self, index: u32) -> Option<&str> {
        self.exports.iter().find_map(|export| match export.index {
            ExportIndex::Function(i) if i == index => Some(export.name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "module '{}' (version {})", self.name, self.version)?;
        writeln!(f, "Type[{}]:", self.types.len())?;
        for (i, ty) in self.types.iter().enumerate() {
            writeln!(f, " - type[{}] {}", i, ty)?;
        }
        if !self.imports.is_empty() {
            writeln!(f, "Import[{}]:", self.imports.len())?;
            for import in &self.imports {
                writeln!(f, " - {}", import)?;
            }
        }
        writeln!(f, "Function[{}]:", self.functions.len())?;
        let imported = self.imported_function_count();
        for (i, type_index) in self.functions.iter().enumerate() {
            let index = imported + i as u32;
            write!(f, " - func[{}] sig={}", index, type_index)?;
            if let Some(name) = self.get_function_name(index) {
                write!(f, " <{}>", name)?;
            }
            if let Some(body) = self.code.get(i) {
                write!(f, " locals={} size={}", body.locals.len(), body.code.len())?;
            }
            writeln!(f)?;
        }
        for (i, table) in self.tables.iter().enumerate() {
            writeln!(f, " - table[{}] funcref {}", i, table.limits)?;
        }
        for (i, memory) in self.memories.iter().enumerate() {
            writeln!(f, " - memory[{}] pages: {}", i, memory)?;
        }
        for (i, global) in self.globals.iter().enumerate() {
            writeln!(
                f,
                " - global[{}] {} mutable={} init={}",
                i,
                global.global_type.value_type,
                global.global_type.mutable,
                hex::encode(&global.init)
            )?;
        }
        if !self.exports.is_empty() {
            writeln!(f, "Export[{}]:", self.exports.len())?;
            for export in &self.exports {
                writeln!(f, " - {} -> \"{}\"", export.index, export.name)?;
            }
        }
        if let Some(start) = self.start {
            writeln!(f, "Start: func[{}]", start)?;
        }
        for (i, element) in self.elements.iter().enumerate() {
            writeln!(
                f,
                " - elem[{}] table={} init={} count={}",
                i,
                element.table_index,
                hex::encode(&element.offset),
                element.functions.len()
            )?;
        }
        for (i, data) in self.data.iter().enumerate() {
            let preview = &data.bytes[..data.bytes.len().min(16)];
            writeln!(
                f,
                " - data[{}] memory={} init={} size={} - {}{}",
                i,
                data.memory_index,
                hex::encode(&data.offset),
                data.bytes.len(),
                hex::encode(preview),
                if data.bytes.len() > preview.len() { "..." } else { "" }
            )?;
        }
        for section in &self.custom {
            writeln!(f, " - custom \"{}\" size={}", section.name, section.bytes.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn decode(byte: u8) -> Result<Self, LoadErrorKind> {
        match byte {
            0x7f => Ok(ValueType::I32),
            0x7e => Ok(ValueType::I64),
            0x7d => Ok(ValueType::F32),
            0x7c => Ok(ValueType::F64),
            _ => Err(LoadErrorKind::InvalidValueType(byte)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        })
    }
}

/// Result type of a `block`, `loop` or `if`. The MVP allows zero or one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(ValueType),
}

impl BlockType {
    pub fn decode(byte: u8) -> Result<Self, LoadErrorKind> {
        match byte {
            0x40 => Ok(BlockType::Empty),
            _ => ValueType::decode(byte).map(BlockType::Value),
        }
    }

    pub fn results(&self) -> &[ValueType] {
        match self {
            BlockType::Empty => &[],
            BlockType::Value(value_type) => std::slice::from_ref(value_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub return_types: Vec<ValueType>,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        };
        write!(
            f,
            "({}) -> {}",
            join(&self.parameters),
            if self.return_types.is_empty() {
                "nil".to_string()
            } else {
                join(&self.return_types)
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "initial={} max={}", self.min, max),
            None => write!(f, "initial={}", self.min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct Global {
    pub global_type: GlobalType,
    /// Raw initializer expression, including its terminating `end`.
    pub init: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalKind {
    Function(u32),
    Table(TableType),
    Memory(Limits),
    Global(GlobalType),
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub external_kind: ExternalKind,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.external_kind {
            ExternalKind::Function(type_index) => {
                write!(f, "func sig={} <- {}.{}", type_index, self.module, self.name)
            }
            ExternalKind::Table(table) => {
                write!(f, "table {} <- {}.{}", table.limits, self.module, self.name)
            }
            ExternalKind::Memory(limits) => {
                write!(f, "memory {} <- {}.{}", limits, self.module, self.name)
            }
            ExternalKind::Global(global) => {
                write!(f, "global {} <- {}.{}", global.value_type, self.module, self.name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

impl fmt::Display for ExportIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportIndex::Function(i) => write!(f, "func[{}]", i),
            ExportIndex::Table(i) => write!(f, "table[{}]", i),
            ExportIndex::Memory(i) => write!(f, "memory[{}]", i),
            ExportIndex::Global(i) => write!(f, "global[{}]", i),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

/// A defined function's locals (expanded, one entry per slot) and its code
/// bytes, which end with the function's final `end`.
#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub locals: Vec<ValueType>,
    pub code: Vec<u8>,
    /// Offset of `code[0]` within the module binary.
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub table_index: u32,
    pub offset: Vec<u8>,
    pub functions: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct Data {
    pub memory_index: u32,
    pub offset: Vec<u8>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CustomSection {
    pub name: String,
    pub bytes: Vec<u8>,
}
