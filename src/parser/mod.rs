//! Binary format loader. Turns a `.wasm` byte stream into a static [`module::Module`].

pub mod module;
pub mod opcode;
pub mod reader;

use std::path::Path;

use log::debug;

use self::module::{
    CustomSection, Data, Element, Export, ExportIndex, ExternalKind, FunctionBody,
    FunctionType, Global, GlobalType, Import, Limits, Module, TableType, ValueType,
};
use self::opcode::Immediate;
use self::reader::{Reader, VarintError};

pub const MAGIC: u32 = 0x6d736100;
pub const VERSION: u32 = 1;

const MAX_LOCALS: u64 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadErrorKind {
    #[error("Invalid binary magic code found: {0:#010x}")]
    InvalidMagic(u32),
    #[error("Invalid WebAssembly version code found: {0}")]
    InvalidVersion(u32),
    #[error("Invalid section id found: {0}")]
    InvalidSectionId(u8),
    #[error("Section {id} out of order, follows section {previous}")]
    SectionOutOfOrder { id: u8, previous: u8 },
    #[error("Section {id} declared {expected} bytes but {actual} were consumed")]
    SectionSizeMismatch { id: u8, expected: u32, actual: usize },
    #[error("Invalid function type form found: {0:#04x}")]
    InvalidFunctionType(u8),
    #[error("Function type index out of bounds: {0}")]
    TypeIndexOutOfBounds(u32),
    #[error("Invalid value type found: {0:#04x}")]
    InvalidValueType(u8),
    #[error("Invalid element type found, only `anyfunc` allowed: {0:#04x}")]
    InvalidElementType(u8),
    #[error("Invalid external kind found: {0:#04x}")]
    InvalidExternalKind(u8),
    #[error("Invalid limits flag found: {0:#04x}")]
    InvalidLimits(u8),
    #[error("Invalid global signature, mutability flag {0:#04x}")]
    InvalidGlobalSignature(u8),
    #[error("Invalid opcode in initializer expression: {0:#04x}")]
    InvalidInitExpr(u8),
    #[error("Function and code section counts differ: {functions} != {bodies}")]
    FunctionCountMismatch { functions: usize, bodies: usize },
    #[error("Too many locals declared: {0}")]
    TooManyLocals(u64),
    #[error("Bad input stream: unexpected end of input")]
    UnexpectedEof,
    #[error("Bad input stream: {0}")]
    Varint(#[from] VarintError),
    #[error("Bad input stream: invalid utf-8 sequence")]
    InvalidUtf8,
    #[error("Invalid input path: {0}")]
    InvalidInputPath(String),
}

impl LoadErrorKind {
    pub fn code(&self) -> &'static str {
        use LoadErrorKind::*;
        match self {
            InvalidMagic(_) => "INVALID_MAGIC",
            InvalidVersion(_) => "INVALID_VER",
            InvalidSectionId(_) | SectionOutOfOrder { .. } => "INVALID_SECTION_ID",
            InvalidFunctionType(_) | TypeIndexOutOfBounds(_) | InvalidValueType(_) => {
                "INVALID_FUNC_TYPE"
            }
            InvalidElementType(_) => "INVALID_ELEM_TYPE",
            InvalidGlobalSignature(_) | InvalidInitExpr(_) => "INVALID_GLOBAL_SIG",
            InvalidInputPath(_) => "INVALID_INPUT_PATH",
            SectionSizeMismatch { .. }
            | InvalidExternalKind(_)
            | InvalidLimits(_)
            | FunctionCountMismatch { .. }
            | TooManyLocals(_)
            | UnexpectedEof
            | Varint(_)
            | InvalidUtf8 => "BAD_FSTREAM",
        }
    }
}

/// A load failure and the byte offset at which it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub offset: usize,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, offset: usize) -> LoadError {
        LoadError { kind, offset }
    }
}

/// Reads and parses the module at `path`.
pub fn load(path: &Path) -> Result<Module, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| {
        LoadError::new(
            LoadErrorKind::InvalidInputPath(format!("{}: {}", path.display(), e)),
            0,
        )
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    load_bytes(&name, bytes)
}

pub fn load_bytes(name: &str, bytes: Vec<u8>) -> Result<Module, LoadError> {
    let mut reader = Reader::new(bytes);
    let mut module = Module::new(name);

    read_header(&mut reader, &mut module)?;

    let mut previous = 0u8;
    while reader.has_at_least(1) {
        let id_pos = reader.pos();
        let id = reader.read_byte()?;
        let len = reader.read_vu32()?;
        if !reader.has_at_least(len as usize) {
            return Err(reader.error(LoadErrorKind::UnexpectedEof));
        }

        if id != 0 {
            if id > 11 {
                return Err(LoadError::new(LoadErrorKind::InvalidSectionId(id), id_pos));
            }
            if id <= previous {
                return Err(LoadError::new(
                    LoadErrorKind::SectionOutOfOrder { id, previous },
                    id_pos,
                ));
            }
            previous = id;
        }

        let start = reader.pos();
        read_section(id, len, &mut reader, &mut module)?;
        let consumed = reader.pos() - start;
        if consumed != len as usize {
            return Err(LoadError::new(
                LoadErrorKind::SectionSizeMismatch {
                    id,
                    expected: len,
                    actual: consumed,
                },
                start,
            ));
        }
        debug!("section #{} len = {}", id, len);
    }

    if module.functions.len() != module.code.len() {
        return Err(reader.error(LoadErrorKind::FunctionCountMismatch {
            functions: module.functions.len(),
            bodies: module.code.len(),
        }));
    }

    debug!(
        "loaded '{}': {} types, {} functions, {} exports",
        module.name,
        module.types.len(),
        module.functions.len(),
        module.exports.len()
    );
    Ok(module)
}

fn read_header(reader: &mut Reader, module: &mut Module) -> Result<(), LoadError> {
    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(LoadError::new(LoadErrorKind::InvalidMagic(magic), 0));
    }
    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(LoadError::new(LoadErrorKind::InvalidVersion(version), 4));
    }
    module.version = version;
    Ok(())
}

fn read_section(id: u8, len: u32, reader: &mut Reader, module: &mut Module) -> Result<(), LoadError> {
    match id {
        0 => read_section_custom(reader, len, &mut module.custom),
        1 => read_section_type(reader, &mut module.types),
        2 => read_section_import(reader, &mut module.imports),
        3 => read_section_function(reader, &mut module.functions, module.types.len()),
        4 => read_section_table(reader, &mut module.tables),
        5 => read_section_memory(reader, &mut module.memories),
        6 => read_section_global(reader, &mut module.globals),
        7 => read_section_export(reader, &mut module.exports),
        8 => {
            module.start = Some(reader.read_vu32()?);
            Ok(())
        }
        9 => read_section_element(reader, &mut module.elements),
        10 => read_section_code(reader, &mut module.code),
        11 => read_section_data(reader, &mut module.data),
        _ => Err(reader.error(LoadErrorKind::InvalidSectionId(id))),
    }
}

/* SECTION READERS ************************************************/

fn read_value_type(reader: &mut Reader) -> Result<ValueType, LoadError> {
    let pos = reader.pos();
    ValueType::decode(reader.read_byte()?).map_err(|kind| LoadError::new(kind, pos))
}

fn read_result_types(reader: &mut Reader) -> Result<Vec<ValueType>, LoadError> {
    let count = reader.read_vu32()?;
    (0..count).map(|_| read_value_type(reader)).collect()
}

fn read_limits(reader: &mut Reader) -> Result<Limits, LoadError> {
    let pos = reader.pos();
    match reader.read_byte()? {
        0 => Ok(Limits {
            min: reader.read_vu32()?,
            max: None,
        }),
        1 => Ok(Limits {
            min: reader.read_vu32()?,
            max: Some(reader.read_vu32()?),
        }),
        flag => Err(LoadError::new(LoadErrorKind::InvalidLimits(flag), pos)),
    }
}

fn read_table_type(reader: &mut Reader) -> Result<TableType, LoadError> {
    let pos = reader.pos();
    let elem_type = reader.read_byte()?;
    if elem_type != 0x70 {
        return Err(LoadError::new(LoadErrorKind::InvalidElementType(elem_type), pos));
    }
    Ok(TableType {
        limits: read_limits(reader)?,
    })
}

fn read_global_type(reader: &mut Reader) -> Result<GlobalType, LoadError> {
    let value_type = read_value_type(reader)?;
    let pos = reader.pos();
    let mutable = match reader.read_byte()? {
        0 => false,
        1 => true,
        flag => return Err(LoadError::new(LoadErrorKind::InvalidGlobalSignature(flag), pos)),
    };
    Ok(GlobalType { value_type, mutable })
}

/// Reads an initializer expression up to and including its `end`, returning the raw bytes.
fn read_init_expr(reader: &mut Reader) -> Result<Vec<u8>, LoadError> {
    let mut expr = vec![];
    loop {
        let pos = reader.pos();
        let op = reader.read_byte()?;
        expr.push(op);
        if op == opcode::END {
            return Ok(expr);
        }
        let immediate = opcode::info(op)
            .map(|info| info.immediate)
            .ok_or_else(|| LoadError::new(LoadErrorKind::InvalidInitExpr(op), pos))?;
        let operand_pos = reader.pos();
        match immediate {
            Immediate::None => {}
            Immediate::VarU32 => {
                reader.read_vu32()?;
            }
            Immediate::VarS32 => {
                reader.read_vs32()?;
            }
            Immediate::VarS64 => {
                reader.read_vs64()?;
            }
            Immediate::F32 => {
                reader.read_bytes(4)?;
            }
            Immediate::F64 => {
                reader.read_bytes(8)?;
            }
            _ => return Err(LoadError::new(LoadErrorKind::InvalidInitExpr(op), pos)),
        }
        expr.extend_from_slice(reader.slice(operand_pos, reader.pos()));
    }
}

fn read_section_custom(reader: &mut Reader, len: u32, custom: &mut Vec<CustomSection>) -> Result<(), LoadError> {
    let start = reader.pos();
    let name = reader.read_string()?;
    let used = reader.pos() - start;
    let remaining = (len as usize)
        .checked_sub(used)
        .ok_or_else(|| reader.error(LoadErrorKind::UnexpectedEof))?;
    let bytes = reader.read_bytes(remaining)?;
    debug!("custom section '{}' ({} bytes)", name, bytes.len());
    custom.push(CustomSection { name, bytes });
    Ok(())
}

fn read_section_type(reader: &mut Reader, types: &mut Vec<FunctionType>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let pos = reader.pos();
        let form = reader.read_byte()?;
        if form != 0x60 {
            return Err(LoadError::new(LoadErrorKind::InvalidFunctionType(form), pos));
        }
        let parameters = read_result_types(reader)?;
        let return_types = read_result_types(reader)?;
        types.push(FunctionType {
            parameters,
            return_types,
        });
    }
    Ok(())
}

fn read_section_import(reader: &mut Reader, imports: &mut Vec<Import>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let module = reader.read_string()?;
        let name = reader.read_string()?;
        let pos = reader.pos();
        let external_kind = match reader.read_byte()? {
            0 => ExternalKind::Function(reader.read_vu32()?),
            1 => ExternalKind::Table(read_table_type(reader)?),
            2 => ExternalKind::Memory(read_limits(reader)?),
            3 => ExternalKind::Global(read_global_type(reader)?),
            kind => return Err(LoadError::new(LoadErrorKind::InvalidExternalKind(kind), pos)),
        };
        imports.push(Import {
            module,
            name,
            external_kind,
        });
    }
    Ok(())
}

fn read_section_function(
    reader: &mut Reader,
    functions: &mut Vec<u32>,
    type_count: usize,
) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let pos = reader.pos();
        let type_index = reader.read_vu32()?;
        if type_index as usize >= type_count {
            return Err(LoadError::new(
                LoadErrorKind::TypeIndexOutOfBounds(type_index),
                pos,
            ));
        }
        functions.push(type_index);
    }
    Ok(())
}

fn read_section_table(reader: &mut Reader, tables: &mut Vec<TableType>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        tables.push(read_table_type(reader)?);
    }
    Ok(())
}

fn read_section_memory(reader: &mut Reader, memories: &mut Vec<Limits>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        memories.push(read_limits(reader)?);
    }
    Ok(())
}

fn read_section_global(reader: &mut Reader, globals: &mut Vec<Global>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let global_type = read_global_type(reader)?;
        let init = read_init_expr(reader)?;
        globals.push(Global { global_type, init });
    }
    Ok(())
}

fn read_section_export(reader: &mut Reader, exports: &mut Vec<Export>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let name = reader.read_string()?;
        let pos = reader.pos();
        let kind = reader.read_byte()?;
        let index = reader.read_vu32()?;
        let index = match kind {
            0 => ExportIndex::Function(index),
            1 => ExportIndex::Table(index),
            2 => ExportIndex::Memory(index),
            3 => ExportIndex::Global(index),
            _ => return Err(LoadError::new(LoadErrorKind::InvalidExternalKind(kind), pos)),
        };
        exports.push(Export { name, index });
    }
    Ok(())
}

fn read_section_element(reader: &mut Reader, elements: &mut Vec<Element>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let table_index = reader.read_vu32()?;
        let offset = read_init_expr(reader)?;
        let len = reader.read_vu32()?;
        let functions = (0..len)
            .map(|_| reader.read_vu32())
            .collect::<Result<Vec<u32>, LoadError>>()?;
        elements.push(Element {
            table_index,
            offset,
            functions,
        });
    }
    Ok(())
}

fn read_section_code(reader: &mut Reader, code: &mut Vec<FunctionBody>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let size = reader.read_vu32()? as usize;
        let body_start = reader.pos();
        if !reader.has_at_least(size) {
            return Err(reader.error(LoadErrorKind::UnexpectedEof));
        }

        let mut locals = vec![];
        let mut total: u64 = 0;
        let groups = reader.read_vu32()?;
        for _ in 0..groups {
            let pos = reader.pos();
            let n = reader.read_vu32()?;
            total += n as u64;
            if total > MAX_LOCALS {
                return Err(LoadError::new(LoadErrorKind::TooManyLocals(total), pos));
            }
            let value_type = read_value_type(reader)?;
            locals.extend(std::iter::repeat(value_type).take(n as usize));
        }

        let position = reader.pos();
        let header = position - body_start;
        let code_len = size
            .checked_sub(header)
            .ok_or_else(|| reader.error(LoadErrorKind::UnexpectedEof))?;
        let bytes = reader.read_bytes(code_len)?;
        if bytes.last() != Some(&opcode::END) {
            return Err(reader.error(LoadErrorKind::UnexpectedEof));
        }
        code.push(FunctionBody {
            locals,
            code: bytes,
            position,
        });
    }
    Ok(())
}

fn read_section_data(reader: &mut Reader, data: &mut Vec<Data>) -> Result<(), LoadError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        let memory_index = reader.read_vu32()?;
        let offset = read_init_expr(reader)?;
        let bytes = reader.read_u8vec()?;
        data.push(Data {
            memory_index,
            offset,
            bytes,
        });
    }
    Ok(())
}
