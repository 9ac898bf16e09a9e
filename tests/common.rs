//! Common test utilities shared between integration tests
#![allow(dead_code)]

use wvm::config::Config;
use wvm::error::Error;
use wvm::parser::reader::{emit_vs32, emit_vu32};
use wvm::runtime::Value;

pub const I32: u8 = 0x7f;
pub const I64: u8 = 0x7e;
pub const F32: u8 = 0x7d;
pub const F64: u8 = 0x7c;

/// Assembles a module binary section by section.
#[derive(Default)]
pub struct ModuleBuilder {
    types: Vec<(Vec<u8>, Vec<u8>)>,
    imports: Vec<(String, String, u8, Vec<u8>)>,
    imported_functions: u32,
    functions: Vec<(u32, Vec<u8>, Vec<u8>)>,
    table: Option<(u32, Option<u32>)>,
    memory: Option<(u32, Option<u32>)>,
    globals: Vec<(u8, bool, Vec<u8>)>,
    exports: Vec<(String, u8, u32)>,
    start: Option<u32>,
    elements: Vec<(i32, Vec<u32>)>,
    data: Vec<(i32, Vec<u8>)>,
    custom: Vec<(String, Vec<u8>)>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function type and returns its index.
    pub fn typ(&mut self, params: &[u8], results: &[u8]) -> u32 {
        self.types.push((params.to_vec(), results.to_vec()));
        self.types.len() as u32 - 1
    }

    /// Imports a function and returns its index. Must precede `function`.
    pub fn import_function(&mut self, module: &str, name: &str, type_index: u32) -> u32 {
        self.imports
            .push((module.to_string(), name.to_string(), 0x00, emit_vu32(type_index)));
        self.imported_functions += 1;
        self.imported_functions - 1
    }

    pub fn import_memory(&mut self, module: &str, name: &str, min: u32) -> &mut Self {
        let mut desc = vec![0x00];
        desc.extend(emit_vu32(min));
        self.imports.push((module.to_string(), name.to_string(), 0x02, desc));
        self
    }

    /// Adds a defined function and returns its index in the function index
    /// space. `code` is the body without its final `end`.
    pub fn function(&mut self, type_index: u32, locals: &[u8], code: &[u8]) -> u32 {
        let mut body = code.to_vec();
        body.push(0x0b);
        self.functions.push((type_index, locals.to_vec(), body));
        self.imported_functions + self.functions.len() as u32 - 1
    }

    pub fn export(&mut self, name: &str, function_index: u32) -> &mut Self {
        self.exports.push((name.to_string(), 0x00, function_index));
        self
    }

    pub fn memory(&mut self, min: u32, max: Option<u32>) -> &mut Self {
        self.memory = Some((min, max));
        self
    }

    pub fn table(&mut self, min: u32, max: Option<u32>) -> &mut Self {
        self.table = Some((min, max));
        self
    }

    /// `init` is the constant expression without its `end`.
    pub fn global(&mut self, value_type: u8, mutable: bool, init: &[u8]) -> &mut Self {
        self.globals.push((value_type, mutable, init.to_vec()));
        self
    }

    pub fn start(&mut self, function_index: u32) -> &mut Self {
        self.start = Some(function_index);
        self
    }

    pub fn element(&mut self, offset: i32, functions: &[u32]) -> &mut Self {
        self.elements.push((offset, functions.to_vec()));
        self
    }

    pub fn data(&mut self, offset: i32, bytes: &[u8]) -> &mut Self {
        self.data.push((offset, bytes.to_vec()));
        self
    }

    pub fn custom(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        self.custom.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

        for (name, bytes) in &self.custom {
            let mut payload = name_bytes(name);
            payload.extend(bytes);
            section(&mut out, 0, payload);
        }
        if !self.types.is_empty() {
            let entries = self.types.iter().map(|(params, results)| {
                let mut entry = vec![0x60];
                entry.extend(vector(params.iter().map(|t| vec![*t])));
                entry.extend(vector(results.iter().map(|t| vec![*t])));
                entry
            });
            section(&mut out, 1, vector(entries));
        }
        if !self.imports.is_empty() {
            let entries = self.imports.iter().map(|(module, name, kind, desc)| {
                let mut entry = name_bytes(module);
                entry.extend(name_bytes(name));
                entry.push(*kind);
                entry.extend(desc);
                entry
            });
            section(&mut out, 2, vector(entries));
        }
        if !self.functions.is_empty() {
            let entries = self.functions.iter().map(|(type_index, _, _)| emit_vu32(*type_index));
            section(&mut out, 3, vector(entries));
        }
        if let Some((min, max)) = self.table {
            let mut entry = vec![0x70];
            entry.extend(limits(min, max));
            section(&mut out, 4, vector(std::iter::once(entry)));
        }
        if let Some((min, max)) = self.memory {
            section(&mut out, 5, vector(std::iter::once(limits(min, max))));
        }
        if !self.globals.is_empty() {
            let entries = self.globals.iter().map(|(value_type, mutable, init)| {
                let mut entry = vec![*value_type, *mutable as u8];
                entry.extend(init);
                entry.push(0x0b);
                entry
            });
            section(&mut out, 6, vector(entries));
        }
        if !self.exports.is_empty() {
            let entries = self.exports.iter().map(|(name, kind, index)| {
                let mut entry = name_bytes(name);
                entry.push(*kind);
                entry.extend(emit_vu32(*index));
                entry
            });
            section(&mut out, 7, vector(entries));
        }
        if let Some(start) = self.start {
            section(&mut out, 8, emit_vu32(start));
        }
        if !self.elements.is_empty() {
            let entries = self.elements.iter().map(|(offset, functions)| {
                let mut entry = emit_vu32(0);
                entry.extend(offset_expr(*offset));
                entry.extend(vector(functions.iter().map(|f| emit_vu32(*f))));
                entry
            });
            section(&mut out, 9, vector(entries));
        }
        if !self.functions.is_empty() {
            let entries = self.functions.iter().map(|(_, locals, code)| {
                let mut body = vector(locals.iter().map(|t| {
                    let mut group = emit_vu32(1);
                    group.push(*t);
                    group
                }));
                body.extend(code);
                let mut entry = emit_vu32(body.len() as u32);
                entry.extend(body);
                entry
            });
            section(&mut out, 10, vector(entries));
        }
        if !self.data.is_empty() {
            let entries = self.data.iter().map(|(offset, bytes)| {
                let mut entry = emit_vu32(0);
                entry.extend(offset_expr(*offset));
                entry.extend(emit_vu32(bytes.len() as u32));
                entry.extend(bytes);
                entry
            });
            section(&mut out, 11, vector(entries));
        }
        out
    }

    pub fn run(&self) -> Result<Vec<Value>, Error> {
        run(self.build())
    }
}

pub fn run(wasm: Vec<u8>) -> Result<Vec<Value>, Error> {
    wvm::run_bytes("test", wasm, &Config::default())
}

pub fn run_with_config(wasm: Vec<u8>, config: &Config) -> Result<Vec<Value>, Error> {
    wvm::run_bytes("test", wasm, config)
}

/// A module whose exported `main` of type `() -> results` runs `code`.
pub fn main_module(results: &[u8], locals: &[u8], code: &[u8]) -> ModuleBuilder {
    let mut builder = ModuleBuilder::new();
    let typ = builder.typ(&[], results);
    let main = builder.function(typ, locals, code);
    builder.export("main", main);
    builder
}

fn section(out: &mut Vec<u8>, id: u8, payload: Vec<u8>) {
    out.push(id);
    out.extend(emit_vu32(payload.len() as u32));
    out.extend(payload);
}

fn vector(entries: impl Iterator<Item = Vec<u8>>) -> Vec<u8> {
    let entries: Vec<Vec<u8>> = entries.collect();
    let mut out = emit_vu32(entries.len() as u32);
    for entry in entries {
        out.extend(entry);
    }
    out
}

fn name_bytes(name: &str) -> Vec<u8> {
    let mut out = emit_vu32(name.len() as u32);
    out.extend(name.as_bytes());
    out
}

fn limits(min: u32, max: Option<u32>) -> Vec<u8> {
    match max {
        Some(max) => [vec![0x01], emit_vu32(min), emit_vu32(max)].concat(),
        None => [vec![0x00], emit_vu32(min)].concat(),
    }
}

fn offset_expr(offset: i32) -> Vec<u8> {
    let mut out = vec![0x41];
    out.extend(emit_vs32(offset));
    out.push(0x0b);
    out
}
