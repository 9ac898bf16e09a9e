//! A WebAssembly MVP virtual machine.
//!
//! wvm loads a `.wasm` binary into a static [`parser::module::Module`],
//! instantiates it into a [`runtime::Runtime`] (memories, tables, globals and
//! function descriptors), and runs an exported entry function on a
//! stack-machine interpreter.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format loader and the static module model.
//! - [`runtime`] -- Instantiation, the evaluation stack, and the interpreter.
//! - [`config`] -- Settings shared by the loader, instantiator and executor.
//! - [`error`] -- The top-level error and its report form.
//!
//! # Example
//!
//! Run a module whose `main` returns `i32.const 42`:
//!
//! ```
//! use wvm::config::Config;
//! use wvm::runtime::Value;
//!
//! let wasm = vec![
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // header
//!     0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7f, // type: () -> i32
//!     0x03, 0x02, 0x01, 0x00, // func[0]: type 0
//!     0x07, 0x08, 0x01, 0x04, b'm', b'a', b'i', b'n', 0x00, 0x00, // export "main"
//!     0x0a, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2a, 0x0b, // code: i32.const 42
//! ];
//! let results = wvm::run_bytes("answer", wasm, &Config::default()).unwrap();
//! assert_eq!(results, vec![Value::I32(42)]);
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod runtime;

use std::path::Path;

use config::Config;
use error::Error;
use parser::module::Module;
use runtime::{Executor, Instantiator, Value};

/// Instantiates `module` and runs its configured entry export.
pub fn run_module(module: &Module, config: &Config) -> Result<Vec<Value>, Error> {
    let runtime = Instantiator::instantiate(module, config)?;
    let mut executor = Executor::new(runtime, config);
    Ok(executor.execute(None)?)
}

pub fn run_bytes(name: &str, bytes: Vec<u8>, config: &Config) -> Result<Vec<Value>, Error> {
    let module = parser::load_bytes(name, bytes)?;
    run_module(&module, config)
}

pub fn run_file(path: &Path, config: &Config) -> Result<Vec<Value>, Error> {
    let module = parser::load(path)?;
    run_module(&module, config)
}
