//! Test utilities for runtime testing
//!
//! Builds a one-function module around raw code bytes and runs it through
//! the instantiator and executor.

#[cfg(test)]
pub mod test {
    use crate::config::Config;
    use crate::parser::module::{
        Element, Export, ExportIndex, FunctionBody, FunctionType, Global, GlobalType, Limits, Module,
        TableType, ValueType,
    };
    use crate::parser::opcode;
    use crate::parser::reader::{emit_vs32, emit_vs64, emit_vu32};
    use crate::runtime::executor::Executor;
    use crate::runtime::{Instantiator, RuntimeError, Value};

    struct ExtraFunction {
        signature: FunctionType,
        locals: Vec<ValueType>,
        code: Vec<u8>,
    }

    /// Test builder for creating executor tests fluently. The code under
    /// test becomes func[0], exported as `main`; `.function()` adds func[1..].
    pub struct ExecutorTest {
        code: Vec<u8>,
        args: Vec<Value>,
        locals: Vec<ValueType>,
        return_types: Vec<ValueType>,
        memory: Option<Limits>,
        globals: Vec<Global>,
        functions: Vec<ExtraFunction>,
        types: Vec<FunctionType>,
        table: Option<(u32, Vec<u32>)>,
        position: usize,
        append_end: bool,
    }

    impl Default for ExecutorTest {
        fn default() -> Self {
            ExecutorTest::new()
        }
    }

    impl ExecutorTest {
        pub fn new() -> Self {
            ExecutorTest {
                code: Vec::new(),
                args: Vec::new(),
                locals: Vec::new(),
                return_types: Vec::new(),
                memory: None,
                globals: Vec::new(),
                functions: Vec::new(),
                types: Vec::new(),
                table: None,
                position: 0,
                append_end: true,
            }
        }

        pub fn with_memory(mut self, min: u32, max: Option<u32>) -> Self {
            self.memory = Some(Limits { min, max });
            self
        }

        pub fn inst(mut self, op: u8) -> Self {
            self.code.push(op);
            self
        }

        pub fn bytes(mut self, bytes: &[u8]) -> Self {
            self.code.extend_from_slice(bytes);
            self
        }

        pub fn imm_u32(mut self, value: u32) -> Self {
            self.code.extend(emit_vu32(value));
            self
        }

        pub fn memarg(self, align: u32, offset: u32) -> Self {
            self.imm_u32(align).imm_u32(offset)
        }

        pub fn block_type(mut self, result: Option<ValueType>) -> Self {
            self.code.push(result.map_or(0x40, value_type_byte));
            self
        }

        pub fn i32_const(mut self, value: i32) -> Self {
            self.code.push(opcode::I32_CONST);
            self.code.extend(emit_vs32(value));
            self
        }

        pub fn i64_const(mut self, value: i64) -> Self {
            self.code.push(opcode::I64_CONST);
            self.code.extend(emit_vs64(value));
            self
        }

        pub fn f32_const(mut self, value: f32) -> Self {
            self.code.push(opcode::F32_CONST);
            self.code.extend_from_slice(&value.to_le_bytes());
            self
        }

        pub fn f64_const(mut self, value: f64) -> Self {
            self.code.push(opcode::F64_CONST);
            self.code.extend_from_slice(&value.to_le_bytes());
            self
        }

        /// Arguments to pass; their types become the parameters of func[0].
        pub fn args(mut self, args: Vec<Value>) -> Self {
            self.args = args;
            self
        }

        pub fn local(mut self, typ: ValueType) -> Self {
            self.locals.push(typ);
            self
        }

        pub fn returns(mut self, types: Vec<ValueType>) -> Self {
            self.return_types = types;
            self
        }

        pub fn global(mut self, value: Value, mutable: bool) -> Self {
            let mut init = match value {
                Value::I32(v) => [vec![opcode::I32_CONST], emit_vs32(v)].concat(),
                Value::I64(v) => [vec![opcode::I64_CONST], emit_vs64(v)].concat(),
                Value::F32(v) => [vec![opcode::F32_CONST], v.to_le_bytes().to_vec()].concat(),
                Value::F64(v) => [vec![opcode::F64_CONST], v.to_le_bytes().to_vec()].concat(),
            };
            init.push(opcode::END);
            self.globals.push(Global {
                global_type: GlobalType {
                    value_type: value.typ(),
                    mutable,
                },
                init,
            });
            self
        }

        /// Adds a defined function; `code` gets its final `end` appended.
        pub fn function(
            mut self,
            parameters: Vec<ValueType>,
            return_types: Vec<ValueType>,
            locals: Vec<ValueType>,
            code: Vec<u8>,
        ) -> Self {
            self.functions.push(ExtraFunction {
                signature: FunctionType {
                    parameters,
                    return_types,
                },
                locals,
                code,
            });
            self
        }

        /// Adds a type after those of the functions.
        pub fn typ(mut self, function_type: FunctionType) -> Self {
            self.types.push(function_type);
            self
        }

        /// A table holding `functions` from slot 0.
        pub fn table(mut self, functions: Vec<u32>) -> Self {
            self.table = Some((functions.len() as u32, functions));
            self
        }

        pub fn table_size(mut self, size: u32) -> Self {
            self.table = Some((size, vec![]));
            self
        }

        /// Module offset of func[0]'s first code byte.
        pub fn position(mut self, position: usize) -> Self {
            self.position = position;
            self
        }

        pub fn without_end(mut self) -> Self {
            self.append_end = false;
            self
        }

        pub fn build(&self) -> Module {
            let mut module = Module::new("test");
            let mut code = self.code.clone();
            if self.append_end {
                code.push(opcode::END);
            }

            module.types.push(FunctionType {
                parameters: self.args.iter().map(Value::typ).collect(),
                return_types: self.return_types.clone(),
            });
            module.functions.push(0);
            module.code.push(FunctionBody {
                locals: self.locals.clone(),
                code,
                position: self.position,
            });

            for function in &self.functions {
                module.functions.push(module.types.len() as u32);
                module.types.push(function.signature.clone());
                let mut code = function.code.clone();
                code.push(opcode::END);
                module.code.push(FunctionBody {
                    locals: function.locals.clone(),
                    code,
                    position: 0,
                });
            }
            module.types.extend(self.types.iter().cloned());

            if let Some(limits) = self.memory {
                module.memories.push(limits);
            }
            module.globals = self.globals.clone();
            if let Some((size, functions)) = &self.table {
                module.tables.push(TableType {
                    limits: Limits { min: *size, max: None },
                });
                if !functions.is_empty() {
                    module.elements.push(Element {
                        table_index: 0,
                        offset: vec![opcode::I32_CONST, 0, opcode::END],
                        functions: functions.clone(),
                    });
                }
            }
            module.exports.push(Export {
                name: "main".to_string(),
                index: ExportIndex::Function(0),
            });
            module
        }

        pub fn run_with(&self, args: Vec<Value>, config: &Config) -> Result<Vec<Value>, RuntimeError> {
            let runtime = Instantiator::instantiate(&self.build(), config)?;
            let mut executor = Executor::new(runtime, config);
            executor.invoke(0, &args)
        }

        pub fn run(&self) -> Result<Vec<Value>, RuntimeError> {
            self.run_with(self.args.clone(), &Config::default())
        }

        pub fn run_with_args(&self, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
            self.run_with(args, &Config::default())
        }

        pub fn run_with_config(&self, config: &Config) -> Result<Vec<Value>, RuntimeError> {
            self.run_with(self.args.clone(), config)
        }

        pub fn expect_stack(self, expected: Vec<Value>) {
            match self.run() {
                Ok(results) => assert_eq!(results, expected),
                Err(e) => panic!("Execution failed: {e} ({})", e.code()),
            }
        }

        pub fn expect_error(self, error_contains: &str) {
            match self.run() {
                Err(e) => {
                    let error_string = e.to_string();
                    assert!(
                        error_string.contains(error_contains),
                        "Expected error containing '{error_contains}', got: {error_string}"
                    );
                }
                Ok(results) => panic!("Expected error containing '{error_contains}', but execution succeeded with {results:?}"),
            }
        }

        pub fn expect_code(self, code: &str) {
            match self.run() {
                Err(e) => assert_eq!(e.code(), code, "unexpected error: {e}"),
                Ok(results) => panic!("Expected {code}, but execution succeeded with {results:?}"),
            }
        }
    }

    fn value_type_byte(typ: ValueType) -> u8 {
        match typ {
            ValueType::I32 => 0x7f,
            ValueType::I64 => 0x7e,
            ValueType::F32 => 0x7d,
            ValueType::F64 => 0x7c,
        }
    }
}
