//! The interpreter: a fetch/dispatch loop over raw code bytes.
//!
//! Execution starts in a synthesized driver buffer (`call start; call entry;
//! end`) running under an outermost activation with no return continuation.
//! When that activation returns the loop halts and the values left on the
//! stack are the results.

use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use super::cache::{BlockTargets, ContinuationCache, ImmediateCache};
use super::control;
use super::instance::{FuncDescriptor, Runtime};
use super::ops::{memory::MemArg, HANDLERS};
use super::stack::{ActivationFrame, CodeRef, Continuation, Stack};
use super::{RuntimeError, Value};
use crate::config::Config;
use crate::parser::module::{BlockType, FunctionType};
use crate::parser::opcode;
use crate::parser::reader::{decode_vs32, decode_vs64, decode_vu32, emit_vu32, VarintError};

pub struct Executor {
    pub(crate) runtime: Runtime,
    pub(crate) config: Config,
    driver: Vec<u8>,
    /// Offset of the next byte to decode.
    pub(crate) pc: Continuation,
    /// Offset of the opcode being executed.
    pub(crate) op_offset: usize,
    pub(crate) halted: bool,
    immediates: ImmediateCache,
    continuations: ContinuationCache,
    steps: u64,
    started: bool,
}

fn code_of<'a>(driver: &'a [u8], functions: &'a [FuncDescriptor], code: CodeRef) -> &'a [u8] {
    match code {
        CodeRef::Driver => driver,
        CodeRef::Function(index) => functions
            .get(index as usize)
            .map_or(&[], |function| function.code.as_slice()),
    }
}

impl Executor {
    pub fn new(runtime: Runtime, config: &Config) -> Executor {
        Executor {
            runtime,
            config: config.clone(),
            driver: vec![],
            pc: Continuation {
                code: CodeRef::Driver,
                offset: 0,
            },
            op_offset: 0,
            halted: true,
            immediates: ImmediateCache::default(),
            continuations: ContinuationCache::default(),
            steps: 0,
            started: false,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn into_runtime(self) -> Runtime {
        self.runtime
    }

    /// Instructions dispatched so far, across all invocations.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn immediate_cache(&self) -> &ImmediateCache {
        &self.immediates
    }

    pub fn continuation_cache(&self) -> &ContinuationCache {
        &self.continuations
    }

    /// Runs the start function, if any, then function `entry`, or the entry
    /// export resolved at instantiation when `entry` is `None`. The function
    /// must take no parameters; use [`Executor::invoke`] to pass arguments.
    pub fn execute(&mut self, entry: Option<u32>) -> Result<Vec<Value>, RuntimeError> {
        let entry = match entry.or(self.runtime.entry) {
            Some(index) => index,
            None => return Err(RuntimeError::EntryNotFound(self.config.entry.clone())),
        };
        self.invoke(entry, &[])
    }

    /// Calls function `index` with `args` and returns its results. The start
    /// function runs first on the first invocation.
    pub fn invoke(&mut self, index: u32, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let signature = self.runtime.signature(index)?;
        let arg_types: Vec<_> = args.iter().map(Value::typ).collect();
        if arg_types != signature.parameters {
            return Err(RuntimeError::MissingFunctionParams {
                expected: signature.to_string(),
                actual: format!(
                    "({})",
                    arg_types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                ),
            });
        }

        let mut driver = vec![];
        if !self.started {
            if let Some(start) = self.runtime.start {
                driver.push(opcode::CALL);
                driver.extend(emit_vu32(start));
            }
            self.started = true;
        }
        driver.push(opcode::CALL);
        driver.extend(emit_vu32(index));
        driver.push(opcode::END);
        self.immediates.invalidate(CodeRef::Driver);
        self.continuations.invalidate(CodeRef::Driver);
        self.driver = driver;
        debug!("invoking func[{}] {} with {} args", index, signature, args.len());

        let stack = &mut self.runtime.stack;
        *stack = Stack::new();
        stack.push_activation(ActivationFrame {
            function: None,
            locals: vec![],
            return_to: None,
            signature: Rc::new(FunctionType {
                parameters: vec![],
                return_types: signature.return_types.clone(),
            }),
        });
        for arg in args {
            stack.push_value(*arg);
        }

        self.pc = Continuation {
            code: CodeRef::Driver,
            offset: 0,
        };
        self.halted = false;
        let result = self.run();
        let values = self.runtime.stack.values();
        self.runtime.stack = Stack::new();
        result?;
        debug!("func[{}] returned after {} steps", index, self.steps);
        Ok(values)
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.halted {
            let Continuation { code, offset } = self.pc;
            let Some(&op) = code_of(&self.driver, &self.runtime.functions, code).get(offset) else {
                return Err(RuntimeError::IllFormedStructure(offset).at(self.position(code, offset)));
            };

            self.steps += 1;
            if let Some(limit) = self.config.max_steps {
                if self.steps > limit {
                    return Err(RuntimeError::StepLimitExceeded(limit).at(self.position(code, offset)));
                }
            }
            trace!(
                "{:?}+{:#06x} {:<20} frames={}",
                code,
                offset,
                opcode::name(op),
                self.runtime.stack.len()
            );

            self.op_offset = offset;
            self.pc.offset = offset + 1;
            let result = match HANDLERS[op as usize] {
                Some(handler) => handler(self),
                None => Err(RuntimeError::InvalidOpcode(op)),
            };
            if let Err(err) = result {
                return Err(err.at(self.position(code, offset)));
            }
        }
        Ok(())
    }

    /// Byte offset in the module binary of `offset` within `code`. Driver
    /// offsets are reported as-is.
    fn position(&self, code: CodeRef, offset: usize) -> usize {
        match code {
            CodeRef::Driver => offset,
            CodeRef::Function(index) => self
                .runtime
                .functions
                .get(index as usize)
                .map_or(offset, |function| function.position + offset),
        }
    }

    // Immediates ----------------------------------------------------------------

    fn read_cached<F>(&mut self, decode: F) -> Result<i64, RuntimeError>
    where
        F: Fn(&[u8], usize) -> Result<(i64, usize), VarintError>,
    {
        let Continuation { code, offset } = self.pc;
        let (value, next) = match self.immediates.get(code, offset) {
            Some(entry) => entry,
            None => {
                let bytes = code_of(&self.driver, &self.runtime.functions, code);
                let (value, next) = decode(bytes, offset)?;
                self.immediates.insert(code, offset, value, next);
                (value, next)
            }
        };
        self.pc.offset = next;
        Ok(value)
    }

    pub(crate) fn read_vu32(&mut self) -> Result<u32, RuntimeError> {
        self.read_cached(|bytes, pos| decode_vu32(bytes, pos).map(|(v, next)| (v as i64, next)))
            .map(|v| v as u32)
    }

    pub(crate) fn read_vs32(&mut self) -> Result<i32, RuntimeError> {
        self.read_cached(|bytes, pos| decode_vs32(bytes, pos).map(|(v, next)| (v as i64, next)))
            .map(|v| v as i32)
    }

    pub(crate) fn read_vs64(&mut self) -> Result<i64, RuntimeError> {
        self.read_cached(decode_vs64)
    }

    fn read_fixed(&mut self, width: usize) -> Result<&[u8], RuntimeError> {
        let Continuation { code, offset } = self.pc;
        let bytes = code_of(&self.driver, &self.runtime.functions, code)
            .get(offset..offset + width)
            .ok_or(RuntimeError::MalformedImmediate(VarintError::UnexpectedEof))?;
        self.pc.offset = offset + width;
        Ok(bytes)
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, RuntimeError> {
        self.read_fixed(4).map(LittleEndian::read_f32)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, RuntimeError> {
        self.read_fixed(8).map(LittleEndian::read_f64)
    }

    pub(crate) fn read_block_type(&mut self) -> Result<BlockType, RuntimeError> {
        let byte = self.read_fixed(1)?[0];
        BlockType::decode(byte).map_err(|_| RuntimeError::IllFormedStructure(self.op_offset))
    }

    pub(crate) fn read_memarg(&mut self) -> Result<MemArg, RuntimeError> {
        let align = self.read_vu32()?;
        let offset = self.read_vu32()?;
        Ok(MemArg { align, offset })
    }

    /// Delimiters of the block whose opcode is executing; its body starts at
    /// the current pc. Resolved once per block and memoized.
    pub(crate) fn block_targets(&mut self) -> Result<BlockTargets, RuntimeError> {
        let code = self.pc.code;
        if let Some(targets) = self.continuations.get(code, self.op_offset) {
            return Ok(targets);
        }
        let bytes = code_of(&self.driver, &self.runtime.functions, code);
        let targets = control::resolve(bytes, self.pc.offset)?;
        self.continuations.insert(code, self.op_offset, targets);
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::module::ValueType;
    use crate::parser::opcode::*;
    use crate::runtime::test_utils::test::ExecutorTest;

    #[test]
    fn test_empty_function() {
        ExecutorTest::new().expect_stack(vec![]);
    }

    #[test]
    fn test_results_must_match_signature() {
        ExecutorTest::new()
            .i64_const(1)
            .returns(vec![ValueType::I32])
            .expect_code("ARITY_TYPE_MISMATCH");

        ExecutorTest::new()
            .returns(vec![ValueType::I32])
            .expect_code("ARITY_TYPE_MISMATCH");
    }

    #[test]
    fn test_extra_values_are_discarded_on_return() {
        ExecutorTest::new()
            .i32_const(1)
            .i32_const(2)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(2)]);
    }

    #[test]
    fn test_invalid_opcode() {
        let err = ExecutorTest::new().inst(0x06).run().unwrap_err();
        assert_eq!(err.code(), "INVALID_OPCODE");
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn test_trap_offset_is_module_position() {
        let err = ExecutorTest::new()
            .position(100)
            .i32_const(1)
            .i32_const(0)
            .inst(I32_DIV_U)
            .returns(vec![ValueType::I32])
            .run()
            .unwrap_err();
        assert_eq!(err.root(), &RuntimeError::DivisionByZero);
        assert_eq!(err.offset(), Some(104));
    }

    #[test]
    fn test_invoke_checks_arguments() {
        let err = ExecutorTest::new()
            .args(vec![Value::I32(1)])
            .run_with_args(vec![Value::I64(1)])
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_FUNC_PARAMS");
    }

    #[test]
    fn test_step_limit() {
        // loop br 0 end
        let config = Config {
            max_steps: Some(1000),
            ..Config::default()
        };
        let err = ExecutorTest::new()
            .inst(LOOP)
            .block_type(None)
            .inst(BR)
            .imm_u32(0)
            .inst(END)
            .run_with_config(&config)
            .unwrap_err();
        assert_eq!(err.root(), &RuntimeError::StepLimitExceeded(1000));
    }

    #[test]
    fn test_immediates_are_cached() {
        let module = ExecutorTest::new()
            .local(ValueType::I32)
            .inst(LOOP)
            .block_type(None)
            .inst(LOCAL_GET)
            .imm_u32(0)
            .i32_const(1)
            .inst(I32_ADD)
            .inst(LOCAL_TEE)
            .imm_u32(0)
            .i32_const(10)
            .inst(I32_LT_S)
            .inst(BR_IF)
            .imm_u32(0)
            .inst(END)
            .inst(LOCAL_GET)
            .imm_u32(0)
            .returns(vec![ValueType::I32])
            .build();
        let runtime = crate::runtime::Instantiator::instantiate(&module, &Config::default()).unwrap();
        let mut executor = Executor::new(runtime, &Config::default());
        assert_eq!(executor.invoke(0, &[]).unwrap(), vec![Value::I32(10)]);
        // 6 distinct immediates in the body, 1 in the driver
        assert_eq!(executor.immediate_cache().len(), 7);
        assert!(executor.immediate_cache().hits() > 0);
        assert_eq!(executor.runtime().functions[0].execution_count, 1);

        assert_eq!(executor.invoke(0, &[]).unwrap(), vec![Value::I32(10)]);
        assert_eq!(executor.runtime().functions[0].execution_count, 2);
        assert!(executor.runtime().stack.is_empty());
    }

    #[test]
    fn test_execute_requires_entry() {
        let module = ExecutorTest::new().build();
        let config = Config {
            entry: "missing".to_string(),
            ..Config::default()
        };
        let runtime = crate::runtime::Instantiator::instantiate(&module, &config).unwrap();
        let err = Executor::new(runtime, &config).execute(None).unwrap_err();
        assert_eq!(err, RuntimeError::EntryNotFound("missing".to_string()));
    }

    #[test]
    fn test_execute_explicit_index() {
        let module = ExecutorTest::new()
            .i32_const(1)
            .returns(vec![ValueType::I32])
            .function(vec![], vec![ValueType::I32], vec![], vec![I32_CONST, 2])
            .function(vec![ValueType::I32], vec![], vec![], vec![])
            .build();
        let config = Config {
            entry: "missing".to_string(),
            ..Config::default()
        };
        let runtime = crate::runtime::Instantiator::instantiate(&module, &config).unwrap();
        let mut executor = Executor::new(runtime, &config);
        assert_eq!(executor.execute(Some(1)).unwrap(), vec![Value::I32(2)]);
        assert_eq!(executor.execute(Some(0)).unwrap(), vec![Value::I32(1)]);
        assert_eq!(executor.execute(Some(2)).unwrap_err().code(), "MISSING_FUNC_PARAMS");
        assert_eq!(executor.execute(Some(9)).unwrap_err().code(), "FUNC_TYPE_ACCESS_OOB");
    }
}
