//! The evaluation stack: value, label and activation frames in one sequence,
//! plus an index of frame positions per kind.

use std::rc::Rc;

use super::{RuntimeError, Value};
use crate::parser::module::{BlockType, FunctionType, ValueType};

/// Which code buffer a program counter points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRef {
    /// The synthesized `call ...; end` sequence that starts execution.
    Driver,
    /// Body of a defined function, by position among defined functions.
    Function(u32),
}

/// A resumable program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Continuation {
    pub code: CodeRef,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Block,
    Loop,
    If,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelFrame {
    pub kind: LabelKind,
    pub block_type: BlockType,
    /// Offset in the current code buffer where execution resumes on a branch.
    pub continuation: usize,
}

impl LabelFrame {
    /// Values carried by a branch to this label. A loop label is re-entered
    /// at its start, so branches to it carry nothing in the MVP.
    pub fn branch_arity(&self) -> &[ValueType] {
        match self.kind {
            LabelKind::Loop => &[],
            _ => self.block_type.results(),
        }
    }

    /// Values left when control falls through the label's `end`.
    pub fn result_arity(&self) -> &[ValueType] {
        self.block_type.results()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivationFrame {
    /// Function index, `None` for the driver.
    pub function: Option<u32>,
    pub locals: Vec<Value>,
    /// Where the caller resumes; `None` marks the outermost activation.
    pub return_to: Option<Continuation>,
    pub signature: Rc<FunctionType>,
}

impl ActivationFrame {
    pub fn result_arity(&self) -> &[ValueType] {
        &self.signature.return_types
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Value(Value),
    Label(LabelFrame),
    Activation(ActivationFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Value(_) => FrameKind::Value,
            Frame::Label(_) => FrameKind::Label,
            Frame::Activation(_) => FrameKind::Activation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Value,
    Label,
    Activation,
}

/// Stack positions of each frame kind, in push order.
#[derive(Debug, Default)]
struct FrameIndex {
    values: Vec<usize>,
    labels: Vec<usize>,
    activations: Vec<usize>,
    /// Label count above the current activation, and the saved counts of callers.
    labels_above_activation: usize,
    saved_label_counts: Vec<usize>,
}

impl FrameIndex {
    fn positions(&mut self, kind: FrameKind) -> &mut Vec<usize> {
        match kind {
            FrameKind::Value => &mut self.values,
            FrameKind::Label => &mut self.labels,
            FrameKind::Activation => &mut self.activations,
        }
    }
}

#[derive(Debug, Default)]
pub struct Stack {
    frames: Vec<Frame>,
    index: FrameIndex,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    // The only two places frames enter or leave the stack.

    pub fn push(&mut self, frame: Frame) {
        let kind = frame.kind();
        let position = self.frames.len();
        self.index.positions(kind).push(position);
        match kind {
            FrameKind::Label => self.index.labels_above_activation += 1,
            FrameKind::Activation => {
                let count = std::mem::take(&mut self.index.labels_above_activation);
                self.index.saved_label_counts.push(count);
            }
            FrameKind::Value => {}
        }
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        let kind = frame.kind();
        self.index.positions(kind).pop();
        match kind {
            FrameKind::Label => self.index.labels_above_activation -= 1,
            FrameKind::Activation => {
                self.index.labels_above_activation =
                    self.index.saved_label_counts.pop().unwrap_or_default();
            }
            FrameKind::Value => {}
        }
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn count(&self, kind: FrameKind) -> usize {
        match kind {
            FrameKind::Value => self.index.values.len(),
            FrameKind::Label => self.index.labels.len(),
            FrameKind::Activation => self.index.activations.len(),
        }
    }

    pub fn labels_above_activation(&self) -> usize {
        self.index.labels_above_activation
    }

    // Values -------------------------------------------------------------------

    pub fn push_value(&mut self, value: Value) {
        self.push(Frame::Value(value));
    }

    /// Pops the top frame, which must be a value. Reaching a label or
    /// activation frame means the operands of the current region are exhausted.
    pub fn pop_value(&mut self) -> Result<Value, RuntimeError> {
        match self.frames.last() {
            Some(Frame::Value(_)) => match self.pop() {
                Some(Frame::Value(value)) => Ok(value),
                _ => Err(RuntimeError::StackExhausted),
            },
            _ => Err(RuntimeError::StackExhausted),
        }
    }

    pub fn peek_value(&self) -> Option<&Value> {
        match self.frames.last() {
            Some(Frame::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop_value()?;
        if value.typ() != expected {
            return Err(RuntimeError::TypeMismatch {
                expected: expected.to_string(),
                actual: value.typ().to_string(),
            });
        }
        Ok(value)
    }

    pub fn pop_i32(&mut self) -> Result<i32, RuntimeError> {
        match self.pop_typed(ValueType::I32)? {
            Value::I32(v) => Ok(v),
            _ => Err(RuntimeError::StackExhausted),
        }
    }

    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        match self.pop_typed(ValueType::I64)? {
            Value::I64(v) => Ok(v),
            _ => Err(RuntimeError::StackExhausted),
        }
    }

    pub fn pop_f32(&mut self) -> Result<f32, RuntimeError> {
        match self.pop_typed(ValueType::F32)? {
            Value::F32(v) => Ok(v),
            _ => Err(RuntimeError::StackExhausted),
        }
    }

    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        match self.pop_typed(ValueType::F64)? {
            Value::F64(v) => Ok(v),
            _ => Err(RuntimeError::StackExhausted),
        }
    }

    /// All value frames, bottom to top.
    pub fn values(&self) -> Vec<Value> {
        self.index
            .values
            .iter()
            .filter_map(|&position| match &self.frames[position] {
                Frame::Value(value) => Some(*value),
                _ => None,
            })
            .collect()
    }

    // Labels and activations -----------------------------------------------------

    pub fn push_label(&mut self, label: LabelFrame) {
        self.push(Frame::Label(label));
    }

    pub fn push_activation(&mut self, activation: ActivationFrame) {
        self.push(Frame::Activation(activation));
    }

    /// Position of the `depth`-th label from the top, counting from zero.
    pub fn label_position(&self, depth: usize) -> Option<usize> {
        let labels = &self.index.labels;
        labels.len().checked_sub(depth + 1).map(|i| labels[i])
    }

    pub fn label(&self, depth: usize) -> Option<&LabelFrame> {
        match &self.frames[self.label_position(depth)?] {
            Frame::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn activation_position(&self) -> Option<usize> {
        self.index.activations.last().copied()
    }

    pub fn activation(&self) -> Option<&ActivationFrame> {
        match &self.frames[self.activation_position()?] {
            Frame::Activation(activation) => Some(activation),
            _ => None,
        }
    }

    pub fn activation_mut(&mut self) -> Option<&mut ActivationFrame> {
        let position = self.activation_position()?;
        match &mut self.frames[position] {
            Frame::Activation(activation) => Some(activation),
            _ => None,
        }
    }

    /// Removes the frame at `position` and everything above it, keeping the
    /// top `arity.len()` values, which must match `arity`, and pushing them
    /// back in order. Returns the removed frame.
    pub fn unwind_to(&mut self, position: usize, arity: &[ValueType]) -> Result<Frame, RuntimeError> {
        let mut kept = Vec::with_capacity(arity.len());
        for expected in arity.iter().rev() {
            let in_region = self.frames.len() > position + 1;
            match self.frames.last() {
                Some(Frame::Value(value)) if in_region && value.typ() == *expected => {
                    kept.push(self.pop_value()?);
                }
                _ => {
                    for value in kept.into_iter().rev() {
                        self.push_value(value);
                    }
                    return Err(self.arity_mismatch(position, arity));
                }
            }
        }

        while self.frames.len() > position + 1 {
            self.pop();
        }
        let frame = self.pop().ok_or(RuntimeError::StackExhausted)?;
        for value in kept.into_iter().rev() {
            self.push_value(value);
        }
        Ok(frame)
    }

    fn arity_mismatch(&self, position: usize, arity: &[ValueType]) -> RuntimeError {
        let found: Vec<String> = self.frames[position + 1..]
            .iter()
            .rev()
            .take_while(|frame| matches!(frame, Frame::Value(_)))
            .take(arity.len().max(1))
            .filter_map(|frame| match frame {
                Frame::Value(value) => Some(value.typ().to_string()),
                _ => None,
            })
            .collect();
        RuntimeError::ArityMismatch {
            expected: format!("[{}]", join(arity)),
            actual: format!("[{}]", found.into_iter().rev().collect::<Vec<_>>().join(", ")),
        }
    }
}

fn join(types: &[ValueType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(kind: LabelKind, block_type: BlockType) -> LabelFrame {
        LabelFrame {
            kind,
            block_type,
            continuation: 0,
        }
    }

    fn activation(results: Vec<ValueType>) -> ActivationFrame {
        ActivationFrame {
            function: Some(0),
            locals: vec![],
            return_to: None,
            signature: Rc::new(FunctionType {
                parameters: vec![],
                return_types: results,
            }),
        }
    }

    #[test]
    fn test_stack_operations() {
        let mut stack = Stack::new();
        assert!(stack.is_empty());

        stack.push_value(Value::I32(42));
        stack.push_value(Value::I64(100));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek_value(), Some(&Value::I64(100)));

        assert_eq!(stack.pop_i64().unwrap(), 100);
        assert_eq!(stack.pop_i32().unwrap(), 42);
        assert!(matches!(stack.pop_value(), Err(RuntimeError::StackExhausted)));
    }

    #[test]
    fn test_type_mismatch() {
        let mut stack = Stack::new();
        stack.push_value(Value::I32(42));
        let err = stack.pop_f32().unwrap_err();
        assert_eq!(err.code(), "STACK_VAL_TYPE_MISMATCH");
    }

    #[test]
    fn test_values_do_not_cross_frames() {
        let mut stack = Stack::new();
        stack.push_value(Value::I32(1));
        stack.push_label(label(LabelKind::Block, BlockType::Empty));
        assert!(matches!(stack.pop_value(), Err(RuntimeError::StackExhausted)));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_frame_index_tracks_push_and_pop() {
        let mut stack = Stack::new();
        stack.push_activation(activation(vec![]));
        stack.push_value(Value::I32(1));
        stack.push_label(label(LabelKind::Block, BlockType::Empty));
        stack.push_value(Value::I32(2));
        stack.push_label(label(LabelKind::Loop, BlockType::Empty));

        assert_eq!(stack.count(FrameKind::Value), 2);
        assert_eq!(stack.count(FrameKind::Label), 2);
        assert_eq!(stack.count(FrameKind::Activation), 1);
        assert_eq!(stack.labels_above_activation(), 2);
        assert_eq!(stack.label_position(0), Some(4));
        assert_eq!(stack.label_position(1), Some(2));
        assert_eq!(stack.label_position(2), None);
        assert_eq!(stack.label(0).unwrap().kind, LabelKind::Loop);
        assert_eq!(stack.activation_position(), Some(0));

        stack.pop();
        assert_eq!(stack.labels_above_activation(), 1);
        assert_eq!(stack.values(), vec![Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn test_label_count_restored_after_call() {
        let mut stack = Stack::new();
        stack.push_activation(activation(vec![]));
        stack.push_label(label(LabelKind::Block, BlockType::Empty));
        stack.push_label(label(LabelKind::Block, BlockType::Empty));
        stack.push_activation(activation(vec![]));
        assert_eq!(stack.labels_above_activation(), 0);
        stack.push_label(label(LabelKind::If, BlockType::Empty));
        assert_eq!(stack.labels_above_activation(), 1);

        let position = stack.activation_position().unwrap();
        stack.unwind_to(position, &[]).unwrap();
        assert_eq!(stack.labels_above_activation(), 2);
        assert_eq!(stack.activation_position(), Some(0));
    }

    #[test]
    fn test_unwind_keeps_arity_values() {
        let mut stack = Stack::new();
        stack.push_activation(activation(vec![]));
        stack.push_label(label(LabelKind::Block, BlockType::Value(ValueType::I32)));
        stack.push_value(Value::I32(7));
        stack.push_label(label(LabelKind::Block, BlockType::Empty));
        stack.push_value(Value::I64(8));
        stack.push_value(Value::I32(9));

        let position = stack.label_position(1).unwrap();
        let frame = stack.unwind_to(position, &[ValueType::I32]).unwrap();
        assert!(matches!(frame, Frame::Label(LabelFrame { kind: LabelKind::Block, .. })));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.values(), vec![Value::I32(9)]);
        assert_eq!(stack.labels_above_activation(), 0);
    }

    #[test]
    fn test_unwind_arity_mismatch() {
        let mut stack = Stack::new();
        stack.push_label(label(LabelKind::Block, BlockType::Value(ValueType::I32)));
        stack.push_value(Value::F32(1.0));

        let err = stack.unwind_to(0, &[ValueType::I32]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ArityMismatch {
                expected: "[i32]".to_string(),
                actual: "[f32]".to_string()
            }
        );
        // nothing was removed
        assert_eq!(stack.len(), 2);

        let mut stack = Stack::new();
        stack.push_label(label(LabelKind::Block, BlockType::Value(ValueType::I32)));
        let err = stack.unwind_to(0, &[ValueType::I32]).unwrap_err();
        assert_eq!(err.code(), "ARITY_TYPE_MISMATCH");
    }

    #[test]
    fn test_loop_branch_arity() {
        let l = label(LabelKind::Loop, BlockType::Value(ValueType::I64));
        assert!(l.branch_arity().is_empty());
        assert_eq!(l.result_arity(), &[ValueType::I64]);
    }
}
