//! Call frame for function call stack management.

use core_types::{Closure, Gc};

/// Activation record for one function invocation.
///
/// `base_pointer` anchors the frame's local indexing: local `i` lives at
/// `stack[base_pointer + i]`, and local 0 is the slot the callee value
/// occupied at call time. The frame holds its closure through a retained
/// handle; the closure outlives the frame because the callee value stays on
/// the operand stack for the whole invocation.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The closure being executed.
    pub closure: Gc<Closure>,
    /// Offset of the next byte to read from the closure's code.
    pub ip: usize,
    /// Operand-stack index where this frame's locals start.
    pub base_pointer: usize,
}

impl CallFrame {
    /// Create a frame for `closure` with its locals anchored at
    /// `base_pointer`, ready to execute from the first byte.
    pub fn new(closure: Gc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    /// Length of the code being executed.
    pub fn code_len(&self) -> usize {
        self.closure.function.code.len()
    }

    /// Whether the instruction pointer has reached the end of the code.
    pub fn at_end(&self) -> bool {
        self.ip >= self.code_len()
    }

    /// Read the next code byte and advance, or `None` at end of code.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.closure.function.code.get(self.ip).copied()?;
        self.ip += 1;
        Some(byte)
    }
}
