//! Incremental writer for raw code bytes.

use crate::opcode::Opcode;

/// Emits opcode and operand bytes into a code vector.
///
/// The external compiler produces code bytes however it likes; this builder
/// exists so hosts and tests can assemble small programs without tracking
/// byte offsets by hand.
///
/// # Examples
///
/// ```
/// use bytecode_system::{CodeBuilder, Opcode};
///
/// let mut code = CodeBuilder::new();
/// code.emit_with_operand(Opcode::Constant, 0);
/// code.emit(Opcode::Negate);
/// code.emit(Opcode::Return);
/// assert_eq!(code.finish(), vec![0, 0, 1, 26]);
/// ```
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<u8>,
}

impl CodeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an opcode with no operands.
    pub fn emit(&mut self, op: Opcode) {
        self.code.push(op.into());
    }

    /// Emit an opcode followed by a single operand byte.
    pub fn emit_with_operand(&mut self, op: Opcode, operand: u8) {
        self.code.push(op.into());
        self.code.push(operand);
    }

    /// Emit a raw byte, e.g. an upvalue descriptor after a Closure opcode.
    pub fn emit_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Offset of the next byte to be emitted; usable as a jump target.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Consume the builder and return the code bytes.
    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}
