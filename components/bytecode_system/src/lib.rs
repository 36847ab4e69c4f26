//! Bytecode system for the Wick VM.
//!
//! This crate defines the instruction set, the executable chunk shape the
//! interpreter consumes, and small host-side tooling around both.
//!
//! # Features
//!
//! - Byte-oriented instruction set with inline operand bytes
//! - Chunk container: top-level function, constant pool, global slot count
//! - Binary serialization of chunks for hosts that load from disk
//! - Code builder and disassembler for assembling and inspecting programs
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Chunk, CodeBuilder, Opcode};
//! use core_types::{Function, Value};
//!
//! let mut code = CodeBuilder::new();
//! code.emit_with_operand(Opcode::Constant, 0);
//! code.emit(Opcode::Return);
//!
//! let mut chunk = Chunk::new(Function::script(code.finish()));
//! chunk.add_constant(Value::Int(42));
//!
//! // Serialize and restore
//! let bytes = chunk.to_bytes().unwrap();
//! let restored = Chunk::from_bytes(&bytes).unwrap();
//! assert_eq!(restored.constants, chunk.constants);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod chunk;
pub mod opcode;

// Re-export main types at crate root
pub use builder::CodeBuilder;
pub use chunk::Chunk;
pub use opcode::Opcode;
