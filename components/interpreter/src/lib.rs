//! Bytecode interpreter for the Wick language.
//!
//! This crate provides a stack-based virtual machine:
//! - A single operand stack shared by all call frames
//! - Base-pointer addressed locals, indexed global slots
//! - Closures with by-value upvalue capture
//! - Reference-counted value lifetimes, released on pop and frame unwind
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Chunk, CodeBuilder, Opcode};
//! use core_types::{Function, Value};
//! use interpreter::VM;
//!
//! let mut code = CodeBuilder::new();
//! code.emit_with_operand(Opcode::Constant, 0);
//! code.emit_with_operand(Opcode::Constant, 1);
//! code.emit(Opcode::Add);
//! code.emit(Opcode::Return);
//!
//! let mut chunk = Chunk::new(Function::script(code.finish()));
//! chunk.add_constant(Value::Int(40));
//! chunk.add_constant(Value::Int(2));
//!
//! let mut vm = VM::new(&chunk);
//! vm.interpret().unwrap();
//! assert_eq!(vm.stack_top(), Some(&Value::Int(42)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod dispatch;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::CallFrame;
pub use vm::VM;
