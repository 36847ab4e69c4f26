//! Virtual machine state for bytecode execution.
//!
//! Owns the call frames, the operand stack, the globals array, and the
//! constants copied from the chunk. The dispatch loop itself lives in
//! `dispatch`.

use bytecode_system::Chunk;
use core_types::{Closure, ErrorKind, Gc, Value, VmError};

use crate::call_frame::CallFrame;

/// Stack-based virtual machine executing one chunk to completion.
///
/// The VM manages the execution state:
/// - Call frames, one per live function invocation
/// - The operand stack shared by all frames
/// - Indexed global slots, preallocated from the chunk's `globals_count`
/// - The constant pool, retained for the VM's lifetime
///
/// Execution is strictly single-threaded and synchronous: `interpret` runs
/// to clean termination or to the first fault. Dropping the VM releases
/// every value it still retains.
///
/// # Example
///
/// ```
/// use bytecode_system::{Chunk, CodeBuilder, Opcode};
/// use core_types::{Function, Value};
/// use interpreter::VM;
///
/// let mut code = CodeBuilder::new();
/// code.emit_with_operand(Opcode::Constant, 0);
/// code.emit(Opcode::Return);
///
/// let mut chunk = Chunk::new(Function::script(code.finish()));
/// chunk.add_constant(Value::Int(42));
///
/// let mut vm = VM::new(&chunk);
/// vm.interpret().unwrap();
/// assert_eq!(vm.stack_top(), Some(&Value::Int(42)));
/// ```
#[derive(Debug)]
pub struct VM {
    /// Call stack, innermost invocation last.
    pub(crate) frames: Vec<CallFrame>,
    /// Operand stack shared across frames.
    pub(crate) stack: Vec<Value>,
    /// Global slots, indexed by operand bytes.
    pub(crate) globals: Vec<Value>,
    /// Constants copied out of the chunk at construction.
    pub(crate) constants: Vec<Value>,
}

impl VM {
    /// Create a VM primed to run the chunk's top-level function.
    ///
    /// The top-level function is wrapped in a synthetic closure with no
    /// upvalues; global slots start out as nil.
    pub fn new(chunk: &Chunk) -> Self {
        let function = Gc::new(chunk.function.clone());
        let script = Gc::new(Closure::without_upvalues(function));
        Self {
            frames: vec![CallFrame::new(script, 0)],
            stack: Vec::with_capacity(256),
            globals: vec![Value::Nil; chunk.globals_count as usize],
            constants: chunk.constants.clone(),
        }
    }

    /// Number of values on the operand stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// The value on top of the operand stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        self.stack.last()
    }

    /// Number of live call frames.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// The global slot at `index`, if the chunk declared that many slots.
    pub fn global(&self, index: usize) -> Option<&Value> {
        self.globals.get(index)
    }

    /// Pop the top of the operand stack.
    pub(crate) fn stack_pop(&mut self) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::new(ErrorKind::MalformedChunk, "Stack underflow"))
    }

    /// Look at the value `depth` slots below the top without popping.
    pub(crate) fn stack_peek(&self, depth: usize) -> Result<&Value, VmError> {
        let len = self.stack.len();
        if depth < len {
            Ok(&self.stack[len - 1 - depth])
        } else {
            Err(VmError::new(ErrorKind::MalformedChunk, "Stack underflow"))
        }
    }

    /// Copy of the constant at `index`, or `None` if the pool is smaller.
    pub(crate) fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(index as usize).cloned()
    }

    /// The innermost call frame.
    pub(crate) fn current_frame(&self) -> Result<&CallFrame, VmError> {
        self.frames
            .last()
            .ok_or_else(|| VmError::new(ErrorKind::MalformedChunk, "No active frame"))
    }

    /// The innermost call frame, mutably.
    pub(crate) fn current_frame_mut(&mut self) -> Result<&mut CallFrame, VmError> {
        self.frames
            .last_mut()
            .ok_or_else(|| VmError::new(ErrorKind::MalformedChunk, "No active frame"))
    }

    /// Dump the operand stack to stdout, bottom first.
    pub fn stack_show(&self) {
        println!("== Stack Debug Info ==");
        for (i, value) in self.stack.iter().enumerate() {
            match value {
                Value::Nil => println!("[{}] nil", i),
                other => println!("[{}] {}: {}", i, other.type_name(), other),
            }
        }
        println!("======================");
    }

    /// Dump the call frames to stdout, outermost first.
    pub fn frame_show(&self) {
        println!("== Frames Debug Info ==");
        for (i, frame) in self.frames.iter().enumerate() {
            println!(
                "[Frame {}] ip: {}, base pointer: {}, code bytes: {:?}",
                i, frame.ip, frame.base_pointer, frame.closure.function.code
            );
        }
        println!("======================");
    }
}
