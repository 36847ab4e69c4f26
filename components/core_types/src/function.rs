//! Function and closure descriptors.
//!
//! A [`Function`] is the compiled shape of a callable: raw code bytes plus
//! parameter and upvalue counts. A [`Closure`] pairs a function with the
//! values it captured when the CLOSURE opcode ran; only closures are
//! callable.

use std::cell::RefCell;

use crate::gc::Gc;
use crate::value::Value;

/// Executable function descriptor.
///
/// Functions arrive through a chunk's constant pool. The engine never calls
/// a bare function: CALL requires it to be wrapped in a [`Closure`] first.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Raw code bytes: one opcode byte followed by its operand bytes.
    pub code: Vec<u8>,
    /// Number of declared parameters.
    pub num_params: u32,
    /// Number of upvalue descriptors the CLOSURE opcode reads when wrapping
    /// this function.
    pub num_upvalues: u32,
}

impl Function {
    /// Create a function descriptor.
    pub fn new(code: Vec<u8>, num_params: u32, num_upvalues: u32) -> Self {
        Self {
            code,
            num_params,
            num_upvalues,
        }
    }

    /// Function with no parameters and no captures, e.g. a script body.
    pub fn script(code: Vec<u8>) -> Self {
        Self::new(code, 0, 0)
    }
}

/// A function plus the values it captured at creation time.
///
/// Upvalue slots are by-value copies made when CLOSURE executes. A slot can
/// be rewritten through SET_UPVALUE, and every handle to the closure
/// observes the write; the enclosing scope's local never does.
#[derive(Debug)]
pub struct Closure {
    /// The wrapped function.
    pub function: Gc<Function>,
    upvalues: RefCell<Vec<Value>>,
}

impl Closure {
    /// Create a closure over `function` with the given captured values.
    pub fn new(function: Gc<Function>, upvalues: Vec<Value>) -> Self {
        Self {
            function,
            upvalues: RefCell::new(upvalues),
        }
    }

    /// Create a closure with no captured values.
    pub fn without_upvalues(function: Gc<Function>) -> Self {
        Self::new(function, Vec::new())
    }

    /// Number of captured values.
    pub fn upvalue_count(&self) -> usize {
        self.upvalues.borrow().len()
    }

    /// Copy of the captured value at `index`, or `None` if out of range.
    pub fn upvalue(&self, index: usize) -> Option<Value> {
        self.upvalues.borrow().get(index).cloned()
    }

    /// Overwrite the captured value at `index`.
    ///
    /// Returns `false` if the index is out of range.
    pub fn set_upvalue(&self, index: usize, value: Value) -> bool {
        let mut upvalues = self.upvalues.borrow_mut();
        match upvalues.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
