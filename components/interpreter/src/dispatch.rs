//! Dispatch loop for bytecode execution.
//!
//! A single fetch/decode/execute loop drives the whole program: read one
//! byte from the current frame, decode it, run the opcode against the
//! operand stack, repeat until the code runs out or a fault is raised.

use bytecode_system::Opcode;
use core_types::{Closure, ErrorKind, Gc, Value, VmError};

use crate::call_frame::CallFrame;
use crate::vm::VM;

impl VM {
    /// Execute until clean termination or the first fault.
    ///
    /// Clean termination is either the outermost RETURN or the instruction
    /// pointer running off the end of the current function's code. On a
    /// fault the message is written to standard output and the error is
    /// returned; the VM should not be resumed afterwards.
    pub fn interpret(&mut self) -> Result<(), VmError> {
        match self.run() {
            Ok(()) => Ok(()),
            Err(err) => {
                println!("{}", err);
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<(), VmError> {
        loop {
            let byte = match self.fetch() {
                Some(byte) => byte,
                None => return Ok(()),
            };
            let op = Opcode::try_from(byte).map_err(|_| VmError::unknown_opcode(byte))?;

            match op {
                Opcode::Constant => {
                    let index = self.operand(op)?;
                    let value = self
                        .constant(index)
                        .ok_or_else(|| invalid_index("constant", op))?;
                    self.stack.push(value);
                }
                Opcode::Negate => {
                    let value = self.stack_pop()?;
                    let result = match value {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(n) => Value::Float(-n),
                        _ => return Err(invalid_operand(op)),
                    };
                    self.stack.push(result);
                }
                Opcode::Add
                | Opcode::Subtract
                | Opcode::Multiply
                | Opcode::Divide
                | Opcode::Modulo => {
                    let b = self.stack_pop()?;
                    let a = self.stack_pop()?;
                    let result = arithmetic(op, &a, &b)?;
                    self.stack.push(result);
                }
                Opcode::True => self.stack.push(Value::Bool(true)),
                Opcode::False => self.stack.push(Value::Bool(false)),
                Opcode::Nil => self.stack.push(Value::Nil),
                Opcode::Not => {
                    let value = self.stack_pop()?;
                    match value {
                        Value::Bool(b) => self.stack.push(Value::Bool(!b)),
                        _ => return Err(invalid_operand(op)),
                    }
                }
                Opcode::Eq => {
                    let b = self.stack_pop()?;
                    let a = self.stack_pop()?;
                    let result = equality(&a, &b)?;
                    self.stack.push(result);
                }
                Opcode::Gt | Opcode::Lt | Opcode::Ge | Opcode::Le => {
                    let b = self.stack_pop()?;
                    let a = self.stack_pop()?;
                    let result = comparison(op, &a, &b)?;
                    self.stack.push(result);
                }
                Opcode::Pop => {
                    self.stack_pop()?;
                }
                Opcode::Print => {
                    let value = self.stack_pop()?;
                    println!("{}", value);
                }
                Opcode::SetGlobal => {
                    let index = self.operand(op)? as usize;
                    let value = self.stack_pop()?;
                    let slot = self
                        .globals
                        .get_mut(index)
                        .ok_or_else(|| invalid_index("global", op))?;
                    *slot = value;
                }
                Opcode::GetGlobal => {
                    let index = self.operand(op)? as usize;
                    let value = self
                        .globals
                        .get(index)
                        .cloned()
                        .ok_or_else(|| invalid_index("global", op))?;
                    self.stack.push(value);
                }
                Opcode::SetLocal => {
                    let index = self.operand(op)? as usize;
                    let value = self.stack_pop()?;
                    let slot = self.current_frame()?.base_pointer + index;
                    // A write one past the top materializes the slot: that is
                    // how a compiler binds the value it just pushed to a
                    // fresh local.
                    if slot == self.stack.len() {
                        self.stack.push(value);
                    } else {
                        let cell = self
                            .stack
                            .get_mut(slot)
                            .ok_or_else(|| invalid_index("local", op))?;
                        *cell = value;
                    }
                }
                Opcode::GetLocal => {
                    let index = self.operand(op)? as usize;
                    let slot = self.current_frame()?.base_pointer + index;
                    let value = self
                        .stack
                        .get(slot)
                        .cloned()
                        .ok_or_else(|| invalid_index("local", op))?;
                    self.stack.push(value);
                }
                Opcode::JumpFalse => {
                    let target = self.operand(op)? as usize;
                    let condition = match self.stack_peek(0)? {
                        Value::Bool(b) => *b,
                        _ => return Err(invalid_operands(op)),
                    };
                    if !condition {
                        self.jump(target, op)?;
                    }
                }
                Opcode::Jump | Opcode::Loop => {
                    let target = self.operand(op)? as usize;
                    self.jump(target, op)?;
                }
                Opcode::Call => {
                    let arg_count = self.operand(op)? as usize;
                    let callee = self.stack_peek(arg_count)?.clone();
                    let closure = match callee {
                        Value::Closure(closure) => closure,
                        _ => {
                            return Err(VmError::new(
                                ErrorKind::CallError,
                                format!("Invalid callee for {}", op),
                            ))
                        }
                    };
                    let base_pointer = self.stack.len() - arg_count - 1;
                    self.frames.push(CallFrame::new(closure, base_pointer));
                }
                Opcode::Return => {
                    let result = self.stack_pop()?;
                    let frame = self
                        .frames
                        .pop()
                        .ok_or_else(|| VmError::new(ErrorKind::MalformedChunk, "No active frame"))?;
                    self.stack.truncate(frame.base_pointer);
                    self.stack.push(result);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                }
                Opcode::Closure => {
                    let index = self.operand(op)?;
                    let constant = self
                        .constant(index)
                        .ok_or_else(|| invalid_index("constant", op))?;
                    let function = match constant {
                        Value::Function(function) => function,
                        _ => {
                            return Err(VmError::new(
                                ErrorKind::CallError,
                                format!("Invalid constant for {}", op),
                            ))
                        }
                    };
                    let mut upvalues = Vec::with_capacity(function.num_upvalues as usize);
                    for _ in 0..function.num_upvalues {
                        let is_local = self.operand(op)?;
                        let capture_index = self.operand(op)? as usize;
                        upvalues.push(self.capture_upvalue(is_local == 1, capture_index, op)?);
                    }
                    let closure = Closure::new(function, upvalues);
                    self.stack.push(Value::Closure(Gc::new(closure)));
                }
                Opcode::GetUpvalue => {
                    let index = self.operand(op)? as usize;
                    let closure = self.current_frame()?.closure.clone();
                    let value = closure
                        .upvalue(index)
                        .ok_or_else(|| invalid_index("upvalue", op))?;
                    self.stack.push(value);
                }
                Opcode::SetUpvalue => {
                    let index = self.operand(op)? as usize;
                    let value = self.stack_pop()?;
                    let closure = self.current_frame()?.closure.clone();
                    if !closure.set_upvalue(index, value) {
                        return Err(invalid_index("upvalue", op));
                    }
                }
            }
        }
    }

    /// Read the next code byte of the current frame, or `None` when the
    /// frame has run out of code (clean termination).
    fn fetch(&mut self) -> Option<u8> {
        self.frames.last_mut()?.next_byte()
    }

    /// Read an operand byte; running out of code mid-instruction is a
    /// malformed chunk, not a clean stop.
    fn operand(&mut self, op: Opcode) -> Result<u8, VmError> {
        self.fetch().ok_or_else(|| {
            VmError::new(
                ErrorKind::MalformedChunk,
                format!("Invalid operand byte for {}", op),
            )
        })
    }

    /// Rewrite the current frame's instruction pointer. A target equal to
    /// the code length ends the function like running off the end; anything
    /// beyond faults.
    fn jump(&mut self, target: usize, op: Opcode) -> Result<(), VmError> {
        let frame = self.current_frame_mut()?;
        if target > frame.code_len() {
            return Err(VmError::new(
                ErrorKind::MalformedChunk,
                format!("Invalid jump target for {}", op),
            ));
        }
        frame.ip = target;
        Ok(())
    }

    /// Copy one captured value for a closure under construction: either a
    /// local of the current frame or an upvalue of the current closure.
    fn capture_upvalue(
        &self,
        is_local: bool,
        index: usize,
        op: Opcode,
    ) -> Result<Value, VmError> {
        let frame = self.current_frame()?;
        if is_local {
            let slot = frame.base_pointer + index;
            self.stack
                .get(slot)
                .cloned()
                .ok_or_else(|| invalid_index("local", op))
        } else {
            frame
                .closure
                .upvalue(index)
                .ok_or_else(|| invalid_index("upvalue", op))
        }
    }
}

fn invalid_operand(op: Opcode) -> VmError {
    VmError::new(ErrorKind::TypeError, format!("Invalid operand for {}", op))
}

fn invalid_operands(op: Opcode) -> VmError {
    VmError::new(ErrorKind::TypeError, format!("Invalid operands for {}", op))
}

fn invalid_divisor(op: Opcode) -> VmError {
    VmError::new(ErrorKind::TypeError, format!("Invalid divisor for {}", op))
}

fn invalid_index(what: &str, op: Opcode) -> VmError {
    VmError::new(
        ErrorKind::MalformedChunk,
        format!("Invalid {} index for {}", what, op),
    )
}

/// Arithmetic over a tag pair: Int op Int stays Int, any Float operand
/// widens the other side, Add additionally concatenates strings.
fn arithmetic(op: Opcode, a: &Value, b: &Value) -> Result<Value, VmError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_arithmetic(op, *x, *y),
        (Value::Float(x), Value::Float(y)) => float_arithmetic(op, *x, *y),
        (Value::Int(x), Value::Float(y)) => float_arithmetic(op, *x as f64, *y),
        (Value::Float(x), Value::Int(y)) => float_arithmetic(op, *x, *y as f64),
        (Value::Str(x), Value::Str(y)) if op == Opcode::Add => {
            let mut joined = String::with_capacity(x.len() + y.len());
            joined.push_str(x);
            joined.push_str(y);
            Ok(Value::string(joined))
        }
        _ => Err(invalid_operands(op)),
    }
}

fn int_arithmetic(op: Opcode, x: i64, y: i64) -> Result<Value, VmError> {
    let result = match op {
        Opcode::Add => x.wrapping_add(y),
        Opcode::Subtract => x.wrapping_sub(y),
        Opcode::Multiply => x.wrapping_mul(y),
        Opcode::Divide => {
            if y == 0 {
                return Err(invalid_divisor(op));
            }
            x.wrapping_div(y)
        }
        Opcode::Modulo => {
            if y == 0 {
                return Err(invalid_divisor(op));
            }
            x.wrapping_rem(y)
        }
        _ => return Err(invalid_operands(op)),
    };
    Ok(Value::Int(result))
}

fn float_arithmetic(op: Opcode, x: f64, y: f64) -> Result<Value, VmError> {
    let result = match op {
        Opcode::Add => x + y,
        Opcode::Subtract => x - y,
        Opcode::Multiply => x * y,
        Opcode::Divide => x / y,
        Opcode::Modulo => x % y,
        _ => return Err(invalid_operands(op)),
    };
    Ok(Value::Float(result))
}

/// Ordered comparison over a tag pair; the result is always a Bool, mixed
/// Int/Float paths included.
fn comparison(op: Opcode, a: &Value, b: &Value) -> Result<Value, VmError> {
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_comparison(op, *x, *y)?,
        (Value::Float(x), Value::Float(y)) => float_comparison(op, *x, *y)?,
        (Value::Int(x), Value::Float(y)) => float_comparison(op, *x as f64, *y)?,
        (Value::Float(x), Value::Int(y)) => float_comparison(op, *x, *y as f64)?,
        _ => return Err(invalid_operands(op)),
    };
    Ok(Value::Bool(result))
}

fn int_comparison(op: Opcode, x: i64, y: i64) -> Result<bool, VmError> {
    Ok(match op {
        Opcode::Gt => x > y,
        Opcode::Lt => x < y,
        Opcode::Ge => x >= y,
        Opcode::Le => x <= y,
        _ => return Err(invalid_operands(op)),
    })
}

fn float_comparison(op: Opcode, x: f64, y: f64) -> Result<bool, VmError> {
    Ok(match op {
        Opcode::Gt => x > y,
        Opcode::Lt => x < y,
        Opcode::Ge => x >= y,
        Opcode::Le => x <= y,
        _ => return Err(invalid_operands(op)),
    })
}

/// Equality: same-type compares by value, Int/Float mixes compare
/// numerically, nil equals nil. Functions and closures are not comparable.
fn equality(a: &Value, b: &Value) -> Result<Value, VmError> {
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) => (*x as f64) == *y,
        (Value::Float(x), Value::Int(y)) => *x == (*y as f64),
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Nil, Value::Nil) => true,
        (Value::Str(x), Value::Str(y)) => **x == **y,
        _ => return Err(invalid_operands(Opcode::Eq)),
    };
    Ok(Value::Bool(result))
}
