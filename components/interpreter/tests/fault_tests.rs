//! Fault path tests
//!
//! Every fault is fatal to the interpret call: these check the error kind
//! and the exact message for each class of fault, including the defensive
//! checks against malformed chunks.

use bytecode_system::{Chunk, CodeBuilder, Opcode};
use core_types::{ErrorKind, Function, Gc, Value, VmError};
use interpreter::VM;

fn chunk_with(code: Vec<u8>, constants: Vec<Value>, globals_count: u32) -> Chunk {
    let mut chunk = Chunk::new(Function::script(code));
    for constant in constants {
        chunk.add_constant(constant);
    }
    chunk.globals_count = globals_count;
    chunk
}

fn run_err(chunk: &Chunk) -> VmError {
    let mut vm = VM::new(chunk);
    vm.interpret().expect_err("Execution should have faulted")
}

/// Test: a byte outside the instruction set faults
#[test]
fn test_unknown_opcode() {
    let err = run_err(&chunk_with(vec![99], vec![], 0));
    assert_eq!(err.kind, ErrorKind::UnknownOpcode);
    assert_eq!(err.to_string(), "Unknown opcode 99");
}

/// Test: arithmetic rejects operands outside the numeric coercion table
#[test]
fn test_add_type_mismatch() {
    let mut code = CodeBuilder::new();
    code.emit(Opcode::True);
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit(Opcode::Add);

    let err = run_err(&chunk_with(code.finish(), vec![Value::Int(1)], 0));
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.to_string(), "Invalid operands for OP_ADD");
}

/// Test: string operands only combine through Add
#[test]
fn test_multiply_strings_faults() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit(Opcode::Multiply);

    let err = run_err(&chunk_with(code.finish(), vec![Value::string("x")], 0));
    assert_eq!(err.to_string(), "Invalid operands for OP_MULTIPLY");
}

/// Test: negation requires a numeric operand
#[test]
fn test_negate_non_number() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit(Opcode::Negate);

    let err = run_err(&chunk_with(code.finish(), vec![Value::string("no")], 0));
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.to_string(), "Invalid operand for OP_NEGATE");
}

/// Test: logical negation requires a Bool
#[test]
fn test_not_non_bool() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit(Opcode::Not);

    let err = run_err(&chunk_with(code.finish(), vec![Value::Int(1)], 0));
    assert_eq!(err.to_string(), "Invalid operand for OP_NOT");
}

/// Test: closures are not comparable through EQ
#[test]
fn test_eq_closures_faults() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Closure, 0);
    code.emit_with_operand(Opcode::Closure, 0);
    code.emit(Opcode::Eq);

    let body = Value::Function(Gc::new(Function::new(vec![], 0, 0)));
    let err = run_err(&chunk_with(code.finish(), vec![body], 0));
    assert_eq!(err.to_string(), "Invalid operands for OP_EQ");
}

/// Test: integer division by zero faults
#[test]
fn test_int_division_by_zero() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::Constant, 1);
    code.emit(Opcode::Divide);

    let err = run_err(&chunk_with(
        code.finish(),
        vec![Value::Int(1), Value::Int(0)],
        0,
    ));
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.to_string(), "Invalid divisor for OP_DIVIDE");
}

/// Test: integer modulo by zero faults
#[test]
fn test_int_modulo_by_zero() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::Constant, 1);
    code.emit(Opcode::Modulo);

    let err = run_err(&chunk_with(
        code.finish(),
        vec![Value::Int(1), Value::Int(0)],
        0,
    ));
    assert_eq!(err.to_string(), "Invalid divisor for OP_MODULO");
}

/// Test: conditional jumps require a Bool condition
#[test]
fn test_jump_false_non_bool() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::JumpFalse, 0);

    let err = run_err(&chunk_with(code.finish(), vec![Value::Int(1)], 0));
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.to_string(), "Invalid operands for OP_JUMP_FALSE");
}

/// Test: calling a non-closure faults
#[test]
fn test_call_non_closure() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::Call, 0);

    let err = run_err(&chunk_with(code.finish(), vec![Value::Int(1)], 0));
    assert_eq!(err.kind, ErrorKind::CallError);
    assert_eq!(err.to_string(), "Invalid callee for OP_CALL");
}

/// Test: a bare function value is not callable either
#[test]
fn test_call_bare_function() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 0);
    code.emit_with_operand(Opcode::Call, 0);

    let function = Value::Function(Gc::new(Function::new(vec![], 0, 0)));
    let err = run_err(&chunk_with(code.finish(), vec![function], 0));
    assert_eq!(err.kind, ErrorKind::CallError);
}

/// Test: CLOSURE requires a function constant
#[test]
fn test_closure_over_non_function() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Closure, 0);

    let err = run_err(&chunk_with(code.finish(), vec![Value::Int(1)], 0));
    assert_eq!(err.kind, ErrorKind::CallError);
    assert_eq!(err.to_string(), "Invalid constant for OP_CLOSURE");
}

/// Test: code ending mid-instruction is a malformed chunk
#[test]
fn test_truncated_operand() {
    let err = run_err(&chunk_with(vec![Opcode::Constant.into()], vec![], 0));
    assert_eq!(err.kind, ErrorKind::MalformedChunk);
    assert_eq!(err.to_string(), "Invalid operand byte for OP_CONSTANT");
}

/// Test: popping an empty stack is a malformed chunk
#[test]
fn test_stack_underflow() {
    let err = run_err(&chunk_with(vec![Opcode::Add.into()], vec![], 0));
    assert_eq!(err.kind, ErrorKind::MalformedChunk);
    assert_eq!(err.to_string(), "Stack underflow");
}

/// Test: a constant index past the pool faults
#[test]
fn test_constant_index_out_of_range() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Constant, 5);

    let err = run_err(&chunk_with(code.finish(), vec![], 0));
    assert_eq!(err.to_string(), "Invalid constant index for OP_CONSTANT");
}

/// Test: global indices are bounded by the chunk's globals_count
#[test]
fn test_global_index_out_of_range() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::GetGlobal, 0);

    let err = run_err(&chunk_with(code.finish(), vec![], 0));
    assert_eq!(err.to_string(), "Invalid global index for OP_GET_GLOBAL");

    let mut code = CodeBuilder::new();
    code.emit(Opcode::Nil);
    code.emit_with_operand(Opcode::SetGlobal, 3);

    let err = run_err(&chunk_with(code.finish(), vec![], 1));
    assert_eq!(err.to_string(), "Invalid global index for OP_SET_GLOBAL");
}

/// Test: a local slot outside the live stack faults
#[test]
fn test_local_index_out_of_range() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::GetLocal, 5);

    let err = run_err(&chunk_with(code.finish(), vec![], 0));
    assert_eq!(err.to_string(), "Invalid local index for OP_GET_LOCAL");
}

/// Test: a jump target beyond the code faults
#[test]
fn test_jump_target_out_of_range() {
    let mut code = CodeBuilder::new();
    code.emit_with_operand(Opcode::Jump, 200);

    let err = run_err(&chunk_with(code.finish(), vec![], 0));
    assert_eq!(err.kind, ErrorKind::MalformedChunk);
    assert_eq!(err.to_string(), "Invalid jump target for OP_JUMP");
}

/// Test: SET_UPVALUE on a closure with no captures faults
#[test]
fn test_set_upvalue_out_of_range() {
    let mut code = CodeBuilder::new();
    code.emit(Opcode::Nil);
    code.emit_with_operand(Opcode::SetUpvalue, 0);

    let err = run_err(&chunk_with(code.finish(), vec![], 0));
    assert_eq!(err.to_string(), "Invalid upvalue index for OP_SET_UPVALUE");
}

/// Test: execution stops at the first fault; later effects never happen
#[test]
fn test_fault_halts_execution() {
    let mut code = CodeBuilder::new();
    code.emit(Opcode::True);
    code.emit(Opcode::Negate); // faults here
    code.emit_with_operand(Opcode::SetGlobal, 0); // never reached

    let chunk = chunk_with(code.finish(), vec![], 1);
    let mut vm = VM::new(&chunk);
    assert!(vm.interpret().is_err());
    assert_eq!(vm.global(0), Some(&Value::Nil));
}
