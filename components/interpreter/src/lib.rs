//! Bytecode interpreter.
//!
//! Executes method bytecode against the heap: one contiguous
//! locals-and-operand array for the whole call chain, an opcode
//! dispatch loop with static/special/virtual call kinds, lazy class
//! resolution, and the synchronous collection trigger.

#![warn(clippy::all)]

pub mod dispatch;
pub mod frame;
pub mod vm;

pub use frame::FrameStack;
pub use vm::Interpreter;
