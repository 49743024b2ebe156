//! VM error types.
//!
//! Every fatal condition in the VM carries a [`VmErrorKind`] so a
//! wrapping layer can report or test for a specific failure instead of
//! a generic one. There is no recoverable class of error: a fatal
//! condition unwinds the whole call chain back to the original
//! `invoke` caller.

use std::fmt;

/// The kind of fatal VM condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmErrorKind {
    /// Opcode byte outside the known instruction set
    UnknownOpcode,
    /// Recognized opcode with no implementation in this VM
    UnsupportedOpcode,
    /// Value tag inconsistent with the instruction's expected type
    TypeMismatch,
    /// Integer divide or remainder by zero
    DivisionByZero,
    /// Null reference on field access, virtual call or array access
    NullReference,
    /// No class file available for a requested class name
    ClassNotFound,
    /// Class descriptor failed validation or decoding
    MalformedClass,
    /// Field name not present in the class layout
    FieldNotFound,
    /// Method not resolvable on the class or its ancestors
    MethodNotFound,
    /// Native-flagged method with no registered handler
    MissingNative,
    /// Heap capacity exhausted after collection
    OutOfMemory,
    /// Array instruction applied to a non-array object
    NotAnArray,
    /// Array index outside the bounds of the array
    IndexOutOfBounds,
    /// Array allocation with a negative length
    NegativeArraySize,
    /// Handle that no longer resolves to a live object
    InvalidHandle,
    /// Operand stack grew past the method's declared maximum
    StackOverflow,
    /// Operand stack popped below the current frame's operand region
    StackUnderflow,
    /// Entry-contract violation (not a zero-argument static method)
    InvalidEntryPoint,
}

impl VmErrorKind {
    /// Short stable name for messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            VmErrorKind::UnknownOpcode => "unknown opcode",
            VmErrorKind::UnsupportedOpcode => "unsupported opcode",
            VmErrorKind::TypeMismatch => "type mismatch",
            VmErrorKind::DivisionByZero => "division by zero",
            VmErrorKind::NullReference => "null reference",
            VmErrorKind::ClassNotFound => "class not found",
            VmErrorKind::MalformedClass => "malformed class",
            VmErrorKind::FieldNotFound => "field not found",
            VmErrorKind::MethodNotFound => "method not found",
            VmErrorKind::MissingNative => "missing native",
            VmErrorKind::OutOfMemory => "out of memory",
            VmErrorKind::NotAnArray => "not an array",
            VmErrorKind::IndexOutOfBounds => "index out of bounds",
            VmErrorKind::NegativeArraySize => "negative array size",
            VmErrorKind::InvalidHandle => "invalid handle",
            VmErrorKind::StackOverflow => "stack overflow",
            VmErrorKind::StackUnderflow => "stack underflow",
            VmErrorKind::InvalidEntryPoint => "invalid entry point",
        }
    }
}

impl fmt::Display for VmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a failure inside method bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeLocation {
    /// Fully-qualified method name (`Class.method`)
    pub method: String,
    /// Offset of the opcode byte that failed
    pub offset: usize,
}

/// A fatal VM condition with kind, message and optional location.
#[derive(Debug, Clone)]
pub struct VmError {
    /// The failure classification
    pub kind: VmErrorKind,
    /// Human-readable detail
    pub message: String,
    /// Bytecode position, when the failure occurred inside a method
    pub location: Option<BytecodeLocation>,
}

impl VmError {
    /// Create an error with no bytecode location.
    pub fn new(kind: VmErrorKind, message: impl Into<String>) -> Self {
        VmError {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a bytecode location, keeping an already-recorded one.
    ///
    /// The innermost frame is the interesting one, so the first
    /// location attached wins as the error unwinds outward.
    pub fn at(mut self, method: &str, offset: usize) -> Self {
        if self.location.is_none() {
            self.location = Some(BytecodeLocation {
                method: method.to_string(),
                offset,
            });
        }
        self
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (at {} offset {})", loc.method, loc.offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for VmError {}

/// Result type for VM operations.
pub type VmResult<T> = Result<T, VmError>;
