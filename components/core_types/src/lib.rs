//! Core types shared by every VM component.
//!
//! This crate defines the tagged 64-bit value representation and the
//! fatal-error taxonomy. It has no dependencies on the rest of the
//! workspace so that leaf components can all build on it.

#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{BytecodeLocation, VmError, VmErrorKind, VmResult};
pub use value::{TaggedValue, TypeTag};
