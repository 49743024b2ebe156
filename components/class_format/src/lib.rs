//! Parsed class-descriptor model.
//!
//! The VM consumes class files in already-parsed form: a
//! [`ClassDescriptor`] exposing the class name, parent, ordered
//! fields, methods with bytecode, and a 1-based constant pool. This
//! crate defines that model together with the opcode constants the
//! bytecode is written in. Decoding a binary class-file format into
//! descriptors is outside the VM core; descriptors are built in code
//! or serialized as JSON.

#![warn(clippy::all)]

pub mod constant_pool;
pub mod descriptor;
pub mod opcode;

pub use constant_pool::{Constant, ConstantPool};
pub use descriptor::{access, ClassDescriptor, FieldDescriptor, MethodDescriptor};
