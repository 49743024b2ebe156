//! Native-method registry and the standard stubs.
//!
//! Methods carrying the native access flag have no bytecode; the
//! interpreter asks the registry for a handler and runs it in the
//! current frame. The stubs shipped here cover the primitives the VM
//! core does not model itself: minimal console output and identity
//! hashing.

#![warn(clippy::all)]

pub mod console;
pub mod registry;

pub use registry::{NativeFn, NativeRegistry};
