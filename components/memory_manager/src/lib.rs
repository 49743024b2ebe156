//! Heap, object model and garbage collector.
//!
//! This component owns every instance object, the klass-metadata
//! table, the method table, and the indirection layer between stable
//! object handles and backing storage slots. The collector lives here
//! too: it is the only code allowed to rewrite the indirection table.

#![warn(clippy::all)]

pub mod gc;
pub mod heap;
pub mod klass;
pub mod object;

pub use gc::collect;
pub use heap::{Handle, Heap, DEFAULT_HEAP_CAPACITY};
pub use klass::{Klass, KlassId, Method, MethodId};
pub use object::{HeapObject, ObjectKind};
