//! Class loading and linking.
//!
//! Turns parsed class descriptors into linked klass metadata installed
//! in the heap: field layout including inherited fields, chain-shared
//! static storage, and virtual method tables built by override
//! resolution. Loading is idempotent per class name and recursive over
//! the ancestor chain.

#![warn(clippy::all)]

pub mod linker;
pub mod loader;
pub mod source;

pub use loader::{ClassLoader, LoadOutcome};
pub use source::{ClassPath, ClassSource, FixtureSource};
