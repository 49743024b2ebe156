//! Registry mapping native methods to handlers.

use std::collections::HashMap;

use core_types::{TaggedValue, VmResult};
use memory_manager::Heap;

/// A native-method handler.
///
/// Receives the heap and the call's arguments (receiver first for
/// instance methods) and returns the value to push, if the method
/// returns one.
pub type NativeFn = Box<dyn Fn(&mut Heap, &[TaggedValue]) -> VmResult<Option<TaggedValue>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NativeKey {
    class: String,
    name: String,
    descriptor: String,
}

/// Table of native handlers keyed by owning class, method name and
/// signature descriptor.
#[derive(Default)]
pub struct NativeRegistry {
    handlers: HashMap<NativeKey, NativeFn>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        NativeRegistry::default()
    }

    /// A registry with the standard stubs installed, writing console
    /// output to stdout.
    pub fn with_defaults() -> Self {
        let mut registry = NativeRegistry::new();
        crate::console::install(&mut registry, crate::console::stdout_writer());
        registry
    }

    /// Register a handler for one native method.
    pub fn register(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        handler: NativeFn,
    ) {
        self.handlers.insert(
            NativeKey {
                class: class.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            },
            handler,
        );
    }

    /// Look up the handler for a native method, if one is registered.
    pub fn lookup(&self, class: &str, name: &str, descriptor: &str) -> Option<&NativeFn> {
        self.handlers.get(&NativeKey {
            class: class.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Whether a handler is registered.
    pub fn contains(&self, class: &str, name: &str, descriptor: &str) -> bool {
        self.lookup(class, name, descriptor).is_some()
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
