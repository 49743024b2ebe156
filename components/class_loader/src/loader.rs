//! Recursive, idempotent class loading.

use std::collections::HashSet;

use core_types::{VmError, VmErrorKind, VmResult};
use log::debug;
use memory_manager::{Heap, KlassId, MethodId};

use crate::linker;
use crate::source::ClassSource;

/// Result of a `load` call: the class id plus any static initializers
/// that became pending, ordered root ancestor first. The caller must
/// execute them before touching the loaded classes.
#[derive(Debug)]
pub struct LoadOutcome {
    /// The requested class
    pub class: KlassId,
    /// Pending `<clinit>` methods, root-first; empty when every class
    /// on the chain was already loaded
    pub initializers: Vec<MethodId>,
}

/// Loads classes from a [`ClassSource`] and links them into the heap.
pub struct ClassLoader {
    source: Box<dyn ClassSource>,
    /// Names currently being linked, to catch inheritance cycles
    loading: HashSet<String>,
}

impl ClassLoader {
    /// A loader over the given descriptor source.
    pub fn new(source: Box<dyn ClassSource>) -> Self {
        ClassLoader {
            source,
            loading: HashSet::new(),
        }
    }

    /// Ensure `name` and its full ancestor chain are linked into the
    /// heap. Idempotent: a class already present is returned with no
    /// pending initializers.
    pub fn load(&mut self, heap: &mut Heap, name: &str) -> VmResult<LoadOutcome> {
        let mut initializers = Vec::new();
        let class = self.load_with_pending(heap, name, &mut initializers)?;
        Ok(LoadOutcome {
            class,
            initializers,
        })
    }

    fn load_with_pending(
        &mut self,
        heap: &mut Heap,
        name: &str,
        pending: &mut Vec<MethodId>,
    ) -> VmResult<KlassId> {
        if let Some(id) = heap.class_id(name) {
            return Ok(id);
        }
        if !self.loading.insert(name.to_string()) {
            return Err(VmError::new(
                VmErrorKind::MalformedClass,
                format!("inheritance cycle involving {}", name),
            ));
        }
        let result = self.load_fresh(heap, name, pending);
        self.loading.remove(name);
        result
    }

    fn load_fresh(
        &mut self,
        heap: &mut Heap,
        name: &str,
        pending: &mut Vec<MethodId>,
    ) -> VmResult<KlassId> {
        let descriptor = self.source.load_class(name)?;
        if descriptor.name != name {
            return Err(VmError::new(
                VmErrorKind::MalformedClass,
                format!(
                    "class file for {} declares itself as {}",
                    name, descriptor.name
                ),
            ));
        }
        linker::validate(&descriptor)?;

        // The whole ancestor chain links before this class does, so a
        // parent's initializer lands on `pending` ahead of the child's.
        let super_class = match &descriptor.super_name {
            Some(parent) => Some(self.load_with_pending(heap, parent, pending)?),
            None => None,
        };

        let klass = linker::link(heap, &descriptor, super_class)?;
        let initializer = klass
            .declared_methods
            .get(&linker::class_initializer_key())
            .copied();
        let id = heap.add_class(klass);
        debug!("loaded class {}", name);

        if let Some(method) = initializer {
            pending.push(method);
        }
        Ok(id)
    }
}

impl std::fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLoader")
            .field("loading", &self.loading)
            .finish()
    }
}
