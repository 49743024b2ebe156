//! Runtime orchestration.
//!
//! The `Runtime` wires the components together — classpath source,
//! loader, native registry, heap, interpreter — and exposes the entry
//! contract: resolve a fully-qualified static method by name, invoke
//! it, return its tagged result.

use std::path::PathBuf;

use class_format::opcode;
use class_loader::{ClassLoader, ClassPath};
use core_types::TaggedValue;
use interpreter::Interpreter;
use memory_manager::Heap;
use natives::NativeRegistry;

use crate::error::{CliError, CliResult};

/// Collection statistics, reportable after a run.
#[derive(Debug, Clone, Copy)]
pub struct GcStats {
    /// Completed collections
    pub collections: usize,
    /// Live objects at the time of the query
    pub live: usize,
    /// Heap object capacity
    pub capacity: usize,
}

/// Main runtime orchestrating VM execution.
pub struct Runtime {
    interpreter: Interpreter,
    print_bytecode: bool,
}

impl Runtime {
    /// A runtime over the given classpath directories.
    ///
    /// `heap_capacity` bounds the heap in objects; `None` uses the
    /// default capacity.
    pub fn new(classpath: Vec<PathBuf>, heap_capacity: Option<usize>) -> Self {
        let heap = match heap_capacity {
            Some(capacity) => Heap::with_capacity(capacity),
            None => Heap::new(),
        };
        let loader = ClassLoader::new(Box::new(ClassPath::new(classpath)));
        Runtime {
            interpreter: Interpreter::new(heap, loader, NativeRegistry::with_defaults()),
            print_bytecode: false,
        }
    }

    /// Enable disassembly of the entry class before execution.
    pub fn with_print_bytecode(mut self, enabled: bool) -> Self {
        self.print_bytecode = enabled;
        self
    }

    /// Invoke a fully-qualified zero-argument static method and return
    /// its tagged result.
    pub fn run_entry(&mut self, entry: &str) -> CliResult<TaggedValue> {
        let Some((class_name, _)) = entry.rsplit_once('.') else {
            return Err(CliError::BadEntryPoint(format!(
                "'{}' is not a fully-qualified method name",
                entry
            )));
        };

        if self.print_bytecode {
            println!("{}", self.disassemble_class(class_name)?);
        }

        Ok(self.interpreter.call_static(entry)?)
    }

    /// Render every method of a class as bytecode listings.
    ///
    /// Loads (and statically initializes) the class if needed.
    pub fn disassemble_class(&mut self, class_name: &str) -> CliResult<String> {
        let class = self.interpreter.resolve_class(class_name)?;
        let heap = self.interpreter.heap();
        let klass = heap.class(class);

        let mut methods: Vec<_> = klass.declared_methods.values().copied().collect();
        methods.sort_by_key(|&id| heap.method(id).name.clone());

        let mut out = String::new();
        for id in methods {
            let method = heap.method(id);
            out.push_str(&format!("{}.{}{}\n", klass.name, method.name, method.descriptor));
            if method.is_native() {
                out.push_str("       (native)\n");
            } else {
                out.push_str(&opcode::disassemble(&method.code));
            }
        }
        Ok(out)
    }

    /// Current collection statistics.
    pub fn gc_stats(&self) -> GcStats {
        let heap = self.interpreter.heap();
        GcStats {
            collections: heap.collection_count(),
            live: heap.live_count(),
            capacity: heap.capacity(),
        }
    }

    /// Direct access to the interpreter, for embedders.
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}
