//! The interpreter: owns the heap, loader, native registry and frame
//! storage, and drives method execution.

use core_types::{TaggedValue, VmError, VmErrorKind, VmResult};
use class_loader::ClassLoader;
use log::debug;
use memory_manager::{collect, Heap, KlassId, MethodId};
use natives::NativeRegistry;

use crate::dispatch::ExecState;
use crate::frame::FrameStack;

/// Executes method bytecode against the heap.
///
/// One interpreter is one VM instance: it owns the heap outright and
/// passes it by reference to the loader and collector — there is no
/// global state. All execution is single-threaded and synchronous.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) loader: ClassLoader,
    pub(crate) natives: NativeRegistry,
    pub(crate) frames: FrameStack,
}

impl Interpreter {
    /// An interpreter over the given heap, loader and native registry.
    pub fn new(heap: Heap, loader: ClassLoader, natives: NativeRegistry) -> Self {
        Interpreter {
            heap,
            loader,
            natives,
            frames: FrameStack::new(),
        }
    }

    /// The heap, for inspection.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The heap, mutable (embedders seeding objects).
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Ensure a class is loaded, linked and statically initialized.
    ///
    /// Pending static initializers run here, root ancestor first, as
    /// nested invocations on top of whatever is currently executing.
    pub fn resolve_class(&mut self, name: &str) -> VmResult<KlassId> {
        if let Some(id) = self.heap.class_id(name) {
            return Ok(id);
        }
        let outcome = self.loader.load(&mut self.heap, name)?;
        for &initializer in &outcome.initializers {
            debug!("running initializer {}", self.heap.method_name(initializer));
            self.invoke(initializer)?;
        }
        Ok(outcome.class)
    }

    /// Entry contract: resolve a fully-qualified zero-argument static
    /// method (`demo.Main.run`), load and initialize its class, invoke
    /// it and return the tagged result.
    pub fn call_static(&mut self, qualified: &str) -> VmResult<TaggedValue> {
        let Some((class_name, method_name)) = qualified.rsplit_once('.') else {
            return Err(VmError::new(
                VmErrorKind::InvalidEntryPoint,
                format!("'{}' is not a fully-qualified method name", qualified),
            ));
        };

        let class = self.resolve_class(class_name)?;
        let entry = self
            .heap
            .class(class)
            .static_methods
            .values()
            .copied()
            .find(|&id| {
                let m = self.heap.method(id);
                m.name == method_name && m.arg_count == 0
            })
            .ok_or_else(|| {
                VmError::new(
                    VmErrorKind::MethodNotFound,
                    format!("no zero-argument static {} on {}", method_name, class_name),
                )
            })?;
        self.invoke(entry)
    }

    /// Execute a zero-argument static method to completion and return
    /// the top-of-stack value (the null word for void methods).
    ///
    /// Every fatal condition unwinds the whole call chain back here;
    /// there is no catch mechanism inside bytecode semantics.
    pub fn invoke(&mut self, method: MethodId) -> VmResult<TaggedValue> {
        let m = self.heap.method(method);
        if !m.is_static() || m.arg_count != 0 {
            return Err(VmError::new(
                VmErrorKind::InvalidEntryPoint,
                format!("{} is not a zero-argument static method", m.name),
            ));
        }
        if m.is_native() {
            return Err(VmError::new(
                VmErrorKind::InvalidEntryPoint,
                format!("{} is native and cannot be invoked directly", m.name),
            ));
        }

        let mut state = ExecState::new(method, m.code.clone());
        let mark = self.frames.enter_root(m.max_locals, m.max_stack);

        loop {
            match self.execute_one(&mut state) {
                Ok(None) => {}
                Ok(Some(result)) => {
                    self.frames.leave_root(mark);
                    return Ok(result);
                }
                Err(error) => {
                    // Unwind the entire chain of this invocation; the
                    // innermost location is already attached.
                    let located =
                        error.at(&self.heap.method_name(state.method), state.insn_pc);
                    self.frames.leave_root(mark);
                    return Err(located);
                }
            }
        }
    }

    /// Run a collection now, using the live frame region as roots.
    pub fn collect_now(&mut self) {
        let Interpreter { heap, frames, .. } = self;
        collect(heap, frames.roots());
    }

    /// Collection trigger: called before each allocation opcode. Runs
    /// a synchronous collection when the heap is past its threshold
    /// and no collection is already running.
    pub(crate) fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            let Interpreter { heap, frames, .. } = self;
            collect(heap, frames.roots());
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("live_objects", &self.heap.live_count())
            .field("collections", &self.heap.collection_count())
            .finish()
    }
}
