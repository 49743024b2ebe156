//! The heap: backing storage, handle indirection, class and method
//! tables, and the allocation capacity policy.
//!
//! Backing storage is a growable slot array; object handles are
//! indices into a second, dense indirection table that maps each
//! handle to its current backing slot. The collector is the only code
//! that rewrites that table, which lets it free backing storage
//! without invalidating handles already pushed onto operand stacks or
//! stored in fields.

use std::collections::HashMap;

use core_types::{TaggedValue, VmError, VmErrorKind, VmResult};

use crate::klass::{Klass, KlassId, Method, MethodId};
use crate::object::{HeapObject, ObjectKind};

/// Default backing-array capacity, in objects.
pub const DEFAULT_HEAP_CAPACITY: usize = 64 * 1024;

/// Stable identifier of a heap object, indirect from its backing slot.
///
/// Handles travel as the payload of reference-tagged values; payload 0
/// is the null reference, so handle indices start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    /// The payload a reference-tagged value carries for this handle.
    pub fn payload(self) -> i32 {
        self.0 as i32
    }

    /// Recover a handle from a non-null reference payload.
    pub fn from_payload(payload: i32) -> VmResult<Self> {
        if payload <= 0 {
            return Err(VmError::new(
                VmErrorKind::InvalidHandle,
                format!("reference payload {} is not a handle", payload),
            ));
        }
        Ok(Handle(payload as u32))
    }

    /// The reference-tagged value for this handle.
    pub fn to_value(self) -> TaggedValue {
        TaggedValue::reference(self.payload())
    }
}

/// One indirection-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleEntry {
    /// Resolves to a live backing slot
    Live(usize),
    /// Explicitly invalidated; recorded on the free list before reuse
    Free,
}

/// The VM heap. Constructed once per VM instance and passed by
/// reference to the loader, interpreter and collector.
#[derive(Debug)]
pub struct Heap {
    /// Backing storage slots
    pub(crate) objects: Vec<Option<HeapObject>>,
    /// Backing slots cleared by the collector, available for reuse
    pub(crate) free_slots: Vec<usize>,
    /// Handle indirection table; index 0 is reserved for null
    pub(crate) handles: Vec<HandleEntry>,
    /// Invalidated handle indices, available for reuse
    pub(crate) free_handles: Vec<u32>,
    /// Number of live objects
    pub(crate) live_count: usize,
    /// Maximum number of live objects
    capacity: usize,
    /// Guard so a running collection never re-triggers itself
    pub(crate) collecting: bool,
    /// Linked class metadata, indexed by `KlassId`
    classes: Vec<Klass>,
    /// Class name to id
    class_index: HashMap<String, KlassId>,
    /// Linked methods, indexed by `MethodId`
    methods: Vec<Method>,
    /// Static-storage objects; always part of the collector's roots
    pub(crate) static_roots: Vec<Handle>,
    /// Completed collections
    pub(crate) collections: usize,
    /// Objects freed by the most recent collection
    pub(crate) last_freed: usize,
}

impl Heap {
    /// A heap with the default object capacity.
    pub fn new() -> Self {
        Heap::with_capacity(DEFAULT_HEAP_CAPACITY)
    }

    /// A heap bounded to at most `capacity` live objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Heap {
            objects: Vec::new(),
            free_slots: Vec::new(),
            handles: vec![HandleEntry::Free], // index 0 reserved for null
            free_handles: Vec::new(),
            live_count: 0,
            capacity,
            collecting: false,
            classes: Vec::new(),
            class_index: HashMap::new(),
            methods: Vec::new(),
            static_roots: Vec::new(),
            collections: 0,
            last_freed: 0,
        }
    }

    // ----- allocation and resolution -----

    /// Install a new object and return its stable handle.
    ///
    /// Fails with out-of-memory when the live-object count has reached
    /// capacity; callers holding roots are expected to have collected
    /// first (see [`Heap::should_collect`]).
    pub fn allocate(&mut self, object: HeapObject) -> VmResult<Handle> {
        if self.live_count >= self.capacity {
            return Err(VmError::new(
                VmErrorKind::OutOfMemory,
                format!("heap capacity of {} objects exhausted", self.capacity),
            ));
        }

        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.objects[slot] = Some(object);
                slot
            }
            None => {
                self.objects.push(Some(object));
                self.objects.len() - 1
            }
        };

        let handle = match self.free_handles.pop() {
            Some(index) => {
                self.handles[index as usize] = HandleEntry::Live(slot);
                Handle(index)
            }
            None => {
                self.handles.push(HandleEntry::Live(slot));
                Handle((self.handles.len() - 1) as u32)
            }
        };

        self.live_count += 1;
        Ok(handle)
    }

    /// Whether callers should run a collection before allocating:
    /// live objects exceed 70% of capacity and no collection is
    /// already running.
    pub fn should_collect(&self) -> bool {
        !self.collecting && self.live_count * 10 > self.capacity * 7
    }

    /// Dereference a handle.
    pub fn resolve(&self, handle: Handle) -> VmResult<&HeapObject> {
        let slot = self.backing_slot(handle)?;
        self.objects[slot].as_ref().ok_or_else(|| stale(handle))
    }

    /// Dereference a handle mutably.
    pub fn resolve_mut(&mut self, handle: Handle) -> VmResult<&mut HeapObject> {
        let slot = self.backing_slot(handle)?;
        self.objects[slot].as_mut().ok_or_else(|| stale(handle))
    }

    /// Whether a handle currently resolves to a live object.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.backing_slot(handle).is_ok()
    }

    /// The runtime class of an instance object.
    pub fn class_of(&self, handle: Handle) -> VmResult<KlassId> {
        match self.resolve(handle)?.kind {
            ObjectKind::Instance { class } => Ok(class),
            _ => Err(VmError::new(
                VmErrorKind::TypeMismatch,
                "object has no instance class",
            )),
        }
    }

    fn backing_slot(&self, handle: Handle) -> VmResult<usize> {
        match self.handles.get(handle.0 as usize) {
            Some(HandleEntry::Live(slot)) => Ok(*slot),
            _ => Err(stale(handle)),
        }
    }

    // ----- class and method tables -----

    /// The id the next installed class will receive.
    pub fn next_class_id(&self) -> KlassId {
        KlassId(self.classes.len())
    }

    /// Install linked klass metadata. Never removed.
    pub fn add_class(&mut self, klass: Klass) -> KlassId {
        let id = KlassId(self.classes.len());
        self.class_index.insert(klass.name.clone(), id);
        self.classes.push(klass);
        id
    }

    /// Id of an already-loaded class.
    pub fn class_id(&self, name: &str) -> Option<KlassId> {
        self.class_index.get(name).copied()
    }

    /// Metadata of a loaded class.
    pub fn class(&self, id: KlassId) -> &Klass {
        &self.classes[id.0]
    }

    /// Install a linked method. Never removed.
    pub fn add_method(&mut self, method: Method) -> MethodId {
        self.methods.push(method);
        MethodId(self.methods.len() - 1)
    }

    /// A linked method.
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    /// Fully-qualified `Class.method` name, for diagnostics.
    pub fn method_name(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!("{}.{}", self.class(method.owner).name, method.name)
    }

    /// Record a static-storage object as a permanent collector root.
    pub fn register_static_root(&mut self, handle: Handle) {
        self.static_roots.push(handle);
    }

    // ----- statistics -----

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Object capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed collections.
    pub fn collection_count(&self) -> usize {
        self.collections
    }

    /// Objects freed by the most recent collection.
    pub fn last_freed(&self) -> usize {
        self.last_freed
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

fn stale(handle: Handle) -> VmError {
    VmError::new(
        VmErrorKind::InvalidHandle,
        format!("handle {} does not resolve to a live object", handle.0),
    )
}
