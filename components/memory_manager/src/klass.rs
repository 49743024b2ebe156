//! Runtime class metadata.
//!
//! A [`Klass`] is the linked, runtime form of a class descriptor:
//! field layout including inherited fields, static-storage indices,
//! the static-method map, and the virtual method table. It is built
//! once by the linker and never mutated afterwards; only the static
//! field slots it points at change, through the statics object.
//!
//! The virtual table is plain data — an array of method indices with a
//! name+descriptor map onto slots — so override dispatch is a table
//! lookup, not a host-language mechanism.

use std::collections::HashMap;
use std::rc::Rc;

use class_format::ConstantPool;
use core_types::TypeTag;

use crate::heap::Handle;

/// Index of a klass in the heap's class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KlassId(pub usize);

/// Index of a method in the heap's method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub usize);

/// Lookup key for methods: name plus signature descriptor.
pub fn method_key(name: &str, descriptor: &str) -> String {
    format!("{}{}", name, descriptor)
}

/// Linked runtime metadata for one class.
#[derive(Debug, Clone)]
pub struct Klass {
    /// Fully-qualified class name
    pub name: String,
    /// Parent class, or `None` for a root class
    pub super_class: Option<KlassId>,
    /// Instance field names, inherited first, parent-first order
    pub field_names: Vec<String>,
    /// Tag of each instance field slot, same order as `field_names`
    pub field_tags: Vec<TypeTag>,
    /// Field name to slot index (a redeclared name shadows the parent)
    pub field_index: HashMap<String, usize>,
    /// Static-storage object shared by the whole inheritance chain
    pub statics: Handle,
    /// Static field name to slot index in the shared statics object
    pub static_index: HashMap<String, usize>,
    /// Tag of each static slot this class can see
    pub static_tags: Vec<TypeTag>,
    /// Static methods by key, layered over the parent's map
    pub static_methods: HashMap<String, MethodId>,
    /// All methods declared by this class itself, by key
    pub declared_methods: HashMap<String, MethodId>,
    /// Virtual table: call-site slot to method index
    pub vtable: Vec<MethodId>,
    /// Method key to virtual-table slot
    pub vtable_index: HashMap<String, usize>,
    /// The class's constant pool, kept for bytecode pool operands
    pub constant_pool: ConstantPool,
}

impl Klass {
    /// Slot of an instance field, searching the merged layout.
    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    /// Slot of a static field in the chain's shared statics object.
    pub fn static_slot(&self, name: &str) -> Option<usize> {
        self.static_index.get(name).copied()
    }

    /// Virtual-table slot and current method for a method key.
    pub fn virtual_slot(&self, key: &str) -> Option<(usize, MethodId)> {
        self.vtable_index
            .get(key)
            .map(|&slot| (slot, self.vtable[slot]))
    }

    /// Static method for a key, including inherited (shadowed) entries.
    pub fn static_method(&self, key: &str) -> Option<MethodId> {
        self.static_methods.get(key).copied()
    }
}

/// One linked method: owner, identity, bytecode and frame geometry.
///
/// Immutable after decoding. The bytecode is reference-counted so a
/// frame can hold the code it is executing without cloning it.
#[derive(Debug, Clone)]
pub struct Method {
    /// Class that declared the method
    pub owner: KlassId,
    /// Method name
    pub name: String,
    /// Signature descriptor
    pub descriptor: String,
    /// Bytecode (empty for native stubs)
    pub code: Rc<[u8]>,
    /// Declared argument count (receiver not included)
    pub arg_count: usize,
    /// Locals-region size
    pub max_locals: usize,
    /// Operand-region capacity
    pub max_stack: usize,
    /// Access flags as declared
    pub flags: u16,
}

impl Method {
    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.flags & class_format::access::STATIC != 0
    }

    /// Whether the method is a native stub.
    pub fn is_native(&self) -> bool {
        self.flags & class_format::access::NATIVE != 0
    }

    /// Lookup key (`name` + `descriptor`).
    pub fn key(&self) -> String {
        method_key(&self.name, &self.descriptor)
    }
}
