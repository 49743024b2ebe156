//! Descriptor validation and linking.
//!
//! Linking turns one validated descriptor plus its already-linked
//! parent into klass metadata: merged field layout, extended
//! chain-shared static storage, registered methods, and the virtual
//! table with overrides resolved onto their inherited slots.

use std::collections::{HashMap, HashSet};

use class_format::descriptor::CLASS_INITIALIZER_NAME;
use class_format::{ClassDescriptor, MethodDescriptor};
use core_types::{TypeTag, VmError, VmErrorKind, VmResult};
use memory_manager::klass::method_key;
use memory_manager::{Heap, HeapObject, Klass, KlassId, Method, MethodId};

/// Key of the static-initializer method.
pub fn class_initializer_key() -> String {
    method_key(CLASS_INITIALIZER_NAME, "()V")
}

/// Validate a descriptor before any linking side effects.
///
/// Catches duplicate declared fields, unparsable type and signature
/// descriptors, bytecode-less non-native methods, and a class naming
/// itself as its parent.
pub fn validate(descriptor: &ClassDescriptor) -> VmResult<()> {
    if descriptor.super_name.as_deref() == Some(descriptor.name.as_str()) {
        return Err(malformed(format!(
            "class {} declares itself as its parent",
            descriptor.name
        )));
    }

    let mut seen = HashSet::new();
    for field in &descriptor.fields {
        field.type_tag()?;
        if !seen.insert((field.name.as_str(), field.is_static())) {
            return Err(malformed(format!(
                "class {} declares field {} twice",
                descriptor.name, field.name
            )));
        }
    }

    for method in &descriptor.methods {
        method.arg_count()?;
        if method.code.is_empty() && !method.is_native() {
            return Err(malformed(format!(
                "method {}.{} has no bytecode and is not native",
                descriptor.name, method.name
            )));
        }
    }

    Ok(())
}

/// Link a validated descriptor against its parent and build the klass.
///
/// The caller installs the returned klass with [`Heap::add_class`];
/// methods are registered here because their owner id is already
/// fixed as the next class id.
pub fn link(
    heap: &mut Heap,
    descriptor: &ClassDescriptor,
    super_class: Option<KlassId>,
) -> VmResult<Klass> {
    let owner = heap.next_class_id();

    // Field layout: inherited fields first, parent-first order.
    let (mut field_names, mut field_tags, mut field_index) = match super_class {
        Some(parent) => {
            let parent = heap.class(parent);
            (
                parent.field_names.clone(),
                parent.field_tags.clone(),
                parent.field_index.clone(),
            )
        }
        None => (Vec::new(), Vec::new(), HashMap::new()),
    };
    for field in descriptor.instance_fields() {
        let slot = field_names.len();
        field_index.insert(field.name.clone(), slot);
        field_names.push(field.name.clone());
        field_tags.push(field.type_tag()?);
    }

    // Static storage: the chain shares one object; a child extends the
    // backing array with its own defaulted slots, preserving inherited
    // values through the same slot indices.
    let own_statics: Vec<(String, TypeTag)> = descriptor
        .static_fields()
        .map(|f| f.type_tag().map(|tag| (f.name.clone(), tag)))
        .collect::<VmResult<_>>()?;

    let (statics, mut static_index, mut static_tags) = match super_class {
        Some(parent) => {
            let parent = heap.class(parent);
            (
                parent.statics,
                parent.static_index.clone(),
                parent.static_tags.clone(),
            )
        }
        None => {
            let handle = heap.allocate(HeapObject::new_statics(&[]))?;
            heap.register_static_root(handle);
            (handle, HashMap::new(), Vec::new())
        }
    };
    if !own_statics.is_empty() {
        let base = static_tags.len();
        let storage = heap.resolve_mut(statics)?;
        let mut slots = Vec::with_capacity(base + own_statics.len());
        slots.extend_from_slice(&storage.slots);
        for (offset, (name, tag)) in own_statics.iter().enumerate() {
            static_index.insert(name.clone(), base + offset);
            static_tags.push(*tag);
            slots.push(core_types::TaggedValue::zero_of(*tag));
        }
        storage.slots = slots;
    }

    // Methods: register each one, layer the static map over the
    // parent's, and resolve overrides onto inherited vtable slots.
    let (mut static_methods, mut vtable, mut vtable_index) = match super_class {
        Some(parent) => {
            let parent = heap.class(parent);
            (
                parent.static_methods.clone(),
                parent.vtable.clone(),
                parent.vtable_index.clone(),
            )
        }
        None => (HashMap::new(), Vec::new(), HashMap::new()),
    };
    let mut declared_methods = HashMap::new();

    for method in &descriptor.methods {
        let id = register_method(heap, owner, method)?;
        let key = method_key(&method.name, &method.descriptor);
        declared_methods.insert(key.clone(), id);

        if method.is_static() {
            static_methods.insert(key, id);
        } else if !method.is_private() && !method.is_constructor() {
            match vtable_index.get(&key) {
                // Same name and signature as an inherited method:
                // overwrite its slot, which is what makes override
                // dispatch a plain table lookup.
                Some(&slot) => vtable[slot] = id,
                None => {
                    vtable_index.insert(key, vtable.len());
                    vtable.push(id);
                }
            }
        }
    }

    Ok(Klass {
        name: descriptor.name.clone(),
        super_class,
        field_names,
        field_tags,
        field_index,
        statics,
        static_index,
        static_tags,
        static_methods,
        declared_methods,
        vtable,
        vtable_index,
        constant_pool: descriptor.constant_pool.clone(),
    })
}

fn register_method(
    heap: &mut Heap,
    owner: KlassId,
    method: &MethodDescriptor,
) -> VmResult<MethodId> {
    let linked = Method {
        owner,
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        code: method.code.clone().into(),
        arg_count: method.arg_count()?,
        max_locals: method.max_locals as usize,
        max_stack: method.max_stack as usize,
        flags: method.flags,
    };
    Ok(heap.add_method(linked))
}

fn malformed(message: String) -> VmError {
    VmError::new(VmErrorKind::MalformedClass, message)
}
