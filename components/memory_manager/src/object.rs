//! Heap-resident instance objects.

use core_types::{TaggedValue, TypeTag, VmError, VmErrorKind, VmResult};

use crate::klass::KlassId;

/// What a heap object's slots represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Field object: one slot per instance field, parent-first order
    Instance {
        /// The object's runtime class
        class: KlassId,
    },
    /// Array object: homogeneous slots of one element type
    Array {
        /// Element type every slot carries
        elem: TypeTag,
    },
    /// Static-field storage shared by one inheritance chain
    Statics,
}

/// One heap object: its kind, slot storage and mark bit.
///
/// Objects are referenced only through the heap's handle table and are
/// destroyed only by the collector.
#[derive(Debug, Clone)]
pub struct HeapObject {
    /// Slot interpretation
    pub kind: ObjectKind,
    /// Slot storage; every slot carries a valid tag
    pub slots: Vec<TaggedValue>,
    /// Mark bit owned by the collector
    pub marked: bool,
}

impl HeapObject {
    /// A field object with every slot zeroed to its declared tag.
    pub fn new_instance(class: KlassId, field_tags: &[TypeTag]) -> Self {
        HeapObject {
            kind: ObjectKind::Instance { class },
            slots: field_tags.iter().map(|&t| TaggedValue::zero_of(t)).collect(),
            marked: false,
        }
    }

    /// An array object with `length` slots zeroed to the element tag.
    pub fn new_array(elem: TypeTag, length: usize) -> Self {
        HeapObject {
            kind: ObjectKind::Array { elem },
            slots: vec![TaggedValue::zero_of(elem); length],
            marked: false,
        }
    }

    /// A static-storage object with one zeroed slot per declared tag.
    pub fn new_statics(tags: &[TypeTag]) -> Self {
        HeapObject {
            kind: ObjectKind::Statics,
            slots: tags.iter().map(|&t| TaggedValue::zero_of(t)).collect(),
            marked: false,
        }
    }

    /// Whether this is an array object.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array { .. })
    }

    /// The element tag of an array object; fails on non-arrays.
    pub fn element_tag(&self) -> VmResult<TypeTag> {
        match self.kind {
            ObjectKind::Array { elem } => Ok(elem),
            _ => Err(VmError::new(
                VmErrorKind::NotAnArray,
                "array operation on a non-array object",
            )),
        }
    }

    /// Number of slots (array length for arrays).
    pub fn length(&self) -> usize {
        self.slots.len()
    }

    /// Read a slot with bounds checking.
    pub fn get_slot(&self, index: usize) -> VmResult<TaggedValue> {
        self.slots.get(index).copied().ok_or_else(|| {
            VmError::new(
                VmErrorKind::IndexOutOfBounds,
                format!("slot {} out of bounds for length {}", index, self.slots.len()),
            )
        })
    }

    /// Write a slot with bounds checking.
    pub fn set_slot(&mut self, index: usize, value: TaggedValue) -> VmResult<()> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::new(
                VmErrorKind::IndexOutOfBounds,
                format!("slot {} out of bounds for length {}", index, len),
            )),
        }
    }
}
