//! Mark-and-sweep garbage collector.
//!
//! `collect` reclaims every heap object unreachable from the supplied
//! root values and the registered static-storage objects. Surviving
//! handles keep resolving to the same objects; swept handles are
//! invalidated and recorded on the free lists before any reuse.
//! Collection runs synchronously on the caller's thread and never
//! fails — exhaustion surfaces later, at allocation time.

use core_types::TaggedValue;
use log::debug;

use crate::heap::{Handle, HandleEntry, Heap};

/// Collect every object unreachable from `roots` plus the static
/// storage objects.
///
/// `roots` is the interpreter's live frame region: every tagged value
/// currently resident in any active frame's locals-and-operand slots,
/// across the full call chain. Non-reference values in it are skipped.
pub fn collect(heap: &mut Heap, roots: &[TaggedValue]) {
    heap.collecting = true;

    mark(heap, roots);
    let freed = sweep(heap);

    heap.live_count -= freed;
    heap.collections += 1;
    heap.last_freed = freed;
    heap.collecting = false;

    debug!(
        "gc: freed {} objects, {} live of {} capacity",
        freed,
        heap.live_count,
        heap.capacity()
    );
}

/// Transitively mark everything reachable from the roots.
fn mark(heap: &mut Heap, roots: &[TaggedValue]) {
    let mut worklist: Vec<Handle> = Vec::new();

    for &value in roots {
        push_reference(&mut worklist, value);
    }
    worklist.extend(heap.static_roots.iter().copied());

    while let Some(handle) = worklist.pop() {
        let Some(&HandleEntry::Live(slot)) = heap.handles.get(handle.payload() as usize) else {
            continue;
        };
        let Some(object) = heap.objects[slot].as_mut() else {
            continue;
        };
        // An already-marked object is not re-traversed, which is what
        // terminates reference cycles.
        if object.marked {
            continue;
        }
        object.marked = true;
        for &slot_value in &object.slots {
            push_reference(&mut worklist, slot_value);
        }
    }
}

/// Clear every unmarked backing slot and invalidate its handle, then
/// reset the mark bits of the survivors. Returns the freed count.
fn sweep(heap: &mut Heap) -> usize {
    let mut freed = 0;

    for index in 1..heap.handles.len() {
        let HandleEntry::Live(slot) = heap.handles[index] else {
            continue;
        };
        let marked = heap.objects[slot].as_ref().is_some_and(|o| o.marked);
        if !marked {
            heap.objects[slot] = None;
            heap.free_slots.push(slot);
            heap.handles[index] = HandleEntry::Free;
            heap.free_handles.push(index as u32);
            freed += 1;
        }
    }

    for object in heap.objects.iter_mut().flatten() {
        object.marked = false;
    }

    freed
}

fn push_reference(worklist: &mut Vec<Handle>, value: TaggedValue) {
    if value.is_reference() && !value.is_null() {
        if let Ok(handle) = Handle::from_payload(value.payload()) {
            worklist.push(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HeapObject;
    use core_types::TypeTag;

    fn ref_array(heap: &mut Heap, len: usize) -> Handle {
        heap.allocate(HeapObject::new_array(TypeTag::Reference, len))
            .unwrap()
    }

    #[test]
    fn test_unreachable_objects_are_freed() {
        let mut heap = Heap::new();
        let kept = ref_array(&mut heap, 0);
        let dropped = ref_array(&mut heap, 0);

        collect(&mut heap, &[kept.to_value()]);

        assert!(heap.is_live(kept));
        assert!(!heap.is_live(dropped));
        assert_eq!(heap.live_count(), 1);
        assert_eq!(heap.last_freed(), 1);
    }

    #[test]
    fn test_linked_chain_survives_cycle_does_not() {
        let mut heap = Heap::new();

        // 8 objects linked into a chain, reachable only through the
        // root-held head; each stores a distinguishing int alongside
        // its link.
        let mut handles = Vec::new();
        let mut next = TaggedValue::null();
        for i in (0..8).rev() {
            let h = heap
                .allocate(HeapObject::new_array(TypeTag::Reference, 2))
                .unwrap();
            heap.resolve_mut(h).unwrap().set_slot(0, next).unwrap();
            // Slot 1 abuses the reference array as a value carrier; the
            // collector only traverses reference-tagged slots.
            heap.resolve_mut(h)
                .unwrap()
                .set_slot(1, TaggedValue::int(i))
                .unwrap();
            next = h.to_value();
            handles.push(h);
        }
        let head = *handles.last().unwrap();

        // A 2-node cycle reachable from nothing.
        let a = ref_array(&mut heap, 1);
        let b = ref_array(&mut heap, 1);
        heap.resolve_mut(a).unwrap().set_slot(0, b.to_value()).unwrap();
        heap.resolve_mut(b).unwrap().set_slot(0, a.to_value()).unwrap();

        assert_eq!(heap.live_count(), 10);
        collect(&mut heap, &[head.to_value()]);

        // Exactly the cycle is gone.
        assert_eq!(heap.last_freed(), 2);
        assert!(!heap.is_live(a));
        assert!(!heap.is_live(b));
        for (position, h) in handles.iter().rev().enumerate() {
            assert!(heap.is_live(*h));
            let value = heap.resolve(*h).unwrap().get_slot(1).unwrap();
            assert_eq!(value, TaggedValue::int(position as i32));
        }
    }

    #[test]
    fn test_static_roots_always_survive() {
        let mut heap = Heap::new();
        let statics = heap
            .allocate(HeapObject::new_statics(&[TypeTag::Reference]))
            .unwrap();
        heap.register_static_root(statics);

        let held = ref_array(&mut heap, 0);
        heap.resolve_mut(statics)
            .unwrap()
            .set_slot(0, held.to_value())
            .unwrap();

        collect(&mut heap, &[]);

        assert!(heap.is_live(statics));
        assert!(heap.is_live(held));
        assert_eq!(heap.live_count(), 2);
    }

    #[test]
    fn test_freed_handle_is_recorded_before_reuse() {
        let mut heap = Heap::new();
        let dead = ref_array(&mut heap, 0);
        collect(&mut heap, &[]);
        assert!(!heap.is_live(dead));
        assert!(heap.resolve(dead).is_err());

        // The freed handle may be reused, but only through the free
        // list — and the old handle resolved as invalid in between.
        let reborn = ref_array(&mut heap, 0);
        assert_eq!(reborn.payload(), dead.payload());
        assert!(heap.is_live(reborn));
    }

    #[test]
    fn test_collect_twice_is_stable() {
        let mut heap = Heap::new();
        let kept = ref_array(&mut heap, 0);
        let _garbage = ref_array(&mut heap, 0);

        collect(&mut heap, &[kept.to_value()]);
        let live_after_first = heap.live_count();
        collect(&mut heap, &[kept.to_value()]);

        assert_eq!(heap.live_count(), live_after_first);
        assert_eq!(heap.collection_count(), 2);
        assert!(heap.is_live(kept));
    }
}
