//! Reachability under collection pressure, exercised from bytecode.
//!
//! A program builds a linked chain held through a local, an
//! unreachable two-node cycle, and enough garbage to force several
//! collections against a small heap. The chain must survive with its
//! field values intact; the cycle and garbage must be reclaimed.

use class_format::opcode::*;
use core_types::TaggedValue;
use integration_tests::{class_ref, field_ref, write_class, ClassBuilder};
use vm_cli::Runtime;

#[test]
fn test_chain_survives_collections_cycle_reclaimed() {
    // head = null; for (i = 0; i < 8; i++) { n = new Node;
    // n.value = i; n.next = head; head = n; }
    // a = new Node; b = new Node; a.next = b; b.next = a; a = b = null;
    // for (i = 0; i < 30; i++) new Node;         // garbage
    // sum = 0; for (cur = head; cur != null; cur = cur.next)
    //     sum += cur.value;
    // return sum;                                 // 0 + 1 + ... + 7
    //
    // Layout (pool: 1 = Class Node, 2 = Node.value, 3 = Node.next):
    //
    //    0: aconst_null         30: new Node           70: iconst_0
    //    1: astore_0            33: astore_2           71: istore_1
    //    2: iconst_0            34: new Node           72: aload_0
    //    3: istore_1            37: astore_3           73: astore_2
    //    4: iload_1             38: aload_2            74: aload_2
    //    5: bipush 8            39: aload_3            75: ifnull +18 (-> 93)
    //    7: if_icmpge +23       40: putfield next      78: iload_1
    //       (-> 30)             43: aload_3            79: aload_2
    //   10: new Node            44: aload_2            80: getfield value
    //   13: dup                 45: putfield next      83: iadd
    //   14: iload_1             48: aconst_null        84: istore_1
    //   15: putfield value      49: astore_2           85: aload_2
    //   18: dup                 50: aconst_null        86: getfield next
    //   19: aload_0             51: astore_3           89: astore_2
    //   20: putfield next       52: iconst_0           90: goto -16 (-> 74)
    //   23: astore_0            53: istore_1           93: iload_1
    //   24: iinc 1 1            54: iload_1            94: ireturn
    //   27: goto -23 (-> 4)     55: bipush 30
    //                           57: if_icmpge +13 (-> 70)
    //                           60: new Node
    //                           63: pop
    //                           64: iinc 1 1
    //                           67: goto -13 (-> 54)
    let code = vec![
        ACONST_NULL, ASTORE_0, ICONST_0, ISTORE_1, // head = null, i = 0
        ILOAD_1, BIPUSH, 8, IF_ICMPGE, 0, 23, // while i < 8
        NEW, 0, 1, DUP, ILOAD_1, PUTFIELD, 0, 2, // n = new Node; n.value = i
        DUP, ALOAD_0, PUTFIELD, 0, 3, // n.next = head
        ASTORE_0, IINC, 1, 1, GOTO, 0xFF, 0xE9, // head = n; i++
        NEW, 0, 1, ASTORE_2, NEW, 0, 1, ASTORE_3, // a, b
        ALOAD_2, ALOAD_3, PUTFIELD, 0, 3, // a.next = b
        ALOAD_3, ALOAD_2, PUTFIELD, 0, 3, // b.next = a
        ACONST_NULL, ASTORE_2, ACONST_NULL, ASTORE_3, // drop the cycle
        ICONST_0, ISTORE_1, // i = 0
        ILOAD_1, BIPUSH, 30, IF_ICMPGE, 0, 13, // while i < 30
        NEW, 0, 1, POP, IINC, 1, 1, GOTO, 0xFF, 0xF3, // garbage
        ICONST_0, ISTORE_1, ALOAD_0, ASTORE_2, // sum = 0; cur = head
        ALOAD_2, IFNULL, 0, 18, // while cur != null
        ILOAD_1, ALOAD_2, GETFIELD, 0, 2, IADD, ISTORE_1, // sum += cur.value
        ALOAD_2, GETFIELD, 0, 3, ASTORE_2, // cur = cur.next
        GOTO, 0xFF, 0xF0, // loop
        ILOAD_1, IRETURN,
    ];

    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("Node")
            .field("value", "I")
            .field("next", "LNode;")
            .build(),
    );
    write_class(
        dir.path(),
        &ClassBuilder::new("Main")
            .constants(vec![
                class_ref("Node"),
                field_ref("Node", "value", "I"),
                field_ref("Node", "next", "LNode;"),
            ])
            .static_method("run", "()I", 4, 3, code)
            .build(),
    );

    // 16-object capacity: 1 statics + 8 chain nodes + the cycle and
    // garbage, which the 70% threshold keeps reclaiming.
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], Some(16));
    let result = runtime.run_entry("Main.run").unwrap();

    assert_eq!(result, TaggedValue::int(28));
    let stats = runtime.gc_stats();
    assert!(stats.collections >= 1, "expected collection pressure");
    // Whatever is left fits the chain, the statics object and at most
    // the garbage allocated since the last collection.
    assert!(stats.live >= 9 && stats.live <= 16, "live = {}", stats.live);
}
