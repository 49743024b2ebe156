//! Full-pipeline tests: JSON class files on a classpath directory,
//! loaded and executed through the CLI runtime.

use class_format::opcode::*;
use core_types::TaggedValue;
use integration_tests::{class_ref, field_ref, method_ref, write_class, ClassBuilder};
use vm_cli::Runtime;

#[test]
fn test_arithmetic_entry_through_classpath() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Math")
            .constants(vec![method_ref("demo.Math", "square", "(I)I")])
            .static_method(
                "run",
                "()I",
                0,
                1,
                vec![BIPUSH, 12, INVOKESTATIC, 0, 1, IRETURN],
            )
            .static_method("square", "(I)I", 1, 2, vec![ILOAD_0, ILOAD_0, IMUL, IRETURN])
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    assert_eq!(
        runtime.run_entry("demo.Math.run").unwrap(),
        TaggedValue::int(144)
    );
}

#[test]
fn test_inheritance_across_class_files() {
    // Base and Derived live in separate JSON files; Derived overrides
    // f() and the virtual call through a Base-typed site lands on it.
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Base")
            .method("<init>", "()V", 1, 0, vec![RETURN])
            .method("f", "()I", 1, 1, vec![ICONST_1, IRETURN])
            .build(),
    );
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Derived")
            .extends("demo.Base")
            .method("f", "()I", 1, 1, vec![ICONST_2, IRETURN])
            .build(),
    );
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Main")
            .constants(vec![
                class_ref("demo.Derived"),
                method_ref("demo.Derived", "<init>", "()V"),
                method_ref("demo.Base", "f", "()I"),
            ])
            .static_method(
                "run",
                "()I",
                0,
                2,
                vec![
                    NEW, 0, 1, DUP, INVOKESPECIAL, 0, 2, INVOKEVIRTUAL, 0, 3, IRETURN,
                ],
            )
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    assert_eq!(
        runtime.run_entry("demo.Main.run").unwrap(),
        TaggedValue::int(2)
    );
}

#[test]
fn test_static_initializer_chain_through_classpath() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Config")
            .static_field("limit", "I")
            .constants(vec![field_ref("demo.Config", "limit", "I")])
            .static_method(
                "<clinit>",
                "()V",
                0,
                1,
                vec![BIPUSH, 64, PUTSTATIC, 0, 1, RETURN],
            )
            .build(),
    );
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.App")
            .extends("demo.Config")
            .constants(vec![field_ref("demo.App", "limit", "I")])
            .static_method("run", "()I", 0, 1, vec![GETSTATIC, 0, 1, IRETURN])
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    // App's static view reaches the parent's slot through the shared
    // storage object.
    assert_eq!(
        runtime.run_entry("demo.App.run").unwrap(),
        TaggedValue::int(64)
    );
}

#[test]
fn test_classpath_order_first_hit_wins() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    for (dir, value) in [(&first, 1u8), (&second, 2u8)] {
        write_class(
            dir.path(),
            &ClassBuilder::new("demo.Which")
                .static_method(
                    "run",
                    "()I",
                    0,
                    1,
                    vec![BIPUSH, value, IRETURN],
                )
                .build(),
        );
    }

    let mut runtime = Runtime::new(
        vec![first.path().to_path_buf(), second.path().to_path_buf()],
        None,
    );
    assert_eq!(
        runtime.run_entry("demo.Which.run").unwrap(),
        TaggedValue::int(1)
    );
}

#[test]
fn test_entry_result_raw_word_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Neg")
            .static_method("run", "()I", 0, 1, vec![BIPUSH, 0x80, IRETURN])
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let result = runtime.run_entry("demo.Neg.run").unwrap();
    // The tagged 64-bit word survives the trip out of the VM.
    assert_eq!(result.payload(), -128);
    assert_eq!(result.tag(), core_types::TypeTag::Int);
    let word = result.raw();
    assert_eq!(TaggedValue::encode(core_types::TypeTag::Int, -128).raw(), word);
}

#[test]
fn test_gc_stats_after_run() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Alloc")
            .static_method(
                "run",
                "()I",
                1,
                2,
                // 24 discarded arrays against a 16-object heap.
                //
                //  0: iconst_0       8: iconst_1
                //  1: istore_0       9: newarray int
                //  2: iload_0       11: pop
                //  3: bipush 24     12: iinc 0 1
                //  5: if_icmpge +13 15: goto -13 (-> 2)
                //     (-> 18)       18: iconst_0, 19: ireturn
                vec![
                    ICONST_0, ISTORE_0, ILOAD_0, BIPUSH, 24, IF_ICMPGE, 0, 13, ICONST_1, NEWARRAY,
                    10, POP, IINC, 0, 1, GOTO, 0xFF, 0xF3, ICONST_0, IRETURN,
                ],
            )
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], Some(16));
    assert_eq!(
        runtime.run_entry("demo.Alloc.run").unwrap(),
        TaggedValue::int(0)
    );
    let stats = runtime.gc_stats();
    assert!(stats.collections >= 1);
    assert_eq!(stats.capacity, 16);
    assert!(stats.live <= 16);
}
