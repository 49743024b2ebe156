//! Fatal conditions surface with distinct kinds through the whole
//! stack, including method and bytecode offset where available.

use class_format::opcode::*;
use core_types::VmErrorKind;
use integration_tests::{write_class, ClassBuilder};
use vm_cli::{CliError, Runtime};

fn vm_error(result: Result<core_types::TaggedValue, CliError>) -> core_types::VmError {
    match result.unwrap_err() {
        CliError::Vm(e) => e,
        other => panic!("expected a vm error, got {:?}", other),
    }
}

#[test]
fn test_missing_class_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let err = vm_error(runtime.run_entry("demo.Absent.run"));
    assert_eq!(err.kind, VmErrorKind::ClassNotFound);
}

#[test]
fn test_malformed_class_file() {
    let dir = tempfile::tempdir().unwrap();
    let class_dir = dir.path().join("demo");
    std::fs::create_dir_all(&class_dir).unwrap();
    std::fs::write(class_dir.join("Broken.json"), "{ \"name\": 5 }").unwrap();

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let err = vm_error(runtime.run_entry("demo.Broken.run"));
    assert_eq!(err.kind, VmErrorKind::MalformedClass);
}

#[test]
fn test_divide_by_zero_with_location() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Div")
            .static_method(
                "run",
                "()I",
                0,
                2,
                vec![ICONST_5, ICONST_0, IDIV, IRETURN],
            )
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let err = vm_error(runtime.run_entry("demo.Div.run"));
    assert_eq!(err.kind, VmErrorKind::DivisionByZero);
    let location = err.location.expect("bytecode location");
    assert_eq!(location.method, "demo.Div.run");
    assert_eq!(location.offset, 2);
}

#[test]
fn test_null_dereference_in_callee_reports_inner_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Deep")
            .field("x", "I")
            .constants(vec![
                integration_tests::method_ref("demo.Deep", "inner", "()I"),
                integration_tests::field_ref("demo.Deep", "x", "I"),
            ])
            .static_method("run", "()I", 0, 1, vec![INVOKESTATIC, 0, 1, IRETURN])
            .static_method(
                "inner",
                "()I",
                0,
                1,
                vec![ACONST_NULL, GETFIELD, 0, 2, IRETURN],
            )
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let err = vm_error(runtime.run_entry("demo.Deep.run"));
    assert_eq!(err.kind, VmErrorKind::NullReference);
    // The location names the frame that failed, not the entry frame.
    let location = err.location.expect("bytecode location");
    assert_eq!(location.method, "demo.Deep.inner");
    assert_eq!(location.offset, 1);
}

#[test]
fn test_unknown_and_unsupported_opcodes() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.BadOp")
            .static_method("run", "()I", 0, 1, vec![253])
            .static_method("monitor", "()I", 0, 1, vec![ACONST_NULL, 194])
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], None);
    let err = vm_error(runtime.run_entry("demo.BadOp.run"));
    assert_eq!(err.kind, VmErrorKind::UnknownOpcode);

    let err = vm_error(runtime.run_entry("demo.BadOp.monitor"));
    assert_eq!(err.kind, VmErrorKind::UnsupportedOpcode);
}

#[test]
fn test_out_of_memory_after_collection() {
    let dir = tempfile::tempdir().unwrap();
    write_class(
        dir.path(),
        &ClassBuilder::new("demo.Hog")
            .static_method(
                "run",
                "()I",
                4,
                1,
                vec![
                    ICONST_1, NEWARRAY, 10, ASTORE_0, ICONST_1, NEWARRAY, 10, ASTORE_1, ICONST_1,
                    NEWARRAY, 10, ASTORE_2, ICONST_1, NEWARRAY, 10, ASTORE_3, ICONST_0, IRETURN,
                ],
            )
            .build(),
    );

    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()], Some(4));
    let err = vm_error(runtime.run_entry("demo.Hog.run"));
    assert_eq!(err.kind, VmErrorKind::OutOfMemory);
}
