//! Standard native stubs: console output and identity hash.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use core_types::{TaggedValue, TypeTag, VmError, VmErrorKind};

use crate::registry::NativeRegistry;

/// Shared output sink for the console stubs. Injectable so tests can
/// capture what a program printed.
pub type ConsoleWriter = Rc<RefCell<dyn Write>>;

/// A writer over stdout.
pub fn stdout_writer() -> ConsoleWriter {
    Rc::new(RefCell::new(std::io::stdout()))
}

/// Install the standard stubs into a registry:
///
/// - `runtime.Console.print(I)V` — write an int
/// - `runtime.Console.println(I)V` — write an int and a newline
/// - `runtime.System.identityHash(Lruntime/Object;)I` — a hash stable
///   for the object's lifetime (the handle payload; 0 for null)
pub fn install(registry: &mut NativeRegistry, writer: ConsoleWriter) {
    let sink = writer.clone();
    registry.register(
        "runtime.Console",
        "print",
        "(I)V",
        Box::new(move |_heap, args| {
            let value = args[0].expect(TypeTag::Int)?;
            write!(sink.borrow_mut(), "{}", value).map_err(io_error)?;
            Ok(None)
        }),
    );

    let sink = writer.clone();
    registry.register(
        "runtime.Console",
        "println",
        "(I)V",
        Box::new(move |_heap, args| {
            let value = args[0].expect(TypeTag::Int)?;
            writeln!(sink.borrow_mut(), "{}", value).map_err(io_error)?;
            Ok(None)
        }),
    );

    registry.register(
        "runtime.System",
        "identityHash",
        "(Lruntime/Object;)I",
        Box::new(|_heap, args| {
            let reference = args[0];
            reference.expect(TypeTag::Reference)?;
            Ok(Some(TaggedValue::int(reference.payload())))
        }),
    );
}

fn io_error(e: std::io::Error) -> VmError {
    VmError::new(VmErrorKind::MissingNative, format!("console write failed: {}", e))
}
