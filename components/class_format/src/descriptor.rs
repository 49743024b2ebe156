//! Class, field and method descriptors.
//!
//! A descriptor is the parsed form of one class file: everything the
//! linker needs to build runtime klass metadata. Types are described
//! by classic descriptor strings (`I`, `Z`, `Ldemo/Node;`, `[I`), and
//! access flags use the conventional bit values.

use serde::{Deserialize, Serialize};

use core_types::{TypeTag, VmError, VmErrorKind, VmResult};

use crate::constant_pool::ConstantPool;

/// Access-flag bit values used in field and method `flags`.
pub mod access {
    /// Private member: excluded from virtual dispatch
    pub const PRIVATE: u16 = 0x0002;
    /// Static member
    pub const STATIC: u16 = 0x0008;
    /// Native method: delegated to the native-method registry
    pub const NATIVE: u16 = 0x0100;
}

/// Name of the instance-constructor method.
pub const CONSTRUCTOR_NAME: &str = "<init>";
/// Name of the static-initializer method.
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

/// Parsed representation of one class file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Fully-qualified class name, dot-separated (`demo.Node`)
    pub name: String,
    /// Parent class name, or `None` for a root class
    pub super_name: Option<String>,
    /// Declared fields in declaration order (instance and static)
    pub fields: Vec<FieldDescriptor>,
    /// Declared methods
    pub methods: Vec<MethodDescriptor>,
    /// Constant pool, addressed by 1-based index
    pub constant_pool: ConstantPool,
}

impl ClassDescriptor {
    /// Declared instance fields, in declaration order.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_static())
    }

    /// Declared static fields, in declaration order.
    pub fn static_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_static())
    }
}

/// One declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Type descriptor string (`I`, `Z`, `Ldemo/Node;`, `[I`, ...)
    pub descriptor: String,
    /// Access flags (see [`access`])
    pub flags: u16,
}

impl FieldDescriptor {
    /// Whether the field is static.
    pub fn is_static(&self) -> bool {
        self.flags & access::STATIC != 0
    }

    /// The type tag this field's slots carry.
    pub fn type_tag(&self) -> VmResult<TypeTag> {
        tag_for_descriptor(&self.descriptor).ok_or_else(|| {
            VmError::new(
                VmErrorKind::MalformedClass,
                format!("bad field descriptor '{}' for {}", self.descriptor, self.name),
            )
        })
    }
}

/// One declared method: metadata plus bytecode, immutable after decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name (`run`, `<init>`, `<clinit>`, ...)
    pub name: String,
    /// Signature descriptor string (`(II)I`, `()V`, ...)
    pub descriptor: String,
    /// Access flags (see [`access`])
    pub flags: u16,
    /// Bytecode (empty for native methods)
    pub code: Vec<u8>,
    /// Locals-region size fixed at compile time
    pub max_locals: u16,
    /// Operand-stack capacity fixed at compile time
    pub max_stack: u16,
}

impl MethodDescriptor {
    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.flags & access::STATIC != 0
    }

    /// Whether the method is private.
    pub fn is_private(&self) -> bool {
        self.flags & access::PRIVATE != 0
    }

    /// Whether the method is a native stub.
    pub fn is_native(&self) -> bool {
        self.flags & access::NATIVE != 0
    }

    /// Whether the method is an instance constructor.
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Whether the method is the static initializer.
    pub fn is_class_initializer(&self) -> bool {
        self.name == CLASS_INITIALIZER_NAME
    }

    /// Number of declared arguments, parsed from the signature.
    ///
    /// The receiver of an instance method is not counted; dispatch
    /// accounts for it separately.
    pub fn arg_count(&self) -> VmResult<usize> {
        arg_count_of(&self.descriptor).ok_or_else(|| {
            VmError::new(
                VmErrorKind::MalformedClass,
                format!(
                    "bad method descriptor '{}' for {}",
                    self.descriptor, self.name
                ),
            )
        })
    }
}

/// Map a type-descriptor string to the tag its values carry.
///
/// Objects (`L...;`) and arrays (`[...`) are references; the single
/// primitive letters map to their tags.
pub fn tag_for_descriptor(descriptor: &str) -> Option<TypeTag> {
    match descriptor.chars().next()? {
        'Z' => Some(TypeTag::Boolean),
        'C' => Some(TypeTag::Char),
        'F' => Some(TypeTag::Float),
        'D' => Some(TypeTag::Double),
        'B' => Some(TypeTag::Byte),
        'S' => Some(TypeTag::Short),
        'I' => Some(TypeTag::Int),
        'J' => Some(TypeTag::Long),
        'L' if descriptor.ends_with(';') => Some(TypeTag::Reference),
        '[' => Some(TypeTag::Reference),
        _ => None,
    }
}

/// Parse the argument count out of a method signature descriptor.
///
/// The interpreter uses this at virtual call sites, where the operand
/// depth of the receiver must be known before the target method is.
pub fn arg_count_of(descriptor: &str) -> Option<usize> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let params = &rest[..close];

    let mut count = 0;
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        match c {
            'Z' | 'C' | 'F' | 'D' | 'B' | 'S' | 'I' | 'J' => count += 1,
            'L' => {
                // Consume up to and including the terminating ';'
                loop {
                    match chars.next() {
                        Some(';') => break,
                        Some(_) => {}
                        None => return None,
                    }
                }
                count += 1;
            }
            '[' => {
                // Array dimensions prefix the element type; the
                // element consumes the slot, so nothing counts here.
            }
            _ => return None,
        }
    }
    Some(count)
}
