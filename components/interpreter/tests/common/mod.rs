//! Shared fixtures: a descriptor builder and interpreter constructors.

use class_format::{access, ClassDescriptor, Constant, ConstantPool, FieldDescriptor, MethodDescriptor};
use class_loader::{ClassLoader, FixtureSource};
use interpreter::Interpreter;
use memory_manager::Heap;
use natives::NativeRegistry;

/// Builder for test class descriptors.
pub struct ClassBuilder {
    descriptor: ClassDescriptor,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            descriptor: ClassDescriptor {
                name: name.to_string(),
                super_name: None,
                fields: Vec::new(),
                methods: Vec::new(),
                constant_pool: ConstantPool::default(),
            },
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.descriptor.super_name = Some(parent.to_string());
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: 0,
        });
        self
    }

    pub fn static_field(mut self, name: &str, descriptor: &str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: access::STATIC,
        });
        self
    }

    pub fn constants(mut self, entries: Vec<Constant>) -> Self {
        self.descriptor.constant_pool = ConstantPool::new(entries);
        self
    }

    pub fn method_with_flags(
        mut self,
        name: &str,
        descriptor: &str,
        flags: u16,
        max_locals: u16,
        max_stack: u16,
        code: Vec<u8>,
    ) -> Self {
        self.descriptor.methods.push(MethodDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags,
            code,
            max_locals,
            max_stack,
        });
        self
    }

    /// An instance (virtual) method.
    pub fn method(
        self,
        name: &str,
        descriptor: &str,
        max_locals: u16,
        max_stack: u16,
        code: Vec<u8>,
    ) -> Self {
        self.method_with_flags(name, descriptor, 0, max_locals, max_stack, code)
    }

    /// A static method.
    pub fn static_method(
        self,
        name: &str,
        descriptor: &str,
        max_locals: u16,
        max_stack: u16,
        code: Vec<u8>,
    ) -> Self {
        self.method_with_flags(name, descriptor, access::STATIC, max_locals, max_stack, code)
    }

    /// A native static method (no bytecode).
    pub fn native_static(self, name: &str, descriptor: &str) -> Self {
        self.method_with_flags(
            name,
            descriptor,
            access::STATIC | access::NATIVE,
            0,
            0,
            Vec::new(),
        )
    }

    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// An interpreter over the given classes with a default heap and an
/// empty native registry.
pub fn vm_with(classes: Vec<ClassDescriptor>) -> Interpreter {
    vm_configured(classes, Heap::new(), NativeRegistry::new())
}

/// An interpreter with an explicit heap capacity.
pub fn vm_with_capacity(classes: Vec<ClassDescriptor>, capacity: usize) -> Interpreter {
    vm_configured(classes, Heap::with_capacity(capacity), NativeRegistry::new())
}

/// An interpreter with full control over heap and natives.
pub fn vm_configured(
    classes: Vec<ClassDescriptor>,
    heap: Heap,
    natives: NativeRegistry,
) -> Interpreter {
    let mut source = FixtureSource::new();
    for class in classes {
        source.add(class);
    }
    Interpreter::new(heap, ClassLoader::new(Box::new(source)), natives)
}
