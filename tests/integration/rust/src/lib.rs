//! Shared helpers for the workspace integration tests: a descriptor
//! builder and classpath-directory utilities.

use std::path::Path;

use class_format::{
    access, ClassDescriptor, Constant, ConstantPool, FieldDescriptor, MethodDescriptor,
};

/// Builder for test class descriptors.
pub struct ClassBuilder {
    descriptor: ClassDescriptor,
}

impl ClassBuilder {
    /// A class with the given name and no parent.
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

    /// Set the parent class.
    pub fn extends(mut self, parent: &str) -> Self {
        self.descriptor.super_name = Some(parent.to_string());
        self
    }

    /// Add an instance field.
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: 0,
        });
        self
    }

    /// Add a static field.
    pub fn static_field(mut self, name: &str, descriptor: &str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: access::STATIC,
        });
        self
    }

    /// Set the constant pool (entries get 1-based indices in order).
    pub fn constants(mut self, entries: Vec<Constant>) -> Self {
        self.descriptor.constant_pool = ConstantPool::new(entries);
        self
    }

    /// Add an instance method.
    pub fn method(
        mut self,
        name: &str,
        descriptor: &str,
        max_locals: u16,
        max_stack: u16,
        code: Vec<u8>,
    ) -> Self {
        self.descriptor.methods.push(MethodDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: 0,
            code,
            max_locals,
            max_stack,
        });
        self
    }

    /// Add a static method.
    pub fn static_method(
        mut self,
        name: &str,
        descriptor: &str,
        max_locals: u16,
        max_stack: u16,
        code: Vec<u8>,
    ) -> Self {
        self.descriptor.methods.push(MethodDescriptor {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: access::STATIC,
            code,
            max_locals,
            max_stack,
        });
        self
    }

    /// Finish building.
    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// Serialize a descriptor as JSON under a classpath root, using the
/// class's dotted name as the directory path.
pub fn write_class(root: &Path, descriptor: &ClassDescriptor) {
    let mut path = root.to_path_buf();
    let mut segments: Vec<&str> = descriptor.name.split('.').collect();
    let file = format!("{}.json", segments.pop().unwrap());
    for segment in segments {
        path.push(segment);
    }
    std::fs::create_dir_all(&path).unwrap();
    path.push(file);
    std::fs::write(&path, serde_json::to_string_pretty(descriptor).unwrap()).unwrap();
}

/// Shorthand for a method-ref pool entry.
pub fn method_ref(class: &str, name: &str, descriptor: &str) -> Constant {
    Constant::MethodRef {
        class: class.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    }
}

/// Shorthand for a field-ref pool entry.
pub fn field_ref(class: &str, name: &str, descriptor: &str) -> Constant {
    Constant::FieldRef {
        class: class.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    }
}

/// Shorthand for a class-ref pool entry.
pub fn class_ref(name: &str) -> Constant {
    Constant::Class {
        name: name.to_string(),
    }
}
