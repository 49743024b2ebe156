//! Constant pool with 1-based indexing.

use serde::{Deserialize, Serialize};

use core_types::{VmError, VmErrorKind, VmResult};

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// 32-bit integer literal
    Integer(i32),
    /// String literal
    Str(String),
    /// Reference to a class by name
    Class {
        /// Referenced class name (or array descriptor such as `[[I`)
        name: String,
    },
    /// Reference to a field of a class
    FieldRef {
        /// Owning class name
        class: String,
        /// Field name
        name: String,
        /// Field type descriptor
        descriptor: String,
    },
    /// Reference to a method of a class
    MethodRef {
        /// Owning class name
        class: String,
        /// Method name
        name: String,
        /// Method signature descriptor
        descriptor: String,
    },
}

impl Constant {
    /// Short entry-kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Integer(_) => "integer",
            Constant::Str(_) => "string",
            Constant::Class { .. } => "class",
            Constant::FieldRef { .. } => "field ref",
            Constant::MethodRef { .. } => "method ref",
        }
    }
}

/// A class's constant pool. Entries are addressed by 1-based index, as
/// the bytecode's pool operands are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Create a pool from entries; `entries[0]` becomes index 1.
    pub fn new(entries: Vec<Constant>) -> Self {
        ConstantPool { entries }
    }

    /// Append an entry and return its 1-based index.
    pub fn push(&mut self, constant: Constant) -> u16 {
        self.entries.push(constant);
        self.entries.len() as u16
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by 1-based index.
    pub fn get(&self, index: u16) -> VmResult<&Constant> {
        if index == 0 {
            return Err(VmError::new(
                VmErrorKind::MalformedClass,
                "constant pool index 0 is reserved",
            ));
        }
        self.entries.get(index as usize - 1).ok_or_else(|| {
            VmError::new(
                VmErrorKind::MalformedClass,
                format!("constant pool index {} out of range", index),
            )
        })
    }

    /// Look up a class reference by 1-based index.
    pub fn class_at(&self, index: u16) -> VmResult<&str> {
        match self.get(index)? {
            Constant::Class { name } => Ok(name),
            other => Err(self.wrong_kind(index, "class", other)),
        }
    }

    /// Look up a field reference by 1-based index.
    pub fn field_ref_at(&self, index: u16) -> VmResult<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef {
                class,
                name,
                descriptor,
            } => Ok((class, name, descriptor)),
            other => Err(self.wrong_kind(index, "field ref", other)),
        }
    }

    /// Look up a method reference by 1-based index.
    pub fn method_ref_at(&self, index: u16) -> VmResult<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::MethodRef {
                class,
                name,
                descriptor,
            } => Ok((class, name, descriptor)),
            other => Err(self.wrong_kind(index, "method ref", other)),
        }
    }

    fn wrong_kind(&self, index: u16, wanted: &str, found: &Constant) -> VmError {
        VmError::new(
            VmErrorKind::MalformedClass,
            format!(
                "constant pool index {} holds a {} entry, expected {}",
                index,
                found.kind_name(),
                wanted
            ),
        )
    }
}
