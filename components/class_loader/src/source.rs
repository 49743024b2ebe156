//! Sources of class descriptors.
//!
//! The VM consumes descriptors in parsed form; where they come from is
//! behind the [`ClassSource`] trait. The shipped sources are a
//! classpath of JSON descriptor files and an in-memory map used by
//! tests and embedders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use class_format::ClassDescriptor;
use core_types::{VmError, VmErrorKind, VmResult};

/// Provider of parsed class descriptors by class name.
pub trait ClassSource {
    /// Produce the descriptor for `name`, or fail with
    /// [`VmErrorKind::ClassNotFound`] / [`VmErrorKind::MalformedClass`].
    fn load_class(&self, name: &str) -> VmResult<ClassDescriptor>;
}

/// Classpath of directories holding JSON descriptor files.
///
/// A class `demo.Node` is looked up as `demo/Node.json` under each
/// root in order; the first hit wins.
#[derive(Debug, Clone)]
pub struct ClassPath {
    roots: Vec<PathBuf>,
}

impl ClassPath {
    /// A classpath over the given root directories.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        ClassPath { roots }
    }

    /// The relative file path for a class name.
    fn relative_path(name: &str) -> PathBuf {
        let mut path: PathBuf = name.split('.').collect();
        path.set_extension("json");
        path
    }

    fn read_descriptor(path: &Path, name: &str) -> VmResult<ClassDescriptor> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VmError::new(
                VmErrorKind::ClassNotFound,
                format!("cannot read class file {}: {}", path.display(), e),
            )
        })?;
        serde_json::from_str(&text).map_err(|e| {
            VmError::new(
                VmErrorKind::MalformedClass,
                format!("class file for {} does not parse: {}", name, e),
            )
        })
    }
}

impl ClassSource for ClassPath {
    fn load_class(&self, name: &str) -> VmResult<ClassDescriptor> {
        let relative = ClassPath::relative_path(name);
        for root in &self.roots {
            let candidate = root.join(&relative);
            if candidate.is_file() {
                return ClassPath::read_descriptor(&candidate, name);
            }
        }
        Err(VmError::new(
            VmErrorKind::ClassNotFound,
            format!("no class file for {} on the classpath", name),
        ))
    }
}

/// In-memory descriptor map, for tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    classes: HashMap<String, ClassDescriptor>,
}

impl FixtureSource {
    /// An empty source.
    pub fn new() -> Self {
        FixtureSource::default()
    }

    /// Add a descriptor under its own name.
    pub fn add(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        self.classes.insert(descriptor.name.clone(), descriptor);
        self
    }
}

impl ClassSource for FixtureSource {
    fn load_class(&self, name: &str) -> VmResult<ClassDescriptor> {
        self.classes.get(name).cloned().ok_or_else(|| {
            VmError::new(
                VmErrorKind::ClassNotFound,
                format!("no class file for {}", name),
            )
        })
    }
}
