//! Named source directory trees on the host filesystem.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::options::OptionSet;

#[derive(Debug, Clone)]
pub struct Tree {
    pub name: String,
    /// Absolute, symlink-resolved directory path on the host.
    pub root: PathBuf,
    pub opts: OptionSet,
}

#[derive(Debug, Default)]
pub struct TreeRegistry {
    trees: HashMap<String, Tree>,
    /// Insertion order, for error messages and diagnostics that iterate.
    order: Vec<String>,
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, root_dir: &str, optstr: &str, line: usize) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidTreeRoot {
                line,
                root: root_dir.to_string(),
                message: "tree name must not be empty".to_string(),
            });
        }
        if self.trees.contains_key(name) {
            return Err(Error::DuplicateTree {
                line,
                name: name.to_string(),
            });
        }
        let resolved = fs::canonicalize(root_dir).map_err(|e| Error::InvalidTreeRoot {
            line,
            root: root_dir.to_string(),
            message: e.to_string(),
        })?;
        if !resolved.is_dir() {
            return Err(Error::InvalidTreeRoot {
                line,
                root: root_dir.to_string(),
                message: "not a directory".to_string(),
            });
        }
        let opts = OptionSet::parse(optstr, line)?;
        self.trees.insert(
            name.to_string(),
            Tree {
                name: name.to_string(),
                root: resolved,
                opts,
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn defined(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_add_and_lookup() {
        let dir = tempdir().unwrap();
        let mut reg = TreeRegistry::new();
        reg.add("src", dir.path().to_str().unwrap(), "ro", 1).unwrap();
        assert!(reg.defined("src"));
        let tree = reg.get("src").unwrap();
        assert_eq!(tree.opts.ro(), Some(true));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dir = tempdir().unwrap();
        let mut reg = TreeRegistry::new();
        reg.add("src", dir.path().to_str().unwrap(), "", 1).unwrap();
        let err = reg.add("src", dir.path().to_str().unwrap(), "", 2).unwrap_err();
        assert!(matches!(err, Error::DuplicateTree { .. }));
    }

    #[test]
    fn test_missing_root_rejected() {
        let mut reg = TreeRegistry::new();
        let err = reg.add("src", "/no/such/path/hopefully", "", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidTreeRoot { .. }));
    }
}
