//! Ordered registry of composed paths. Insertion order is the mount
//! order; side maps carry each path's tree binding, initializer command,
//! and option overrides.

use std::collections::HashMap;

use crate::options::{OptionSet, PathType};

#[derive(Debug, Clone)]
pub struct PathEntry {
    pub path: String,
    pub tree: String,
    pub init_cmd: String,
    pub opts: OptionSet,
    pub declared_type: PathType,
    pub from_glob: bool,
}

#[derive(Debug, Default)]
pub struct PathRegistry {
    entries: Vec<PathEntry>,
    index: HashMap<String, usize>,
}

fn normalize_dir(p: &str) -> String {
    if p == "/" {
        "/".to_string()
    } else {
        format!("{}/", p.trim_end_matches('/'))
    }
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any stored path equals `p` or is a descendant of `p`.
    pub fn has_subpath(&self, p: &str) -> bool {
        let prefix = normalize_dir(p);
        self.entries.iter().any(|e| {
            e.path == p || (e.path != "/" && normalize_dir(&e.path).starts_with(&prefix))
        })
    }

    /// Returns true if registering `candidate` would be shadowed by (equal
    /// to, or a descendant of) an already-registered path. A stored `/` is
    /// exempt from this check beyond an exact duplicate: every path is a
    /// descendant of the root, so treating it like any other entry would
    /// make a registered `/` shadow everything registered after it, which
    /// would make the mandatory root-plus-children composition impossible
    /// to load.
    pub fn is_shadowed(&self, candidate: &str) -> Option<&str> {
        let candidate_dir = normalize_dir(candidate);
        self.entries
            .iter()
            .find(|e| {
                if candidate == e.path {
                    return true;
                }
                if e.path == "/" {
                    return false;
                }
                let existing_dir = normalize_dir(&e.path);
                candidate_dir.starts_with(&existing_dir)
            })
            .map(|e| e.path.as_str())
    }

    /// The nearest registered ancestor of `p` (not `p` itself), or `None`
    /// if no ancestor (including `/`) is registered.
    pub fn parent_in_registry(&self, p: &str) -> Option<&PathEntry> {
        let mut best: Option<&PathEntry> = None;
        for e in &self.entries {
            if e.path == p {
                continue;
            }
            let existing_dir = normalize_dir(&e.path);
            if normalize_dir(p).starts_with(&existing_dir) {
                if best.map(|b| b.path.len() < e.path.len()).unwrap_or(true) {
                    best = Some(e);
                }
            }
        }
        best
    }

    pub fn defined(&self, p: &str) -> bool {
        self.index.contains_key(p)
    }

    pub fn get(&self, p: &str) -> Option<&PathEntry> {
        self.index.get(p).map(|&i| &self.entries[i])
    }

    pub fn push(&mut self, entry: PathEntry) {
        self.index.insert(entry.path.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSet;

    fn entry(path: &str) -> PathEntry {
        PathEntry {
            path: path.to_string(),
            tree: "t".to_string(),
            init_cmd: String::new(),
            opts: OptionSet::new(),
            declared_type: PathType::Either,
            from_glob: false,
        }
    }

    #[test]
    fn test_shadow_detection() {
        let mut reg = PathRegistry::new();
        reg.push(entry("/a"));
        assert!(reg.is_shadowed("/a/b").is_some());
        assert!(reg.is_shadowed("/a").is_some());
        assert!(reg.is_shadowed("/ab").is_none());
    }

    #[test]
    fn test_root_does_not_shadow_children() {
        let mut reg = PathRegistry::new();
        reg.push(entry("/"));
        assert!(reg.is_shadowed("/app/data1").is_none());
        reg.push(entry("/app/data1"));
        assert!(reg.is_shadowed("/").is_some());
    }

    #[test]
    fn test_parent_in_registry() {
        let mut reg = PathRegistry::new();
        reg.push(entry("/"));
        reg.push(entry("/app"));
        let parent = reg.parent_in_registry("/app/data").unwrap();
        assert_eq!(parent.path, "/app");
        let parent_root = reg.parent_in_registry("/other").unwrap();
        assert_eq!(parent_root.path, "/");
    }
}
