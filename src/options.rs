//! Option string parsing and the four-scope resolution model.
//!
//! The schema is fixed: `ro` (boolean), `init` (enum), `type` (enum), with
//! `rw` as a value-less alias for `ro=0`. Options are stored per-scope as
//! canonical name/value pairs; resolution walks an option-specific
//! precedence order and returns the last scope that has the key.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPolicy {
    Never,
    Skip,
    Missing,
    Always,
}

impl fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitPolicy::Never => "never",
            InitPolicy::Skip => "skip",
            InitPolicy::Missing => "missing",
            InitPolicy::Always => "always",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for InitPolicy {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "never" => Ok(InitPolicy::Never),
            "skip" => Ok(InitPolicy::Skip),
            "missing" => Ok(InitPolicy::Missing),
            "always" => Ok(InitPolicy::Always),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    Dir,
    File,
    Either,
}

impl PathType {
    pub fn as_char(&self) -> char {
        match self {
            PathType::Dir => 'd',
            PathType::File => 'f',
            PathType::Either => 'e',
        }
    }

    /// `e` matches anything; otherwise the two chars must be identical.
    pub fn matches(&self, actual: char) -> bool {
        match self {
            PathType::Either => true,
            PathType::Dir => actual == 'd',
            PathType::File => actual == 'f',
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl std::str::FromStr for PathType {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "d" => Ok(PathType::Dir),
            "f" => Ok(PathType::File),
            "e" => Ok(PathType::Either),
            _ => Err(()),
        }
    }
}

/// A single resolved value. Stored uniformly so a scope can hold any mix
/// of the three schema options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Ro(bool),
    Init(InitPolicy),
    Type(PathType),
}

pub const OPT_RO: &str = "ro";
pub const OPT_INIT: &str = "init";
pub const OPT_TYPE: &str = "type";

/// One scope's worth of explicitly-set options. Unset keys are simply
/// absent from the map.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    values: HashMap<&'static str, Value>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ro(&self) -> Option<bool> {
        match self.values.get(OPT_RO) {
            Some(Value::Ro(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn init(&self) -> Option<InitPolicy> {
        match self.values.get(OPT_INIT) {
            Some(Value::Init(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn path_type(&self) -> Option<PathType> {
        match self.values.get(OPT_TYPE) {
            Some(Value::Type(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn set_ro(&mut self, b: bool) {
        self.values.insert(OPT_RO, Value::Ro(b));
    }

    pub fn set_init(&mut self, p: InitPolicy) {
        self.values.insert(OPT_INIT, Value::Init(p));
    }

    pub fn set_type(&mut self, t: PathType) {
        self.values.insert(OPT_TYPE, Value::Type(t));
    }

    /// Parses a comma-separated `name[=value]` option string at the given
    /// source line (used only for error context).
    pub fn parse(optstr: &str, line: usize) -> Result<Self> {
        let mut set = OptionSet::new();
        let optstr = optstr.trim();
        if optstr.is_empty() {
            return Ok(set);
        }
        for item in optstr.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let mut parts = item.splitn(2, '=');
            let name = parts.next().unwrap_or("");
            let value = parts.next();
            match (name, value) {
                ("rw", None) => set.set_ro(false),
                ("rw", Some(_)) => {
                    return Err(Error::InvalidOptionValue {
                        line,
                        name: "rw".to_string(),
                        value: value.unwrap_or_default().to_string(),
                    })
                }
                ("ro", None) => set.set_ro(true),
                ("ro", Some(v)) => {
                    let b = parse_bool(v).ok_or_else(|| Error::InvalidOptionValue {
                        line,
                        name: "ro".to_string(),
                        value: v.to_string(),
                    })?;
                    set.set_ro(b);
                }
                ("init", Some(v)) => {
                    let p: InitPolicy = v.parse().map_err(|_| Error::InvalidOptionValue {
                        line,
                        name: "init".to_string(),
                        value: v.to_string(),
                    })?;
                    set.set_init(p);
                }
                ("init", None) => {
                    return Err(Error::InvalidOptionValue {
                        line,
                        name: "init".to_string(),
                        value: String::new(),
                    })
                }
                ("type", Some(v)) => {
                    let t: PathType = v.parse().map_err(|_| Error::InvalidOptionValue {
                        line,
                        name: "type".to_string(),
                        value: v.to_string(),
                    })?;
                    set.set_type(t);
                }
                ("type", None) => {
                    return Err(Error::InvalidOptionValue {
                        line,
                        name: "type".to_string(),
                        value: String::new(),
                    })
                }
                (other, _) => {
                    return Err(Error::UnknownOption {
                        line,
                        name: other.to_string(),
                    })
                }
            }
        }
        Ok(set)
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// The four scopes, ordered `defaults, global, tree, path`. `ro` resolves
/// in the order `defaults, path, tree, global`; every other option
/// resolves `defaults, global, tree, path`. Both orders are expressed here
/// as index permutations over the same four slots so there is exactly one
/// place that encodes the precedence difference.
pub struct Scopes<'a> {
    pub defaults: &'a OptionSet,
    pub global: &'a OptionSet,
    pub tree: &'a OptionSet,
    pub path: &'a OptionSet,
}

pub fn default_option_set() -> OptionSet {
    let mut set = OptionSet::new();
    set.set_ro(false);
    set.set_init(InitPolicy::Never);
    set.set_type(PathType::Either);
    set
}

impl<'a> Scopes<'a> {
    fn order(&self, name: &str) -> [&'a OptionSet; 4] {
        if name == OPT_RO {
            [self.defaults, self.path, self.tree, self.global]
        } else {
            [self.defaults, self.global, self.tree, self.path]
        }
    }

    pub fn resolve_ro(&self) -> bool {
        self.order(OPT_RO)
            .iter()
            .rev()
            .find_map(|s| s.ro())
            .unwrap_or(false)
    }

    pub fn resolve_init(&self) -> InitPolicy {
        self.order(OPT_INIT)
            .iter()
            .rev()
            .find_map(|s| s.init())
            .unwrap_or(InitPolicy::Never)
    }

    pub fn resolve_type(&self) -> PathType {
        self.order(OPT_TYPE)
            .iter()
            .rev()
            .find_map(|s| s.path_type())
            .unwrap_or(PathType::Either)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let set = OptionSet::parse("ro,init=missing", 1).unwrap();
        assert_eq!(set.ro(), Some(true));
        assert_eq!(set.init(), Some(InitPolicy::Missing));
    }

    #[test]
    fn test_rw_alias_expands_to_ro_false() {
        let set = OptionSet::parse("rw", 1).unwrap();
        assert_eq!(set.ro(), Some(false));
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(OptionSet::parse("bogus", 1).is_err());
    }

    #[test]
    fn test_invalid_value_rejected() {
        assert!(OptionSet::parse("type=z", 1).is_err());
        assert!(OptionSet::parse("ro=2", 1).is_err());
    }

    #[test]
    fn test_ro_precedence_global_overrides_path_rw() {
        let defaults = default_option_set();
        let mut global = OptionSet::new();
        global.set_ro(true);
        let tree = OptionSet::new();
        let mut path = OptionSet::new();
        path.set_ro(false);

        let scopes = Scopes {
            defaults: &defaults,
            global: &global,
            tree: &tree,
            path: &path,
        };
        assert!(scopes.resolve_ro());
    }

    #[test]
    fn test_non_ro_precedence_path_wins_over_tree_over_global() {
        let defaults = default_option_set();
        let mut global = OptionSet::new();
        global.set_init(InitPolicy::Missing);
        let mut tree = OptionSet::new();
        tree.set_init(InitPolicy::Always);
        let mut path = OptionSet::new();
        path.set_init(InitPolicy::Skip);

        let scopes = Scopes {
            defaults: &defaults,
            global: &global,
            tree: &tree,
            path: &path,
        };
        assert_eq!(scopes.resolve_init(), InitPolicy::Skip);

        let scopes_no_path = Scopes {
            defaults: &defaults,
            global: &global,
            tree: &tree,
            path: &OptionSet::new(),
        };
        assert_eq!(scopes_no_path.resolve_init(), InitPolicy::Always);
    }
}
