//! Runs each path's initializer (`initcmd`) when its source is missing
//! from its tree, or when `init=always` forces a re-run. The actual
//! `initcmd` execution spawns an opaque shell snippet (`sh -c`) under a
//! well-defined environment; [`actions`] additionally exposes the
//! canonical built-in action library as ordinary Rust functions so both
//! tests and shell snippets that happen to invoke equivalent logic have a
//! single source of truth for their contract.

pub mod actions;

use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::options::InitPolicy;
use crate::pathreg::{PathEntry, PathRegistry};
use crate::pathutil;
use crate::tree::{Tree, TreeRegistry};

/// The execution context an initializer (or a direct `actions` call) runs
/// under, mirroring the `ILFS_*` environment documented in the external
/// interfaces.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub op: &'static str,
    pub tree_name: String,
    pub tree_root: PathBuf,
    /// Absolute composed path, e.g. `/app/data`.
    pub path: String,
    /// `path` without its leading `/`; `.` when initializing the root.
    pub relpath: String,
    /// Longest leading prefix of `relpath` that already exists as a
    /// directory in the source tree.
    pub existing_relpath: String,
    /// The remainder after `existing_relpath`: what the initcmd is
    /// responsible for creating.
    pub init_subpath: String,
    pub ro: bool,
    pub init: InitPolicy,
    pub r#type: char,
}

impl InitContext {
    fn build(op: &'static str, tree: &Tree, entry: &PathEntry, resolved_type: char, resolved_ro: bool) -> Self {
        let relpath = if entry.path == "/" {
            ".".to_string()
        } else {
            entry.path.trim_start_matches('/').to_string()
        };
        let (existing_relpath, init_subpath) = split_existing_prefix(&tree.root, &relpath);
        InitContext {
            op,
            tree_name: tree.name.clone(),
            tree_root: tree.root.clone(),
            path: entry.path.clone(),
            relpath,
            existing_relpath,
            init_subpath,
            ro: resolved_ro,
            init: resolved_type_to_init(entry),
            r#type: resolved_type,
        }
    }

    /// The absolute source-tree path this context's initcmd should
    /// ultimately populate (`tree_root + path`).
    pub fn target_path(&self) -> PathBuf {
        if self.relpath == "." {
            self.tree_root.clone()
        } else {
            self.tree_root.join(&self.relpath)
        }
    }

    fn envs(&self) -> Vec<(String, String)> {
        vec![
            ("ILFS_OP".to_string(), self.op.to_string()),
            ("ILFS_TREE".to_string(), self.tree_name.clone()),
            ("ILFS_TREE_ROOT".to_string(), self.tree_root.display().to_string()),
            ("ILFS_PATH".to_string(), self.path.clone()),
            ("ILFS_RELPATH".to_string(), self.relpath.clone()),
            ("ILFS_EXISTING_RELPATH".to_string(), self.existing_relpath.clone()),
            ("ILFS_INIT_SUBPATH".to_string(), self.init_subpath.clone()),
            (
                "ILFS_PATH_OPTS_RO".to_string(),
                if self.ro { "1" } else { "0" }.to_string(),
            ),
            ("ILFS_PATH_OPTS_INIT".to_string(), self.init.to_string()),
            ("ILFS_PATH_OPTS_TYPE".to_string(), self.r#type.to_string()),
        ]
    }
}

fn resolved_type_to_init(entry: &PathEntry) -> InitPolicy {
    entry.opts.init().unwrap_or(InitPolicy::Never)
}

/// Finds the longest leading prefix of `relpath` (component-wise) that is
/// an existing directory under `tree_root`, and returns `(existing,
/// remainder)`.
fn split_existing_prefix(tree_root: &Path, relpath: &str) -> (String, String) {
    if relpath == "." {
        return (".".to_string(), String::new());
    }
    let components: Vec<&str> = relpath.split('/').collect();
    let mut existing_len = 0usize;
    let mut current = tree_root.to_path_buf();
    for comp in &components {
        current.push(comp);
        if current.is_dir() {
            existing_len += 1;
        } else {
            break;
        }
    }
    if existing_len == 0 {
        (".".to_string(), relpath.to_string())
    } else if existing_len == components.len() {
        (relpath.to_string(), String::new())
    } else {
        (
            components[..existing_len].join("/"),
            components[existing_len..].join("/"),
        )
    }
}

/// Runs the Initializer Runner over every path, in registration order.
pub async fn run(paths: &PathRegistry, trees: &TreeRegistry) -> Result<()> {
    for entry in paths.iter() {
        run_one(entry, trees).await?;
    }
    Ok(())
}

async fn run_one(entry: &PathEntry, trees: &TreeRegistry) -> Result<()> {
    let tree = trees.get(&entry.tree).ok_or_else(|| {
        Error::Internal(format!("path '{}' references unregistered tree '{}'", entry.path, entry.tree))
    })?;
    let source_path = tree.root.join(entry.path.trim_start_matches('/'));
    let exists = pathutil::exists(&source_path);
    let init = entry.opts.init().unwrap_or(InitPolicy::Never);
    let always = matches!(init, InitPolicy::Always);

    if !always && exists {
        return Ok(());
    }

    if matches!(init, InitPolicy::Never | InitPolicy::Skip) {
        return Err(Error::InitRequiredMissing {
            path: entry.path.clone(),
        });
    }

    if entry.init_cmd.trim().is_empty() {
        return Err(Error::InitBlankCommand {
            path: entry.path.clone(),
        });
    }

    let ro = entry.opts.ro().unwrap_or(false);
    let ctx = InitContext::build("init", tree, entry, entry.declared_type.as_char(), ro);

    info!("running initializer for '{}'", entry.path);
    debug!("initcmd: {}", entry.init_cmd);

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&entry.init_cmd);
    cmd.arg("init").arg(&ctx.relpath);
    cmd.current_dir(&tree.root);
    cmd.env_clear();
    for (k, v) in ctx.envs() {
        cmd.env(k, v);
    }
    // Operator-provided ownership conventions (per the external
    // interfaces) are forwarded from our own environment, not invented.
    for var in ["ILFS_INIT_CHOWN", "ILFS_INIT_CHGRP", "PATH", "HOME"] {
        if let Ok(v) = std::env::var(var) {
            cmd.env(var, v);
        }
    }

    let output = cmd.output().await.map_err(|e| Error::InitFailed {
        path: entry.path.clone(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::InitFailed {
            path: entry.path.clone(),
            message: format!(
                "exit status {:?}\nstdout: {}\nstderr: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    if !pathutil::exists(&source_path) {
        return Err(Error::InitResultMismatch {
            path: entry.path.clone(),
        });
    }
    let actual_type = pathutil::ospath_type(&source_path)?;
    if !entry.declared_type.matches(actual_type) {
        return Err(Error::InitResultMismatch {
            path: entry.path.clone(),
        });
    }

    Ok(())
}
