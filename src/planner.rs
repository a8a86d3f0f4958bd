//! For each composed path, ensures a placeholder of matching type exists
//! in the parent-in-registry's source tree so a bind mount can be issued
//! on it, without disturbing any content that is already there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::options::PathType;
use crate::pathreg::{PathEntry, PathRegistry};
use crate::pathutil;
use crate::tree::TreeRegistry;

pub const MOUNTPOINT_MARKER: &str = ".ilfs-mountpoint";
pub const MOUNTPOINT_FILE_CONTENT: &str = "#ilfs-mountpoint\n";

/// Runs the planner over every path, in registration order.
pub fn plan(paths: &PathRegistry, trees: &TreeRegistry) -> Result<()> {
    for entry in paths.iter() {
        plan_one(entry, paths, trees)?;
    }
    Ok(())
}

fn source_root_for(entry: &PathEntry, trees: &TreeRegistry) -> Result<PathBuf> {
    let tree = trees.get(&entry.tree).ok_or_else(|| {
        Error::Internal(format!("path '{}' references unregistered tree '{}'", entry.path, entry.tree))
    })?;
    Ok(tree.root.clone())
}

fn plan_one(entry: &PathEntry, paths: &PathRegistry, trees: &TreeRegistry) -> Result<()> {
    let p_src_root = source_root_for(entry, trees)?;
    let p_src = p_src_root.join(entry.path.trim_start_matches('/'));
    let t = if pathutil::exists(&p_src) {
        pathutil::ospath_type(&p_src)?
    } else {
        entry.declared_type.as_char()
    };

    let (pp_path, pp_src_root) = match paths.parent_in_registry(&entry.path) {
        Some(pp) => (pp.path.clone(), source_root_for(pp, trees)?),
        None => ("/".to_string(), p_src_root.clone()),
    };

    let target_in_parent = pp_src_root.join(
        entry
            .path
            .strip_prefix(if pp_path == "/" { "/" } else { &pp_path })
            .unwrap_or(&entry.path)
            .trim_start_matches('/'),
    );

    if pathutil::exists(&target_in_parent) {
        let actual = pathutil::ospath_type(&target_in_parent)?;
        if actual != t {
            return Err(Error::MountpointCollision {
                path: target_in_parent,
                expected: t.to_string(),
            });
        }
        debug!(
            "placeholder for '{}' already exists at '{}'",
            entry.path,
            target_in_parent.display()
        );
        return Ok(());
    }

    create_placeholder(&pp_src_root, &target_in_parent, t)
}

/// Creates every missing intermediate directory between `parent_src_root`
/// and `target`, dropping a `.ilfs-mountpoint` marker in each one created,
/// then creates the leaf itself (a directory for `t == 'd'`, a one-line
/// marker file for `t == 'f'`).
fn create_placeholder(parent_src_root: &Path, target: &Path, t: char) -> Result<()> {
    let rel = target.strip_prefix(parent_src_root).map_err(|_| {
        Error::Internal(format!(
            "'{}' is not inside parent source root '{}'",
            target.display(),
            parent_src_root.display()
        ))
    })?;

    use nix::sys::stat::{umask, Mode};
    let old_umask = umask(Mode::from_bits_truncate(0o022));
    let result = (|| -> Result<()> {
        let mut current = parent_src_root.to_path_buf();
        let components: Vec<_> = rel.components().collect();
        for (i, comp) in components.iter().enumerate() {
            current.push(comp);
            let is_leaf = i == components.len() - 1;
            if pathutil::exists(&current) {
                if !is_leaf && !current.is_dir() {
                    return Err(Error::MountpointCollision {
                        path: current.clone(),
                        expected: "d".to_string(),
                    });
                }
                continue;
            }
            if is_leaf {
                match t {
                    'd' => {
                        fs::create_dir(&current).map_err(|e| mount_io_err(&current, e))?;
                        mark_directory(&current)?;
                    }
                    'f' => {
                        let mut f = fs::File::create(&current).map_err(|e| mount_io_err(&current, e))?;
                        f.write_all(MOUNTPOINT_FILE_CONTENT.as_bytes())
                            .map_err(|e| mount_io_err(&current, e))?;
                    }
                    _ => {
                        return Err(Error::Internal(format!(
                            "unresolved wildcard type for placeholder '{}'",
                            current.display()
                        )))
                    }
                }
            } else {
                fs::create_dir(&current).map_err(|e| mount_io_err(&current, e))?;
                mark_directory(&current)?;
            }
        }
        Ok(())
    })();
    umask(old_umask);
    result
}

fn mark_directory(dir: &Path) -> Result<()> {
    let marker = dir.join(MOUNTPOINT_MARKER);
    fs::write(&marker, b"").map_err(|e| mount_io_err(&marker, e))?;
    Ok(())
}

fn mount_io_err(path: &Path, e: std::io::Error) -> Error {
    Error::Internal(format!("creating placeholder '{}': {}", path.display(), e))
}
