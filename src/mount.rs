//! Orders the mounts, issues bind mounts with per-path read/write policy,
//! and performs recursive lazy unmount. Mount/unmount are abstracted
//! behind [`MountBackend`] so tests can substitute an in-memory recorder
//! instead of exercising real `mount(2)`/`umount2(2)` syscalls, which
//! require root or a private mount namespace.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::options::Scopes;
use crate::pathreg::PathRegistry;
use crate::tree::TreeRegistry;

/// One bind-mount operation as the executor sees it, independent of how
/// it is actually carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: PathBuf,
    pub ro: bool,
}

pub trait MountBackend {
    fn bind_mount(&mut self, m: &BindMount) -> Result<()>;
    /// Recursive lazy unmount of everything under `target`, including
    /// `target` itself.
    fn unmount_recursive(&mut self, target: &Path) -> Result<()>;
}

/// The real backend: `mount(2)` with `MS_BIND`, then `MS_PRIVATE`, then
/// (if read-only) a `MS_REMOUNT|MS_BIND|MS_RDONLY` pass — the same three
/// steps `mount --bind --make-private -o ro` performs. Unmount walks
/// `/proc/self/mountinfo`, unmounting every mount point under `target`
/// deepest-first with `MNT_DETACH`.
pub struct SyscallBackend;

impl MountBackend for SyscallBackend {
    fn bind_mount(&mut self, m: &BindMount) -> Result<()> {
        use nix::mount::{mount, MsFlags};

        mount(
            Some(&m.source),
            &m.target,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(|e| Error::MountFailed {
            path: m.target.display().to_string(),
            message: format!("bind: {}", e),
        })?;

        mount(
            None::<&str>,
            &m.target,
            None::<&str>,
            MsFlags::MS_PRIVATE,
            None::<&str>,
        )
        .map_err(|e| Error::MountFailed {
            path: m.target.display().to_string(),
            message: format!("make-private: {}", e),
        })?;

        if m.ro {
            mount(
                None::<&str>,
                &m.target,
                None::<&str>,
                MsFlags::MS_REMOUNT | MsFlags::MS_BIND | MsFlags::MS_RDONLY,
                None::<&str>,
            )
            .map_err(|e| Error::MountFailed {
                path: m.target.display().to_string(),
                message: format!("remount ro: {}", e),
            })?;
        }

        Ok(())
    }

    fn unmount_recursive(&mut self, target: &Path) -> Result<()> {
        use nix::mount::{umount2, MntFlags};

        let mounts = mounts_under(target)?;
        for mp in mounts.into_iter().rev() {
            umount2(&mp, MntFlags::MNT_DETACH).map_err(|e| Error::MountFailed {
                path: mp.display().to_string(),
                message: format!("unmount: {}", e),
            })?;
        }
        Ok(())
    }
}

/// Reads `/proc/self/mountinfo` and returns every mount point under (or
/// equal to) `target`, ordered shallowest-first (the caller reverses this
/// to unmount deepest-first).
fn mounts_under(target: &Path) -> Result<Vec<PathBuf>> {
    let info = std::fs::read_to_string("/proc/self/mountinfo")
        .map_err(|e| Error::Internal(format!("reading /proc/self/mountinfo: {}", e)))?;
    let target_str = target.to_string_lossy().to_string();
    let prefix = if target_str.ends_with('/') {
        target_str.clone()
    } else {
        format!("{}/", target_str)
    };
    let mut found: Vec<PathBuf> = info
        .lines()
        .filter_map(|line| {
            // Field 5 (0-indexed 4) of mountinfo is the mount point.
            line.split_whitespace().nth(4)
        })
        .filter(|mp| *mp == target_str || mp.starts_with(&prefix))
        .map(PathBuf::from)
        .collect();
    found.sort_by_key(|p| p.as_os_str().len());
    Ok(found)
}

/// Issues every registered path's bind mount, in registration order, onto
/// `target`.
pub fn mount_all(
    backend: &mut dyn MountBackend,
    target: &Path,
    paths: &PathRegistry,
    trees: &TreeRegistry,
    defaults: &crate::options::OptionSet,
    global: &crate::options::OptionSet,
) -> Result<()> {
    if !paths.defined("/") {
        return Err(Error::NoRootConfigured);
    }

    for entry in paths.iter() {
        let tree = trees.get(&entry.tree).ok_or_else(|| {
            Error::Internal(format!(
                "path '{}' references unregistered tree '{}'",
                entry.path, entry.tree
            ))
        })?;
        let scopes = Scopes {
            defaults,
            global,
            tree: &tree.opts,
            path: &entry.opts,
        };
        let ro = scopes.resolve_ro();
        let source = tree.root.join(entry.path.trim_start_matches('/'));
        let dest = join_target(target, &entry.path);

        debug!(
            "mounting '{}' -> '{}' ({})",
            source.display(),
            dest.display(),
            if ro { "ro" } else { "rw" }
        );

        backend.bind_mount(&BindMount {
            source,
            target: dest,
            ro,
        })?;
    }

    info!("mounted {} path(s) at '{}'", paths.len(), target.display());
    Ok(())
}

fn join_target(target: &Path, path: &str) -> PathBuf {
    if path == "/" {
        target.to_path_buf()
    } else {
        target.join(path.trim_start_matches('/'))
    }
}

/// Unmounts everything previously mounted at `target`.
pub fn unmount(backend: &mut dyn MountBackend, target: &Path) -> Result<()> {
    backend.unmount_recursive(target)?;
    info!("unmounted '{}'", target.display());
    Ok(())
}

#[cfg(test)]
pub mod recording {
    use super::*;
    use std::collections::BTreeSet;

    /// An in-memory mount table recorder: no real syscalls, just a log of
    /// operations, for exercising [`mount_all`]/[`unmount`] in unit tests.
    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub mounted: Vec<BindMount>,
        pub live: BTreeSet<PathBuf>,
    }

    impl MountBackend for RecordingBackend {
        fn bind_mount(&mut self, m: &BindMount) -> Result<()> {
            self.live.insert(m.target.clone());
            self.mounted.push(m.clone());
            Ok(())
        }

        fn unmount_recursive(&mut self, target: &Path) -> Result<()> {
            self.live.retain(|p| p != target && !p.starts_with(target));
            Ok(())
        }
    }
}
