//! The canonical initializer action library. These are a contract, not a
//! command-line surface: a Rust port of an `initcmd` is free to call these
//! directly instead of shelling out to equivalent coreutils, and tests
//! exercise them the same way.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::template::{self, VarLookup};

/// Creates `subpath` (and any missing intermediate directories) under
/// `tree_root`.
pub fn mkdir(tree_root: &Path, subpath: &str) -> Result<()> {
    let target = tree_root.join(subpath);
    fs::create_dir_all(&target)
        .map_err(|e| Error::Internal(format!("mkdir '{}': {}", target.display(), e)))
}

/// Renders `tpl` through the Template Substitutor and writes the result to
/// `tree_root + subpath`, creating parent directories as needed.
pub fn template_envsubst(
    tree_root: &Path,
    tpl: &Path,
    subpath: &str,
    vars: &dyn VarLookup,
) -> Result<()> {
    let content = fs::read_to_string(tpl)
        .map_err(|e| Error::Internal(format!("reading template '{}': {}", tpl.display(), e)))?;
    let rendered = template::substitute(&content, vars).map_err(|e| match e {
        template::TemplateError::Syntax { line, message } => Error::TemplateSyntax { line, message },
        template::TemplateError::Undefined { line, name } => Error::TemplateUndefined { line, name },
    })?;
    let target = tree_root.join(subpath);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Internal(format!("creating '{}': {}", parent.display(), e)))?;
    }
    fs::write(&target, rendered)
        .map_err(|e| Error::Internal(format!("writing '{}': {}", target.display(), e)))
}

/// Recursively copies `src` to `tree_root + subpath`, preserving file
/// mode bits. Refuses if the destination already exists.
pub fn copy(tree_root: &Path, src: &Path, subpath: &str) -> Result<()> {
    let dest = tree_root.join(subpath);
    if dest.exists() {
        return Err(Error::Internal(format!(
            "copy destination '{}' already exists",
            dest.display()
        )));
    }
    copy_recursive(src, &dest)
}

fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src)
        .map_err(|e| Error::Internal(format!("stat '{}': {}", src.display(), e)))?;
    if meta.is_dir() {
        fs::create_dir_all(dest)
            .map_err(|e| Error::Internal(format!("mkdir '{}': {}", dest.display(), e)))?;
        for child in fs::read_dir(src)
            .map_err(|e| Error::Internal(format!("reading '{}': {}", src.display(), e)))?
        {
            let child = child.map_err(|e| Error::Internal(e.to_string()))?;
            copy_recursive(&child.path(), &dest.join(child.file_name()))?;
        }
        fs::set_permissions(dest, meta.permissions())
            .map_err(|e| Error::Internal(format!("chmod '{}': {}", dest.display(), e)))?;
    } else {
        fs::copy(src, dest)
            .map_err(|e| Error::Internal(format!("copying '{}': {}", src.display(), e)))?;
        fs::set_permissions(dest, meta.permissions())
            .map_err(|e| Error::Internal(format!("chmod '{}': {}", dest.display(), e)))?;
    }
    Ok(())
}

/// Applies `ILFS_INIT_CHOWN`/`ILFS_INIT_CHGRP` (numeric uid/gid) to the
/// freshly created `subpath`, recursively. A no-op if neither is set.
pub fn apply_ownership(tree_root: &Path, subpath: &str, chown: Option<u32>, chgrp: Option<u32>) -> Result<()> {
    if chown.is_none() && chgrp.is_none() {
        return Ok(());
    }
    let target = tree_root.join(subpath);
    apply_ownership_recursive(&target, chown, chgrp)
}

fn apply_ownership_recursive(path: &PathBuf, chown: Option<u32>, chgrp: Option<u32>) -> Result<()> {
    let uid = chown.map(nix::unistd::Uid::from_raw);
    let gid = chgrp.map(nix::unistd::Gid::from_raw);
    nix::unistd::chown(path, uid, gid)
        .map_err(|e| Error::Internal(format!("chown '{}': {}", path.display(), e)))?;
    if path.is_dir() {
        for child in fs::read_dir(path)
            .map_err(|e| Error::Internal(format!("reading '{}': {}", path.display(), e)))?
        {
            let child = child.map_err(|e| Error::Internal(e.to_string()))?;
            apply_ownership_recursive(&child.path(), chown, chgrp)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_mkdir_creates_nested() {
        let root = tempdir().unwrap();
        mkdir(root.path(), "a/b/c").unwrap();
        assert!(root.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_template_envsubst_renders() {
        let root = tempdir().unwrap();
        let tpl = root.path().join("tpl.txt");
        fs::write(&tpl, "NAME1=${VALUE1}\nNAME2=${VALUE2}").unwrap();

        let mut vars = HashMap::new();
        vars.insert("VALUE1".to_string(), "foo".to_string());
        vars.insert("VALUE2".to_string(), "bar".to_string());

        template_envsubst(root.path(), &tpl, "out/rendered.txt", &vars).unwrap();

        let content = fs::read_to_string(root.path().join("out/rendered.txt")).unwrap();
        assert_eq!(content, "NAME1=foo\nNAME2=bar\n");
    }

    #[test]
    fn test_copy_refuses_existing_destination() {
        let root = tempdir().unwrap();
        let src = root.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("file.txt"), "hi").unwrap();
        let dest_marker = root.path().join("dest");
        fs::create_dir_all(&dest_marker).unwrap();

        let err = copy(root.path(), &src, "dest").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_copy_recursive() {
        let root = tempdir().unwrap();
        let src = root.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/file.txt"), "hi").unwrap();

        copy(root.path(), &src, "dest").unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("dest/nested/file.txt")).unwrap(),
            "hi"
        );
    }
}
