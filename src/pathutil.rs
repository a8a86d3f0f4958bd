//! Pure string operations on POSIX-style paths, plus glob recognition and
//! expansion. Nothing in this module touches the filesystem except
//! [`expand_glob`] and [`ospath_type`], which are the two operations that
//! necessarily must.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// `parent("/a/b") == "/a"`, `parent("/a/") == "/"`, `parent("/") == "/"`,
/// `parent("a/b") == "a"`, `parent("a/") == "."`, `parent(".") == "."`.
pub fn parent(p: &str) -> String {
    let trimmed = p.trim_end_matches('/');
    let is_absolute = p.starts_with('/');
    if trimmed.is_empty() {
        return if is_absolute { "/".to_string() } else { ".".to_string() };
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => {
            if is_absolute {
                "/".to_string()
            } else {
                ".".to_string()
            }
        }
    }
}

/// `leaf("/a/b") == "b"`, `leaf("/") == "/"`, `leaf(".") == "."`, `leaf("") == ""`.
pub fn leaf(p: &str) -> String {
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() {
        return if p.is_empty() { String::new() } else { "/".to_string() };
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Lexical validation of the composed-path grammar: `p == "/"`, or `p`
/// matches `^(/R)+/?$` where `R` is a component that is not `.` and not
/// `..` (a component may itself *start* with `.`, e.g. `...` or `.hidden`,
/// as long as it is not exactly `.` or `..`).
pub fn validate(p: &str) -> bool {
    if p == "/" {
        return true;
    }
    if !p.starts_with('/') {
        return false;
    }
    let body = p.strip_suffix('/').unwrap_or(p);
    let components: Vec<&str> = body.split('/').collect();
    // components[0] is "" because body starts with '/'.
    if components.len() < 2 {
        return false;
    }
    if !components[0].is_empty() {
        return false;
    }
    components[1..]
        .iter()
        .all(|c| !c.is_empty() && *c != "." && *c != "..")
}

/// Returns true if `s` contains an unescaped glob metacharacter: `*`, `?`,
/// `[...]`, `+(...)`, `@(...)`, `!(...)`. Backslash-escaped metacharacters
/// do not count, and the extglob groups only count when the opening
/// punctuation (`+(`, `@(`, `!(`) and a matching unescaped `)` are both
/// present unescaped.
pub fn contains_glob(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'*' | b'?' => return true,
            b'[' => {
                if find_unescaped_before_slash(bytes, i + 1, b']').is_some() {
                    return true;
                }
            }
            b'+' | b'@' | b'!' => {
                if i + 1 < bytes.len()
                    && bytes[i + 1] == b'('
                    && find_unescaped_before_slash(bytes, i + 2, b')').is_some()
                {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Scans forward for an unescaped `target` byte, but gives up (returns
/// `None`) if an unescaped `/` is seen first: bracket and extglob groups
/// never span a path-component boundary.
fn find_unescaped_before_slash(bytes: &[u8], mut i: usize, target: u8) -> Option<usize> {
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == target {
            return Some(i);
        }
        if bytes[i] == b'/' {
            return None;
        }
        i += 1;
    }
    None
}

/// On-disk type of a path: `'d'` for directory, `'f'` for regular file.
/// Symlinks and any other file type are rejected; an absent path is a
/// distinct error kind from "exists but unsupported type" (both are
/// ordinary config-time conditions on a user-declared source path, not
/// internal invariant violations, so neither maps to an internal error).
pub fn ospath_type(p: &Path) -> Result<char> {
    let meta = fs::symlink_metadata(p).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::PathAbsent { path: p.to_path_buf() }
        } else {
            Error::Internal(format!("probing type of '{}': {}", p.display(), e))
        }
    })?;
    let ft = meta.file_type();
    if ft.is_symlink() {
        return Err(Error::PathUnsupportedType {
            path: p.to_path_buf(),
            message: "symlinks are not a supported path type".to_string(),
        });
    }
    if ft.is_dir() {
        Ok('d')
    } else if ft.is_file() {
        Ok('f')
    } else {
        Err(Error::PathUnsupportedType {
            path: p.to_path_buf(),
            message: "neither a directory nor a regular file".to_string(),
        })
    }
}

/// Whether `p` exists on disk at all (any type, including symlinks).
pub fn exists(p: &Path) -> bool {
    fs::symlink_metadata(p).is_ok()
}

/// Translates one non-separator glob pattern component into an anchored
/// regex. Supports `*`, `?`, `[...]` character classes, and the extglob
/// groups `+(...)`, `@(...)`, `!(...)` (the latter negated via a regex
/// negative lookahead is not attempted; `!(...)` is translated to "anything
/// that is not exactly one of the alternatives", a reasonable approximation
/// of shell `extglob` semantics for the single-component case this engine
/// needs).
fn component_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                out.push_str(&regex::escape(&chars[i + 1].to_string()));
                i += 2;
            }
            '*' => {
                out.push_str(".*");
                i += 1;
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            '[' => {
                if let Some(end) = chars[i..].iter().position(|&c| c == ']') {
                    let end = i + end;
                    out.push('[');
                    out.push_str(&chars[i + 1..end].iter().collect::<String>());
                    out.push(']');
                    i = end + 1;
                } else {
                    out.push_str(&regex::escape("["));
                    i += 1;
                }
            }
            '+' | '@' | '!' if chars.get(i + 1) == Some(&'(') => {
                if let Some(rel_end) = chars[i + 2..].iter().position(|&c| c == ')') {
                    let end = i + 2 + rel_end;
                    let inner: String = chars[i + 2..end].iter().collect();
                    let alts: Vec<String> = inner
                        .split('|')
                        .map(|alt| component_to_regex_body(alt))
                        .collect();
                    match c {
                        '+' => out.push_str(&format!("(?:{})+", alts.join("|"))),
                        '@' => out.push_str(&format!("(?:{})", alts.join("|"))),
                        '!' => out.push_str(&format!("(?!^(?:{})$).*", alts.join("|"))),
                        _ => unreachable!(),
                    }
                    i = end + 1;
                } else {
                    out.push_str(&regex::escape(&c.to_string()));
                    i += 1;
                }
            }
            other => {
                out.push_str(&regex::escape(&other.to_string()));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

/// Like [`component_to_regex`] but without the `^...$` anchors, for use
/// inside an extglob alternative group.
fn component_to_regex_body(pattern: &str) -> String {
    let anchored = component_to_regex(pattern);
    anchored
        .strip_prefix('^')
        .and_then(|s| s.strip_suffix('$'))
        .unwrap_or(&anchored)
        .to_string()
}

/// Enumerates filesystem matches of `pattern` relative to `cwd`. Dot-files
/// are included. No symlinks are followed outside of what `read_dir`
/// naturally traverses (each path component is matched against actual
/// directory entries; a symlinked intermediate directory is followed the
/// same way a shell glob would follow it). Returns an empty vector when
/// there is no match; never alters process state (no chdir, no umask).
pub fn expand_glob(cwd: &Path, pattern: &str) -> Result<Vec<String>> {
    let pattern = pattern.trim_start_matches('/');
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let mut current: Vec<PathBuf> = vec![PathBuf::new()];
    for comp in components {
        let mut next = Vec::new();
        if contains_glob(comp) {
            let re = Regex::new(&component_to_regex(comp))
                .map_err(|e| Error::Internal(format!("bad glob component '{}': {}", comp, e)))?;
            for base in &current {
                let dir = cwd.join(base);
                let entries = match fs::read_dir(&dir) {
                    Ok(it) => it,
                    Err(ref e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        return Err(Error::Internal(format!(
                            "reading '{}' during glob expansion: {}",
                            dir.display(),
                            e
                        )))
                    }
                };
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| re.is_match(name))
                    .collect();
                names.sort();
                for name in names {
                    next.push(base.join(&name));
                }
            }
        } else {
            for base in &current {
                let candidate = base.join(comp);
                if exists(&cwd.join(&candidate)) {
                    next.push(candidate);
                }
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    Ok(current
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ospath_type_distinguishes_absent_from_unsupported_type() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("nope");
        let err = ospath_type(&absent).unwrap_err();
        assert!(matches!(err, Error::PathAbsent { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);

        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path(), &link).unwrap();
        let err = ospath_type(&link).unwrap_err();
        assert!(matches!(err, Error::PathUnsupportedType { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/a/b"), "/a");
        assert_eq!(parent("/a/"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("a/b"), "a");
        assert_eq!(parent("a/"), ".");
        assert_eq!(parent("."), ".");
    }

    #[test]
    fn test_leaf() {
        assert_eq!(leaf("/a/b"), "b");
        assert_eq!(leaf("/"), "/");
        assert_eq!(leaf("."), ".");
        assert_eq!(leaf(""), "");
    }

    #[test]
    fn test_validate_accepts() {
        for p in [
            "/", "/a", "/dir/sub", "/...", "/a/...", "/a/.../x", "/a/. ", "/a/ ./dir",
        ] {
            assert!(validate(p), "expected {:?} to validate", p);
        }
    }

    #[test]
    fn test_validate_rejects() {
        for p in [
            ".", "..", "a", "/.", "/./", "/..", "/../", "//", "//dir", "/dir//sub", "/dir/..",
            "/dir/sub/..", "/dir/./sub", "/dir1/../dir2", "",
        ] {
            assert!(!validate(p), "expected {:?} to be rejected", p);
        }
    }

    #[test]
    fn test_contains_glob_positive() {
        for p in ["*", "/x/*.jpg", "x?", "x/+(x)", "a/[bc]/d"] {
            assert!(contains_glob(p), "expected {:?} to be a glob", p);
        }
    }

    #[test]
    fn test_contains_glob_negative() {
        for p in [r"[/]", r"x/+\(x\)", r"a/[bc\]/d"] {
            assert!(!contains_glob(p), "expected {:?} to not be a glob", p);
        }
    }

    #[test]
    fn test_expand_glob_includes_dotfiles_and_empty_on_no_match() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/.hidden"), "").unwrap();
        fs::write(dir.path().join("sub/visible.txt"), "").unwrap();

        let mut matches = expand_glob(dir.path(), "sub/*").unwrap();
        matches.sort();
        assert_eq!(matches, vec!["sub/.hidden", "sub/visible.txt"]);

        let none = expand_glob(dir.path(), "nope/*").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_expand_glob_no_cwd_mutation() {
        let dir = tempdir().unwrap();
        let before = std::env::current_dir().unwrap();
        let _ = expand_glob(dir.path(), "*");
        assert_eq!(before, std::env::current_dir().unwrap());
    }
}
