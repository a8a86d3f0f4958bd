//! The error taxonomy shared by every core module.
//!
//! Each variant corresponds to one of the error kinds named in the
//! composition engine's error handling design: a fixed set of kinds, not
//! types, each carrying whatever human-readable context its call site has
//! (a source line for loader errors, a path for mount/init errors).

use std::path::PathBuf;

use thiserror::Error;

/// The exit code a process should use when this error reaches `main`.
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_PLATFORM: i32 = 2;
pub const EXIT_INTERNAL: i32 = 70;

#[derive(Debug, Error)]
pub enum Error {
    #[error("platform capability unavailable: {0}")]
    Platform(String),

    #[error("{context}: {message}")]
    Usage { context: String, message: String },

    #[error("template syntax error at line {line}: {message}")]
    TemplateSyntax { line: usize, message: String },

    #[error("undefined variable ${{{name}}} at line {line}")]
    TemplateUndefined { line: usize, name: String },

    #[error("line {line}: unknown option '{name}'")]
    UnknownOption { line: usize, name: String },

    #[error("line {line}: invalid value '{value}' for option '{name}'")]
    InvalidOptionValue {
        line: usize,
        name: String,
        value: String,
    },

    #[error("line {line}: unknown tree '{name}'")]
    UnknownTree { line: usize, name: String },

    #[error("line {line}: duplicate tree '{name}'")]
    DuplicateTree { line: usize, name: String },

    #[error("line {line}: invalid tree root '{root}': {message}")]
    InvalidTreeRoot {
        line: usize,
        root: String,
        message: String,
    },

    #[error("line {line}: invalid path '{path}': {message}")]
    PathInvalid {
        line: usize,
        path: String,
        message: String,
    },

    #[error("line {line}: path '{path}' is shadowed by already-registered path '{shadowed_by}'")]
    PathShadow {
        line: usize,
        path: String,
        shadowed_by: String,
    },

    #[error("path '{path}': on-disk type does not match declared type {declared}")]
    PathTypeMismatch { path: PathBuf, declared: char },

    #[error("path '{path}' does not exist")]
    PathAbsent { path: PathBuf },

    #[error("path '{path}': unsupported on-disk type: {message}")]
    PathUnsupportedType { path: PathBuf, message: String },

    #[error("line {line}: path '{path}' has no match on disk and is not initializable")]
    PathNoMatch { line: usize, path: String },

    #[error("line {line}: init is forbidden on glob-expanded path '{path}' unless 'skip' or 'never'")]
    InitForbiddenOnGlob { line: usize, path: String },

    #[error("path '{path}' requires initialization but init policy forbids it")]
    InitRequiredMissing { path: String },

    #[error("path '{path}' requires initialization but its initcmd is blank")]
    InitBlankCommand { path: String },

    #[error("path '{path}': initializer exited 0 but result does not match declared type/existence")]
    InitResultMismatch { path: String },

    #[error("path '{path}': initializer failed: {message}")]
    InitFailed { path: String, message: String },

    #[error("mountpoint collision at '{path}': existing entry is not a {expected}")]
    MountpointCollision { path: PathBuf, expected: String },

    #[error("failed to mount '{path}': {message}")]
    MountFailed { path: String, message: String },

    #[error("no path registered for '/': at least one path must be bound to the root")]
    NoRootConfigured,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("{0} error(s) while loading configuration")]
    Multiple(Vec<Error>),
}

impl Error {
    /// Exit code mapping used by the CLI adapter.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Platform(_) => EXIT_PLATFORM,
            Error::TemplateSyntax { .. } => EXIT_PLATFORM,
            Error::Internal(_) => EXIT_INTERNAL,
            Error::Multiple(errs) => errs
                .iter()
                .map(Error::exit_code)
                .max()
                .unwrap_or(EXIT_USAGE),
            _ => EXIT_USAGE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_syntax_is_a_platform_exit() {
        let e = Error::TemplateSyntax {
            line: 1,
            message: "bad".to_string(),
        };
        assert_eq!(e.exit_code(), EXIT_PLATFORM);
    }

    #[test]
    fn test_template_undefined_is_a_usage_exit() {
        let e = Error::TemplateUndefined {
            line: 1,
            name: "X".to_string(),
        };
        assert_eq!(e.exit_code(), EXIT_USAGE);
    }
}
