//! Line-preserving `${NAME}` environment-variable substitutor.
//!
//! Used as a whole-stream preprocessor over both configuration tables
//! before tokenization. A two-state scanner (`Literal` / `AfterDollar`,
//! with a sub-state for brace name collection) as described in the
//! engine's design notes; backslash handling is a single-character
//! lookahead.

use std::collections::HashMap;

/// A name lookup used by the substitutor. In production this is backed by
/// `std::env::var`; tests supply a `HashMap`.
pub trait VarLookup {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl VarLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

pub struct EnvLookup;

impl VarLookup for EnvLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A bare `$` not followed by a well-formed `{NAME}` token.
    Syntax { line: usize, message: String },
    /// `${NAME}` referenced a variable with no value in the lookup.
    Undefined { line: usize, name: String },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::Syntax { line, message } => {
                write!(f, "template syntax error at line {}: {}", line, message)
            }
            TemplateError::Undefined { line, name } => {
                write!(f, "undefined variable ${{{}}} at line {}", name, line)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expands `${NAME}` tokens in `input`, escaping `\$` to a literal `$` and
/// preserving every other backslash verbatim. Returns the expanded string
/// with exactly one trailing newline, except for empty input, which passes
/// through unchanged.
pub fn substitute(input: &str, vars: &dyn VarLookup) -> Result<String, TemplateError> {
    if input.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut line = 1usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                out.push('\n');
                line += 1;
                i += 1;
            }
            '\\' if chars.get(i + 1) == Some(&'$') => {
                out.push('$');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                i += 1;
            }
            '$' => {
                if chars.get(i + 1) != Some(&'{') {
                    return Err(TemplateError::Syntax {
                        line,
                        message: "bare '$' not followed by '{NAME}'".to_string(),
                    });
                }
                let mut j = i + 2;
                let name_start = j;
                if j >= chars.len() || !is_name_start(chars[j]) {
                    return Err(TemplateError::Syntax {
                        line,
                        message: "'${' not followed by a valid variable name".to_string(),
                    });
                }
                j += 1;
                while j < chars.len() && is_name_char(chars[j]) {
                    j += 1;
                }
                if chars.get(j) != Some(&'}') {
                    return Err(TemplateError::Syntax {
                        line,
                        message: "unterminated '${NAME}' token".to_string(),
                    });
                }
                let name: String = chars[name_start..j].iter().collect();
                let value = vars.lookup(&name).ok_or_else(|| TemplateError::Undefined {
                    line,
                    name: name.clone(),
                })?;
                out.push_str(&value);
                i = j + 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_empty_roundtrip() {
        assert_eq!(substitute("", &vars(&[])).unwrap(), "");
    }

    #[test]
    fn test_roundtrip_example() {
        let v = vars(&[("FOO", r"$bar\$")]);
        let input = "${FOO}${FOO}\\${FOO}\n${FOO}baz";
        let expected = "$bar\\$$bar\\$${FOO}\n$bar\\$baz\n";
        assert_eq!(substitute(input, &v).unwrap(), expected);
    }

    #[test]
    fn test_undefined_variable() {
        let err = substitute("${MISSING}", &vars(&[])).unwrap_err();
        assert!(matches!(err, TemplateError::Undefined { .. }));
    }

    #[test]
    fn test_invalid_name_is_syntax_error() {
        let err = substitute("${1abc}", &vars(&[])).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_lone_dollar_is_error() {
        assert!(substitute("$", &vars(&[])).is_err());
        assert!(substitute("a $ b", &vars(&[])).is_err());
    }

    #[test]
    fn test_newline_between_dollar_and_brace_is_syntax_error() {
        let err = substitute("$\n{FOO}", &vars(&[])).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_empty_value_is_not_an_error() {
        let v = vars(&[("EMPTY", "")]);
        assert_eq!(substitute("[${EMPTY}]", &v).unwrap(), "[]\n");
    }
}
