//! Reads the two declarative text tables (trees, paths), threading them
//! through the template substitutor, tokenizing fields, expanding globs,
//! rejecting shadowing, and populating the Tree Registry and Path
//! Registry.

use crate::error::{Error, Result};
use crate::options::{OptionSet, PathType};
use crate::pathreg::{PathEntry, PathRegistry};
use crate::pathutil;
use crate::template::{self, VarLookup};
use crate::tree::TreeRegistry;

/// Splits a logical line into at most `max_fields` whitespace-separated
/// fields. A field beginning with `#` ends the record (trailing comments
/// are dropped); the last field, when `max_fields` is reached, captures
/// the remainder of the line verbatim (used for `initcmd`).
fn tokenize(line: &str, max_fields: usize) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = line;
    while fields.len() + 1 < max_fields {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            return fields;
        }
        if trimmed.starts_with('#') {
            return fields;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        fields.push(trimmed[..end].to_string());
        rest = &trimmed[end..];
    }
    let trimmed = rest.trim_start();
    if !trimmed.is_empty() && !trimmed.starts_with('#') {
        fields.push(trimmed.to_string());
    }
    fields
}

fn is_comment_or_blank(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

pub struct LoadedConfig {
    pub trees: TreeRegistry,
    pub paths: PathRegistry,
}

/// Loads both tables. `global_opts` is the CLI `-o` scope; it is not
/// consulted here (resolution happens later) but `-r`/`-o ro` validity is
/// checked the same way any other option string would be.
pub fn load(
    treefile_text: &str,
    pathfile_text: &str,
    vars: &dyn VarLookup,
) -> Result<LoadedConfig> {
    let mut trees = TreeRegistry::new();
    let mut paths = PathRegistry::new();

    let expanded_trees = template::substitute(treefile_text, vars).map_err(to_template_error)?;
    load_trees(&expanded_trees, &mut trees)?;

    let expanded_paths = template::substitute(pathfile_text, vars).map_err(to_template_error)?;
    load_paths(&expanded_paths, &trees, &mut paths)?;

    Ok(LoadedConfig { trees, paths })
}

fn to_template_error(e: template::TemplateError) -> Error {
    match e {
        template::TemplateError::Syntax { line, message } => Error::TemplateSyntax { line, message },
        template::TemplateError::Undefined { line, name } => Error::TemplateUndefined { line, name },
    }
}

fn load_trees(text: &str, trees: &mut TreeRegistry) -> Result<()> {
    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        if is_comment_or_blank(raw_line) {
            continue;
        }
        let fields = tokenize(raw_line, 3);
        let name = fields.first().cloned().unwrap_or_default();
        let root = fields.get(1).cloned();
        let optstr = fields.get(2).cloned().unwrap_or_default();
        let root = root.ok_or_else(|| Error::Usage {
            context: format!("treefile line {}", line),
            message: "missing root directory field".to_string(),
        })?;
        trees.add(&name, &root, &optstr, line)?;
    }
    Ok(())
}

fn load_paths(text: &str, trees: &TreeRegistry, paths: &mut PathRegistry) -> Result<()> {
    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        if is_comment_or_blank(raw_line) {
            continue;
        }
        // tree, pathspec, opts, initcmd(remainder)
        let fields = tokenize(raw_line, 4);
        let tree_name = fields.first().cloned().unwrap_or_default();
        let pathspec = fields.get(1).cloned().ok_or_else(|| Error::Usage {
            context: format!("pathfile line {}", line),
            message: "missing pathspec field".to_string(),
        })?;
        let optstr = fields.get(2).cloned().unwrap_or_default();
        let init_cmd = fields.get(3).cloned().unwrap_or_default();

        if !trees.defined(&tree_name) {
            return Err(Error::UnknownTree {
                line,
                name: tree_name,
            });
        }
        let tree = trees.get(&tree_name).expect("checked defined above");

        let mut opts = OptionSet::parse(&optstr, line)?;

        let is_glob = pathutil::contains_glob(&pathspec);
        if is_glob {
            match opts.init() {
                Some(crate::options::InitPolicy::Skip) | Some(crate::options::InitPolicy::Never) => {}
                Some(_) => {
                    return Err(Error::InitForbiddenOnGlob {
                        line,
                        path: pathspec.clone(),
                    })
                }
                None => opts.set_init(crate::options::InitPolicy::Skip),
            }
        }

        let mut spec = pathspec.clone();
        let ends_with_slash = spec.ends_with('/') && spec != "/";
        if ends_with_slash {
            match opts.path_type() {
                None | Some(PathType::Dir) | Some(PathType::Either) => {}
                Some(_) => {
                    return Err(Error::PathInvalid {
                        line,
                        path: pathspec.clone(),
                        message: "trailing '/' implies type=d, but an incompatible type was given"
                            .to_string(),
                    })
                }
            }
            opts.set_type(PathType::Dir);
            spec = spec.trim_end_matches('/').to_string();
            if spec.is_empty() {
                spec = "/".to_string();
            }
        }

        if !spec.starts_with('/') {
            spec = format!("/{}", spec);
        }
        if !pathutil::validate(&spec) {
            return Err(Error::PathInvalid {
                line,
                path: pathspec.clone(),
                message: "does not match the path grammar".to_string(),
            });
        }

        let candidates: Vec<String> = if is_glob {
            let glob_rel = spec.trim_start_matches('/');
            pathutil::expand_glob(&tree.root, glob_rel)?
                .into_iter()
                .map(|m| format!("/{}", m))
                .collect()
        } else {
            let source_path = tree.root.join(spec.trim_start_matches('/'));
            let exists = pathutil::exists(&source_path);
            let init = opts.init();
            let allowed_missing = matches!(
                init,
                Some(crate::options::InitPolicy::Missing)
                    | Some(crate::options::InitPolicy::Always)
                    | Some(crate::options::InitPolicy::Skip)
            );
            if !exists && !allowed_missing {
                // `init` is unset (defaults to `never`) or explicitly
                // `never`: the loader has nowhere to route this path and
                // no initializer is allowed to run for it.
                return Err(Error::PathNoMatch {
                    line,
                    path: pathspec.clone(),
                });
            }
            vec![spec.clone()]
        };

        for candidate in candidates {
            if !pathutil::validate(&candidate) {
                return Err(Error::PathInvalid {
                    line,
                    path: candidate,
                    message: "does not match the path grammar".to_string(),
                });
            }
            if let Some(shadowed_by) = paths.is_shadowed(&candidate) {
                return Err(Error::PathShadow {
                    line,
                    path: candidate,
                    shadowed_by: shadowed_by.to_string(),
                });
            }

            let declared_type = opts.path_type().unwrap_or(PathType::Either);
            let source_path = tree.root.join(candidate.trim_start_matches('/'));
            if pathutil::exists(&source_path) {
                let actual = pathutil::ospath_type(&source_path)?;
                if !declared_type.matches(actual) {
                    return Err(Error::PathTypeMismatch {
                        path: source_path,
                        declared: declared_type.as_char(),
                    });
                }
            }

            paths.push(PathEntry {
                path: candidate,
                tree: tree_name.clone(),
                init_cmd: init_cmd.clone(),
                opts: opts.clone(),
                declared_type,
                from_glob: is_glob,
            });
        }
    }
    Ok(())
}
