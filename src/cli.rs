//! `tool [-r] [-i] [-o OPTSTR]... --treefile PATH --pathfile PATH TARGET`
//! mounts; `tool -u TARGET` unmounts; `--help` exits 0.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Compose a directory tree from bind-mounted source trees", long_about = None)]
pub struct Cli {
    /// Unmount TARGET instead of mounting (recursive lazy unmount).
    #[arg(short = 'u', long = "unmount")]
    pub unmount: bool,

    /// Shorthand for `-o ro`: force every path read-only.
    #[arg(short = 'r')]
    pub force_ro: bool,

    /// Run initializers only; do not mount.
    #[arg(short = 'i', long = "init-only")]
    pub init_only: bool,

    /// Global option, may be given multiple times; concatenated into one
    /// comma-separated global option string.
    #[arg(short = 'o', long = "opt")]
    pub opts: Vec<String>,

    /// Path to the treefile (required unless `-u`).
    #[arg(long, env = "ILFS_TREEFILE")]
    pub treefile: Option<PathBuf>,

    /// Path to the pathfile (required unless `-u`).
    #[arg(long, env = "ILFS_PATHFILE")]
    pub pathfile: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: LevelFilter,

    /// The composed view's mount target.
    #[arg(env = "ILFS_TARGET")]
    pub target: PathBuf,
}

impl Cli {
    /// The effective global option string: `-r` expands to `ro`, then
    /// every `-o` is appended in order, comma-joined.
    pub fn global_optstr(&self) -> String {
        let mut parts = Vec::new();
        if self.force_ro {
            parts.push("ro".to_string());
        }
        parts.extend(self.opts.iter().cloned());
        parts.join(",")
    }
}
