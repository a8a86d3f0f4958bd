//! Entry point: parses arguments, configures logging, and dispatches to
//! the mount or unmount path, translating the result into a process exit
//! code.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use ilfs::cli::Cli;
use ilfs::error::{self, Error};
use ilfs::mount::SyscallBackend;
use ilfs::options::OptionSet;
use ilfs::session;
use ilfs::template::EnvLookup;
use ilfs::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.log_level);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Reads a config table from `path`, or from stdin when `path` is `-`.
fn read_table(path: &Path) -> error::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(|e| Error::Usage {
            context: "reading config table from stdin".to_string(),
            message: e.to_string(),
        })?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|e| Error::Usage {
        context: format!("reading '{}'", path.display()),
        message: e.to_string(),
    })
}

async fn run(cli: &Cli) -> error::Result<()> {
    let mut backend = SyscallBackend;

    if cli.unmount {
        return session::unmount(&mut backend, &cli.target);
    }

    let treefile = cli.treefile.as_ref().ok_or_else(|| Error::Usage {
        context: "argument parsing".to_string(),
        message: "--treefile is required unless -u is given".to_string(),
    })?;
    let pathfile = cli.pathfile.as_ref().ok_or_else(|| Error::Usage {
        context: "argument parsing".to_string(),
        message: "--pathfile is required unless -u is given".to_string(),
    })?;

    let treefile_text = read_table(treefile)?;
    let pathfile_text = read_table(pathfile)?;

    let optstr = cli.global_optstr();
    let global_opts = OptionSet::parse(&optstr, 0)?;

    let vars = EnvLookup;

    if cli.init_only {
        let mut session = session::Session::new(global_opts);
        session.configure(&treefile_text, &pathfile_text, &vars)?;
        return session.initialize_only().await;
    }

    session::mount_session(
        &mut backend,
        &cli.target,
        &treefile_text,
        &pathfile_text,
        &vars,
        global_opts,
    )
    .await
}
