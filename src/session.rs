//! Ties the registries, planner, initializer runner, and mount executor
//! into the session lifecycle: `uninit -> configured -> planned ->
//! mounted`, `mounted -> unmounted` on explicit teardown, any error ->
//! `failed`.

use std::path::Path;

use crate::config::{self, LoadedConfig};
use crate::error::{Error, Result};
use crate::initrunner;
use crate::mount::{self, MountBackend};
use crate::options::OptionSet;
use crate::planner;
use crate::pathreg::PathRegistry;
use crate::template::VarLookup;
use crate::tree::TreeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninit,
    Configured,
    Planned,
    Mounted,
    Unmounted,
    Failed,
}

pub struct Session {
    state: State,
    trees: Option<TreeRegistry>,
    paths: Option<PathRegistry>,
    global_opts: OptionSet,
    defaults: OptionSet,
}

impl Session {
    pub fn new(global_opts: OptionSet) -> Self {
        Session {
            state: State::Uninit,
            trees: None,
            paths: None,
            global_opts,
            defaults: crate::options::default_option_set(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn configure(
        &mut self,
        treefile_text: &str,
        pathfile_text: &str,
        vars: &dyn VarLookup,
    ) -> Result<()> {
        match config::load(treefile_text, pathfile_text, vars) {
            Ok(LoadedConfig { trees, paths }) => {
                self.trees = Some(trees);
                self.paths = Some(paths);
                self.state = State::Configured;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn trees(&self) -> Result<&TreeRegistry> {
        self.trees
            .as_ref()
            .ok_or_else(|| Error::Internal("session is not configured".to_string()))
    }

    fn paths(&self) -> Result<&PathRegistry> {
        self.paths
            .as_ref()
            .ok_or_else(|| Error::Internal("session is not configured".to_string()))
    }

    /// Runs the Initializer Runner then the Mountpoint Planner, in that
    /// order (the mount executor runs initializers before planning so
    /// placeholders are only ever created for content that genuinely
    /// exists, or will, in its source tree).
    pub async fn plan(&mut self) -> Result<()> {
        if self.state != State::Configured {
            return Err(Error::Internal(format!(
                "plan() called in state {:?}, expected Configured",
                self.state
            )));
        }
        if !self.paths()?.defined("/") {
            self.state = State::Failed;
            return Err(Error::NoRootConfigured);
        }
        let result = async {
            initrunner::run(self.paths()?, self.trees()?).await?;
            planner::plan(self.paths()?, self.trees()?)?;
            Ok::<(), Error>(())
        }
        .await;
        match result {
            Ok(()) => {
                self.state = State::Planned;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Runs only the Initializer Runner, without planning or mounting
    /// (the CLI's `-i` mode).
    pub async fn initialize_only(&mut self) -> Result<()> {
        if self.state != State::Configured {
            return Err(Error::Internal(format!(
                "initialize_only() called in state {:?}, expected Configured",
                self.state
            )));
        }
        match initrunner::run(self.paths()?, self.trees()?).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    pub fn mount(&mut self, backend: &mut dyn MountBackend, target: &Path) -> Result<()> {
        if self.state != State::Planned {
            return Err(Error::Internal(format!(
                "mount() called in state {:?}, expected Planned",
                self.state
            )));
        }
        let result = mount::mount_all(
            backend,
            target,
            self.paths.as_ref().unwrap(),
            self.trees.as_ref().unwrap(),
            &self.defaults,
            &self.global_opts,
        );
        match result {
            Ok(()) => {
                self.state = State::Mounted;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }
}

/// Unmounting is a standalone action against a target directory; it does
/// not require a live `Session` (the caller may be tearing down a
/// composition created by a previous process invocation).
pub fn unmount(backend: &mut dyn MountBackend, target: &Path) -> Result<()> {
    mount::unmount(backend, target)
}

/// Convenience: load, plan, and mount in one call, for the CLI's default
/// `mount` subcommand.
pub async fn mount_session(
    backend: &mut dyn MountBackend,
    target: &Path,
    treefile_text: &str,
    pathfile_text: &str,
    vars: &dyn VarLookup,
    global_opts: OptionSet,
) -> Result<()> {
    let mut session = Session::new(global_opts);
    session.configure(treefile_text, pathfile_text, vars)?;
    session.plan().await?;
    session.mount(backend, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::recording::RecordingBackend;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();

        let treefile = format!(
            "src {}\ndata {}\n",
            dir.path().join("src").display(),
            dir.path().join("data").display(),
        );
        let pathfile = "src /\ndata /app/data init=missing mkdir -p \"$ILFS_TREE_ROOT/$ILFS_RELPATH\"\n";

        let vars: HashMap<String, String> = HashMap::new();
        let mut backend = RecordingBackend::default();
        mount_session(
            &mut backend,
            Path::new("/mnt/target"),
            &treefile,
            pathfile,
            &vars,
            OptionSet::new(),
        )
        .await
        .unwrap();

        assert_eq!(backend.live.len(), 2);
        assert!(dir.path().join("data/app/data").is_dir());
    }
}
