//! Library surface for the `ilfs` binary: the core modules (§2 of the
//! composition engine this crate implements) live here so the CLI front
//! end and the `tests/` integration suite share one implementation.

pub mod cli;
pub mod config;
pub mod error;
pub mod initrunner;
pub mod logging;
pub mod mount;
pub mod options;
pub mod pathreg;
pub mod pathutil;
pub mod planner;
pub mod session;
pub mod template;
pub mod tree;
