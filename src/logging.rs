//! Logger initialization, carried over from the build tooling this crate
//! is descended from: honor `RUST_LOG` when present, otherwise apply a
//! `--log-level`-derived filter scoped to this crate only.

use env_logger::Builder;
use log::LevelFilter;

pub fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            Builder::from_default_env().init();
        }
        None => {
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .init();
        }
    }
}
