//! Provide tracing, tailored to this crate.
//!
//! Binaries call [`init`] once at startup to install a subscriber; library
//! modules `use crate::tracing::prelude::*` for convenient access to the
//! `trace!()`, `debug!()`, `info!()`, `warn!()`, and `error!()` macros.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

/// Initialize logging to stdout, filtering according to the environment
/// variable RUST_LOG, overriding the default level (ERROR) to INFO.
pub fn init() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
