//! Logger installation for the command-line binary.
//!
//! Library code only uses the `log` macros; this installs `env_logger` as the
//! backend. `RUST_LOG` wins over the default level.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Install the logger once; later calls are no-ops.
pub fn init(verbose: bool) {
    let default = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = Builder::from_env(Env::default().default_filter_or(default.as_str()))
        .format_timestamp_millis()
        .format_target(false)
        .try_init();
}
