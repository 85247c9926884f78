//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_TAXI_SUMMARY` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no subscriber is installed and the `tracing` events emitted by the job are discarded.
//! - **Enabled**: Any other value installs a `fmt` subscriber with a maximum log level of `DEBUG`.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_TAXI_SUMMARY=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Returns true if the given value of `DEBUG_TAXI_SUMMARY` turns logging on.
pub fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var("DEBUG_TAXI_SUMMARY").ok();
    if logging_enabled(value.as_deref()) {
        // `try_init` so a host binary that already installed a subscriber keeps it.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
