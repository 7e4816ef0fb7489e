// Tab Switcher Library Entry Point
// This file exposes all modules so they can be imported by main.rs
// and tested independently.

pub mod error;
pub mod settings;

// Shared value types
pub mod state;

// Pure logic modules
pub mod modules;

pub use error::{Result, SwitcherError};
pub use modules::switcher::{Activation, Handled, TabSwitcher};
pub use settings::{SearchEngine, Settings};

/// Installs the process-wide logger. `RUST_LOG` overrides the default level,
/// which is Info in debug builds and Warn otherwise.
pub fn init_logging() {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
