//! Process-wide configuration for the verification core.
//!
//! Flags are resolved once, on first use: defaults, overridden by an optional
//! `liquid.toml` found in the current directory or any ancestor, overridden by
//! `LIQUID_*` environment variables.

pub use toml::Value;
pub mod flags;

use std::path::{Path, PathBuf};

use flags::FLAGS;

/// Per-check time budget for the SMT solver, in milliseconds.
pub fn timeout_ms() -> u32 {
    FLAGS.timeout_ms
}

/// Directory where dumps are written.
pub fn log_dir() -> &'static Path {
    &FLAGS.log_dir
}

/// Dump every constraint handed to the solver to [`log_dir`].
pub fn dump_constraint() -> bool {
    FLAGS.dump_constraint
}

pub fn verbose() -> bool {
    FLAGS.verbose
}

fn config_path() -> Option<PathBuf> {
    // find config file in current or parent directories
    let mut path = std::env::current_dir().ok()?;
    loop {
        for name in ["liquid.toml", ".liquid.toml"] {
            let file = path.join(name);
            if file.exists() {
                return Some(file);
            }
        }
        if !path.pop() {
            return None;
        }
    }
}
