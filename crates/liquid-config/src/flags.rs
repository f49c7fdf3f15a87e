use std::{env, path::PathBuf, sync::LazyLock};

use serde::Deserialize;

const ENV_PREFIX: &str = "LIQUID_";

pub struct Flags {
    /// Per-check SMT timeout in milliseconds (default `200`). A check that
    /// exceeds it comes back `unknown` and is treated as invalid.
    pub timeout_ms: u32,
    /// Sets the directory to dump data. Defaults to `./log/`.
    pub log_dir: PathBuf,
    /// Dump constraints handed to the solver (debugging).
    pub dump_constraint: bool,
    pub verbose: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            timeout_ms: 200,
            log_dir: PathBuf::from("./log/"),
            dump_constraint: false,
            verbose: false,
        }
    }
}

/// The subset of [`Flags`] settable from `liquid.toml`.
#[derive(Default, Deserialize)]
struct FileFlags {
    timeout_ms: Option<u32>,
    log_dir: Option<PathBuf>,
    dump_constraint: Option<bool>,
    verbose: Option<bool>,
}

pub(crate) static FLAGS: LazyLock<Flags> = LazyLock::new(|| {
    let mut flags = Flags::default();

    if let Some(file) = read_config_file() {
        if let Some(v) = file.timeout_ms {
            flags.timeout_ms = v;
        }
        if let Some(v) = file.log_dir {
            flags.log_dir = v;
        }
        if let Some(v) = file.dump_constraint {
            flags.dump_constraint = v;
        }
        if let Some(v) = file.verbose {
            flags.verbose = v;
        }
    }

    for (key, value) in env::vars() {
        let Some(key) = key.strip_prefix(ENV_PREFIX) else { continue };
        let value = Some(value.as_str());
        let result = match key {
            "TIMEOUT_MS" => parse_u32(&mut flags.timeout_ms, value),
            "LOG_DIR" => parse_path_buf(&mut flags.log_dir, value),
            "DUMP_CONSTRAINT" => parse_bool(&mut flags.dump_constraint, value),
            "VERBOSE" => parse_bool(&mut flags.verbose, value),
            _ => continue,
        };
        if let Err(reason) = result {
            eprintln!("error: incorrect value for liquid option `{key}` - `{reason}`");
            std::process::exit(2);
        }
    }
    flags
});

fn read_config_file() -> Option<FileFlags> {
    let path = crate::config_path()?;
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&contents) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("error: invalid config file `{}`: {err}", path.display());
            std::process::exit(2);
        }
    }
}

fn parse_bool(slot: &mut bool, v: Option<&str>) -> Result<(), &'static str> {
    match v {
        Some("y") | Some("yes") | Some("on") | Some("true") | Some("1") | None => {
            *slot = true;
            Ok(())
        }
        Some("n") | Some("no") | Some("off") | Some("false") | Some("0") => {
            *slot = false;
            Ok(())
        }
        _ => {
            Err(
                "expected no value or one of `y`, `yes`, `on`, `true`, `1`, `n`, `no`, `off`, `false`, or `0`",
            )
        }
    }
}

fn parse_u32(slot: &mut u32, v: Option<&str>) -> Result<(), &'static str> {
    match v.and_then(|s| s.parse().ok()) {
        Some(v) => {
            *slot = v;
            Ok(())
        }
        None => Err("expected a non-negative integer"),
    }
}

fn parse_path_buf(slot: &mut PathBuf, v: Option<&str>) -> Result<(), &'static str> {
    match v {
        Some(s) => {
            *slot = PathBuf::from(s);
            Ok(())
        }
        None => Err("a path"),
    }
}
