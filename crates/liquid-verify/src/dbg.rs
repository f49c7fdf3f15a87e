//! Debug artifacts: constraint dumps and session statistics, written under
//! a caller-supplied directory (normally [`liquid_config::log_dir`]).

use std::{
    fs,
    io::{self, Write as _},
    path::Path,
};

use crate::{constraint::Constraint, smt::Stats};

fn writer(dir: &Path, name: &str) -> io::Result<io::BufWriter<fs::File>> {
    fs::create_dir_all(dir)?;
    Ok(io::BufWriter::new(fs::File::create(dir.join(name))?))
}

pub fn dump_constraint(dir: &Path, name: &str, c: &Constraint) -> io::Result<()> {
    let mut w = writer(dir, name)?;
    writeln!(w, "{c}")
}

pub fn dump_stats(dir: &Path, name: &str, stats: &Stats) -> io::Result<()> {
    let w = writer(dir, name)?;
    serde_json::to_writer_pretty(w, stats)?;
    Ok(())
}
