//! Configuration of the debouncer and the `lull` command.
//!
//! The persisted model is read from a file, the CLI overrides some aspects of it.

mod duration;
mod models;
mod source;

pub use duration::*;
pub use models::*;
pub use source::*;

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

/// Locate and load the configuration from a file or a directory, defaulting to the current
/// directory.
///
/// Returns the configuration together with the directory it is relative to.
pub fn load(path: Option<PathBuf>) -> Result<(Configuration, PathBuf)> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir().context("unable to get current directory")?,
    };

    if path.is_dir() {
        return Ok((Source::find(&path).load()?, path));
    }
    if !path.is_file() {
        bail!("{} is neither a file nor a directory", path.display());
    }

    let file = path
        .canonicalize()
        .with_context(|| format!("unable to canonicalize '{}'", path.display()))?;
    let Some(dir) = file.parent().map(PathBuf::from) else {
        bail!("unable to get parent directory of '{}'", file.display());
    };
    Ok((Source::File(file).load()?, dir))
}
