//! File-backed sample storage for dynamically learned spam/ham messages.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::spam_detection::models::SampleUpdater;

/// Append-only, line-oriented sample file. Newlines inside a message are
/// flattened to spaces so one line stays one sample.
#[derive(Debug, Clone)]
pub struct FileSampleUpdater {
    path: PathBuf,
}

impl FileSampleUpdater {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SampleUpdater for FileSampleUpdater {
    fn append(&self, msg: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open sample file {}", self.path.display()))?;
        writeln!(file, "{}", msg.replace(['\n', '\r'], " "))
            .with_context(|| format!("failed to append to sample file {}", self.path.display()))?;
        Ok(())
    }

    fn reader(&self) -> Result<Box<dyn Read + Send>> {
        if !self.path.exists() {
            return Ok(Box::new(io::empty()));
        }
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open sample file {}", self.path.display()))?;
        Ok(Box::new(file))
    }
}
