//! Reading decks and reports from disk, writing outputs without clobbering.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use ccx_model::Model;
use tracing::{debug, info};

use crate::dat::DatReport;
use crate::error::{IoError, Result};

pub fn read_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read deck");
    Ok(Model::parse(&bytes)?)
}

pub fn read_report(path: impl AsRef<Path>) -> Result<DatReport> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read report");
    Ok(DatReport::parse(&bytes)?)
}

/// Writes `contents` to a file that must not exist yet.
pub fn write_new_file(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(IoError::FileExists(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    file.write_all(contents)?;
    info!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}
