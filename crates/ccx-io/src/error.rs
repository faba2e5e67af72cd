//! Error types for ccx-io

use std::fmt;
use std::path::PathBuf;

use ccx_inp::ParseFailure;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Parse(#[from] ParseFailure),

    #[error("{0}")]
    Dat(#[from] DatFailure),

    #[error("refusing to overwrite existing file {}", .0.display())]
    FileExists(PathBuf),
}

/// A problem found while scanning a `.dat` report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatError {
    /// A section header whose set name or time could not be read.
    #[error("line {line}: {message}: `{text}`")]
    Header {
        line: usize,
        message: String,
        text: String,
    },

    #[error("line {line}: {message}: `{text}`")]
    Row {
        line: usize,
        message: String,
        text: String,
    },

    /// A non-blank line no section claimed.
    #[error("line {line}: unrecognized report line `{text}`")]
    Residue { line: usize, text: String },
}

impl DatError {
    pub fn line(&self) -> usize {
        match self {
            DatError::Header { line, .. }
            | DatError::Row { line, .. }
            | DatError::Residue { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatFailure {
    pub errors: Vec<DatError>,
}

impl fmt::Display for DatFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) while scanning report", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DatFailure {}
