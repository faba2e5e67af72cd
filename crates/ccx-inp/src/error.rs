//! Error types for deck segmentation and directive parsing.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Maximum number of block lines quoted in an error preview.
pub const PREVIEW_LINES: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InpError {
    /// Malformed compound-region pairing or data before the first directive.
    #[error("line {line}: {message}\n{preview}")]
    Segmentation {
        line: usize,
        message: String,
        preview: String,
    },

    #[error("line {line}: no parser for directive `*{keyword}`\n{preview}")]
    UnknownDirective {
        line: usize,
        keyword: String,
        preview: String,
    },

    /// Wrong field count, malformed literal or missing data.
    #[error("line {line}: {message}: `{source_line}`")]
    Field {
        line: usize,
        message: String,
        source_line: String,
    },

    #[error("line {line}: *{directive} does not accept parameter `{key}`")]
    UnknownParameter {
        line: usize,
        directive: String,
        key: String,
    },

    /// A directive parser rejected its block; `causes` holds what it found.
    #[error("line {line}: *{keyword} block rejected: {}\n{preview}", render_causes(.causes))]
    Block {
        line: usize,
        keyword: String,
        preview: String,
        causes: Vec<InpError>,
    },
}

impl InpError {
    pub fn line(&self) -> usize {
        match self {
            InpError::Segmentation { line, .. }
            | InpError::UnknownDirective { line, .. }
            | InpError::Field { line, .. }
            | InpError::UnknownParameter { line, .. }
            | InpError::Block { line, .. } => *line,
        }
    }

    /// Innermost errors, with every `Block` wrapper flattened away.
    pub fn leaves(&self) -> Vec<&InpError> {
        match self {
            InpError::Block { causes, .. } => causes.iter().flat_map(|c| c.leaves()).collect(),
            other => vec![other],
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(
            self,
            InpError::Field { .. } | InpError::UnknownParameter { .. }
        )
    }
}

fn render_causes(causes: &[InpError]) -> String {
    match causes {
        [single] => single.to_string(),
        many => many
            .iter()
            .map(|c| format!("\n  - {}", c.to_string().replace('\n', "\n    ")))
            .collect(),
    }
}

/// The complete, ordered list of errors found while parsing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub errors: Vec<InpError>,
}

impl ParseFailure {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error(s) while parsing deck", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseFailure {}
