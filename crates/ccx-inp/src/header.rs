//! Directive header parsing: keyword matching and `KEY=VALUE` parameters.

use serde::{Deserialize, Serialize};

use crate::error::InpError;
use crate::normalize::Line;
use crate::number::{parse_integer, parse_real};

pub const DIRECTIVE_MARKER: char = '*';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

impl Parameter {
    pub fn render(&self) -> String {
        match &self.value {
            Some(v) => format!("{}={}", self.key, v),
            None => self.key.clone(),
        }
    }
}

/// Keyword of a directive line: the text before the first comma, without
/// the leading marker. `*NODE PRINT, NSET=A` yields `NODE PRINT`.
pub fn keyword_of(line: &str) -> &str {
    let head = match line.find(',') {
        Some(idx) => &line[..idx],
        None => line,
    };
    head.trim().trim_start_matches(DIRECTIVE_MARKER).trim()
}

pub fn is_directive(line: &str) -> bool {
    line.starts_with(DIRECTIVE_MARKER)
}

/// Exact keyword match; `NODE` does not match `*NODE PRINT`.
pub fn matches_keyword(line: &str, keyword: &str) -> bool {
    is_directive(line) && keyword_of(line).eq_ignore_ascii_case(keyword)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub keyword: String,
    pub parameters: Parameters,
}

pub fn parse_header(line: &Line) -> Result<Header, InpError> {
    let body = line.text.trim().trim_start_matches(DIRECTIVE_MARKER);
    let mut fields = split_unquoted_commas(body).into_iter();
    let keyword = fields.next().unwrap_or_default().to_ascii_uppercase();
    if keyword.is_empty() {
        return Err(InpError::Field {
            line: line.number,
            message: "empty directive keyword".to_string(),
            source_line: line.text.clone(),
        });
    }

    let items = fields
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = match field.split_once('=') {
                Some((k, v)) => (k, Some(v.trim().to_string())),
                None => (field, None),
            };
            Parameter {
                key: key.trim().to_ascii_uppercase(),
                value,
            }
        })
        .collect();

    Ok(Header {
        parameters: Parameters {
            directive: keyword.clone(),
            line: line.clone(),
            items,
        },
        keyword,
    })
}

/// Splits on commas outside single or double quotes; fields come back trimmed.
fn split_unquoted_commas(text: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(open), _) if open == ch => quote = None,
            (None, ',') => {
                fields.push(text[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    fields.push(text[start..].trim());
    fields
}

/// Parameters of one directive line. Parsers take what they understand and
/// call [`Parameters::finish`], which rejects anything left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    directive: String,
    line: Line,
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn take(&mut self, key: &str) -> Option<Parameter> {
        let idx = self.items.iter().position(|p| p.key == key)?;
        Some(self.items.remove(idx))
    }

    /// `KEY=VALUE`; a bare `KEY` without a value is an error.
    pub fn take_value(&mut self, key: &str) -> Result<Option<String>, InpError> {
        match self.take(key) {
            None => Ok(None),
            Some(Parameter { value: Some(v), .. }) if !v.is_empty() => Ok(Some(v)),
            Some(_) => Err(self.field_error(format!("parameter {key} requires a value"))),
        }
    }

    pub fn require_value(&mut self, key: &str) -> Result<String, InpError> {
        self.take_value(key)?
            .ok_or_else(|| self.field_error(format!("missing required parameter {key}")))
    }

    /// Bare flag such as `GENERATE`; a value is an error.
    pub fn take_flag(&mut self, key: &str) -> Result<bool, InpError> {
        match self.take(key) {
            None => Ok(false),
            Some(Parameter { value: None, .. }) => Ok(true),
            Some(_) => Err(self.field_error(format!("parameter {key} does not take a value"))),
        }
    }

    pub fn take_real(&mut self, key: &str) -> Result<Option<f64>, InpError> {
        match self.take_value(key)? {
            None => Ok(None),
            Some(raw) => parse_real(&raw)
                .map(Some)
                .ok_or_else(|| self.field_error(format!("invalid number `{raw}` for {key}"))),
        }
    }

    pub fn take_integer(&mut self, key: &str) -> Result<Option<i64>, InpError> {
        match self.take_value(key)? {
            None => Ok(None),
            Some(raw) => parse_integer(&raw)
                .map(Some)
                .ok_or_else(|| self.field_error(format!("invalid integer `{raw}` for {key}"))),
        }
    }

    /// Remaining parameters, for directives that pass them through verbatim.
    pub fn into_remaining(self) -> Vec<Parameter> {
        self.items
    }

    pub fn finish(self) -> Result<(), InpError> {
        match self.items.first() {
            None => Ok(()),
            Some(p) => Err(InpError::UnknownParameter {
                line: self.line.number,
                directive: self.directive,
                key: p.key.clone(),
            }),
        }
    }

    pub fn field_error(&self, message: String) -> InpError {
        InpError::Field {
            line: self.line.number,
            message,
            source_line: self.line.text.clone(),
        }
    }
}
