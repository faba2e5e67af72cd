//! Numeric literals and field splitting for deck data lines.

use crate::error::InpError;
use crate::normalize::Line;

/// Parses a finite real literal, accepting the Fortran `D` exponent marker.
/// `NAN`, `INF` and friends are rejected.
pub fn parse_real(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let value: f64 = if token.contains(['D', 'd']) {
        token.replace(['D', 'd'], "E").parse().ok()?
    } else {
        token.parse().ok()?
    };
    value.is_finite().then_some(value)
}

pub fn parse_integer(token: &str) -> Option<i64> {
    let token = token.trim();
    token.strip_prefix('+').unwrap_or(token).parse().ok()
}

/// Comma-separated fields, trimmed. Interior empty fields are kept
/// (`0.5,,STEEL` has three fields); a trailing empty field is dropped.
pub fn fields(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = text.split(',').map(str::trim).collect();
    while out.last().is_some_and(|f| f.is_empty()) {
        out.pop();
    }
    out
}

/// Tokens separated by commas and/or blanks, empties dropped.
pub fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

impl Line {
    pub fn real(&self, token: &str) -> Result<f64, InpError> {
        parse_real(token).ok_or_else(|| self.error(format!("invalid real literal `{token}`")))
    }

    pub fn integer(&self, token: &str) -> Result<i64, InpError> {
        parse_integer(token).ok_or_else(|| self.error(format!("invalid integer literal `{token}`")))
    }

    pub fn error(&self, message: impl Into<String>) -> InpError {
        InpError::Field {
            line: self.number,
            message: message.into(),
            source_line: self.text.clone(),
        }
    }
}

/// Scientific notation with a two-digit signed exponent: `1.50000000E-03`.
/// With `signed`, non-negative values carry a leading `+`.
pub fn format_scientific(value: f64, digits: usize, signed: bool) -> String {
    let raw = format!("{value:.digits$e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let lead = if signed && !mantissa.starts_with('-') { "+" } else { "" };
    format!("{lead}{mantissa}E{sign}{:02}", exponent.abs())
}
