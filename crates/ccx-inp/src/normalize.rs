//! Line normalization applied before segmentation or report scanning.

use std::borrow::Cow;

/// One source line after normalization, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

impl Line {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNormalizer {
    pub uppercase: bool,
    pub collapse_spaces: bool,
}

impl LineNormalizer {
    /// Deck input: case-insensitive, runs of blanks are not significant.
    pub const DECK: Self = Self {
        uppercase: true,
        collapse_spaces: true,
    };

    /// Report input: headers are matched literally, so case is kept.
    pub const REPORT: Self = Self {
        uppercase: false,
        collapse_spaces: false,
    };

    pub fn normalize(&self, raw: &[u8]) -> Vec<Line> {
        let text = String::from_utf8_lossy(raw);
        self.normalize_str(&text)
    }

    pub fn normalize_str(&self, raw: &str) -> Vec<Line> {
        raw.split('\n')
            .enumerate()
            .map(|(i, line)| Line::new(i + 1, self.normalize_line(line)))
            .collect()
    }

    fn normalize_line(&self, line: &str) -> String {
        let trimmed = strip_cr(line);
        let trimmed = trimmed.trim();
        let collapsed = if self.collapse_spaces {
            collapse_blanks(trimmed)
        } else {
            Cow::Borrowed(trimmed)
        };
        if self.uppercase {
            collapsed.to_uppercase()
        } else {
            collapsed.into_owned()
        }
    }
}

fn strip_cr(line: &str) -> Cow<'_, str> {
    if line.contains('\r') {
        Cow::Owned(line.replace('\r', ""))
    } else {
        Cow::Borrowed(line)
    }
}

/// Replaces every run of spaces/tabs with a single space.
pub fn collapse_blanks(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_whitespace() && w[1].is_ascii_whitespace())
        || text.contains('\t');
    if !needs_work {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !previous_blank {
                out.push(' ');
            }
            previous_blank = true;
        } else {
            out.push(ch);
            previous_blank = false;
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_mode_uppercases_and_collapses() {
        let lines = LineNormalizer::DECK.normalize(b"*node,  nset=Nall\r\n1,\t0.5d0,   0, 0\r\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "*NODE, NSET=NALL");
        assert_eq!(lines[1].text, "1, 0.5D0, 0, 0");
        assert_eq!(lines[1].number, 2);
        assert!(lines[2].is_blank());
    }

    #[test]
    fn report_mode_keeps_case_and_inner_spacing() {
        let lines = LineNormalizer::REPORT
            .normalize_str(" displacements (vx,vy,vz) for set NALL and time  0.1000000E+01\r");
        assert_eq!(
            lines[0].text,
            "displacements (vx,vy,vz) for set NALL and time  0.1000000E+01"
        );
    }

    #[test]
    fn collapse_leaves_single_spaces_untouched() {
        assert!(matches!(collapse_blanks("A B C"), Cow::Borrowed(_)));
        assert_eq!(collapse_blanks("A  \t B"), "A B");
    }
}
