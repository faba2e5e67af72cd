//! Splits normalized lines into directive blocks and folds compound regions.

use tracing::debug;

use crate::error::{InpError, PREVIEW_LINES};
use crate::header::{is_directive, keyword_of};
use crate::normalize::Line;

pub const STEP_OPEN: &str = "STEP";
pub const STEP_CLOSE: &str = "END STEP";

/// A directive line followed by its data lines. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    lines: Vec<Line>,
}

impl Block {
    pub fn new(header: Line) -> Self {
        Self {
            lines: vec![header],
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn header(&self) -> &Line {
        &self.lines[0]
    }

    pub fn data(&self) -> &[Line] {
        &self.lines[1..]
    }

    pub fn keyword(&self) -> &str {
        keyword_of(&self.header().text)
    }

    pub fn is(&self, keyword: &str) -> bool {
        self.keyword() == keyword
    }

    pub fn line_number(&self) -> usize {
        self.header().number
    }

    pub fn preview(&self) -> String {
        self.lines
            .iter()
            .take(PREVIEW_LINES)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    fn absorb(&mut self, other: Block) {
        self.lines.extend(other.lines);
    }
}

pub fn is_comment(text: &str) -> bool {
    text.starts_with("**") || text.starts_with(">**")
}

/// Generic segmentation without compound folding.
pub fn split_blocks(lines: &[Line]) -> (Vec<Block>, Vec<InpError>) {
    let mut blocks: Vec<Block> = Vec::new();
    let mut errors = Vec::new();
    let mut orphans: Vec<&Line> = Vec::new();

    for line in lines {
        let text = line.text.trim();
        if text.is_empty() || is_comment(text) {
            continue;
        }
        if is_directive(text) {
            blocks.push(Block::new(Line::new(line.number, text)));
            continue;
        }
        let Some(current) = blocks.last_mut() else {
            orphans.push(line);
            continue;
        };
        if text.starts_with(',') && current.lines.len() == 1 {
            current.lines[0].text.push_str(text);
        } else {
            current.push(Line::new(line.number, text));
        }
    }

    if let Some(first) = orphans.first() {
        errors.push(InpError::Segmentation {
            line: first.number,
            message: format!("{} data line(s) before the first directive", orphans.len()),
            preview: orphans
                .iter()
                .take(PREVIEW_LINES)
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        });
    }
    (blocks, errors)
}

/// Folds every `*open` block and the blocks after it, up to and including
/// the `*close` block, into one block. Regions must not nest.
pub fn fold_compound(
    blocks: Vec<Block>,
    open: &str,
    close: &str,
    errors: &mut Vec<InpError>,
) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut region: Option<Block> = None;

    for block in blocks {
        if block.is(open) {
            if let Some(abandoned) = region.take() {
                errors.push(InpError::Segmentation {
                    line: abandoned.line_number(),
                    message: format!(
                        "*{open} opened again at line {} before *{close}",
                        block.line_number()
                    ),
                    preview: abandoned.preview(),
                });
            }
            region = Some(block);
        } else if block.is(close) {
            match region.take() {
                Some(mut current) => {
                    current.absorb(block);
                    debug!(
                        line = current.line_number(),
                        lines = current.lines.len(),
                        "folded *{open} region"
                    );
                    out.push(current);
                }
                None => errors.push(InpError::Segmentation {
                    line: block.line_number(),
                    message: format!("*{close} without matching *{open}"),
                    preview: block.preview(),
                }),
            }
        } else if let Some(current) = region.as_mut() {
            current.absorb(block);
        } else {
            out.push(block);
        }
    }

    if let Some(unclosed) = region {
        errors.push(InpError::Segmentation {
            line: unclosed.line_number(),
            message: format!("*{open} is never closed by *{close}"),
            preview: unclosed.preview(),
        });
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct Segmented {
    pub blocks: Vec<Block>,
    pub errors: Vec<InpError>,
}

/// Segments a deck: generic split, then `*STEP` / `*END STEP` folding.
pub fn segment(lines: &[Line]) -> Segmented {
    let (blocks, mut errors) = split_blocks(lines);
    let blocks = fold_compound(blocks, STEP_OPEN, STEP_CLOSE, &mut errors);
    debug!(blocks = blocks.len(), errors = errors.len(), "segmented deck");
    Segmented { blocks, errors }
}
