//! Lexical layer for CalculiX/Abaqus `.inp` decks: line normalization,
//! directive segmentation, header parameters and numeric literals.

pub mod error;
pub mod header;
pub mod normalize;
pub mod number;
pub mod segment;

pub use error::{InpError, ParseFailure, PREVIEW_LINES};
pub use header::{Header, Parameter, Parameters, keyword_of, matches_keyword, parse_header};
pub use normalize::{Line, LineNormalizer};
pub use number::{fields, format_scientific, parse_integer, parse_real, tokens};
pub use segment::{Block, Segmented, fold_compound, segment, split_blocks};
