//! `flowpar` reduces a flat list of [`flowgrammar::Token`]s into a token forest by repeatedly
//! collapsing grammar matches into composite tokens.
//!
//! Productions ([`SyntaxFactor`]s) are registered at a numeric priority. Parsing runs every
//! priority level in ascending order; within a level, the token list is scanned left to right
//! and, at each position, the production matching the longest span of tokens is reduced in place.
//! Scanning then resumes at the new composite token, so a production can immediately match again
//! over its own output. There is no backtracking: once a span has been reduced, it stays reduced.
//!
//! A production is either a fixed sequence of [`LexicalFactor`]s or a paired span from an opening
//! to a closing factor (optionally counting nested opens and closes). Paired productions may
//! re-run the whole parser over their interior, which is how nested constructs are parsed. Levels
//! may also hold arbitrary token-list transforms, such as keyword promotion.

#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

use std::{error::Error, fmt};

use flowgrammar::TokenKind;

mod factor;
mod matcher;
mod parser;
mod transform;

pub use crate::{
    factor::{LexicalFactor, Merge, Shape, SyntaxFactor, TypeRewrite, WordRule},
    parser::{SyntaxParser, DEFAULT_MAX_DEPTH},
    transform::{mark_keyword, mark_type, TypeMarker},
};

pub type SyntaxBuildResult<T> = Result<T, SyntaxBuildError>;

/// Any error from registering a [`SyntaxFactor`] returns an instance of this struct.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxBuildError {
    pub kind: SyntaxBuildErrorKind,
    /// The status of the offending production.
    pub status: TokenKind,
}

impl Error for SyntaxBuildError {}

/// The various different possible production registration errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyntaxBuildErrorKind {
    EmptyProduction,
    PairedTooShort,
    RecursiveSequence,
    WholeSpanRecursion,
    MergeOnPaired,
    MergeOutOfRange,
    RewriteTooLong,
    RewriteOnRecursive,
    TooManyProductions,
}

impl fmt::Display for SyntaxBuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            SyntaxBuildErrorKind::EmptyProduction => "Production has no factors",
            SyntaxBuildErrorKind::PairedTooShort => {
                "Paired production needs an opening and a closing factor"
            }
            SyntaxBuildErrorKind::RecursiveSequence => {
                "Only paired productions can parse their interior recursively"
            }
            SyntaxBuildErrorKind::WholeSpanRecursion => {
                "Recursive production includes both delimiters in its interior"
            }
            SyntaxBuildErrorKind::MergeOnPaired => "Paired productions cannot merge into a child",
            SyntaxBuildErrorKind::MergeOutOfRange => "Merge target is beyond the production's end",
            SyntaxBuildErrorKind::RewriteTooLong => "Type rewrite table is longer than the production",
            SyntaxBuildErrorKind::RewriteOnRecursive => {
                "Recursive productions cannot rewrite their children's types"
            }
            SyntaxBuildErrorKind::TooManyProductions => "Too many productions",
        };
        write!(f, "{s} (production '{}')", self.status)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A problem which stopped parsing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The inclusive line range of the span being reduced when the error occurred.
    pub lines: (usize, usize),
}

impl Error for ParseError {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// Recursive interior parsing went deeper than the configured maximum.
    DepthExceeded(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ParseErrorKind::DepthExceeded(d) => write!(f, "Nesting deeper than {d} levels")?,
        }
        if self.lines.0 == self.lines.1 {
            write!(f, " at line {}", self.lines.0)
        } else {
            write!(f, " at lines {}-{}", self.lines.0, self.lines.1)
        }
    }
}
