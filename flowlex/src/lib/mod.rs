//! `flowlex` turns source text into a flat (or, for nested rules, nested) list of
//! [`flowgrammar::Token`]s, driven by a table of declarative rules rather than regular
//! expressions. A rule is either a *literal* (a start string only) or *delimited* (a start string
//! and an end string, with optional escape decoding, nesting counters, and nested
//! re-tokenization of its content).
//!
//! All rules' start literals share one prefix trie, so at each position of the input every rule
//! is tried in a single forward scan. When several rules complete during one scan, the match
//! completed *last* wins: the match which extends furthest, and among matches ending at the same
//! character, the one registered last. Input which no rule matches is accumulated into runs of an
//! "any" kind, so tokenization never fails by default; [`Tokenizer`] can optionally be told to
//! report unterminated and unmatched input.
//!
//! ```text
//! let mut def = LexerDef::new();
//! def.add_token("op", &["+", "-"])?;
//! def.add_rule(TokenRule::delimited("string", "\"", "\"").escape(true))?;
//! let toks = def.tokenizer().skip_kind("ws").tokenize("a + \"b\"")?;
//! ```

#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

use std::{error::Error, fmt};

use flowgrammar::{Span, TokenKind};

mod lexer;
mod matcher;
mod tokenizer;
mod trie;

pub use crate::{
    lexer::{LexerDef, Nested, NestedTarget, TokenRule},
    matcher::{LexMatch, ParserMatch},
    tokenizer::{Tokenizer, DEFAULT_MAX_DEPTH},
};

pub type LexBuildResult<T> = Result<T, LexBuildError>;

/// Any error from registering a [`TokenRule`] returns an instance of this struct.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexBuildError {
    pub kind: LexBuildErrorKind,
    /// The start literal of the offending rule.
    pub rule: String,
}

impl Error for LexBuildError {}

/// The various different possible rule registration errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexBuildErrorKind {
    EmptyStart,
    EmptyEnd,
    EmptyPairMarker,
    IdenticalPairMarkers,
    PairWithoutEnd,
    NestedWithoutEnd,
    SelfNestedWithDelimiters,
    TooManyRules,
}

impl fmt::Display for LexBuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            LexBuildErrorKind::EmptyStart => "Rule has an empty start literal",
            LexBuildErrorKind::EmptyEnd => "Rule has an empty end literal",
            LexBuildErrorKind::EmptyPairMarker => "Rule has an empty nesting marker",
            LexBuildErrorKind::IdenticalPairMarkers => "Rule's nesting markers are identical",
            LexBuildErrorKind::PairWithoutEnd => "Rule has nesting markers but no end literal",
            LexBuildErrorKind::NestedWithoutEnd => "Rule re-tokenizes its content but has no end literal",
            LexBuildErrorKind::SelfNestedWithDelimiters => {
                "Rule re-tokenizes itself including its delimiters"
            }
            LexBuildErrorKind::TooManyRules => "Too many rules",
        };
        write!(f, "{s} (rule starting '{}')", self.rule)
    }
}

pub type LexResult<T> = Result<T, Vec<LexError>>;

/// A problem found while tokenizing. Only [`LexErrorKind::DepthExceeded`] is reported by default;
/// the other kinds are reported only when a [`Tokenizer`] is told to deny them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    /// The input which caused the error, in bytes relative to the whole input.
    pub span: Span,
    /// The line the error starts on.
    pub line: usize,
}

impl Error for LexError {}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LexErrorKind {
    /// A delimited rule of this kind started but its end literal was never found.
    Unterminated(TokenKind),
    /// Input which no rule matched.
    Unmatched,
    /// Nested re-tokenization went deeper than the configured maximum.
    DepthExceeded(usize),
}

impl LexError {
    pub(crate) fn shifted(mut self, delta: usize) -> Self {
        self.span = self.span.shift(delta);
        self
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            LexErrorKind::Unterminated(ref k) => write!(f, "Unterminated '{k}'")?,
            LexErrorKind::Unmatched => write!(f, "No rule matches")?,
            LexErrorKind::DepthExceeded(d) => write!(f, "Nesting deeper than {d} levels")?,
        }
        write!(
            f,
            " at line {} (bytes {}..{})",
            self.line,
            self.span.start(),
            self.span.end()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = LexError {
            kind: LexErrorKind::Unterminated(TokenKind::named("string")),
            span: Span::new(3, 9),
            line: 2,
        };
        assert_eq!(e.to_string(), "Unterminated 'string' at line 2 (bytes 3..9)");
        assert_eq!(e.shifted(4).span, Span::new(7, 13));
        let b = LexBuildError {
            kind: LexBuildErrorKind::EmptyEnd,
            rule: "/*".to_owned(),
        };
        assert_eq!(b.to_string(), "Rule has an empty end literal (rule starting '/*')");
    }
}
