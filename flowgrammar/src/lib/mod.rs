#![allow(clippy::new_without_default)]
#![forbid(unsafe_code)]

//! The data model shared by [`flowlex`](https://docs.rs/flowlex) and
//! [`flowpar`](https://docs.rs/flowpar). Neither crate is a language in itself: together they are
//! machinery for building the frontend of one, driven entirely by tables of rules.
//!
//! Terminology is kept deliberately small:
//!
//!   * A *rule* describes one lexical pattern (a start literal, optionally an end literal).
//!   * A *production* describes one grammar reduction over a sequence of tokens.
//!   * A *token* is a typed node with optional delimiters, leaf data, and owned children.
//!   * A *token forest* is the ordered list of root tokens that remains after all reductions.
//!   * A *flow* is a priority-ordered list of *passes*; every pass at one priority runs before
//!     any pass at the next priority.
//!
//! This crate makes the following guarantees:
//!
//!   * A composite token's line span and end index always derive from its first and last child;
//!     every method which mutates children re-derives them.
//!   * Rule and production indices can be infallibly converted into `usize` (see
//!     [`RuleIdx`] and [`ProdIdx`]).
//!   * [`Flow`] iterates in ascending priority and, within one priority, in registration order.

pub mod flow;
mod idxnewtype;
pub mod newlinecache;
pub mod span;
pub mod token;

pub use crate::{
    flow::{Flow, Priority},
    idxnewtype::{ProdIdx, RuleIdx},
    newlinecache::NewlineCache,
    span::Span,
    token::{forest_text, KindSet, Token, TokenKind},
};
