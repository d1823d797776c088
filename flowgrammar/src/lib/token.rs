use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The type tag of a [`Token`].
///
/// Rule and production labels are open-ended (they come from a grammar definition), so they are
/// carried as `Named`. The two kinds the engines themselves create get their own variants.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub enum TokenKind {
    /// A run of input which no rule matched. Displayed as `any`.
    Any,
    /// A rule or production label.
    Named(String),
    /// A literal promoted to a keyword. Displayed as `key:<value>`.
    Keyword(String),
}

impl TokenKind {
    pub fn named<S: Into<String>>(name: S) -> Self {
        TokenKind::Named(name.into())
    }

    pub fn keyword<S: Into<String>>(value: S) -> Self {
        TokenKind::Keyword(value.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TokenKind::Any)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Any => write!(f, "any"),
            TokenKind::Named(n) => write!(f, "{n}"),
            TokenKind::Keyword(k) => write!(f, "key:{k}"),
        }
    }
}

impl From<&str> for TokenKind {
    fn from(s: &str) -> Self {
        match s {
            "any" => TokenKind::Any,
            _ => TokenKind::Named(s.to_owned()),
        }
    }
}

impl From<String> for TokenKind {
    fn from(s: String) -> Self {
        if s == "any" {
            TokenKind::Any
        } else {
            TokenKind::Named(s)
        }
    }
}

/// A set of token kinds used as a predicate. `Wildcard` accepts every kind.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub enum KindSet {
    #[default]
    Wildcard,
    OneOf(Vec<TokenKind>),
}

impl KindSet {
    /// Build a set from `kinds`. An empty iterator yields [`KindSet::Wildcard`].
    pub fn of<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TokenKind>,
    {
        let kinds = kinds.into_iter().map(Into::into).collect::<Vec<_>>();
        if kinds.is_empty() {
            KindSet::Wildcard
        } else {
            KindSet::OneOf(kinds)
        }
    }

    pub fn contains(&self, kind: &TokenKind) -> bool {
        match self {
            KindSet::Wildcard => true,
            KindSet::OneOf(kinds) => kinds.contains(kind),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, KindSet::Wildcard)
    }
}

impl From<TokenKind> for KindSet {
    fn from(kind: TokenKind) -> Self {
        KindSet::OneOf(vec![kind])
    }
}

/// A node of the token forest.
///
/// Leaves come straight from the tokenizer: a literal rule puts the matched text in `data`; a
/// delimited rule puts its start text in `start`, its decoded content in `data` and its end
/// literal in `end`. Composite tokens (those with children) are created by nested tokenization
/// and by grammar reductions; their `end_index` and line span are derived from their first and
/// last child whenever the children change.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct Token {
    pub kind: TokenKind,
    pub start: Option<String>,
    pub data: String,
    pub end: Option<String>,
    children: Vec<Token>,
    end_index: usize,
    line_start: usize,
    line_end: usize,
}

impl Token {
    /// Create a leaf holding `data`. `end_index` is the byte offset one past the token's last
    /// byte in the original source.
    pub fn leaf<K, S>(kind: K, data: S, end_index: usize, line_start: usize, line_end: usize) -> Self
    where
        K: Into<TokenKind>,
        S: Into<String>,
    {
        Token {
            kind: kind.into(),
            start: None,
            data: data.into(),
            end: None,
            children: Vec::new(),
            end_index,
            line_start,
            line_end,
        }
    }

    /// Create a leaf for a delimited match.
    pub fn delimited<K, S>(
        kind: K,
        start: S,
        data: S,
        end: S,
        end_index: usize,
        line_start: usize,
        line_end: usize,
    ) -> Self
    where
        K: Into<TokenKind>,
        S: Into<String>,
    {
        Token {
            kind: kind.into(),
            start: Some(start.into()),
            data: data.into(),
            end: Some(end.into()),
            children: Vec::new(),
            end_index,
            line_start,
            line_end,
        }
    }

    /// Create a composite token owning `children`. A composite created with no children has no
    /// meaningful position until one is given with [`Token::with_position`] or a child is added.
    pub fn composite<K: Into<TokenKind>>(kind: K, children: Vec<Token>) -> Self {
        let mut t = Token {
            kind: kind.into(),
            start: None,
            data: String::new(),
            end: None,
            children,
            end_index: 0,
            line_start: 0,
            line_end: 0,
        };
        t.derive_position();
        t
    }

    /// Set this token's position. For a token with children the position is re-derived from
    /// them at the next mutation, so this is only meaningful for leaves and empty composites.
    pub fn with_position(mut self, end_index: usize, line_start: usize, line_end: usize) -> Self {
        self.end_index = end_index;
        self.line_start = line_start;
        self.line_end = line_end;
        self
    }

    pub fn children(&self) -> &[Token] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Byte offset one past this token's last byte in the original source.
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    pub fn line_start(&self) -> usize {
        self.line_start
    }

    pub fn line_end(&self) -> usize {
        self.line_end
    }

    /// The inclusive line range `(line_start, line_end)` this token covers.
    pub fn lines(&self) -> (usize, usize) {
        (self.line_start, self.line_end)
    }

    pub fn push_child(&mut self, child: Token) {
        self.children.push(child);
        self.derive_position();
    }

    pub fn extend_children<I: IntoIterator<Item = Token>>(&mut self, children: I) {
        self.children.extend(children);
        self.derive_position();
    }

    /// Insert `children`, in order, before this token's existing children.
    pub fn prepend_children(&mut self, children: Vec<Token>) {
        if children.is_empty() {
            return;
        }
        self.children.splice(0..0, children);
        self.derive_position();
    }

    /// Remove and return every child. The token keeps the position it had.
    pub fn take_children(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.children)
    }

    /// Shift the end index of this token and its whole subtree `delta` bytes to the right.
    pub fn rebase(&mut self, delta: usize) {
        self.end_index += delta;
        for c in &mut self.children {
            c.rebase(delta);
        }
    }

    /// Reconstruct the source text this token covers. Composites concatenate their children;
    /// leaves are `start + data + end`. Escape-decoded content is reproduced decoded.
    pub fn text(&self) -> String {
        let mut s = String::new();
        self.write_text(&mut s);
        s
    }

    fn write_text(&self, out: &mut String) {
        if self.children.is_empty() {
            if let Some(ref start) = self.start {
                out.push_str(start);
            }
            out.push_str(&self.data);
            if let Some(ref end) = self.end {
                out.push_str(end);
            }
        } else {
            for c in &self.children {
                c.write_text(out);
            }
        }
    }

    fn derive_position(&mut self) {
        if let (Some(first), Some(last)) = (self.children.first(), self.children.last()) {
            self.line_start = first.line_start;
            self.line_end = last.line_end;
            self.end_index = last.end_index;
        }
    }
}

/// Concatenate the source text of every token in `tokens`.
pub fn forest_text(tokens: &[Token]) -> String {
    let mut s = String::new();
    for t in tokens {
        t.write_text(&mut s);
    }
    s
}
