use flowgrammar::{KindSet, Token, TokenKind};
use indexmap::IndexMap;

/// Exact-text constraints on a token. Fields left as `None` accept anything.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordRule {
    pub start: Option<String>,
    pub data: Option<String>,
    pub end: Option<String>,
}

impl WordRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<S: Into<String>>(mut self, start: S) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn data<S: Into<String>>(mut self, data: S) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn end<S: Into<String>>(mut self, end: S) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Does `tok` satisfy every constraint set on this rule?
    pub fn is_same(&self, tok: &Token) -> bool {
        fn field(want: &Option<String>, got: Option<&str>) -> bool {
            want.as_deref().map_or(true, |w| got == Some(w))
        }
        field(&self.start, tok.start.as_deref())
            && field(&self.data, Some(tok.data.as_str()))
            && field(&self.end, tok.end.as_deref())
    }
}

/// A predicate over one token: kind membership, optionally narrowed by a [`WordRule`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LexicalFactor {
    pub kinds: KindSet,
    pub word: Option<WordRule>,
    /// When this is the last factor of a production, running out of tokens before reaching it
    /// completes the production anyway.
    pub allow_end: bool,
}

impl LexicalFactor {
    /// A factor accepting any token.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind<K: Into<TokenKind>>(kind: K) -> Self {
        LexicalFactor {
            kinds: KindSet::from(kind.into()),
            ..Self::default()
        }
    }

    /// A factor accepting any of `kinds`. An empty list accepts every kind.
    pub fn of<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TokenKind>,
    {
        LexicalFactor {
            kinds: KindSet::of(kinds),
            ..Self::default()
        }
    }

    pub fn word(mut self, word: WordRule) -> Self {
        self.word = Some(word);
        self
    }

    /// Shorthand for `.word(WordRule::new().data(data))`.
    pub fn data<S: Into<String>>(self, data: S) -> Self {
        self.word(WordRule::new().data(data))
    }

    pub fn allow_end(mut self, flag: bool) -> Self {
        self.allow_end = flag;
        self
    }

    pub fn matches(&self, tok: &Token) -> bool {
        self.kinds.contains(&tok.kind) && self.word.as_ref().map_or(true, |w| w.is_same(tok))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    /// Each factor must match one token, in order.
    Sequence,
    /// A span from a token matching the first factor to one matching the last factor. With
    /// `nesting`, inner opens and closes are counted and the span only ends once they balance;
    /// otherwise it ends at the first closing token.
    Paired { nesting: bool },
}

/// What to do to the kind of the token matched at one position of a production.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeRewrite {
    Keep,
    Set(TokenKind),
    /// Replace kinds found in the table; leave other kinds alone.
    Remap(IndexMap<TokenKind, TokenKind>),
}

/// Make one matched token the reduced node itself, rather than wrapping all matched tokens in a
/// new node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Merge {
    /// Position, within the production, of the token to reuse. Only composite tokens are reused.
    pub father: usize,
    /// Only reuse the token if it already has the production's status.
    pub same_kind_only: bool,
}

/// A grammar production.
#[derive(Clone, Debug)]
pub struct SyntaxFactor {
    pub status: TokenKind,
    pub factors: Vec<LexicalFactor>,
    pub shape: Shape,
    /// Paired only: re-run the whole parser over the span's interior.
    pub recursion: bool,
    /// Paired only: leave the opening token outside, as a sibling preceding the new node.
    pub prefix_outside: bool,
    /// Paired only: leave the closing token outside, as a sibling following the new node.
    pub suffix_outside: bool,
    /// Paired only: treat the opening token as part of the interior.
    pub prefix_match: bool,
    /// Paired only: treat the closing token as part of the interior.
    pub suffix_match: bool,
    pub rewrite: Vec<TypeRewrite>,
    pub merge: Option<Merge>,
}

impl SyntaxFactor {
    fn new<K: Into<TokenKind>>(status: K, factors: Vec<LexicalFactor>, shape: Shape) -> Self {
        SyntaxFactor {
            status: status.into(),
            factors,
            shape,
            recursion: false,
            prefix_outside: false,
            suffix_outside: false,
            prefix_match: false,
            suffix_match: false,
            rewrite: Vec::new(),
            merge: None,
        }
    }

    pub fn sequence<K: Into<TokenKind>>(status: K, factors: Vec<LexicalFactor>) -> Self {
        Self::new(status, factors, Shape::Sequence)
    }

    /// A span ending at the first token after `open` which matches `close`.
    pub fn paired<K: Into<TokenKind>>(status: K, open: LexicalFactor, close: LexicalFactor) -> Self {
        Self::new(status, vec![open, close], Shape::Paired { nesting: false })
    }

    /// A span ending where the number of tokens matching `close` catches up with the number
    /// matching `open`.
    pub fn nested_pair<K: Into<TokenKind>>(
        status: K,
        open: LexicalFactor,
        close: LexicalFactor,
    ) -> Self {
        Self::new(status, vec![open, close], Shape::Paired { nesting: true })
    }

    pub fn recursive(mut self, flag: bool) -> Self {
        self.recursion = flag;
        self
    }

    pub fn prefix_outside(mut self, flag: bool) -> Self {
        self.prefix_outside = flag;
        self
    }

    pub fn suffix_outside(mut self, flag: bool) -> Self {
        self.suffix_outside = flag;
        self
    }

    pub fn prefix_match(mut self, flag: bool) -> Self {
        self.prefix_match = flag;
        self
    }

    pub fn suffix_match(mut self, flag: bool) -> Self {
        self.suffix_match = flag;
        self
    }

    pub fn rewrite(mut self, rewrite: Vec<TypeRewrite>) -> Self {
        self.rewrite = rewrite;
        self
    }

    pub fn merge_into(mut self, father: usize, same_kind_only: bool) -> Self {
        self.merge = Some(Merge {
            father,
            same_kind_only,
        });
        self
    }

    pub fn is_paired(&self) -> bool {
        matches!(self.shape, Shape::Paired { .. })
    }

    /// The factor an opening token must match. For sequences, the first factor.
    pub(crate) fn open(&self) -> &LexicalFactor {
        &self.factors[0]
    }

    /// The factor a closing token must match. For sequences, the last factor.
    pub(crate) fn close(&self) -> &LexicalFactor {
        &self.factors[self.factors.len() - 1]
    }
}

/// Apply `rewrite` to `toks` position by position.
pub(crate) fn apply_rewrite(rewrite: &[TypeRewrite], toks: &mut [Token]) {
    for (t, rw) in toks.iter_mut().zip(rewrite) {
        match rw {
            TypeRewrite::Keep => (),
            TypeRewrite::Set(k) => t.kind = k.clone(),
            TypeRewrite::Remap(m) => {
                if let Some(k) = m.get(&t.kind) {
                    t.kind = k.clone();
                }
            }
        }
    }
}
