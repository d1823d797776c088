use flowgrammar::{KindSet, Token, TokenKind};
use indexmap::IndexSet;

/// Retypes tokens by kind, optionally only those with particular data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeMarker {
    pub from: KindSet,
    pub to: TokenKind,
    /// Data values compared exactly.
    pub data: Vec<String>,
    /// Data values compared case-insensitively.
    pub data_ignore_case: Vec<String>,
}

impl TypeMarker {
    /// Retype every token whose kind is in `from` to `to`.
    pub fn new<K: Into<TokenKind>>(from: KindSet, to: K) -> Self {
        TypeMarker {
            from,
            to: to.into(),
            data: Vec::new(),
            data_ignore_case: Vec::new(),
        }
    }

    /// Restrict retyping to tokens whose data is one of `data`.
    pub fn data<I, S>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.extend(data.into_iter().map(Into::into));
        self
    }

    /// Restrict retyping to tokens whose data is, ignoring case, one of `data`.
    pub fn data_ignore_case<I, S>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_ignore_case
            .extend(data.into_iter().map(|s| s.into().to_lowercase()));
        self
    }
}

/// Apply `marker` to the top-level tokens of `toks`. If the marker has data filters, a token is
/// retyped when its data passes either of them.
pub fn mark_type(toks: &mut [Token], marker: &TypeMarker) {
    let filtered = !marker.data.is_empty() || !marker.data_ignore_case.is_empty();
    for t in toks.iter_mut().filter(|t| marker.from.contains(&t.kind)) {
        if !filtered
            || marker.data.contains(&t.data)
            || marker.data_ignore_case.contains(&t.data.to_lowercase())
        {
            t.kind = marker.to.clone();
        }
    }
}

/// Promote the top-level tokens of kind `source` whose data is one of `keywords` to
/// [`TokenKind::Keyword`]. With `ignore_case`, comparison ignores case and the keyword kind
/// carries the lower-cased data.
pub fn mark_keyword<I, S>(toks: &mut [Token], keywords: I, source: &TokenKind, ignore_case: bool)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let keywords = keywords
        .into_iter()
        .map(|k| {
            if ignore_case {
                k.as_ref().to_lowercase()
            } else {
                k.as_ref().to_owned()
            }
        })
        .collect::<IndexSet<_>>();
    for t in toks.iter_mut().filter(|t| &t.kind == source) {
        let data = if ignore_case {
            t.data.to_lowercase()
        } else {
            t.data.clone()
        };
        if keywords.contains(&data) {
            t.kind = TokenKind::Keyword(data);
        }
    }
}
