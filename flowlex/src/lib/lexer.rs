use std::{slice::Iter, sync::Arc};

use flowgrammar::{RuleIdx, TokenKind};

use crate::{
    matcher::{LexMatch, ParserMatch},
    tokenizer::Tokenizer,
    trie::PrefixTrie,
    LexBuildError, LexBuildErrorKind, LexBuildResult, LexResult,
};

/// Which rule table re-tokenizes the content of a [`Nested`] rule.
#[derive(Clone, Debug)]
pub enum NestedTarget {
    /// The table the rule itself belongs to.
    SameDef,
    Def(Arc<LexerDef>),
}

/// Re-tokenization of a delimited rule's content.
#[derive(Clone, Debug)]
pub struct Nested {
    pub target: NestedTarget,
    /// If `true`, the whole match (delimiters included) is re-tokenized and the resulting tokens
    /// are spliced in place of the match. Otherwise the start and end delimiters become tokens of
    /// their own around the re-tokenized content, all wrapped in one composite token.
    pub with_delimiters: bool,
    /// The kind of the wrapping composite token. Defaults to the rule's own kind.
    pub wrap_kind: Option<TokenKind>,
}

impl Nested {
    /// Re-tokenize content with the rule's own table.
    pub fn same() -> Self {
        Nested {
            target: NestedTarget::SameDef,
            with_delimiters: false,
            wrap_kind: None,
        }
    }

    /// Re-tokenize content with another table.
    pub fn with(def: Arc<LexerDef>) -> Self {
        Nested {
            target: NestedTarget::Def(def),
            with_delimiters: false,
            wrap_kind: None,
        }
    }

    pub fn with_delimiters(mut self, flag: bool) -> Self {
        self.with_delimiters = flag;
        self
    }

    pub fn wrap_kind<K: Into<TokenKind>>(mut self, kind: K) -> Self {
        self.wrap_kind = Some(kind.into());
        self
    }
}

/// A lexical rule. Rules are immutable once added to a [`LexerDef`].
#[derive(Clone, Debug)]
pub struct TokenRule {
    pub kind: TokenKind,
    pub start: String,
    /// If `None`, the rule matches its start literal only.
    pub end: Option<String>,
    /// Decode `\\`, `\n` and `\t` in the content. Other escaped characters are kept as
    /// backslash plus character, and an escaped character never completes an end literal.
    pub escape: bool,
    /// Match the start literal case-insensitively.
    pub ignore_case: bool,
    pub nested: Option<Nested>,
    /// Inner open and close markers. When set, the end literal only completes the match once as
    /// many close markers as open markers (the start literal counting as the first open) have
    /// been seen.
    pub pair: Option<(String, String)>,
}

impl TokenRule {
    pub fn literal<K: Into<TokenKind>, S: Into<String>>(kind: K, start: S) -> Self {
        TokenRule {
            kind: kind.into(),
            start: start.into(),
            end: None,
            escape: false,
            ignore_case: false,
            nested: None,
            pair: None,
        }
    }

    pub fn delimited<K, S, E>(kind: K, start: S, end: E) -> Self
    where
        K: Into<TokenKind>,
        S: Into<String>,
        E: Into<String>,
    {
        TokenRule {
            end: Some(end.into()),
            ..TokenRule::literal(kind, start)
        }
    }

    pub fn escape(mut self, flag: bool) -> Self {
        self.escape = flag;
        self
    }

    pub fn ignore_case(mut self, flag: bool) -> Self {
        self.ignore_case = flag;
        self
    }

    pub fn nested(mut self, nested: Nested) -> Self {
        self.nested = Some(nested);
        self
    }

    pub fn pair<O: Into<String>, C: Into<String>>(mut self, open: O, close: C) -> Self {
        self.pair = Some((open.into(), close.into()));
        self
    }

    fn validate(&self) -> Result<(), LexBuildErrorKind> {
        if self.start.is_empty() {
            return Err(LexBuildErrorKind::EmptyStart);
        }
        if let Some(ref end) = self.end {
            if end.is_empty() {
                return Err(LexBuildErrorKind::EmptyEnd);
            }
        }
        if let Some((ref open, ref close)) = self.pair {
            if self.end.is_none() {
                return Err(LexBuildErrorKind::PairWithoutEnd);
            }
            if open.is_empty() || close.is_empty() {
                return Err(LexBuildErrorKind::EmptyPairMarker);
            }
            if open == close {
                return Err(LexBuildErrorKind::IdenticalPairMarkers);
            }
        }
        if let Some(ref nested) = self.nested {
            if self.end.is_none() {
                return Err(LexBuildErrorKind::NestedWithoutEnd);
            }
            if nested.with_delimiters && matches!(nested.target, NestedTarget::SameDef) {
                return Err(LexBuildErrorKind::SelfNestedWithDelimiters);
            }
        }
        Ok(())
    }
}

/// A table of lexical rules. From it one can [`match_at`](LexerDef::match_at) a single position
/// or tokenize a whole input with a [`Tokenizer`].
#[derive(Debug)]
pub struct LexerDef {
    rules: Vec<TokenRule>,
    trie: PrefixTrie,
}

impl LexerDef {
    pub fn new() -> Self {
        LexerDef {
            rules: Vec::new(),
            trie: PrefixTrie::new(),
        }
    }

    /// Add `rule` to the table. When two rules complete at the same character, the one added
    /// later takes precedence.
    pub fn add_rule(&mut self, rule: TokenRule) -> LexBuildResult<RuleIdx> {
        if let Err(kind) = rule.validate() {
            return Err(LexBuildError {
                kind,
                rule: rule.start,
            });
        }
        let ridx = match RuleIdx::from_usize(self.rules.len()) {
            Some(ridx) => ridx,
            None => {
                return Err(LexBuildError {
                    kind: LexBuildErrorKind::TooManyRules,
                    rule: rule.start,
                })
            }
        };
        self.trie.insert(&rule.start, rule.ignore_case, ridx);
        self.rules.push(rule);
        Ok(ridx)
    }

    /// Add one literal rule of kind `kind` per element of `literals`.
    pub fn add_token<K: Into<TokenKind>>(
        &mut self,
        kind: K,
        literals: &[&str],
    ) -> LexBuildResult<Vec<RuleIdx>> {
        let kind = kind.into();
        literals
            .iter()
            .map(|l| self.add_rule(TokenRule::literal(kind.clone(), *l)))
            .collect()
    }

    /// Add a delimited rule with escape decoding enabled, the usual shape of string literals.
    pub fn add_combination<K, S, E>(&mut self, kind: K, start: S, end: E) -> LexBuildResult<RuleIdx>
    where
        K: Into<TokenKind>,
        S: Into<String>,
        E: Into<String>,
    {
        self.add_rule(TokenRule::delimited(kind, start, end).escape(true))
    }

    /// Get the rule at index `ridx`.
    pub fn get_rule(&self, ridx: RuleIdx) -> Option<&TokenRule> {
        self.rules.get(usize::from(ridx))
    }

    /// Get the first rule of kind `kind`.
    pub fn get_rule_by_kind(&self, kind: &TokenKind) -> Option<&TokenRule> {
        self.rules.iter().find(|r| &r.kind == kind)
    }

    pub(crate) fn rule(&self, ridx: RuleIdx) -> &TokenRule {
        &self.rules[usize::from(ridx)]
    }

    pub(crate) fn trie(&self) -> &PrefixTrie {
        &self.trie
    }

    pub fn rules_len(&self) -> usize {
        self.rules.len()
    }

    /// Returns an iterator over all rules in this table, in registration order.
    pub fn iter_rules(&self) -> Iter<TokenRule> {
        self.rules.iter()
    }

    /// Scan `src` from byte `index` and return every match completed, in completion order. The
    /// last element is the authoritative match at `index`. Rules still unterminated at the end of
    /// the input are not reported, and an `index` which is not a character boundary of `src`
    /// yields no matches.
    pub fn match_at(&self, src: &str, index: usize) -> Vec<LexMatch> {
        let mut out = Vec::new();
        ParserMatch::new(self).scan(src, index, &mut out);
        out
    }

    /// Tokenize `src` with default settings apart from those given. `line_offset` is the line
    /// number of the first line of `src`.
    pub fn to_token<K: Into<TokenKind>>(
        &self,
        src: &str,
        any_kind: K,
        skip_kinds: &[TokenKind],
        line_offset: usize,
    ) -> LexResult<Vec<flowgrammar::Token>> {
        self.tokenizer()
            .any_kind(any_kind)
            .skip_kinds(skip_kinds.iter().cloned())
            .line_offset(line_offset)
            .tokenize(src)
    }

    /// Create a [`Tokenizer`] for this table with default settings.
    pub fn tokenizer(&self) -> Tokenizer<'_> {
        Tokenizer::new(self)
    }
}
