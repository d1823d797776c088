use flowgrammar::{NewlineCache, Span, Token, TokenKind};
use tracing::{debug, trace};
use vob::Vob;

use crate::{
    lexer::{LexerDef, NestedTarget, TokenRule},
    matcher::{LexMatch, ParserMatch},
    LexError, LexErrorKind, LexResult,
};

/// How deeply nested rules may re-tokenize their content unless told otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tokenizes whole inputs against a [`LexerDef`].
///
/// By default tokenization never fails: input no rule matches is gathered into runs of
/// `any_kind`, and a delimited token whose end literal never appears produces no token (its
/// characters are scanned again as ordinary input). Both situations can instead be reported as
/// errors with [`deny_unmatched`](Tokenizer::deny_unmatched) and
/// [`deny_unterminated`](Tokenizer::deny_unterminated). Nesting deeper than
/// [`max_depth`](Tokenizer::max_depth) is always an error.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    def: &'a LexerDef,
    any_kind: TokenKind,
    skip_kinds: Vec<TokenKind>,
    line_offset: usize,
    max_depth: usize,
    deny_unterminated: bool,
    deny_unmatched: bool,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(def: &'a LexerDef) -> Self {
        Tokenizer {
            def,
            any_kind: TokenKind::Any,
            skip_kinds: Vec::new(),
            line_offset: 1,
            max_depth: DEFAULT_MAX_DEPTH,
            deny_unterminated: false,
            deny_unmatched: false,
        }
    }

    /// Set the kind given to runs of unmatched input. Defaults to [`TokenKind::Any`].
    pub fn any_kind<K: Into<TokenKind>>(mut self, kind: K) -> Self {
        self.any_kind = kind.into();
        self
    }

    /// Consume input matched by rules of `kind` without emitting tokens for it. If `kind` is the
    /// any kind, unmatched runs are skipped too.
    pub fn skip_kind<K: Into<TokenKind>>(mut self, kind: K) -> Self {
        self.skip_kinds.push(kind.into());
        self
    }

    pub fn skip_kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TokenKind>,
    {
        self.skip_kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// The line number of the first line of the input. Defaults to 1.
    pub fn line_offset(mut self, line: usize) -> Self {
        self.line_offset = line;
        self
    }

    /// How many levels of nested re-tokenization are allowed. Defaults to
    /// [`DEFAULT_MAX_DEPTH`].
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Report delimited tokens whose end literal never appears.
    pub fn deny_unterminated(mut self, flag: bool) -> Self {
        self.deny_unterminated = flag;
        self
    }

    /// Report input which no rule matches.
    pub fn deny_unmatched(mut self, flag: bool) -> Self {
        self.deny_unmatched = flag;
        self
    }

    /// Tokenize `src`. Denied diagnostics do not stop tokenization: they are all gathered and
    /// returned together once the input has been scanned. A nesting depth error stops it
    /// immediately.
    pub fn tokenize(&self, src: &str) -> LexResult<Vec<Token>> {
        let mut errs = Vec::new();
        match self.run(self.def, src, self.line_offset, 0, &mut errs) {
            Ok(toks) => {
                debug!(bytes = src.len(), tokens = toks.len(), "tokenized input");
                if errs.is_empty() {
                    Ok(toks)
                } else {
                    Err(errs)
                }
            }
            Err(e) => {
                errs.push(e);
                Err(errs)
            }
        }
    }

    /// Tokenize `src`, whose first line is `first_line`. Tokens and errors are positioned relative
    /// to `src`.
    fn run(
        &self,
        def: &LexerDef,
        src: &str,
        first_line: usize,
        depth: usize,
        errs: &mut Vec<LexError>,
    ) -> Result<Vec<Token>, LexError> {
        let lines = Lines {
            nlc: NewlineCache::from_source(src),
            first_line,
        };
        let mut skip = Vob::with_capacity(def.rules_len());
        for r in def.iter_rules() {
            skip.push(self.skip_kinds.contains(&r.kind));
        }
        let skip_any = self.skip_kinds.contains(&self.any_kind);

        let mut pm = ParserMatch::new(def);
        let mut matches = Vec::new();
        let mut toks = Vec::new();
        let mut any_start = None;
        let mut i = 0;
        while i < src.len() {
            matches.clear();
            for ridx in pm.scan(src, i, &mut matches) {
                let kind = &def.rule(ridx).kind;
                if self.deny_unterminated {
                    errs.push(LexError {
                        kind: LexErrorKind::Unterminated(kind.clone()),
                        span: Span::new(i, src.len()),
                        line: lines.line(i),
                    });
                } else {
                    debug!(%kind, at = i, "dropping unterminated token");
                }
            }
            match matches.pop() {
                None => {
                    any_start.get_or_insert(i);
                    i += src[i..].chars().next().map_or(1, char::len_utf8);
                }
                Some(m) => {
                    self.flush_any(src, &mut any_start, i, skip_any, &lines, &mut toks, errs);
                    let rule = def.rule(m.rule);
                    trace!(kind = %rule.kind, start = i, end = m.end, "matched");
                    if skip.get(usize::from(m.rule)) != Some(true) {
                        self.emit(def, src, i, &m, rule, &lines, depth, &mut toks, errs)?;
                    }
                    i = m.end;
                }
            }
        }
        self.flush_any(src, &mut any_start, src.len(), skip_any, &lines, &mut toks, errs);
        Ok(toks)
    }

    #[allow(clippy::too_many_arguments)]
    fn flush_any(
        &self,
        src: &str,
        any_start: &mut Option<usize>,
        upto: usize,
        skip_any: bool,
        lines: &Lines,
        toks: &mut Vec<Token>,
        errs: &mut Vec<LexError>,
    ) {
        let start = match any_start.take() {
            Some(start) => start,
            None => return,
        };
        if self.deny_unmatched {
            errs.push(LexError {
                kind: LexErrorKind::Unmatched,
                span: Span::new(start, upto),
                line: lines.line(start),
            });
        }
        if !skip_any {
            toks.push(Token::leaf(
                self.any_kind.clone(),
                &src[start..upto],
                upto,
                lines.line(start),
                lines.line(upto),
            ));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        def: &LexerDef,
        src: &str,
        at: usize,
        m: &LexMatch,
        rule: &TokenRule,
        lines: &Lines,
        depth: usize,
        toks: &mut Vec<Token>,
        errs: &mut Vec<LexError>,
    ) -> Result<(), LexError> {
        let (line_start, line_end) = (lines.line(at), lines.line(m.end));
        let cs = m.content_span;
        let nested = match (rule.end.is_some(), &rule.nested) {
            (false, _) => {
                toks.push(Token::leaf(
                    rule.kind.clone(),
                    m.content.as_str(),
                    m.end,
                    line_start,
                    line_end,
                ));
                return Ok(());
            }
            (true, None) => {
                toks.push(Token::delimited(
                    rule.kind.clone(),
                    &src[at..cs.start()],
                    m.content.as_str(),
                    &src[cs.end()..m.end],
                    m.end,
                    line_start,
                    line_end,
                ));
                return Ok(());
            }
            (true, Some(nested)) => nested,
        };

        if depth >= self.max_depth {
            return Err(LexError {
                kind: LexErrorKind::DepthExceeded(self.max_depth),
                span: Span::new(at, m.end),
                line: line_start,
            });
        }
        let target = match nested.target {
            NestedTarget::SameDef => def,
            NestedTarget::Def(ref d) => &**d,
        };
        if nested.with_delimiters {
            let inner = self.run_nested(target, src, Span::new(at, m.end), lines, depth, errs)?;
            toks.extend(inner);
        } else {
            let mut children = Vec::new();
            children.push(Token::leaf(
                rule.kind.clone(),
                &src[at..cs.start()],
                cs.start(),
                line_start,
                lines.line(cs.start()),
            ));
            children.extend(self.run_nested(target, src, cs, lines, depth, errs)?);
            children.push(Token::leaf(
                rule.kind.clone(),
                &src[cs.end()..m.end],
                m.end,
                lines.line(cs.end()),
                line_end,
            ));
            let kind = nested.wrap_kind.clone().unwrap_or_else(|| rule.kind.clone());
            toks.push(Token::composite(kind, children));
        }
        Ok(())
    }

    /// Tokenize `span` of `src` with `def`, one level deeper, rebasing the resulting tokens and
    /// errors onto `src`.
    fn run_nested(
        &self,
        def: &LexerDef,
        src: &str,
        span: Span,
        lines: &Lines,
        depth: usize,
        errs: &mut Vec<LexError>,
    ) -> Result<Vec<Token>, LexError> {
        debug!(depth = depth + 1, start = span.start(), end = span.end(), "tokenizing nested content");
        let base = span.start();
        let mut inner_errs = Vec::new();
        let res = self.run(
            def,
            &src[base..span.end()],
            lines.line(base),
            depth + 1,
            &mut inner_errs,
        );
        errs.extend(inner_errs.into_iter().map(|e| e.shifted(base)));
        let mut toks = res.map_err(|e| e.shifted(base))?;
        for t in &mut toks {
            t.rebase(base);
        }
        Ok(toks)
    }
}

/// Maps byte offsets of one (possibly nested) input slice to absolute line numbers.
struct Lines {
    nlc: NewlineCache,
    first_line: usize,
}

impl Lines {
    fn line(&self, byte: usize) -> usize {
        let n = self
            .nlc
            .byte_to_line_num(byte)
            .unwrap_or_else(|| self.nlc.line_count());
        self.first_line + n - 1
    }
}
