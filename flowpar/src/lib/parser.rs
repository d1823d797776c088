use std::{fmt, sync::Arc};

use flowgrammar::{Flow, Priority, ProdIdx, Token, TokenKind};
use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::{
    factor::{apply_rewrite, Shape, SyntaxFactor},
    matcher::{switch_factor, MatchPool, SyntaxMatch},
    transform::{mark_keyword, mark_type, TypeMarker},
    ParseError, ParseErrorKind, ParseResult, SyntaxBuildError, SyntaxBuildErrorKind,
    SyntaxBuildResult,
};

/// How deeply paired productions may recursively parse their interior unless told otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

type Transform = Arc<dyn Fn(Vec<Token>) -> Vec<Token> + Send + Sync>;

enum Pass {
    /// Productions reduced together, in one left-to-right scan.
    Grammar(Vec<ProdIdx>),
    Transform(Transform),
    Keywords {
        source: TokenKind,
        ignore_case: bool,
    },
    Mark(TypeMarker),
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Pass::Grammar(prods) => f.debug_tuple("Grammar").field(prods).finish(),
            Pass::Transform(_) => f.write_str("Transform(..)"),
            Pass::Keywords {
                source,
                ignore_case,
            } => f
                .debug_struct("Keywords")
                .field("source", source)
                .field("ignore_case", ignore_case)
                .finish(),
            Pass::Mark(m) => f.debug_tuple("Mark").field(m).finish(),
        }
    }
}

/// A priority-ordered set of grammar productions and transforms.
///
/// Productions registered at the same priority form one pass; a transform always forms a pass
/// of its own, and productions registered after a transform at the same priority start a new
/// pass. Passes run in ascending priority, then in registration order.
#[derive(Debug)]
pub struct SyntaxParser {
    prods: Vec<SyntaxFactor>,
    flow: Flow<Pass>,
    keywords: IndexSet<String>,
    max_depth: usize,
}

impl SyntaxParser {
    pub fn new() -> Self {
        SyntaxParser {
            prods: Vec::new(),
            flow: Flow::new(),
            keywords: IndexSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set how many levels of recursive interior parsing are allowed. Defaults to
    /// [`DEFAULT_MAX_DEPTH`].
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Register `factor` at `priority`.
    pub fn add_syntax(&mut self, priority: Priority, factor: SyntaxFactor) -> SyntaxBuildResult<ProdIdx> {
        if let Err(kind) = validate(&factor) {
            return Err(SyntaxBuildError {
                kind,
                status: factor.status,
            });
        }
        let pidx = match ProdIdx::from_usize(self.prods.len()) {
            Some(pidx) => pidx,
            None => {
                return Err(SyntaxBuildError {
                    kind: SyntaxBuildErrorKind::TooManyProductions,
                    status: factor.status,
                })
            }
        };
        self.prods.push(factor);
        match self.flow.last_mut(priority) {
            Some(Pass::Grammar(prods)) => prods.push(pidx),
            _ => self.flow.push(priority, Pass::Grammar(vec![pidx])),
        }
        Ok(pidx)
    }

    /// Register a pass at `priority` which replaces the whole token list with `f`'s output.
    pub fn add_transform<F>(&mut self, priority: Priority, f: F)
    where
        F: Fn(Vec<Token>) -> Vec<Token> + Send + Sync + 'static,
    {
        self.flow.push(priority, Pass::Transform(Arc::new(f)));
    }

    /// Declare keywords for keyword passes. Keywords registered after a keyword pass has been
    /// added are still seen by it.
    pub fn register_keyword<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
    }

    /// Register a pass at `priority` promoting tokens of kind `source` whose data is a registered
    /// keyword to [`TokenKind::Keyword`]. See [`mark_keyword`].
    pub fn add_keyword_pass<K: Into<TokenKind>>(
        &mut self,
        priority: Priority,
        source: K,
        ignore_case: bool,
    ) {
        self.flow.push(
            priority,
            Pass::Keywords {
                source: source.into(),
                ignore_case,
            },
        );
    }

    /// Register a pass at `priority` applying `marker` with [`mark_type`].
    pub fn add_type_pass(&mut self, priority: Priority, marker: TypeMarker) {
        self.flow.push(priority, Pass::Mark(marker));
    }

    pub fn get_prod(&self, pidx: ProdIdx) -> Option<&SyntaxFactor> {
        self.prods.get(usize::from(pidx))
    }

    pub fn prods_len(&self) -> usize {
        self.prods.len()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> + '_ {
        self.keywords.iter().map(String::as_str)
    }

    /// Run every pass over `toks` and return the resulting token forest.
    pub fn parse(&self, toks: Vec<Token>) -> ParseResult<Vec<Token>> {
        self.parse_at(toks, 0)
    }

    fn parse_at(&self, mut toks: Vec<Token>, depth: usize) -> ParseResult<Vec<Token>> {
        for (priority, pass) in self.flow.iter() {
            debug!(priority, depth, tokens = toks.len(), ?pass, "running pass");
            toks = match pass {
                Pass::Grammar(prods) => self.reduce_level(prods, toks, depth)?,
                Pass::Transform(f) => f(toks),
                Pass::Keywords {
                    source,
                    ignore_case,
                } => {
                    mark_keyword(&mut toks, self.keywords.iter(), source, *ignore_case);
                    toks
                }
                Pass::Mark(marker) => {
                    mark_type(&mut toks, marker);
                    toks
                }
            };
        }
        Ok(toks)
    }

    fn reduce_level(&self, prods: &[ProdIdx], mut toks: Vec<Token>, depth: usize) -> ParseResult<Vec<Token>> {
        let mut pool = MatchPool::new(
            prods
                .iter()
                .map(|&p| SyntaxMatch::new(p, &self.prods[usize::from(p)]))
                .collect(),
        );
        let mut i = 0;
        // Reductions in a row which did not bring the scan closer to the end of the list. No
        // reduction moves it further away, so bounding these bounds the whole level.
        let mut stalls = 0;
        while i < toks.len() {
            let best = match switch_factor(&mut pool, i, &toks) {
                Some(best) => best,
                None => {
                    i += 1;
                    stalls = 0;
                    continue;
                }
            };
            let prod = &self.prods[usize::from(pool.prod(best.slot))];
            trace!(status = %prod.status, at = i, len = best.len, exhausted = best.exhausted, "reducing");
            let remaining = toks.len() - i;
            let matched = toks.drain(i..i + best.len).collect::<Vec<_>>();
            let (replacement, skip) = match prod.shape {
                Shape::Sequence => (vec![reduce_sequence(prod, matched)], 0),
                Shape::Paired { .. } => self.reduce_paired(prod, matched, best.exhausted, depth)?,
            };
            toks.splice(i..i, replacement);
            i += skip;
            if toks.len() - i < remaining {
                stalls = 0;
            } else {
                stalls += 1;
                if stalls > pool.len() {
                    warn!(status = %prod.status, at = i, "reductions are not advancing the scan; moving on");
                    i += 1;
                    stalls = 0;
                }
            }
        }
        Ok(toks)
    }

    /// Reduce a paired match, returning the tokens which replace it and how many of them (the
    /// opener, if left outside) precede the new node.
    fn reduce_paired(
        &self,
        prod: &SyntaxFactor,
        mut matched: Vec<Token>,
        exhausted: bool,
        depth: usize,
    ) -> ParseResult<(Vec<Token>, usize)> {
        debug_assert!(!matched.is_empty());
        if !prod.recursion {
            apply_rewrite(&prod.rewrite, &mut matched);
        }
        let lines = match (matched.first(), matched.last()) {
            (Some(first), Some(last)) => (first.line_start(), last.line_end()),
            _ => return Ok((matched, 0)),
        };
        let closer = if exhausted { None } else { matched.pop() };
        let mut inner = matched.split_off(1);
        let opener = matched.remove(0);
        let anchor = (opener.end_index(), opener.line_end());

        let (mut head, mut before) = (None, None);
        if prod.prefix_match {
            inner.insert(0, opener);
        } else if prod.prefix_outside {
            before = Some(opener);
        } else {
            head = Some(opener);
        }
        let (mut tail, mut after) = (None, None);
        if let Some(closer) = closer {
            if prod.suffix_match {
                inner.push(closer);
            } else if prod.suffix_outside {
                after = Some(closer);
            } else {
                tail = Some(closer);
            }
        }

        if prod.recursion {
            if depth >= self.max_depth {
                return Err(ParseError {
                    kind: ParseErrorKind::DepthExceeded(self.max_depth),
                    lines,
                });
            }
            debug!(status = %prod.status, depth = depth + 1, tokens = inner.len(), "parsing interior");
            inner = self.parse_at(inner, depth + 1)?;
        }

        let mut children = Vec::with_capacity(inner.len() + 2);
        children.extend(head);
        children.extend(inner);
        children.extend(tail);
        let mut node = Token::composite(prod.status.clone(), children);
        if node.is_leaf() {
            node = node.with_position(anchor.0, anchor.1, anchor.1);
        }

        let skip = usize::from(before.is_some());
        let mut out = Vec::with_capacity(3);
        out.extend(before);
        out.push(node);
        out.extend(after);
        Ok((out, skip))
    }
}

/// Reduce a sequence match into one node: either a new composite, or the merge target with the
/// other matched tokens moved into it.
fn reduce_sequence(prod: &SyntaxFactor, mut matched: Vec<Token>) -> Token {
    apply_rewrite(&prod.rewrite, &mut matched);
    if let Some(merge) = prod.merge {
        let reusable = matched
            .get(merge.father)
            .map_or(false, |f| !f.is_leaf() && (!merge.same_kind_only || f.kind == prod.status));
        if reusable {
            let later = matched.split_off(merge.father + 1);
            if let Some(mut father) = matched.pop() {
                father.kind = prod.status.clone();
                father.prepend_children(matched);
                father.extend_children(later);
                return father;
            }
        }
    }
    Token::composite(prod.status.clone(), matched)
}

fn validate(f: &SyntaxFactor) -> Result<(), SyntaxBuildErrorKind> {
    if f.factors.is_empty() {
        return Err(SyntaxBuildErrorKind::EmptyProduction);
    }
    match f.shape {
        Shape::Sequence => {
            if f.recursion {
                return Err(SyntaxBuildErrorKind::RecursiveSequence);
            }
            if f.rewrite.len() > f.factors.len() {
                return Err(SyntaxBuildErrorKind::RewriteTooLong);
            }
            if let Some(m) = f.merge {
                if m.father >= f.factors.len() {
                    return Err(SyntaxBuildErrorKind::MergeOutOfRange);
                }
            }
        }
        Shape::Paired { .. } => {
            if f.factors.len() < 2 {
                return Err(SyntaxBuildErrorKind::PairedTooShort);
            }
            if f.merge.is_some() {
                return Err(SyntaxBuildErrorKind::MergeOnPaired);
            }
            if f.recursion && !f.rewrite.is_empty() {
                return Err(SyntaxBuildErrorKind::RewriteOnRecursive);
            }
            if f.recursion && f.prefix_match && f.suffix_match {
                return Err(SyntaxBuildErrorKind::WholeSpanRecursion);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{LexicalFactor, TypeRewrite};

    fn toks(kinds: &[&str]) -> Vec<Token> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, k)| Token::leaf(*k, *k, i + 1, 1, 1))
            .collect()
    }

    fn kinds(toks: &[Token]) -> Vec<String> {
        toks.iter().map(|t| t.kind.to_string()).collect()
    }

    #[test]
    fn test_validation() {
        let mut p = SyntaxParser::new();
        let a = || LexicalFactor::kind("a");
        let cases = vec![
            (SyntaxFactor::sequence("s", vec![]), SyntaxBuildErrorKind::EmptyProduction),
            (
                SyntaxFactor::sequence("s", vec![a()]).recursive(true),
                SyntaxBuildErrorKind::RecursiveSequence,
            ),
            (
                SyntaxFactor::sequence("s", vec![a()])
                    .rewrite(vec![TypeRewrite::Keep, TypeRewrite::Keep]),
                SyntaxBuildErrorKind::RewriteTooLong,
            ),
            (
                SyntaxFactor::sequence("s", vec![a(), a()]).merge_into(2, false),
                SyntaxBuildErrorKind::MergeOutOfRange,
            ),
            (
                SyntaxFactor {
                    factors: vec![a()],
                    ..SyntaxFactor::paired("p", a(), a())
                },
                SyntaxBuildErrorKind::PairedTooShort,
            ),
            (
                SyntaxFactor::paired("p", a(), a()).merge_into(0, false),
                SyntaxBuildErrorKind::MergeOnPaired,
            ),
            (
                SyntaxFactor::paired("p", a(), a())
                    .recursive(true)
                    .rewrite(vec![TypeRewrite::Keep]),
                SyntaxBuildErrorKind::RewriteOnRecursive,
            ),
            (
                SyntaxFactor::paired("p", a(), a())
                    .recursive(true)
                    .prefix_match(true)
                    .suffix_match(true),
                SyntaxBuildErrorKind::WholeSpanRecursion,
            ),
        ];
        for (f, kind) in cases {
            let status = f.status.clone();
            assert_eq!(p.add_syntax(0, f), Err(SyntaxBuildError { kind, status }));
        }
        assert_eq!(p.prods_len(), 0);
    }

    #[test]
    fn test_same_priority_shares_a_pass() {
        let mut p = SyntaxParser::new();
        p.add_syntax(0, SyntaxFactor::sequence("x", vec![LexicalFactor::kind("a")]))
            .unwrap();
        p.add_syntax(0, SyntaxFactor::sequence("y", vec![LexicalFactor::kind("b")]))
            .unwrap();
        p.add_transform(0, |t| t);
        p.add_syntax(0, SyntaxFactor::sequence("z", vec![LexicalFactor::kind("c")]))
            .unwrap();
        let passes = p.flow.iter().map(|(_, pass)| pass).collect::<Vec<_>>();
        assert_eq!(passes.len(), 3);
        assert!(matches!(passes[0], Pass::Grammar(ps) if ps.len() == 2));
        assert!(matches!(passes[2], Pass::Grammar(ps) if ps.len() == 1));
    }

    #[test]
    fn test_adjacent_rematch() {
        // Without skipping past a new node, a left-associative chain folds up in one pass.
        let mut p = SyntaxParser::new();
        p.add_syntax(
            0,
            SyntaxFactor::sequence(
                "sum",
                vec![
                    LexicalFactor::of(["n", "sum"]),
                    LexicalFactor::kind("+"),
                    LexicalFactor::kind("n"),
                ],
            ),
        )
        .unwrap();
        let out = p.parse(toks(&["n", "+", "n", "+", "n"])).unwrap();
        assert_eq!(kinds(&out), vec!["sum"]);
        assert_eq!(kinds(out[0].children()), vec!["sum", "+", "n"]);
        assert_eq!(kinds(out[0].children()[0].children()), vec!["n", "+", "n"]);
        assert_eq!(out[0].end_index(), 5);
    }

    #[test]
    fn test_stall_guard() {
        let mut p = SyntaxParser::new();
        p.add_syntax(0, SyntaxFactor::sequence("wrap", vec![LexicalFactor::any()]))
            .unwrap();
        let out = p.parse(toks(&["a", "b"])).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|t| t.kind == TokenKind::named("wrap")));
        assert_eq!(out[0].text(), "a");
        assert_eq!(out[1].text(), "b");
    }

    #[test]
    fn test_merge_requires_composite() {
        let f = SyntaxFactor::sequence(
            "pair",
            vec![LexicalFactor::any(), LexicalFactor::any()],
        )
        .merge_into(0, false);
        let node = reduce_sequence(&f, toks(&["a", "b"]));
        assert_eq!(kinds(node.children()), vec!["a", "b"]);

        let father = Token::composite("list", toks(&["x"]));
        let node = reduce_sequence(&f, vec![father, toks(&["b"]).remove(0)]);
        assert_eq!(node.kind, TokenKind::named("pair"));
        assert_eq!(kinds(node.children()), vec!["x", "b"]);
    }

    #[test]
    fn test_merge_same_kind_gate() {
        let f = SyntaxFactor::sequence(
            "list",
            vec![LexicalFactor::any(), LexicalFactor::kind("b")],
        )
        .merge_into(0, true);
        let other = Token::composite("call", toks(&["x"]));
        let node = reduce_sequence(&f, vec![other, toks(&["b"]).remove(0)]);
        assert_eq!(kinds(node.children()), vec!["call", "b"]);
    }

    #[test]
    fn test_merge_father_in_middle() {
        let f = SyntaxFactor::sequence(
            "list",
            vec![
                LexicalFactor::any(),
                LexicalFactor::any(),
                LexicalFactor::any(),
            ],
        )
        .merge_into(1, true);
        let father = Token::composite("list", toks(&["m"]));
        let mut ts = toks(&["a", "c"]);
        ts.insert(1, father);
        let node = reduce_sequence(&f, ts);
        assert_eq!(kinds(node.children()), vec!["a", "m", "c"]);
        assert_eq!(node.lines(), (1, 1));
        assert_eq!(node.end_index(), 2);
    }
}
