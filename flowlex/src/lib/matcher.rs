use std::mem;

use flowgrammar::{RuleIdx, Span};
use tracing::trace;
use vob::Vob;

use crate::{
    lexer::{LexerDef, TokenRule},
    trie::ROOT,
};

/// A match completed during one [`ParserMatch::scan`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexMatch {
    pub rule: RuleIdx,
    /// Byte offset one past the match's last byte.
    pub end: usize,
    /// For delimited rules, the raw input between the start and end literals. For literal rules,
    /// an empty span at `end`.
    pub content_span: Span,
    /// For delimited rules, the escape-decoded content. For literal rules, the matched text.
    pub content: String,
}

/// Progress of one delimited rule towards its end literal.
#[derive(Debug, Default)]
struct EndMatcher {
    cache: String,
    escape: bool,
    /// Byte offset in `cache` where the current run of unescaped input starts. End literals and
    /// nesting markers are only recognised within one such run.
    run_start: usize,
    opens: usize,
    closes: usize,
    content_start: usize,
}

impl EndMatcher {
    fn reset(&mut self, content_start: usize, nesting: bool) {
        self.cache.clear();
        self.escape = false;
        self.run_start = 0;
        // The start literal itself is the first open.
        self.opens = usize::from(nesting);
        self.closes = 0;
        self.content_start = content_start;
    }

    /// Feed the next character. Returns `true` once `end` has been seen with balanced nesting
    /// counters; the end literal is then removed from the cached content.
    fn feed(&mut self, c: char, rule: &TokenRule, end: &str) -> bool {
        if rule.escape {
            if self.escape {
                match c {
                    '\\' => self.cache.push('\\'),
                    'n' => self.cache.push('\n'),
                    't' => self.cache.push('\t'),
                    _ => {
                        self.cache.push('\\');
                        self.cache.push(c);
                    }
                }
                self.escape = false;
                self.run_start = self.cache.len();
                return false;
            }
            if c == '\\' {
                self.escape = true;
                return false;
            }
        }

        self.cache.push(c);
        let run = &self.cache[self.run_start..];
        if let Some((ref open, ref close)) = rule.pair {
            if run.ends_with(open.as_str()) {
                self.opens += 1;
            }
            if run.ends_with(close.as_str()) {
                self.closes += 1;
            }
        }
        if run.ends_with(end) && self.opens == self.closes {
            self.cache.truncate(self.cache.len() - end.len());
            return true;
        }
        false
    }
}

/// One end matcher per rule, reset rather than reallocated between scans. A rule's start literal
/// can complete at most once per scan, so a rule never needs two live matchers at once.
#[derive(Debug)]
struct MatcherPool {
    slots: Vec<EndMatcher>,
    live: Vob,
}

impl MatcherPool {
    fn new(rules_len: usize) -> Self {
        let mut slots = Vec::with_capacity(rules_len);
        let mut live = Vob::with_capacity(rules_len);
        for _ in 0..rules_len {
            slots.push(EndMatcher::default());
            live.push(false);
        }
        MatcherPool { slots, live }
    }

    fn spawn(&mut self, ridx: RuleIdx, content_start: usize, nesting: bool) {
        let i = usize::from(ridx);
        debug_assert_eq!(self.live.get(i), Some(false));
        self.slots[i].reset(content_start, nesting);
        self.live.set(i, true);
    }

    fn get_mut(&mut self, ridx: RuleIdx) -> &mut EndMatcher {
        &mut self.slots[usize::from(ridx)]
    }

    fn release(&mut self, ridx: RuleIdx) {
        self.live.set(usize::from(ridx), false);
    }
}

/// Drives the prefix trie and the end matchers of one [`LexerDef`] over the input.
///
/// Each call to [`ParserMatch::scan`] makes a single forward pass from a position, feeding every
/// character first to the live end matchers and then to the trie, until neither has anything
/// left alive. Scratch state is kept between scans.
pub struct ParserMatch<'a> {
    def: &'a LexerDef,
    pool: MatcherPool,
    nodes: Vec<usize>,
    next_nodes: Vec<usize>,
    seekers: Vec<RuleIdx>,
    next_seekers: Vec<RuleIdx>,
    reached: Vec<RuleIdx>,
}

impl<'a> ParserMatch<'a> {
    pub fn new(def: &'a LexerDef) -> Self {
        ParserMatch {
            def,
            pool: MatcherPool::new(def.rules_len()),
            nodes: Vec::new(),
            next_nodes: Vec::new(),
            seekers: Vec::new(),
            next_seekers: Vec::new(),
            reached: Vec::new(),
        }
    }

    /// Scan `src` from byte `index`, appending every match which completes to `out` in
    /// completion order: for each character, end-literal completions first, then start-literal
    /// completions in rule registration order. The authoritative match is therefore the last one
    /// appended.
    ///
    /// Returns the delimited rules which started but were still looking for their end literal
    /// when the input ran out. Their buffered content is discarded. An `index` past the end of
    /// `src` or inside a character matches nothing.
    pub fn scan(&mut self, src: &str, index: usize, out: &mut Vec<LexMatch>) -> Vec<RuleIdx> {
        if !src.is_char_boundary(index) {
            return Vec::new();
        }
        let def = self.def;
        self.nodes.clear();
        self.nodes.push(ROOT);
        self.seekers.clear();

        for (off, c) in src[index..].char_indices() {
            let next = index + off + c.len_utf8();

            for i in 0..self.seekers.len() {
                let ridx = self.seekers[i];
                let rule = def.rule(ridx);
                let end = match rule.end {
                    Some(ref end) => end.as_str(),
                    None => continue,
                };
                let m = self.pool.get_mut(ridx);
                if m.feed(c, rule, end) {
                    out.push(LexMatch {
                        rule: ridx,
                        end: next,
                        content_span: Span::new(m.content_start, next - end.len()),
                        content: mem::take(&mut m.cache),
                    });
                    self.pool.release(ridx);
                } else {
                    self.next_seekers.push(ridx);
                }
            }

            self.next_nodes.clear();
            def.trie().step(&self.nodes, c, &mut self.next_nodes);
            self.reached.clear();
            for &n in &self.next_nodes {
                self.reached.extend_from_slice(def.trie().rules(n));
            }
            self.reached.sort_unstable();
            for &ridx in &self.reached {
                let rule = def.rule(ridx);
                if rule.end.is_none() {
                    out.push(LexMatch {
                        rule: ridx,
                        end: next,
                        content_span: Span::new(next, next),
                        content: src[index..next].to_owned(),
                    });
                } else {
                    self.pool.spawn(ridx, next, rule.pair.is_some());
                    self.next_seekers.push(ridx);
                }
            }

            mem::swap(&mut self.nodes, &mut self.next_nodes);
            mem::swap(&mut self.seekers, &mut self.next_seekers);
            self.next_seekers.clear();
            if self.nodes.is_empty() && self.seekers.is_empty() {
                break;
            }
        }

        let unterminated = mem::take(&mut self.seekers);
        for &ridx in &unterminated {
            trace!(rule = %def.rule(ridx).kind, index, "end of input before end literal");
            self.pool.release(ridx);
        }
        unterminated
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn scan(def: &LexerDef, src: &str) -> (Vec<LexMatch>, Vec<RuleIdx>) {
        let mut pm = ParserMatch::new(def);
        let mut out = Vec::new();
        let unterminated = pm.scan(src, 0, &mut out);
        (out, unterminated)
    }

    #[test]
    fn test_last_appended_is_longest() {
        let mut def = LexerDef::new();
        let a = def.add_rule(TokenRule::literal("A", "//")).unwrap();
        let b = def.add_rule(TokenRule::literal("B", "//!")).unwrap();
        let (out, _) = scan(&def, "//!x");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].rule, a);
        assert_eq!(out[0].end, 2);
        assert_eq!(out[1].rule, b);
        assert_eq!(out[1].end, 3);
        assert_eq!(out[1].content, "//!");
    }

    #[test]
    fn test_same_literal_later_rule_wins() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::literal("first", "if")).unwrap();
        let second = def.add_rule(TokenRule::literal("second", "if")).unwrap();
        let (out, _) = scan(&def, "if");
        assert_eq!(out.last().map(|m| m.rule), Some(second));
    }

    #[test]
    fn test_delimited_after_literal() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::literal("slash", "/")).unwrap();
        let c = def.add_rule(TokenRule::delimited("comment", "/*", "*/")).unwrap();
        let (out, _) = scan(&def, "/* a */ b");
        let last = out.last().unwrap();
        assert_eq!(last.rule, c);
        assert_eq!(last.end, 7);
        assert_eq!(last.content, " a ");
        assert_eq!(last.content_span, Span::new(2, 5));
    }

    #[test]
    fn test_end_literal_after_partial_overlap() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::delimited("comment", "/*", "*/")).unwrap();
        let (out, _) = scan(&def, "/* x **/");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, " x *");
    }

    #[test]
    fn test_escapes() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::delimited("string", "\"", "\"").escape(true))
            .unwrap();
        let (out, _) = scan(&def, r#""a\nb\\c\"d\qe""#);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "a\nb\\c\\\"d\\qe");
    }

    #[test]
    fn test_nesting_counters() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::delimited("block", "{", "}").pair("{", "}"))
            .unwrap();
        let (out, _) = scan(&def, "{a{b}c}d}");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].end, 7);
        assert_eq!(out[0].content, "a{b}c");
    }

    #[test]
    fn test_unterminated() {
        let mut def = LexerDef::new();
        let s = def.add_rule(TokenRule::delimited("string", "'", "'")).unwrap();
        let (out, unterminated) = scan(&def, "'abc");
        assert!(out.is_empty());
        assert_eq!(unterminated, vec![s]);
    }

    #[test]
    fn test_scan_reuse() {
        let mut def = LexerDef::new();
        def.add_rule(TokenRule::delimited("string", "'", "'")).unwrap();
        let mut pm = ParserMatch::new(&def);
        let mut out = Vec::new();
        let src = "'ab' 'cd'";
        pm.scan(src, 0, &mut out);
        pm.scan(src, 5, &mut out);
        assert_eq!(
            out.iter().map(|m| (m.end, m.content.as_str())).collect::<Vec<_>>(),
            vec![(4, "ab"), (9, "cd")]
        );
    }
}
