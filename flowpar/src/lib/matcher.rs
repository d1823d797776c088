use std::mem;

use flowgrammar::{ProdIdx, Token};

use crate::factor::{Shape, SyntaxFactor};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    Continue,
    Complete,
    Fail,
}

/// Progress of one production over the tokens following a scan position.
#[derive(Debug)]
pub(crate) struct SyntaxMatch<'a> {
    pub(crate) prod: ProdIdx,
    factor: &'a SyntaxFactor,
    consumed: usize,
    opens: usize,
    closes: usize,
}

impl<'a> SyntaxMatch<'a> {
    pub(crate) fn new(prod: ProdIdx, factor: &'a SyntaxFactor) -> Self {
        SyntaxMatch {
            prod,
            factor,
            consumed: 0,
            opens: 0,
            closes: 0,
        }
    }

    fn reset(&mut self) {
        self.consumed = 0;
        self.opens = 0;
        self.closes = 0;
    }

    /// Number of tokens fed so far.
    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    #[cfg(test)]
    pub(crate) fn counts(&self) -> (usize, usize) {
        (self.opens, self.closes)
    }

    pub(crate) fn feed(&mut self, tok: &Token) -> Step {
        self.consumed += 1;
        let f = self.factor;
        match f.shape {
            Shape::Sequence => {
                if !f.factors[self.consumed - 1].matches(tok) {
                    Step::Fail
                } else if self.consumed == f.factors.len() {
                    Step::Complete
                } else {
                    Step::Continue
                }
            }
            Shape::Paired { nesting } => {
                if self.consumed == 1 {
                    // The opener counts as an open even if it also matches the closing factor.
                    if !f.open().matches(tok) {
                        return Step::Fail;
                    }
                    self.opens = 1;
                    return Step::Continue;
                }
                let (open, close) = (f.open().matches(tok), f.close().matches(tok));
                if !nesting {
                    return if close {
                        self.closes = 1;
                        Step::Complete
                    } else {
                        Step::Continue
                    };
                }
                // Past the opener, both counters advance independently.
                if open {
                    self.opens += 1;
                }
                if close {
                    self.closes += 1;
                }
                if !(open || close) {
                    return Step::Continue;
                }
                if self.opens == self.closes {
                    Step::Complete
                } else {
                    Step::Continue
                }
            }
        }
    }

    /// Called on a candidate still alive when the tokens run out: does the production accept
    /// the end of input in place of its last factor?
    pub(crate) fn exhausted(&self) -> bool {
        if !self.factor.close().allow_end {
            return false;
        }
        match self.factor.shape {
            Shape::Sequence => self.consumed + 1 == self.factor.factors.len(),
            Shape::Paired { .. } => self.consumed >= 1,
        }
    }
}

/// The winning match of one [`switch_factor`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Best {
    /// Index into the pool passed to `switch_factor`.
    pub(crate) slot: usize,
    /// Number of tokens matched.
    pub(crate) len: usize,
    /// The match was completed by running out of tokens.
    pub(crate) exhausted: bool,
}

/// Reusable scan state for [`switch_factor`]: one matcher per production of a pass, reset at
/// every scan, plus the queues of live matchers.
pub(crate) struct MatchPool<'a> {
    slots: Vec<SyntaxMatch<'a>>,
    live: Vec<usize>,
    next: Vec<usize>,
}

impl<'a> MatchPool<'a> {
    pub(crate) fn new(slots: Vec<SyntaxMatch<'a>>) -> Self {
        MatchPool {
            slots,
            live: Vec::new(),
            next: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn prod(&self, slot: usize) -> ProdIdx {
        self.slots[slot].prod
    }
}

/// Run every production of `pool` over `toks` from `index` and return the match spanning the
/// most tokens. Among equally long matches, the one completed last wins: at one token,
/// candidates complete in pool order, so later-registered productions take precedence.
pub(crate) fn switch_factor(pool: &mut MatchPool, index: usize, toks: &[Token]) -> Option<Best> {
    let mut best: Option<Best> = None;
    pool.live.clear();
    for (slot, m) in pool.slots.iter_mut().enumerate() {
        m.reset();
        pool.live.push(slot);
    }

    for tok in &toks[index..] {
        pool.next.clear();
        for &slot in &pool.live {
            let m = &mut pool.slots[slot];
            match m.feed(tok) {
                Step::Complete => {
                    if best.map_or(true, |b| m.consumed() >= b.len) {
                        best = Some(Best {
                            slot,
                            len: m.consumed(),
                            exhausted: false,
                        });
                    }
                }
                Step::Continue => pool.next.push(slot),
                Step::Fail => (),
            }
        }
        mem::swap(&mut pool.live, &mut pool.next);
        if pool.live.is_empty() {
            return best;
        }
    }

    for &slot in &pool.live {
        let m = &pool.slots[slot];
        if m.exhausted() && best.map_or(true, |b| m.consumed() > b.len) {
            best = Some(Best {
                slot,
                len: m.consumed(),
                exhausted: true,
            });
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::LexicalFactor;

    fn toks(kinds: &[&str]) -> Vec<Token> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, k)| Token::leaf(*k, *k, i + 1, 1, 1))
            .collect()
    }

    fn feed_all(m: &mut SyntaxMatch, ts: &[Token]) -> Vec<Step> {
        ts.iter().map(|t| m.feed(t)).collect()
    }

    #[test]
    fn test_sequence() {
        let f = SyntaxFactor::sequence(
            "call",
            vec![LexicalFactor::kind("any"), LexicalFactor::kind("group")],
        );
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        assert_eq!(
            feed_all(&mut m, &toks(&["any", "group"])),
            vec![Step::Continue, Step::Complete]
        );
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        assert_eq!(feed_all(&mut m, &toks(&["group"])), vec![Step::Fail]);
    }

    #[test]
    fn test_nested_counts_balance() {
        let f = SyntaxFactor::nested_pair("group", LexicalFactor::kind("("), LexicalFactor::kind(")"));
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        let steps = feed_all(&mut m, &toks(&["(", "x", "(", ")", "y", ")"]));
        assert_eq!(steps.last(), Some(&Step::Complete));
        assert!(steps[..5].iter().all(|s| *s == Step::Continue));
        assert_eq!(m.counts(), (2, 2));
    }

    #[test]
    fn test_non_nesting_stops_at_first_close() {
        let f = SyntaxFactor::paired("group", LexicalFactor::kind("("), LexicalFactor::kind(")"));
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        let steps = feed_all(&mut m, &toks(&["(", "(", ")"]));
        assert_eq!(steps, vec![Step::Continue, Step::Continue, Step::Complete]);
    }

    fn delims(data: &[&str]) -> Vec<Token> {
        data.iter()
            .enumerate()
            .map(|(i, d)| Token::leaf("delim", *d, i + 1, 1, 1))
            .collect()
    }

    #[test]
    fn test_overlapping_factors_count_in_parallel() {
        // Every delimiter opens; ")" also closes. Only the opener is exempt from closing.
        let f = SyntaxFactor::nested_pair(
            "group",
            LexicalFactor::kind("delim"),
            LexicalFactor::kind("delim").data(")"),
        );
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        let steps = feed_all(&mut m, &delims(&["(", "(", ")", ")"]));
        assert!(steps.iter().all(|s| *s == Step::Continue));
        assert_eq!(m.counts(), (4, 2));

        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        assert_eq!(m.feed(&delims(&[")"])[0]), Step::Continue);
        assert_eq!(m.counts(), (1, 0));
    }

    #[test]
    fn test_close_overlapping_open() {
        let f = SyntaxFactor::nested_pair(
            "group",
            LexicalFactor::kind("delim").data("("),
            LexicalFactor::kind("delim"),
        );
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        // The second "(" both opens and closes, so the first ")" balances.
        let steps = feed_all(&mut m, &delims(&["(", "(", ")"]));
        assert_eq!(steps, vec![Step::Continue, Step::Continue, Step::Complete]);
        assert_eq!(m.counts(), (2, 2));
    }

    #[test]
    fn test_same_factor_delimiters_never_balance() {
        let q = LexicalFactor::kind("quote");
        let f = SyntaxFactor::nested_pair("quoted", q.clone(), q);
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        let steps = feed_all(&mut m, &toks(&["quote", "x", "quote"]));
        assert_eq!(steps, vec![Step::Continue; 3]);
        assert_eq!(m.counts(), (2, 1));
    }

    #[test]
    fn test_opener_required() {
        let f = SyntaxFactor::nested_pair("group", LexicalFactor::kind("("), LexicalFactor::kind(")"));
        let mut m = SyntaxMatch::new(ProdIdx(0), &f);
        assert_eq!(m.feed(&toks(&[")"])[0]), Step::Fail);
    }

    #[test]
    fn test_switch_factor_longest() {
        let short = SyntaxFactor::sequence(
            "pair",
            vec![LexicalFactor::kind("a"), LexicalFactor::kind("b")],
        );
        let long = SyntaxFactor::sequence(
            "triple",
            vec![
                LexicalFactor::kind("a"),
                LexicalFactor::kind("b"),
                LexicalFactor::kind("c"),
            ],
        );
        let mut pool = MatchPool::new(vec![
            SyntaxMatch::new(ProdIdx(0), &long),
            SyntaxMatch::new(ProdIdx(1), &short),
        ]);
        let ts = toks(&["x", "a", "b", "c"]);
        let best = switch_factor(&mut pool, 1, &ts).unwrap();
        assert_eq!((pool.prod(best.slot), best.len), (ProdIdx(0), 3));
        assert_eq!(switch_factor(&mut pool, 0, &ts), None);
        let ts = toks(&["a", "b", "d"]);
        let best = switch_factor(&mut pool, 0, &ts).unwrap();
        assert_eq!((pool.prod(best.slot), best.len), (ProdIdx(1), 2));
    }

    #[test]
    fn test_switch_factor_tie_goes_to_later() {
        let first = SyntaxFactor::sequence("first", vec![LexicalFactor::kind("a")]);
        let second = SyntaxFactor::sequence("second", vec![LexicalFactor::any()]);
        let mut pool = MatchPool::new(vec![
            SyntaxMatch::new(ProdIdx(0), &first),
            SyntaxMatch::new(ProdIdx(1), &second),
        ]);
        let best = switch_factor(&mut pool, 0, &toks(&["a"])).unwrap();
        assert_eq!(pool.prod(best.slot), ProdIdx(1));
    }

    #[test]
    fn test_switch_factor_exhausted() {
        let f = SyntaxFactor::paired(
            "line",
            LexicalFactor::kind("#"),
            LexicalFactor::kind("nl").allow_end(true),
        );
        let mut pool = MatchPool::new(vec![SyntaxMatch::new(ProdIdx(0), &f)]);
        let ts = toks(&["x", "#", "y", "z"]);
        assert_eq!(
            switch_factor(&mut pool, 1, &ts),
            Some(Best {
                slot: 0,
                len: 3,
                exhausted: true
            })
        );
        let ts = toks(&["#", "y", "nl", "z"]);
        assert_eq!(
            switch_factor(&mut pool, 0, &ts),
            Some(Best {
                slot: 0,
                len: 3,
                exhausted: false
            })
        );
    }
}
