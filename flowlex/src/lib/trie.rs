use flowgrammar::RuleIdx;
use fnv::FnvHashMap;

pub(crate) const ROOT: usize = 0;

#[derive(Debug, Default)]
struct TrieNode {
    /// Case-sensitive edges.
    exact: FnvHashMap<char, usize>,
    /// Case-insensitive edges, keyed by the lower-cased character. Only case-insensitive rules
    /// insert along these, so the two kinds of path never share nodes.
    folded: FnvHashMap<char, usize>,
    /// Rules whose start literal ends at this node, in registration order.
    rules: Vec<RuleIdx>,
}

/// A prefix trie over every rule's start literal. Nodes live in one vector and refer to each
/// other by index.
#[derive(Debug)]
pub(crate) struct PrefixTrie {
    nodes: Vec<TrieNode>,
}

impl PrefixTrie {
    pub(crate) fn new() -> Self {
        PrefixTrie {
            nodes: vec![TrieNode::default()],
        }
    }

    pub(crate) fn insert(&mut self, literal: &str, ignore_case: bool, ridx: RuleIdx) {
        let mut n = ROOT;
        for c in literal.chars() {
            let key = if ignore_case { fold(c) } else { c };
            let existing = if ignore_case {
                self.nodes[n].folded.get(&key)
            } else {
                self.nodes[n].exact.get(&key)
            }
            .copied();
            n = match existing {
                Some(m) => m,
                None => {
                    let m = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    if ignore_case {
                        self.nodes[n].folded.insert(key, m);
                    } else {
                        self.nodes[n].exact.insert(key, m);
                    }
                    m
                }
            };
        }
        self.nodes[n].rules.push(ridx);
    }

    /// Advance every node in `from` by `c`, appending the nodes reached to `into`.
    pub(crate) fn step(&self, from: &[usize], c: char, into: &mut Vec<usize>) {
        let f = fold(c);
        for &n in from {
            let node = &self.nodes[n];
            if let Some(&m) = node.exact.get(&c) {
                into.push(m);
            }
            if let Some(&m) = node.folded.get(&f) {
                into.push(m);
            }
        }
    }

    /// The rules whose start literal is fully matched at node `n`.
    pub(crate) fn rules(&self, n: usize) -> &[RuleIdx] {
        &self.nodes[n].rules
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
