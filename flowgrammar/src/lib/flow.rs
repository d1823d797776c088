use std::collections::BTreeMap;

/// Numeric key ordering the passes of a [`Flow`]. Lower priorities run first.
pub type Priority = i32;

/// A priority-ordered collection of passes.
///
/// Passes registered at the same priority are kept in registration order and form one level:
/// every pass of a level runs before any pass of the next level. What a pass *is* is up to the
/// user of the flow (`flowpar` stores grammar passes and token-list transforms).
#[derive(Clone, Debug)]
pub struct Flow<P> {
    levels: BTreeMap<Priority, Vec<P>>,
}

impl<P> Default for Flow<P> {
    fn default() -> Self {
        Flow {
            levels: BTreeMap::new(),
        }
    }
}

impl<P> Flow<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `pass` to the level at `priority`.
    pub fn push(&mut self, priority: Priority, pass: P) {
        self.levels.entry(priority).or_default().push(pass);
    }

    /// The most recently pushed pass at `priority`, if any.
    pub fn last_mut(&mut self, priority: Priority) -> Option<&mut P> {
        self.levels.get_mut(&priority).and_then(|l| l.last_mut())
    }

    /// Iterate over every pass in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (Priority, &P)> + '_ {
        self.levels
            .iter()
            .flat_map(|(&prio, passes)| passes.iter().map(move |p| (prio, p)))
    }

    /// Iterate over the levels in ascending priority.
    pub fn levels(&self) -> impl Iterator<Item = (Priority, &[P])> + '_ {
        self.levels.iter().map(|(&prio, passes)| (prio, passes.as_slice()))
    }

    /// The priorities which have at least one pass, in ascending order.
    pub fn priorities(&self) -> Vec<Priority> {
        self.levels.keys().copied().collect()
    }

    /// Total number of passes across all levels.
    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
