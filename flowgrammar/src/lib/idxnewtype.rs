// This macro generates a `u32` backed index struct. Indices are created from `usize` positions
// in rule and production tables, so the conversion in that direction is checked.

use std::{fmt, mem::size_of};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
        pub struct $n(pub u32);

        impl From<$n> for usize {
            fn from(idx: $n) -> Self {
                debug_assert!(size_of::<usize>() >= size_of::<u32>());
                idx.0 as usize
            }
        }

        impl $n {
            /// Convert the table position `i` into an index, returning `None` if `i` cannot be
            /// represented.
            pub fn from_usize(i: usize) -> Option<Self> {
                num_traits::cast::<usize, u32>(i).map($n)
            }

            pub fn as_usize(&self) -> usize {
                usize::from(*self)
            }
        }

        impl fmt::Display for $n {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for lexical rule indices. Rules are numbered in registration order,
    /// which is also the order used to break ties between rules completing at the same step.
    RuleIdx);
IdxNewtype!(
    /// A type specifically for grammar production indices. Productions are numbered in
    /// registration order, independently of the priority they are registered at.
    ProdIdx);
