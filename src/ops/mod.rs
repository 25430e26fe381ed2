//! The push-based operator protocol and the built-in operators.
//!
//! An [`Operator`] receives one execution's worth of elements: `begin`
//! once, `accept` per element, `end` once. Between pulls the driver may
//! poll [`Operator::can_short_circuit`]; the poll doubles as a downstream
//! announcement that someone is able to stop early, which buffering
//! operators use to pick their replay mode.
//!
//! Intermediate operators are created fresh for every execution by
//! [`Stage::compile`](crate::stage::Stage::compile) and wrap their
//! downstream neighbor by value, so a compiled chain is one flat,
//! monomorphized value.

pub mod collect;
pub mod distinct;
pub mod flat_map;
pub mod merge;
pub mod partition;
pub mod simple;
pub mod slice;
pub(crate) mod terminal;

pub use collect::{DropLast, Reverse, Shuffle, Sort, TakeLast};
pub use distinct::{Distinct, DistinctBy};
pub use flat_map::FlatMap;
pub use merge::Merge;
pub use partition::{Partition, PartitionBy};
pub use simple::{Filter, FilterEnumerated, Inspect, Intersperse, Map, MapEnumerated};
pub use slice::{DropWhile, Slice, TakeWhile};

/// One execution's consumer of pushed elements.
pub trait Operator<T> {
    /// Announce the start of traversal with an advisory exact-size hint.
    ///
    /// The hint may be absent or wrong; operators must stay correct if
    /// more or fewer elements arrive.
    fn begin(&mut self, size_hint: Option<u64>) {
        let _ = size_hint;
    }

    /// Consume one element.
    fn accept(&mut self, value: T);

    /// Announce that no further elements will arrive. Buffering operators
    /// flush here.
    fn end(&mut self) {}

    /// Whether this operator (or anything downstream of it) no longer
    /// needs input.
    ///
    /// Polling this is itself a signal: operators that must consume their
    /// whole input regardless (sort, reverse, ...) record that a
    /// short-circuit-capable consumer exists downstream and answer
    /// `false`, then replay element by element on `end` so the downstream
    /// stop is still honored without over-producing.
    fn can_short_circuit(&mut self) -> bool {
        false
    }
}

/// Delegation through a mutable borrow.
///
/// This is what lets a terminal operator stay owned by the caller while
/// being compiled into the chain: the driver wraps `&mut terminal` and
/// reads the result back out afterwards.
impl<T, O: Operator<T> + ?Sized> Operator<T> for &mut O {
    fn begin(&mut self, size_hint: Option<u64>) {
        (**self).begin(size_hint)
    }

    fn accept(&mut self, value: T) {
        (**self).accept(value)
    }

    fn end(&mut self) {
        (**self).end()
    }

    fn can_short_circuit(&mut self) -> bool {
        (**self).can_short_circuit()
    }
}

/// Forwards accepts into an outer operator without re-announcing
/// begin/end.
///
/// Used when a sub-pipeline is driven into the middle of an already
/// running chain (flat_map's bulk path): the outer operator has already
/// seen `begin` and must not see `end` until the outer traversal is over.
pub(crate) struct RelayOp<'a, N> {
    next: &'a mut N,
}

impl<'a, N> RelayOp<'a, N> {
    pub(crate) fn new(next: &'a mut N) -> Self {
        Self { next }
    }
}

impl<T, N: Operator<T>> Operator<T> for RelayOp<'_, N> {
    fn begin(&mut self, _size_hint: Option<u64>) {}

    fn accept(&mut self, value: T) {
        self.next.accept(value);
    }

    fn end(&mut self) {}

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

/// Replay a buffered batch downstream: `begin` with the now-exact size,
/// the elements, then `end`.
///
/// When `bounded` is set (a short-circuit consumer was recorded during
/// collection), downstream satisfaction is checked before every element
/// so the replay stops as early as the consumer allows.
pub(crate) fn replay<T, N: Operator<T>>(values: Vec<T>, next: &mut N, bounded: bool) {
    next.begin(Some(values.len() as u64));
    if bounded {
        for value in values {
            if next.can_short_circuit() {
                break;
            }
            next.accept(value);
        }
    } else {
        for value in values {
            next.accept(value);
        }
    }
    next.end();
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Operator;

    /// Records the full protocol trace for assertions.
    pub struct Recording<T> {
        pub begun: Option<Option<u64>>,
        pub accepted: Vec<T>,
        pub ended: bool,
        pub polls: usize,
        pub satisfied_after: Option<usize>,
    }

    impl<T> Recording<T> {
        pub fn new() -> Self {
            Self {
                begun: None,
                accepted: Vec::new(),
                ended: false,
                polls: 0,
                satisfied_after: None,
            }
        }

        /// Report satisfaction once `n` elements were accepted.
        pub fn satisfied_after(n: usize) -> Self {
            let mut rec = Self::new();
            rec.satisfied_after = Some(n);
            rec
        }
    }

    impl<T> Operator<T> for Recording<T> {
        fn begin(&mut self, size_hint: Option<u64>) {
            self.begun = Some(size_hint);
        }

        fn accept(&mut self, value: T) {
            self.accepted.push(value);
        }

        fn end(&mut self) {
            self.ended = true;
        }

        fn can_short_circuit(&mut self) -> bool {
            self.polls += 1;
            match self.satisfied_after {
                Some(n) => self.accepted.len() >= n,
                None => false,
            }
        }
    }
}
