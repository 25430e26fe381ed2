//! The fluent pipeline surface.
//!
//! [`Pipe`] is implemented for every [`Stage`], so everything returned
//! by the [`source`](crate::source) constructors or by another
//! combinator carries the full surface. Combinators take `self` and
//! return a new stage without touching data; terminals take `&mut self`,
//! execute the pipeline once, and return a [`Result`]. Running a
//! second terminal on the same pipeline fails with
//! [`Error::SourceConsumed`](crate::Error::SourceConsumed).

use std::cmp::Ordering;
use std::hash::Hash;

use rand::Rng;

use crate::error::Result;
use crate::flags::StageFlags;
use crate::ops::terminal::{
    CollectOp, CountOp, FindFirstOp, FindLastOp, FoldOp, ForEachEnumeratedOp, ForEachOp, MatchOp,
    ReduceWithOp,
};
use crate::ops::{
    Distinct, DistinctBy, DropLast, DropWhile, Filter, FilterEnumerated, FlatMap, Inspect,
    Intersperse, Map, MapEnumerated, Merge, Partition, PartitionBy, Reverse, Shuffle, Slice, Sort,
    TakeLast, TakeWhile,
};
use crate::policy::{MergePolicy, MergeRemainingPolicy, PartitionPolicy};
use crate::pull::{PipeCursor, PipeIter};
use crate::stage::{drive, Stage};

/// Comparator type used by the natural-order sorts.
pub type NaturalOrder<T> = fn(&T, &T) -> Ordering;

/// The pipeline surface: declarative combinators plus one-shot
/// terminals.
pub trait Pipe: Stage + Sized {
    // ------------------------------------------------------------------
    // Stateless combinators
    // ------------------------------------------------------------------

    /// Keep only elements matching the predicate.
    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Like [`filter`](Pipe::filter), with the element's position in
    /// this stage's input as a first argument.
    fn filter_enumerated<F>(self, predicate: F) -> FilterEnumerated<Self, F>
    where
        F: FnMut(u64, &Self::Item) -> bool,
    {
        FilterEnumerated::new(self, predicate)
    }

    /// Transform every element.
    fn map<T, F>(self, mapper: F) -> Map<Self, F, T>
    where
        F: FnMut(Self::Item) -> T,
    {
        Map::new(self, mapper)
    }

    /// Like [`map`](Pipe::map), with the element's position in this
    /// stage's input as a first argument.
    fn map_enumerated<T, F>(self, mapper: F) -> MapEnumerated<Self, F, T>
    where
        F: FnMut(u64, Self::Item) -> T,
    {
        MapEnumerated::new(self, mapper)
    }

    /// Observe every element without changing the stream.
    fn inspect<F>(self, callback: F) -> Inspect<Self, F>
    where
        F: FnMut(&Self::Item),
    {
        Inspect::new(self, callback)
    }

    /// Replace every element with the output of its own sub-pipeline.
    ///
    /// # Panics
    ///
    /// Panics during execution if the mapper returns a pipeline whose
    /// source has already been consumed.
    fn flat_map<Q, F>(self, mapper: F) -> FlatMap<Self, F, Q>
    where
        Q: Stage,
        F: FnMut(Self::Item) -> Q,
    {
        FlatMap::new(self, mapper)
    }

    /// Keep at most the first `count` elements. Introduces the
    /// pipeline's short-circuit capability: on an infinite source,
    /// exactly `count` elements are pulled.
    fn limit(self, count: u64) -> Slice<Self> {
        Slice::new(self, 0, Some(count))
    }

    /// Discard the first `count` elements.
    fn skip(self, count: u64) -> Slice<Self> {
        Slice::new(self, count, None)
    }

    /// Discard `skip` elements, then keep at most `limit`.
    fn slice(self, skip: u64, limit: u64) -> Slice<Self> {
        Slice::new(self, skip, Some(limit))
    }

    /// Keep elements while the predicate holds, then stop for good.
    fn take_while<F>(self, predicate: F) -> TakeWhile<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        TakeWhile::new(self, predicate)
    }

    /// Discard elements while the predicate holds, then keep the rest
    /// unconditionally.
    fn drop_while<F>(self, predicate: F) -> DropWhile<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        DropWhile::new(self, predicate)
    }

    /// Insert a cloned separator between every two consecutive
    /// elements.
    fn intersperse(self, separator: Self::Item) -> Intersperse<Self>
    where
        Self::Item: Clone,
    {
        Intersperse::new(self, separator)
    }

    // ------------------------------------------------------------------
    // Collecting combinators
    // ------------------------------------------------------------------

    /// Sort ascending by natural order.
    ///
    /// Decided purely from flags at construction: on an already-sorted
    /// pipeline this is a pass-through, on a reverse-sorted one a plain
    /// reversal; no comparison runs in either case.
    fn sort(self) -> Sort<Self, NaturalOrder<Self::Item>>
    where
        Self::Item: Ord,
    {
        Sort::natural(self, |a, b| a.cmp(b))
    }

    /// Sort descending by natural order; mirror image of
    /// [`sort`](Pipe::sort).
    fn sort_desc(self) -> Sort<Self, NaturalOrder<Self::Item>>
    where
        Self::Item: Ord,
    {
        Sort::descending(self, |a, b| b.cmp(a))
    }

    /// Sort by an arbitrary comparator. Always a full sort; the output
    /// claims neither natural order.
    fn sort_by<F>(self, compare: F) -> Sort<Self, F>
    where
        F: FnMut(&Self::Item, &Self::Item) -> Ordering,
    {
        Sort::by(self, compare)
    }

    /// Reverse the encounter order.
    fn reverse(self) -> Reverse<Self> {
        Reverse::new(self)
    }

    /// Emit the elements in uniformly random order.
    fn shuffle<R: Rng>(self, rng: R) -> Shuffle<Self, R> {
        Shuffle::new(self, rng)
    }

    /// Keep only the last `count` elements.
    fn take_last(self, count: u64) -> TakeLast<Self> {
        TakeLast::new(self, count)
    }

    /// Discard the last `count` elements.
    fn drop_last(self, count: u64) -> DropLast<Self> {
        DropLast::new(self, count)
    }

    /// Keep the first occurrence of every element.
    fn distinct(self) -> Distinct<Self>
    where
        Self::Item: Eq + Hash + Clone,
    {
        Distinct::new(self)
    }

    /// Keep the first element of every key.
    fn distinct_by<K, F>(self, key: F) -> DistinctBy<Self, F, K>
    where
        K: Eq + Hash,
        F: FnMut(&Self::Item) -> K,
    {
        DistinctBy::new(self, key)
    }

    // ------------------------------------------------------------------
    // Multi-source / grouping combinators
    // ------------------------------------------------------------------

    /// Merge with another pipeline under a pair policy.
    ///
    /// `self` is "ours" and is pushed; `other` is "theirs" and is pulled
    /// one element at a time, never ahead of need. Each pairing of the
    /// two current candidates is judged by `pair`; see [`MergePolicy`]
    /// for the verdicts and [`MergeRemainingPolicy`] for what happens
    /// once one side runs out.
    fn merge<Q, F>(
        self,
        other: Q,
        pair: F,
        remaining: MergeRemainingPolicy,
    ) -> Merge<Self, Q, F>
    where
        Q: Stage<Item = Self::Item>,
        Self::Item: Clone,
        F: FnMut(Option<&Self::Item>, Option<&Self::Item>) -> MergePolicy,
    {
        Merge::new(self, other, pair, remaining)
    }

    /// Group into consecutive sub-pipelines of `size` elements; the last
    /// group may be smaller but is never empty.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    fn partition(self, size: usize) -> Partition<Self> {
        Partition::new(self, size)
    }

    /// Group into sub-pipelines with boundaries decided per element by a
    /// [`PartitionPolicy`] verdict. Groups are never empty.
    fn partition_by<F>(self, policy: F) -> PartitionBy<Self, F>
    where
        F: FnMut(&Self::Item) -> PartitionPolicy,
    {
        PartitionBy::new(self, policy)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register a cleanup action, run once by [`close`](Pipe::close) in
    /// registration order.
    fn on_close<F>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.head_mut().push_close_action(Box::new(action));
        self
    }

    /// Run all registered close actions exactly once.
    ///
    /// Every action runs even if an earlier one failed; the first
    /// failure is returned with the later ones attached as suppressed.
    /// Closing never executes the pipeline.
    fn close(&mut self) -> Result<()> {
        self.head_mut().run_close_actions()
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    /// Execute, feeding every element to `action`.
    fn for_each<F>(&mut self, action: F) -> Result<()>
    where
        F: FnMut(Self::Item),
    {
        drive(self, StageFlags::EMPTY, &mut ForEachOp { action })
    }

    /// Execute, feeding every element and its position to `action`.
    fn for_each_enumerated<F>(&mut self, action: F) -> Result<()>
    where
        F: FnMut(u64, Self::Item),
    {
        drive(self, StageFlags::EMPTY, &mut ForEachEnumeratedOp { action, index: 0 })
    }

    /// Execute and count the elements.
    fn count(&mut self) -> Result<u64> {
        let mut op = CountOp { count: 0 };
        drive(self, StageFlags::EMPTY, &mut op)?;
        Ok(op.count)
    }

    /// Execute and collect into a `Vec`.
    fn to_vec(&mut self) -> Result<Vec<Self::Item>> {
        let mut op = CollectOp { out: Vec::new() };
        drive(self, StageFlags::EMPTY, &mut op)?;
        Ok(op.out)
    }

    /// Execute and fold every element into an accumulator.
    fn reduce<R, F>(&mut self, init: R, fold: F) -> Result<R>
    where
        F: FnMut(R, Self::Item) -> R,
    {
        let mut op = FoldOp {
            acc: Some(init),
            fold,
        };
        drive(self, StageFlags::EMPTY, &mut op)?;
        Ok(op.finish())
    }

    /// Execute and combine the elements pairwise; `None` on an empty
    /// pipeline.
    fn reduce_with<F>(&mut self, reduce: F) -> Result<Option<Self::Item>>
    where
        F: FnMut(Self::Item, Self::Item) -> Self::Item,
    {
        let mut op = ReduceWithOp { acc: None, reduce };
        drive(self, StageFlags::EMPTY, &mut op)?;
        Ok(op.acc)
    }

    /// Smallest element by natural order (first of equals).
    ///
    /// On a pipeline flagged sorted either way this is the first or last
    /// element, found without a single comparison.
    fn min(&mut self) -> Result<Option<Self::Item>>
    where
        Self::Item: Ord,
    {
        let flags = self.flags();
        if flags.contains(StageFlags::SORTED) {
            self.find_first()
        } else if flags.contains(StageFlags::REVERSE_SORTED) {
            self.find_last()
        } else {
            self.reduce_with(|a, b| if b < a { b } else { a })
        }
    }

    /// Largest element by natural order (last of equals).
    fn max(&mut self) -> Result<Option<Self::Item>>
    where
        Self::Item: Ord,
    {
        let flags = self.flags();
        if flags.contains(StageFlags::SORTED) {
            self.find_last()
        } else if flags.contains(StageFlags::REVERSE_SORTED) {
            self.find_first()
        } else {
            self.reduce_with(|a, b| if b >= a { b } else { a })
        }
    }

    /// Smallest element by an arbitrary comparator.
    fn min_by<F>(&mut self, mut compare: F) -> Result<Option<Self::Item>>
    where
        F: FnMut(&Self::Item, &Self::Item) -> Ordering,
    {
        self.reduce_with(move |a, b| {
            if compare(&b, &a) == Ordering::Less {
                b
            } else {
                a
            }
        })
    }

    /// Largest element by an arbitrary comparator.
    fn max_by<F>(&mut self, mut compare: F) -> Result<Option<Self::Item>>
    where
        F: FnMut(&Self::Item, &Self::Item) -> Ordering,
    {
        self.reduce_with(move |a, b| {
            if compare(&b, &a) == Ordering::Less {
                a
            } else {
                b
            }
        })
    }

    /// Whether any element matches; stops at the first match.
    fn any<F>(&mut self, predicate: F) -> Result<bool>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut op = MatchOp {
            predicate,
            match_any: true,
            halted: false,
        };
        drive(self, StageFlags::SHORT_CIRCUIT, &mut op)?;
        Ok(op.result())
    }

    /// Whether every element matches; stops at the first
    /// counterexample.
    fn all<F>(&mut self, predicate: F) -> Result<bool>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        let mut op = MatchOp {
            predicate,
            match_any: false,
            halted: false,
        };
        drive(self, StageFlags::SHORT_CIRCUIT, &mut op)?;
        Ok(op.result())
    }

    /// The first element, pulling no more than necessary.
    fn find_first(&mut self) -> Result<Option<Self::Item>> {
        let mut op = FindFirstOp { found: None };
        drive(self, StageFlags::SHORT_CIRCUIT, &mut op)?;
        Ok(op.found)
    }

    /// The last element; consumes the whole pipeline.
    fn find_last(&mut self) -> Result<Option<Self::Item>> {
        let mut op = FindLastOp { found: None };
        drive(self, StageFlags::EMPTY, &mut op)?;
        Ok(op.found)
    }

    /// Re-expose this pipeline as a lazily driven [`Cursor`]
    /// (consuming its source; see [`PipeCursor`]).
    ///
    /// [`Cursor`]: crate::cursor::Cursor
    fn into_cursor(self) -> Result<PipeCursor<Self>> {
        PipeCursor::new(self)
    }

    /// Re-expose this pipeline as a std [`Iterator`].
    fn into_iter(self) -> Result<PipeIter<Self>> {
        Ok(PipeIter::new(PipeCursor::new(self)?))
    }
}

impl<S: Stage> Pipe for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    #[test]
    fn combinators_compose_without_touching_data() {
        let touched = std::rc::Rc::new(std::cell::RefCell::new(false));
        let seen = std::rc::Rc::clone(&touched);
        let pipe = source::from_vec(vec![3, 1, 2])
            .inspect(move |_| *seen.borrow_mut() = true)
            .map(|n| n * 2)
            .filter(|n| *n > 2);
        assert!(!*touched.borrow());
        drop(pipe);
        assert!(!*touched.borrow());
    }

    #[test]
    fn terminal_chain_end_to_end() {
        let mut pipe = source::from_iter(1..=10)
            .filter(|n| n % 2 == 0)
            .map(|n| n * n);
        assert_eq!(pipe.to_vec().unwrap(), vec![4, 16, 36, 64, 100]);
    }

    #[test]
    fn min_max_on_unsorted_input() {
        assert_eq!(source::of([3, 1, 2]).min().unwrap(), Some(1));
        assert_eq!(source::of([3, 1, 2]).max().unwrap(), Some(3));
        assert_eq!(source::empty::<i32>().min().unwrap(), None);
    }

    #[test]
    fn min_and_max_on_a_sorted_pipeline_use_the_flags() {
        let mut sorted = source::of([3, 1, 2]).sort();
        assert!(sorted.flags().contains(StageFlags::SORTED));
        assert_eq!(sorted.min().unwrap(), Some(1));

        let mut descending = source::of([3, 1, 2]).sort_desc();
        assert!(descending.flags().contains(StageFlags::REVERSE_SORTED));
        assert_eq!(descending.max().unwrap(), Some(3));
    }

    #[test]
    fn any_and_all_short_circuit() {
        let mut seen = Vec::new();
        let mut pipe = source::from_iter(1..).inspect(|n| seen.push(*n));
        // `1..` is endless; only a short-circuiting terminal returns.
        assert!(pipe.any(|n| *n == 3).unwrap());

        let mut pipe = source::from_iter(1..).map(|n| n * 2);
        assert!(!pipe.all(|n| *n < 5).unwrap());
    }

    #[test]
    fn re_execution_is_an_error() {
        let mut pipe = source::of([1, 2, 3]).map(|n| n + 1);
        assert_eq!(pipe.count().unwrap(), 3);
        assert!(matches!(
            pipe.count(),
            Err(crate::Error::SourceConsumed)
        ));
    }
}
