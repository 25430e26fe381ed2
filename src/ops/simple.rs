//! Stateless element-wise stages: filter, map, inspect, intersperse and
//! their enumerated variants.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::Operator;
use crate::stage::{HeadCore, Stage};

// ============================================================================
// Filter
// ============================================================================

/// Stage produced by [`Pipe::filter`](crate::pipe::Pipe::filter).
pub struct Filter<P, F> {
    upstream: P,
    predicate: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item) -> bool> Filter<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        // Dropping elements loses the size, nothing else.
        let flags = OpFlags::clears(StageFlags::SIZED).apply(upstream.flags());
        Self {
            upstream,
            predicate: Some(predicate),
            flags,
        }
    }
}

impl<P, F> Stage for Filter<P, F>
where
    P: Stage,
    F: FnMut(&P::Item) -> bool,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<FilterOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let predicate = self.predicate.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(FilterOp { predicate, next })
    }
}

/// Operator for [`Filter`].
pub struct FilterOp<F, N> {
    predicate: F,
    next: N,
}

impl<T, F, N> Operator<T> for FilterOp<F, N>
where
    F: FnMut(&T) -> bool,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        if (self.predicate)(&value) {
            self.next.accept(value);
        }
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// FilterEnumerated
// ============================================================================

/// Stage produced by
/// [`Pipe::filter_enumerated`](crate::pipe::Pipe::filter_enumerated):
/// the predicate also sees the element's position in this stage's input.
pub struct FilterEnumerated<P, F> {
    upstream: P,
    predicate: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(u64, &P::Item) -> bool> FilterEnumerated<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED).apply(upstream.flags());
        Self {
            upstream,
            predicate: Some(predicate),
            flags,
        }
    }
}

impl<P, F> Stage for FilterEnumerated<P, F>
where
    P: Stage,
    F: FnMut(u64, &P::Item) -> bool,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<FilterEnumeratedOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let predicate = self.predicate.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(FilterEnumeratedOp {
            predicate,
            next,
            index: 0,
        })
    }
}

/// Operator for [`FilterEnumerated`].
pub struct FilterEnumeratedOp<F, N> {
    predicate: F,
    next: N,
    index: u64,
}

impl<T, F, N> Operator<T> for FilterEnumeratedOp<F, N>
where
    F: FnMut(u64, &T) -> bool,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        let index = self.index;
        self.index += 1;
        if (self.predicate)(index, &value) {
            self.next.accept(value);
        }
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// Map
// ============================================================================

/// Stage produced by [`Pipe::map`](crate::pipe::Pipe::map).
pub struct Map<P, F, T> {
    upstream: P,
    mapper: Option<F>,
    flags: StageFlags,
    _out: PhantomData<fn() -> T>,
}

impl<P: Stage, T, F: FnMut(P::Item) -> T> Map<P, F, T> {
    pub(crate) fn new(upstream: P, mapper: F) -> Self {
        // The element count survives a 1:1 transform, element properties
        // do not.
        let flags = OpFlags::clears(
            StageFlags::SORTED | StageFlags::REVERSE_SORTED | StageFlags::DISTINCT,
        )
        .apply(upstream.flags());
        Self {
            upstream,
            mapper: Some(mapper),
            flags,
            _out: PhantomData,
        }
    }
}

impl<P, F, T> Stage for Map<P, F, T>
where
    P: Stage,
    F: FnMut(P::Item) -> T,
{
    type Item = T;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<MapOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let mapper = self.mapper.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(MapOp { mapper, next })
    }
}

/// Operator for [`Map`].
pub struct MapOp<F, N> {
    mapper: F,
    next: N,
}

impl<T, R, F, N> Operator<T> for MapOp<F, N>
where
    F: FnMut(T) -> R,
    N: Operator<R>,
{
    fn begin(&mut self, size_hint: Option<u64>) {
        self.next.begin(size_hint);
    }

    fn accept(&mut self, value: T) {
        self.next.accept((self.mapper)(value));
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// MapEnumerated
// ============================================================================

/// Stage produced by
/// [`Pipe::map_enumerated`](crate::pipe::Pipe::map_enumerated).
pub struct MapEnumerated<P, F, T> {
    upstream: P,
    mapper: Option<F>,
    flags: StageFlags,
    _out: PhantomData<fn() -> T>,
}

impl<P: Stage, T, F: FnMut(u64, P::Item) -> T> MapEnumerated<P, F, T> {
    pub(crate) fn new(upstream: P, mapper: F) -> Self {
        let flags = OpFlags::clears(
            StageFlags::SORTED | StageFlags::REVERSE_SORTED | StageFlags::DISTINCT,
        )
        .apply(upstream.flags());
        Self {
            upstream,
            mapper: Some(mapper),
            flags,
            _out: PhantomData,
        }
    }
}

impl<P, F, T> Stage for MapEnumerated<P, F, T>
where
    P: Stage,
    F: FnMut(u64, P::Item) -> T,
{
    type Item = T;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<MapEnumeratedOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let mapper = self.mapper.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(MapEnumeratedOp {
            mapper,
            next,
            index: 0,
        })
    }
}

/// Operator for [`MapEnumerated`].
pub struct MapEnumeratedOp<F, N> {
    mapper: F,
    next: N,
    index: u64,
}

impl<T, R, F, N> Operator<T> for MapEnumeratedOp<F, N>
where
    F: FnMut(u64, T) -> R,
    N: Operator<R>,
{
    fn begin(&mut self, size_hint: Option<u64>) {
        self.next.begin(size_hint);
    }

    fn accept(&mut self, value: T) {
        let index = self.index;
        self.index += 1;
        self.next.accept((self.mapper)(index, value));
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// Inspect
// ============================================================================

/// Stage produced by [`Pipe::inspect`](crate::pipe::Pipe::inspect):
/// observes every element without changing anything, flags included.
pub struct Inspect<P, F> {
    upstream: P,
    callback: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item)> Inspect<P, F> {
    pub(crate) fn new(upstream: P, callback: F) -> Self {
        let flags = upstream.flags();
        Self {
            upstream,
            callback: Some(callback),
            flags,
        }
    }
}

impl<P, F> Stage for Inspect<P, F>
where
    P: Stage,
    F: FnMut(&P::Item),
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<InspectOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let callback = self.callback.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(InspectOp { callback, next })
    }
}

/// Operator for [`Inspect`].
pub struct InspectOp<F, N> {
    callback: F,
    next: N,
}

impl<T, F, N> Operator<T> for InspectOp<F, N>
where
    F: FnMut(&T),
    N: Operator<T>,
{
    fn begin(&mut self, size_hint: Option<u64>) {
        self.next.begin(size_hint);
    }

    fn accept(&mut self, value: T) {
        (self.callback)(&value);
        self.next.accept(value);
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// Intersperse
// ============================================================================

/// Stage produced by [`Pipe::intersperse`](crate::pipe::Pipe::intersperse):
/// a cloned separator between every two consecutive elements.
pub struct Intersperse<P: Stage> {
    upstream: P,
    separator: Option<P::Item>,
    flags: StageFlags,
}

impl<P: Stage> Intersperse<P>
where
    P::Item: Clone,
{
    pub(crate) fn new(upstream: P, separator: P::Item) -> Self {
        let flags = OpFlags::clears(
            StageFlags::SIZED
                | StageFlags::SORTED
                | StageFlags::REVERSE_SORTED
                | StageFlags::DISTINCT,
        )
        .apply(upstream.flags());
        Self {
            upstream,
            separator: Some(separator),
            flags,
        }
    }
}

impl<P> Stage for Intersperse<P>
where
    P: Stage,
    P::Item: Clone,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<IntersperseOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let separator = self.separator.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(IntersperseOp {
            separator,
            next,
            first: true,
        })
    }
}

/// Operator for [`Intersperse`].
pub struct IntersperseOp<T, N> {
    separator: T,
    next: N,
    first: bool,
}

impl<T, N> Operator<T> for IntersperseOp<T, N>
where
    T: Clone,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        if self.first {
            self.first = false;
        } else {
            self.next.accept(self.separator.clone());
            // A separator must not become a dangling trailer when the
            // consumer fills up between the pair.
            if self.next.can_short_circuit() {
                return;
            }
        }
        self.next.accept(value);
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::Recording;

    #[test]
    fn filter_drops_and_clears_size_hint() {
        let mut op = FilterOp {
            predicate: |n: &i32| n % 2 == 0,
            next: Recording::new(),
        };
        op.begin(Some(4));
        for n in [1, 2, 3, 4] {
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.begun, Some(None));
        assert_eq!(op.next.accepted, vec![2, 4]);
        assert!(op.next.ended);
    }

    #[test]
    fn map_preserves_size_hint() {
        let mut op = MapOp {
            mapper: |n: i32| n * 10,
            next: Recording::new(),
        };
        op.begin(Some(3));
        for n in [1, 2, 3] {
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.begun, Some(Some(3)));
        assert_eq!(op.next.accepted, vec![10, 20, 30]);
    }

    #[test]
    fn enumerated_variants_count_their_own_input() {
        let mut op = MapEnumeratedOp {
            mapper: |i: u64, v: &str| format!("{i}:{v}"),
            next: Recording::new(),
            index: 0,
        };
        op.begin(None);
        op.accept("a");
        op.accept("b");
        op.end();
        assert_eq!(op.next.accepted, vec!["0:a".to_string(), "1:b".to_string()]);
    }

    #[test]
    fn intersperse_separates_without_trailing_separator() {
        let mut op = IntersperseOp {
            separator: 0,
            next: Recording::new(),
            first: true,
        };
        op.begin(None);
        for n in [1, 2, 3] {
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.accepted, vec![1, 0, 2, 0, 3]);
    }

    #[test]
    fn intersperse_skips_element_when_consumer_fills_mid_pair() {
        // Consumer satisfied after 2 elements: the second separator may
        // land but the element after it must not.
        let mut op = IntersperseOp {
            separator: 0,
            next: Recording::satisfied_after(2),
            first: true,
        };
        op.begin(None);
        op.accept(1);
        op.accept(2);
        op.end();
        assert_eq!(op.next.accepted, vec![1, 0]);
    }
}
