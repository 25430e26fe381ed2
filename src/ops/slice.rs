//! Positional and predicate slicing: skip/limit, take-while, drop-while.

use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::Operator;
use crate::stage::{HeadCore, Stage};

// ============================================================================
// Slice (skip + limit)
// ============================================================================

/// Stage produced by [`Pipe::skip`](crate::pipe::Pipe::skip),
/// [`Pipe::limit`](crate::pipe::Pipe::limit) and
/// [`Pipe::slice`](crate::pipe::Pipe::slice).
///
/// A finite limit introduces the pipeline's short-circuit capability: the
/// driver switches to single-stepping and stops pulling the moment the
/// quota is reached.
pub struct Slice<P> {
    upstream: P,
    skip: u64,
    limit: Option<u64>,
    flags: StageFlags,
}

impl<P: Stage> Slice<P> {
    pub(crate) fn new(upstream: P, skip: u64, limit: Option<u64>) -> Self {
        let flags = if skip == 0 && limit.is_none() {
            upstream.flags()
        } else {
            let mut op = OpFlags::clears(StageFlags::SIZED);
            if limit.is_some() {
                op = op.and(OpFlags::sets(StageFlags::SHORT_CIRCUIT));
            }
            op.apply(upstream.flags())
        };
        Self {
            upstream,
            skip,
            limit,
            flags,
        }
    }
}

impl<P: Stage> Stage for Slice<P> {
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<SliceOp<N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(SliceOp {
            next,
            to_skip: self.skip,
            limit: self.limit,
            taken: 0,
        })
    }
}

/// Operator for [`Slice`].
pub struct SliceOp<N> {
    next: N,
    to_skip: u64,
    limit: Option<u64>,
    taken: u64,
}

impl<N> SliceOp<N> {
    fn satisfied(&self) -> bool {
        matches!(self.limit, Some(limit) if self.taken >= limit)
    }
}

impl<T, N: Operator<T>> Operator<T> for SliceOp<N> {
    fn begin(&mut self, size_hint: Option<u64>) {
        let sliced = size_hint.map(|size| {
            let after_skip = size.saturating_sub(self.to_skip);
            self.limit.map_or(after_skip, |limit| after_skip.min(limit))
        });
        self.next.begin(sliced);
    }

    fn accept(&mut self, value: T) {
        if self.to_skip > 0 {
            self.to_skip -= 1;
            return;
        }
        if self.satisfied() {
            return;
        }
        self.taken += 1;
        self.next.accept(value);
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.satisfied() || self.next.can_short_circuit()
    }
}

// ============================================================================
// TakeWhile
// ============================================================================

/// Stage produced by [`Pipe::take_while`](crate::pipe::Pipe::take_while).
pub struct TakeWhile<P, F> {
    upstream: P,
    predicate: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item) -> bool> TakeWhile<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED)
            .and(OpFlags::sets(StageFlags::SHORT_CIRCUIT))
            .apply(upstream.flags());
        Self {
            upstream,
            predicate: Some(predicate),
            flags,
        }
    }
}

impl<P, F> Stage for TakeWhile<P, F>
where
    P: Stage,
    F: FnMut(&P::Item) -> bool,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<TakeWhileOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let predicate = self.predicate.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(TakeWhileOp {
            predicate,
            next,
            alive: true,
        })
    }
}

/// Operator for [`TakeWhile`].
pub struct TakeWhileOp<F, N> {
    predicate: F,
    next: N,
    alive: bool,
}

impl<T, F, N> Operator<T> for TakeWhileOp<F, N>
where
    F: FnMut(&T) -> bool,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        if !self.alive {
            return;
        }
        if (self.predicate)(&value) {
            self.next.accept(value);
        } else {
            self.alive = false;
        }
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        !self.alive || self.next.can_short_circuit()
    }
}

// ============================================================================
// DropWhile
// ============================================================================

/// Stage produced by [`Pipe::drop_while`](crate::pipe::Pipe::drop_while).
pub struct DropWhile<P, F> {
    upstream: P,
    predicate: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item) -> bool> DropWhile<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED).apply(upstream.flags());
        Self {
            upstream,
            predicate: Some(predicate),
            flags,
        }
    }
}

impl<P, F> Stage for DropWhile<P, F>
where
    P: Stage,
    F: FnMut(&P::Item) -> bool,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<DropWhileOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let predicate = self.predicate.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(DropWhileOp {
            predicate,
            next,
            dropping: true,
        })
    }
}

/// Operator for [`DropWhile`].
pub struct DropWhileOp<F, N> {
    predicate: F,
    next: N,
    dropping: bool,
}

impl<T, F, N> Operator<T> for DropWhileOp<F, N>
where
    F: FnMut(&T) -> bool,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        if self.dropping {
            if (self.predicate)(&value) {
                return;
            }
            self.dropping = false;
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
    fn slice_skips_then_limits() {
        let mut op = SliceOp {
            next: Recording::new(),
            to_skip: 2,
            limit: Some(3),
            taken: 0,
        };
        op.begin(Some(10));
        for n in 0..10 {
            if op.can_short_circuit() {
                break;
            }
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.begun, Some(Some(3)));
        assert_eq!(op.next.accepted, vec![2, 3, 4]);
    }

    #[test]
    fn slice_is_satisfied_exactly_at_the_limit() {
        let mut op = SliceOp {
            next: Recording::new(),
            to_skip: 0,
            limit: Some(1),
            taken: 0,
        };
        op.begin(None);
        assert!(!op.can_short_circuit());
        op.accept(7);
        assert!(op.can_short_circuit());
        // Satisfied: the downstream poll is skipped entirely.
        assert_eq!(op.next.polls, 1);
    }

    #[test]
    fn limit_zero_never_accepts() {
        let mut op = SliceOp {
            next: Recording::<i32>::new(),
            to_skip: 0,
            limit: Some(0),
            taken: 0,
        };
        op.begin(None);
        assert!(op.can_short_circuit());
        op.end();
        assert!(op.next.accepted.is_empty());
    }

    #[test]
    fn take_while_stops_at_first_failure_for_good() {
        let mut op = TakeWhileOp {
            predicate: |n: &i32| *n < 3,
            next: Recording::new(),
            alive: true,
        };
        op.begin(None);
        for n in [1, 2, 5, 1] {
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.accepted, vec![1, 2]);
        assert!(op.can_short_circuit());
    }

    #[test]
    fn drop_while_resumes_for_good_after_first_failure() {
        let mut op = DropWhileOp {
            predicate: |n: &i32| *n < 3,
            next: Recording::new(),
            dropping: true,
        };
        op.begin(None);
        for n in [1, 2, 5, 1] {
            op.accept(n);
        }
        op.end();
        assert_eq!(op.next.accepted, vec![5, 1]);
    }
}
