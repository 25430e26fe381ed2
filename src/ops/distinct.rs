//! Duplicate removal.
//!
//! `distinct` picks one of three behaviors at construction, purely from
//! the upstream flags: a pass-through when the input is already
//! `DISTINCT`, a last-seen comparison when the input is sorted either way
//! (equal elements are adjacent), and a seen-set otherwise. All three are
//! streaming; nothing is buffered to the end.

use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::Operator;
use crate::stage::{HeadCore, Stage};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum DistinctMode {
    Pass,
    SortedRun,
    Hashed,
}

/// Stage produced by [`Pipe::distinct`](crate::pipe::Pipe::distinct).
pub struct Distinct<P> {
    upstream: P,
    mode: DistinctMode,
    flags: StageFlags,
}

impl<P: Stage> Distinct<P> {
    pub(crate) fn new(upstream: P) -> Self {
        let up = upstream.flags();
        let (mode, flags) = if up.contains(StageFlags::DISTINCT) {
            (DistinctMode::Pass, up)
        } else {
            let mode = if up.intersects(StageFlags::SORTED | StageFlags::REVERSE_SORTED) {
                DistinctMode::SortedRun
            } else {
                DistinctMode::Hashed
            };
            let flags = OpFlags::sets(StageFlags::DISTINCT)
                .and(OpFlags::clears(StageFlags::SIZED))
                .apply(up);
            (mode, flags)
        };
        Self {
            upstream,
            mode,
            flags,
        }
    }
}

impl<P> Stage for Distinct<P>
where
    P: Stage,
    P::Item: Eq + Hash + Clone,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<DistinctOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(DistinctOp {
            next,
            mode: self.mode,
            last: None,
            seen: HashSet::new(),
        })
    }
}

/// Operator for [`Distinct`].
pub struct DistinctOp<T, N> {
    next: N,
    mode: DistinctMode,
    last: Option<T>,
    seen: HashSet<T>,
}

impl<T, N> Operator<T> for DistinctOp<T, N>
where
    T: Eq + Hash + Clone,
    N: Operator<T>,
{
    fn begin(&mut self, size_hint: Option<u64>) {
        match self.mode {
            DistinctMode::Pass => self.next.begin(size_hint),
            DistinctMode::SortedRun | DistinctMode::Hashed => self.next.begin(None),
        }
    }

    fn accept(&mut self, value: T) {
        match self.mode {
            DistinctMode::Pass => self.next.accept(value),
            DistinctMode::SortedRun => {
                if self.last.as_ref() != Some(&value) {
                    self.last = Some(value.clone());
                    self.next.accept(value);
                }
            }
            DistinctMode::Hashed => {
                if self.seen.insert(value.clone()) {
                    self.next.accept(value);
                }
            }
        }
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

/// Stage produced by
/// [`Pipe::distinct_by`](crate::pipe::Pipe::distinct_by): one element per
/// key, the first encountered.
///
/// Key-based deduplication never claims `DISTINCT`: distinct keys say
/// nothing about the elements themselves.
pub struct DistinctBy<P, F, K> {
    upstream: P,
    key: Option<F>,
    flags: StageFlags,
    _key: PhantomData<fn() -> K>,
}

impl<P: Stage, K, F: FnMut(&P::Item) -> K> DistinctBy<P, F, K> {
    pub(crate) fn new(upstream: P, key: F) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED).apply(upstream.flags());
        Self {
            upstream,
            key: Some(key),
            flags,
            _key: PhantomData,
        }
    }
}

impl<P, F, K> Stage for DistinctBy<P, F, K>
where
    P: Stage,
    F: FnMut(&P::Item) -> K,
    K: Eq + Hash,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<DistinctByOp<F, K, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let key = self.key.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(DistinctByOp {
            next,
            key,
            seen: HashSet::new(),
        })
    }
}

/// Operator for [`DistinctBy`].
pub struct DistinctByOp<F, K, N> {
    next: N,
    key: F,
    seen: HashSet<K>,
}

impl<T, F, K, N> Operator<T> for DistinctByOp<F, K, N>
where
    F: FnMut(&T) -> K,
    K: Eq + Hash,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        if self.seen.insert((self.key)(&value)) {
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
