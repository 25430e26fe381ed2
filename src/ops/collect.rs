//! Buffering stages: operators that must (in general) see their whole
//! input before emitting anything.
//!
//! All of them follow the same shape: buffer on `accept`, transform and
//! replay on `end`. While collecting they answer `false` to
//! [`Operator::can_short_circuit`], since upstream must not stop early
//! on their behalf, but the poll itself is recorded, and a recorded
//! replay re-checks downstream satisfaction before every element so a
//! short-circuiting consumer still stops the replay as early as it likes.
//!
//! Sort and reverse additionally degenerate based purely on the upstream
//! stage's flags, decided at construction: sorting an already-sorted
//! pipeline is a pass-through, sorting a reverse-sorted one is a plain
//! buffered reversal with no comparisons at all.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::{replay, Operator};
use crate::stage::{HeadCore, Stage};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum SortMode {
    /// Input already has the requested order.
    Pass,
    /// Input has exactly the opposite order: buffer and reverse, no
    /// comparator involved.
    Flip,
    /// No usable order: buffer and sort.
    Full,
}

// ============================================================================
// Sort
// ============================================================================

/// Stage produced by [`Pipe::sort`](crate::pipe::Pipe::sort),
/// [`Pipe::sort_desc`](crate::pipe::Pipe::sort_desc) and
/// [`Pipe::sort_by`](crate::pipe::Pipe::sort_by).
pub struct Sort<P, F> {
    upstream: P,
    compare: Option<F>,
    mode: SortMode,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item, &P::Item) -> Ordering> Sort<P, F> {
    /// Ascending natural order; degenerates from the upstream flags.
    pub(crate) fn natural(upstream: P, compare: F) -> Self {
        let up = upstream.flags();
        let mode = if up.contains(StageFlags::SORTED) {
            SortMode::Pass
        } else if up.contains(StageFlags::REVERSE_SORTED) {
            SortMode::Flip
        } else {
            SortMode::Full
        };
        let flags = OpFlags::sets(StageFlags::SORTED)
            .and(OpFlags::clears(StageFlags::REVERSE_SORTED))
            .apply(up);
        Self {
            upstream,
            compare: Some(compare),
            mode,
            flags,
        }
    }

    /// Descending natural order; mirror image of [`Sort::natural`].
    pub(crate) fn descending(upstream: P, compare: F) -> Self {
        let up = upstream.flags();
        let mode = if up.contains(StageFlags::REVERSE_SORTED) {
            SortMode::Pass
        } else if up.contains(StageFlags::SORTED) {
            SortMode::Flip
        } else {
            SortMode::Full
        };
        let flags = OpFlags::sets(StageFlags::REVERSE_SORTED)
            .and(OpFlags::clears(StageFlags::SORTED))
            .apply(up);
        Self {
            upstream,
            compare: Some(compare),
            mode,
            flags,
        }
    }

    /// Arbitrary comparator: always a full sort, and the output claims
    /// neither natural order.
    pub(crate) fn by(upstream: P, compare: F) -> Self {
        let flags = OpFlags::clears(StageFlags::SORTED | StageFlags::REVERSE_SORTED)
            .apply(upstream.flags());
        Self {
            upstream,
            compare: Some(compare),
            mode: SortMode::Full,
            flags,
        }
    }
}

impl<P, F> Stage for Sort<P, F>
where
    P: Stage,
    F: FnMut(&P::Item, &P::Item) -> Ordering,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<SortOp<P::Item, F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let compare = self.compare.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(SortOp {
            compare,
            next,
            mode: self.mode,
            buf: Vec::new(),
            requested: false,
        })
    }
}

/// Operator for [`Sort`].
pub struct SortOp<T, F, N> {
    compare: F,
    next: N,
    mode: SortMode,
    buf: Vec<T>,
    requested: bool,
}

impl<T, F, N> Operator<T> for SortOp<T, F, N>
where
    F: FnMut(&T, &T) -> Ordering,
    N: Operator<T>,
{
    fn begin(&mut self, size_hint: Option<u64>) {
        match self.mode {
            SortMode::Pass => self.next.begin(size_hint),
            SortMode::Flip | SortMode::Full => {
                if let Some(size) = size_hint {
                    self.buf.reserve(size.min(isize::MAX as u64) as usize);
                }
            }
        }
    }

    fn accept(&mut self, value: T) {
        match self.mode {
            SortMode::Pass => self.next.accept(value),
            SortMode::Flip | SortMode::Full => self.buf.push(value),
        }
    }

    fn end(&mut self) {
        match self.mode {
            SortMode::Pass => self.next.end(),
            SortMode::Flip => {
                let mut buf = std::mem::take(&mut self.buf);
                buf.reverse();
                replay(buf, &mut self.next, self.requested);
            }
            SortMode::Full => {
                let mut buf = std::mem::take(&mut self.buf);
                let compare = &mut self.compare;
                buf.sort_by(|a, b| compare(a, b));
                replay(buf, &mut self.next, self.requested);
            }
        }
    }

    fn can_short_circuit(&mut self) -> bool {
        match self.mode {
            SortMode::Pass => self.next.can_short_circuit(),
            SortMode::Flip | SortMode::Full => {
                self.requested = true;
                false
            }
        }
    }
}

// ============================================================================
// Reverse
// ============================================================================

/// Stage produced by [`Pipe::reverse`](crate::pipe::Pipe::reverse).
/// Swaps the two sortedness claims.
pub struct Reverse<P> {
    upstream: P,
    flags: StageFlags,
}

impl<P: Stage> Reverse<P> {
    pub(crate) fn new(upstream: P) -> Self {
        let up = upstream.flags();
        let mut flags = up.without(StageFlags::SORTED | StageFlags::REVERSE_SORTED);
        if up.contains(StageFlags::SORTED) {
            flags |= StageFlags::REVERSE_SORTED;
        }
        if up.contains(StageFlags::REVERSE_SORTED) {
            flags |= StageFlags::SORTED;
        }
        Self { upstream, flags }
    }
}

impl<P: Stage> Stage for Reverse<P> {
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<ReverseOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(ReverseOp {
            next,
            buf: Vec::new(),
            requested: false,
        })
    }
}

/// Operator for [`Reverse`].
pub struct ReverseOp<T, N> {
    next: N,
    buf: Vec<T>,
    requested: bool,
}

impl<T, N: Operator<T>> Operator<T> for ReverseOp<T, N> {
    fn begin(&mut self, size_hint: Option<u64>) {
        if let Some(size) = size_hint {
            self.buf.reserve(size.min(isize::MAX as u64) as usize);
        }
    }

    fn accept(&mut self, value: T) {
        self.buf.push(value);
    }

    fn end(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.reverse();
        replay(buf, &mut self.next, self.requested);
    }

    fn can_short_circuit(&mut self) -> bool {
        self.requested = true;
        false
    }
}

// ============================================================================
// Shuffle
// ============================================================================

/// Stage produced by [`Pipe::shuffle`](crate::pipe::Pipe::shuffle).
pub struct Shuffle<P, R> {
    upstream: P,
    rng: Option<R>,
    flags: StageFlags,
}

impl<P: Stage, R: Rng> Shuffle<P, R> {
    pub(crate) fn new(upstream: P, rng: R) -> Self {
        let flags = OpFlags::clears(StageFlags::SORTED | StageFlags::REVERSE_SORTED)
            .apply(upstream.flags());
        Self {
            upstream,
            rng: Some(rng),
            flags,
        }
    }
}

impl<P: Stage, R: Rng> Stage for Shuffle<P, R> {
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<ShuffleOp<P::Item, R, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let rng = self.rng.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(ShuffleOp {
            rng,
            next,
            buf: Vec::new(),
            requested: false,
        })
    }
}

/// Operator for [`Shuffle`].
pub struct ShuffleOp<T, R, N> {
    rng: R,
    next: N,
    buf: Vec<T>,
    requested: bool,
}

impl<T, R: Rng, N: Operator<T>> Operator<T> for ShuffleOp<T, R, N> {
    fn begin(&mut self, size_hint: Option<u64>) {
        if let Some(size) = size_hint {
            self.buf.reserve(size.min(isize::MAX as u64) as usize);
        }
    }

    fn accept(&mut self, value: T) {
        self.buf.push(value);
    }

    fn end(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.shuffle(&mut self.rng);
        replay(buf, &mut self.next, self.requested);
    }

    fn can_short_circuit(&mut self) -> bool {
        self.requested = true;
        false
    }
}

// ============================================================================
// TakeLast / DropLast
// ============================================================================

/// Stage produced by [`Pipe::take_last`](crate::pipe::Pipe::take_last).
pub struct TakeLast<P> {
    upstream: P,
    count: u64,
    flags: StageFlags,
}

impl<P: Stage> TakeLast<P> {
    pub(crate) fn new(upstream: P, count: u64) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED).apply(upstream.flags());
        Self {
            upstream,
            count,
            flags,
        }
    }
}

impl<P: Stage> Stage for TakeLast<P> {
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<TailOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(TailOp::new(next, self.count, true))
    }
}

/// Stage produced by [`Pipe::drop_last`](crate::pipe::Pipe::drop_last).
///
/// On a sized pipeline the emission quota is known up front, which makes
/// dropping the tail short-circuitable.
pub struct DropLast<P> {
    upstream: P,
    count: u64,
    flags: StageFlags,
}

impl<P: Stage> DropLast<P> {
    pub(crate) fn new(upstream: P, count: u64) -> Self {
        let flags = OpFlags::clears(StageFlags::SIZED)
            .and(OpFlags::sets(StageFlags::SHORT_CIRCUIT))
            .apply(upstream.flags());
        Self {
            upstream,
            count,
            flags,
        }
    }
}

impl<P: Stage> Stage for DropLast<P> {
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<TailOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(TailOp::new(next, self.count, false))
    }
}

enum TailState<T> {
    /// Sized take-last: skip the lead, stream the rest.
    SizedTake { to_skip: u64 },
    /// Sized drop-last: stream the quota, ignore the rest.
    SizedDrop { to_emit: u64 },
    /// Unknown size: ring buffer of the trailing `count` elements.
    Ring { ring: VecDeque<T> },
}

/// Operator shared by [`TakeLast`] and [`DropLast`]; the branch is picked
/// in `begin` from whether an exact size is known.
pub struct TailOp<T, N> {
    next: N,
    count: u64,
    take: bool,
    requested: bool,
    state: TailState<T>,
}

impl<T, N> TailOp<T, N> {
    fn new(next: N, count: u64, take: bool) -> Self {
        Self {
            next,
            count,
            take,
            requested: false,
            state: TailState::Ring {
                ring: VecDeque::new(),
            },
        }
    }
}

impl<T, N: Operator<T>> Operator<T> for TailOp<T, N> {
    fn begin(&mut self, size_hint: Option<u64>) {
        match (self.take, size_hint) {
            (true, Some(size)) => {
                self.next.begin(Some(size.min(self.count)));
                self.state = TailState::SizedTake {
                    to_skip: size.saturating_sub(self.count),
                };
            }
            (false, Some(size)) => {
                let to_emit = size.saturating_sub(self.count);
                self.next.begin(Some(to_emit));
                self.state = TailState::SizedDrop { to_emit };
            }
            (true, None) => {
                self.state = TailState::Ring {
                    ring: VecDeque::new(),
                };
            }
            (false, None) => {
                self.next.begin(None);
                self.state = TailState::Ring {
                    ring: VecDeque::new(),
                };
            }
        }
    }

    fn accept(&mut self, value: T) {
        match &mut self.state {
            TailState::SizedTake { to_skip } => {
                if *to_skip > 0 {
                    *to_skip -= 1;
                } else {
                    self.next.accept(value);
                }
            }
            TailState::SizedDrop { to_emit } => {
                if *to_emit > 0 {
                    *to_emit -= 1;
                    self.next.accept(value);
                }
            }
            TailState::Ring { ring } => {
                ring.push_back(value);
                if ring.len() as u64 > self.count {
                    if let Some(evicted) = ring.pop_front() {
                        if !self.take {
                            self.next.accept(evicted);
                        }
                    }
                }
            }
        }
    }

    fn end(&mut self) {
        match &mut self.state {
            TailState::Ring { ring } if self.take => {
                let buf: Vec<T> = std::mem::take(ring).into_iter().collect();
                replay(buf, &mut self.next, self.requested);
            }
            _ => self.next.end(),
        }
    }

    fn can_short_circuit(&mut self) -> bool {
        match &self.state {
            TailState::SizedTake { .. } => self.next.can_short_circuit(),
            TailState::SizedDrop { to_emit } => *to_emit == 0 || self.next.can_short_circuit(),
            TailState::Ring { .. } => {
                if self.take {
                    self.requested = true;
                    false
                } else {
                    self.next.can_short_circuit()
                }
            }
        }
    }
}
