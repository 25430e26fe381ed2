//! Pipeline heads and source constructors.

use crate::cursor::{Cursor, GenCursor, IterCursor, VecCursor};
use crate::flags::StageFlags;
use crate::ops::Operator;
use crate::stage::{HeadCore, Stage};

/// The head stage of a pipeline: owns the source cursor and the close
/// actions, contributes no operator of its own.
pub struct Head<C: Cursor> {
    core: HeadCore<C>,
    flags: StageFlags,
}

/// A pipeline over an owned `Vec`; what [`partition`](crate::pipe::Pipe::partition)
/// groups are emitted as.
pub type VecPipe<T> = Head<VecCursor<T>>;

impl<C: Cursor> Head<C> {
    /// Build a head over the given cursor, adopting the element
    /// properties it advertises.
    pub fn new(cursor: C) -> Self {
        let flags = cursor
            .characteristics()
            .intersection(StageFlags::CURSOR_MASK);
        Self {
            core: HeadCore::new(cursor),
            flags,
        }
    }
}

impl<C: Cursor> Stage for Head<C> {
    type Item = C::Item;
    type SourceItem = C::Item;
    type Cursor = C;
    type Compiled<N: Operator<C::Item>> = N;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<C> {
        &mut self.core
    }

    fn compile<N: Operator<C::Item>>(&mut self, next: N) -> crate::Result<N> {
        Ok(next)
    }
}

/// Pipeline over a fixed set of values.
///
/// ```
/// use penstock::prelude::*;
///
/// let total = penstock::source::of([1, 2, 3]).reduce(0, |acc, n| acc + n)?;
/// assert_eq!(total, 6);
/// # penstock::Result::Ok(())
/// ```
pub fn of<T, const N: usize>(values: [T; N]) -> VecPipe<T> {
    from_vec(values.into())
}

/// Pipeline over an owned vector.
pub fn from_vec<T>(values: Vec<T>) -> VecPipe<T> {
    Head::new(VecCursor::new(values))
}

/// Pipeline over any iterator. Sized whenever the iterator's size hint is
/// exact.
pub fn from_iter<I: IntoIterator>(iter: I) -> Head<IterCursor<I::IntoIter>> {
    Head::new(IterCursor::new(iter.into_iter()))
}

/// Pipeline over a custom [`Cursor`] implementation.
pub fn from_cursor<C: Cursor>(cursor: C) -> Head<C> {
    Head::new(cursor)
}

/// Pipeline fed by a generator closure, ending at its first `None`.
/// Potentially infinite; combine with [`limit`](crate::pipe::Pipe::limit)
/// or another short-circuiting stage before any terminal that must finish.
pub fn generate<T, F: FnMut() -> Option<T>>(generator: F) -> Head<GenCursor<F>> {
    Head::new(GenCursor::new(generator))
}

/// Pipeline with no elements.
pub fn empty<T>() -> VecPipe<T> {
    from_vec(Vec::new())
}
