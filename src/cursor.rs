//! Data source cursors.
//!
//! A [`Cursor`] is the single-use traversal handle a pipeline head owns.
//! It hands elements to a sink callback either one at a time
//! ([`Cursor::try_advance`]) or in bulk ([`Cursor::drain`]), and
//! advertises what it statically knows about its elements through
//! [`Cursor::characteristics`].

use crate::flags::StageFlags;

/// A one-shot traversal over a sequence of elements.
///
/// Cursors are consumed by the execution driver or the pull adapter; user
/// code normally obtains one only through
/// [`Pipe::into_cursor`](crate::pipe::Pipe::into_cursor) or supplies a
/// custom one via [`source::from_cursor`](crate::source::from_cursor).
pub trait Cursor {
    /// Element type produced by this cursor.
    type Item;

    /// Advance by one element, feeding it to `sink`.
    ///
    /// Returns `false` once the cursor is exhausted; `sink` is not called
    /// in that case.
    fn try_advance(&mut self, sink: &mut dyn FnMut(Self::Item)) -> bool;

    /// Feed every remaining element to `sink`.
    fn drain(&mut self, sink: &mut dyn FnMut(Self::Item)) {
        while self.try_advance(sink) {}
    }

    /// Estimated number of remaining elements, if any estimate exists.
    fn size_hint(&self) -> Option<u64> {
        None
    }

    /// Exact number of remaining elements, or `None` if not statically
    /// known. Only meaningful when [`StageFlags::SIZED`] is advertised.
    fn exact_size(&self) -> Option<u64> {
        if self.characteristics().contains(StageFlags::SIZED) {
            self.size_hint()
        } else {
            None
        }
    }

    /// Element properties this source can guarantee; restricted to
    /// [`StageFlags::CURSOR_MASK`].
    fn characteristics(&self) -> StageFlags {
        StageFlags::ORDERED
    }

    /// Split off a prefix of the remaining elements for parallel
    /// traversal. The single-threaded engine never calls this; sources
    /// that cannot split simply return `None`.
    fn try_split(&mut self) -> Option<Box<dyn Cursor<Item = Self::Item>>> {
        None
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn try_advance(&mut self, sink: &mut dyn FnMut(Self::Item)) -> bool {
        (**self).try_advance(sink)
    }

    fn drain(&mut self, sink: &mut dyn FnMut(Self::Item)) {
        (**self).drain(sink)
    }

    fn size_hint(&self) -> Option<u64> {
        (**self).size_hint()
    }

    fn exact_size(&self) -> Option<u64> {
        (**self).exact_size()
    }

    fn characteristics(&self) -> StageFlags {
        (**self).characteristics()
    }

    fn try_split(&mut self) -> Option<Box<dyn Cursor<Item = Self::Item>>> {
        (**self).try_split()
    }
}

/// Cursor over any std iterator.
///
/// Advertises `SIZED` whenever the iterator's own size hint is exact, so
/// `from_iter` over a slice or range keeps the sized fast paths without
/// requiring `ExactSizeIterator`.
pub struct IterCursor<I: Iterator> {
    iter: I,
}

impl<I: Iterator> IterCursor<I> {
    /// Wrap an iterator.
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator> Cursor for IterCursor<I> {
    type Item = I::Item;

    fn try_advance(&mut self, sink: &mut dyn FnMut(I::Item)) -> bool {
        match self.iter.next() {
            Some(value) => {
                sink(value);
                true
            }
            None => false,
        }
    }

    fn drain(&mut self, sink: &mut dyn FnMut(I::Item)) {
        for value in &mut self.iter {
            sink(value);
        }
    }

    fn size_hint(&self) -> Option<u64> {
        let (low, high) = self.iter.size_hint();
        high.map(|h| h as u64).or(Some(low as u64))
    }

    fn characteristics(&self) -> StageFlags {
        let (low, high) = self.iter.size_hint();
        if high == Some(low) {
            StageFlags::ORDERED | StageFlags::SIZED
        } else {
            StageFlags::ORDERED
        }
    }
}

/// Cursor over an owned `Vec`. Always sized.
pub struct VecCursor<T> {
    iter: std::vec::IntoIter<T>,
}

impl<T> VecCursor<T> {
    /// Take ownership of the vector's elements.
    pub fn new(values: Vec<T>) -> Self {
        Self {
            iter: values.into_iter(),
        }
    }
}

impl<T> Cursor for VecCursor<T> {
    type Item = T;

    fn try_advance(&mut self, sink: &mut dyn FnMut(T)) -> bool {
        match self.iter.next() {
            Some(value) => {
                sink(value);
                true
            }
            None => false,
        }
    }

    fn drain(&mut self, sink: &mut dyn FnMut(T)) {
        for value in &mut self.iter {
            sink(value);
        }
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.iter.len() as u64)
    }

    fn characteristics(&self) -> StageFlags {
        StageFlags::ORDERED | StageFlags::SIZED
    }
}

/// Cursor driven by a generator closure; ends at the first `None`.
///
/// The closure is never called again after it returns `None`, even if the
/// cursor is advanced further.
pub struct GenCursor<F> {
    generator: F,
    done: bool,
}

impl<F> GenCursor<F> {
    /// Wrap a generator closure.
    pub fn new(generator: F) -> Self {
        Self {
            generator,
            done: false,
        }
    }
}

impl<T, F: FnMut() -> Option<T>> Cursor for GenCursor<F> {
    type Item = T;

    fn try_advance(&mut self, sink: &mut dyn FnMut(T)) -> bool {
        if self.done {
            return false;
        }
        match (self.generator)() {
            Some(value) => {
                sink(value);
                true
            }
            None => {
                self.done = true;
                false
            }
        }
    }

    fn characteristics(&self) -> StageFlags {
        StageFlags::ORDERED
    }
}
