//! The pull adapter: re-expose a (push-driven) pipeline as a [`Cursor`].
//!
//! The adapter compiles the pipeline onto a holding cell and advances the
//! inner source only while the cell is empty, so wrapping never costs
//! more than one element of look-ahead: a single `try_advance` by the
//! caller pulls at most one element from the inner source (which may fan
//! out into several cell entries, or none, in which case pulling
//! continues until something lands in the cell or the source ends).
//!
//! Bulk consumption through [`Cursor::drain`] on an untouched adapter
//! skips the cell bookkeeping and performs one lazy drive instead.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::flags::StageFlags;
use crate::ops::Operator;
use crate::stage::{run_close_queue, CloseQueue, Stage};

type Cell<T> = Rc<RefCell<VecDeque<T>>>;

/// Tail operator of a wrapped pipeline: parks outputs in the shared cell.
pub(crate) struct CellOp<T> {
    cell: Cell<T>,
}

impl<T> Operator<T> for CellOp<T> {
    fn accept(&mut self, value: T) {
        self.cell.borrow_mut().push_back(value);
    }
}

/// A pipeline turned back into a [`Cursor`].
///
/// Created by [`Pipe::into_cursor`](crate::pipe::Pipe::into_cursor).
/// Wrapping consumes the pipeline's source (a later terminal on the same
/// pipeline would fail), takes over its close actions, and is itself
/// lazy: nothing is pulled until the first advance.
pub struct PipeCursor<P: Stage> {
    cursor: P::Cursor,
    op: P::Compiled<CellOp<P::Item>>,
    cell: Cell<P::Item>,
    close: CloseQueue,
    flags: StageFlags,
    started: bool,
    finished: bool,
}

impl<P: Stage> PipeCursor<P> {
    /// Wrap a pipeline. Fails with
    /// [`Error::SourceConsumed`](crate::Error::SourceConsumed) if the
    /// pipeline was already executed or wrapped.
    pub fn new(mut pipe: P) -> Result<Self> {
        let flags = pipe.flags();
        let cursor = pipe.head_mut().take_cursor()?;
        let close = pipe.head_mut().take_close_actions();
        let cell: Cell<P::Item> = Rc::new(RefCell::new(VecDeque::new()));
        let op = pipe.compile(CellOp {
            cell: Rc::clone(&cell),
        })?;
        Ok(Self {
            cursor,
            op,
            cell,
            close,
            flags,
            started: false,
            finished: false,
        })
    }

    /// Run the close actions taken over from the wrapped pipeline.
    pub fn close(&mut self) -> Result<()> {
        run_close_queue(std::mem::take(&mut self.close))
    }

    fn ensure_started(&mut self) {
        if !self.started {
            self.started = true;
            self.op.begin(self.cursor.exact_size());
        }
    }

    /// Pull from the inner source until the cell holds something or the
    /// pipeline is over. Returns whether the cell is non-empty.
    fn fill(&mut self) -> bool {
        loop {
            if !self.cell.borrow().is_empty() {
                return true;
            }
            if self.finished {
                return false;
            }
            let op = &mut self.op;
            if op.can_short_circuit() || !self.cursor.try_advance(&mut |v| op.accept(v)) {
                tracing::trace!("pull adapter: inner pipeline finished");
                // end() may still flush buffered elements into the cell,
                // so loop around for one more look.
                self.op.end();
                self.finished = true;
            }
        }
    }
}

impl<P: Stage> Cursor for PipeCursor<P> {
    type Item = P::Item;

    fn try_advance(&mut self, sink: &mut dyn FnMut(P::Item)) -> bool {
        self.ensure_started();
        if !self.fill() {
            return false;
        }
        match self.cell.borrow_mut().pop_front() {
            Some(value) => {
                sink(value);
                true
            }
            None => false,
        }
    }

    fn drain(&mut self, sink: &mut dyn FnMut(P::Item)) {
        if !self.started {
            // Untouched: one lazy bulk drive, no per-element cell churn
            // beyond the current element's fan-out.
            self.started = true;
            self.op.begin(self.cursor.exact_size());
            if self.flags.contains(StageFlags::SHORT_CIRCUIT) {
                loop {
                    let op = &mut self.op;
                    if op.can_short_circuit() || !self.cursor.try_advance(&mut |v| op.accept(v)) {
                        break;
                    }
                    while let Some(value) = self.cell.borrow_mut().pop_front() {
                        sink(value);
                    }
                }
            } else {
                let op = &mut self.op;
                let cell = &self.cell;
                self.cursor.drain(&mut |v| {
                    op.accept(v);
                    while let Some(value) = cell.borrow_mut().pop_front() {
                        sink(value);
                    }
                });
            }
            self.op.end();
            self.finished = true;
            while let Some(value) = self.cell.borrow_mut().pop_front() {
                sink(value);
            }
            return;
        }
        while self.try_advance(sink) {}
    }

    fn size_hint(&self) -> Option<u64> {
        self.exact_size()
    }

    fn exact_size(&self) -> Option<u64> {
        if self.flags.contains(StageFlags::SIZED) && !self.started {
            self.cursor.exact_size()
        } else {
            None
        }
    }

    fn characteristics(&self) -> StageFlags {
        self.flags.intersection(StageFlags::CURSOR_MASK)
    }
}

/// Std-iterator facade over a [`PipeCursor`].
///
/// Created by [`Pipe::into_iter`](crate::pipe::Pipe::into_iter).
pub struct PipeIter<P: Stage> {
    cursor: PipeCursor<P>,
}

impl<P: Stage> PipeIter<P> {
    pub(crate) fn new(cursor: PipeCursor<P>) -> Self {
        Self { cursor }
    }

    /// Run the close actions taken over from the wrapped pipeline.
    pub fn close(&mut self) -> Result<()> {
        self.cursor.close()
    }
}

impl<P: Stage> Iterator for PipeIter<P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<P::Item> {
        let mut slot = None;
        self.cursor.try_advance(&mut |v| slot = Some(v));
        slot
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor.exact_size() {
            Some(size) => {
                let size = size.min(usize::MAX as u64) as usize;
                (size, Some(size))
            }
            None => (0, None),
        }
    }
}
