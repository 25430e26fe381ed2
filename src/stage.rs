//! The stage graph and the execution driver.
//!
//! A pipeline is a chain of [`Stage`] values, each owning its upstream,
//! terminating in a head that owns the data source cursor and the close
//! actions. Declaring a stage touches no data; it only records the
//! operation and the capability flags computed from (upstream flags, op
//! flags). All work happens in [`drive`], exactly once per pipeline.

use smallvec::SmallVec;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::flags::StageFlags;
use crate::ops::Operator;

/// A deferred cleanup action registered with
/// [`Pipe::on_close`](crate::pipe::Pipe::on_close).
pub type CloseAction = Box<dyn FnOnce() -> Result<()>>;

pub(crate) type CloseQueue = SmallVec<[CloseAction; 2]>;

/// State owned by the head of a pipeline: the single-use source cursor
/// and the registered close actions.
pub struct HeadCore<C> {
    cursor: Option<C>,
    close_actions: CloseQueue,
}

impl<C: Cursor> HeadCore<C> {
    pub(crate) fn new(cursor: C) -> Self {
        Self {
            cursor: Some(cursor),
            close_actions: SmallVec::new(),
        }
    }

    /// Take the source cursor out of the head.
    ///
    /// The first caller gets it; everyone after gets
    /// [`Error::SourceConsumed`]. This is the single gate that makes a
    /// pipeline one-shot.
    pub fn take_cursor(&mut self) -> Result<C> {
        self.cursor.take().ok_or(Error::SourceConsumed)
    }

    /// Append a close action; actions run in registration order.
    pub fn push_close_action(&mut self, action: CloseAction) {
        self.close_actions.push(action);
    }

    pub(crate) fn take_close_actions(&mut self) -> CloseQueue {
        std::mem::take(&mut self.close_actions)
    }

    /// Run all registered close actions exactly once.
    ///
    /// Every action runs even if an earlier one failed; the first failure
    /// becomes the error source and later failures are attached as
    /// suppressed. A second call finds the queue empty and returns `Ok`.
    pub fn run_close_actions(&mut self) -> Result<()> {
        run_close_queue(self.take_close_actions())
    }
}

/// Run a close queue to completion: every action runs, the first failure
/// becomes the error source, later failures are attached as suppressed.
pub(crate) fn run_close_queue(queue: CloseQueue) -> Result<()> {
    let mut failures = Vec::new();
    for action in queue {
        if let Err(err) = action() {
            failures.push(err);
        }
    }
    if failures.is_empty() {
        return Ok(());
    }
    let source = Box::new(failures.remove(0));
    Err(Error::Close {
        source,
        suppressed: failures,
    })
}

/// One link of a pipeline.
///
/// `Item` is what this stage emits; `SourceItem` is what the head's
/// cursor produces. Compiling wraps a downstream operator (consuming
/// `Item`) into one that consumes `SourceItem`, recursing towards the
/// head so the whole chain becomes a single composed operator.
pub trait Stage {
    /// Element type this stage emits.
    type Item;

    /// Element type of the pipeline's data source.
    type SourceItem;

    /// The head's cursor type.
    type Cursor: Cursor<Item = Self::SourceItem>;

    /// The operator produced by wrapping a downstream operator `N`.
    type Compiled<N: Operator<Self::Item>>: Operator<Self::SourceItem>;

    /// Capability flags of this stage, fixed at construction.
    fn flags(&self) -> StageFlags;

    /// The head's cursor-and-close state, reached through the chain.
    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor>;

    /// Wrap `next` in this stage's operator (and recursively in every
    /// upstream stage's).
    ///
    /// Fails with [`Error::SourceConsumed`] if this stage was already
    /// compiled once; stages hand their captured state (closures,
    /// sub-pipelines) to the operator they create.
    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>>;
}

/// Delegation through a mutable borrow, mirroring the blanket
/// [`Operator`] impl: a `&mut` pipeline is itself a pipeline.
impl<S: Stage + ?Sized> Stage for &mut S {
    type Item = S::Item;
    type SourceItem = S::SourceItem;
    type Cursor = S::Cursor;
    type Compiled<N: Operator<Self::Item>> = S::Compiled<N>;

    fn flags(&self) -> StageFlags {
        (**self).flags()
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        (**self).head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        (**self).compile(next)
    }
}

/// Execute a pipeline against a terminal operator.
///
/// The traversal mode is chosen once, purely from the tail stage's flags
/// OR'd with the terminal operator's own flag contribution: if
/// `SHORT_CIRCUIT` is present anywhere, elements are pulled one at a time
/// with a satisfaction poll before every pull; otherwise the source is
/// drained in one bulk pass.
pub(crate) fn drive<S, O>(stage: &mut S, terminal_flags: StageFlags, op: &mut O) -> Result<()>
where
    S: Stage,
    O: Operator<S::Item>,
{
    let flags = stage.flags().union(terminal_flags);
    let mut cursor = stage.head_mut().take_cursor()?;
    let mut composed = stage.compile(&mut *op)?;
    let size = cursor.exact_size();
    let short_circuit = flags.contains(StageFlags::SHORT_CIRCUIT);
    tracing::debug!(?flags, ?size, short_circuit, "driving pipeline");
    composed.begin(size);
    if short_circuit {
        while !composed.can_short_circuit()
            && cursor.try_advance(&mut |value| composed.accept(value))
        {}
    } else {
        cursor.drain(&mut |value| composed.accept(value));
    }
    composed.end();
    Ok(())
}
