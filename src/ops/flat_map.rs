//! One-to-many expansion through per-element sub-pipelines.

use std::marker::PhantomData;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::{Operator, RelayOp};
use crate::pull::PipeCursor;
use crate::stage::{drive, HeadCore, Stage};

/// Stage produced by [`Pipe::flat_map`](crate::pipe::Pipe::flat_map).
///
/// Each element is mapped to a fresh sub-pipeline whose output is spliced
/// into the stream. Normally the sub-pipeline is bulk-driven; once a
/// short-circuit-capable consumer has announced itself downstream, it is
/// instead pulled one element at a time so a mid-sub-pipeline stop never
/// over-produces. Sub-pipeline close actions run as soon as the element
/// is finished with.
pub struct FlatMap<P, F, Q> {
    upstream: P,
    mapper: Option<F>,
    flags: StageFlags,
    _sub: PhantomData<fn() -> Q>,
}

impl<P, F, Q> FlatMap<P, F, Q>
where
    P: Stage,
    Q: Stage,
    F: FnMut(P::Item) -> Q,
{
    pub(crate) fn new(upstream: P, mapper: F) -> Self {
        let flags = OpFlags::clears(
            StageFlags::SIZED
                | StageFlags::SORTED
                | StageFlags::REVERSE_SORTED
                | StageFlags::DISTINCT,
        )
        .apply(upstream.flags());
        Self {
            upstream,
            mapper: Some(mapper),
            flags,
            _sub: PhantomData,
        }
    }
}

impl<P, F, Q> Stage for FlatMap<P, F, Q>
where
    P: Stage,
    Q: Stage,
    F: FnMut(P::Item) -> Q,
{
    type Item = Q::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<FlatMapOp<F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let mapper = self.mapper.take().ok_or(Error::SourceConsumed)?;
        self.upstream.compile(FlatMapOp {
            mapper,
            next,
            requested: false,
        })
    }
}

/// Operator for [`FlatMap`].
pub struct FlatMapOp<F, N> {
    mapper: F,
    next: N,
    requested: bool,
}

impl<T, Q, F, N> Operator<T> for FlatMapOp<F, N>
where
    Q: Stage,
    F: FnMut(T) -> Q,
    N: Operator<Q::Item>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        let mut sub = (self.mapper)(value);
        if self.requested {
            // Element-by-element: a downstream stop between two inner
            // elements must leave the rest of the sub-pipeline unpulled.
            let mut cursor = match PipeCursor::new(sub) {
                Ok(cursor) => cursor,
                Err(_) => panic!("flat_map mapper returned an already-consumed pipeline"),
            };
            let next = &mut self.next;
            while !next.can_short_circuit() && cursor.try_advance(&mut |v| next.accept(v)) {}
            if let Err(err) = cursor.close() {
                tracing::warn!(error = %err, "flat_map sub-pipeline close failed");
            }
        } else {
            let mut relay = RelayOp::new(&mut self.next);
            if drive(&mut sub, StageFlags::EMPTY, &mut relay).is_err() {
                panic!("flat_map mapper returned an already-consumed pipeline");
            }
            if let Err(err) = sub.head_mut().run_close_actions() {
                tracing::warn!(error = %err, "flat_map sub-pipeline close failed");
            }
        }
    }

    fn end(&mut self) {
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.requested = true;
        self.next.can_short_circuit()
    }
}
