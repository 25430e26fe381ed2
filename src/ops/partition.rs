//! Grouping a pipeline into sub-pipelines.
//!
//! Groups are buffered one at a time and emitted downstream as fresh
//! pipelines over the buffered elements. A group is never empty: the
//! trailing partial group is flushed on `end`, and a policy verdict that
//! would close an empty group simply starts it instead.

use crate::error::Result;
use crate::flags::{OpFlags, StageFlags};
use crate::ops::Operator;
use crate::policy::PartitionPolicy;
use crate::source::{self, VecPipe};
use crate::stage::{HeadCore, Stage};

fn partition_flags(upstream: StageFlags) -> StageFlags {
    // The element type changes to sub-pipelines; nothing carries over.
    OpFlags::clears(
        StageFlags::SIZED | StageFlags::SORTED | StageFlags::REVERSE_SORTED | StageFlags::DISTINCT,
    )
    .apply(upstream)
}

// ============================================================================
// Fixed-size partition
// ============================================================================

/// Stage produced by [`Pipe::partition`](crate::pipe::Pipe::partition):
/// consecutive groups of `size` elements, the last one possibly smaller.
pub struct Partition<P> {
    upstream: P,
    size: usize,
    flags: StageFlags,
}

impl<P: Stage> Partition<P> {
    /// Panics if `size` is zero (documented on
    /// [`Pipe::partition`](crate::pipe::Pipe::partition)).
    pub(crate) fn new(upstream: P, size: usize) -> Self {
        assert!(size > 0, "partition size must be non-zero");
        let flags = partition_flags(upstream.flags());
        Self {
            upstream,
            size,
            flags,
        }
    }
}

impl<P: Stage> Stage for Partition<P> {
    type Item = VecPipe<P::Item>;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<PartitionOp<P::Item, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        self.upstream.compile(PartitionOp {
            next,
            size: self.size,
            group: Vec::new(),
        })
    }
}

/// Operator for [`Partition`].
pub struct PartitionOp<T, N> {
    next: N,
    size: usize,
    group: Vec<T>,
}

impl<T, N: Operator<VecPipe<T>>> Operator<T> for PartitionOp<T, N> {
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        self.group.push(value);
        if self.group.len() == self.size {
            let group = std::mem::take(&mut self.group);
            self.next.accept(source::from_vec(group));
        }
    }

    fn end(&mut self) {
        if !self.group.is_empty() && !self.next.can_short_circuit() {
            let group = std::mem::take(&mut self.group);
            self.next.accept(source::from_vec(group));
        }
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

// ============================================================================
// Policy-driven partition
// ============================================================================

/// Stage produced by
/// [`Pipe::partition_by`](crate::pipe::Pipe::partition_by): group
/// boundaries decided per element by a [`PartitionPolicy`] verdict.
pub struct PartitionBy<P, F> {
    upstream: P,
    policy: Option<F>,
    flags: StageFlags,
}

impl<P: Stage, F: FnMut(&P::Item) -> PartitionPolicy> PartitionBy<P, F> {
    pub(crate) fn new(upstream: P, policy: F) -> Self {
        let flags = partition_flags(upstream.flags());
        Self {
            upstream,
            policy: Some(policy),
            flags,
        }
    }
}

impl<P, F> Stage for PartitionBy<P, F>
where
    P: Stage,
    F: FnMut(&P::Item) -> PartitionPolicy,
{
    type Item = VecPipe<P::Item>;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<PartitionByOp<P::Item, F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let policy = self
            .policy
            .take()
            .ok_or(crate::error::Error::SourceConsumed)?;
        self.upstream.compile(PartitionByOp {
            next,
            policy,
            group: Vec::new(),
        })
    }
}

/// Operator for [`PartitionBy`].
pub struct PartitionByOp<T, F, N> {
    next: N,
    policy: F,
    group: Vec<T>,
}

impl<T, F, N> PartitionByOp<T, F, N>
where
    N: Operator<VecPipe<T>>,
{
    fn flush(&mut self) {
        if !self.group.is_empty() {
            let group = std::mem::take(&mut self.group);
            self.next.accept(source::from_vec(group));
        }
    }
}

impl<T, F, N> Operator<T> for PartitionByOp<T, F, N>
where
    F: FnMut(&T) -> PartitionPolicy,
    N: Operator<VecPipe<T>>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, value: T) {
        match (self.policy)(&value) {
            PartitionPolicy::Begin => {
                self.flush();
                self.group.push(value);
            }
            PartitionPolicy::In => self.group.push(value),
            PartitionPolicy::End => {
                self.group.push(value);
                self.flush();
            }
        }
    }

    fn end(&mut self) {
        if !self.next.can_short_circuit() {
            self.flush();
        }
        self.next.end();
    }

    fn can_short_circuit(&mut self) -> bool {
        self.next.can_short_circuit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::Pipe;
    use crate::source;

    fn group_values<P>(pipe: &mut P) -> Vec<Vec<i32>>
    where
        P: Stage<Item = VecPipe<i32>>,
    {
        let mut groups = Vec::new();
        pipe.for_each(|mut group| groups.push(group.to_vec().unwrap()))
            .unwrap();
        groups
    }

    #[test]
    fn fixed_size_groups_with_smaller_trailer() {
        let mut pipe = source::from_iter(0..10).partition(3);
        assert_eq!(
            group_values(&mut pipe),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]
        );
    }

    #[test]
    fn exact_multiple_has_no_trailer() {
        let mut pipe = source::from_iter(0..6).partition(3);
        assert_eq!(group_values(&mut pipe).len(), 2);
    }

    #[test]
    #[should_panic(expected = "partition size must be non-zero")]
    fn zero_size_panics() {
        let _ = source::from_iter(0..3).partition(0);
    }

    #[test]
    fn policy_boundaries_never_produce_empty_groups() {
        // Begin on every negative number.
        let mut pipe = source::of([-1, 1, 2, -2, -3, 4]).partition_by(|n| {
            if *n < 0 {
                PartitionPolicy::Begin
            } else {
                PartitionPolicy::In
            }
        });
        assert_eq!(
            group_values(&mut pipe),
            vec![vec![-1, 1, 2], vec![-2], vec![-3, 4]]
        );
    }

    #[test]
    fn end_verdict_closes_the_group_inclusively() {
        let mut pipe = source::of([1, 2, 0, 3, 0, 4]).partition_by(|n| {
            if *n == 0 {
                PartitionPolicy::End
            } else {
                PartitionPolicy::In
            }
        });
        assert_eq!(
            group_values(&mut pipe),
            vec![vec![1, 2, 0], vec![3, 0], vec![4]]
        );
    }
}
