//! User-supplied policies steering the merge and partition engines.

/// Verdict for one pair of candidates during a merge; see
/// [`Pipe::merge`](crate::pipe::Pipe::merge).
///
/// "Ours" is the pipeline `merge` was called on, "theirs" the other one.
/// Emitting and advancing are independent: `Take*` emits the chosen side
/// and advances both; `Prefer*` emits the chosen side but advances only
/// the other, so the chosen element is re-offered against the other
/// side's next element; `*First` emits both in the given order; `Drop*`
/// emits nothing and advances only the named side(s).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Emit ours, advance both.
    TakeOurs,
    /// Emit theirs, advance both.
    TakeTheirs,
    /// Emit ours, advance theirs only; ours is re-offered.
    PreferOurs,
    /// Emit theirs, advance ours only; theirs is re-offered.
    PreferTheirs,
    /// Emit ours then theirs, advance both.
    OursFirst,
    /// Emit theirs then ours, advance both.
    TheirsFirst,
    /// Discard ours, advance ours only; theirs is re-offered.
    DropOurs,
    /// Discard theirs, advance theirs only; ours is re-offered.
    DropTheirs,
    /// Discard both, advance both.
    DropBoth,
}

/// What to do with the surviving side once the other is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeRemainingPolicy {
    /// Keep invoking the pair policy, passing `None` for the exhausted
    /// side.
    MergeAsNull,
    /// Emit whatever remains, whichever side it is.
    TakeRemaining,
    /// Emit the remainder only if it is ours, drop it otherwise.
    TakeOurs,
    /// Emit the remainder only if it is theirs, drop it otherwise.
    TakeTheirs,
    /// Drop the remainder.
    Drop,
}

/// Per-element verdict for policy-driven partitioning; see
/// [`Pipe::partition_by`](crate::pipe::Pipe::partition_by).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// Close the current group (if any) and start a new one with this
    /// element.
    Begin,
    /// Append this element to the current group.
    In,
    /// Append this element and close the current group.
    End,
}
