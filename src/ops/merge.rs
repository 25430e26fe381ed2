//! Policy-driven two-pipeline merge.
//!
//! "Ours" is the push side (the pipeline being driven); "theirs" is
//! pulled on demand through the pull adapter, never more than one
//! element ahead. Each pairing of the two current candidates is judged
//! by the user's pair policy; once either side runs out the remaining
//! policy takes over.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::flags::{OpFlags, StageFlags};
use crate::ops::Operator;
use crate::policy::{MergePolicy, MergeRemainingPolicy};
use crate::pull::PipeCursor;
use crate::stage::{HeadCore, Stage};

/// Stage produced by [`Pipe::merge`](crate::pipe::Pipe::merge).
///
/// The other pipeline's close actions are adopted at construction, so
/// closing the merged pipeline tears both sources down.
pub struct Merge<P, Q, F> {
    upstream: P,
    theirs: Option<Q>,
    pair: Option<F>,
    remaining: MergeRemainingPolicy,
    flags: StageFlags,
}

impl<P, Q, F> Merge<P, Q, F>
where
    P: Stage,
    Q: Stage<Item = P::Item>,
    F: FnMut(Option<&P::Item>, Option<&P::Item>) -> MergePolicy,
{
    pub(crate) fn new(
        mut upstream: P,
        mut theirs: Q,
        pair: F,
        remaining: MergeRemainingPolicy,
    ) -> Self {
        for action in theirs.head_mut().take_close_actions() {
            upstream.head_mut().push_close_action(action);
        }
        // Interleaving two sources invalidates every element property.
        let flags = OpFlags::clears(
            StageFlags::SIZED
                | StageFlags::SORTED
                | StageFlags::REVERSE_SORTED
                | StageFlags::DISTINCT,
        )
        .apply(upstream.flags());
        Self {
            upstream,
            theirs: Some(theirs),
            pair: Some(pair),
            remaining,
            flags,
        }
    }
}

impl<P, Q, F> Stage for Merge<P, Q, F>
where
    P: Stage,
    Q: Stage<Item = P::Item>,
    P::Item: Clone,
    F: FnMut(Option<&P::Item>, Option<&P::Item>) -> MergePolicy,
{
    type Item = P::Item;
    type SourceItem = P::SourceItem;
    type Cursor = P::Cursor;
    type Compiled<N: Operator<Self::Item>> = P::Compiled<MergeOp<P::Item, PipeCursor<Q>, F, N>>;

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn head_mut(&mut self) -> &mut HeadCore<Self::Cursor> {
        self.upstream.head_mut()
    }

    fn compile<N: Operator<Self::Item>>(&mut self, next: N) -> Result<Self::Compiled<N>> {
        let theirs = self.theirs.take().ok_or(Error::SourceConsumed)?;
        let pair = self.pair.take().ok_or(Error::SourceConsumed)?;
        let theirs = PipeCursor::new(theirs)?;
        self.upstream.compile(MergeOp {
            next,
            theirs,
            pair,
            remaining: self.remaining,
            slot: None,
            theirs_done: false,
        })
    }
}

/// Operator for [`Merge`].
pub struct MergeOp<T, C, F, N> {
    next: N,
    theirs: C,
    pair: F,
    remaining: MergeRemainingPolicy,
    /// Their current candidate, pulled lazily, consumed by advancing.
    slot: Option<T>,
    theirs_done: bool,
}

impl<T, C, F, N> MergeOp<T, C, F, N>
where
    T: Clone,
    C: Cursor<Item = T>,
    F: FnMut(Option<&T>, Option<&T>) -> MergePolicy,
    N: Operator<T>,
{
    fn pull(&mut self) {
        let mut pulled = None;
        if self.theirs.try_advance(&mut |v| pulled = Some(v)) {
            self.slot = pulled;
        } else {
            self.theirs_done = true;
        }
    }

    fn slot_or_pull(&mut self) -> bool {
        if self.slot.is_none() && !self.theirs_done {
            self.pull();
        }
        self.slot.is_some()
    }

    fn stopped(&mut self) -> bool {
        self.next.can_short_circuit()
    }

    /// Ours has outlived theirs: apply the remaining policy to one
    /// pending element of ours.
    fn ours_after_exhaustion(&mut self, ours: T) {
        match self.remaining {
            MergeRemainingPolicy::MergeAsNull => {
                let policy = (self.pair)(Some(&ours), None);
                // With theirs absent only the emission matters; every
                // policy advances past ours so the next accept starts
                // fresh.
                match policy {
                    MergePolicy::TakeOurs
                    | MergePolicy::PreferOurs
                    | MergePolicy::OursFirst
                    | MergePolicy::TheirsFirst => self.next.accept(ours),
                    MergePolicy::TakeTheirs
                    | MergePolicy::PreferTheirs
                    | MergePolicy::DropOurs
                    | MergePolicy::DropTheirs
                    | MergePolicy::DropBoth => {}
                }
            }
            MergeRemainingPolicy::TakeRemaining | MergeRemainingPolicy::TakeOurs => {
                self.next.accept(ours);
            }
            MergeRemainingPolicy::TakeTheirs | MergeRemainingPolicy::Drop => {}
        }
    }
}

impl<T, C, F, N> Operator<T> for MergeOp<T, C, F, N>
where
    T: Clone,
    C: Cursor<Item = T>,
    F: FnMut(Option<&T>, Option<&T>) -> MergePolicy,
    N: Operator<T>,
{
    fn begin(&mut self, _size_hint: Option<u64>) {
        self.next.begin(None);
    }

    fn accept(&mut self, ours: T) {
        let mut ours = Some(ours);
        // Set once ours has been emitted by a Prefer verdict: it is then
        // spent, and must not be re-emitted by the remaining policy if
        // theirs exhausts before the re-offer resolves.
        let mut ours_spent = false;
        loop {
            if !self.slot_or_pull() {
                if let Some(value) = ours.take() {
                    if !ours_spent {
                        self.ours_after_exhaustion(value);
                    }
                }
                return;
            }
            let policy = (self.pair)(ours.as_ref(), self.slot.as_ref());
            match policy {
                MergePolicy::TakeOurs => {
                    self.slot = None;
                    if let Some(value) = ours.take() {
                        self.next.accept(value);
                    }
                    return;
                }
                MergePolicy::TakeTheirs => {
                    if let Some(theirs) = self.slot.take() {
                        self.next.accept(theirs);
                    }
                    return;
                }
                MergePolicy::OursFirst => {
                    if let Some(value) = ours.take() {
                        self.next.accept(value);
                    }
                    if let Some(theirs) = self.slot.take() {
                        self.next.accept(theirs);
                    }
                    return;
                }
                MergePolicy::TheirsFirst => {
                    if let Some(theirs) = self.slot.take() {
                        self.next.accept(theirs);
                    }
                    if let Some(value) = ours.take() {
                        self.next.accept(value);
                    }
                    return;
                }
                MergePolicy::PreferOurs => {
                    // Emit ours, advance theirs, re-offer ours.
                    if let Some(value) = ours.clone() {
                        self.next.accept(value);
                    }
                    ours_spent = true;
                    self.slot = None;
                    if self.stopped() {
                        return;
                    }
                }
                MergePolicy::PreferTheirs => {
                    // Emit theirs, keep it for re-offer, advance ours.
                    if let Some(theirs) = self.slot.clone() {
                        self.next.accept(theirs);
                    }
                    return;
                }
                MergePolicy::DropOurs => return,
                MergePolicy::DropTheirs => {
                    self.slot = None;
                    if self.stopped() {
                        return;
                    }
                }
                MergePolicy::DropBoth => {
                    self.slot = None;
                    return;
                }
            }
        }
    }

    fn end(&mut self) {
        match self.remaining {
            MergeRemainingPolicy::MergeAsNull => {
                while !self.stopped() && self.slot_or_pull() {
                    let Some(theirs) = self.slot.take() else { break };
                    // One element per verdict, progress guaranteed.
                    match (self.pair)(None, Some(&theirs)) {
                        MergePolicy::TakeTheirs
                        | MergePolicy::PreferTheirs
                        | MergePolicy::OursFirst
                        | MergePolicy::TheirsFirst => self.next.accept(theirs),
                        MergePolicy::TakeOurs
                        | MergePolicy::PreferOurs
                        | MergePolicy::DropOurs
                        | MergePolicy::DropTheirs
                        | MergePolicy::DropBoth => {}
                    }
                }
            }
            MergeRemainingPolicy::TakeRemaining | MergeRemainingPolicy::TakeTheirs => {
                while !self.stopped() && self.slot_or_pull() {
                    if let Some(theirs) = self.slot.take() {
                        self.next.accept(theirs);
                    }
                }
            }
            MergeRemainingPolicy::TakeOurs | MergeRemainingPolicy::Drop => {}
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

    fn merged(
        ours: Vec<i32>,
        theirs: Vec<i32>,
        pair: impl FnMut(Option<&i32>, Option<&i32>) -> MergePolicy,
        remaining: MergeRemainingPolicy,
    ) -> Vec<i32> {
        source::from_vec(ours)
            .merge(source::from_vec(theirs), pair, remaining)
            .to_vec()
            .unwrap()
    }

    #[test]
    fn ours_first_zips_and_takes_the_remainder() {
        let out = merged(
            vec![1, 3, 5],
            vec![2, 4, 6, 8],
            |_, _| MergePolicy::OursFirst,
            MergeRemainingPolicy::TakeRemaining,
        );
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 8]);
    }

    #[test]
    fn take_ours_keeps_theirs_unpulled_past_one_lookahead() {
        let out = merged(
            vec![1, 2],
            vec![10, 20, 30],
            |_, _| MergePolicy::TakeOurs,
            MergeRemainingPolicy::Drop,
        );
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn prefer_theirs_re_offers_the_same_theirs() {
        // Theirs' first element wins every pairing; ours never lands.
        let out = merged(
            vec![1, 2, 3],
            vec![9, 8],
            |_, _| MergePolicy::PreferTheirs,
            MergeRemainingPolicy::Drop,
        );
        assert_eq!(out, vec![9, 9, 9]);
    }

    #[test]
    fn prefer_ours_consumes_theirs_until_exhaustion() {
        // Ours' first element is re-offered against every theirs, then
        // theirs is exhausted and the remaining policy takes over for
        // the rest of ours.
        let out = merged(
            vec![1, 2],
            vec![9, 8],
            |_, _| MergePolicy::PreferOurs,
            MergeRemainingPolicy::TakeRemaining,
        );
        // First accept: 1 vs 9 -> emit 1, 1 vs 8 -> emit 1, theirs done.
        // Second accept: theirs exhausted -> remaining emits 2.
        assert_eq!(out, vec![1, 1, 2]);
    }

    #[test]
    fn drop_both_discards_pairs() {
        let out = merged(
            vec![1, 2, 3],
            vec![10, 20],
            |_, _| MergePolicy::DropBoth,
            MergeRemainingPolicy::TakeRemaining,
        );
        // Pairs (1,10) and (2,20) are dropped; 3 finds theirs exhausted.
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn merge_as_null_pairs_the_survivors() {
        let policy = |ours: Option<&i32>, theirs: Option<&i32>| match (ours, theirs) {
            (Some(_), Some(_)) => MergePolicy::OursFirst,
            (Some(_), None) => MergePolicy::TakeOurs,
            (None, Some(_)) => MergePolicy::TakeTheirs,
            (None, None) => MergePolicy::DropBoth,
        };
        let out = merged(
            vec![1],
            vec![10, 20, 30],
            policy,
            MergeRemainingPolicy::MergeAsNull,
        );
        assert_eq!(out, vec![1, 10, 20, 30]);
    }

    #[test]
    fn selective_merge_interleaves_sorted_inputs() {
        let pair = |ours: Option<&i32>, theirs: Option<&i32>| {
            let (Some(a), Some(b)) = (ours, theirs) else {
                return MergePolicy::TakeTheirs;
            };
            if a <= b {
                MergePolicy::TakeOurs
            } else {
                MergePolicy::TakeTheirs
            }
        };
        // Take* advances both sides, so the unchosen element of each
        // pair is lost: a lossy interleave, not a full sorted merge.
        let out = merged(
            vec![1, 4],
            vec![2, 3],
            pair,
            MergeRemainingPolicy::TakeRemaining,
        );
        // (1,2) emits 1 and drops 2; (4,3) emits 3 and drops 4.
        assert_eq!(out, vec![1, 3]);
    }
}
