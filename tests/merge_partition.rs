//! End-to-end coverage of the merge and partition engines.

use std::cell::RefCell;
use std::rc::Rc;

use penstock::prelude::*;
use penstock::source;

/// Pair policy interleaving two pipelines element for element.
fn zip_policy(_: Option<&i32>, _: Option<&i32>) -> MergePolicy {
    MergePolicy::OursFirst
}

/// Merging is deterministic: the same inputs and policies always give
/// the same output.
#[test]
fn merge_is_deterministic() {
    for _ in 0..3 {
        let out = source::of([1, 3, 5])
            .merge(
                source::of([2, 4, 6, 8]),
                zip_policy,
                MergeRemainingPolicy::TakeRemaining,
            )
            .to_vec()
            .unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 8]);
    }
}

/// The policy sees the real candidates and can discriminate on them.
#[test]
fn policy_sees_both_candidates() {
    let pairs = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&pairs);
    let out = source::of([1, 2])
        .merge(
            source::of([10, 20]),
            move |ours, theirs| {
                log.borrow_mut().push((ours.copied(), theirs.copied()));
                MergePolicy::TakeOurs
            },
            MergeRemainingPolicy::Drop,
        )
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![1, 2]);
    assert_eq!(
        *pairs.borrow(),
        vec![(Some(1), Some(10)), (Some(2), Some(20))]
    );
}

/// The other pipeline is pulled on demand: merging under a limit leaves
/// its tail untouched.
#[test]
fn merge_pulls_theirs_lazily() {
    let pulled = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&pulled);
    let theirs = source::from_iter(0..1000).inspect(move |_| *counter.borrow_mut() += 1);

    let out = source::of([10, 11, 12])
        .merge(theirs, zip_policy, MergeRemainingPolicy::Drop)
        .limit(4)
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![10, 0, 11, 1]);
    assert!(*pulled.borrow() <= 3);
}

/// Closing a merged pipeline tears down both sources.
#[test]
fn merge_adopts_the_other_sides_close_actions() {
    let closed = Rc::new(RefCell::new(Vec::new()));
    let (ours_log, theirs_log) = (Rc::clone(&closed), Rc::clone(&closed));

    let ours = source::of([1]).on_close(move || {
        ours_log.borrow_mut().push("ours");
        Ok(())
    });
    let theirs = source::of([2]).on_close(move || {
        theirs_log.borrow_mut().push("theirs");
        Ok(())
    });

    let mut merged = ours.merge(theirs, zip_policy, MergeRemainingPolicy::Drop);
    merged.close().unwrap();
    assert_eq!(*closed.borrow(), vec!["ours", "theirs"]);
}

/// MergeAsNull keeps consulting the policy after one side runs dry,
/// passing None for the exhausted side.
#[test]
fn merge_as_null_reports_exhaustion_to_the_policy() {
    let out = source::of([1, 2, 3, 4])
        .merge(
            source::of([0]),
            |ours, theirs| match (ours, theirs) {
                (Some(_), Some(_)) => MergePolicy::TheirsFirst,
                // Survivors on either side pass through.
                _ => MergePolicy::OursFirst,
            },
            MergeRemainingPolicy::MergeAsNull,
        )
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![0, 1, 2, 3, 4]);
}

fn collect_groups<P>(mut pipe: P) -> Vec<Vec<i32>>
where
    P: Pipe<Item = penstock::source::VecPipe<i32>>,
{
    let mut groups = Vec::new();
    pipe.for_each(|mut group| groups.push(group.to_vec().unwrap()))
        .unwrap();
    groups
}

/// partition(k) over n elements yields ceil(n/k) groups, none empty,
/// concatenating back to the input.
#[test]
fn partition_group_shape() {
    for (n, k) in [(10, 3), (9, 3), (1, 5), (0, 4), (7, 1)] {
        let groups = collect_groups(source::from_iter(0..n).partition(k));
        assert_eq!(groups.len(), (n as usize + k - 1) / k);
        assert!(groups.iter().all(|g| !g.is_empty() && g.len() <= k));
        let flat: Vec<i32> = groups.concat();
        assert_eq!(flat, (0..n).collect::<Vec<_>>());
    }
}

/// Each group is itself a full pipeline.
#[test]
fn groups_are_pipelines() {
    let sums = source::from_iter(1..=9)
        .partition(3)
        .map(|mut group| group.reduce(0, |acc, n| acc + n).unwrap())
        .to_vec()
        .unwrap();
    assert_eq!(sums, vec![6, 15, 24]);
}

/// partition_by's Begin verdict starting the very first group does not
/// emit a leading empty group.
#[test]
fn partition_by_leading_begin() {
    let groups = collect_groups(source::of([0, 1, 0, 2, 3]).partition_by(|n| {
        if *n == 0 {
            PartitionPolicy::Begin
        } else {
            PartitionPolicy::In
        }
    }));
    assert_eq!(groups, vec![vec![0, 1], vec![0, 2, 3]]);
}

/// An End verdict immediately followed by a Begin does not create an
/// empty group in between.
#[test]
fn partition_by_adjacent_boundaries() {
    let groups = collect_groups(source::of([1, 9, 0, 2]).partition_by(|n| match n {
        9 => PartitionPolicy::End,
        0 => PartitionPolicy::Begin,
        _ => PartitionPolicy::In,
    }));
    assert_eq!(groups, vec![vec![1, 9], vec![0, 2]]);
}

/// Grouping stages compose with the rest of the surface.
#[test]
fn partition_composes_downstream() {
    let first_of_each = source::from_iter(0..10)
        .partition(4)
        .map(|mut group| group.find_first().unwrap())
        .to_vec()
        .unwrap();
    assert_eq!(first_of_each, vec![Some(0), Some(4), Some(8)]);
}
