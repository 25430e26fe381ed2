//! End-to-end tests for the pipeline engine: full chains, flag-driven
//! degeneration, execution lifecycle, and close handling.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use penstock::prelude::*;
use penstock::source;

/// A value whose comparisons are counted, to prove when sorting is (or
/// is not) doing work.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Counted(i32, Rc<RefCell<usize>>);

impl PartialOrd for Counted {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Counted {
    fn cmp(&self, other: &Self) -> Ordering {
        *self.1.borrow_mut() += 1;
        self.0.cmp(&other.0)
    }
}

fn counted(values: &[i32]) -> (Vec<Counted>, Rc<RefCell<usize>>) {
    let comparisons = Rc::new(RefCell::new(0));
    let values = values
        .iter()
        .map(|&n| Counted(n, Rc::clone(&comparisons)))
        .collect();
    (values, comparisons)
}

/// A long mixed chain produces the same result as the equivalent
/// iterator expression.
#[test]
fn mixed_chain_matches_iterator_semantics() {
    let got = source::from_iter(1..=100)
        .filter(|n| n % 3 != 0)
        .map(|n| n * 2)
        .skip(5)
        .take_while(|n| *n < 150)
        .distinct()
        .to_vec()
        .unwrap();

    let want: Vec<i32> = (1..=100)
        .filter(|n| n % 3 != 0)
        .map(|n| n * 2)
        .skip(5)
        .take_while(|n| *n < 150)
        .collect();
    assert_eq!(got, want);
}

/// Declaring a pipeline runs nothing; the terminal runs everything once.
#[test]
fn pipeline_is_lazy_until_the_terminal() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let mut pipe = source::of([1, 2, 3]).inspect(move |n| log.borrow_mut().push(*n));
    assert!(seen.borrow().is_empty());

    pipe.for_each(|_| {}).unwrap();
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

/// A consumed pipeline reports the failure instead of re-running.
#[test]
fn second_execution_fails_cleanly() {
    let mut pipe = source::of([1, 2, 3]).filter(|n| *n > 1);
    assert_eq!(pipe.count().unwrap(), 2);
    assert!(matches!(pipe.count(), Err(Error::SourceConsumed)));
}

/// Sorting a pipeline that is already flagged sorted never compares:
/// a double sort costs exactly as much as a single one.
#[test]
fn sort_on_sorted_input_is_free() {
    let (values, baseline_comparisons) = counted(&[5, 2, 9, 1]);
    let baseline = source::from_vec(values).sort().to_vec().unwrap();
    assert!(*baseline_comparisons.borrow() > 0);

    let (values, comparisons) = counted(&[5, 2, 9, 1]);
    let out = source::from_vec(values).sort().sort().to_vec().unwrap();
    assert_eq!(*comparisons.borrow(), *baseline_comparisons.borrow());
    assert_eq!(out, baseline);
    assert_eq!(out.iter().map(|c| c.0).collect::<Vec<_>>(), vec![1, 2, 5, 9]);
}

/// Ascending sort after a descending one flips without comparing.
#[test]
fn sort_on_reverse_sorted_input_only_reverses() {
    let (values, baseline_comparisons) = counted(&[3, 1, 2]);
    let _ = source::from_vec(values).sort_desc().to_vec().unwrap();

    let (values, comparisons) = counted(&[3, 1, 2]);
    let out = source::from_vec(values)
        .sort_desc()
        .sort()
        .to_vec()
        .unwrap();
    assert_eq!(*comparisons.borrow(), *baseline_comparisons.borrow());
    assert_eq!(out.iter().map(|c| c.0).collect::<Vec<_>>(), vec![1, 2, 3]);
}

/// distinct() on sorted input holds one element, not a hash set; the
/// observable contract is that output order and contents still match.
#[test]
fn distinct_after_sort_deduplicates_runs() {
    let out = source::of([4, 1, 4, 2, 1, 2, 4])
        .sort()
        .distinct()
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![1, 2, 4]);
}

/// reverse() twice restores the original order.
#[test]
fn double_reverse_round_trips() {
    let out = source::of([1, 2, 3]).reverse().reverse().to_vec().unwrap();
    assert_eq!(out, vec![1, 2, 3]);
}

/// Close actions run in order, exactly once, and never execute the
/// pipeline.
#[test]
fn close_runs_actions_in_order_without_executing() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let (first, second) = (Rc::clone(&trace), Rc::clone(&trace));
    let executed = Rc::new(RefCell::new(false));
    let touched = Rc::clone(&executed);

    let mut pipe = source::of([1, 2, 3])
        .inspect(move |_| *touched.borrow_mut() = true)
        .on_close(move || {
            first.borrow_mut().push("first");
            Ok(())
        })
        .on_close(move || {
            second.borrow_mut().push("second");
            Ok(())
        });

    pipe.close().unwrap();
    assert_eq!(*trace.borrow(), vec!["first", "second"]);
    assert!(!*executed.borrow());

    // Second close is a no-op.
    pipe.close().unwrap();
    assert_eq!(trace.borrow().len(), 2);
}

/// A failing close action does not stop the later ones; the first error
/// comes back with the rest suppressed.
#[test]
fn close_failure_still_runs_remaining_actions() {
    let ran = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ran);
    let mut pipe = source::of([1])
        .on_close(|| Err(Error::custom("first failed")))
        .on_close(move || {
            *flag.borrow_mut() = true;
            Err(Error::custom("second failed"))
        });

    let err = pipe.close().unwrap_err();
    assert!(*ran.borrow());
    match err {
        Error::Close { source, suppressed } => {
            assert!(source.to_string().contains("first failed"));
            assert_eq!(suppressed.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Terminal results survive the full chain: fold, reduce, matching.
#[test]
fn reduction_terminals() {
    assert_eq!(
        source::from_iter(1..=10).reduce(0, |acc, n| acc + n).unwrap(),
        55
    );
    assert_eq!(
        source::of(["a", "b", "c"])
            .reduce_with(|a, b| if a.len() >= b.len() { a } else { b })
            .unwrap(),
        Some("a")
    );
    assert_eq!(source::empty::<i32>().reduce_with(|a, _| a).unwrap(), None);
    assert!(source::from_iter(1..=10).all(|n| *n > 0).unwrap());
    assert!(!source::from_iter(1..=10).any(|n| *n > 10).unwrap());
}

/// find_first/find_last and the flag-driven min/max shortcuts agree
/// with the comparator-based path.
#[test]
fn extrema_agree_across_paths() {
    let data = [7, 3, 9, 3, 11, 2];
    assert_eq!(source::of(data).min().unwrap(), Some(2));
    assert_eq!(source::of(data).max().unwrap(), Some(11));
    assert_eq!(source::of(data).sort().min().unwrap(), Some(2));
    assert_eq!(source::of(data).sort_desc().max().unwrap(), Some(11));
    assert_eq!(
        source::of(data).min_by(|a, b| a.cmp(b)).unwrap(),
        Some(2)
    );
    assert_eq!(
        source::of(data).max_by(|a, b| a.cmp(b)).unwrap(),
        Some(11)
    );
}

/// take_last/drop_last work on both sized and unsized pipelines.
#[test]
fn tail_slicing() {
    assert_eq!(
        source::from_iter(0..10).take_last(3).to_vec().unwrap(),
        vec![7, 8, 9]
    );
    assert_eq!(
        source::from_iter(0..10).drop_last(3).to_vec().unwrap(),
        vec![0, 1, 2, 3, 4, 5, 6]
    );
    // Unsized: the filter discards the size.
    assert_eq!(
        source::from_iter(0..10)
            .filter(|_| true)
            .take_last(3)
            .to_vec()
            .unwrap(),
        vec![7, 8, 9]
    );
}

/// Enumerated variants see the element's position in this stage's
/// input, not the source position.
#[test]
fn enumeration_is_per_stage() {
    let out = source::of(['a', 'b', 'c', 'd'])
        .filter(|c| *c != 'b')
        .map_enumerated(|i, c| (i, c))
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![(0, 'a'), (1, 'c'), (2, 'd')]);

    let mut positions = Vec::new();
    source::of([10, 20, 30])
        .for_each_enumerated(|i, _| positions.push(i))
        .unwrap();
    assert_eq!(positions, vec![0, 1, 2]);
}

/// flat_map splices sub-pipelines and tears each one down as it goes.
#[test]
fn flat_map_end_to_end() {
    let closed = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&closed);
    let out = source::of([1, 2, 3])
        .flat_map(move |n| {
            let counter = Rc::clone(&counter);
            source::from_iter(0..n).on_close(move || {
                *counter.borrow_mut() += 1;
                Ok(())
            })
        })
        .to_vec()
        .unwrap();
    assert_eq!(out, vec![0, 0, 1, 0, 1, 2]);
    assert_eq!(*closed.borrow(), 3);
}
