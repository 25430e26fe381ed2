//! Terminal operators.
//!
//! Each terminal is a small operator holding its own result; the driver
//! compiles a `&mut` borrow of it into the chain and the caller reads
//! the result back out afterwards. Terminals that can stop a traversal
//! early (find-first, any/all matching) contribute
//! `StageFlags::SHORT_CIRCUIT` when the pipeline is driven.

use crate::ops::Operator;

pub(crate) struct ForEachOp<F> {
    pub action: F,
}

impl<T, F: FnMut(T)> Operator<T> for ForEachOp<F> {
    fn accept(&mut self, value: T) {
        (self.action)(value);
    }
}

pub(crate) struct ForEachEnumeratedOp<F> {
    pub action: F,
    pub index: u64,
}

impl<T, F: FnMut(u64, T)> Operator<T> for ForEachEnumeratedOp<F> {
    fn accept(&mut self, value: T) {
        let index = self.index;
        self.index += 1;
        (self.action)(index, value);
    }
}

pub(crate) struct CountOp {
    pub count: u64,
}

impl<T> Operator<T> for CountOp {
    fn accept(&mut self, _value: T) {
        self.count += 1;
    }
}

pub(crate) struct CollectOp<T> {
    pub out: Vec<T>,
}

impl<T> Operator<T> for CollectOp<T> {
    fn begin(&mut self, size_hint: Option<u64>) {
        if let Some(size) = size_hint {
            self.out.reserve(size.min(isize::MAX as u64) as usize);
        }
    }

    fn accept(&mut self, value: T) {
        self.out.push(value);
    }
}

pub(crate) struct FoldOp<R, F> {
    pub acc: Option<R>,
    pub fold: F,
}

impl<T, R, F: FnMut(R, T) -> R> Operator<T> for FoldOp<R, F> {
    fn accept(&mut self, value: T) {
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.fold)(acc, value));
        }
    }
}

impl<R, F> FoldOp<R, F> {
    pub fn finish(self) -> R {
        match self.acc {
            Some(acc) => acc,
            // The accumulator is only absent transiently inside accept.
            None => unreachable!("fold accumulator missing"),
        }
    }
}

pub(crate) struct ReduceWithOp<T, F> {
    pub acc: Option<T>,
    pub reduce: F,
}

impl<T, F: FnMut(T, T) -> T> Operator<T> for ReduceWithOp<T, F> {
    fn accept(&mut self, value: T) {
        self.acc = Some(match self.acc.take() {
            Some(acc) => (self.reduce)(acc, value),
            None => value,
        });
    }
}

pub(crate) struct FindFirstOp<T> {
    pub found: Option<T>,
}

impl<T> Operator<T> for FindFirstOp<T> {
    fn accept(&mut self, value: T) {
        if self.found.is_none() {
            self.found = Some(value);
        }
    }

    fn can_short_circuit(&mut self) -> bool {
        self.found.is_some()
    }
}

pub(crate) struct FindLastOp<T> {
    pub found: Option<T>,
}

impl<T> Operator<T> for FindLastOp<T> {
    fn accept(&mut self, value: T) {
        self.found = Some(value);
    }
}

/// `any` halts on the first element matching the predicate, `all` on the
/// first element failing it.
pub(crate) struct MatchOp<F> {
    pub predicate: F,
    pub match_any: bool,
    pub halted: bool,
}

impl<F> MatchOp<F> {
    // any: halted means a match was found -> true.
    // all: halted means a counterexample was found -> false.
    pub fn result(&self) -> bool {
        self.halted == self.match_any
    }
}

impl<T, F: FnMut(&T) -> bool> Operator<T> for MatchOp<F> {
    fn accept(&mut self, value: T) {
        if !self.halted && (self.predicate)(&value) == self.match_any {
            self.halted = true;
        }
    }

    fn can_short_circuit(&mut self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_threads_the_accumulator() {
        let mut op = FoldOp {
            acc: Some(0),
            fold: |acc: i32, v: i32| acc + v,
        };
        for v in [1, 2, 3] {
            op.accept(v);
        }
        assert_eq!(op.finish(), 6);
    }

    #[test]
    fn reduce_with_is_none_on_empty_input() {
        let mut op = ReduceWithOp::<i32, _> {
            acc: None,
            reduce: |a: i32, b: i32| a.max(b),
        };
        op.begin(None);
        op.end();
        assert_eq!(op.acc, None);
    }

    #[test]
    fn find_first_keeps_the_first_and_halts() {
        let mut op = FindFirstOp { found: None };
        assert!(!op.can_short_circuit());
        op.accept(7);
        assert!(op.can_short_circuit());
        op.accept(8);
        assert_eq!(op.found, Some(7));
    }

    #[test]
    fn match_op_any_and_all() {
        let mut any = MatchOp {
            predicate: |n: &i32| *n > 2,
            match_any: true,
            halted: false,
        };
        any.accept(1);
        assert!(!any.result());
        any.accept(3);
        assert!(any.result());
        assert!(any.can_short_circuit());

        let mut all = MatchOp {
            predicate: |n: &i32| *n > 0,
            match_any: false,
            halted: false,
        };
        all.accept(1);
        assert!(all.result());
        all.accept(-1);
        assert!(!all.result());
        assert!(all.can_short_circuit());
    }
}
