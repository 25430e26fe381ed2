//! Capability flags carried by pipeline stages.
//!
//! Every stage stores a [`StageFlags`] value describing what is statically
//! known about the elements it will emit. Flags are combined exactly once,
//! when a stage is constructed, from the upstream stage's flags and the
//! operation's own [`OpFlags`]. They are never derived from data: an
//! operation either knows a property from its construction (a sort stage
//! knows its output is sorted) or it does not claim it.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// What a stage statically knows about the elements it emits.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct StageFlags(u32);

impl StageFlags {
    /// No known properties.
    pub const EMPTY: StageFlags = StageFlags(0);

    /// The exact number of elements is known before traversal.
    pub const SIZED: StageFlags = StageFlags(1 << 0);

    /// Elements have a meaningful encounter order.
    pub const ORDERED: StageFlags = StageFlags(1 << 1);

    /// Elements are in ascending natural order.
    pub const SORTED: StageFlags = StageFlags(1 << 2);

    /// Elements are in descending natural order.
    pub const REVERSE_SORTED: StageFlags = StageFlags(1 << 3);

    /// No two elements compare equal.
    pub const DISTINCT: StageFlags = StageFlags(1 << 4);

    /// Some stage at or before this point may stop the traversal early.
    ///
    /// Unlike the element properties above, this bit only accumulates: no
    /// operation can un-declare a short-circuit capability introduced
    /// upstream.
    pub const SHORT_CIRCUIT: StageFlags = StageFlags(1 << 5);

    /// Bits a data source cursor may legitimately advertise.
    pub const CURSOR_MASK: StageFlags = StageFlags(
        Self::SIZED.0 | Self::ORDERED.0 | Self::SORTED.0 | Self::REVERSE_SORTED.0 | Self::DISTINCT.0,
    );

    /// Whether all bits of `other` are present.
    pub const fn contains(self, other: StageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is present.
    pub const fn intersects(self, other: StageFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of both flag sets.
    pub const fn union(self, other: StageFlags) -> StageFlags {
        StageFlags(self.0 | other.0)
    }

    /// This set with the bits of `other` removed.
    pub const fn without(self, other: StageFlags) -> StageFlags {
        StageFlags(self.0 & !other.0)
    }

    /// Intersection of both flag sets.
    pub const fn intersection(self, other: StageFlags) -> StageFlags {
        StageFlags(self.0 & other.0)
    }

    /// Whether no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for StageFlags {
    type Output = StageFlags;

    fn bitor(self, rhs: StageFlags) -> StageFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for StageFlags {
    fn bitor_assign(&mut self, rhs: StageFlags) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for StageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(StageFlags, &str); 6] = [
            (StageFlags::SIZED, "SIZED"),
            (StageFlags::ORDERED, "ORDERED"),
            (StageFlags::SORTED, "SORTED"),
            (StageFlags::REVERSE_SORTED, "REVERSE_SORTED"),
            (StageFlags::DISTINCT, "DISTINCT"),
            (StageFlags::SHORT_CIRCUIT, "SHORT_CIRCUIT"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("EMPTY")?;
        }
        Ok(())
    }
}

/// How one operation transforms the flags of its upstream stage.
///
/// Each property bit is either set, cleared, or kept: a bit present in
/// `set` is asserted on the output, a bit present in `clear` is removed,
/// and everything else passes through unchanged. Setting wins over
/// clearing if an operation ever names a bit in both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpFlags {
    set: StageFlags,
    clear: StageFlags,
}

impl OpFlags {
    /// Keeps every upstream bit untouched.
    pub const KEEP_ALL: OpFlags = OpFlags {
        set: StageFlags::EMPTY,
        clear: StageFlags::EMPTY,
    };

    /// An operation that asserts the given bits on its output.
    pub const fn sets(flags: StageFlags) -> OpFlags {
        OpFlags {
            set: flags,
            clear: StageFlags::EMPTY,
        }
    }

    /// An operation that removes the given bits from its output.
    pub const fn clears(flags: StageFlags) -> OpFlags {
        OpFlags {
            set: StageFlags::EMPTY,
            clear: flags,
        }
    }

    /// Combine with another operation's effect (both applied to the same
    /// stage; `other`'s set wins over `self`'s clear and vice versa is
    /// resolved in favor of setting, consistent with [`OpFlags::apply`]).
    pub const fn and(self, other: OpFlags) -> OpFlags {
        OpFlags {
            set: self.set.union(other.set),
            clear: self.clear.union(other.clear),
        }
    }

    /// Compute the flags of the stage this operation produces from the
    /// flags of the stage it consumes.
    pub const fn apply(self, upstream: StageFlags) -> StageFlags {
        upstream.without(self.clear).union(self.set)
    }
}
