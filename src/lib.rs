//! # Penstock
//!
//! A lazy, single-pass, push-based data transformation pipeline.
//!
//! Pipelines are declared as a chain of stages over a source and do no
//! work until a terminal operation drives them; each element is pushed
//! through the whole compiled chain exactly once. Stages advertise
//! element properties (sized, sorted, distinct) as [`StageFlags`], and
//! downstream stages use those flags to degenerate into cheaper forms,
//! sorting an already-sorted pipeline costs nothing.
//!
//! ## Quick Start
//!
//! ```
//! use penstock::prelude::*;
//!
//! // `1..` is endless: limit() makes the traversal short-circuit, so
//! // exactly three even numbers are ever pulled from the source.
//! let evens = penstock::source::from_iter(1..)
//!     .filter(|n| n % 2 == 0)
//!     .limit(3)
//!     .to_vec()?;
//! assert_eq!(evens, vec![2, 4, 6]);
//! # penstock::Result::Ok(())
//! ```
//!
//! A pipeline executes at most once: terminals take `&mut self`, and a
//! second terminal on the same pipeline fails with
//! [`Error::SourceConsumed`]. To consume a pipeline element by element
//! instead of driving it to completion, convert it back into a pull
//! source with [`Pipe::into_cursor`] or [`Pipe::into_iter`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod flags;
pub mod ops;
pub mod pipe;
pub mod policy;
pub mod pull;
pub mod source;
pub mod stage;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cursor::Cursor;
    pub use crate::error::{Error, Result};
    pub use crate::flags::StageFlags;
    pub use crate::pipe::Pipe;
    pub use crate::policy::{MergePolicy, MergeRemainingPolicy, PartitionPolicy};
    pub use crate::stage::Stage;
}

pub use error::{Error, Result};
pub use flags::StageFlags;
pub use pipe::Pipe;
