#![forbid(unsafe_code)]
//! logmerge-exec: the streaming k-way merge.
//!
//! `Engine` wires `LineSource`s and a `LineSink` to a `Coordinator`, which owns
//! the `Frontier` (one pending line per live source) and runs the
//! `AwaitingInitialFill → Draining → Drained` state machine over a single
//! serialized event queue.

pub mod coordinator;
pub mod error;
pub mod frontier;
pub mod runtime;
pub mod validate;

pub use coordinator::{Coordinator, MergeOutcome, MergeState};
pub use error::{MergeError, Result};
pub use frontier::{Frontier, FrontierStats};
pub use runtime::Engine;
