//! Quiesce - a quiescence barrier for animation-gated I/O
//!
//! Quiesce holds back the results of asynchronous operations (page fetches,
//! content swaps) while visual transitions are still running, releasing each
//! result as soon as its operation has settled and no animation is in flight.

pub mod barrier;
pub mod error;
pub mod gate;
pub mod id;

pub use barrier::{AnimationLabel, Barrier, BarrierConfig, BarrierSignal, BarrierStats};
pub use error::{BarrierError, GateError, Result};
pub use gate::{CancelHandle, Canceller, Gate, Operation};
