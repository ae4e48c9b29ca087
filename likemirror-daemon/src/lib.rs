//! Interval scheduler for likemirror sync cycles.

mod error;
pub mod last_cycle;
mod runtime;

pub use error::DaemonError;
pub use last_cycle::LastCycle;
pub use runtime::{init_tracing, run, start_blocking, DaemonOptions, SyncCycle};
