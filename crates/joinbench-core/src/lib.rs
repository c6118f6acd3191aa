//! joinbench-core - shared plumbing for the join benchmark harness
//!
//! Terminal-aware logging, per-size progress lines, and the shutdown flag
//! that lets a long benchmark schedule stop cleanly between sizes.

pub mod logging;
pub mod progress;
pub mod shutdown;

pub use logging::{init_logging, ProgressLogger};
pub use progress::{fmt_duration, fmt_num, ProgressContext};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};
