//! Process supervision: launch sequencing and signal handling.

mod errors;
pub(crate) mod launch;
pub(crate) mod signals;

pub use errors::LaunchError;
pub use launch::run_daemon;
pub use signals::{ControlEvent, ControlSignals, ShutdownError, SystemControlSignals};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
