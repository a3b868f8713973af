//! Command handlers module.
//!
//! This module organizes the CLI command implementations:
//! - `extract.rs`: one-shot extraction with a printed overview
//! - `watch.rs`: change-driven extraction until Ctrl-C

mod extract;
mod watch;

pub use extract::cmd_extract;
pub use watch::cmd_watch;
