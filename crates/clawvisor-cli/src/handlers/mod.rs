//! Command handlers.
//!
//! Each handler takes the composed [`CliContext`](crate::CliContext), drives
//! the runtime, and formats output for the terminal.

pub mod detect;
pub mod run;
pub mod status;
