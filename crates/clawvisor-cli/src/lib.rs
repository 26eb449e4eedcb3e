//! Command-line front end for clawvisor.
//!
//! Wires settings, tracing and the runtime together and hosts the single
//! consumer of the supervisor's event stream.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, bootstrap, init_tracing};
pub use commands::Commands;
pub use error::CliError;
pub use parser::{Cli, LaunchArgs};
