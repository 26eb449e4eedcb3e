//! Runtime for clawvisor.
//!
//! Implements the core ports on top of `tokio::process`, `reqwest` and the
//! service CLI, and hosts the orchestration built on them:
//!
//! - [`process`]: shell spawning, merged output, tree kill and name sweep
//! - [`health`]: Gateway HTTP probe and Node status probe
//! - [`events`]: the suspendable single-consumer event channel
//! - [`supervisor`]: start ordering, timeouts and idempotent stop
//! - [`monitor`]: the adaptive background reconcile loop

#![deny(unsafe_code)]

pub mod command;
pub mod detect;
pub mod events;
pub mod health;
pub mod monitor;
pub mod process;
pub mod supervisor;

pub use detect::{CLI_CANDIDATES, DetectedCli, detect_cli, parse_version};
pub use events::{EventSink, EventStream, SuspendDebouncer};
pub use health::{
    CliStatusProbe, DefaultHealthProbe, HttpProbe, StatusReport, classify_status_output,
};
pub use monitor::MonitorLoop;
pub use process::{ProcessHandle, ShellLauncher};
pub use supervisor::{StartOutcome, StatusSnapshot, StopSummary, Supervisor};
