//! Core domain types and port definitions for clawvisor.
//!
//! This crate knows nothing about processes, sockets or terminals. It defines
//! the two supervised services, their lifecycle state machine, the events
//! delivered to a front end, the launch configuration, and the ports the
//! runtime implements.

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{Lifecycle, ServiceKind, ServiceState, ServiceStateMachine, Transition};
pub use events::{LogEvent, Severity, StateChange, SupervisorEvent};
pub use ports::{
    ConnectionState, HealthProbe, LineStream, ProcessError, ProcessLauncher, ServiceProcess,
};
pub use settings::{
    ConfigError, DEFAULT_CLI, DEFAULT_DISPLAY_NAME, DEFAULT_GATEWAY_PORT, DEFAULT_HOST,
    LaunchSettings, SupervisorConfig,
};
