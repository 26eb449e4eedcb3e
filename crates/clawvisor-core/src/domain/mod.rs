//! Domain types for the two supervised services.

mod machine;
mod service;
mod state;

pub use machine::ServiceStateMachine;
pub use service::ServiceKind;
pub use state::{Lifecycle, ServiceState, Transition};
