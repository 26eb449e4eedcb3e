//! Event delivery from background tasks to the single consumer.

mod debounce;
mod sink;

pub use debounce::SuspendDebouncer;
pub use sink::{EventSink, EventStream};
