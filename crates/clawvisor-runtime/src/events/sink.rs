//! Ordered, suspendable event channel.
//!
//! Producers (supervisor, monitor, output pumps) hold cloned [`EventSink`]s;
//! exactly one consumer owns the [`EventStream`]. While suspended, events are
//! parked in a FIFO buffer and handed to the channel on resume. Direct sends
//! and the resume drain happen under the same lock, so nothing emitted after
//! a resume can overtake the buffered backlog.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use clawvisor_core::{LogEvent, ServiceKind, Severity, StateChange, SupervisorEvent, Transition};
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Default)]
struct Gate {
    suspended: bool,
    buffer: VecDeque<SupervisorEvent>,
}

struct SinkInner {
    tx: mpsc::UnboundedSender<SupervisorEvent>,
    gate: Mutex<Gate>,
}

/// Cloneable producer side of the event channel.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

/// Single consumer side of the event channel.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SupervisorEvent>,
}

impl EventSink {
    /// Create a connected sink/stream pair.
    pub fn channel() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            inner: Arc::new(SinkInner {
                tx,
                gate: Mutex::new(Gate::default()),
            }),
        };
        (sink, EventStream { rx })
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, event: SupervisorEvent) {
        // A dropped consumer means nobody is listening any more.
        if self.inner.tx.send(event).is_err() {
            trace!("Event consumer gone; dropping event");
        }
    }

    /// Deliver `event` now, or buffer it while suspended.
    pub fn emit(&self, event: impl Into<SupervisorEvent>) {
        let event = event.into();
        let mut gate = self.gate();
        if gate.suspended {
            gate.buffer.push_back(event);
        } else {
            self.deliver(event);
        }
    }

    /// Start buffering. Calling it while already suspended changes nothing.
    pub fn suspend(&self) {
        self.gate().suspended = true;
    }

    /// Stop buffering and flush the backlog in emission order.
    pub fn resume(&self) {
        let mut gate = self.gate();
        gate.suspended = false;
        let pending = gate.buffer.len();
        while let Some(event) = gate.buffer.pop_front() {
            self.deliver(event);
        }
        if pending > 0 {
            trace!(pending, "Flushed suspended events");
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.gate().suspended
    }

    /// Number of events waiting for a resume.
    pub fn buffered(&self) -> usize {
        self.gate().buffer.len()
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.inner.tx.is_closed()
    }

    pub fn log(&self, event: LogEvent) {
        self.emit(event);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(Severity::Info, text));
    }

    pub fn cmd(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(Severity::Cmd, text));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(Severity::Success, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(Severity::Error, text));
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(Severity::Debug, text));
    }

    /// Publish a state change if `transition` actually changed something.
    pub fn state_changed(&self, service: ServiceKind, transition: Transition) {
        if let Some(change) = StateChange::from_transition(service, transition) {
            self.emit(change);
        }
    }
}

impl EventStream {
    /// Next event, or `None` once every sink has been dropped.
    pub async fn recv(&mut self) -> Option<SupervisorEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<SupervisorEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything delivered so far.
    pub fn drain(&mut self) -> Vec<SupervisorEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Stream for EventStream {
    type Item = SupervisorEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawvisor_core::{Lifecycle, ServiceStateMachine};

    fn texts(events: &[SupervisorEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(SupervisorEvent::as_log)
            .map(|log| log.text.clone())
            .collect()
    }

    #[test]
    fn delivers_immediately_when_not_suspended() {
        let (sink, mut stream) = EventSink::channel();
        sink.info("one");
        sink.error("two");

        let events = stream.drain();
        assert_eq!(texts(&events), ["one", "two"]);
        assert_eq!(events[1].as_log().unwrap().severity, Severity::Error);
    }

    #[test]
    fn suspend_buffers_until_resume() {
        let (sink, mut stream) = EventSink::channel();
        sink.suspend();
        sink.info("held");
        assert!(stream.try_recv().is_none());
        assert_eq!(sink.buffered(), 1);

        sink.resume();
        assert_eq!(texts(&stream.drain()), ["held"]);
        assert!(!sink.is_suspended());
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn order_is_preserved_across_suspend() {
        for n in [0usize, 1, 10, 1000] {
            let (sink, mut stream) = EventSink::channel();
            sink.info("before");
            sink.suspend();
            for i in 0..n {
                sink.info(format!("e{i}"));
            }
            sink.resume();
            sink.info("after");

            let mut expected = vec!["before".to_string()];
            expected.extend((0..n).map(|i| format!("e{i}")));
            expected.push("after".to_string());
            assert_eq!(texts(&stream.drain()), expected, "n = {n}");
        }
    }

    #[test]
    fn no_op_transition_emits_nothing() {
        let (sink, mut stream) = EventSink::channel();
        let machine = ServiceStateMachine::new(ServiceKind::Gateway);

        sink.state_changed(ServiceKind::Gateway, machine.apply(Lifecycle::ProbeSucceeded));
        assert!(stream.try_recv().is_none());

        sink.state_changed(ServiceKind::Gateway, machine.apply(Lifecycle::StartRequested));
        let event = stream.try_recv().unwrap();
        let change = event.as_state().unwrap();
        assert_eq!(change.service, ServiceKind::Gateway);
        assert_eq!(change.to, clawvisor_core::ServiceState::Starting);
    }

    #[test]
    fn emitting_after_consumer_drop_is_harmless() {
        let (sink, stream) = EventSink::channel();
        drop(stream);
        assert!(sink.is_closed());
        sink.info("nobody listens");
        sink.suspend();
        sink.info("still fine");
        sink.resume();
    }

    #[tokio::test]
    async fn concurrent_producers_keep_their_own_order() {
        let (sink, mut stream) = EventSink::channel();
        let mut tasks = Vec::new();
        for producer in 0..4 {
            let sink = sink.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..250 {
                    sink.info(format!("{producer}:{i}"));
                    if i % 50 == 0 {
                        sink.suspend();
                        tokio::task::yield_now().await;
                        sink.resume();
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        sink.resume();

        let events = texts(&stream.drain());
        assert_eq!(events.len(), 1000);
        for producer in 0..4 {
            let seen: Vec<usize> = events
                .iter()
                .filter_map(|t| t.strip_prefix(&format!("{producer}:")))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..250).collect::<Vec<_>>());
        }
    }
}
