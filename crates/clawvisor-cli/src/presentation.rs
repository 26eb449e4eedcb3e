//! Terminal rendering of supervisor events.

use chrono::Local;
use clawvisor_core::{LogEvent, StateChange, SupervisorEvent};

/// One human-readable line: `[HH:MM:SS] LEVEL [Service] text`.
pub fn format_event(event: &SupervisorEvent) -> String {
    match event {
        SupervisorEvent::Log(log) => format_log(log),
        SupervisorEvent::State(change) => format_state(change),
    }
}

fn format_log(log: &LogEvent) -> String {
    let time = log.timestamp.with_timezone(&Local).format("%H:%M:%S");
    match log.service {
        Some(service) => format!("[{time}] {:<7} [{service}] {}", log.severity.label(), log.text),
        None => format!("[{time}] {:<7} {}", log.severity.label(), log.text),
    }
}

fn format_state(change: &StateChange) -> String {
    let time = change.timestamp.with_timezone(&Local).format("%H:%M:%S");
    format!(
        "[{time}] STATE   {}: {} -> {}",
        change.service, change.from, change.to
    )
}

/// One JSON line per event.
pub fn format_event_json(event: &SupervisorEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| format!(r#"{{"type":"error","text":"{e}"}}"#))
}
