#![allow(dead_code)]

pub use jobdag_test_utils::builders;
pub use jobdag_test_utils::fake_launcher;
pub use jobdag_test_utils::{argv, capture_logs, init_tracing, with_timeout};

use jobdag_test_utils::fake_launcher::LaunchEvent;

/// Index of the first event matching `event`, panicking if it never happened.
pub fn position(events: &[LaunchEvent], event: &LaunchEvent) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event {event:?} not found in {events:?}"))
}

/// Index of the exit event for `program`, whatever its code.
pub fn exit_position(events: &[LaunchEvent], program: &str) -> usize {
    events
        .iter()
        .position(|e| matches!(e, LaunchEvent::Exited(name, _) if name == program))
        .unwrap_or_else(|| panic!("{program} never exited: {events:?}"))
}

pub fn started(program: &str) -> LaunchEvent {
    LaunchEvent::Started(program.to_string())
}

pub fn exited(program: &str, code: i32) -> LaunchEvent {
    LaunchEvent::Exited(program.to_string(), code)
}
