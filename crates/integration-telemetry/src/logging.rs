//! Structured logging helpers.
//!
//! Every log line emitted by the core carries a `component` field so log
//! aggregation can split bus, registry, health and alert output.

/// Log an event-bus line with the standard event fields.
#[macro_export]
macro_rules! log_bus_event {
    ($level:ident, $msg:expr, $event_id:expr, $kind:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "event-bus",
            event_id = %$event_id,
            kind = %$kind,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a per-system line with the standard `system` field.
#[macro_export]
macro_rules! log_system_event {
    ($level:ident, $component:expr, $msg:expr, $system:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            system = %$system,
            $($($field)*,)?
            $msg
        )
    };
}
