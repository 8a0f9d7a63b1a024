//! Adapters connecting the health monitor to the event bus.

pub mod bus_handler;
