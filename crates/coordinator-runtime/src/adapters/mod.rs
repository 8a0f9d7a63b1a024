//! # Adapters
//!
//! Outbound port implementations used by the runtime.

pub mod probe;

pub use probe::TcpConnectProbe;
