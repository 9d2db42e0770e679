//! Process plumbing for the fortune server.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`sig_down`] | Graceful shutdown on SIGTERM and SIGINT |
//! | [`telemetry`] | Log subscriber, HTTP tracing, optional OpenTelemetry export (`telemetry` feature) |

pub mod sig_down;
pub mod telemetry;

pub use sig_down::*;
pub use telemetry::*;
