//! Request dispatch and the HTTP boundary for llmgate.
//!
//! - [`dispatcher::Dispatcher`]: model name → backend routing, failure
//!   normalisation and usage accounting
//! - [`server`]: axum router exposing completions, status, health,
//!   metrics and logs
//! - [`logbuf::RecentLogs`]: in-memory ring buffer of recent log lines
//! - [`telemetry`]: Prometheus recorder behind `/metrics`

pub mod dispatcher;
pub mod logbuf;
pub mod server;
pub mod telemetry;

pub use dispatcher::{DispatchError, Dispatcher};
pub use logbuf::RecentLogs;
pub use server::{router, serve, AppState};
