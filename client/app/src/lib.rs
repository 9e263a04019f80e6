//! Snapgram client
//!
//! Application root of the client synchronization layer: loads
//! configuration, installs tracing and wires the remote operations facade,
//! query cache, feed pager, session gate and mutation coordinator into one
//! [`AppContext`].

pub mod config;
pub mod context;
pub mod queries;
pub mod telemetry;

pub use config::ClientConfig;
pub use context::AppContext;
pub use queries::Queries;
pub use telemetry::init_tracing;
