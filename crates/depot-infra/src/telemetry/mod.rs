//! Tracing initialization
//!
//! Filter comes from `RUST_LOG`, output format from `LOG_FORMAT`.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat};
