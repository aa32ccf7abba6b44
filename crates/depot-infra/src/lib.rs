//! Depot Infrastructure Library
//!
//! Shared infrastructure used by the Depot binaries and the file-system core:
//! - Telemetry initialization (tracing subscriber)
//! - Upload-session side cache

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "session-cache")]
pub mod cache;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

#[cfg(feature = "session-cache")]
pub use cache::{session_cache_key, MemorySessionStore, SessionStore};
