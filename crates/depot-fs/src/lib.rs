//! Depot file-system core
//!
//! Maps logical file records onto the storage backends that hold their bytes.
//! A [`FileSystem`] acts for one user; every operation resolves its targets,
//! dispatches to the owning policy's handler and returns an immutable
//! [`Target`] or a result, never mutating shared state.
//!
//! - [`dispatch`]: policy to handler binding (no-op in slave mode)
//! - [`resolve`]: file targets by id or virtual path
//! - [`content`] / [`speed_limit`]: readable streams, throttled per group
//! - [`preview`]: stream or redirect decision
//! - [`sign`]: signed, download and source links
//! - [`delete`]: grouped deletion with per-policy failure lists, record removal
//! - [`session`]: upload-session cancellation during deletion
//! - [`search`]: keyword search scoped to a folder subtree
//! - [`file`]: file record creation

pub mod content;
pub mod context;
pub mod delete;
pub mod dispatch;
pub mod error;
pub mod file;
pub mod filesystem;
pub mod preview;
pub mod resolve;
pub mod search;
pub mod session;
pub mod sign;
pub mod speed_limit;

pub use context::OpContext;
pub use delete::{
    exclude_derived_artifacts, group_by_policy, removable_files, FailedByPolicy, Removal,
};
pub use dispatch::{Binding, Dispatcher};
pub use error::{FsError, FsResult};
pub use filesystem::{FileSystem, FsDeps, FsOptions};
pub use preview::ContentResponse;
pub use resolve::{FileRef, Target};
pub use search::Listing;
pub use speed_limit::{SpeedLimited, TokenBucket};
