//! Data models
//!
//! Records owned by the relational store (files, folders, policies, users),
//! the upload sessions kept in the side cache, and the listing objects handed
//! back to callers.

mod file;
mod folder;
mod object;
mod policy;
mod upload_session;
mod user;

// Re-export all models for convenient imports
pub use file::*;
pub use folder::*;
pub use object::*;
pub use policy::*;
pub use upload_session::*;
pub use user::*;
