//! Infrastructure adapters for the collaborator seams.

pub mod cache;
pub mod store;
pub mod themes;
