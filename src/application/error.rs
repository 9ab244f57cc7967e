use thiserror::Error;

use crate::application::repos::{CacheError, StoreError};

/// Hard failure of an external collaborator, surfaced unchanged to the
/// caller of a resolution. Missing or malformed theme/user data never lands
/// here; it degrades to fewer merged layers instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}
