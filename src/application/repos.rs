//! Collaborator traits describing the external seams the resolver consumes.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::records::{RecordStatus, StoredRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store failure: {0}")]
    Backend(String),
    #[error("content store timeout")]
    Timeout,
}

impl StoreError {
    pub fn from_backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache failure: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn from_backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Query shape for locating an override record.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Theme identity tag the record must carry.
    pub tag: String,
    /// Acceptable publication states.
    pub statuses: Vec<RecordStatus>,
    /// Maximum number of records, newest first.
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CreateRecordParams {
    pub title: String,
    pub payload: String,
    pub status: RecordStatus,
    pub tags: Vec<String>,
}

/// External content storage holding at most one override record per theme.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Matching records, most recent first, truncated to `filter.limit`.
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StoreError>;

    /// Create a record and return its identifier.
    async fn create(&self, params: CreateRecordParams) -> Result<i64, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<StoredRecord>, StoreError>;
}

/// Process-external key/value cache with expiration.
#[async_trait]
pub trait SettingsCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError>;

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError>;
}

/// Identity of a theme as the resolver needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDescriptor {
    pub slug: String,
    pub text_domain: String,
}

/// Metadata about the active theme and its files.
pub trait ThemeProvider: Send + Sync {
    fn active(&self) -> ThemeDescriptor;

    fn parent(&self) -> Option<ThemeDescriptor>;

    /// Path of the theme's definition file, `None` when the file is absent
    /// or unreadable. Absence is not an error.
    fn definition_path(&self, slug: &str) -> Option<PathBuf>;

    /// Directory holding the theme's files, if the theme resolves to disk.
    fn theme_dir(&self, slug: &str) -> Option<PathBuf>;

    /// Legacy feature-flag declarations of the active theme, mapped into the
    /// same schema shape as a definition file.
    fn capability_settings(&self) -> Value;

    /// Whether the active theme declares the named capability, e.g.
    /// `"default-color-palette"`.
    fn supports(&self, capability: &str) -> bool;

    /// Whether the active theme ships an explicit definition file, its own
    /// or inherited from its parent.
    fn has_definition_file(&self) -> bool {
        if self.definition_path(&self.active().slug).is_some() {
            return true;
        }
        self.parent()
            .is_some_and(|parent| self.definition_path(&parent.slug).is_some())
    }
}

/// Per-string translation backend, e.g. a gettext catalog.
pub trait StringTranslator: Send + Sync {
    fn translate(&self, text: &str, domain: &str) -> String;
}

/// Backend that leaves every string untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl StringTranslator for IdentityTranslator {
    fn translate(&self, text: &str, _domain: &str) -> String {
        text.to_string()
    }
}
