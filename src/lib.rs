//! Layered site-settings resolution.
//!
//! `strati` computes the effective configuration for a site from three
//! origins, merged in fixed precedence order:
//!
//! - **default** — platform defaults shipped with the crate
//! - **theme** — the active theme's definition file, parent-merged, with a
//!   legacy capability layer folded beneath it
//! - **custom** — a user override record held in external content storage
//!
//! Each origin's document is computed once per process and memoized inside a
//! [`Resolver`] instance. The user override is located through a cache-aside
//! lookup with a confirmed-absent sentinel, so sites without an override do
//! not query the content store on every resolution. [`Resolver::invalidate_all`]
//! drops all memoized state when any origin's backing data changes.
//!
//! External collaborators (content store, cache, theme metadata, string
//! translation) are trait seams under [`application::repos`]; in-memory and
//! filesystem reference adapters live under [`infra`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
mod util;

pub use application::error::ResolveError;
pub use application::repos::{
    CacheError, ContentStore, CreateRecordParams, IdentityTranslator, RecordFilter, SettingsCache,
    StoreError, StringTranslator, ThemeDescriptor, ThemeProvider,
};
pub use application::resolver::{MergeDepth, Resolver};
pub use application::translate::Translations;
pub use config::ResolverConfig;
pub use domain::document::{Mergeable, Origin, SettingsDocument};
pub use domain::records::{
    ABSENT_SENTINEL, CachedLookup, OWNED_FLAG, RecordStatus, StoredRecord,
};
