//! Merge orchestration across origins.

use std::sync::Arc;

use tracing::debug;

use crate::application::error::ResolveError;
use crate::application::loaders::{CoreLoader, ThemeLoader, UserLoader};
use crate::application::repos::{ContentStore, SettingsCache, StringTranslator, ThemeProvider};
use crate::application::translate::Translations;
use crate::config::ResolverConfig;
use crate::domain::document::{Mergeable, Origin, SettingsDocument};
use crate::util::lock::rw_write;

const SOURCE: &str = "application::resolver";

/// How many precedence tiers a merged document includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDepth {
    /// Defaults and theme data only.
    Theme,
    /// Defaults, theme data, and the user override.
    Custom,
}

/// Resolves the effective configuration for a site.
///
/// One instance per execution context; all memoized state lives inside the
/// instance and is reset as a group by [`Resolver::invalidate_all`].
pub struct Resolver {
    core: CoreLoader,
    theme: ThemeLoader,
    user: UserLoader,
    translations: Arc<Translations>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn SettingsCache>,
        themes: Arc<dyn ThemeProvider>,
        translator: Arc<dyn StringTranslator>,
        config: ResolverConfig,
    ) -> Self {
        let translations = Arc::new(Translations::new(translator));
        Self {
            core: CoreLoader::new(translations.clone()),
            theme: ThemeLoader::new(themes.clone(), translations.clone()),
            user: UserLoader::new(store, cache, themes, config),
            translations,
        }
    }

    /// Platform default settings.
    pub fn core_data(&self) -> SettingsDocument {
        self.core.get()
    }

    /// Active-theme settings, parent-merged, with the legacy capability
    /// layer folded beneath them.
    pub async fn theme_data(&self) -> SettingsDocument {
        self.theme.get().await
    }

    /// User override settings.
    pub async fn user_data(&self) -> Result<SettingsDocument, ResolveError> {
        self.user.get().await
    }

    /// Style variation documents offered by the active theme and its parent.
    pub async fn style_variations(&self) -> Vec<SettingsDocument> {
        self.theme.variations().await
    }

    /// Identifier of the user override record, optionally creating it.
    pub async fn user_override_id(
        &self,
        create_if_missing: bool,
    ) -> Result<Option<i64>, ResolveError> {
        self.user.record_id(create_if_missing).await
    }

    /// Effective configuration at the requested depth.
    ///
    /// Origins always fold in the fixed order default, theme, custom; later
    /// merges overwrite earlier ones. The fold itself is recomputed per call;
    /// only the per-origin inputs are memoized.
    pub async fn merged(&self, depth: MergeDepth) -> Result<SettingsDocument, ResolveError> {
        let mut result = SettingsDocument::empty(Origin::Default);
        result.merge(&self.core.get());
        result.merge(&self.theme.get().await);
        if depth == MergeDepth::Custom {
            result.merge(&self.user.get().await?);
        }
        Ok(result)
    }

    /// Drop every memoized value: the three origin documents, the derived
    /// record id, and the translation schema. All write guards are taken
    /// before any state is cleared so no caller observes a partial reset.
    /// Idempotent.
    pub fn invalidate_all(&self) {
        let mut core = rw_write(&self.core.doc, SOURCE, "invalidate.core");
        let mut theme = rw_write(&self.theme.doc, SOURCE, "invalidate.theme");
        let mut user = rw_write(&self.user.doc, SOURCE, "invalidate.user");
        let mut record_id = rw_write(&self.user.record_id, SOURCE, "invalidate.record_id");
        let mut schema = rw_write(self.translations.memo(), SOURCE, "invalidate.schema");

        *core = None;
        *theme = None;
        *user = None;
        *record_id = None;
        *schema = None;

        debug!("Cleared memoized settings state");
    }
}
