//! Filesystem-backed theme metadata.
//!
//! [`DirectoryThemes`] resolves themes under a root directory, one
//! subdirectory per theme, with an optional `theme.json` definition file in
//! each. Capability declarations are supplied per theme via
//! [`ThemeCapabilities`] and mapped into the definition-file schema shape.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::application::loaders::theme::{CAP_DEFAULT_GRADIENTS, CAP_DEFAULT_PALETTE};
use crate::application::repos::{ThemeDescriptor, ThemeProvider};

const DEFINITION_FILE: &str = "theme.json";

/// Legacy feature-flag declarations of a theme.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeCapabilities {
    /// Editor color presets, each `{ "name", "slug", "color" }`.
    pub color_palette: Option<Value>,
    /// Editor gradient presets.
    pub gradient_presets: Option<Value>,
    /// Editor font-size presets.
    pub font_sizes: Option<Value>,
    pub custom_line_height: bool,
    pub default_color_palette: bool,
    pub default_gradient_presets: bool,
}

impl ThemeCapabilities {
    /// Map the declarations into the same schema shape as a definition file.
    fn to_settings(&self) -> Value {
        let mut color = Map::new();
        if let Some(palette) = &self.color_palette {
            color.insert("palette".into(), palette.clone());
        }
        if let Some(gradients) = &self.gradient_presets {
            color.insert("gradients".into(), gradients.clone());
        }

        let mut typography = Map::new();
        if let Some(sizes) = &self.font_sizes {
            typography.insert("fontSizes".into(), sizes.clone());
        }
        if self.custom_line_height {
            typography.insert("lineHeight".into(), Value::Bool(true));
        }

        let mut settings = Map::new();
        if !color.is_empty() {
            settings.insert("color".into(), Value::Object(color));
        }
        if !typography.is_empty() {
            settings.insert("typography".into(), Value::Object(typography));
        }

        if settings.is_empty() {
            json!({})
        } else {
            json!({ "settings": settings })
        }
    }
}

/// Registration data for one theme under the root directory.
#[derive(Debug, Clone)]
pub struct ThemeManifest {
    pub slug: String,
    pub text_domain: String,
    pub parent: Option<String>,
    pub capabilities: ThemeCapabilities,
}

impl ThemeManifest {
    pub fn new(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            text_domain: slug.clone(),
            slug,
            parent: None,
            capabilities: ThemeCapabilities::default(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: ThemeCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

pub struct DirectoryThemes {
    root: PathBuf,
    themes: HashMap<String, ThemeManifest>,
    active: String,
}

impl DirectoryThemes {
    pub fn new(
        root: impl Into<PathBuf>,
        manifests: Vec<ThemeManifest>,
        active: impl Into<String>,
    ) -> Self {
        let themes = manifests
            .into_iter()
            .map(|manifest| (manifest.slug.clone(), manifest))
            .collect();
        Self {
            root: root.into(),
            themes,
            active: active.into(),
        }
    }

    fn descriptor(&self, slug: &str) -> ThemeDescriptor {
        match self.themes.get(slug) {
            Some(manifest) => ThemeDescriptor {
                slug: manifest.slug.clone(),
                text_domain: manifest.text_domain.clone(),
            },
            // Unregistered slug: the slug doubles as the text domain.
            None => ThemeDescriptor {
                slug: slug.to_string(),
                text_domain: slug.to_string(),
            },
        }
    }
}

impl ThemeProvider for DirectoryThemes {
    fn active(&self) -> ThemeDescriptor {
        self.descriptor(&self.active)
    }

    fn parent(&self) -> Option<ThemeDescriptor> {
        let manifest = self.themes.get(&self.active)?;
        let parent = manifest.parent.as_deref()?;
        Some(self.descriptor(parent))
    }

    fn definition_path(&self, slug: &str) -> Option<PathBuf> {
        let path = self.root.join(slug).join(DEFINITION_FILE);
        path.is_file().then_some(path)
    }

    fn theme_dir(&self, slug: &str) -> Option<PathBuf> {
        let dir = self.root.join(slug);
        dir.is_dir().then_some(dir)
    }

    fn capability_settings(&self) -> Value {
        self.themes
            .get(&self.active)
            .map(|manifest| manifest.capabilities.to_settings())
            .unwrap_or_else(|| json!({}))
    }

    fn supports(&self, capability: &str) -> bool {
        let Some(manifest) = self.themes.get(&self.active) else {
            return false;
        };
        match capability {
            CAP_DEFAULT_PALETTE => manifest.capabilities.default_color_palette,
            CAP_DEFAULT_GRADIENTS => manifest.capabilities.default_gradient_presets,
            _ => false,
        }
    }
}

/// Write a theme directory with a definition file; test/fixture helper.
pub fn write_definition_file(root: &Path, slug: &str, definition: &Value) -> std::io::Result<()> {
    let dir = root.join(slug);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(DEFINITION_FILE), definition.to_string())
}
