//! Site configuration module.
//!
//! Handles loading, validating, and merging the site's `config.toml`. Stock
//! defaults are the base layer; the user's file only needs the keys it wants
//! to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "output"        # Where compiled reps are written
//! rules_file = "Rules"         # Rule source, relative to the site root
//! assets_prefix = "/assets"    # Prepended to every asset path
//! index_filenames = ["index.html"]
//! text_extensions = ["css", "htm", "html", "js", "md", "txt", "xml", ...]
//!
//! [sources]
//! content_dir = "content"      # Pages
//! layouts_dir = "layouts"      # Layouts
//! assets_dir = "assets"        # Assets
//! ```
//!
//! The first entry of `index_filenames` doubles as the default filename and
//! extension for pages that do not set `filename`/`extension` metadata, and
//! every entry is stripped from paths to form clean URLs.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory compiled reps are written to, relative to the site root.
    pub output_dir: String,
    /// Rule source file, relative to the site root.
    pub rules_file: String,
    /// Path prefix for every asset rep (e.g. `/assets`).
    pub assets_prefix: String,
    /// Filenames stripped from paths to form clean URLs. The first entry is
    /// the default page filename.
    pub index_filenames: Vec<String>,
    /// Extensions of files read as text rather than binary.
    pub text_extensions: Vec<String>,
    /// Where the filesystem data source looks for content.
    pub sources: SourcesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            rules_file: "Rules".to_string(),
            assets_prefix: "/assets".to_string(),
            index_filenames: vec!["index.html".to_string()],
            text_extensions: [
                "css", "erb", "haml", "htm", "html", "js", "less", "markdown", "md", "php", "rb",
                "sass", "scss", "txt", "xhtml", "xml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            sources: SourcesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_filenames.is_empty() {
            return Err(ConfigError::Validation(
                "index_filenames must not be empty".into(),
            ));
        }
        if self.index_filenames.iter().any(|f| f.is_empty() || f.contains('/')) {
            return Err(ConfigError::Validation(
                "index_filenames entries must be plain, non-empty filenames".into(),
            ));
        }
        if !self.assets_prefix.is_empty() && !self.assets_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "assets_prefix must be empty or start with '/'".into(),
            ));
        }
        if self.output_dir.is_empty() || self.rules_file.is_empty() {
            return Err(ConfigError::Validation(
                "output_dir and rules_file must not be empty".into(),
            ));
        }
        self.sources.validate()
    }

    /// Default page filename and extension, taken from the first index
    /// filename: `index.html` → (`index`, `html`).
    pub fn default_filename_and_extension(&self) -> (&str, &str) {
        let first = self
            .index_filenames
            .first()
            .map(String::as_str)
            .unwrap_or("index.html");
        match first.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext),
            _ => (first, ""),
        }
    }

    /// Whether files with this extension are read as text.
    pub fn is_text_extension(&self, ext: &str) -> bool {
        self.text_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Directories the filesystem data source reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Pages, with optional front matter.
    pub content_dir: String,
    /// Layouts, with optional front matter.
    pub layouts_dir: String,
    /// Assets, with optional `<stem>.toml` sidecar metadata.
    pub assets_dir: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            layouts_dir: "layouts".to_string(),
            assets_dir: "assets".to_string(),
        }
    }
}

impl SourcesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.content_dir.is_empty() || self.layouts_dir.is_empty() || self.assets_dir.is_empty()
        {
            return Err(ConfigError::Validation(
                "sources directories must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the site root as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the site root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Site Configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory compiled representations are written to, relative to the site root.
output_dir = "output"

# Rule source file, relative to the site root.
rules_file = "Rules"

# Prefix prepended to the path of every asset representation.
assets_prefix = "/assets"

# Filenames stripped from paths to form clean URLs (/about/index.html -> /about/).
# The first entry is also the default filename and extension of pages.
index_filenames = ["index.html"]

# Files with these extensions are read as text; everything else is binary.
text_extensions = [
    "css", "erb", "haml", "htm", "html", "js", "less", "markdown", "md", "php", "rb",
    "sass", "scss", "txt", "xhtml", "xml",
]

# ---------------------------------------------------------------------------
# Content sources
# ---------------------------------------------------------------------------
[sources]
# Pages. Front matter goes between `---` lines at the top of the file.
content_dir = "content"

# Layouts. Same front matter format as pages.
layouts_dir = "layouts"

# Assets. Metadata lives in an optional sidecar: logo.png -> logo.toml
assets_dir = "assets"
"##
}
