//! Site data shared by every stage of a compile run.
//!
//! Items and layouts are produced once per run by a [`DataSource`] and never
//! mutated afterwards; the compiler only attaches representations to them by
//! index.
//!
//! [`DataSource`]: crate::source::DataSource

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Whether an item is compiled by page rules or asset rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Page,
    Asset,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Page => f.write_str("page"),
            ItemKind::Asset => f.write_str("asset"),
        }
    }
}

/// Raw or compiled content. Filters only ever see [`Content::Text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Binary(b) => b,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Binary(_))
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

/// Open-ended key → value metadata, in the order the source declared it.
///
/// Only a handful of keys carry meaning for routing (`filename`,
/// `extension`, `version`, `custom_path`); everything else is passed
/// through untouched to filters and templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(toml::Table);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    /// Scalar value rendered as a string. Integers, floats, booleans and
    /// datetimes are stringified; arrays and tables yield `None`.
    ///
    /// `version = 123` and `version = "123"` both read back as `"123"`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Datetime(d) => Some(d.to_string()),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(toml::Value::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &toml::Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: Metadata) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }
}

impl From<toml::Table> for Metadata {
    fn from(table: toml::Table) -> Self {
        Self(table)
    }
}

impl<K: Into<String>, V: Into<toml::Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Metadata::new();
        for (k, v) in iter {
            meta.insert(k, v);
        }
        meta
    }
}

/// A page or asset.
#[derive(Debug, Clone)]
pub struct Item {
    /// Slash-delimited identifier, e.g. `/about/`.
    pub identifier: String,
    pub kind: ItemKind,
    pub metadata: Metadata,
    pub content: Content,
    pub mtime: Option<SystemTime>,
    /// File the item was read from, when it came from disk.
    pub source_path: Option<PathBuf>,
}

impl Item {
    pub fn new(
        identifier: impl Into<String>,
        kind: ItemKind,
        metadata: Metadata,
        content: impl Into<Content>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            metadata,
            content: content.into(),
            mtime: None,
            source_path: None,
        }
    }

    pub fn page(identifier: impl Into<String>, metadata: Metadata, content: &str) -> Self {
        Self::new(identifier, ItemKind::Page, metadata, content)
    }

    pub fn asset(identifier: impl Into<String>, metadata: Metadata, content: Content) -> Self {
        Self::new(identifier, ItemKind::Asset, metadata, content)
    }
}

/// A layout template, applied late in a rep's action chain.
#[derive(Debug, Clone)]
pub struct Layout {
    pub identifier: String,
    pub metadata: Metadata,
    pub content: String,
    pub mtime: Option<SystemTime>,
}

impl Layout {
    pub fn new(identifier: impl Into<String>, metadata: Metadata, content: &str) -> Self {
        Self {
            identifier: identifier.into(),
            metadata,
            content: content.to_string(),
            mtime: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_string_stringifies_scalars() {
        let meta: Metadata = [("version", toml::Value::Integer(123))]
            .into_iter()
            .collect();
        assert_eq!(meta.get_string("version").as_deref(), Some("123"));
    }

    #[test]
    fn get_string_rejects_compound_values() {
        let mut meta = Metadata::new();
        meta.insert("tags", toml::Value::Array(vec!["a".into()]));
        assert_eq!(meta.get_string("tags"), None);
        assert_eq!(meta.get_string("missing"), None);
    }

    #[test]
    fn metadata_preserves_declaration_order() {
        let meta: Metadata = [("zeta", "1"), ("alpha", "2"), ("mid", "3")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = meta.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn merge_overrides_existing_keys() {
        let mut base: Metadata = [("title", "Old"), ("layout", "default")]
            .into_iter()
            .collect();
        base.merge([("title", "New")].into_iter().collect());
        assert_eq!(base.get_string("title").as_deref(), Some("New"));
        assert_eq!(base.get_string("layout").as_deref(), Some("default"));
    }

    #[test]
    fn binary_content_has_no_text_view() {
        let content = Content::Binary(vec![0x89, 0x50]);
        assert!(content.is_binary());
        assert_eq!(content.as_text(), None);
        assert_eq!(content.as_bytes(), &[0x89, 0x50]);
    }

    #[test]
    fn item_kind_displays_lowercase() {
        assert_eq!(ItemKind::Page.to_string(), "page");
        assert_eq!(ItemKind::Asset.to_string(), "asset");
    }
}
