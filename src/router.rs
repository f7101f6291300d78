//! Output path computation.
//!
//! Every representation gets a web path that is a pure function of the
//! item's identifier, kind and metadata, the rep name, and the site config.
//! The compiler joins that path onto the output directory to get the file it
//! writes.
//!
//! ## Pages
//!
//! ```text
//! identifier + filename [-rep] . extension
//! /foo/      + home     -raw   . htm        → /foo/home-raw.htm
//! ```
//!
//! `filename` and `extension` come from metadata and default to the first
//! configured index filename (`index.html`). A page's default rep with a
//! `custom_path` metadata value is written there instead.
//!
//! ## Assets
//!
//! ```text
//! assets_prefix + identifier [-v<version>] [-rep] [. extension]
//! /assets       + /logo      -v3           -raw   . png          → /assets/logo-v3-raw.png
//! ```
//!
//! Versions change the path on every bump, so assets can be served with
//! far-future cache headers.

use crate::config::SiteConfig;
use crate::rules::DEFAULT_REP;
use crate::types::{Item, ItemKind};
use std::collections::HashMap;

/// Web path of `item`'s representation named `rep_name`.
pub fn path_for(item: &Item, rep_name: &str, config: &SiteConfig) -> String {
    match item.kind {
        ItemKind::Page => page_path(item, rep_name, config),
        ItemKind::Asset => asset_path(item, rep_name, config),
    }
}

fn page_path(item: &Item, rep_name: &str, config: &SiteConfig) -> String {
    if rep_name == DEFAULT_REP
        && let Some(custom) = item.metadata.get_string("custom_path")
    {
        return custom;
    }

    let (default_filename, default_extension) = config.default_filename_and_extension();
    let filename = item
        .metadata
        .get_string("filename")
        .unwrap_or_else(|| default_filename.to_string());
    let extension = item
        .metadata
        .get_string("extension")
        .unwrap_or_else(|| default_extension.to_string());

    let mut path = item.identifier.clone();
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(&filename);
    push_rep_suffix(&mut path, rep_name);
    push_extension(&mut path, &extension);
    path
}

fn asset_path(item: &Item, rep_name: &str, config: &SiteConfig) -> String {
    let mut path = config.assets_prefix.trim_end_matches('/').to_string();
    let identifier = item.identifier.trim_end_matches('/');
    if !identifier.starts_with('/') {
        path.push('/');
    }
    path.push_str(identifier);

    if let Some(version) = item.metadata.get_string("version") {
        path.push_str("-v");
        path.push_str(&version);
    }
    push_rep_suffix(&mut path, rep_name);
    if let Some(extension) = item.metadata.get_string("extension") {
        push_extension(&mut path, &extension);
    }
    path
}

fn push_rep_suffix(path: &mut String, rep_name: &str) {
    if rep_name != DEFAULT_REP {
        path.push('-');
        path.push_str(rep_name);
    }
}

fn push_extension(path: &mut String, extension: &str) {
    if !extension.is_empty() {
        path.push('.');
        path.push_str(extension);
    }
}

/// Clean URL for a web path: a trailing index filename is dropped.
///
/// `/about/index.html` → `/about/`; `/about/home.htm` is unchanged.
pub fn url_for(path: &str, config: &SiteConfig) -> String {
    for index in &config.index_filenames {
        if let Some(dir) = path.strip_suffix(index.as_str())
            && dir.ends_with('/')
        {
            return dir.to_string();
        }
    }
    path.to_string()
}

/// Web paths of every mapped rep, keyed by item identifier and rep name.
///
/// When two items share an identifier, the first one registered keeps the
/// entry.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    paths: HashMap<(String, String), String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: &str, rep_name: &str, path: &str) {
        self.paths
            .entry((identifier.to_string(), rep_name.to_string()))
            .or_insert_with(|| path.to_string());
    }

    pub fn get(&self, identifier: &str, rep_name: &str) -> Option<&str> {
        self.paths
            .get(&(identifier.to_string(), rep_name.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, Metadata};

    fn prefixed(prefix: &str) -> SiteConfig {
        SiteConfig {
            assets_prefix: prefix.to_string(),
            ..SiteConfig::default()
        }
    }

    fn home_page() -> Item {
        let meta: Metadata = [
            ("filename", toml::Value::from("home")),
            ("extension", toml::Value::from("htm")),
            ("version", toml::Value::from(123)),
        ]
        .into_iter()
        .collect();
        Item::page("/foo/", meta, "some content")
    }

    fn png(version: Option<i64>) -> Item {
        let mut meta = Metadata::new();
        meta.insert("extension", "png");
        if let Some(v) = version {
            meta.insert("version", v);
        }
        Item::asset("/foo/", meta, Content::Binary(vec![]))
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn page_default_rep() {
        let config = SiteConfig::default();
        assert_eq!(path_for(&home_page(), "default", &config), "/foo/home.htm");
    }

    #[test]
    fn page_custom_rep() {
        let config = SiteConfig::default();
        assert_eq!(path_for(&home_page(), "raw", &config), "/foo/home-raw.htm");
    }

    #[test]
    fn page_ignores_version() {
        let config = prefixed("/imuhgez");
        assert!(!path_for(&home_page(), "default", &config).contains("v123"));
    }

    #[test]
    fn page_falls_back_to_index_filename() {
        let config = SiteConfig::default();
        let page = Item::page("/about/", Metadata::new(), "");
        assert_eq!(path_for(&page, "default", &config), "/about/index.html");
        assert_eq!(path_for(&page, "raw", &config), "/about/index-raw.html");

        let root = Item::page("/", Metadata::new(), "");
        assert_eq!(path_for(&root, "default", &config), "/index.html");
    }

    #[test]
    fn page_defaults_follow_first_index_filename() {
        let config = SiteConfig {
            index_filenames: vec!["default.htm".into(), "index.html".into()],
            ..SiteConfig::default()
        };
        let page = Item::page("/about/", Metadata::new(), "");
        assert_eq!(path_for(&page, "default", &config), "/about/default.htm");
    }

    #[test]
    fn page_custom_path_applies_to_default_rep_only() {
        let config = SiteConfig::default();
        let meta: Metadata = [("custom_path", "/feed.xml")].into_iter().collect();
        let page = Item::page("/feed/", meta, "");
        assert_eq!(path_for(&page, "default", &config), "/feed.xml");
        assert_eq!(path_for(&page, "raw", &config), "/feed/index-raw.html");
    }

    #[test]
    fn page_identifier_without_trailing_slash() {
        let config = SiteConfig::default();
        let page = Item::page("/about", Metadata::new(), "");
        assert_eq!(path_for(&page, "default", &config), "/about/index.html");
    }

    // =========================================================================
    // Assets
    // =========================================================================

    #[test]
    fn asset_default_rep_with_version() {
        let config = prefixed("/imuhgez");
        assert_eq!(path_for(&png(Some(123)), "default", &config), "/imuhgez/foo-v123.png");
    }

    #[test]
    fn asset_default_rep_without_version() {
        let config = prefixed("/imuhgez");
        assert_eq!(path_for(&png(None), "default", &config), "/imuhgez/foo.png");
    }

    #[test]
    fn asset_custom_rep_follows_version() {
        let config = prefixed("/imuhgez");
        assert_eq!(
            path_for(&png(Some(123)), "raw", &config),
            "/imuhgez/foo-v123-raw.png"
        );
    }

    #[test]
    fn asset_custom_rep_without_version() {
        let config = prefixed("/imuhgez");
        assert_eq!(path_for(&png(None), "raw", &config), "/imuhgez/foo-raw.png");
    }

    #[test]
    fn asset_without_extension() {
        let config = prefixed("/assets");
        let asset = Item::asset("/LICENSE/", Metadata::new(), Content::Text("MIT".into()));
        assert_eq!(path_for(&asset, "default", &config), "/assets/LICENSE");
    }

    #[test]
    fn asset_with_empty_or_slashed_prefix() {
        assert_eq!(path_for(&png(None), "default", &prefixed("")), "/foo.png");
        assert_eq!(
            path_for(&png(None), "default", &prefixed("/static/")),
            "/static/foo.png"
        );
    }

    #[test]
    fn path_for_is_deterministic() {
        let config = prefixed("/imuhgez");
        let asset = png(Some(7));
        assert_eq!(
            path_for(&asset, "thumb", &config),
            path_for(&asset, "thumb", &config)
        );
    }

    // =========================================================================
    // url_for()
    // =========================================================================

    #[test]
    fn url_strips_index_filename() {
        let config = SiteConfig::default();
        assert_eq!(url_for("/about/index.html", &config), "/about/");
        assert_eq!(url_for("/index.html", &config), "/");
    }

    #[test]
    fn url_keeps_other_filenames() {
        let config = SiteConfig::default();
        assert_eq!(url_for("/foo/home.htm", &config), "/foo/home.htm");
        assert_eq!(url_for("/foo/myindex.html", &config), "/foo/myindex.html");
        assert_eq!(url_for("/assets/logo.png", &config), "/assets/logo.png");
    }

    // =========================================================================
    // RouteTable
    // =========================================================================

    #[test]
    fn route_table_keeps_first_entry() {
        let mut routes = RouteTable::new();
        routes.insert("/about/", "default", "/about/index.html");
        routes.insert("/about/", "default", "/about/other.html");
        routes.insert("/about/", "raw", "/about/index-raw.html");

        assert_eq!(routes.len(), 2);
        assert_eq!(routes.get("/about/", "default"), Some("/about/index.html"));
        assert_eq!(routes.get("/about/", "raw"), Some("/about/index-raw.html"));
        assert_eq!(routes.get("/missing/", "default"), None);
    }
}
