//! Shared test utilities for the folio test suite.
//!
//! Provides item/layout constructors, in-memory and on-disk site setup, and
//! rep lookups that panic with the available options on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let site = site_in(tmp.path(), vec![page("/about/", "# About")], vec![]);
//! let mut compiler = Compiler::new(&site).with_rules(RuleSet::new());
//! compiler.prepare().unwrap();
//!
//! let rep = find_rep(&compiler, "/about/", "default");
//! assert_eq!(rep.path.as_deref(), Some("/about/index.html"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::compile::{Compiler, ItemRep};
use crate::config::SiteConfig;
use crate::site::Site;
use crate::types::{Content, Item, Layout, Metadata};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write a file under a site root, creating parent directories.
pub fn write_site_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A site rooted at `root` with default config and the given content.
pub fn site_in(root: &Path, items: Vec<Item>, layouts: Vec<Layout>) -> Site {
    Site::new(root, SiteConfig::default(), items, layouts)
}

// =========================================================================
// Item and layout constructors
// =========================================================================

fn meta(pairs: &[(&str, &str)]) -> Metadata {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

pub fn page(identifier: &str, content: &str) -> Item {
    Item::page(identifier, Metadata::new(), content)
}

pub fn page_with(identifier: &str, pairs: &[(&str, &str)], content: &str) -> Item {
    Item::page(identifier, meta(pairs), content)
}

/// A text asset with empty content.
pub fn asset_with(identifier: &str, pairs: &[(&str, &str)]) -> Item {
    Item::asset(identifier, meta(pairs), Content::Text(String::new()))
}

pub fn layout(identifier: &str, content: &str) -> Layout {
    Layout::new(identifier, Metadata::new(), content)
}

pub fn layout_with(identifier: &str, pairs: &[(&str, &str)], content: &str) -> Layout {
    Layout::new(identifier, meta(pairs), content)
}

// =========================================================================
// Rep lookups: panic with a clear message on miss
// =========================================================================

/// Find the rep `rep_name` of the item `identifier`. Panics if not found.
pub fn find_rep<'a>(compiler: &'a Compiler<'_>, identifier: &str, rep_name: &str) -> &'a ItemRep {
    compiler
        .reps_of(identifier)
        .into_iter()
        .find(|r| r.name == rep_name)
        .unwrap_or_else(|| {
            let available: Vec<String> = compiler
                .routes()
                .iter()
                .map(|r| format!("{} [{}]", r.identifier, r.rep))
                .collect();
            panic!("rep '{identifier} [{rep_name}]' not found. Available: {available:?}")
        })
}

/// All mapped web paths in discovery order.
pub fn rep_paths(compiler: &Compiler<'_>) -> Vec<String> {
    compiler.routes().into_iter().map(|r| r.path).collect()
}
