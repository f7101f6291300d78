//! Identifier derivation from source file paths.
//!
//! Identifiers are slash-delimited and always start and end with `/`. The
//! file extension never takes part; it is a property of the source file, not
//! of the content it holds.
//!
//! ## Pages and layouts
//!
//! A file named `index.*` stands for its directory:
//!
//! - `index.md` → `/`
//! - `about.md` → `/about/`
//! - `about/index.md` → `/about/`
//! - `blog/2024/hello.md` → `/blog/2024/hello/`
//!
//! Note that `about.md` and `about/index.md` produce the same identifier.
//! Both are kept; see the compiler's handling of duplicate identifiers.
//!
//! ## Assets
//!
//! Assets keep their name even when it is `index`, because an asset at
//! `index.css` and a directory of assets are different things:
//!
//! - `style.css` → `/style/`
//! - `images/logo.png` → `/images/logo/`
//! - `fonts/index.woff2` → `/fonts/index/`

use std::path::{Component, Path};

/// How the final path component is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHandling {
    /// `dir/index.ext` becomes `/dir/`.
    Collapse,
    /// `dir/index.ext` becomes `/dir/index/`.
    Keep,
}

/// Derive an identifier from a path relative to a source directory.
pub fn identifier_for(relative: &Path, index: IndexHandling) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.pop() {
        let stem = match last.split_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => last,
        };
        if !(index == IndexHandling::Collapse && stem == "index") {
            segments.push(stem);
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Identifier one level up: `/blog/first/` → `/blog/`. The root has none.
pub fn parent_identifier(identifier: &str) -> Option<&str> {
    let trimmed = identifier.strip_suffix('/')?;
    if trimmed.is_empty() {
        return None;
    }
    let cut = trimmed.rfind('/')?;
    Some(&identifier[..=cut])
}

/// The file extension as it appears after the first dot of the filename,
/// so `app.min.js` yields `min.js`.
pub fn full_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    match name.split_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}
