//! Item and layout sources.
//!
//! The compiler never reads files itself; it asks a [`DataSource`] for the
//! site's items and layouts exactly once per run. [`FilesystemSource`] is the
//! implementation used by the CLI.
//!
//! ## Directory Structure
//!
//! ```text
//! site/
//! ├── config.toml               # Site configuration (optional)
//! ├── Rules                     # Rule source
//! ├── content/                  # Pages
//! │   ├── index.md              # → /
//! │   ├── about.md              # → /about/
//! │   └── blog/
//! │       ├── index.md          # → /blog/
//! │       └── first-post.md     # → /blog/first-post/
//! ├── layouts/
//! │   └── default.html          # → /default/
//! └── assets/
//!     ├── style.css             # → /style/          (text)
//!     ├── logo.png              # → /logo/           (binary)
//!     └── logo.toml             # sidecar metadata for logo.png
//! ```
//!
//! Pages and layouts may open with `---` fenced TOML front matter. Assets get
//! an `extension` metadata value from their filename unless their sidecar
//! sets one. A page with `is_draft = true` is skipped.
//!
//! Hidden files and directories (leading `.`) are ignored. Every directory is
//! walked in sorted order so discovery order is stable across runs.

use crate::config::SiteConfig;
use crate::metadata::{self, SidecarError};
use crate::naming::{self, IndexHandling};
use crate::types::{Content, Item, ItemKind, Layout, Metadata};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid sidecar metadata for {}: {source}", .path.display())]
    Sidecar {
        path: PathBuf,
        source: SidecarError,
    },
}

/// Supplies a site's items and layouts.
pub trait DataSource {
    /// All items, pages first, in discovery order.
    fn items(&self) -> Result<Vec<Item>, SourceError>;

    /// All layouts, in discovery order.
    fn layouts(&self) -> Result<Vec<Layout>, SourceError>;
}

/// Reads a site laid out on disk (see the module docs).
pub struct FilesystemSource<'a> {
    root: &'a Path,
    config: &'a SiteConfig,
}

impl<'a> FilesystemSource<'a> {
    pub fn new(root: &'a Path, config: &'a SiteConfig) -> Self {
        Self { root, config }
    }

    fn pages(&self) -> Result<Vec<Item>, SourceError> {
        let dir = self.root.join(&self.config.sources.content_dir);
        let mut pages = Vec::new();

        for path in collect_files(&dir)? {
            let rel = path.strip_prefix(&dir).unwrap_or(&path);
            let identifier = naming::identifier_for(rel, IndexHandling::Collapse);

            let (metadata, content) = match self.read_content(&path)? {
                Content::Text(text) => {
                    let (metadata, body) =
                        metadata::parse_front_matter(&text).map_err(|source| {
                            SourceError::FrontMatter {
                                path: path.clone(),
                                source,
                            }
                        })?;
                    (metadata, Content::Text(body.to_string()))
                }
                binary => (Metadata::new(), binary),
            };

            if metadata.get_bool("is_draft") == Some(true) {
                continue;
            }

            let mut item = Item::new(identifier, ItemKind::Page, metadata, content);
            item.mtime = modified(&path);
            item.source_path = Some(path);
            pages.push(item);
        }

        Ok(pages)
    }

    fn assets(&self) -> Result<Vec<Item>, SourceError> {
        let dir = self.root.join(&self.config.sources.assets_dir);
        let files = collect_files(&dir)?;

        // A .toml file that sits next to another file with the same stem is
        // that file's metadata, not an asset.
        let sidecars: HashSet<PathBuf> = files
            .iter()
            .filter(|p| p.extension().is_none_or(|e| e != "toml"))
            .map(|p| metadata::sidecar_path(p))
            .collect();

        let mut assets = Vec::new();
        for path in files.into_iter().filter(|p| !sidecars.contains(p)) {
            let rel = path.strip_prefix(&dir).unwrap_or(&path);
            let identifier = naming::identifier_for(rel, IndexHandling::Keep);

            let mut metadata = metadata::read_sidecar(&path)
                .map_err(|source| SourceError::Sidecar {
                    path: path.clone(),
                    source,
                })?
                .unwrap_or_default();
            if !metadata.contains_key("extension")
                && let Some(ext) = naming::full_extension(&path)
            {
                metadata.insert("extension", ext);
            }

            let content = self.read_content(&path)?;

            let mut item = Item::new(identifier, ItemKind::Asset, metadata, content);
            item.mtime = modified(&path);
            item.source_path = Some(path);
            assets.push(item);
        }

        Ok(assets)
    }

    /// Text when the extension says so and the bytes are valid UTF-8,
    /// binary otherwise.
    fn read_content(&self, path: &Path) -> Result<Content, SourceError> {
        let bytes = read_bytes(path)?;
        if !self.is_text(path) {
            return Ok(Content::Binary(bytes));
        }
        Ok(match String::from_utf8(bytes) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Binary(e.into_bytes()),
        })
    }

    fn is_text(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => self.config.is_text_extension(&ext.to_string_lossy()),
            // Extensionless files are treated as text
            None => true,
        }
    }
}

impl DataSource for FilesystemSource<'_> {
    fn items(&self) -> Result<Vec<Item>, SourceError> {
        let mut items = self.pages()?;
        items.extend(self.assets()?);
        Ok(items)
    }

    fn layouts(&self) -> Result<Vec<Layout>, SourceError> {
        let dir = self.root.join(&self.config.sources.layouts_dir);
        let mut layouts = Vec::new();

        for path in collect_files(&dir)? {
            let rel = path.strip_prefix(&dir).unwrap_or(&path);
            let text = read_text(&path)?;
            let (metadata, body) =
                metadata::parse_front_matter(&text).map_err(|source| SourceError::FrontMatter {
                    path: path.clone(),
                    source,
                })?;
            let mut layout = Layout::new(
                naming::identifier_for(rel, IndexHandling::Collapse),
                metadata,
                body,
            );
            layout.mtime = modified(&path);
            layouts.push(layout);
        }

        Ok(layouts)
    }
}

/// Every non-hidden file under `dir`, sorted. A missing directory has no files.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_text(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, SourceError> {
    fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
