//! A site: configuration plus everything its data source discovered.

use crate::config::{self, ConfigError, SiteConfig};
use crate::naming;
use crate::source::{DataSource, FilesystemSource, SourceError};
use crate::types::{Item, Layout};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Items and layouts are read once, when the site is built, and are not
/// touched again for the rest of the run.
#[derive(Debug, Clone)]
pub struct Site {
    root: PathBuf,
    pub config: SiteConfig,
    pub items: Vec<Item>,
    pub layouts: Vec<Layout>,
}

impl Site {
    /// Load `config.toml` from `root` and read content from the filesystem.
    pub fn load(root: &Path) -> Result<Self, SiteError> {
        let config = config::load_config(root)?;
        let source = FilesystemSource::new(root, &config);
        let items = source.items()?;
        let layouts = source.layouts()?;
        Ok(Self::new(root, config, items, layouts))
    }

    /// Build a site from any data source.
    pub fn from_source(
        root: &Path,
        config: SiteConfig,
        source: &dyn DataSource,
    ) -> Result<Self, SiteError> {
        let items = source.items()?;
        let layouts = source.layouts()?;
        Ok(Self::new(root, config, items, layouts))
    }

    pub fn new(root: &Path, config: SiteConfig, items: Vec<Item>, layouts: Vec<Layout>) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            items,
            layouts,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules_path(&self) -> PathBuf {
        self.root.join(&self.config.rules_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    /// First layout with this identifier.
    pub fn layout(&self, identifier: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.identifier == identifier)
    }

    /// The first item of the same kind one identifier level up.
    pub fn parent_of(&self, item: &Item) -> Option<&Item> {
        let parent = naming::parent_identifier(&item.identifier)?;
        self.items
            .iter()
            .find(|i| i.kind == item.kind && i.identifier == parent)
    }

    /// Items of the same kind one identifier level down, in discovery order.
    pub fn children_of(&self, item: &Item) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|i| {
                i.kind == item.kind
                    && naming::parent_identifier(&i.identifier) == Some(item.identifier.as_str())
            })
            .collect()
    }
}
