//! Compilation of a site into its output directory.
//!
//! A run goes through five steps, each finishing for every item before the
//! next one starts:
//!
//! ```text
//! 1. load rules      Rules file → RuleSet (skipped when rules were supplied)
//! 2. take items      the Site's items and layouts, read once
//! 3. build reps      one rep per distinct rep name of the matching rules,
//!                    or a single pass-through `default` rep
//! 4. map reps        router → web path → file under output_dir
//! 5. compile reps    run each rep's action, record snapshots, write `post`
//! ```
//!
//! Every rep is mapped before any rep is compiled, so a filter can ask for
//! the path of any other rep (see `path_to` in the template filter).
//!
//! ## Snapshots
//!
//! | Name | Content |
//! |------|---------|
//! | `raw` | the item's content before any step |
//! | (named) | the content at each `snapshot` step |
//! | `pre` | the content right before the first layout, or after the last step when no layout is applied |
//! | `post` | the final content; this is what is written to disk |
//!
//! ## Failure policy
//!
//! The run stops at the first error. A rule that names an unknown filter,
//! an unknown layout, a layout with no matching layout rule, and a filter
//! applied to binary content are all errors, reported with the item, the rep
//! and the rule's location in the Rules file. Output already written stays
//! in place.

use crate::filters::{FilterContext, FilterError, FilterRegistry};
use crate::router::{self, RouteTable};
use crate::rules::{DEFAULT_REP, Rule, RuleMatch, RuleSet, RulesError, SourceLocation, Step};
use crate::site::Site;
use crate::types::{Content, Item, ItemKind, Layout};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Which rep failed, and under which rule.
#[derive(Debug, Clone)]
pub struct RepContext {
    pub identifier: String,
    pub rep_name: String,
    pub origin: Option<SourceLocation>,
}

impl fmt::Display for RepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.identifier, self.rep_name)?;
        if let Some(origin) = &self.origin {
            write!(f, " (rule at {origin})")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),
    #[error("{context}: {source}")]
    Filter {
        context: RepContext,
        source: FilterError,
    },
    #[error("{context}: layout filter `{filter}` failed for `{layout}`: {source}")]
    LayoutFilter {
        context: RepContext,
        layout: String,
        filter: String,
        source: FilterError,
    },
    #[error("{context}: unknown layout `{layout}`")]
    UnknownLayout { context: RepContext, layout: String },
    #[error("{context}: no layout rule matches `{layout}`")]
    NoLayoutFilter { context: RepContext, layout: String },
    #[error("{context}: `{step}` cannot be applied to binary content")]
    BinaryContent { context: RepContext, step: String },
    #[error("{context}: path `{path}` leaves the output directory")]
    OutsideOutput { context: RepContext, path: String },
    #[error("No rep at index {0}")]
    NoSuchRep(usize),
    #[error("IO error writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error removing {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A named checkpoint of a rep's content.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub name: String,
    pub content: Content,
}

impl Snapshot {
    fn new(name: &str, content: Content) -> Self {
        Self {
            name: name.to_string(),
            content,
        }
    }
}

/// One named output of an item.
#[derive(Debug, Clone)]
pub struct ItemRep {
    /// Index of the owning item in [`Site::items`].
    pub item: usize,
    pub name: String,
    /// Web path, set by [`Compiler::map_rep`].
    pub path: Option<String>,
    /// File under the output directory, set with `path`.
    pub raw_path: Option<PathBuf>,
    /// Filled by [`Compiler::compile_rep`].
    pub snapshots: Vec<Snapshot>,
}

impl ItemRep {
    pub fn new(item: usize, name: &str) -> Self {
        Self {
            item,
            name: name.to_string(),
            path: None,
            raw_path: None,
            snapshots: Vec::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_REP
    }

    /// First snapshot with this name.
    pub fn snapshot(&self, name: &str) -> Option<&Content> {
        self.snapshots
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.content)
    }

    /// The final content, once compiled.
    pub fn content(&self) -> Option<&Content> {
        self.snapshots.last().map(|s| &s.content)
    }
}

/// What writing a rep's output did to the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
    Identical,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteStatus::Created => "created",
            WriteStatus::Updated => "updated",
            WriteStatus::Identical => "identical",
        })
    }
}

/// Progress reported while compiling.
#[derive(Debug, Clone)]
pub enum CompileEvent {
    RulesLoaded {
        path: Option<PathBuf>,
        page_rules: usize,
        asset_rules: usize,
        layout_rules: usize,
    },
    DuplicateIdentifier {
        identifier: String,
        kind: ItemKind,
        count: usize,
    },
    RepCompiled {
        identifier: String,
        rep: String,
        path: String,
        status: WriteStatus,
    },
}

/// Reps written by a run, by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub created: usize,
    pub updated: usize,
    pub identical: usize,
}

impl CompileSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.identical
    }

    fn record(&mut self, status: WriteStatus) {
        match status {
            WriteStatus::Created => self.created += 1,
            WriteStatus::Updated => self.updated += 1,
            WriteStatus::Identical => self.identical += 1,
        }
    }
}

/// Files removed by [`Compiler::clean`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    /// Output files that were already gone.
    pub missing: usize,
}

/// A mapped rep, as listed by `folio routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub identifier: String,
    pub kind: ItemKind,
    pub rep: String,
    pub path: String,
    pub raw_path: PathBuf,
}

pub struct Compiler<'a> {
    site: &'a Site,
    rules: Option<RuleSet>,
    filters: FilterRegistry,
    reps: Vec<ItemRep>,
    routes: RouteTable,
    prepared: bool,
    events: Option<Sender<CompileEvent>>,
}

impl<'a> Compiler<'a> {
    /// A compiler with the built-in filters that loads the site's Rules file.
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            rules: None,
            filters: FilterRegistry::with_builtins(),
            reps: Vec::new(),
            routes: RouteTable::new(),
            prepared: false,
            events: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Use these rules instead of reading the Rules file.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_events(mut self, events: Sender<CompileEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn rules(&self) -> Option<&RuleSet> {
        self.rules.as_ref()
    }

    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// All reps built so far, in discovery order.
    pub fn reps(&self) -> &[ItemRep] {
        &self.reps
    }

    /// Reps of the first item with this identifier.
    pub fn reps_of(&self, identifier: &str) -> Vec<&ItemRep> {
        match self.site.items.iter().position(|i| i.identifier == identifier) {
            Some(index) => self.reps.iter().filter(|r| r.item == index).collect(),
            None => Vec::new(),
        }
    }

    /// Read the Rules file unless rules were supplied or already loaded.
    pub fn load_rules(&mut self) -> Result<(), CompileError> {
        let path = if self.rules.is_none() {
            let path = self.site.rules_path();
            self.rules = Some(RuleSet::load(&path)?);
            Some(path)
        } else {
            None
        };

        if let Some(rules) = &self.rules {
            self.emit(CompileEvent::RulesLoaded {
                path,
                page_rules: rules.rules_for(ItemKind::Page).len(),
                asset_rules: rules.rules_for(ItemKind::Asset).len(),
                layout_rules: rules.layout_rules().len(),
            });
        }
        Ok(())
    }

    /// Load rules, then build and map every rep without compiling anything.
    ///
    /// Calling it again after it succeeded does nothing.
    pub fn prepare(&mut self) -> Result<(), CompileError> {
        if self.prepared {
            return Ok(());
        }
        self.load_rules()?;
        self.report_duplicates();

        let mut reps: Vec<ItemRep> = (0..self.site.items.len())
            .flat_map(|index| self.build_reps_for(index))
            .collect();
        for rep in &mut reps {
            self.map_rep(rep)?;
        }
        self.reps = reps;
        self.prepared = true;
        Ok(())
    }

    /// Compile every rep in discovery order and write the results.
    pub fn run(&mut self) -> Result<CompileSummary, CompileError> {
        self.prepare()?;

        let mut summary = CompileSummary::default();
        for index in 0..self.reps.len() {
            let status = self.compile_rep(index)?;
            summary.record(status);

            let rep = &self.reps[index];
            self.emit(CompileEvent::RepCompiled {
                identifier: self.site.items[rep.item].identifier.clone(),
                rep: rep.name.clone(),
                path: rep.path.clone().unwrap_or_default(),
                status,
            });
        }
        Ok(summary)
    }

    /// Reps for the item at `index`: one per distinct rep name declared by
    /// a matching rule, or a single `default` rep when no rule matches.
    pub fn build_reps_for(&self, index: usize) -> Vec<ItemRep> {
        let item = &self.site.items[index];
        let names = self
            .rules
            .as_ref()
            .map(|rules| rules.rep_names_for(item.kind, &item.identifier))
            .unwrap_or_default();

        if names.is_empty() {
            vec![ItemRep::new(index, DEFAULT_REP)]
        } else {
            names
                .into_iter()
                .map(|name| ItemRep::new(index, name))
                .collect()
        }
    }

    /// Assign the rep's web path and output file. A rep keeps the path it was
    /// first given.
    ///
    /// Fails when the path would put the file outside the output directory.
    pub fn map_rep(&mut self, rep: &mut ItemRep) -> Result<(), CompileError> {
        if rep.raw_path.is_some() {
            return Ok(());
        }
        let (path, raw_path) = self.route(rep.item, &rep.name)?;
        rep.path = Some(path);
        rep.raw_path = Some(raw_path);
        Ok(())
    }

    /// Run the action of the rep at `index`, record its snapshots, and write
    /// its final content to disk. Reps are built and mapped first if that has
    /// not happened yet.
    pub fn compile_rep(&mut self, index: usize) -> Result<WriteStatus, CompileError> {
        self.prepare()?;
        let raw_path = self.mapped_raw_path(index)?;
        let snapshots = self.run_action(&self.reps[index])?;
        let rep = &mut self.reps[index];
        rep.snapshots = snapshots;

        let bytes = rep.content().map(Content::as_bytes).unwrap_or_default();
        write_output(&raw_path, bytes)
    }

    /// Delete every rep's output file. A file shared by several reps is
    /// removed once, and files that are already gone are only counted.
    pub fn clean(&mut self) -> Result<CleanReport, CompileError> {
        self.prepare()?;

        let mut report = CleanReport::default();
        let mut seen = HashSet::new();
        for raw_path in self.reps.iter().filter_map(|r| r.raw_path.as_ref()) {
            if !seen.insert(raw_path) {
                continue;
            }
            match fs::remove_file(raw_path) {
                Ok(()) => report.removed.push(raw_path.clone()),
                Err(e) if e.kind() == ErrorKind::NotFound => report.missing += 1,
                Err(source) => {
                    return Err(CompileError::Remove {
                        path: raw_path.clone(),
                        source,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Name of the filter that renders `layout`, if any layout rule matches.
    pub fn filter_name_for_layout(&self, layout: &Layout) -> Option<&str> {
        self.rules
            .as_ref()?
            .find_layout_rule(&layout.identifier)
            .matched()
            .map(|rule| rule.filter_name.as_str())
    }

    /// Every mapped rep, in discovery order.
    pub fn routes(&self) -> Vec<Route> {
        self.reps
            .iter()
            .filter_map(|rep| {
                let item = &self.site.items[rep.item];
                Some(Route {
                    identifier: item.identifier.clone(),
                    kind: item.kind,
                    rep: rep.name.clone(),
                    path: rep.path.clone()?,
                    raw_path: rep.raw_path.clone()?,
                })
            })
            .collect()
    }

    /// Compute a rep's web path and output file and record it in the route
    /// table.
    fn route(
        &mut self,
        item_index: usize,
        rep_name: &str,
    ) -> Result<(String, PathBuf), CompileError> {
        let site = self.site;
        let item = &site.items[item_index];
        let path = router::path_for(item, rep_name, &site.config);
        let raw_path = output_file(&site.output_dir(), &path).ok_or_else(|| {
            CompileError::OutsideOutput {
                context: self.rep_context(item, rep_name),
                path: path.clone(),
            }
        })?;
        self.routes.insert(&item.identifier, rep_name, &path);
        Ok((path, raw_path))
    }

    fn mapped_raw_path(&mut self, index: usize) -> Result<PathBuf, CompileError> {
        let rep = self.reps.get(index).ok_or(CompileError::NoSuchRep(index))?;
        if let Some(raw_path) = &rep.raw_path {
            return Ok(raw_path.clone());
        }
        let (item, name) = (rep.item, rep.name.clone());
        let (path, raw_path) = self.route(item, &name)?;
        let rep = &mut self.reps[index];
        rep.path = Some(path);
        rep.raw_path = Some(raw_path.clone());
        Ok(raw_path)
    }

    fn rep_context(&self, item: &Item, rep_name: &str) -> RepContext {
        RepContext {
            identifier: item.identifier.clone(),
            rep_name: rep_name.to_string(),
            origin: self
                .governing_rule(item, rep_name)
                .matched()
                .and_then(|rule| rule.origin.clone()),
        }
    }

    fn governing_rule(&self, item: &Item, rep_name: &str) -> RuleMatch<'_, Rule> {
        match &self.rules {
            Some(rules) => rules.find_rule(item.kind, &item.identifier, rep_name),
            None => RuleMatch::NoMatch,
        }
    }

    fn run_action(&self, rep: &ItemRep) -> Result<Vec<Snapshot>, CompileError> {
        let item = &self.site.items[rep.item];
        let path = rep.path.as_deref().unwrap_or_default();
        let (steps, origin): (&[Step], _) = match self.governing_rule(item, &rep.name) {
            RuleMatch::Matched(rule) => (rule.action.steps.as_slice(), rule.origin.clone()),
            RuleMatch::NoMatch => (&[], None),
        };
        let context = || RepContext {
            identifier: item.identifier.clone(),
            rep_name: rep.name.clone(),
            origin: origin.clone(),
        };

        let mut content = item.content.clone();
        let mut snapshots = vec![Snapshot::new("raw", content.clone())];
        let mut pre_taken = false;

        for step in steps {
            match step {
                Step::Filter(name) => {
                    let text = content.as_text().ok_or_else(|| CompileError::BinaryContent {
                        context: context(),
                        step: format!("filter {name}"),
                    })?;
                    let ctx = self.filter_context(item, &rep.name, path, None, None);
                    let output = self.filters.invoke(name, text, &ctx).map_err(|source| {
                        CompileError::Filter {
                            context: context(),
                            source,
                        }
                    })?;
                    content = Content::Text(output);
                }
                Step::Snapshot(name) => {
                    snapshots.push(Snapshot::new(name, content.clone()));
                }
                Step::Layout(identifier) => {
                    if !pre_taken {
                        snapshots.push(Snapshot::new("pre", content.clone()));
                        pre_taken = true;
                    }
                    let layout =
                        self.site
                            .layout(identifier)
                            .ok_or_else(|| CompileError::UnknownLayout {
                                context: context(),
                                layout: identifier.clone(),
                            })?;
                    let filter = self.filter_name_for_layout(layout).ok_or_else(|| {
                        CompileError::NoLayoutFilter {
                            context: context(),
                            layout: identifier.clone(),
                        }
                    })?;
                    let text = content.as_text().ok_or_else(|| CompileError::BinaryContent {
                        context: context(),
                        step: format!("layout {identifier}"),
                    })?;
                    let ctx = self.filter_context(item, &rep.name, path, Some(layout), Some(text));
                    let output = self
                        .filters
                        .invoke(filter, &layout.content, &ctx)
                        .map_err(|source| CompileError::LayoutFilter {
                            context: context(),
                            layout: identifier.clone(),
                            filter: filter.to_string(),
                            source,
                        })?;
                    content = Content::Text(output);
                }
            }
        }

        if !pre_taken {
            snapshots.push(Snapshot::new("pre", content.clone()));
        }
        snapshots.push(Snapshot::new("post", content));
        Ok(snapshots)
    }

    fn filter_context<'c>(
        &'c self,
        item: &'c Item,
        rep_name: &'c str,
        path: &'c str,
        layout: Option<&'c Layout>,
        content: Option<&'c str>,
    ) -> FilterContext<'c> {
        FilterContext {
            item,
            rep_name,
            path,
            config: &self.site.config,
            routes: &self.routes,
            layout,
            content,
            parent: self.site.parent_of(item),
            children: self.site.children_of(item),
        }
    }

    fn report_duplicates(&self) {
        let mut counts: HashMap<(&str, ItemKind), usize> = HashMap::new();
        let mut order = Vec::new();
        for item in &self.site.items {
            let key = (item.identifier.as_str(), item.kind);
            let count = counts.entry(key).or_insert(0);
            if *count == 1 {
                order.push(key);
            }
            *count += 1;
        }
        for key in order {
            self.emit(CompileEvent::DuplicateIdentifier {
                identifier: key.0.to_string(),
                kind: key.1,
                count: counts[&key],
            });
        }
    }

    fn emit(&self, event: CompileEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}

/// The file a web path is written to, or `None` when the path climbs out of
/// `output_dir`.
fn output_file(output_dir: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| output_dir.join(relative))
}

/// Write `bytes` to `path`, creating parent directories. An existing file
/// with the same bytes is left untouched.
fn write_output(path: &Path, bytes: &[u8]) -> Result<WriteStatus, CompileError> {
    let io_err = |source| CompileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let status = match fs::read(path) {
        Ok(existing) if existing == bytes => return Ok(WriteStatus::Identical),
        Ok(_) => WriteStatus::Updated,
        Err(_) => WriteStatus::Created,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)?;
    Ok(status)
}
