//! The rule registry.
//!
//! Rules decide which representations an item gets and how each one is
//! compiled. There are three independent, append-only lists:
//!
//! | List | Selects | Produces |
//! |------|---------|----------|
//! | page rules | pages by identifier | one rep per rep name, with an action |
//! | asset rules | assets by identifier | one rep per rep name, with an action |
//! | layout rules | layouts by identifier | the name of the filter that renders the layout |
//!
//! Lookups scan in registration order and the first match wins, so more
//! specific rules belong above catch-alls like `*`.
//!
//! Rules are usually loaded from the site's `Rules` file (see [`parser`]),
//! but can also be registered directly, which is what the tests do.

pub mod parser;

use crate::pattern::Pattern;
use crate::types::ItemKind;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name given to the representation an item gets when no rule names one.
pub const DEFAULT_REP: &str = "default";

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("no rules file found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{location}: {message}")]
    Source {
        location: SourceLocation,
        message: String,
    },
}

/// A position in a rule source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One step of a rule's action chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run the named filter over the current content.
    Filter(String),
    /// Render the layout with this identifier around the current content.
    Layout(String),
    /// Record the current content under a name.
    Snapshot(String),
}

/// Ordered steps run when compiling a rep. An empty action passes content
/// through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub steps: Vec<Step>,
}

impl Action {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn filter(mut self, name: &str) -> Self {
        self.steps.push(Step::Filter(name.to_string()));
        self
    }

    pub fn layout(mut self, identifier: &str) -> Self {
        self.steps.push(Step::Layout(identifier.to_string()));
        self
    }

    pub fn snapshot(mut self, name: &str) -> Self {
        self.steps.push(Step::Snapshot(name.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A page or asset compilation rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: ItemKind,
    pub pattern: Pattern,
    pub rep_name: String,
    pub action: Action,
    /// Where the rule was declared, when it came from a rule source.
    pub origin: Option<SourceLocation>,
}

/// Maps layouts to the filter that renders them.
#[derive(Debug, Clone)]
pub struct LayoutRule {
    pub pattern: Pattern,
    pub filter_name: String,
    pub origin: Option<SourceLocation>,
}

/// Outcome of a rule lookup. Absence is an ordinary result, not an error.
#[derive(Debug)]
pub enum RuleMatch<'a, R> {
    Matched(&'a R),
    NoMatch,
}

impl<'a, R> RuleMatch<'a, R> {
    pub fn matched(self) -> Option<&'a R> {
        match self {
            RuleMatch::Matched(rule) => Some(rule),
            RuleMatch::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, RuleMatch::Matched(_))
    }
}

/// All rules for a site, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    page_rules: Vec<Rule>,
    asset_rules: Vec<Rule>,
    layout_rules: Vec<LayoutRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a rule source file.
    ///
    /// A missing file is reported as [`RulesError::NotFound`]; problems inside
    /// the file carry the file and line they occurred on.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        if !path.is_file() {
            return Err(RulesError::NotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parser::parse(&source, path)
    }

    /// Append a page or asset rule.
    pub fn add_rule(&mut self, kind: ItemKind, pattern: &str, rep_name: &str, action: Action) {
        self.push_rule(Rule {
            kind,
            pattern: Pattern::compile(pattern),
            rep_name: rep_name.to_string(),
            action,
            origin: None,
        });
    }

    /// Append a layout-filter rule.
    pub fn add_layout_rule(&mut self, pattern: &str, filter_name: &str) {
        self.push_layout_rule(LayoutRule {
            pattern: Pattern::compile(pattern),
            filter_name: filter_name.to_string(),
            origin: None,
        });
    }

    pub(crate) fn push_rule(&mut self, rule: Rule) {
        match rule.kind {
            ItemKind::Page => self.page_rules.push(rule),
            ItemKind::Asset => self.asset_rules.push(rule),
        }
    }

    pub(crate) fn push_layout_rule(&mut self, rule: LayoutRule) {
        self.layout_rules.push(rule);
    }

    pub fn rules_for(&self, kind: ItemKind) -> &[Rule] {
        match kind {
            ItemKind::Page => &self.page_rules,
            ItemKind::Asset => &self.asset_rules,
        }
    }

    pub fn layout_rules(&self) -> &[LayoutRule] {
        &self.layout_rules
    }

    /// First rule of `kind` matching `identifier` and producing `rep_name`.
    pub fn find_rule(
        &self,
        kind: ItemKind,
        identifier: &str,
        rep_name: &str,
    ) -> RuleMatch<'_, Rule> {
        self.rules_for(kind)
            .iter()
            .find(|r| r.rep_name == rep_name && r.pattern.is_match(identifier))
            .map_or(RuleMatch::NoMatch, RuleMatch::Matched)
    }

    /// First layout rule matching `identifier`.
    pub fn find_layout_rule(&self, identifier: &str) -> RuleMatch<'_, LayoutRule> {
        self.layout_rules
            .iter()
            .find(|r| r.pattern.is_match(identifier))
            .map_or(RuleMatch::NoMatch, RuleMatch::Matched)
    }

    /// Distinct rep names declared by rules matching `identifier`, in
    /// registration order.
    pub fn rep_names_for(&self, kind: ItemKind, identifier: &str) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in self.rules_for(kind) {
            if rule.pattern.is_match(identifier) && !names.contains(&rule.rep_name.as_str()) {
                names.push(&rule.rep_name);
            }
        }
        names
    }
}
