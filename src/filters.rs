//! Content filters.
//!
//! A filter is a named text → text transformation. Rules refer to filters by
//! name only; the name is looked up in a [`FilterRegistry`] when the step
//! runs, so a rule naming a filter that does not exist loads fine and fails
//! the first time it is applied.
//!
//! ## Built-in filters
//!
//! | Name | Effect |
//! |------|--------|
//! | `markdown` | CommonMark → HTML, with tables, strikethrough and footnotes |
//! | `template` | `{{ ... }}` substitution, see below |
//!
//! ## Template expressions
//!
//! | Expression | Value |
//! |------------|-------|
//! | `content` | the rep's content being laid out (layouts only) |
//! | `identifier` | the item's identifier |
//! | `rep` | the rep name |
//! | `path` | the rep's web path |
//! | `url` | the rep's clean URL |
//! | `item.<key>` | item metadata |
//! | `layout.<key>` | layout metadata (layouts only) |
//! | `parent` | the parent item's identifier |
//! | `parent.<key>` | parent item metadata |
//! | `children` | identifiers of the child items, space separated |
//! | `path_to <identifier> [rep]` | another rep's web path |
//!
//! An item's parent is the item of the same kind whose identifier is one
//! level up (`/blog/` for `/blog/first/`); its children are the items one
//! level down.
//!
//! Anything else, a missing key, or an unclosed `{{` is an error.

use crate::config::SiteConfig;
use crate::router::{self, RouteTable};
use crate::rules::DEFAULT_REP;
use crate::types::{Item, Layout, Metadata};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unknown filter `{0}`")]
    Unknown(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("{0}")]
    Failed(String),
}

/// Everything a filter may read about the rep it is transforming.
pub struct FilterContext<'a> {
    pub item: &'a Item,
    pub rep_name: &'a str,
    /// The rep's web path.
    pub path: &'a str,
    pub config: &'a SiteConfig,
    /// Paths of every rep in the run.
    pub routes: &'a RouteTable,
    /// Set while rendering a layout.
    pub layout: Option<&'a Layout>,
    /// The rep's content, set while rendering a layout. The filter input is
    /// the layout's own text in that case.
    pub content: Option<&'a str>,
    pub parent: Option<&'a Item>,
    pub children: Vec<&'a Item>,
}

impl FilterContext<'_> {
    pub fn url(&self) -> String {
        router::url_for(self.path, self.config)
    }
}

pub trait Filter {
    fn apply(&self, input: &str, ctx: &FilterContext<'_>) -> Result<String, FilterError>;
}

impl<F> Filter for F
where
    F: Fn(&str, &FilterContext<'_>) -> Result<String, FilterError>,
{
    fn apply(&self, input: &str, ctx: &FilterContext<'_>) -> Result<String, FilterError> {
        self(input, ctx)
    }
}

/// Name → filter lookup.
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// A registry holding `markdown` and `template`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("markdown", MarkdownFilter);
        registry.register("template", TemplateFilter);
        registry
    }

    /// Register a filter, replacing any filter already using the name.
    pub fn register(&mut self, name: &str, filter: impl Filter + 'static) {
        self.filters.insert(name.to_string(), Box::new(filter));
    }

    /// Register a closure as a filter.
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&str, &FilterContext<'_>) -> Result<String, FilterError> + 'static,
    {
        self.register(name, f);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up `name` and run it.
    pub fn invoke(
        &self,
        name: &str,
        input: &str,
        ctx: &FilterContext<'_>,
    ) -> Result<String, FilterError> {
        let filter = self
            .get(name)
            .ok_or_else(|| FilterError::Unknown(name.to_string()))?;
        filter.apply(input, ctx)
    }
}

pub struct MarkdownFilter;

impl Filter for MarkdownFilter {
    fn apply(&self, input: &str, _ctx: &FilterContext<'_>) -> Result<String, FilterError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(input, options);
        let mut html = String::with_capacity(input.len() * 3 / 2);
        md_html::push_html(&mut html, parser);
        Ok(html)
    }
}

pub struct TemplateFilter;

impl Filter for TemplateFilter {
    fn apply(&self, input: &str, ctx: &FilterContext<'_>) -> Result<String, FilterError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| FilterError::Template("unclosed `{{`".into()))?;
            out.push_str(&evaluate(after[..end].trim(), ctx)?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        Ok(out)
    }
}

fn evaluate(expr: &str, ctx: &FilterContext<'_>) -> Result<String, FilterError> {
    let words: Vec<&str> = expr.split_whitespace().collect();
    match words.as_slice() {
        ["content"] => ctx.content.map(str::to_string).ok_or_else(|| {
            FilterError::Template("`content` is only available inside a layout".into())
        }),
        ["identifier"] => Ok(ctx.item.identifier.clone()),
        ["rep"] => Ok(ctx.rep_name.to_string()),
        ["path"] => Ok(ctx.path.to_string()),
        ["url"] => Ok(ctx.url()),
        ["parent"] => parent(ctx).map(|p| p.identifier.clone()),
        ["children"] => {
            let identifiers: Vec<&str> =
                ctx.children.iter().map(|c| c.identifier.as_str()).collect();
            Ok(identifiers.join(" "))
        }
        ["path_to", identifier] => path_to(ctx, identifier, DEFAULT_REP),
        ["path_to", identifier, rep] => path_to(ctx, identifier, rep),
        [single] => {
            if let Some(key) = single.strip_prefix("item.") {
                metadata_value(&ctx.item.metadata, "item", key)
            } else if let Some(key) = single.strip_prefix("parent.") {
                metadata_value(&parent(ctx)?.metadata, "parent", key)
            } else if let Some(key) = single.strip_prefix("layout.") {
                let layout = ctx.layout.ok_or_else(|| {
                    FilterError::Template("`layout.*` is only available inside a layout".into())
                })?;
                metadata_value(&layout.metadata, "layout", key)
            } else {
                Err(unknown(expr))
            }
        }
        _ => Err(unknown(expr)),
    }
}

fn parent<'a>(ctx: &FilterContext<'a>) -> Result<&'a Item, FilterError> {
    ctx.parent.ok_or_else(|| {
        FilterError::Template(format!("`{}` has no parent item", ctx.item.identifier))
    })
}

fn path_to(ctx: &FilterContext<'_>, identifier: &str, rep: &str) -> Result<String, FilterError> {
    ctx.routes
        .get(identifier, rep)
        .map(str::to_string)
        .ok_or_else(|| FilterError::Template(format!("no rep `{rep}` for `{identifier}`")))
}

fn metadata_value(meta: &Metadata, owner: &str, key: &str) -> Result<String, FilterError> {
    meta.get_string(key)
        .ok_or_else(|| FilterError::Template(format!("{owner} has no metadata `{key}`")))
}

fn unknown(expr: &str) -> FilterError {
    FilterError::Template(format!("unknown expression `{expr}`"))
}
