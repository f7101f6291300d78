//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every line leads with what was compiled (the item identifier and rep
//! name) and follows with where it went. Paths are web paths, not files on
//! disk, so the output reads the same whatever the output directory is.
//!
//! # Output Format
//!
//! ## Compile
//!
//! ```text
//! Rules: 2 page, 1 asset, 1 layout (site/Rules)
//! warning: 2 pages share the identifier /about/
//! /about/ [default] → /about/index.html (created)
//! /blog/first/ [source] → /blog/first/index-source.html (identical)
//!
//! Compiled 2 reps: 1 created, 0 updated, 1 identical
//! ```
//!
//! ## Routes
//!
//! ```text
//! page   /about/  default  /about/index.html
//! asset  /style/  default  /assets/style.css
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::compile::{CleanReport, CompileEvent, CompileSummary, Route};
use crate::types::ItemKind;

/// Plural suffix for a count.
fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn kind_plural(kind: ItemKind, n: usize) -> String {
    format!("{kind}{}", plural(n))
}

// ============================================================================
// Compile
// ============================================================================

/// Format a single compile event.
pub fn format_compile_event(event: &CompileEvent) -> Vec<String> {
    match event {
        CompileEvent::RulesLoaded {
            path,
            page_rules,
            asset_rules,
            layout_rules,
        } => {
            let counts = format!(
                "Rules: {} page, {} asset, {} layout",
                page_rules, asset_rules, layout_rules
            );
            match path {
                Some(p) => vec![format!("{} ({})", counts, p.display())],
                None => vec![counts],
            }
        }
        CompileEvent::DuplicateIdentifier {
            identifier,
            kind,
            count,
        } => vec![format!(
            "warning: {} {} share the identifier {}",
            count,
            kind_plural(*kind, *count),
            identifier
        )],
        CompileEvent::RepCompiled {
            identifier,
            rep,
            path,
            status,
        } => vec![format!(
            "{} [{}] \u{2192} {} ({})",
            identifier, rep, path, status
        )],
    }
}

/// Format the closing summary of a compile run.
pub fn format_summary(summary: &CompileSummary) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Compiled {} rep{}: {} created, {} updated, {} identical",
            summary.total(),
            plural(summary.total()),
            summary.created,
            summary.updated,
            summary.identical
        ),
    ]
}

pub fn print_summary(summary: &CompileSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Format the route table, one rep per line, with aligned columns.
pub fn format_routes(routes: &[Route]) -> Vec<String> {
    if routes.is_empty() {
        return vec!["No reps".to_string()];
    }

    let kind_width = routes
        .iter()
        .map(|r| r.kind.to_string().len())
        .max()
        .unwrap_or(0);
    let id_width = routes.iter().map(|r| r.identifier.len()).max().unwrap_or(0);
    let rep_width = routes.iter().map(|r| r.rep.len()).max().unwrap_or(0);

    routes
        .iter()
        .map(|r| {
            format!(
                "{:<kw$}  {:<iw$}  {:<rw$}  {}",
                r.kind.to_string(),
                r.identifier,
                r.rep,
                r.path,
                kw = kind_width,
                iw = id_width,
                rw = rep_width,
            )
        })
        .collect()
}

pub fn print_routes(routes: &[Route]) {
    for line in format_routes(routes) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean
// ============================================================================

/// Format the result of removing compiled files.
pub fn format_clean(report: &CleanReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .removed
        .iter()
        .map(|p| format!("removed {}", p.display()))
        .collect();
    lines.push(format!(
        "Removed {} file{}, {} already absent",
        report.removed.len(),
        plural(report.removed.len()),
        report.missing
    ));
    lines
}

pub fn print_clean(report: &CleanReport) {
    for line in format_clean(report) {
        println!("{}", line);
    }
}
