//! # Folio
//!
//! A rule-driven content compiler. A site is a directory of pages, assets and
//! layouts; a `Rules` file decides which representations ("reps") each item
//! gets and how each one is built; the compiler writes every rep to a path
//! computed by the router.
//!
//! # Architecture: Rule-Driven Pipeline
//!
//! ```text
//! 1. Load     config.toml + content/ layouts/ assets/  →  Site
//! 2. Rules    Rules                                    →  RuleSet
//! 3. Build    Site × RuleSet                           →  reps
//! 4. Map      reps                                     →  paths (router)
//! 5. Compile  reps × filters × layouts                 →  output/
//! ```
//!
//! Mapping finishes for every rep before compiling starts, so any filter can
//! refer to the path of any other rep. Compilation is sequential and stops at
//! the first error.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pattern`] | Glob-like identifier patterns (`/blog/*`) compiled to anchored regexes |
//! | [`rules`] | Ordered page, asset and layout rules; first match wins. [`rules::parser`] reads the `Rules` file |
//! | [`router`] | Pure output-path computation for a rep |
//! | [`compile`] | The orchestrator: builds, maps and compiles reps, writes output |
//! | [`filters`] | Filter trait and registry with the built-in `markdown` and `template` filters |
//! | [`site`] | A loaded site: config plus items and layouts |
//! | [`source`] | The `DataSource` seam and its filesystem implementation |
//! | [`metadata`] | Front matter and sidecar metadata parsing |
//! | [`naming`] | Identifier derivation from source paths |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Items, layouts, content and metadata |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## A Rules File, Not a Script
//!
//! Rules are declared in a small line-oriented language rather than
//! evaluated as code. Every rule keeps the file and line it came from, so a
//! failing filter three steps into a compile still points the operator at
//! the line that asked for it.
//!
//! ## Explicit Fallback
//!
//! Rule lookups return [`rules::RuleMatch`], never a bare `Option`. An item no
//! rule matches still gets a `default` rep that copies its content through;
//! that branch is spelled out in the compiler instead of hiding in an
//! `unwrap_or`.
//!
//! ## Resolve Now, Fail Later
//!
//! Filter names in rules are not checked when rules load. A misspelt filter
//! only fails a compile if a rep actually runs it.

pub mod compile;
pub mod config;
pub mod filters;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pattern;
pub mod router;
pub mod rules;
pub mod site;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
