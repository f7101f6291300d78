//! Parser for the `Rules` file.
//!
//! The rule source is a line-oriented script. It never executes code; each
//! directive registers a rule, and every rule remembers the line it was
//! declared on so later failures can point back into the file.
//!
//! ```text
//! # Pages with a raw twin
//! page '/blog/*' rep raw
//! end
//!
//! page '*'
//!   filter markdown
//!   snapshot body
//!   layout '/default/'
//! end
//!
//! asset '*'
//! end
//!
//! layout '*' template
//! ```
//!
//! | Directive | Where | Arguments |
//! |-----------|-------|-----------|
//! | `page`, `asset` | top level | pattern, optional `rep <name>`; opens a block |
//! | `filter` | in a block | filter name |
//! | `layout` | in a block | layout identifier |
//! | `snapshot` | in a block | snapshot name |
//! | `end` | in a block | none; closes it |
//! | `layout` | top level | pattern, filter name |
//!
//! Arguments are bare words or quoted with `'` or `"`. A `#` that starts a
//! word begins a comment running to the end of the line.

use super::{Action, DEFAULT_REP, LayoutRule, Rule, RuleSet, RulesError, SourceLocation, Step};
use crate::pattern::Pattern;
use crate::types::ItemKind;
use std::path::Path;

/// A page or asset block that has been opened but not yet closed.
struct OpenBlock {
    kind: ItemKind,
    pattern: String,
    rep_name: String,
    steps: Vec<Step>,
    line: usize,
}

/// Parse rule source text. `file` is only used to attribute errors and
/// rule origins.
pub fn parse(source: &str, file: &Path) -> Result<RuleSet, RulesError> {
    let at = |line: usize| SourceLocation {
        file: file.to_path_buf(),
        line,
    };
    let fail = |line: usize, message: String| RulesError::Source {
        location: at(line),
        message,
    };

    let mut rules = RuleSet::new();
    let mut block: Option<OpenBlock> = None;

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(text).map_err(|message| fail(line, message))?;
        let Some((directive, args)) = tokens.split_first() else {
            continue;
        };

        match (directive.as_str(), block.as_mut()) {
            ("page" | "asset", Some(open)) => {
                return Err(fail(
                    line,
                    format!(
                        "`{directive}` cannot be nested; the block opened on line {} has no `end`",
                        open.line
                    ),
                ));
            }
            ("page" | "asset", None) => {
                let kind = if directive == "page" {
                    ItemKind::Page
                } else {
                    ItemKind::Asset
                };
                let (pattern, rep_name) =
                    parse_header(directive, args).map_err(|message| fail(line, message))?;
                block = Some(OpenBlock {
                    kind,
                    pattern,
                    rep_name,
                    steps: Vec::new(),
                    line,
                });
            }
            ("end", Some(_)) => {
                expect_args(directive, args, 0).map_err(|message| fail(line, message))?;
                if let Some(open) = block.take() {
                    rules.push_rule(Rule {
                        kind: open.kind,
                        pattern: Pattern::compile(&open.pattern),
                        rep_name: open.rep_name,
                        action: Action::new(open.steps),
                        origin: Some(at(open.line)),
                    });
                }
            }
            ("end", None) => {
                return Err(fail(line, "`end` without an open `page` or `asset` block".into()));
            }
            ("filter" | "snapshot" | "layout", Some(open)) => {
                expect_args(directive, args, 1).map_err(|message| fail(line, message))?;
                let name = non_empty(directive, &args[0]).map_err(|message| fail(line, message))?;
                open.steps.push(match directive.as_str() {
                    "filter" => Step::Filter(name),
                    "snapshot" => Step::Snapshot(name),
                    _ => Step::Layout(name),
                });
            }
            ("layout", None) => {
                expect_args(directive, args, 2).map_err(|message| fail(line, message))?;
                let filter_name =
                    non_empty("layout filter", &args[1]).map_err(|message| fail(line, message))?;
                rules.push_layout_rule(LayoutRule {
                    pattern: Pattern::compile(&args[0]),
                    filter_name,
                    origin: Some(at(line)),
                });
            }
            ("filter" | "snapshot", None) => {
                return Err(fail(
                    line,
                    format!("`{directive}` must appear inside a `page` or `asset` block"),
                ));
            }
            (other, _) => {
                return Err(fail(line, format!("unknown directive `{other}`")));
            }
        }
    }

    if let Some(open) = block {
        return Err(fail(
            open.line,
            "block is never closed; expected `end`".into(),
        ));
    }

    Ok(rules)
}

/// `<pattern>` or `<pattern> rep <name>`.
fn parse_header(directive: &str, args: &[String]) -> Result<(String, String), String> {
    match args {
        [pattern] => Ok((pattern.clone(), DEFAULT_REP.to_string())),
        [pattern, keyword, name] if keyword == "rep" => {
            Ok((pattern.clone(), non_empty("rep", name)?))
        }
        [] => Err(format!("`{directive}` needs a pattern")),
        _ => Err(format!(
            "`{directive}` takes a pattern and an optional `rep <name>`"
        )),
    }
}

fn expect_args(directive: &str, args: &[String], count: usize) -> Result<(), String> {
    if args.len() == count {
        return Ok(());
    }
    let wanted = match count {
        0 => "no arguments".to_string(),
        1 => "1 argument".to_string(),
        n => format!("{n} arguments"),
    };
    Err(format!(
        "`{directive}` takes {wanted}, got {}",
        args.len()
    ))
}

fn non_empty(what: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("{what} name must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

/// Split a line into words, honouring quotes and stripping comments.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            chars.next();
            let mut word = String::new();
            loop {
                match chars.next() {
                    Some(ch) if ch == c => break,
                    Some(ch) => word.push(ch),
                    None => return Err(format!("unterminated {c}-quoted string")),
                }
            }
            tokens.push(word);
            continue;
        }
        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            word.push(ch);
            chars.next();
        }
        tokens.push(word);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleMatch;
    use std::path::PathBuf;

    fn parse_ok(source: &str) -> RuleSet {
        parse(source, Path::new("Rules")).unwrap()
    }

    fn parse_err(source: &str) -> (usize, String) {
        match parse(source, Path::new("Rules")) {
            Err(RulesError::Source { location, message }) => {
                assert_eq!(location.file, PathBuf::from("Rules"));
                (location.line, message)
            }
            other => panic!("expected a source error, got {other:?}"),
        }
    }

    #[test]
    fn parses_complete_rules_file() {
        let rules = parse_ok(
            r#"
# Blog posts get a raw twin
page '/blog/*' rep raw
end

page '*'
  filter markdown
  snapshot body
  layout '/default/'
end

asset '*'
end

layout '*' template
"#,
        );

        let pages = rules.rules_for(ItemKind::Page);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rep_name, "raw");
        assert!(pages[0].action.is_empty());
        assert_eq!(pages[1].rep_name, DEFAULT_REP);
        assert_eq!(
            pages[1].action.steps,
            vec![
                Step::Filter("markdown".into()),
                Step::Snapshot("body".into()),
                Step::Layout("/default/".into()),
            ]
        );

        assert_eq!(rules.rules_for(ItemKind::Asset).len(), 1);
        assert_eq!(rules.layout_rules().len(), 1);
        assert_eq!(rules.layout_rules()[0].filter_name, "template");
    }

    #[test]
    fn rules_remember_their_line() {
        let rules = parse_ok("\n\npage '*'\nend\nlayout '*' template\n");
        let origin = rules.rules_for(ItemKind::Page)[0].origin.clone().unwrap();
        assert_eq!(origin.line, 3);
        assert_eq!(origin.to_string(), "Rules:3");
        let origin = rules.layout_rules()[0].origin.clone().unwrap();
        assert_eq!(origin.line, 5);
    }

    #[test]
    fn quoted_patterns_may_contain_spaces_and_hashes() {
        let rules = parse_ok("page \"/my page #1/\"\nend\n");
        assert!(matches!(
            rules.find_rule(ItemKind::Page, "/my page #1/", DEFAULT_REP),
            RuleMatch::Matched(_)
        ));
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let rules = parse_ok("page '*' # everything\n  filter markdown # render\nend\n");
        assert_eq!(
            rules.rules_for(ItemKind::Page)[0].action.steps,
            vec![Step::Filter("markdown".into())]
        );
    }

    #[test]
    fn unknown_directive_is_reported_on_its_line() {
        let (line, message) = parse_err("page '*'\nend\nsome_function(\n");
        assert_eq!(line, 3);
        assert!(message.contains("unknown directive `some_function(`"));
    }

    #[test]
    fn unclosed_block_is_reported_where_it_opened() {
        let (line, message) = parse_err("\npage '*'\n  filter markdown\n");
        assert_eq!(line, 2);
        assert!(message.contains("expected `end`"));
    }

    #[test]
    fn nested_block_is_rejected() {
        let (line, message) = parse_err("page '*'\nasset '*'\nend\n");
        assert_eq!(line, 2);
        assert!(message.contains("line 1"));
    }

    #[test]
    fn end_without_block_is_rejected() {
        let (line, _) = parse_err("end\n");
        assert_eq!(line, 1);
    }

    #[test]
    fn step_outside_block_is_rejected() {
        let (line, message) = parse_err("filter markdown\n");
        assert_eq!(line, 1);
        assert!(message.contains("inside a `page` or `asset` block"));
    }

    #[test]
    fn header_requires_pattern() {
        let (_, message) = parse_err("page\nend\n");
        assert!(message.contains("needs a pattern"));
    }

    #[test]
    fn header_rejects_stray_arguments() {
        let (_, message) = parse_err("page '*' raw\nend\n");
        assert!(message.contains("optional `rep <name>`"));
    }

    #[test]
    fn step_argument_count_is_checked() {
        let (line, message) = parse_err("page '*'\n  filter\nend\n");
        assert_eq!(line, 2);
        assert_eq!(message, "`filter` takes 1 argument, got 0");
    }

    #[test]
    fn top_level_layout_needs_pattern_and_filter() {
        let (_, message) = parse_err("layout '*'\n");
        assert_eq!(message, "`layout` takes 2 arguments, got 1");
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let (line, message) = parse_err("page '*\nend\n");
        assert_eq!(line, 1);
        assert!(message.contains("unterminated"));
    }

    #[test]
    fn empty_rep_name_is_rejected() {
        let (_, message) = parse_err("page '*' rep ''\nend\n");
        assert_eq!(message, "rep name must not be empty");
    }

    #[test]
    fn unknown_filter_names_are_accepted() {
        let rules = parse_ok("page '*'\n  filter no_such_filter\nend\nlayout '*' nope\n");
        assert_eq!(rules.layout_rules()[0].filter_name, "nope");
    }

    #[test]
    fn tokenize_handles_mixed_quoting() {
        assert_eq!(
            tokenize(r#"page "/a b/" rep 'x y'"#).unwrap(),
            vec!["page", "/a b/", "rep", "x y"]
        );
        assert!(tokenize("   # only a comment").unwrap().is_empty());
    }
}
