//! Item and layout metadata extraction.
//!
//! Metadata comes from one of two places depending on what the file is:
//!
//! ## Front matter (pages and layouts)
//!
//! A TOML block fenced by `---` lines at the very top of the file:
//!
//! ```text
//! ---
//! title = "About"
//! filename = "home"
//! ---
//! # About me
//! ```
//!
//! Everything after the closing fence is the content. A file that does not
//! start with a fence has no metadata and its whole text is content.
//!
//! ## Sidecar files (assets)
//!
//! Binary files cannot carry front matter, so assets read metadata from a
//! TOML file with the same stem: `logo.png` → `logo.toml`. The stem ends at
//! the first dot, like the identifier, so `app.min.js` → `app.toml`. The
//! sidecar is not an asset itself.

use crate::types::Metadata;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FENCE: &str = "---";

/// Split text into its front matter (without fences) and the remaining body.
///
/// Returns `None` for the front matter when the text does not open with a
/// fence line, or when the opening fence is never closed.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = strip_fence_line(text) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front), body);
        }
        offset += line.len();
    }
    (None, text)
}

fn strip_fence_line(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first_len = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    if text[..first_len].trim_end() == FENCE {
        Some(&text[first_len..])
    } else {
        None
    }
}

/// Parse front matter into metadata and return it with the body.
pub fn parse_front_matter(text: &str) -> Result<(Metadata, &str), toml::de::Error> {
    match split_front_matter(text) {
        (Some(front), body) => {
            let table: toml::Table = toml::from_str(front)?;
            Ok((Metadata::from(table), body))
        }
        (None, body) => Ok((Metadata::new(), body)),
    }
}

/// Path of the sidecar metadata file for an asset.
pub fn sidecar_path(asset_path: &Path) -> PathBuf {
    let name = asset_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let stem = match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name.as_ref(),
    };
    asset_path.with_file_name(format!("{stem}.toml"))
}

/// Read sidecar metadata for an asset.
///
/// Returns `Ok(None)` when no sidecar exists.
pub fn read_sidecar(asset_path: &Path) -> Result<Option<Metadata>, SidecarError> {
    let sidecar = sidecar_path(asset_path);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&sidecar)?;
    let table: toml::Table = toml::from_str(&text)?;
    Ok(Some(Metadata::from(table)))
}

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // split_front_matter() tests
    // =========================================================================

    #[test]
    fn splits_fenced_front_matter() {
        let (front, body) = split_front_matter("---\ntitle = \"A\"\n---\nHello\n");
        assert_eq!(front, Some("title = \"A\"\n"));
        assert_eq!(body, "Hello\n");
    }

    #[test]
    fn no_fence_means_no_front_matter() {
        let (front, body) = split_front_matter("# Heading\n---\n");
        assert_eq!(front, None);
        assert_eq!(body, "# Heading\n---\n");
    }

    #[test]
    fn unclosed_fence_is_treated_as_content() {
        let text = "---\ntitle = \"A\"\nno closing fence\n";
        assert_eq!(split_front_matter(text), (None, text));
    }

    #[test]
    fn empty_front_matter() {
        let (front, body) = split_front_matter("---\n---\nbody");
        assert_eq!(front, Some(""));
        assert_eq!(body, "body");
    }

    #[test]
    fn crlf_fences_are_recognized() {
        let (front, body) = split_front_matter("---\r\na = 1\r\n---\r\nbody");
        assert_eq!(front, Some("a = 1\r\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn closing_fence_at_end_of_file() {
        let (front, body) = split_front_matter("---\na = 1\n---");
        assert_eq!(front, Some("a = 1\n"));
        assert_eq!(body, "");
    }

    // =========================================================================
    // parse_front_matter() tests
    // =========================================================================

    #[test]
    fn parses_metadata_in_order() {
        let (meta, body) =
            parse_front_matter("---\ntitle = \"About\"\nfilename = \"home\"\n---\ntext").unwrap();
        assert_eq!(meta.get_string("title").as_deref(), Some("About"));
        assert_eq!(meta.get_string("filename").as_deref(), Some("home"));
        let keys: Vec<&str> = meta.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["title", "filename"]);
        assert_eq!(body, "text");
    }

    #[test]
    fn invalid_front_matter_is_an_error() {
        assert!(parse_front_matter("---\nthis is = = wrong\n---\n").is_err());
    }

    #[test]
    fn plain_text_has_empty_metadata() {
        let (meta, body) = parse_front_matter("just text").unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, "just text");
    }

    // =========================================================================
    // sidecar_path() tests
    // =========================================================================

    #[test]
    fn sidecar_path_uses_stem_before_first_dot() {
        assert_eq!(
            sidecar_path(Path::new("assets/logo.png")),
            PathBuf::from("assets/logo.toml")
        );
        assert_eq!(
            sidecar_path(Path::new("assets/js/app.min.js")),
            PathBuf::from("assets/js/app.toml")
        );
        assert_eq!(
            sidecar_path(Path::new("assets/README")),
            PathBuf::from("assets/README.toml")
        );
    }

    // =========================================================================
    // read_sidecar() tests
    // =========================================================================

    #[test]
    fn read_sidecar_finds_matching_toml() {
        let tmp = TempDir::new().unwrap();
        let asset = tmp.path().join("logo.png");
        fs::write(&asset, [0u8, 1, 2]).unwrap();
        fs::write(tmp.path().join("logo.toml"), "version = 3\n").unwrap();

        let meta = read_sidecar(&asset).unwrap().unwrap();
        assert_eq!(meta.get_string("version").as_deref(), Some("3"));
    }

    #[test]
    fn read_sidecar_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(read_sidecar(&tmp.path().join("logo.png")).unwrap().is_none());
    }

    #[test]
    fn read_sidecar_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("logo.toml"), "[[[").unwrap();
        let result = read_sidecar(&tmp.path().join("logo.png"));
        assert!(matches!(result, Err(SidecarError::Toml(_))));
    }
}
