//! Link extraction from raw code snippets.
//!
//! A link starts at a `://` separator and runs while the characters belong
//! to the URL class: ASCII letters and digits, the byte range `$`..=`_`,
//! `@ . & +`, `! * ( ) ,`, and `%XX` triplets. The range is intentionally
//! wide; it keeps `/`, `:`, `?`, `=`, `;` and `<`/`>` inside a match.

use regex::Regex;
use std::sync::LazyLock;

const LINK_PATTERN: &str = r"://(?:[a-zA-Z0-9]|[\$-_@.&+]|[!*(),]|%[0-9a-fA-F]{2})+";

const SEPARATOR: &str = "://";

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LINK_PATTERN).expect("Failed to compile link regex"));

/// A link candidate found in snippet text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMatch<'t> {
    start: usize,
    text: &'t str,
}

impl<'t> LinkMatch<'t> {
    /// Text after the `://` separator, e.g. `example.com/path`.
    #[must_use]
    pub const fn as_str(&self) -> &'t str {
        self.text
    }

    /// Byte offset of the `://` separator in the source text.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Byte offset just past the end of the match in the source text.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + SEPARATOR.len() + self.text.len()
    }

    /// Reassembles an absolute URL with the given scheme.
    #[must_use]
    pub fn with_scheme(&self, scheme: &str) -> String {
        format!("{scheme}{SEPARATOR}{}", self.text)
    }
}

/// Returns the links found in `text`, left to right.
///
/// The iterator is lazy and borrows `text`; calling this again on the same
/// text yields the same sequence. Duplicates are preserved.
pub fn extract_links(text: &str) -> impl Iterator<Item = LinkMatch<'_>> + '_ {
    LINK_RE.find_iter(text).map(|m| LinkMatch {
        start: m.start(),
        text: &m.as_str()[SEPARATOR.len()..],
    })
}

/// Like [`extract_links`], treating an absent snippet as empty text.
pub fn extract_from_snippet(snippet: Option<&str>) -> impl Iterator<Item = LinkMatch<'_>> + '_ {
    extract_links(snippet.unwrap_or_default())
}
