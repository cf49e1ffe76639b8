//! Data models for topicbase
//!
//! Defines content items attached to topics and the closed set of content
//! kinds, plus the title normalization shared by identity checks and
//! directory naming.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Kind of a content item
///
/// Each kind restricts the file extensions it accepts. `Other` accepts any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Description,
    Geogebra,
    Image,
    Video,
    Worksheet,
    EditableWorksheet,
    Link,
    Other,
}

impl ContentKind {
    /// All kinds, in display order
    pub const ALL: [ContentKind; 8] = [
        ContentKind::Description,
        ContentKind::Geogebra,
        ContentKind::Image,
        ContentKind::Video,
        ContentKind::Worksheet,
        ContentKind::EditableWorksheet,
        ContentKind::Link,
        ContentKind::Other,
    ];

    /// Name as stored in the index document
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Description => "DESCRIPTION",
            ContentKind::Geogebra => "GEOGEBRA",
            ContentKind::Image => "IMAGE",
            ContentKind::Video => "VIDEO",
            ContentKind::Worksheet => "WORKSHEET",
            ContentKind::EditableWorksheet => "EDITABLE_WORKSHEET",
            ContentKind::Link => "LINK",
            ContentKind::Other => "OTHER",
        }
    }

    /// Parse a kind name, case-insensitively. Dashes are accepted for underscores.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = name.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&wanted))
    }

    /// Lowercase extensions (without dot) accepted for this kind. Empty means any.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ContentKind::Description => &["txt"],
            ContentKind::Geogebra => &["ggb"],
            ContentKind::Image => &["png", "jpg", "jpeg", "gif", "bmp"],
            ContentKind::Video => &["mp4", "avi", "mkv", "mov", "webm"],
            ContentKind::Worksheet => &["pdf"],
            ContentKind::EditableWorksheet => &["doc", "docx", "odt"],
            ContentKind::Link => &["url", "html", "htm"],
            ContentKind::Other => &[],
        }
    }

    /// Check whether a file's extension is acceptable for this kind
    pub fn accepts(self, path: &Path) -> bool {
        let allowed = self.extensions();
        if allowed.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A file attached to a topic
///
/// `filename` is relative to the owning topic's directory and unique within
/// that topic. When a `Content` is handed to `add_content`, `filename` is the
/// source file to import instead; the stored name is derived on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Content {
    pub fn new(kind: ContentKind, filename: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        self.caption = if caption.trim().is_empty() {
            None
        } else {
            Some(caption)
        };
        self
    }

    /// Caption if present, otherwise the filename
    pub fn display_name(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.filename)
    }

    /// Extension of `filename` including the leading dot, or empty
    pub fn extension(&self) -> String {
        file_extension(Path::new(&self.filename))
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.display_name())
    }
}

/// Extension of a path including the leading dot, or an empty string
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Characters that cannot appear in a path segment on common platforms
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Turn a title or caption into a single valid path segment
///
/// Reserved characters become `_`, control characters are dropped, runs of
/// whitespace collapse to one space, and leading/trailing spaces and dots are
/// trimmed. `.` and `..` can never result. Returns an empty string when
/// nothing visible remains.
pub fn normalize(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(if RESERVED.contains(&c) { '_' } else { c });
    }

    out.trim_matches(|c| c == '.' || c == ' ').to_string()
}
