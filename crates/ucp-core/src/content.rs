//! # Block Content
//!
//! Tagged content payloads carried by blocks. One variant per content kind,
//! each with its own payload shape.

use crate::UcpError;
use crate::primitives::CHARS_PER_TOKEN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content kind tag, as written in UCL (`APPEND <id> code :: ...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Code,
    Table,
    Json,
    Math,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 5] = [
        ContentType::Text,
        ContentType::Code,
        ContentType::Table,
        ContentType::Json,
        ContentType::Math,
    ];

    /// Parse a content type name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(name))
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Table => "table",
            Self::Json => "json",
            Self::Math => "math",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
    Code { language: String, source: String },
    Table { rows: Vec<Vec<String>> },
    Json { value: serde_json::Value },
    Math { expression: String },
}

impl Content {
    /// Plain text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Source code with a language tag.
    #[must_use]
    pub fn code(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Code {
            language: language.into(),
            source: source.into(),
        }
    }

    /// Table of string cells.
    #[must_use]
    pub fn table(rows: Vec<Vec<String>>) -> Self {
        Self::Table { rows }
    }

    /// Structured JSON value.
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Self::Json { value }
    }

    /// Math expression.
    #[must_use]
    pub fn math(expression: impl Into<String>) -> Self {
        Self::Math {
            expression: expression.into(),
        }
    }

    /// Build content of the given kind from its textual form.
    ///
    /// - `text`/`math`: verbatim
    /// - `code`: verbatim source with `language`
    /// - `json`: parsed, failing on malformed JSON
    /// - `table`: one row per line, cells split on `|`
    pub fn from_text(kind: ContentType, raw: &str, language: &str) -> Result<Self, UcpError> {
        Ok(match kind {
            ContentType::Text => Self::text(raw),
            ContentType::Code => Self::code(language, raw),
            ContentType::Math => Self::math(raw),
            ContentType::Json => {
                let value = serde_json::from_str(raw).map_err(|e| {
                    UcpError::InvalidOperation(format!("content is not valid JSON: {e}"))
                })?;
                Self::json(value)
            }
            ContentType::Table => Self::table(parse_table(raw)),
        })
    }

    /// Replace the textual payload while keeping the content kind
    /// (and the language of code blocks).
    pub fn with_text(&self, raw: &str) -> Result<Self, UcpError> {
        let language = match self {
            Self::Code { language, .. } => language.as_str(),
            _ => "",
        };
        Self::from_text(self.content_type(), raw, language)
    }

    /// The kind tag of this content.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Text { .. } => ContentType::Text,
            Self::Code { .. } => ContentType::Code,
            Self::Table { .. } => ContentType::Table,
            Self::Json { .. } => ContentType::Json,
            Self::Math { .. } => ContentType::Math,
        }
    }

    /// Canonical textual form, the inverse of [`Content::from_text`].
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Code { source, .. } => source.clone(),
            Self::Math { expression } => expression.clone(),
            Self::Json { value } => value.to_string(),
            Self::Table { rows } => rows
                .iter()
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Size of the textual form in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Text { text } => text.len(),
            Self::Code { source, .. } => source.len(),
            Self::Math { expression } => expression.len(),
            _ => self.as_text().len(),
        }
    }

    /// Integer token estimate: `ceil(chars / CHARS_PER_TOKEN)`.
    #[must_use]
    pub fn estimate_tokens(&self) -> u32 {
        estimate_tokens(&self.as_text())
    }

    /// Check for an empty payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text } => text.is_empty(),
            Self::Code { source, .. } => source.is_empty(),
            Self::Math { expression } => expression.is_empty(),
            Self::Table { rows } => rows.is_empty(),
            Self::Json { value } => value.is_null(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::text("")
    }
}

/// Integer token estimate for arbitrary text.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN) as u32
}

fn parse_table(raw: &str) -> Vec<Vec<String>> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.trim()
                .trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}
