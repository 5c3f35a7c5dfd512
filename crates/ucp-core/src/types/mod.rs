//! # Core Type Definitions
//!
//! This module contains the shared types of the UCP core:
//! - Block identifiers (`BlockId`)
//! - Open attribute values (`CustomValue`, `CustomMap`)
//! - Error types (`UcpError`, `ErrorKind`)
//!
//! ## Identity
//!
//! A `BlockId` is opaque. Issued ids follow the `blk_` + 12 hex digit shape
//! (see [`crate::primitives`]), but imported documents may carry any string,
//! so shape is checked with [`BlockId::is_well_formed`] rather than enforced
//! at construction.

use crate::primitives::{ID_HEX_WIDTH, ID_LENGTH, ID_PREFIX};
use crate::validation::ValidationIssue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// BLOCK IDENTIFIER
// =============================================================================

/// Unique identifier of a block within a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Wrap a raw identifier without shape checks.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build the canonical id for a 48-bit suffix value.
    #[must_use]
    pub fn from_suffix(value: u64) -> Self {
        Self(format!("{ID_PREFIX}{value:0width$x}", width = ID_HEX_WIDTH))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the issued-id shape: `blk_` followed by 12 lowercase hex digits.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ID_LENGTH
            && self.0.starts_with(ID_PREFIX)
            && self.0[ID_PREFIX.len()..]
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Numeric value of the hex suffix, for well-formed ids.
    #[must_use]
    pub fn suffix_value(&self) -> Option<u64> {
        if !self.is_well_formed() {
            return None;
        }
        u64::from_str_radix(&self.0[ID_PREFIX.len()..], 16).ok()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlockId {
    type Err = UcpError;

    /// Parse an issued id, rejecting anything that is not well-formed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self::new(s);
        if id.is_well_formed() {
            Ok(id)
        } else {
            Err(UcpError::InvalidOperation(format!(
                "malformed block id '{s}' (expected {ID_PREFIX} + {ID_HEX_WIDTH} hex digits)"
            )))
        }
    }
}

// =============================================================================
// OPEN ATTRIBUTE VALUES
// =============================================================================

/// Value stored in an open extension bag (`metadata.custom`).
///
/// Deliberately closed to three kinds: string, number, bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl CustomValue {
    /// Interpret a bare literal: `true`/`false`, a finite decimal number,
    /// or otherwise a string.
    #[must_use]
    pub fn from_literal(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        let numeric = !raw.is_empty()
            && raw.bytes().any(|b| b.is_ascii_digit())
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
        if numeric && let Ok(n) = raw.parse::<f64>() && n.is_finite() {
            return Self::Number(n);
        }
        Self::String(raw.to_string())
    }

    /// Get the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CustomValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for CustomValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for CustomValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for CustomValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Open string-keyed extension bag with deterministic key order.
pub type CustomMap = BTreeMap<String, CustomValue>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the UCP core.
///
/// - No silent failures
/// - Use `Result<T, UcpError>` for fallible operations
/// - The core never panics on caller input
#[derive(Debug, Clone, Error)]
pub enum UcpError {
    /// A referenced block id is absent from the graph.
    #[error("block not found: {0}")]
    NotFound(BlockId),

    /// The request is structurally illegal (delete root, move into a
    /// descendant, delete a non-leaf without cascade, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// UCL source text is malformed.
    #[error("syntax error at line {line}: {message} (near `{fragment}`)")]
    Syntax {
        line: usize,
        fragment: String,
        message: String,
    },

    /// A mutation or batch would leave the graph violating an ERROR-severity rule.
    #[error("validation failed: {}", summarize_issues(.issues))]
    ValidationFailure { issues: Vec<ValidationIssue> },

    /// A document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Engine configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse error taxonomy for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    Syntax,
    ValidationFailure,
    Serialization,
    Config,
}

impl UcpError {
    /// Build a syntax error for a source line.
    pub fn syntax(line: usize, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// The taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

fn summarize_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("[{}] {}", issue.code, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_ids_are_well_formed() {
        let id = BlockId::from_suffix(1);
        assert_eq!(id.as_str(), "blk_000000000001");
        assert!(id.is_well_formed());
        assert_eq!(id.suffix_value(), Some(1));
    }

    #[test]
    fn foreign_ids_are_opaque() {
        let id = BlockId::new("intro-section");
        assert!(!id.is_well_formed());
        assert_eq!(id.suffix_value(), None);
        assert!("intro-section".parse::<BlockId>().is_err());
    }

    #[test]
    fn uppercase_hex_is_not_well_formed() {
        assert!(!BlockId::new("blk_00000000000A").is_well_formed());
        assert!("blk_00000000000a".parse::<BlockId>().is_ok());
    }

    #[test]
    fn custom_literals_pick_kind() {
        assert_eq!(CustomValue::from_literal("true"), CustomValue::Bool(true));
        assert_eq!(CustomValue::from_literal("2.5"), CustomValue::Number(2.5));
        assert_eq!(CustomValue::from_literal("-3"), CustomValue::Number(-3.0));
        assert_eq!(
            CustomValue::from_literal("inf"),
            CustomValue::String("inf".to_string())
        );
        assert_eq!(
            CustomValue::from_literal("python"),
            CustomValue::String("python".to_string())
        );
    }

    #[test]
    fn error_kinds_follow_variants() {
        assert_eq!(
            UcpError::NotFound(BlockId::new("x")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(UcpError::syntax(3, "MOVE", "bad").kind(), ErrorKind::Syntax);
        let rendered = UcpError::syntax(3, "MOVE", "expected TO").to_string();
        assert!(rendered.contains("line 3"));
        assert!(rendered.contains("MOVE"));
    }
}
