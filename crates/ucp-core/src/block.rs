//! # Blocks
//!
//! A block is a node of the content tree: content, metadata, outgoing edges
//! and the ordered list of its children.
//!
//! Block identity is the id alone. Equality and hashing ignore content and
//! metadata, so a block stays the same map key or set member across edits.

use crate::content::{Content, ContentType};
use crate::edge::{Edge, EdgeType};
use crate::{BlockId, CustomMap, CustomValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// SEMANTIC ROLES
// =============================================================================

/// The role a block plays in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticRole {
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    Quote,
    List,
    Code,
    Table,
    Equation,
    Title,
    Subtitle,
    Abstract,
    Section,
    Intro,
    Body,
    Conclusion,
    Note,
    Warning,
    Tip,
    Sidebar,
    Callout,
    Metadata,
    Citation,
    Footnote,
}

impl SemanticRole {
    /// Every role, in declaration order.
    pub const ALL: [SemanticRole; 27] = [
        Self::Heading1,
        Self::Heading2,
        Self::Heading3,
        Self::Heading4,
        Self::Heading5,
        Self::Heading6,
        Self::Paragraph,
        Self::Quote,
        Self::List,
        Self::Code,
        Self::Table,
        Self::Equation,
        Self::Title,
        Self::Subtitle,
        Self::Abstract,
        Self::Section,
        Self::Intro,
        Self::Body,
        Self::Conclusion,
        Self::Note,
        Self::Warning,
        Self::Tip,
        Self::Sidebar,
        Self::Callout,
        Self::Metadata,
        Self::Citation,
        Self::Footnote,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heading1 => "heading1",
            Self::Heading2 => "heading2",
            Self::Heading3 => "heading3",
            Self::Heading4 => "heading4",
            Self::Heading5 => "heading5",
            Self::Heading6 => "heading6",
            Self::Paragraph => "paragraph",
            Self::Quote => "quote",
            Self::List => "list",
            Self::Code => "code",
            Self::Table => "table",
            Self::Equation => "equation",
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Abstract => "abstract",
            Self::Section => "section",
            Self::Intro => "intro",
            Self::Body => "body",
            Self::Conclusion => "conclusion",
            Self::Note => "note",
            Self::Warning => "warning",
            Self::Tip => "tip",
            Self::Sidebar => "sidebar",
            Self::Callout => "callout",
            Self::Metadata => "metadata",
            Self::Citation => "citation",
            Self::Footnote => "footnote",
        }
    }

    /// Parse a role name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
    }

    /// Heading level 1..=6 for heading roles.
    #[must_use]
    pub const fn heading_level(self) -> Option<u8> {
        match self {
            Self::Heading1 => Some(1),
            Self::Heading2 => Some(2),
            Self::Heading3 => Some(3),
            Self::Heading4 => Some(4),
            Self::Heading5 => Some(5),
            Self::Heading6 => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// METADATA
// =============================================================================

/// Descriptive metadata of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub semantic_role: Option<SemanticRole>,
    pub label: Option<String>,
    pub tags: BTreeSet<String>,
    pub custom: CustomMap,
    /// Cached token estimate; recomputed from content when absent.
    pub token_estimate: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl BlockMetadata {
    /// Fresh metadata stamped with the current time.
    #[must_use]
    pub fn new(semantic_role: Option<SemanticRole>, label: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            semantic_role,
            label,
            tags: BTreeSet::new(),
            custom: CustomMap::new(),
            token_estimate: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Update `modified_at` to now.
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// Check whether the tag is present.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl Default for BlockMetadata {
    fn default() -> Self {
        Self::new(None, None)
    }
}

// =============================================================================
// BLOCK
// =============================================================================

/// A node in the content tree.
///
/// `children` is authoritative for document order. The owning graph keeps it
/// in lock-step with its structure index; blocks never change it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub content: Content,
    pub metadata: BlockMetadata,
    pub edges: Vec<Edge>,
    pub(crate) children: Vec<BlockId>,
}

impl Block {
    /// Create a detached block.
    #[must_use]
    pub fn new(id: BlockId, content: Content, metadata: BlockMetadata) -> Self {
        Self {
            id,
            content,
            metadata,
            edges: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Content kind of this block.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }

    /// Semantic role, if any.
    #[must_use]
    pub fn role(&self) -> Option<SemanticRole> {
        self.metadata.semantic_role
    }

    /// Ordered child ids.
    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Cached token estimate, or one computed from content length.
    #[must_use]
    pub fn token_estimate(&self) -> u32 {
        self.metadata
            .token_estimate
            .unwrap_or_else(|| self.content.estimate_tokens())
    }

    /// Fill the token estimate cache if it is empty.
    pub fn refresh_token_estimate(&mut self) -> u32 {
        *self
            .metadata
            .token_estimate
            .get_or_insert_with(|| self.content.estimate_tokens())
    }

    /// Replace content in place; clears the cached token estimate.
    pub(crate) fn replace_content(&mut self, content: Content) {
        self.content = content;
        self.metadata.token_estimate = None;
        self.metadata.touch();
    }

    /// Set a custom attribute.
    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<CustomValue>) {
        self.metadata.custom.insert(key.into(), value.into());
        self.metadata.touch();
    }

    /// All outgoing edges of one type.
    pub fn edges_of_type(&self, edge_type: EdgeType) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }

    /// Check for an outgoing edge to `target`, optionally of one type.
    #[must_use]
    pub fn has_edge_to(&self, target: &BlockId, edge_type: Option<EdgeType>) -> bool {
        self.edges
            .iter()
            .any(|e| &e.target == target && edge_type.is_none_or(|ty| e.edge_type == ty))
    }

    /// Short single-line preview of the content.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let flat: String = match &self.content {
            Content::Code { language, source } => format!("```{language} {source}"),
            Content::Table { rows } => format!(
                "table {}x{}",
                rows.len(),
                rows.first().map_or(0, Vec::len)
            ),
            other => other.as_text(),
        }
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
        match flat.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &flat[..cut]),
            None => flat,
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// =============================================================================
// TESTS
// =============================================================================
