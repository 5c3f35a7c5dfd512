//! # Edges
//!
//! Directed, typed relationships between blocks, independent of the tree.
//!
//! Edge types carry three static properties, all pure lookup tables:
//! - `inverse()`: the relationship seen from the target
//! - `is_symmetric()`: the type is its own inverse by definition
//! - `is_structural()`: the type mirrors a tree relationship
//!
//! Creating an edge never checks that the target exists. Dangling targets
//! are reported by the validation engine.

use crate::{BlockId, CustomMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Family an edge type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeFamily {
    Derivation,
    Reference,
    Semantic,
    Structural,
    Version,
}

/// Closed set of relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    // Derivation
    DerivedFrom,
    Supersedes,
    TransformedFrom,
    // Reference
    References,
    CitedBy,
    LinksTo,
    // Semantic
    Supports,
    Contradicts,
    Elaborates,
    Summarizes,
    // Structural
    ParentOf,
    ChildOf,
    SiblingOf,
    PreviousSibling,
    NextSibling,
    // Version
    VersionOf,
    AlternativeOf,
    TranslationOf,
}

impl EdgeType {
    /// Every edge type, in declaration order.
    pub const ALL: [EdgeType; 18] = [
        Self::DerivedFrom,
        Self::Supersedes,
        Self::TransformedFrom,
        Self::References,
        Self::CitedBy,
        Self::LinksTo,
        Self::Supports,
        Self::Contradicts,
        Self::Elaborates,
        Self::Summarizes,
        Self::ParentOf,
        Self::ChildOf,
        Self::SiblingOf,
        Self::PreviousSibling,
        Self::NextSibling,
        Self::VersionOf,
        Self::AlternativeOf,
        Self::TranslationOf,
    ];

    /// Canonical snake_case name, as used in UCL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DerivedFrom => "derived_from",
            Self::Supersedes => "supersedes",
            Self::TransformedFrom => "transformed_from",
            Self::References => "references",
            Self::CitedBy => "cited_by",
            Self::LinksTo => "links_to",
            Self::Supports => "supports",
            Self::Contradicts => "contradicts",
            Self::Elaborates => "elaborates",
            Self::Summarizes => "summarizes",
            Self::ParentOf => "parent_of",
            Self::ChildOf => "child_of",
            Self::SiblingOf => "sibling_of",
            Self::PreviousSibling => "previous_sibling",
            Self::NextSibling => "next_sibling",
            Self::VersionOf => "version_of",
            Self::AlternativeOf => "alternative_of",
            Self::TranslationOf => "translation_of",
        }
    }

    /// Parse an edge type name (case-insensitive). Empty and unknown names
    /// yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(name))
    }

    /// Family of this edge type.
    #[must_use]
    pub const fn family(self) -> EdgeFamily {
        match self {
            Self::DerivedFrom | Self::Supersedes | Self::TransformedFrom => EdgeFamily::Derivation,
            Self::References | Self::CitedBy | Self::LinksTo => EdgeFamily::Reference,
            Self::Supports | Self::Contradicts | Self::Elaborates | Self::Summarizes => {
                EdgeFamily::Semantic
            }
            Self::ParentOf
            | Self::ChildOf
            | Self::SiblingOf
            | Self::PreviousSibling
            | Self::NextSibling => EdgeFamily::Structural,
            Self::VersionOf | Self::AlternativeOf | Self::TranslationOf => EdgeFamily::Version,
        }
    }

    /// The relationship as seen from the target.
    ///
    /// Types without a paired counterpart map to themselves, so
    /// `t.inverse().inverse() == t` holds for every type.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::References => Self::CitedBy,
            Self::CitedBy => Self::References,
            Self::ParentOf => Self::ChildOf,
            Self::ChildOf => Self::ParentOf,
            Self::PreviousSibling => Self::NextSibling,
            Self::NextSibling => Self::PreviousSibling,
            other => other,
        }
    }

    /// True for relationships that read the same in both directions.
    #[must_use]
    pub const fn is_symmetric(self) -> bool {
        matches!(self, Self::Contradicts | Self::SiblingOf)
    }

    /// True for relationships that mirror the tree.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self.family(), EdgeFamily::Structural)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EDGE METADATA
// =============================================================================

/// Optional annotations on an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    /// Confidence in [0, 1]. Out-of-range values are clamped on write.
    pub confidence: Option<f32>,
    pub description: Option<String>,
    pub custom: CustomMap,
}

impl EdgeMetadata {
    /// Set confidence, clamped into [0, 1]. NaN clears it.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = if confidence.is_nan() {
            None
        } else {
            Some(confidence.clamp(0.0, 1.0))
        };
    }

    /// True when no annotation is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confidence.is_none() && self.description.is_none() && self.custom.is_empty()
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, typed relationship owned by its source block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub target: BlockId,
    #[serde(default, skip_serializing_if = "EdgeMetadata::is_empty")]
    pub metadata: EdgeMetadata,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create an edge without annotations.
    #[must_use]
    pub fn new(edge_type: EdgeType, target: BlockId) -> Self {
        Self {
            edge_type,
            target,
            metadata: EdgeMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Attach a confidence (clamped into [0, 1]).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.metadata.set_confidence(confidence);
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// True when both edges relate the same target with the same type.
    #[must_use]
    pub fn same_relation(&self, other: &Edge) -> bool {
        self.edge_type == other.edge_type && self.target == other.target
    }
}

// =============================================================================
// TESTS
// =============================================================================
