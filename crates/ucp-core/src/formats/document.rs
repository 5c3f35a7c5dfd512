//! # JSON Document Format
//!
//! A graph serializes to one JSON object:
//!
//! ```json
//! {
//!   "format": "ucp-graph",
//!   "version": 1,
//!   "id_policy": "sequential",
//!   "root": "blk_000000000001",
//!   "blocks": [{ "id": "...", "content": {...}, "metadata": {...}, "children": [...] }],
//!   "edges": [{ "source": "...", "edge_type": "references", "target": "...", ... }]
//! }
//! ```
//!
//! Edges are stored as separate records rather than inside their source
//! block. Output is deterministic: blocks in id order, edges in source order
//! and then in the order the source holds them.
//!
//! ## Security
//!
//! - Documents larger than [`MAX_DOCUMENT_PAYLOAD_SIZE`] are rejected before parsing
//! - The header is validated before the body is decoded
//! - Structural damage (orphans, cycles, dangling edges) is NOT rejected here;
//!   run the validation engine on the imported graph

use crate::addressing::{ContentAddressing, IdPolicy};
use crate::block::{Block, BlockMetadata};
use crate::content::Content;
use crate::edge::{Edge, EdgeMetadata, EdgeType};
use crate::graph::ContentGraph;
use crate::primitives::{FORMAT_TAG, FORMAT_VERSION, MAX_DOCUMENT_PAYLOAD_SIZE};
use crate::{BlockId, UcpError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEADER
// =============================================================================

/// Leading fields of every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub format: String,
    pub version: u32,
}

impl DocumentHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), UcpError> {
        if self.format != FORMAT_TAG {
            return Err(UcpError::Serialization(format!(
                "unknown document format '{}' (expected '{FORMAT_TAG}')",
                self.format
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(UcpError::Serialization(format!(
                "unsupported version: {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        Ok(())
    }
}

impl Default for DocumentHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// One block, without its edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    /// Carries the content type as its `type` tag.
    pub content: Content,
    pub metadata: BlockMetadata,
    #[serde(default)]
    pub children: Vec<BlockId>,
}

/// One edge, keyed by its source block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: BlockId,
    pub edge_type: EdgeType,
    pub target: BlockId,
    #[serde(default, skip_serializing_if = "EdgeMetadata::is_empty")]
    pub metadata: EdgeMetadata,
    pub created_at: DateTime<Utc>,
}

/// Serializable form of a [`ContentGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableGraph {
    #[serde(flatten)]
    pub header: DocumentHeader,
    #[serde(default)]
    pub id_policy: IdPolicy,
    pub root: BlockId,
    pub blocks: Vec<BlockRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl From<&ContentGraph> for SerializableGraph {
    fn from(graph: &ContentGraph) -> Self {
        let mut blocks = Vec::with_capacity(graph.block_count());
        let mut edges = Vec::new();
        for (id, block) in graph.blocks() {
            blocks.push(BlockRecord {
                id: id.clone(),
                content: block.content.clone(),
                metadata: block.metadata.clone(),
                children: block.children().to_vec(),
            });
            edges.extend(block.edges.iter().map(|edge| EdgeRecord {
                source: id.clone(),
                edge_type: edge.edge_type,
                target: edge.target.clone(),
                metadata: edge.metadata.clone(),
                created_at: edge.created_at,
            }));
        }
        Self {
            header: DocumentHeader::new(),
            id_policy: graph.addressing().policy(),
            root: graph.root().clone(),
            blocks,
            edges,
        }
    }
}

impl TryFrom<SerializableGraph> for ContentGraph {
    type Error = UcpError;

    /// Rebuild a graph. Ids are kept as-is; sequential allocation resumes
    /// past the highest well-formed id.
    fn try_from(document: SerializableGraph) -> Result<Self, Self::Error> {
        document.header.validate()?;

        let mut blocks = BTreeMap::new();
        let mut structure = BTreeMap::new();
        for record in document.blocks {
            let mut block = Block::new(record.id.clone(), record.content, record.metadata);
            block.children = record.children.clone();
            if blocks.insert(record.id.clone(), block).is_some() {
                return Err(UcpError::Serialization(format!(
                    "duplicate block id {}",
                    record.id
                )));
            }
            structure.insert(record.id, record.children);
        }
        if !blocks.contains_key(&document.root) {
            return Err(UcpError::Serialization(format!(
                "root {} has no block record",
                document.root
            )));
        }

        for record in document.edges {
            let source = blocks.get_mut(&record.source).ok_or_else(|| {
                UcpError::Serialization(format!(
                    "edge source {} has no block record",
                    record.source
                ))
            })?;
            source.edges.push(Edge {
                edge_type: record.edge_type,
                target: record.target,
                metadata: record.metadata,
                created_at: record.created_at,
            });
        }

        Ok(ContentGraph::from_parts(
            document.root,
            blocks,
            structure,
            ContentAddressing::new(document.id_policy),
        ))
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to pretty-printed JSON.
pub fn graph_to_json(graph: &ContentGraph) -> Result<String, UcpError> {
    serde_json::to_string_pretty(&SerializableGraph::from(graph))
        .map_err(|e| UcpError::Serialization(e.to_string()))
}

/// Deserialize a graph from JSON.
///
/// Size, then header, then body: nothing is decoded past a check that failed.
pub fn graph_from_json(json: &str) -> Result<ContentGraph, UcpError> {
    if json.len() > MAX_DOCUMENT_PAYLOAD_SIZE {
        return Err(UcpError::Serialization(format!(
            "document size {} bytes exceeds maximum allowed {MAX_DOCUMENT_PAYLOAD_SIZE} bytes",
            json.len()
        )));
    }

    let header: DocumentHeader = serde_json::from_str(json)
        .map_err(|e| UcpError::Serialization(format!("invalid document header: {e}")))?;
    header.validate()?;

    let document: SerializableGraph = serde_json::from_str(json)
        .map_err(|e| UcpError::Serialization(format!("failed to decode graph: {e}")))?;
    ContentGraph::try_from(document)
}

// =============================================================================
// TESTS
// =============================================================================
