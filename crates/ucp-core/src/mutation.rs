//! # Mutation Engine
//!
//! The single entry point through which commands change a graph.
//!
//! Each [`Mutation`] is checked against the configured [`ResourceLimits`]
//! before anything is written, so a rejected mutation leaves the graph
//! untouched. Structural rules (root protection, cycle prevention) are
//! enforced by [`ContentGraph`] itself.

use crate::block::SemanticRole;
use crate::content::Content;
use crate::edge::{Edge, EdgeMetadata, EdgeType};
use crate::graph::ContentGraph;
use crate::validation::{ResourceLimits, ValidationIssue};
use crate::{BlockId, CustomMap, CustomValue, UcpError};
use std::collections::BTreeSet;

// =============================================================================
// EDIT PATHS
// =============================================================================

/// Target of an `EDIT ... SET <path>` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPath {
    Text,
    Label,
    Role,
    Tags,
    Language,
    Custom(String),
}

impl EditPath {
    /// Resolve a path string. Unknown paths are an `InvalidOperation`.
    pub fn parse(path: &str) -> Result<Self, UcpError> {
        let lowered = path.to_ascii_lowercase();
        let custom_key = strip_prefix_ignore_case(path, "metadata.custom.")
            .or_else(|| strip_prefix_ignore_case(path, "custom."));
        match (lowered.as_str(), custom_key) {
            (_, Some(key)) if !key.is_empty() => Ok(Self::Custom(key.to_string())),
            ("text" | "content", _) => Ok(Self::Text),
            ("label" | "metadata.label", _) => Ok(Self::Label),
            ("role" | "metadata.role" | "metadata.semantic_role", _) => Ok(Self::Role),
            ("tags" | "metadata.tags", _) => Ok(Self::Tags),
            ("language" | "metadata.language", _) => Ok(Self::Language),
            _ => Err(UcpError::InvalidOperation(format!(
                "unknown edit path '{path}'"
            ))),
        }
    }
}

/// `prefix` matched ASCII-case-insensitively; the remainder keeps its case.
fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let head = path.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &path[prefix.len()..])
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Every change a command can make to a graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddBlock {
        parent: BlockId,
        /// Child position; `None` appends.
        index: Option<usize>,
        content: Content,
        role: Option<SemanticRole>,
        label: Option<String>,
        tags: BTreeSet<String>,
        custom: CustomMap,
    },
    EditBlock {
        id: BlockId,
        path: String,
        value: String,
    },
    DeleteBlock {
        id: BlockId,
        cascade: bool,
        /// Splice children into the block's place; takes precedence over `cascade`.
        preserve_children: bool,
    },
    MoveBlock {
        id: BlockId,
        parent: BlockId,
        index: Option<usize>,
    },
    MoveBefore {
        id: BlockId,
        anchor: BlockId,
    },
    MoveAfter {
        id: BlockId,
        anchor: BlockId,
    },
    AddEdge {
        source: BlockId,
        edge_type: EdgeType,
        target: BlockId,
        metadata: EdgeMetadata,
    },
    RemoveEdge {
        source: BlockId,
        edge_type: EdgeType,
        target: BlockId,
    },
    AddTag {
        id: BlockId,
        tag: String,
    },
    RemoveTag {
        id: BlockId,
        tag: String,
    },
    PruneUnreachable,
}

impl Mutation {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddBlock { .. } => "add_block",
            Self::EditBlock { .. } => "edit_block",
            Self::DeleteBlock { .. } => "delete_block",
            Self::MoveBlock { .. } => "move_block",
            Self::MoveBefore { .. } => "move_before",
            Self::MoveAfter { .. } => "move_after",
            Self::AddEdge { .. } => "add_edge",
            Self::RemoveEdge { .. } => "remove_edge",
            Self::AddTag { .. } => "add_tag",
            Self::RemoveTag { .. } => "remove_tag",
            Self::PruneUnreachable => "prune_unreachable",
        }
    }
}

/// What an applied mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Created(BlockId),
    Removed(Vec<BlockId>),
    Updated,
    /// The mutation was valid but changed nothing (duplicate edge, missing tag, ...).
    Unchanged,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Applies mutations under resource limits.
#[derive(Debug, Clone, Default)]
pub struct MutationEngine {
    limits: ResourceLimits,
}

impl MutationEngine {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Check limits, then apply `mutation` to `graph`.
    pub fn apply(
        &self,
        graph: &mut ContentGraph,
        mutation: Mutation,
    ) -> Result<MutationOutcome, UcpError> {
        let kind = mutation.kind();
        let outcome = match mutation {
            Mutation::AddBlock {
                parent,
                index,
                content,
                role,
                label,
                tags,
                custom,
            } => {
                self.precheck_add(graph, &parent, &content)?;
                let id = graph.add_block_at(&parent, content, role, label, index)?;
                if !tags.is_empty() || !custom.is_empty() {
                    let metadata = graph.metadata_mut(&id)?;
                    metadata.tags.extend(tags);
                    metadata.custom.extend(custom);
                }
                MutationOutcome::Created(id)
            }
            Mutation::EditBlock { id, path, value } => {
                self.apply_edit(graph, &id, &EditPath::parse(&path)?, &value)?;
                MutationOutcome::Updated
            }
            Mutation::DeleteBlock {
                id,
                preserve_children: true,
                ..
            } => MutationOutcome::Removed(graph.delete_block_preserving_children(&id)?),
            Mutation::DeleteBlock { id, cascade, .. } => {
                MutationOutcome::Removed(graph.delete_block(&id, cascade)?)
            }
            Mutation::MoveBlock { id, parent, index } => {
                self.precheck_move(graph, &id, &parent)?;
                graph.move_block(&id, &parent, index)?;
                MutationOutcome::Updated
            }
            Mutation::MoveBefore { id, anchor } => {
                self.precheck_move_next_to(graph, &id, &anchor)?;
                graph.move_before(&id, &anchor)?;
                MutationOutcome::Updated
            }
            Mutation::MoveAfter { id, anchor } => {
                self.precheck_move_next_to(graph, &id, &anchor)?;
                graph.move_after(&id, &anchor)?;
                MutationOutcome::Updated
            }
            Mutation::AddEdge {
                source,
                edge_type,
                target,
                metadata,
            } => {
                self.precheck_edge(graph, &source, edge_type, &target)?;
                let edge = Edge {
                    metadata,
                    ..Edge::new(edge_type, target)
                };
                changed(graph.add_edge_with(&source, edge)?)
            }
            Mutation::RemoveEdge {
                source,
                edge_type,
                target,
            } => changed(graph.remove_edge(&source, edge_type, &target)?),
            Mutation::AddTag { id, tag } => changed(graph.add_tag(&id, tag)?),
            Mutation::RemoveTag { id, tag } => changed(graph.remove_tag(&id, &tag)?),
            Mutation::PruneUnreachable => MutationOutcome::Removed(graph.prune_unreachable()),
        };
        tracing::debug!(kind, outcome = ?outcome, "applied mutation");
        Ok(outcome)
    }

    fn apply_edit(
        &self,
        graph: &mut ContentGraph,
        id: &BlockId,
        path: &EditPath,
        value: &str,
    ) -> Result<(), UcpError> {
        let block = graph
            .get_block(id)
            .ok_or_else(|| UcpError::NotFound(id.clone()))?;
        match path {
            EditPath::Text => {
                let content = block.content.with_text(value)?;
                reject(self.limits.block_size_issue(content.size_bytes(), id))?;
                graph.edit_block(id, content)
            }
            EditPath::Language => match &block.content {
                Content::Code { source, .. } => {
                    let content = Content::code(value, source.clone());
                    graph.edit_block(id, content)
                }
                other => Err(UcpError::InvalidOperation(format!(
                    "language applies to code blocks, not {}",
                    other.content_type()
                ))),
            },
            EditPath::Label => graph.set_label(id, non_empty(value)),
            EditPath::Role => {
                let role = match non_empty(value) {
                    None => None,
                    Some(name) => Some(SemanticRole::parse(&name).ok_or_else(|| {
                        UcpError::InvalidOperation(format!("unknown semantic role '{name}'"))
                    })?),
                };
                graph.set_role(id, role)
            }
            EditPath::Tags => {
                let tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
                graph.metadata_mut(id)?.tags = tags;
                Ok(())
            }
            EditPath::Custom(key) => {
                graph.set_custom(id, key.clone(), CustomValue::String(value.to_string()))
            }
        }
    }

    fn precheck_add(
        &self,
        graph: &ContentGraph,
        parent: &BlockId,
        content: &Content,
    ) -> Result<(), UcpError> {
        if !graph.contains(parent) {
            return Err(UcpError::NotFound(parent.clone()));
        }
        let mut issues = Vec::new();
        issues.extend(
            self.limits
                .block_count_issue(graph.block_count().saturating_add(1)),
        );
        if let Some(depth) = graph.depth(parent) {
            issues.extend(self.limits.depth_issue(depth + 1, parent));
        }
        issues.extend(self.limits.block_size_issue(content.size_bytes(), parent));
        fail_on(issues)
    }

    fn precheck_move(
        &self,
        graph: &ContentGraph,
        id: &BlockId,
        new_parent: &BlockId,
    ) -> Result<(), UcpError> {
        if let Some(depth) = graph.depth(new_parent) {
            let deepest = depth + 1 + graph.subtree_height(id);
            reject(self.limits.depth_issue(deepest, id))?;
        }
        Ok(())
    }

    fn precheck_move_next_to(
        &self,
        graph: &ContentGraph,
        id: &BlockId,
        anchor: &BlockId,
    ) -> Result<(), UcpError> {
        match graph.parent(anchor) {
            Some(parent) => self.precheck_move(graph, id, parent),
            None => Ok(()),
        }
    }

    fn precheck_edge(
        &self,
        graph: &ContentGraph,
        source: &BlockId,
        edge_type: EdgeType,
        target: &BlockId,
    ) -> Result<(), UcpError> {
        let block = graph
            .get_block(source)
            .ok_or_else(|| UcpError::NotFound(source.clone()))?;
        if block.has_edge_to(target, Some(edge_type)) {
            return Ok(());
        }
        reject(
            self.limits
                .edge_count_issue(block.edges.len().saturating_add(1), source),
        )
    }
}

fn changed(flag: bool) -> MutationOutcome {
    if flag {
        MutationOutcome::Updated
    } else {
        MutationOutcome::Unchanged
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn reject(issue: Option<ValidationIssue>) -> Result<(), UcpError> {
    fail_on(issue.into_iter().collect())
}

fn fail_on(issues: Vec<ValidationIssue>) -> Result<(), UcpError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(UcpError::ValidationFailure { issues })
    }
}

// =============================================================================
// TESTS
// =============================================================================
