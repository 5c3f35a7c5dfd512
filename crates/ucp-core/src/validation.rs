//! # Validation Engine
//!
//! Read-only inspection of a [`ContentGraph`] that produces typed issues.
//!
//! Validation never repairs the graph. Every check contributes issues
//! independently; a result is valid iff no ERROR-severity issue is present.
//!
//! ## Issue codes
//!
//! | Code | Check | Severity |
//! |------|-------|----------|
//! | E001 | root, or a block referenced by `structure`, missing from `blocks` | ERROR |
//! | E201 | cycle in `structure` | ERROR |
//! | E202 | block listed under more than one parent, or root listed as a child | ERROR |
//! | E203 | orphan: block unreachable from root | WARNING |
//! | E204 | `Block::children` diverges from `structure` | ERROR |
//! | E205 | dangling edge target | WARNING (configurable: INFO) |
//! | E400 | document size limit exceeded | ERROR |
//! | E401 | block count limit exceeded | ERROR |
//! | E402 | block size limit exceeded | ERROR |
//! | E403 | depth limit exceeded | ERROR |
//! | E404 | edges-per-block limit exceeded | ERROR |

use crate::BlockId;
use crate::graph::ContentGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

// =============================================================================
// ISSUES
// =============================================================================

/// Severity of a validation issue. Only `Error` affects validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        })
    }
}

/// One finding of the validation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub code: String,
    pub message: String,
    pub block_id: Option<BlockId>,
}

impl ValidationIssue {
    fn with_severity(
        severity: ValidationSeverity,
        code: &str,
        message: impl Into<String>,
        block_id: Option<BlockId>,
    ) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
            block_id,
        }
    }

    #[must_use]
    pub fn error(code: &str, message: impl Into<String>, block_id: Option<BlockId>) -> Self {
        Self::with_severity(ValidationSeverity::Error, code, message, block_id)
    }

    #[must_use]
    pub fn warning(code: &str, message: impl Into<String>, block_id: Option<BlockId>) -> Self {
        Self::with_severity(ValidationSeverity::Warning, code, message, block_id)
    }

    #[must_use]
    pub fn info(code: &str, message: impl Into<String>, block_id: Option<BlockId>) -> Self {
        Self::with_severity(ValidationSeverity::Info, code, message, block_id)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.message)?;
        if let Some(id) = &self.block_id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}

/// Aggregate outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// A valid result without issues.
    #[must_use]
    pub fn success() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    /// Build a result from issues; validity follows from their severities.
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: !issues.iter().any(ValidationIssue::is_error),
            issues,
        }
    }

    /// Union the issue lists and AND the validity flags.
    #[must_use]
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.valid = self.valid && other.valid;
        self.issues.extend(other.issues);
        self
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.of_severity(ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.of_severity(ValidationSeverity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.of_severity(ValidationSeverity::Info)
    }

    fn of_severity(
        &self,
        severity: ValidationSeverity,
    ) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Check whether an issue with `code` was reported.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

// =============================================================================
// RESOURCE LIMITS
// =============================================================================

/// Optional resource caps. An absent limit disables its check.
///
/// A limit is exceeded when the observed value is strictly greater than it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceLimits {
    pub max_block_count: Option<usize>,
    /// Root is depth 0.
    pub max_depth: Option<usize>,
    /// Bytes of a single block's textual content.
    pub max_block_size: Option<usize>,
    /// Bytes of all textual content in the graph.
    pub max_document_size: Option<usize>,
    pub max_edges_per_block: Option<usize>,
}

impl ResourceLimits {
    /// No limits at all.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Conservative defaults for untrusted input.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            max_block_count: Some(100_000),
            max_depth: Some(50),
            max_block_size: Some(5 * 1024 * 1024),
            max_document_size: Some(50 * 1024 * 1024),
            max_edges_per_block: Some(1_000),
        }
    }

    pub(crate) fn block_count_issue(&self, count: usize) -> Option<ValidationIssue> {
        let max = self.max_block_count?;
        (count > max).then(|| {
            ValidationIssue::error(
                "E401",
                format!("block count {count} exceeds limit {max}"),
                None,
            )
        })
    }

    pub(crate) fn depth_issue(&self, depth: usize, id: &BlockId) -> Option<ValidationIssue> {
        let max = self.max_depth?;
        (depth > max).then(|| {
            ValidationIssue::error(
                "E403",
                format!("depth {depth} exceeds limit {max}"),
                Some(id.clone()),
            )
        })
    }

    pub(crate) fn block_size_issue(&self, size: usize, id: &BlockId) -> Option<ValidationIssue> {
        let max = self.max_block_size?;
        (size > max).then(|| {
            ValidationIssue::error(
                "E402",
                format!("block size {size} bytes exceeds limit {max}"),
                Some(id.clone()),
            )
        })
    }

    pub(crate) fn document_size_issue(&self, size: usize) -> Option<ValidationIssue> {
        let max = self.max_document_size?;
        (size > max).then(|| {
            ValidationIssue::error(
                "E400",
                format!("document size {size} bytes exceeds limit {max}"),
                None,
            )
        })
    }

    pub(crate) fn edge_count_issue(&self, count: usize, id: &BlockId) -> Option<ValidationIssue> {
        let max = self.max_edges_per_block?;
        (count > max).then(|| {
            ValidationIssue::error(
                "E404",
                format!("{count} outgoing edges exceed limit {max}"),
                Some(id.clone()),
            )
        })
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Stateless validator configured with limits and a dangling-edge policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEngine {
    limits: ResourceLimits,
    dangling_edge_severity: ValidationSeverity,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(ResourceLimits::default())
    }
}

impl ValidationEngine {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            dangling_edge_severity: ValidationSeverity::Warning,
        }
    }

    /// Report dangling edges at `severity` instead of WARNING.
    ///
    /// `Error` is downgraded to `Warning`: dangling edges never block.
    #[must_use]
    pub fn with_dangling_edge_severity(mut self, severity: ValidationSeverity) -> Self {
        self.dangling_edge_severity = match severity {
            ValidationSeverity::Error => ValidationSeverity::Warning,
            other => other,
        };
        self
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Run every check against `graph`.
    #[must_use]
    pub fn validate(&self, graph: &ContentGraph) -> ValidationResult {
        let mut issues = Vec::new();
        check_structure(graph, &mut issues);
        let depths = depths_from_root(graph);
        check_orphans(graph, &depths, &mut issues);
        self.check_dangling_edges(graph, &mut issues);
        self.check_limits(graph, &depths, &mut issues);
        ValidationResult::from_issues(issues)
    }

    fn check_dangling_edges(&self, graph: &ContentGraph, issues: &mut Vec<ValidationIssue>) {
        for block in graph.blocks().values() {
            for edge in &block.edges {
                if !graph.contains(&edge.target) {
                    issues.push(ValidationIssue::with_severity(
                        self.dangling_edge_severity,
                        "E205",
                        format!("{} edge targets missing block {}", edge.edge_type, edge.target),
                        Some(block.id.clone()),
                    ));
                }
            }
        }
    }

    fn check_limits(
        &self,
        graph: &ContentGraph,
        depths: &BTreeMap<BlockId, usize>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let limits = &self.limits;
        issues.extend(limits.block_count_issue(graph.block_count()));

        if let Some((id, depth)) = depths.iter().max_by_key(|(_, depth)| **depth) {
            issues.extend(limits.depth_issue(*depth, id));
        }

        let mut total = 0usize;
        for block in graph.blocks().values() {
            let size = block.content.size_bytes();
            total = total.saturating_add(size);
            issues.extend(limits.block_size_issue(size, &block.id));
            issues.extend(limits.edge_count_issue(block.edges.len(), &block.id));
        }
        issues.extend(limits.document_size_issue(total));
    }
}

/// Structural consistency: root, references, lock-step, parents, cycles.
fn check_structure(graph: &ContentGraph, issues: &mut Vec<ValidationIssue>) {
    let blocks = graph.blocks();
    let structure = graph.structure();

    if !blocks.contains_key(graph.root()) {
        issues.push(ValidationIssue::error(
            "E001",
            format!("root block {} is missing", graph.root()),
            Some(graph.root().clone()),
        ));
    }

    let mut parent_count: BTreeMap<&BlockId, usize> = BTreeMap::new();
    for (parent, children) in structure {
        if !blocks.contains_key(parent) {
            issues.push(ValidationIssue::error(
                "E001",
                format!("structure lists children for missing block {parent}"),
                Some(parent.clone()),
            ));
        }
        for child in children {
            if !blocks.contains_key(child) {
                issues.push(ValidationIssue::error(
                    "E001",
                    format!("{parent} lists missing child {child}"),
                    Some(child.clone()),
                ));
            }
            *parent_count.entry(child).or_insert(0) += 1;
        }
    }

    for (child, count) in &parent_count {
        if *child == graph.root() {
            issues.push(ValidationIssue::error(
                "E202",
                "root is listed as a child",
                Some((*child).clone()),
            ));
        } else if *count > 1 {
            issues.push(ValidationIssue::error(
                "E202",
                format!("block has {count} parents"),
                Some((*child).clone()),
            ));
        }
    }

    for block in blocks.values() {
        let indexed = structure.get(&block.id).map_or(&[][..], Vec::as_slice);
        if block.children() != indexed {
            issues.push(ValidationIssue::error(
                "E204",
                "block children diverge from the structure index",
                Some(block.id.clone()),
            ));
        }
    }

    for id in find_cycle_entries(structure) {
        issues.push(ValidationIssue::error(
            "E201",
            "cycle in structure",
            Some(id),
        ));
    }
}

/// Ids at which a depth-first walk closes a cycle (one per back edge).
fn find_cycle_entries(structure: &BTreeMap<BlockId, Vec<BlockId>>) -> Vec<BlockId> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Active,
        Done,
    }

    let mut marks: BTreeMap<&BlockId, Mark> = BTreeMap::new();
    let mut entries = Vec::new();

    for start in structure.keys() {
        if marks.contains_key(start) {
            continue;
        }
        // (node, index of next child to visit)
        let mut stack: Vec<(&BlockId, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::Active);
        while let Some((node, next)) = stack.last_mut() {
            let children = structure.get(*node).map_or(&[][..], Vec::as_slice);
            if let Some(child) = children.get(*next) {
                *next += 1;
                match marks.get(child).copied() {
                    Some(Mark::Active) => entries.push(child.clone()),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Active);
                        stack.push((child, 0));
                    }
                }
            } else {
                marks.insert(*node, Mark::Done);
                stack.pop();
            }
        }
    }
    entries
}

/// Breadth-first depth of every block reachable from root.
fn depths_from_root(graph: &ContentGraph) -> BTreeMap<BlockId, usize> {
    let mut depths = BTreeMap::new();
    if !graph.contains(graph.root()) {
        return depths;
    }
    let mut queue = VecDeque::from([(graph.root().clone(), 0usize)]);
    depths.insert(graph.root().clone(), 0);
    while let Some((id, depth)) = queue.pop_front() {
        for child in graph.structure().get(&id).into_iter().flatten() {
            if graph.contains(child) && !depths.contains_key(child) {
                depths.insert(child.clone(), depth + 1);
                queue.push_back((child.clone(), depth + 1));
            }
        }
    }
    depths
}

fn check_orphans(
    graph: &ContentGraph,
    reachable: &BTreeMap<BlockId, usize>,
    issues: &mut Vec<ValidationIssue>,
) {
    let orphans: BTreeSet<&BlockId> = graph
        .blocks()
        .keys()
        .filter(|id| !reachable.contains_key(*id))
        .collect();
    for id in orphans {
        issues.push(ValidationIssue::warning(
            "E203",
            "block is unreachable from root",
            Some(id.clone()),
        ));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;

    #[test]
    fn merge_ands_validity() {
        let ok = ValidationResult::from_issues(vec![ValidationIssue::warning("E203", "w", None)]);
        let bad = ValidationResult::from_issues(vec![ValidationIssue::error("E401", "e", None)]);
        assert!(ok.valid);
        assert!(!bad.valid);

        let merged = ok.merge(bad);
        assert!(!merged.valid);
        assert_eq!(merged.issues.len(), 2);
        assert_eq!(merged.errors().count(), 1);
        assert_eq!(merged.warnings().count(), 1);
    }

    #[test]
    fn empty_graph_is_clean() {
        let graph = ContentGraph::new();
        let result = ValidationEngine::new(ResourceLimits::standard()).validate(&graph);
        assert!(result.valid);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn limits_fail_only_above_max() {
        let mut graph = ContentGraph::new();
        let root = graph.root().clone();
        graph
            .add_block(&root, Content::text("a"), None, None)
            .expect("add");

        let at_limit = ResourceLimits {
            max_block_count: Some(2),
            ..ResourceLimits::default()
        };
        assert!(ValidationEngine::new(at_limit).validate(&graph).valid);

        let below = ResourceLimits {
            max_block_count: Some(1),
            ..ResourceLimits::default()
        };
        let result = ValidationEngine::new(below).validate(&graph);
        assert!(!result.valid);
        assert!(result.has_code("E401"));
    }

    #[test]
    fn depth_counts_from_root_zero() {
        let mut graph = ContentGraph::new();
        let root = graph.root().clone();
        let a = graph
            .add_block(&root, Content::text("a"), None, None)
            .expect("a");
        graph
            .add_block(&a, Content::text("b"), None, None)
            .expect("b");

        let limits = ResourceLimits {
            max_depth: Some(1),
            ..ResourceLimits::default()
        };
        let result = ValidationEngine::new(limits).validate(&graph);
        assert!(result.has_code("E403"));
    }

    #[test]
    fn dangling_edge_severity_is_configurable() {
        let mut graph = ContentGraph::new();
        let root = graph.root().clone();
        graph
            .add_edge(&root, crate::EdgeType::References, BlockId::new("blk_ffffffffffff"))
            .expect("edge");

        let warn = ValidationEngine::default().validate(&graph);
        assert!(warn.valid);
        assert_eq!(warn.warnings().count(), 1);

        let info = ValidationEngine::default()
            .with_dangling_edge_severity(ValidationSeverity::Info)
            .validate(&graph);
        assert_eq!(info.infos().count(), 1);
        assert_eq!(info.warnings().count(), 0);
    }

    #[test]
    fn cycle_detection_finds_back_edges() {
        let a = BlockId::new("a");
        let b = BlockId::new("b");
        let structure = BTreeMap::from([
            (a.clone(), vec![b.clone()]),
            (b.clone(), vec![a.clone()]),
        ]);
        assert_eq!(find_cycle_entries(&structure), vec![a]);
    }
}
