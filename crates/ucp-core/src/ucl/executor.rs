//! Executor: runs UCL programs against a graph
//!
//! Execution happens in three passes:
//!
//! 1. parse the whole source (any syntax error fails the run),
//! 2. resolve every id token through an [`IdResolver`] (an unknown short id
//!    fails the run before anything is applied),
//! 3. run each batch on a working copy of the graph.
//!
//! A top-level command is a batch of one; an `ATOMIC` group is one batch.
//! A batch that fails is dropped whole and recorded; later batches still run.
//! A batch that succeeds replaces the caller's graph with its working copy.

use crate::block::SemanticRole;
use crate::content::{Content, ContentType};
use crate::edge::EdgeMetadata;
use crate::graph::ContentGraph;
use crate::id_mapper::IdResolver;
use crate::mutation::{EditPath, Mutation, MutationEngine, MutationOutcome};
use crate::primitives::DEFAULT_MAX_COMMANDS;
use crate::ucl::ast::{Command, EditOp, IdRef, Statement};
use crate::ucl::lexer::line_fragment;
use crate::ucl::parser::parse;
use crate::validation::{ResourceLimits, ValidationEngine, ValidationIssue};
use crate::{BlockId, CustomMap, CustomValue, ErrorKind, UcpError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RESULTS
// =============================================================================

/// Report of one execution run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// True when every batch was committed.
    pub success: bool,
    /// Commands in committed batches.
    pub commands_applied: usize,
    pub batches_applied: usize,
    pub batches_failed: usize,
    /// Blocks created by committed batches, in creation order.
    pub created_blocks: Vec<BlockId>,
    pub errors: Vec<ExecutionError>,
}

/// Why a batch was rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionError {
    /// 0-based batch index.
    pub batch: usize,
    /// Source line of the failing command.
    pub line: usize,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip)]
    pub error: UcpError,
}

impl ExecutionError {
    fn new(batch: usize, line: usize, error: UcpError) -> Self {
        Self {
            batch,
            line,
            kind: error.kind(),
            message: error.to_string(),
            error,
        }
    }
}

struct BatchFailure {
    line: usize,
    error: UcpError,
}

// =============================================================================
// EXECUTOR
// =============================================================================

/// Parses, resolves and applies UCL programs.
#[derive(Debug, Clone)]
pub struct UclExecutor {
    engine: MutationEngine,
    validator: ValidationEngine,
    max_commands: usize,
}

impl Default for UclExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl UclExecutor {
    /// Executor without resource limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: MutationEngine::default(),
            validator: ValidationEngine::default(),
            max_commands: DEFAULT_MAX_COMMANDS,
        }
    }

    /// Enforce `limits` both before (mutation prechecks) and after
    /// (post-condition validation) each command.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.engine = MutationEngine::new(limits);
        self.validator = ValidationEngine::new(limits);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: ValidationEngine) -> Self {
        self.engine = MutationEngine::new(*validator.limits());
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn with_max_commands(mut self, max_commands: usize) -> Self {
        self.max_commands = max_commands;
        self
    }

    #[must_use]
    pub fn max_commands(&self) -> usize {
        self.max_commands
    }

    /// Execute `source` against `graph`.
    ///
    /// Returns `Err` only for failures that stop the run before anything is
    /// applied: syntax errors, unknown short ids, and programs longer than
    /// `max_commands`. Per-batch failures are reported in the result.
    pub fn execute<R>(
        &self,
        graph: &mut ContentGraph,
        source: &str,
        resolver: &R,
    ) -> Result<ExecutionResult, UcpError>
    where
        R: IdResolver + ?Sized,
    {
        let statements = parse(source)?;
        self.check_command_count(source, &statements)?;
        check_ids(source, &statements, resolver)?;

        let mut result = ExecutionResult {
            success: true,
            commands_applied: 0,
            batches_applied: 0,
            batches_failed: 0,
            created_blocks: Vec::new(),
            errors: Vec::new(),
        };

        for (batch, statement) in statements.iter().enumerate() {
            let members = match &statement.command {
                Command::Atomic(inner) => inner.as_slice(),
                _ => std::slice::from_ref(statement),
            };
            match self.run_batch(graph, members, resolver) {
                Ok((working, created)) => {
                    *graph = working;
                    tracing::debug!(batch, commands = members.len(), "committed batch");
                    result.batches_applied += 1;
                    result.commands_applied += members.len();
                    result.created_blocks.extend(created);
                }
                Err(failure) => {
                    tracing::warn!(
                        batch,
                        line = failure.line,
                        error = %failure.error,
                        "rolled back batch"
                    );
                    result.batches_failed += 1;
                    result.success = false;
                    result
                        .errors
                        .push(ExecutionError::new(batch, failure.line, failure.error));
                }
            }
        }
        Ok(result)
    }

    fn check_command_count(&self, source: &str, statements: &[Statement]) -> Result<(), UcpError> {
        let mut total = 0usize;
        for statement in statements {
            total += statement.command.command_count();
            if total > self.max_commands {
                return Err(UcpError::syntax(
                    statement.line,
                    line_fragment(source, statement.line),
                    format!("program exceeds {} commands", self.max_commands),
                ));
            }
        }
        Ok(())
    }

    /// Apply `members` to a copy of `graph`; the copy is returned only if
    /// every command applied and introduced no new ERROR issue.
    fn run_batch<R>(
        &self,
        graph: &ContentGraph,
        members: &[Statement],
        resolver: &R,
    ) -> Result<(ContentGraph, Vec<BlockId>), BatchFailure>
    where
        R: IdResolver + ?Sized,
    {
        let mut working = graph.clone();
        let baseline: BTreeSet<(String, Option<BlockId>)> = self
            .validator
            .validate(&working)
            .errors()
            .map(|issue| (issue.code.clone(), issue.block_id.clone()))
            .collect();
        let mut created = Vec::new();

        for statement in members {
            let fail = |error| BatchFailure {
                line: statement.line,
                error,
            };
            let mutation = lower(&statement.command, resolver).map_err(fail)?;
            let outcome = self.engine.apply(&mut working, mutation).map_err(fail)?;
            let introduced: Vec<ValidationIssue> = self
                .validator
                .validate(&working)
                .issues
                .into_iter()
                .filter(|issue| issue.is_error())
                .filter(|issue| !baseline.contains(&(issue.code.clone(), issue.block_id.clone())))
                .collect();
            if !introduced.is_empty() {
                return Err(fail(UcpError::ValidationFailure {
                    issues: introduced,
                }));
            }
            if let MutationOutcome::Created(id) = outcome {
                created.push(id);
            }
        }
        Ok((working, created))
    }
}

// =============================================================================
// ID RESOLUTION
// =============================================================================

fn resolve<R>(id: &IdRef, resolver: &R) -> Option<BlockId>
where
    R: IdResolver + ?Sized,
{
    match id {
        IdRef::Short(short) => resolver.resolve_short(*short),
        IdRef::Long(long) => Some(BlockId::new(long.as_str())),
    }
}

fn id_refs(command: &Command) -> Vec<&IdRef> {
    match command {
        Command::Edit { id, .. } | Command::Delete { id, .. } => vec![id],
        Command::Append { parent, .. } => vec![parent],
        Command::MoveTo { id, parent, .. } => vec![id, parent],
        Command::MoveBefore { id, anchor } | Command::MoveAfter { id, anchor } => vec![id, anchor],
        Command::Link { source, target, .. } | Command::Unlink { source, target, .. } => {
            vec![source, target]
        }
        Command::Prune => Vec::new(),
        Command::Atomic(inner) => inner.iter().flat_map(|s| id_refs(&s.command)).collect(),
    }
}

/// Every short id in the program must resolve before anything runs.
fn check_ids<R>(source: &str, statements: &[Statement], resolver: &R) -> Result<(), UcpError>
where
    R: IdResolver + ?Sized,
{
    let mut pending: Vec<&Statement> = statements.iter().collect();
    while let Some(statement) = pending.pop() {
        if let Command::Atomic(inner) = &statement.command {
            pending.extend(inner.iter());
            continue;
        }
        for id in id_refs(&statement.command) {
            if resolve(id, resolver).is_none() {
                return Err(UcpError::syntax(
                    statement.line,
                    line_fragment(source, statement.line),
                    format!("unknown short id {id}"),
                ));
            }
        }
    }
    Ok(())
}

fn require<R>(id: &IdRef, resolver: &R) -> Result<BlockId, UcpError>
where
    R: IdResolver + ?Sized,
{
    resolve(id, resolver)
        .ok_or_else(|| UcpError::InvalidOperation(format!("unknown short id {id}")))
}

// =============================================================================
// LOWERING
// =============================================================================

/// Translate a resolved command into a mutation.
fn lower<R>(command: &Command, resolver: &R) -> Result<Mutation, UcpError>
where
    R: IdResolver + ?Sized,
{
    Ok(match command {
        Command::Edit {
            id,
            path,
            op: EditOp::Set,
            value,
        } => Mutation::EditBlock {
            id: require(id, resolver)?,
            path: path.clone(),
            value: value.clone(),
        },
        Command::Edit {
            id,
            path,
            op,
            value,
        } => lower_tag_edit(require(id, resolver)?, path, *op, value)?,
        Command::Append {
            parent,
            content_type,
            index,
            content,
            properties,
        } => lower_append(
            require(parent, resolver)?,
            content_type.unwrap_or(ContentType::Text),
            *index,
            content,
            properties,
        )?,
        Command::Delete {
            id,
            cascade,
            preserve_children,
        } => Mutation::DeleteBlock {
            id: require(id, resolver)?,
            cascade: *cascade,
            preserve_children: *preserve_children,
        },
        Command::MoveTo { id, parent, index } => Mutation::MoveBlock {
            id: require(id, resolver)?,
            parent: require(parent, resolver)?,
            index: *index,
        },
        Command::MoveBefore { id, anchor } => Mutation::MoveBefore {
            id: require(id, resolver)?,
            anchor: require(anchor, resolver)?,
        },
        Command::MoveAfter { id, anchor } => Mutation::MoveAfter {
            id: require(id, resolver)?,
            anchor: require(anchor, resolver)?,
        },
        Command::Link {
            source,
            edge_type,
            target,
            properties,
        } => Mutation::AddEdge {
            source: require(source, resolver)?,
            edge_type: *edge_type,
            target: require(target, resolver)?,
            metadata: lower_edge_metadata(properties)?,
        },
        Command::Unlink {
            source,
            edge_type,
            target,
        } => Mutation::RemoveEdge {
            source: require(source, resolver)?,
            edge_type: *edge_type,
            target: require(target, resolver)?,
        },
        Command::Prune => Mutation::PruneUnreachable,
        Command::Atomic(_) => {
            return Err(UcpError::InvalidOperation(
                "ATOMIC groups cannot be nested".to_string(),
            ));
        }
    })
}

/// `+=` and `-=` only apply to the tag set, one tag at a time.
fn lower_tag_edit(id: BlockId, path: &str, op: EditOp, value: &str) -> Result<Mutation, UcpError> {
    if EditPath::parse(path)? != EditPath::Tags {
        return Err(UcpError::InvalidOperation(format!(
            "'{op}' applies to tags, not '{path}'"
        )));
    }
    let tag = value.trim();
    if tag.is_empty() {
        return Err(UcpError::InvalidOperation("empty tag".to_string()));
    }
    let tag = tag.to_string();
    Ok(match op {
        EditOp::Remove => Mutation::RemoveTag { id, tag },
        EditOp::Add | EditOp::Set => Mutation::AddTag { id, tag },
    })
}

/// `confidence` and `description` are edge fields; the rest is custom.
fn lower_edge_metadata(properties: &CustomMap) -> Result<EdgeMetadata, UcpError> {
    let mut custom = properties.clone();
    let mut metadata = EdgeMetadata {
        description: custom.remove("description").map(|v| v.to_string()),
        ..EdgeMetadata::default()
    };
    match custom.remove("confidence") {
        None => {}
        Some(CustomValue::Number(n)) => metadata.set_confidence(n as f32),
        Some(other) => {
            return Err(UcpError::InvalidOperation(format!(
                "confidence must be a number, got '{other}'"
            )));
        }
    }
    metadata.custom = custom;
    Ok(metadata)
}

/// `label`, `role`, `tags` and `language` are metadata; the rest is custom.
fn lower_append(
    parent: BlockId,
    content_type: ContentType,
    index: Option<usize>,
    raw: &str,
    properties: &CustomMap,
) -> Result<Mutation, UcpError> {
    let mut custom: BTreeMap<String, CustomValue> = properties.clone();
    let label = custom.remove("label").map(|v| v.to_string());
    let role = match custom.remove("role") {
        None => None,
        Some(value) => {
            let name = value.to_string();
            Some(SemanticRole::parse(&name).ok_or_else(|| {
                UcpError::InvalidOperation(format!("unknown semantic role '{name}'"))
            })?)
        }
    };
    let tags = custom
        .remove("tags")
        .map(|v| {
            v.to_string()
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let language = match content_type {
        ContentType::Code => custom.remove("language").map(|v| v.to_string()),
        _ => None,
    };

    let content = Content::from_text(content_type, raw, language.as_deref().unwrap_or(""))?;
    Ok(Mutation::AddBlock {
        parent,
        index,
        content,
        role,
        label,
        tags,
        custom,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeType;
    use crate::id_mapper::{IdMapper, LongIdsOnly};

    fn sample() -> (ContentGraph, BlockId, BlockId) {
        let mut graph = ContentGraph::new();
        let root = graph.root().clone();
        let a = graph
            .add_block(&root, Content::text("a"), Some(SemanticRole::Heading1), None)
            .expect("add a");
        let b = graph
            .add_block(&a, Content::text("b"), Some(SemanticRole::Paragraph), None)
            .expect("add b");
        (graph, a, b)
    }

    #[test]
    fn short_ids_resolve_through_mapper() {
        let (mut graph, a, _) = sample();
        let mapper = IdMapper::from_graph(&graph);
        let result = UclExecutor::new()
            .execute(&mut graph, "EDIT 2 SET text = \"hello\"", &mapper)
            .expect("execute");
        assert!(result.success);
        assert_eq!(result.commands_applied, 1);
        let block = graph.get_block(&a).expect("a");
        assert_eq!(block.content.as_text(), "hello");
    }

    #[test]
    fn edit_root_of_fresh_graph_by_short_id() {
        let mut graph = ContentGraph::new();
        let mapper = IdMapper::from_graph(&graph);
        let result = UclExecutor::new()
            .execute(&mut graph, "EDIT 1 SET text = \"hello\"", &mapper)
            .expect("execute");
        assert!(result.success);
        assert_eq!(result.commands_applied, 1);
        let root = graph.get_block(graph.root()).expect("root");
        assert_eq!(root.content.as_text(), "hello");
    }

    #[test]
    fn tag_operators_add_and_remove_single_tags() {
        let (mut graph, a, _) = sample();
        let mapper = IdMapper::from_graph(&graph);
        let executor = UclExecutor::new();
        let result = executor
            .execute(
                &mut graph,
                "EDIT 2 SET tags += \"draft\"\nEDIT 2 SET tags += \" review \"\nEDIT 2 SET tags -= \"draft\"",
                &mapper,
            )
            .expect("execute");
        assert!(result.success);
        let meta = &graph.get_block(&a).expect("a").metadata;
        assert!(meta.has_tag("review"));
        assert!(!meta.has_tag("draft"));

        let result = executor
            .execute(&mut graph, "EDIT 2 SET label += \"x\"\nEDIT 2 SET tags += \"  \"", &mapper)
            .expect("execute");
        assert_eq!(result.batches_failed, 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.kind == ErrorKind::InvalidOperation));
    }

    #[test]
    fn append_at_position() {
        let (mut graph, a, b) = sample();
        let result = UclExecutor::new()
            .execute(&mut graph, &format!("APPEND {a} AT 0 :: \"lead\""), &LongIdsOnly)
            .expect("execute");
        let lead = result.created_blocks[0].clone();
        assert_eq!(graph.children(&a).expect("children"), &[lead, b]);
    }

    #[test]
    fn delete_preserving_children_reparents() {
        let (mut graph, a, b) = sample();
        let result = UclExecutor::new()
            .execute(&mut graph, &format!("DELETE {a} PRESERVE_CHILDREN"), &LongIdsOnly)
            .expect("execute");
        assert!(result.success);
        assert!(!graph.contains(&a));
        assert_eq!(graph.parent(&b), Some(graph.root()));
    }

    #[test]
    fn link_with_sets_edge_metadata() {
        let (mut graph, a, b) = sample();
        let source = format!(
            "LINK {b} supports {a} WITH confidence=1.5, description=\"main claim\", pass=2"
        );
        let result = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect("execute");
        assert!(result.success);
        let edge = &graph.get_edges(&b).expect("edges")[0];
        assert_eq!(edge.metadata.confidence, Some(1.0));
        assert_eq!(edge.metadata.description.as_deref(), Some("main claim"));
        assert_eq!(edge.metadata.custom.get("pass"), Some(&CustomValue::Number(2.0)));

        let result = UclExecutor::new()
            .execute(&mut graph, &format!("LINK {b} references {a} WITH confidence=high"), &LongIdsOnly)
            .expect("execute");
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidOperation);
        assert!(!graph.has_edge(&b, &a, Some(EdgeType::References)));
    }

    #[test]
    fn unknown_short_id_fails_before_applying() {
        let (mut graph, a, _) = sample();
        let mapper = IdMapper::from_graph(&graph);
        let err = UclExecutor::new()
            .execute(&mut graph, "EDIT 2 SET text = \"x\"\nDELETE 99", &mapper)
            .expect_err("unknown id");
        assert!(matches!(err, UcpError::Syntax { line: 2, .. }));
        assert_eq!(graph.get_block(&a).expect("a").content.as_text(), "a");
    }

    #[test]
    fn failing_batch_rolls_back_and_later_batches_run() {
        let (mut graph, a, b) = sample();
        let source = format!(
            "ATOMIC {{\n  EDIT {a} SET text = \"changed\"\n  DELETE {a}\n}}\nLINK {b} references {a}"
        );
        let result = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect("execute");
        assert!(!result.success);
        assert_eq!(result.batches_failed, 1);
        assert_eq!(result.batches_applied, 1);
        assert_eq!(result.errors[0].batch, 0);
        assert_eq!(result.errors[0].line, 3);
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidOperation);
        assert_eq!(graph.get_block(&a).expect("a").content.as_text(), "a");
        assert!(graph.has_edge(&b, &a, Some(EdgeType::References)));
    }

    #[test]
    fn append_maps_properties() {
        let (mut graph, a, _) = sample();
        let source = format!(
            "APPEND {a} code :: \"print(1)\" WITH language=\"python\", label=\"snippet\", role=code, tags=\"x, y\", weight=2"
        );
        let result = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect("execute");
        assert!(result.success);
        let id = &result.created_blocks[0];
        let block = graph.get_block(id).expect("created");
        assert_eq!(block.content, Content::code("python", "print(1)"));
        assert_eq!(block.metadata.label.as_deref(), Some("snippet"));
        assert_eq!(block.role(), Some(SemanticRole::Code));
        assert!(block.metadata.has_tag("x") && block.metadata.has_tag("y"));
        assert_eq!(
            block.metadata.custom.get("weight"),
            Some(&CustomValue::Number(2.0))
        );
    }

    #[test]
    fn limit_breach_is_a_validation_failure() {
        let (mut graph, a, _) = sample();
        let limits = ResourceLimits {
            max_block_count: Some(3),
            ..ResourceLimits::default()
        };
        let result = UclExecutor::new()
            .with_limits(limits)
            .execute(&mut graph, &format!("APPEND {a} :: more"), &LongIdsOnly)
            .expect("execute");
        assert_eq!(result.errors[0].kind, ErrorKind::ValidationFailure);
        assert_eq!(graph.block_count(), 3);
    }

    #[test]
    fn command_cap_is_enforced() {
        let (mut graph, _, _) = sample();
        let err = UclExecutor::new()
            .with_max_commands(1)
            .execute(&mut graph, "PRUNE unreachable\nPRUNE unreachable", &LongIdsOnly)
            .expect_err("too many");
        assert!(matches!(err, UcpError::Syntax { line: 2, .. }));
    }

    #[test]
    fn result_serializes_without_raw_error() {
        let (mut graph, _, _) = sample();
        let result = UclExecutor::new()
            .execute(&mut graph, "DELETE blk_0000000000ff", &LongIdsOnly)
            .expect("execute");
        let json = serde_json::to_value(&result).expect("json");
        assert_eq!(json["errors"][0]["kind"], "not_found");
        assert!(json["errors"][0].get("error").is_none());
    }
}
