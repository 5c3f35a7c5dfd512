//! # ucp-core
//!
//! A structured content graph that automated agents edit through UCL, a
//! small line-oriented command language.
//!
//! The crate has three tightly coupled parts:
//! - the **content graph**: a single-rooted tree of typed blocks plus typed
//!   edges, kept consistent under every mutation
//! - the **UCL interpreter**: parser, builder and an executor that applies
//!   batches atomically on a working copy
//! - the **id mapper**: lossless short-integer aliases for block ids in
//!   LLM-facing text
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network dependencies, NO storage backend
//! - Single writer: callers serialize access to a graph externally
//! - Deterministic: every container iterates in key order
//! - Never panics on caller input; failures are [`UcpError`] values
//!
//! ## Example
//!
//! ```rust
//! use ucp_core::{ContentGraph, IdMapper, UclExecutor};
//!
//! let mut graph = ContentGraph::new();
//! let mapper = IdMapper::from_graph(&graph);
//! let result = UclExecutor::new()
//!     .execute(&mut graph, "APPEND 1 :: \"Hello\" WITH role=paragraph", &mapper)
//!     .expect("valid program");
//! assert!(result.success);
//! assert_eq!(graph.block_count(), 2);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod addressing;
pub mod block;
pub mod config;
pub mod content;
pub mod edge;
pub mod formats;
pub mod graph;
pub mod id_mapper;
pub mod mutation;
pub mod primitives;
pub mod prompt;
pub mod types;
pub mod ucl;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{BlockId, CustomMap, CustomValue, ErrorKind, UcpError};

// =============================================================================
// RE-EXPORTS: Data Model
// =============================================================================

pub use block::{Block, BlockMetadata, SemanticRole};
pub use content::{Content, ContentType};
pub use edge::{Edge, EdgeFamily, EdgeMetadata, EdgeType};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use addressing::{ContentAddressing, IdPolicy};
pub use graph::ContentGraph;
pub use mutation::{EditPath, Mutation, MutationEngine, MutationOutcome};
pub use validation::{
    ResourceLimits, ValidationEngine, ValidationIssue, ValidationResult, ValidationSeverity,
};

// =============================================================================
// RE-EXPORTS: Agent Surface
// =============================================================================

pub use config::EngineConfig;
pub use id_mapper::{IdMapper, IdResolver, LongIdsOnly, TokenSavings};
pub use prompt::{Capability, OutputFormat, PromptBuilder, presets};
pub use ucl::{ExecutionError, ExecutionResult, UclBuilder, UclExecutor};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SerializableGraph, graph_from_json, graph_to_json};
