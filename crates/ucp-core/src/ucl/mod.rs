//! # UCL
//!
//! The command language agents use to edit a graph.
//!
//! ```text
//! EDIT <id> SET <path> = "<value>"
//! EDIT <id> SET tags += "<tag>" | tags -= "<tag>"
//! APPEND <parent> [<type>] [AT <n>] :: <content> [WITH k=v, ...]
//! DELETE <id> [CASCADE | PRESERVE_CHILDREN]
//! MOVE <id> TO <parent> [INDEX <n>] | BEFORE <anchor> | AFTER <anchor>
//! LINK <source> <edge_type> <target> [WITH confidence=<f>, description="<s>", k=v, ...]
//! UNLINK <source> <edge_type> <target>
//! PRUNE unreachable
//! ATOMIC { ... }
//! ```
//!
//! - `lexer` / `parser`: source text to [`Statement`]s
//! - `builder`: commands to canonical source text
//! - `executor`: statements applied to a graph in atomic batches

pub mod ast;
pub mod builder;
pub mod executor;
pub mod lexer;
pub mod parser;

pub use ast::{Command, EditOp, IdRef, Statement, escape};
pub use builder::{AppendBuilder, LinkBuilder, UclBuilder};
pub use executor::{ExecutionError, ExecutionResult, UclExecutor};
pub use parser::parse;
