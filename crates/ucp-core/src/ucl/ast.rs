//! UCL command AST.
//!
//! Every [`Command`] renders back to canonical UCL through `Display`; parsing
//! that text yields an equal command. String values are always written
//! quoted and escaped.

use crate::content::ContentType;
use crate::edge::EdgeType;
use crate::{BlockId, CustomMap, CustomValue, UcpError};
use std::fmt;

/// A block reference as written in source: short integer or long id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdRef {
    Short(u32),
    Long(String),
}

impl IdRef {
    /// Classify a raw id token: all digits is a short id.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            token.parse().ok().map(Self::Short)
        } else {
            Some(Self::Long(token.to_string()))
        }
    }
}

impl fmt::Display for IdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(n) => write!(f, "{n}"),
            Self::Long(s) => f.write_str(s),
        }
    }
}

impl From<u32> for IdRef {
    fn from(short: u32) -> Self {
        Self::Short(short)
    }
}

impl TryFrom<&str> for IdRef {
    type Error = UcpError;

    /// Accepts exactly the tokens the parser accepts as ids.
    fn try_from(token: &str) -> Result<Self, Self::Error> {
        Self::from_token(token)
            .ok_or_else(|| UcpError::InvalidOperation(format!("invalid block id '{token}'")))
    }
}

impl From<&BlockId> for IdRef {
    fn from(id: &BlockId) -> Self {
        Self::Long(id.as_str().to_string())
    }
}

impl From<BlockId> for IdRef {
    fn from(id: BlockId) -> Self {
        Self::from(&id)
    }
}

/// A parsed command together with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub command: Command,
}

impl Statement {
    #[must_use]
    pub fn new(line: usize, command: Command) -> Self {
        Self { line, command }
    }
}

/// Assignment operator of an `EDIT` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditOp {
    /// `=` replaces the value at the path.
    #[default]
    Set,
    /// `+=` adds one tag.
    Add,
    /// `-=` removes one tag.
    Remove,
}

impl EditOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+=",
            Self::Remove => "-=",
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One UCL command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Edit {
        id: IdRef,
        path: String,
        op: EditOp,
        value: String,
    },
    Append {
        parent: IdRef,
        content_type: Option<ContentType>,
        /// Position among the parent's children; `None` appends.
        index: Option<usize>,
        content: String,
        properties: CustomMap,
    },
    /// `cascade` and `preserve_children` are mutually exclusive in source.
    Delete {
        id: IdRef,
        cascade: bool,
        preserve_children: bool,
    },
    MoveTo {
        id: IdRef,
        parent: IdRef,
        index: Option<usize>,
    },
    MoveBefore {
        id: IdRef,
        anchor: IdRef,
    },
    MoveAfter {
        id: IdRef,
        anchor: IdRef,
    },
    Link {
        source: IdRef,
        edge_type: EdgeType,
        target: IdRef,
        /// `confidence` and `description` annotate the edge; other keys are custom.
        properties: CustomMap,
    },
    Unlink {
        source: IdRef,
        edge_type: EdgeType,
        target: IdRef,
    },
    /// `PRUNE unreachable`, the only prune target.
    Prune,
    Atomic(Vec<Statement>),
}

impl Command {
    /// Number of leaf commands (atomic groups count their members).
    #[must_use]
    pub fn command_count(&self) -> usize {
        match self {
            Self::Atomic(inner) => inner.iter().map(|s| s.command.command_count()).sum(),
            _ => 1,
        }
    }
}

/// Escape a value for a UCL string literal (without the quotes).
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &CustomValue) -> fmt::Result {
    match value {
        CustomValue::String(s) => write!(f, "\"{}\"", escape(s)),
        other => write!(f, "{other}"),
    }
}

/// ` WITH k=v, k=v` in key order; nothing when empty.
fn write_properties(f: &mut fmt::Formatter<'_>, properties: &CustomMap) -> fmt::Result {
    for (i, (key, value)) in properties.iter().enumerate() {
        f.write_str(if i == 0 { " WITH " } else { ", " })?;
        write!(f, "{key}=")?;
        write_value(f, value)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit {
                id,
                path,
                op,
                value,
            } => write!(f, "EDIT {id} SET {path} {op} \"{}\"", escape(value)),
            Self::Append {
                parent,
                content_type,
                index,
                content,
                properties,
            } => {
                write!(f, "APPEND {parent} ")?;
                if let Some(ty) = content_type {
                    write!(f, "{ty} ")?;
                }
                if let Some(index) = index {
                    write!(f, "AT {index} ")?;
                }
                write!(f, ":: \"{}\"", escape(content))?;
                write_properties(f, properties)
            }
            Self::Delete {
                id,
                cascade,
                preserve_children,
            } => {
                write!(f, "DELETE {id}")?;
                if *preserve_children {
                    f.write_str(" PRESERVE_CHILDREN")?;
                } else if *cascade {
                    f.write_str(" CASCADE")?;
                }
                Ok(())
            }
            Self::MoveTo { id, parent, index } => {
                write!(f, "MOVE {id} TO {parent}")?;
                if let Some(index) = index {
                    write!(f, " INDEX {index}")?;
                }
                Ok(())
            }
            Self::MoveBefore { id, anchor } => write!(f, "MOVE {id} BEFORE {anchor}"),
            Self::MoveAfter { id, anchor } => write!(f, "MOVE {id} AFTER {anchor}"),
            Self::Link {
                source,
                edge_type,
                target,
                properties,
            } => {
                write!(f, "LINK {source} {edge_type} {target}")?;
                write_properties(f, properties)
            }
            Self::Unlink {
                source,
                edge_type,
                target,
            } => write!(f, "UNLINK {source} {edge_type} {target}"),
            Self::Prune => f.write_str("PRUNE unreachable"),
            Self::Atomic(inner) => {
                f.write_str("ATOMIC {\n")?;
                for statement in inner {
                    writeln!(f, "  {}", statement.command)?;
                }
                f.write_str("}")
            }
        }
    }
}
