//! Builder API for UCL programs.
//!
//! Provides a fluent interface that renders canonical UCL text. Output
//! parses back into the same commands.
//!
//! # Example
//!
//! ```rust
//! use ucp_core::ucl::UclBuilder;
//! use ucp_core::{ContentType, EdgeType};
//!
//! let ucl = UclBuilder::new()
//!     .edit(1u32, "text", "Hello\nworld")
//!     .append_with(1u32, "print(1)", |a| a.content_type(ContentType::Code).language("python"))
//!     .link(2u32, EdgeType::References, 3u32)
//!     .atomic()
//!     .build();
//! assert!(ucl.starts_with("ATOMIC {"));
//! ```

use crate::block::SemanticRole;
use crate::content::ContentType;
use crate::edge::EdgeType;
use crate::ucl::ast::{Command, EditOp, IdRef, Statement};
use crate::{CustomMap, CustomValue};

/// Collects commands and renders them as UCL.
#[derive(Debug, Clone, Default)]
pub struct UclBuilder {
    commands: Vec<Command>,
}

impl UclBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an `EDIT <id> SET <path> = "<value>"` command.
    pub fn edit(self, id: impl Into<IdRef>, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_edit(id.into(), path.into(), EditOp::Set, value.into())
    }

    /// Adds `EDIT <id> SET tags += "<tag>"`.
    pub fn add_tag(self, id: impl Into<IdRef>, tag: impl Into<String>) -> Self {
        self.push_edit(id.into(), "tags".to_string(), EditOp::Add, tag.into())
    }

    /// Adds `EDIT <id> SET tags -= "<tag>"`.
    pub fn remove_tag(self, id: impl Into<IdRef>, tag: impl Into<String>) -> Self {
        self.push_edit(id.into(), "tags".to_string(), EditOp::Remove, tag.into())
    }

    fn push_edit(mut self, id: IdRef, path: String, op: EditOp, value: String) -> Self {
        self.commands.push(Command::Edit { id, path, op, value });
        self
    }

    /// Adds an `APPEND` of plain content.
    pub fn append(self, parent: impl Into<IdRef>, content: impl Into<String>) -> Self {
        self.append_with(parent, content, |a| a)
    }

    /// Adds an `APPEND` configured through an [`AppendBuilder`].
    pub fn append_with<F>(mut self, parent: impl Into<IdRef>, content: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(AppendBuilder) -> AppendBuilder,
    {
        let append = f(AppendBuilder::default());
        self.commands.push(Command::Append {
            parent: parent.into(),
            content_type: append.content_type,
            index: append.index,
            content: content.into(),
            properties: append.properties,
        });
        self
    }

    pub fn delete(mut self, id: impl Into<IdRef>, cascade: bool) -> Self {
        self.commands.push(Command::Delete {
            id: id.into(),
            cascade,
            preserve_children: false,
        });
        self
    }

    /// Adds `DELETE <id> PRESERVE_CHILDREN`: the block's children take its place.
    pub fn delete_preserving_children(mut self, id: impl Into<IdRef>) -> Self {
        self.commands.push(Command::Delete {
            id: id.into(),
            cascade: false,
            preserve_children: true,
        });
        self
    }

    pub fn move_to(mut self, id: impl Into<IdRef>, parent: impl Into<IdRef>, index: Option<usize>) -> Self {
        self.commands.push(Command::MoveTo {
            id: id.into(),
            parent: parent.into(),
            index,
        });
        self
    }

    pub fn move_before(mut self, id: impl Into<IdRef>, anchor: impl Into<IdRef>) -> Self {
        self.commands.push(Command::MoveBefore {
            id: id.into(),
            anchor: anchor.into(),
        });
        self
    }

    pub fn move_after(mut self, id: impl Into<IdRef>, anchor: impl Into<IdRef>) -> Self {
        self.commands.push(Command::MoveAfter {
            id: id.into(),
            anchor: anchor.into(),
        });
        self
    }

    pub fn link(self, source: impl Into<IdRef>, edge_type: EdgeType, target: impl Into<IdRef>) -> Self {
        self.link_with(source, edge_type, target, |l| l)
    }

    /// Adds a `LINK ... WITH` carrying edge annotations.
    pub fn link_with<F>(mut self, source: impl Into<IdRef>, edge_type: EdgeType, target: impl Into<IdRef>, f: F) -> Self
    where
        F: FnOnce(LinkBuilder) -> LinkBuilder,
    {
        self.commands.push(Command::Link {
            source: source.into(),
            edge_type,
            target: target.into(),
            properties: f(LinkBuilder::default()).properties,
        });
        self
    }

    pub fn unlink(mut self, source: impl Into<IdRef>, edge_type: EdgeType, target: impl Into<IdRef>) -> Self {
        self.commands.push(Command::Unlink {
            source: source.into(),
            edge_type,
            target: target.into(),
        });
        self
    }

    pub fn prune_unreachable(mut self) -> Self {
        self.commands.push(Command::Prune);
        self
    }

    /// Wraps every command collected so far into one `ATOMIC` block.
    pub fn atomic(mut self) -> Self {
        if self.commands.is_empty() {
            return self;
        }
        let inner = self
            .commands
            .drain(..)
            .flat_map(|command| match command {
                Command::Atomic(statements) => statements,
                other => vec![Statement::new(0, other)],
            })
            .collect();
        self.commands.push(Command::Atomic(inner));
        self
    }

    /// Number of leaf commands collected.
    pub fn command_count(&self) -> usize {
        self.commands.iter().map(Command::command_count).sum()
    }

    /// The collected commands.
    pub fn to_list(&self) -> Vec<Command> {
        self.commands.clone()
    }

    pub fn clear(mut self) -> Self {
        self.commands.clear();
        self
    }

    /// Renders the program, one top-level command per line.
    pub fn build(&self) -> String {
        self.commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Options for an `APPEND` command.
#[derive(Debug, Clone, Default)]
pub struct AppendBuilder {
    content_type: Option<ContentType>,
    index: Option<usize>,
    properties: CustomMap,
}

impl AppendBuilder {
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Inserts at this child position instead of appending last.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn label(self, label: impl Into<String>) -> Self {
        self.property("label", label.into())
    }

    pub fn role(self, role: SemanticRole) -> Self {
        self.property("role", role.as_str())
    }

    /// Sets the tag list (rendered comma-separated).
    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let joined = tags.into_iter().map(Into::into).collect::<Vec<_>>().join(",");
        self.property("tags", joined)
    }

    pub fn language(self, language: impl Into<String>) -> Self {
        self.property("language", language.into())
    }

    /// Sets an arbitrary `WITH` property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<CustomValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Annotations for a `LINK` command.
#[derive(Debug, Clone, Default)]
pub struct LinkBuilder {
    properties: CustomMap,
}

impl LinkBuilder {
    /// Clamped to `0.0..=1.0` when the edge is created.
    pub fn confidence(self, confidence: f64) -> Self {
        self.property("confidence", confidence)
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.property("description", description.into())
    }

    /// Any other key lands in the edge's custom metadata.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<CustomValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
