//! # Prompt Builder
//!
//! Renders system prompts that teach an agent the subset of UCL it is
//! allowed to use.
//!
//! Capabilities only shape the prompt text. The executor does not consult
//! them; callers that want enforcement should filter commands themselves.

use crate::{BlockId, UcpError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// CAPABILITIES
// =============================================================================

/// A UCL command family an agent may be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Edit,
    Append,
    Move,
    Delete,
    Link,
    Prune,
    Atomic,
}

impl Capability {
    /// Every capability, in prompt order.
    pub const ALL: [Capability; 7] = [
        Self::Edit,
        Self::Append,
        Self::Move,
        Self::Delete,
        Self::Link,
        Self::Prune,
        Self::Atomic,
    ];

    /// Grammar lines documenting this command family.
    #[must_use]
    pub fn grammar(&self) -> &'static [&'static str] {
        match self {
            Self::Edit => &[
                "EDIT <id> SET <path> = \"<value>\"   (paths: text, label, role, tags, language, custom.<key>)",
                "EDIT <id> SET tags += \"<tag>\"  |  EDIT <id> SET tags -= \"<tag>\"",
            ],
            Self::Append => &["APPEND <parent_id> [<type>] [AT <n>] :: \"<content>\" [WITH key=value, ...]   (types: text, code, table, json, math)"],
            Self::Move => &[
                "MOVE <id> TO <parent_id> [INDEX <n>]",
                "MOVE <id> BEFORE <anchor_id>",
                "MOVE <id> AFTER <anchor_id>",
            ],
            Self::Delete => &["DELETE <id> [CASCADE | PRESERVE_CHILDREN]   (blocks with children need one of them)"],
            Self::Link => &[
                "LINK <source_id> <edge_type> <target_id> [WITH confidence=<0..1>, description=\"<text>\"]",
                "UNLINK <source_id> <edge_type> <target_id>",
            ],
            Self::Prune => &["PRUNE unreachable"],
            Self::Atomic => &["ATOMIC { <command>; <command> }   (all commands apply, or none do)"],
        }
    }

    /// A worked command for the examples section; `id(n)` renders block `n`.
    fn example(&self, id: impl Fn(u64) -> String) -> String {
        match self {
            Self::Edit => format!("EDIT {} SET text = \"Revised opening sentence.\"", id(2)),
            Self::Append => format!("APPEND {} :: \"A new closing paragraph.\" WITH role=paragraph", id(1)),
            Self::Move => format!("MOVE {} AFTER {}", id(3), id(4)),
            Self::Delete => format!("DELETE {} CASCADE", id(5)),
            Self::Link => format!("LINK {} supports {} WITH confidence=0.9", id(3), id(2)),
            Self::Prune => "PRUNE unreachable".to_string(),
            Self::Atomic => format!(
                "ATOMIC {{ EDIT {} SET label = \"Summary\"; MOVE {} TO {} INDEX 0 }}",
                id(4),
                id(4),
                id(1)
            ),
        }
    }
}

/// Shape the agent is asked to answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Bare UCL commands, one per line.
    #[default]
    Ucl,
    /// A JSON array of UCL command strings.
    Json,
}

impl OutputFormat {
    fn instruction(self) -> &'static str {
        match self {
            Self::Ucl => "Respond with UCL commands only.",
            Self::Json => {
                "Respond with a JSON array of strings, one UCL command per element, and nothing else."
            }
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Chainable prompt configuration.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    capabilities: BTreeSet<Capability>,
    short_ids: bool,
    rules: Vec<String>,
    system_context: Option<String>,
    task_context: Option<String>,
    examples: bool,
    output_format: OutputFormat,
}

impl PromptBuilder {
    /// A builder with no capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_all_capabilities() -> Self {
        Capability::ALL
            .into_iter()
            .fold(Self::new(), Self::with_capability)
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    #[must_use]
    pub fn without_capability(mut self, capability: Capability) -> Self {
        self.capabilities.remove(&capability);
        self
    }

    #[must_use]
    pub fn with_short_ids(mut self, enabled: bool) -> Self {
        self.short_ids = enabled;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Adds every item as a rule.
    #[must_use]
    pub fn with_constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.extend(constraints.into_iter().map(Into::into));
        self
    }

    /// Include one worked example per enabled capability.
    #[must_use]
    pub fn with_examples(mut self, enabled: bool) -> Self {
        self.examples = enabled;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Text placed before everything else in the system prompt.
    #[must_use]
    pub fn with_system_context(mut self, context: impl Into<String>) -> Self {
        self.system_context = Some(context.into());
        self
    }

    /// Text placed before the task in [`PromptBuilder::build_prompt`].
    #[must_use]
    pub fn with_task_context(mut self, context: impl Into<String>) -> Self {
        self.task_context = Some(context.into());
        self
    }

    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Render the system prompt. Fails when no capability is enabled.
    pub fn build_system_prompt(&self) -> Result<String, UcpError> {
        if self.capabilities.is_empty() {
            return Err(UcpError::InvalidOperation(
                "prompt needs at least one capability".to_string(),
            ));
        }

        let mut out = String::new();
        if let Some(context) = &self.system_context {
            out.push_str(context);
            out.push_str("\n\n");
        }
        out.push_str(
            "You edit a structured document by emitting UCL commands, one per line.\n\n",
        );

        out.push_str("## Commands\n");
        for capability in &self.capabilities {
            for line in capability.grammar() {
                out.push_str(&format!("- {line}\n"));
            }
        }

        out.push_str("\n## Values\n");
        out.push_str("- Quote string values with double quotes.\n");
        out.push_str("- Escape newlines as \\n, quotes as \\\" and backslashes as \\\\.\n");
        out.push_str("- Lines starting with // are comments.\n");

        if self.short_ids {
            out.push_str("\n## Block ids\n");
            out.push_str(
                "- Blocks are referenced by the short numbers shown in the document structure, e.g. `EDIT 3 SET text = \"...\"`.\n",
            );
        }

        if self.examples {
            out.push_str("\n## Examples\n");
            let short_ids = self.short_ids;
            let id = |n: u64| {
                if short_ids {
                    n.to_string()
                } else {
                    BlockId::from_suffix(n).to_string()
                }
            };
            for capability in &self.capabilities {
                out.push_str(&format!("Example: {}\n", capability.example(&id)));
            }
        }

        if !self.rules.is_empty() {
            out.push_str("\n## Rules\n");
            for rule in &self.rules {
                out.push_str(&format!("- {rule}\n"));
            }
        }

        out.push('\n');
        out.push_str(self.output_format.instruction());
        Ok(out)
    }

    /// System prompt followed by the document description and the task.
    pub fn build_prompt(&self, description: &str, task: &str) -> Result<String, UcpError> {
        let mut out = self.build_system_prompt()?;
        out.push_str("\n\n");
        out.push_str(description.trim_end());
        out.push_str("\n\n");
        if let Some(context) = &self.task_context {
            out.push_str(context);
            out.push_str("\n\n");
        }
        out.push_str("## Task\n");
        out.push_str(task);
        Ok(out)
    }
}

// =============================================================================
// PRESETS
// =============================================================================

/// Ready-made builders for common agent roles.
pub mod presets {
    use super::{Capability, PromptBuilder};

    /// EDIT, APPEND and DELETE.
    #[must_use]
    pub fn basic_editing() -> PromptBuilder {
        PromptBuilder::new()
            .with_capability(Capability::Edit)
            .with_capability(Capability::Append)
            .with_capability(Capability::Delete)
    }

    /// MOVE and LINK/UNLINK.
    #[must_use]
    pub fn structure_manipulation() -> PromptBuilder {
        PromptBuilder::new()
            .with_capability(Capability::Move)
            .with_capability(Capability::Link)
    }

    /// Everything except ATOMIC.
    #[must_use]
    pub fn full_editing() -> PromptBuilder {
        PromptBuilder::with_all_capabilities().without_capability(Capability::Atomic)
    }

    /// Basic editing with short ids.
    #[must_use]
    pub fn token_efficient() -> PromptBuilder {
        basic_editing()
            .with_short_ids(true)
            .with_rule("Use short numeric ids only; never write full block ids.")
    }
}

// =============================================================================
// TESTS
// =============================================================================
