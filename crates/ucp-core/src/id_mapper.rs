//! # Id Mapper
//!
//! Short-integer virtualization of block ids for LLM-facing text.
//!
//! A mapper is a snapshot: it is built once from a graph and never changes.
//! Numbering is root = 1, then document order (pre-order over `structure`),
//! then blocks unreachable from root in id order, so every block in the
//! snapshot has exactly one short id.
//!
//! Blocks created after the snapshot have no short id; lookups for them
//! simply miss. Build a fresh mapper after structural changes.

use crate::content::estimate_tokens;
use crate::graph::ContentGraph;
use crate::primitives::EXCERPT_LENGTH;
use crate::BlockId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Source of short-id resolutions for command execution.
pub trait IdResolver {
    /// Long id for a short id, if known.
    fn resolve_short(&self, short: u32) -> Option<BlockId>;
}

/// Resolver that knows no short ids; every command must use long ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongIdsOnly;

impl IdResolver for LongIdsOnly {
    fn resolve_short(&self, _short: u32) -> Option<BlockId> {
        None
    }
}

impl IdResolver for BTreeMap<u32, BlockId> {
    fn resolve_short(&self, short: u32) -> Option<BlockId> {
        self.get(&short).cloned()
    }
}

/// Token estimates before and after shortening a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenSavings {
    pub original: u32,
    pub shortened: u32,
    pub saved: u32,
}

/// Immutable bijection between block ids and short integers.
#[derive(Debug, Clone, Default)]
pub struct IdMapper {
    to_short: BTreeMap<BlockId, u32>,
    to_long: BTreeMap<u32, BlockId>,
}

impl IdMapper {
    /// Number every block of `graph`.
    #[must_use]
    pub fn from_graph(graph: &ContentGraph) -> Self {
        let mut mapper = Self::default();
        for id in graph.document_order() {
            mapper.register(id);
        }
        for id in graph.blocks().keys() {
            if !mapper.to_short.contains_key(id) {
                mapper.register(id.clone());
            }
        }
        mapper
    }

    fn register(&mut self, id: BlockId) {
        let short = u32::try_from(self.to_long.len())
            .unwrap_or(u32::MAX - 1)
            .saturating_add(1);
        self.to_short.insert(id.clone(), short);
        self.to_long.insert(short, id);
    }

    #[must_use]
    pub fn get_short(&self, id: &BlockId) -> Option<u32> {
        self.to_short.get(id).copied()
    }

    #[must_use]
    pub fn get_full(&self, short: u32) -> Option<&BlockId> {
        self.to_long.get(&short)
    }

    /// Alias of [`IdMapper::get_full`].
    #[must_use]
    pub fn get_long(&self, short: u32) -> Option<&BlockId> {
        self.get_full(short)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.to_long.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_long.is_empty()
    }

    /// `(short, long)` pairs in short-id order.
    #[must_use]
    pub fn mappings(&self) -> Vec<(u32, &BlockId)> {
        self.to_long.iter().map(|(s, l)| (*s, l)).collect()
    }

    /// Replace known long ids with their short ids in UCL-shaped text.
    ///
    /// The inverse of [`IdMapper::expand`]: both rewrite the same token
    /// positions, so `expand(shorten(t)) == t` for any text whose digit
    /// tokens in those positions are not themselves short ids.
    #[must_use]
    pub fn shorten(&self, text: &str) -> String {
        rewrite_ids(text, |word| {
            self.to_short
                .get(&BlockId::new(word))
                .map(ToString::to_string)
        })
    }

    /// Replace known short ids with long ids in UCL-shaped text.
    ///
    /// Only whole all-digit tokens are candidates. String literals, comments,
    /// content after `::`, the argument of `INDEX` or `AT`, and everything
    /// after `WITH` are copied verbatim.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        rewrite_ids(text, |word| self.short_token(word).map(ToString::to_string))
    }

    fn short_token(&self, word: &str) -> Option<&BlockId> {
        if !word.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        word.parse::<u32>().ok().and_then(|s| self.to_long.get(&s))
    }

    /// Markdown table of every mapping.
    #[must_use]
    pub fn mapping_table(&self) -> String {
        let mut table = String::from("| Short | Full ID |\n|-------|---------|\n");
        for (short, long) in &self.to_long {
            table.push_str(&format!("| {short} | {long} |\n"));
        }
        table
    }

    /// Token estimates for `text` before and after [`IdMapper::shorten`].
    #[must_use]
    pub fn estimate_token_savings(&self, text: &str) -> TokenSavings {
        let original = estimate_tokens(text);
        let shortened = estimate_tokens(&self.shorten(text));
        TokenSavings {
            original,
            shortened,
            saved: original.saturating_sub(shortened),
        }
    }

    /// Structural outline of `graph` keyed by short id.
    ///
    /// One line per reachable block, indented two spaces per level:
    /// `[short] role - excerpt`. Blocks without a role show their content type.
    #[must_use]
    pub fn describe(&self, graph: &ContentGraph) -> String {
        let mut out = String::from("Document Structure:\n");
        let mut stack = vec![(graph.root(), 0usize)];
        let mut seen = std::collections::BTreeSet::new();
        while let Some((id, depth)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(block) = graph.get_block(id) else {
                continue;
            };
            let short = self
                .get_short(id)
                .map_or_else(|| id.to_string(), |s| s.to_string());
            let role = block
                .role()
                .map_or_else(|| block.content_type().to_string(), |r| r.to_string());
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("[{short}] {role} - {}\n", block.excerpt(EXCERPT_LENGTH)));
            for child in block.children().iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

impl IdResolver for IdMapper {
    fn resolve_short(&self, short: u32) -> Option<BlockId> {
        self.get_full(short).cloned()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite id-position words of UCL text through `map`.
///
/// Words are maximal runs of `[A-Za-z0-9_]`. Skipped regions: string
/// literals, `//` comments, unquoted content after `::`, the word after
/// `INDEX`/`AT`, and the rest of a command after `WITH`. Inside braces a
/// command ends at `;` or `}` as well as at a newline.
fn rewrite_ids<F>(text: &str, map: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut depth = 0usize;
    let mut positional = false;

    while let Some(c) = rest.chars().next() {
        let verbatim = if c == '"' {
            string_len(rest)
        } else if rest.starts_with("//") {
            command_tail_len(rest, false, false)
        } else if let Some(after) = rest.strip_prefix("::") {
            let content = after.trim_start_matches([' ', '\t', '\r']);
            let lead = rest.len() - content.len();
            if content.starts_with('"') {
                lead
            } else {
                lead + command_tail_len(content, depth > 0, false)
            }
        } else if is_word_char(c) {
            let end = rest
                .char_indices()
                .find(|(_, ch)| !is_word_char(*ch))
                .map_or(rest.len(), |(i, _)| i);
            let word = &rest[..end];
            if word.eq_ignore_ascii_case("WITH") {
                end + command_tail_len(&rest[end..], depth > 0, true)
            } else {
                let mapped = if positional { None } else { map(word) };
                positional = word.eq_ignore_ascii_case("INDEX") || word.eq_ignore_ascii_case("AT");
                if let Some(replacement) = mapped {
                    out.push_str(&replacement);
                    rest = &rest[end..];
                    continue;
                }
                end
            }
        } else {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            c.len_utf8()
        };
        out.push_str(&rest[..verbatim]);
        rest = &rest[verbatim..];
    }
    out
}

/// Byte length of the string literal opening `text`, through its closing
/// quote. An unterminated literal ends at the newline.
fn string_len(text: &str) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        match c {
            '\n' => return i,
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return i + 1,
            _ => {}
        }
    }
    text.len()
}

/// Byte length up to the end of the current command.
fn command_tail_len(text: &str, in_braces: bool, quoted: bool) -> usize {
    let mut i = 0usize;
    while let Some(c) = text[i..].chars().next() {
        if c == '\n' || (in_braces && matches!(c, ';' | '}')) {
            return i;
        }
        i += if quoted && c == '"' {
            string_len(&text[i..])
        } else {
            c.len_utf8()
        };
    }
    text.len()
}

// =============================================================================
// TESTS
// =============================================================================
