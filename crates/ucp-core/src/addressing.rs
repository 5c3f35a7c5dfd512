//! # Content Addressing
//!
//! Issues block identifiers for a single graph.
//!
//! Two policies are available and a graph uses exactly one of them:
//!
//! - `Sequential` (default): a per-graph counter encoded as
//!   `blk_` + 12 lowercase hex digits. Unique within the graph, not
//!   reproducible across runs.
//! - `ContentAddressed`: the first 6 bytes of a BLAKE3 digest over the
//!   content kind, canonical content text and semantic role. The same
//!   `(content, role)` pair always derives the same id.
//!
//! Both policies skip ids already present in the graph. Content-addressed
//! collisions are resolved by hashing again with an incrementing salt.

use crate::block::SemanticRole;
use crate::content::Content;
use crate::primitives::{ID_HEX_WIDTH, ID_PREFIX, MAX_SEQUENTIAL_ID};
use crate::{BlockId, UcpError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Identifier allocation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    #[default]
    Sequential,
    ContentAddressed,
}

/// Id allocator owned by one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAddressing {
    policy: IdPolicy,
    /// Next sequential suffix to try.
    next: u64,
}

impl Default for ContentAddressing {
    fn default() -> Self {
        Self::new(IdPolicy::Sequential)
    }
}

impl ContentAddressing {
    /// Create an allocator for the given policy.
    #[must_use]
    pub fn new(policy: IdPolicy) -> Self {
        Self { policy, next: 1 }
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> IdPolicy {
        self.policy
    }

    /// Derive the content-addressed id for `(content, role)`.
    ///
    /// Pure: no allocator state is read or written.
    #[must_use]
    pub fn derive(content: &Content, role: Option<SemanticRole>) -> BlockId {
        Self::derive_salted(content, role, 0)
    }

    fn derive_salted(content: &Content, role: Option<SemanticRole>, salt: u64) -> BlockId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content.content_type().as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_text().as_bytes());
        hasher.update(&[0]);
        hasher.update(role.map_or("", SemanticRole::as_str).as_bytes());
        if salt > 0 {
            hasher.update(&[0]);
            hasher.update(&salt.to_le_bytes());
        }
        let digest = hasher.finalize();

        let mut id = String::with_capacity(ID_PREFIX.len() + ID_HEX_WIDTH);
        id.push_str(ID_PREFIX);
        for byte in &digest.as_bytes()[..ID_HEX_WIDTH / 2] {
            // Writing into a String cannot fail.
            let _ = write!(id, "{byte:02x}");
        }
        BlockId::new(id)
    }

    /// Issue a fresh id that `is_taken` reports as free.
    pub fn allocate(
        &mut self,
        content: &Content,
        role: Option<SemanticRole>,
        is_taken: impl Fn(&BlockId) -> bool,
    ) -> Result<BlockId, UcpError> {
        let id = match self.policy {
            IdPolicy::Sequential => loop {
                if self.next > MAX_SEQUENTIAL_ID {
                    return Err(UcpError::InvalidOperation(
                        "sequential id space exhausted".to_string(),
                    ));
                }
                let candidate = BlockId::from_suffix(self.next);
                self.next = self.next.saturating_add(1);
                if !is_taken(&candidate) {
                    break candidate;
                }
            },
            IdPolicy::ContentAddressed => {
                let mut salt = 0u64;
                loop {
                    let candidate = Self::derive_salted(content, role, salt);
                    if !is_taken(&candidate) {
                        break candidate;
                    }
                    salt = salt.saturating_add(1);
                }
            }
        };
        tracing::trace!(id = %id, policy = ?self.policy, "allocated block id");
        Ok(id)
    }

    /// Make sure future sequential ids start after `id`, if it is well-formed.
    pub fn observe(&mut self, id: &BlockId) {
        if let Some(value) = id.suffix_value() {
            self.next = self.next.max(value.saturating_add(1));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn sequential_starts_at_one() {
        let mut addressing = ContentAddressing::default();
        let content = Content::text("x");
        let a = addressing.allocate(&content, None, |_| false).expect("a");
        let b = addressing.allocate(&content, None, |_| false).expect("b");
        assert_eq!(a.as_str(), "blk_000000000001");
        assert_eq!(b.as_str(), "blk_000000000002");
    }

    #[test]
    fn sequential_skips_taken_ids() {
        let mut addressing = ContentAddressing::default();
        let taken: BTreeSet<BlockId> = [BlockId::from_suffix(1), BlockId::from_suffix(2)].into();
        let id = addressing
            .allocate(&Content::text("x"), None, |id| taken.contains(id))
            .expect("allocate");
        assert_eq!(id, BlockId::from_suffix(3));
    }

    #[test]
    fn observe_resumes_past_imported_ids() {
        let mut addressing = ContentAddressing::default();
        addressing.observe(&BlockId::from_suffix(0x41));
        addressing.observe(&BlockId::new("foreign"));
        let id = addressing
            .allocate(&Content::text("x"), None, |_| false)
            .expect("allocate");
        assert_eq!(id, BlockId::from_suffix(0x42));
    }

    #[test]
    fn derive_is_deterministic_and_role_sensitive() {
        let content = Content::text("Introduction");
        let a = ContentAddressing::derive(&content, Some(SemanticRole::Heading1));
        let b = ContentAddressing::derive(&content, Some(SemanticRole::Heading1));
        let c = ContentAddressing::derive(&content, Some(SemanticRole::Paragraph));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_well_formed());
    }

    #[test]
    fn derive_distinguishes_content_kind() {
        let text = ContentAddressing::derive(&Content::text("x = 1"), None);
        let math = ContentAddressing::derive(&Content::math("x = 1"), None);
        assert_ne!(text, math);
    }

    #[test]
    fn content_addressed_salts_on_collision() {
        let mut addressing = ContentAddressing::new(IdPolicy::ContentAddressed);
        let content = Content::text("same");
        let first = ContentAddressing::derive(&content, None);
        let second = addressing
            .allocate(&content, None, |id| id == &first)
            .expect("allocate");
        assert_ne!(first, second);
        assert!(second.is_well_formed());
    }
}
