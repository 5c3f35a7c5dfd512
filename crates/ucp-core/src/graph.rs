//! # Content Graph
//!
//! The in-memory block tree plus typed edges.
//!
//! All containers are `BTreeMap`s for deterministic ordering. `structure`
//! holds one entry per block (leaves map to an empty list) and is kept in
//! lock-step with every `Block::children`: the two are only ever written
//! together.
//!
//! ## Tree invariants
//!
//! - The root always exists, is never deleted and has no parent
//! - Every non-root block reachable from root is listed under exactly one parent
//! - `structure` is acyclic: moves into self or a descendant are rejected
//!
//! Edge targets are never checked here; dangling edges are a validation
//! concern.

use crate::addressing::ContentAddressing;
use crate::block::{Block, BlockMetadata, SemanticRole};
use crate::content::Content;
use crate::edge::{Edge, EdgeType};
use crate::{BlockId, CustomValue, UcpError};
use std::collections::{BTreeMap, BTreeSet};

/// A tree of blocks with a single root.
#[derive(Debug, Clone)]
pub struct ContentGraph {
    root: BlockId,
    blocks: BTreeMap<BlockId, Block>,
    /// parent -> ordered children
    structure: BTreeMap<BlockId, Vec<BlockId>>,
    addressing: ContentAddressing,
}

impl Default for ContentGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentGraph {
    /// Create a graph holding only an empty root, with sequential ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_addressing(ContentAddressing::default())
    }

    /// Create a graph holding only an empty root, issuing ids with `addressing`.
    #[must_use]
    pub fn with_addressing(mut addressing: ContentAddressing) -> Self {
        let content = Content::default();
        // An empty id space never reports a collision.
        let root = addressing
            .allocate(&content, None, |_| false)
            .unwrap_or_else(|_| BlockId::from_suffix(1));
        let block = Block::new(root.clone(), content, BlockMetadata::default());
        Self {
            blocks: BTreeMap::from([(root.clone(), block)]),
            structure: BTreeMap::from([(root.clone(), Vec::new())]),
            root,
            addressing,
        }
    }

    /// Assemble a graph from raw parts without any checks.
    ///
    /// Used by deserializers; run the validation engine to find out what the
    /// parts break. Sequential allocation resumes past the highest
    /// well-formed id.
    #[must_use]
    pub fn from_parts(
        root: BlockId,
        blocks: BTreeMap<BlockId, Block>,
        structure: BTreeMap<BlockId, Vec<BlockId>>,
        mut addressing: ContentAddressing,
    ) -> Self {
        for id in blocks.keys() {
            addressing.observe(id);
        }
        Self {
            root,
            blocks,
            structure,
            addressing,
        }
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn root(&self) -> &BlockId {
        &self.root
    }

    #[must_use]
    pub fn blocks(&self) -> &BTreeMap<BlockId, Block> {
        &self.blocks
    }

    #[must_use]
    pub fn structure(&self) -> &BTreeMap<BlockId, Vec<BlockId>> {
        &self.structure
    }

    #[must_use]
    pub fn addressing(&self) -> &ContentAddressing {
        &self.addressing
    }

    #[must_use]
    pub fn get_block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Ordered children of `id`.
    pub fn children(&self, id: &BlockId) -> Result<&[BlockId], UcpError> {
        self.require(id)?;
        Ok(self.structure.get(id).map_or(&[][..], Vec::as_slice))
    }

    /// Parent of `id`, found by scanning `structure`. Root and orphans have none.
    #[must_use]
    pub fn parent(&self, id: &BlockId) -> Option<&BlockId> {
        self.structure
            .iter()
            .find(|(_, children)| children.contains(id))
            .map(|(parent, _)| parent)
    }

    /// Distance from root following parent links. `None` for orphans.
    #[must_use]
    pub fn depth(&self, id: &BlockId) -> Option<usize> {
        let mut depth = 0usize;
        let mut current = id;
        while current != &self.root {
            current = self.parent(current)?;
            depth += 1;
            if depth > self.blocks.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Number of levels below `id` (0 for a leaf).
    #[must_use]
    pub fn subtree_height(&self, id: &BlockId) -> usize {
        let mut height = 0usize;
        let mut seen = BTreeSet::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((current, level)) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            height = height.max(level);
            for child in self.structure.get(current).into_iter().flatten() {
                stack.push((child, level + 1));
            }
        }
        height
    }

    /// `id` and every transitive descendant, in pre-order.
    #[must_use]
    pub fn subtree(&self, id: &BlockId) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current.clone());
            for child in self.structure.get(current).into_iter().flatten().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Blocks reachable from root, in document order (pre-order).
    #[must_use]
    pub fn document_order(&self) -> Vec<BlockId> {
        self.subtree(&self.root)
            .into_iter()
            .filter(|id| self.blocks.contains_key(id))
            .collect()
    }

    /// Ids of blocks reachable from root.
    #[must_use]
    pub fn reachable(&self) -> BTreeSet<BlockId> {
        self.document_order().into_iter().collect()
    }

    /// Check whether `descendant` lies in the subtree below `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, descendant: &BlockId, ancestor: &BlockId) -> bool {
        descendant != ancestor && self.subtree(ancestor).contains(descendant)
    }

    // =========================================================================
    // BLOCK MUTATIONS
    // =========================================================================

    /// Append a new block under `parent` and return its id.
    pub fn add_block(
        &mut self,
        parent: &BlockId,
        content: Content,
        role: Option<SemanticRole>,
        label: Option<String>,
    ) -> Result<BlockId, UcpError> {
        self.add_block_at(parent, content, role, label, None)
    }

    /// Insert a new block under `parent` at `index` (append when `None` or past the end).
    pub fn add_block_at(
        &mut self,
        parent: &BlockId,
        content: Content,
        role: Option<SemanticRole>,
        label: Option<String>,
        index: Option<usize>,
    ) -> Result<BlockId, UcpError> {
        self.require(parent)?;
        let blocks = &self.blocks;
        let id = self
            .addressing
            .allocate(&content, role, |id| blocks.contains_key(id))?;

        let block = Block::new(id.clone(), content, BlockMetadata::new(role, label));
        self.blocks.insert(id.clone(), block);
        self.structure.insert(id.clone(), Vec::new());
        let children = self.structure.entry(parent.clone()).or_default();
        let at = index.map_or(children.len(), |i| i.min(children.len()));
        children.insert(at, id.clone());
        self.sync_children(parent);
        self.touch(parent);
        Ok(id)
    }

    /// Replace the content of a block in place.
    pub fn edit_block(&mut self, id: &BlockId, content: Content) -> Result<(), UcpError> {
        self.block_mut(id)?.replace_content(content);
        Ok(())
    }

    /// Delete a block, returning removed ids in post-order.
    ///
    /// Without `cascade` the block must be a leaf. Edges pointing at removed
    /// blocks are left in place.
    pub fn delete_block(&mut self, id: &BlockId, cascade: bool) -> Result<Vec<BlockId>, UcpError> {
        if id == &self.root {
            return Err(UcpError::InvalidOperation(
                "cannot delete the root block".to_string(),
            ));
        }
        let has_children = !self.children(id)?.is_empty();
        if has_children && !cascade {
            return Err(UcpError::InvalidOperation(format!(
                "block {id} has children; delete with cascade or move them first"
            )));
        }

        let removed = self.post_order(id);
        self.detach(id);
        for gone in &removed {
            self.blocks.remove(gone);
            self.structure.remove(gone);
        }
        Ok(removed)
    }

    /// Delete a single block and splice its children into its place.
    ///
    /// Returns the removed id. The root cannot be deleted this way, nor can
    /// a block that has no parent to inherit its children.
    pub fn delete_block_preserving_children(&mut self, id: &BlockId) -> Result<Vec<BlockId>, UcpError> {
        if id == &self.root {
            return Err(UcpError::InvalidOperation(
                "cannot delete the root block".to_string(),
            ));
        }
        let orphans = self.children(id)?.to_vec();
        let parent = self.parent(id).cloned().ok_or_else(|| {
            UcpError::InvalidOperation(format!("block {id} has no parent to inherit its children"))
        })?;

        let siblings = self.structure.entry(parent.clone()).or_default();
        if let Some(position) = siblings.iter().position(|c| c == id) {
            siblings.splice(position..=position, orphans);
        }
        self.blocks.remove(id);
        self.structure.remove(id);
        self.sync_children(&parent);
        self.touch(&parent);
        Ok(vec![id.clone()])
    }

    /// Move a block under `new_parent` at `index` (append when `None` or past the end).
    ///
    /// Within the same parent, `index` refers to the list without the moved block.
    pub fn move_block(
        &mut self,
        id: &BlockId,
        new_parent: &BlockId,
        index: Option<usize>,
    ) -> Result<(), UcpError> {
        self.check_move(id, new_parent)?;
        self.detach(id);
        let len = self.structure.get(new_parent).map_or(0, Vec::len);
        let at = index.map_or(len, |i| i.min(len));
        self.attach(id, new_parent, at);
        Ok(())
    }

    /// Move a block to sit directly before `anchor`.
    pub fn move_before(&mut self, id: &BlockId, anchor: &BlockId) -> Result<(), UcpError> {
        self.move_next_to(id, anchor, 0)
    }

    /// Move a block to sit directly after `anchor`.
    pub fn move_after(&mut self, id: &BlockId, anchor: &BlockId) -> Result<(), UcpError> {
        self.move_next_to(id, anchor, 1)
    }

    fn move_next_to(&mut self, id: &BlockId, anchor: &BlockId, offset: usize) -> Result<(), UcpError> {
        self.require(anchor)?;
        if anchor == id {
            return Err(UcpError::InvalidOperation(format!(
                "cannot position block {id} relative to itself"
            )));
        }
        if anchor == &self.root {
            return Err(UcpError::InvalidOperation(
                "cannot position a block next to the root".to_string(),
            ));
        }
        let parent = self.parent(anchor).cloned().ok_or_else(|| {
            UcpError::InvalidOperation(format!("anchor {anchor} has no parent"))
        })?;
        self.check_move(id, &parent)?;

        self.detach(id);
        let position = self
            .structure
            .get(&parent)
            .and_then(|children| children.iter().position(|c| c == anchor))
            .unwrap_or(0);
        self.attach(id, &parent, position + offset);
        Ok(())
    }

    /// Remove every block unreachable from root; returns removed ids in id order.
    pub fn prune_unreachable(&mut self) -> Vec<BlockId> {
        let reachable = self.reachable();
        let removed: Vec<BlockId> = self
            .blocks
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        for id in &removed {
            self.blocks.remove(id);
        }
        self.structure.retain(|id, _| reachable.contains(id));
        removed
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    /// Add an edge. Returns `false` if the same `(type, target)` already exists.
    pub fn add_edge(
        &mut self,
        source: &BlockId,
        edge_type: EdgeType,
        target: BlockId,
    ) -> Result<bool, UcpError> {
        self.add_edge_with(source, Edge::new(edge_type, target))
    }

    /// Add a fully built edge (metadata included).
    pub fn add_edge_with(&mut self, source: &BlockId, edge: Edge) -> Result<bool, UcpError> {
        let block = self.block_mut(source)?;
        if block.edges.iter().any(|e| e.same_relation(&edge)) {
            return Ok(false);
        }
        block.edges.push(edge);
        block.metadata.touch();
        Ok(true)
    }

    /// Remove an edge. Returns whether it existed.
    pub fn remove_edge(
        &mut self,
        source: &BlockId,
        edge_type: EdgeType,
        target: &BlockId,
    ) -> Result<bool, UcpError> {
        let block = self.block_mut(source)?;
        let before = block.edges.len();
        block
            .edges
            .retain(|e| !(e.edge_type == edge_type && &e.target == target));
        let removed = block.edges.len() != before;
        if removed {
            block.metadata.touch();
        }
        Ok(removed)
    }

    /// Outgoing edges of `source`.
    pub fn get_edges(&self, source: &BlockId) -> Result<&[Edge], UcpError> {
        Ok(self.require(source)?.edges.as_slice())
    }

    /// Check for an edge from `source` to `target`, optionally of one type.
    #[must_use]
    pub fn has_edge(&self, source: &BlockId, target: &BlockId, edge_type: Option<EdgeType>) -> bool {
        self.blocks
            .get(source)
            .is_some_and(|b| b.has_edge_to(target, edge_type))
    }

    /// Edges pointing at `target`, as `(source, edge)` pairs.
    #[must_use]
    pub fn incoming_edges(&self, target: &BlockId) -> Vec<(&BlockId, &Edge)> {
        self.blocks
            .values()
            .flat_map(|b| b.edges.iter().map(move |e| (&b.id, e)))
            .filter(|(_, e)| &e.target == target)
            .collect()
    }

    // =========================================================================
    // TAGS AND METADATA
    // =========================================================================

    /// Add a tag. Returns `false` if it was already present.
    pub fn add_tag(&mut self, id: &BlockId, tag: impl Into<String>) -> Result<bool, UcpError> {
        let block = self.block_mut(id)?;
        let added = block.metadata.tags.insert(tag.into());
        if added {
            block.metadata.touch();
        }
        Ok(added)
    }

    /// Remove a tag. Returns whether it was present.
    pub fn remove_tag(&mut self, id: &BlockId, tag: &str) -> Result<bool, UcpError> {
        let block = self.block_mut(id)?;
        let removed = block.metadata.tags.remove(tag);
        if removed {
            block.metadata.touch();
        }
        Ok(removed)
    }

    /// Ids of blocks carrying `tag` (full scan, id order).
    #[must_use]
    pub fn find_blocks_by_tag(&self, tag: &str) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|b| b.metadata.has_tag(tag))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Mutable metadata of a block; the block is touched.
    pub fn metadata_mut(&mut self, id: &BlockId) -> Result<&mut BlockMetadata, UcpError> {
        let block = self.block_mut(id)?;
        block.metadata.touch();
        Ok(&mut block.metadata)
    }

    pub fn set_role(&mut self, id: &BlockId, role: Option<SemanticRole>) -> Result<(), UcpError> {
        self.metadata_mut(id)?.semantic_role = role;
        Ok(())
    }

    pub fn set_label(&mut self, id: &BlockId, label: Option<String>) -> Result<(), UcpError> {
        self.metadata_mut(id)?.label = label;
        Ok(())
    }

    pub fn set_custom(
        &mut self,
        id: &BlockId,
        key: impl Into<String>,
        value: impl Into<CustomValue>,
    ) -> Result<(), UcpError> {
        self.block_mut(id)?.set_custom(key, value);
        Ok(())
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require(&self, id: &BlockId) -> Result<&Block, UcpError> {
        self.blocks
            .get(id)
            .ok_or_else(|| UcpError::NotFound(id.clone()))
    }

    pub(crate) fn block_mut(&mut self, id: &BlockId) -> Result<&mut Block, UcpError> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| UcpError::NotFound(id.clone()))
    }

    fn touch(&mut self, id: &BlockId) {
        if let Some(block) = self.blocks.get_mut(id) {
            block.metadata.touch();
        }
    }

    /// Copy the structure entry of `parent` into its block.
    fn sync_children(&mut self, parent: &BlockId) {
        let children = self.structure.get(parent).cloned().unwrap_or_default();
        if let Some(block) = self.blocks.get_mut(parent) {
            block.children = children;
        }
    }

    /// Unlink `id` from whatever parent lists it.
    fn detach(&mut self, id: &BlockId) {
        if let Some(parent) = self.parent(id).cloned() {
            if let Some(children) = self.structure.get_mut(&parent) {
                children.retain(|c| c != id);
            }
            self.sync_children(&parent);
            self.touch(&parent);
        }
    }

    fn attach(&mut self, id: &BlockId, parent: &BlockId, index: usize) {
        let children = self.structure.entry(parent.clone()).or_default();
        let at = index.min(children.len());
        children.insert(at, id.clone());
        self.sync_children(parent);
        self.touch(parent);
        self.touch(id);
    }

    fn check_move(&self, id: &BlockId, new_parent: &BlockId) -> Result<(), UcpError> {
        self.require(id)?;
        self.require(new_parent)?;
        if id == &self.root {
            return Err(UcpError::InvalidOperation(
                "cannot move the root block".to_string(),
            ));
        }
        if id == new_parent {
            return Err(UcpError::InvalidOperation(format!(
                "cannot move block {id} into itself"
            )));
        }
        if self.is_descendant(new_parent, id) {
            return Err(UcpError::InvalidOperation(format!(
                "cannot move block {id} into its descendant {new_parent}"
            )));
        }
        Ok(())
    }

    /// Subtree of `id` with children before their parent.
    fn post_order(&self, id: &BlockId) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![(id.clone(), false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.push((current.clone(), true));
            for child in self.structure.get(&current).into_iter().flatten().rev() {
                stack.push((child.clone(), false));
            }
        }
        order
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Content {
        Content::text(s)
    }

    /// root -> a -> b -> c, root -> d
    fn sample() -> (ContentGraph, BlockId, BlockId, BlockId, BlockId) {
        let mut g = ContentGraph::new();
        let root = g.root().clone();
        let a = g.add_block(&root, text("a"), None, None).expect("a");
        let b = g.add_block(&a, text("b"), None, None).expect("b");
        let c = g.add_block(&b, text("c"), None, None).expect("c");
        let d = g.add_block(&root, text("d"), None, None).expect("d");
        (g, a, b, c, d)
    }

    fn assert_lockstep(g: &ContentGraph) {
        for block in g.blocks().values() {
            let indexed = g.structure().get(&block.id).cloned().unwrap_or_default();
            assert_eq!(block.children(), indexed.as_slice(), "lock-step for {}", block.id);
        }
    }

    #[test]
    fn new_graph_has_only_root() {
        let g = ContentGraph::new();
        assert_eq!(g.block_count(), 1);
        assert_eq!(g.root().as_str(), "blk_000000000001");
        assert!(g.parent(g.root()).is_none());
    }

    #[test]
    fn add_block_appends_in_order() {
        let (g, a, _, _, d) = sample();
        assert_eq!(g.block_count(), 5);
        assert_eq!(g.children(g.root()).expect("children"), &[a.clone(), d]);
        assert_eq!(g.parent(&a), Some(g.root()));
        assert_lockstep(&g);
    }

    #[test]
    fn add_block_to_missing_parent_fails() {
        let mut g = ContentGraph::new();
        let err = g
            .add_block(&BlockId::new("missing"), text("x"), None, None)
            .expect_err("missing parent");
        assert!(matches!(err, UcpError::NotFound(_)));
        assert_eq!(g.block_count(), 1);
    }

    #[test]
    fn delete_root_is_rejected() {
        let mut g = ContentGraph::new();
        let root = g.root().clone();
        assert!(matches!(
            g.delete_block(&root, true),
            Err(UcpError::InvalidOperation(_))
        ));
    }

    #[test]
    fn delete_non_leaf_requires_cascade() {
        let (mut g, a, b, c, _) = sample();
        assert!(matches!(
            g.delete_block(&a, false),
            Err(UcpError::InvalidOperation(_))
        ));
        let removed = g.delete_block(&a, true).expect("cascade");
        assert_eq!(removed, vec![c, b, a.clone()]);
        assert_eq!(g.block_count(), 2);
        assert!(!g.structure().contains_key(&a));
        assert_lockstep(&g);
    }

    #[test]
    fn add_block_at_inserts_and_clamps() {
        let (mut g, a, _, _, d) = sample();
        let root = g.root().clone();
        let first = g.add_block_at(&root, text("first"), None, None, Some(0)).expect("first");
        let last = g.add_block_at(&root, text("last"), None, None, Some(99)).expect("last");
        assert_eq!(g.children(&root).expect("children"), &[first, a, d, last]);
        assert_lockstep(&g);
    }

    #[test]
    fn delete_preserving_children_splices_in_place() {
        let (mut g, a, b, c, d) = sample();
        let removed = g.delete_block_preserving_children(&b).expect("delete");
        assert_eq!(removed, vec![b.clone()]);
        assert!(!g.contains(&b));
        assert_eq!(g.children(&a).expect("children"), &[c.clone()]);
        assert_eq!(g.parent(&c), Some(&a));

        let e = g.add_block(&a, text("e"), None, None).expect("e");
        g.delete_block_preserving_children(&a).expect("delete a");
        assert_eq!(g.children(g.root()).expect("children"), &[c, e, d]);
        assert_eq!(g.block_count(), 4);
        assert_lockstep(&g);

        let root = g.root().clone();
        assert!(matches!(
            g.delete_block_preserving_children(&root),
            Err(UcpError::InvalidOperation(_))
        ));
    }

    #[test]
    fn move_into_descendant_or_self_is_rejected() {
        let (mut g, a, _, c, _) = sample();
        assert!(matches!(
            g.move_block(&a, &c, None),
            Err(UcpError::InvalidOperation(_))
        ));
        assert!(matches!(
            g.move_block(&a, &a, None),
            Err(UcpError::InvalidOperation(_))
        ));
        let root = g.root().clone();
        assert!(matches!(
            g.move_block(&root, &a, None),
            Err(UcpError::InvalidOperation(_))
        ));
    }

    #[test]
    fn move_block_reparents_and_clamps_index() {
        let (mut g, a, _, c, d) = sample();
        g.move_block(&c, &d, Some(99)).expect("move");
        assert_eq!(g.parent(&c), Some(&d));
        g.move_block(&c, &a, Some(0)).expect("move");
        assert_eq!(g.children(&a).expect("children")[0], c);
        assert_lockstep(&g);
    }

    #[test]
    fn move_before_and_after_anchor() {
        let (mut g, a, _, c, d) = sample();
        let root = g.root().clone();
        g.move_before(&c, &d).expect("before");
        assert_eq!(g.children(&root).expect("children"), &[a.clone(), c.clone(), d.clone()]);
        g.move_after(&a, &d).expect("after");
        assert_eq!(g.children(&root).expect("children"), &[c.clone(), d, a]);
        assert!(g.move_before(&c, &root).is_err());
        assert!(g.move_before(&c, &c).is_err());
        assert_lockstep(&g);
    }

    #[test]
    fn edges_are_idempotent_and_removable() {
        let (mut g, a, b, _, _) = sample();
        assert!(g.add_edge(&a, EdgeType::References, b.clone()).expect("add"));
        assert!(!g.add_edge(&a, EdgeType::References, b.clone()).expect("dup"));
        assert!(g.has_edge(&a, &b, None));
        assert!(g.has_edge(&a, &b, Some(EdgeType::References)));
        assert!(!g.has_edge(&a, &b, Some(EdgeType::Supports)));
        assert_eq!(g.incoming_edges(&b).len(), 1);
        assert!(g.remove_edge(&a, EdgeType::References, &b).expect("remove"));
        assert!(!g.remove_edge(&a, EdgeType::References, &b).expect("again"));
        assert!(g.get_edges(&a).expect("edges").is_empty());
    }

    #[test]
    fn tags_are_set_semantics() {
        let (mut g, a, b, _, _) = sample();
        assert!(g.add_tag(&a, "draft").expect("tag"));
        assert!(!g.add_tag(&a, "draft").expect("tag"));
        g.add_tag(&b, "draft").expect("tag");
        assert_eq!(g.find_blocks_by_tag("draft"), vec![a.clone(), b]);
        assert!(g.remove_tag(&a, "draft").expect("untag"));
        assert_eq!(g.find_blocks_by_tag("draft").len(), 1);
    }

    #[test]
    fn prune_removes_unreachable_blocks() {
        let (g, a, b, c, d) = sample();
        let mut blocks = g.blocks().clone();
        let mut structure = g.structure().clone();
        // Cut `a` loose from root.
        if let Some(children) = structure.get_mut(g.root()) {
            children.retain(|id| id != &a);
        }
        if let Some(root_block) = blocks.get_mut(g.root()) {
            root_block.children = vec![d.clone()];
        }
        let mut cut = ContentGraph::from_parts(
            g.root().clone(),
            blocks,
            structure,
            ContentAddressing::default(),
        );
        let removed = cut.prune_unreachable();
        assert_eq!(removed.len(), 3);
        assert!(removed.contains(&a) && removed.contains(&b) && removed.contains(&c));
        assert_eq!(cut.block_count(), 2);
    }

    #[test]
    fn depth_and_height() {
        let (g, a, _, c, _) = sample();
        assert_eq!(g.depth(g.root()), Some(0));
        assert_eq!(g.depth(&c), Some(3));
        assert_eq!(g.subtree_height(&a), 2);
        assert_eq!(g.subtree_height(&c), 0);
    }

    #[test]
    fn from_parts_resumes_allocation() {
        let (g, ..) = sample();
        let mut copy = ContentGraph::from_parts(
            g.root().clone(),
            g.blocks().clone(),
            g.structure().clone(),
            ContentAddressing::default(),
        );
        let root = copy.root().clone();
        let id = copy.add_block(&root, text("e"), None, None).expect("add");
        assert_eq!(id, BlockId::from_suffix(6));
    }
}
