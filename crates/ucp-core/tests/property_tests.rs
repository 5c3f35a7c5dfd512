//! # Property-Based Tests
//!
//! Structural invariants that must hold for any sequence of operations.

use proptest::collection::vec;
use proptest::prelude::*;
use ucp_core::ucl::{Command, escape, parse};
use ucp_core::{BlockId, Content, ContentGraph, EdgeType, IdMapper, UcpError, ValidationEngine};

/// One random tree operation; indices are taken modulo the live block count.
#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Delete(usize, bool),
    Move(usize, usize, Option<usize>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(Op::Add),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(a, c)| Op::Delete(a, c)),
        2 => (any::<usize>(), any::<usize>(), proptest::option::of(0usize..5))
            .prop_map(|(a, b, i)| Op::Move(a, b, i)),
    ]
}

fn pick(graph: &ContentGraph, index: usize) -> BlockId {
    let ids: Vec<&BlockId> = graph.blocks().keys().collect();
    ids[index % ids.len()].clone()
}

/// A tree of `parents.len() + 1` blocks; block i+1 hangs under a random earlier block.
fn random_tree(parents: &[usize]) -> (ContentGraph, Vec<BlockId>) {
    let mut graph = ContentGraph::new();
    let mut ids = vec![graph.root().clone()];
    for (n, parent) in parents.iter().enumerate() {
        let parent = ids[parent % ids.len()].clone();
        let id = graph
            .add_block(&parent, Content::text(format!("block {n}")), None, None)
            .expect("add");
        ids.push(id);
    }
    (graph, ids)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any mix of add/delete/move keeps a valid single-rooted tree.
    #[test]
    fn tree_invariant_survives_random_mutation(ops in vec(op(), 1..60)) {
        let mut graph = ContentGraph::new();
        let validator = ValidationEngine::default();

        for op in ops {
            match op {
                Op::Add(parent) => {
                    let parent = pick(&graph, parent);
                    graph.add_block(&parent, Content::text("x"), None, None).expect("add");
                }
                Op::Delete(target, cascade) => {
                    let target = pick(&graph, target);
                    let _ = graph.delete_block(&target, cascade);
                }
                Op::Move(target, parent, index) => {
                    let target = pick(&graph, target);
                    let parent = pick(&graph, parent);
                    let _ = graph.move_block(&target, &parent, index);
                }
            }

            let result = validator.validate(&graph);
            prop_assert!(result.valid, "{:?}", result.issues);
            prop_assert_eq!(graph.reachable().len(), graph.block_count());
            prop_assert!(graph.blocks().contains_key(graph.root()));
        }
    }

    /// Moving a block under its own descendant is always rejected and changes nothing.
    #[test]
    fn move_into_descendant_rejected(depth in 2usize..12, a in any::<usize>(), b in any::<usize>()) {
        let (mut graph, ids) = random_tree(&(0..depth).collect::<Vec<_>>());
        // ids form a chain: root -> 1 -> 2 -> ... -> depth
        let upper = 1 + a % (depth - 1);
        let lower = upper + 1 + b % (depth - upper);
        let before = graph.structure().clone();

        let result = graph.move_block(&ids[upper], &ids[lower], None);
        prop_assert!(matches!(result, Err(UcpError::InvalidOperation(_))));
        prop_assert_eq!(graph.structure(), &before);
    }

    /// inverse() is an involution over every edge type.
    #[test]
    fn edge_inverse_is_involution(edge_type in proptest::sample::select(EdgeType::ALL.to_vec())) {
        prop_assert_eq!(edge_type.inverse().inverse(), edge_type);
        if edge_type.is_symmetric() {
            prop_assert_eq!(edge_type.inverse(), edge_type);
        }
    }

    /// The mapper is a bijection and shorten/expand round-trips command text,
    /// leaving ids in strings and raw content untouched in both directions.
    #[test]
    fn mapper_bijection(
        parents in vec(any::<usize>(), 0..40),
        a in any::<usize>(),
        b in any::<usize>(),
        note in "[a-z0-9 ]{0,12}"
    ) {
        let (graph, ids) = random_tree(&parents);
        let mapper = IdMapper::from_graph(&graph);

        prop_assert_eq!(mapper.len(), graph.block_count());
        for id in &ids {
            let short = mapper.get_short(id).expect("short id");
            prop_assert_eq!(mapper.get_full(short), Some(id));
        }

        let source = &ids[a % ids.len()];
        let target = &ids[b % ids.len()];
        let text = format!(
            "LINK {source} references {target} WITH note=\"{target}\"\n\
             MOVE {source} TO {target} INDEX 2\n\
             EDIT {source} SET text = \"see {target} {note}\"\n\
             APPEND {source} AT 1 :: raw {target} {note}\n\
             ATOMIC {{ APPEND {target} :: {source}; DELETE {source} }}"
        );
        let short = mapper.shorten(&text);
        let quoted = format!("\"see {target} {note}\"");
        let raw = format!(":: raw {target} {note}");
        prop_assert!(short.contains(&quoted));
        prop_assert!(short.contains(&raw));
        prop_assert_eq!(mapper.expand(&short), text);
    }

    /// escape() and the parser form a round-trip pair.
    #[test]
    fn escape_roundtrip(value in "[a-zA-Z0-9 \n\t\r\"\\\\{};:=,/]{0,40}") {
        let source = format!("EDIT blk_000000000001 SET text = \"{}\"", escape(&value));
        let statements = parse(&source).expect("parse");
        prop_assert_eq!(statements.len(), 1);
        let parsed = match &statements[0].command {
            Command::Edit { value, .. } => Some(value.clone()),
            _ => None,
        };
        prop_assert_eq!(parsed, Some(value));
    }
}
