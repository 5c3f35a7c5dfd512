//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Identity and Addressing
//! - T1: Tree Mutation
//! - T2: Validation
//! - T3: UCL
//! - T4: Id Virtualization

use ucp_core::{
    BlockId, Content, ContentGraph, EdgeType, IdMapper, LongIdsOnly, SemanticRole, UcpError,
    UclExecutor, ValidationEngine,
};

/// root -> intro -> (para, code); root -> outro
fn document() -> (ContentGraph, [BlockId; 4]) {
    let mut graph = ContentGraph::new();
    let root = graph.root().clone();
    let intro = graph
        .add_block(&root, Content::text("Introduction"), Some(SemanticRole::Heading1), None)
        .expect("intro");
    let para = graph
        .add_block(&intro, Content::text("First paragraph."), Some(SemanticRole::Paragraph), None)
        .expect("para");
    let code = graph
        .add_block(&intro, Content::code("rust", "let x = 1;"), None, None)
        .expect("code");
    let outro = graph
        .add_block(&root, Content::text("The end."), Some(SemanticRole::Conclusion), None)
        .expect("outro");
    (graph, [intro, para, code, outro])
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// TIER T0: IDENTITY AND ADDRESSING
// =============================================================================

mod t0_identity {
    use super::*;
    use ucp_core::{ContentAddressing, IdPolicy};

    /// T0.1: Sequential ids start at 1 and are well-formed.
    #[test]
    fn sequential_ids_are_well_formed() {
        let (graph, [intro, ..]) = document();
        assert_eq!(graph.root().as_str(), "blk_000000000001");
        assert_eq!(intro.as_str(), "blk_000000000002");
        assert!(graph.blocks().keys().all(BlockId::is_well_formed));
    }

    /// T0.2: Two graphs never share allocation state.
    #[test]
    fn graphs_allocate_independently() {
        let (first, ids) = document();
        let (second, other_ids) = document();
        assert_eq!(ids, other_ids);
        assert_eq!(first.block_count(), second.block_count());
    }

    /// T0.3: Content-addressed derivation is a pure function of (content, role).
    #[test]
    fn derivation_is_deterministic() {
        let content = Content::text("same");
        let a = ContentAddressing::derive(&content, Some(SemanticRole::Paragraph));
        let b = ContentAddressing::derive(&content, Some(SemanticRole::Paragraph));
        let c = ContentAddressing::derive(&content, Some(SemanticRole::Quote));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_well_formed());
    }

    /// T0.4: Content-addressed graphs never alias an existing block.
    #[test]
    fn content_addressed_duplicates_get_fresh_ids() {
        let mut graph = ContentGraph::with_addressing(ContentAddressing::new(IdPolicy::ContentAddressed));
        let root = graph.root().clone();
        let first = graph
            .add_block(&root, Content::text("dup"), None, None)
            .expect("first");
        let second = graph
            .add_block(&root, Content::text("dup"), None, None)
            .expect("second");
        assert_eq!(first, ContentAddressing::derive(&Content::text("dup"), None));
        assert_ne!(first, second);
        assert!(second.is_well_formed());
        assert_eq!(graph.block_count(), 3);
    }
}

// =============================================================================
// TIER T1: TREE MUTATION
// =============================================================================

mod t1_tree_mutation {
    use super::*;

    /// T1.1: Root cannot be deleted.
    #[test]
    fn root_is_protected() {
        let (mut graph, _) = document();
        let root = graph.root().clone();
        let result = graph.delete_block(&root, true);
        assert!(matches!(result, Err(UcpError::InvalidOperation(_))));
    }

    /// T1.2: Non-leaf delete requires cascade; cascade removes in post-order.
    #[test]
    fn cascade_delete_is_post_order() {
        let (mut graph, [intro, para, code, _]) = document();
        assert!(matches!(
            graph.delete_block(&intro, false),
            Err(UcpError::InvalidOperation(_))
        ));
        let removed = graph.delete_block(&intro, true).expect("cascade");
        assert_eq!(removed, vec![para, code, intro]);
        assert_eq!(graph.block_count(), 2);
    }

    /// T1.3: A block cannot move into itself or its subtree.
    #[test]
    fn move_into_descendant_rejected() {
        let (mut graph, [intro, para, ..]) = document();
        let before = graph.structure().clone();
        assert!(graph.move_block(&intro, &para, None).is_err());
        assert!(graph.move_block(&intro, &intro, None).is_err());
        assert_eq!(graph.structure(), &before);
    }

    /// T1.4: Index past the end appends; before/after place next to the anchor.
    #[test]
    fn move_positions() {
        let (mut graph, [intro, para, code, outro]) = document();
        graph.move_block(&outro, &intro, Some(99)).expect("move");
        assert_eq!(graph.children(&intro).expect("children"), &[para.clone(), code.clone(), outro.clone()]);
        graph.move_before(&outro, &para).expect("before");
        assert_eq!(graph.children(&intro).expect("children"), &[outro.clone(), para.clone(), code.clone()]);
        graph.move_after(&outro, &code).expect("after");
        assert_eq!(graph.children(&intro).expect("children"), &[para, code, outro.clone()]);
        assert_eq!(graph.parent(&outro), Some(&intro));
    }

    /// T1.5: Edges are idempotent and survive as dangling after a delete.
    #[test]
    fn edges_dangle_after_delete() {
        let (mut graph, [_, para, code, outro]) = document();
        assert!(graph.add_edge(&outro, EdgeType::References, para.clone()).expect("edge"));
        assert!(!graph.add_edge(&outro, EdgeType::References, para.clone()).expect("dup"));
        graph.delete_block(&para, false).expect("delete");
        assert_eq!(graph.get_edges(&outro).expect("edges").len(), 1);
        assert!(graph.incoming_edges(&code).is_empty());
    }
}

// =============================================================================
// TIER T2: VALIDATION
// =============================================================================

mod t2_validation {
    use super::*;
    use ucp_core::{ResourceLimits, SerializableGraph, ValidationSeverity};

    /// T2.1: A freshly built document is valid.
    #[test]
    fn built_documents_are_valid() {
        let (graph, _) = document();
        let result = ValidationEngine::default().validate(&graph);
        assert!(result.valid, "{:?}", result.issues);
    }

    /// T2.2: Orphans are warnings; they do not invalidate.
    #[test]
    fn orphan_is_a_warning() {
        let (graph, [_, _, _, outro]) = document();
        let mut parts = SerializableGraph::from(&graph);
        let root = parts.root.clone();
        for record in &mut parts.blocks {
            if record.id == root {
                record.children.retain(|c| c != &outro);
            }
        }
        let broken = ContentGraph::try_from(parts).expect("import");
        let result = ValidationEngine::default().validate(&broken);
        assert!(result.valid);
        assert!(result.has_code("E203"));
    }

    /// T2.3: A cycle is an error.
    #[test]
    fn cycle_is_an_error() {
        let (graph, [intro, para, ..]) = document();
        let mut parts = SerializableGraph::from(&graph);
        for record in &mut parts.blocks {
            if record.id == para {
                record.children.push(intro.clone());
            }
        }
        let broken = ContentGraph::try_from(parts).expect("import");
        let result = ValidationEngine::default().validate(&broken);
        assert!(!result.valid);
        assert!(result.has_code("E201"));
    }

    /// T2.4: Limits become errors.
    #[test]
    fn limits_are_errors() {
        let (graph, _) = document();
        let limits = ResourceLimits {
            max_block_count: Some(2),
            max_depth: Some(1),
            ..ResourceLimits::default()
        };
        let result = ValidationEngine::new(limits).validate(&graph);
        assert!(!result.valid);
        assert!(result.has_code("E401"));
        assert!(result.has_code("E403"));
    }

    /// T2.5: Dangling-edge severity is configurable but never an error.
    #[test]
    fn dangling_edge_severity() {
        let (mut graph, [_, para, _, outro]) = document();
        graph.add_edge(&outro, EdgeType::References, para.clone()).expect("edge");
        graph.delete_block(&para, false).expect("delete");

        let info = ValidationEngine::default()
            .with_dangling_edge_severity(ValidationSeverity::Info)
            .validate(&graph);
        assert!(info.valid);
        assert_eq!(info.infos().filter(|i| i.code == "E205").count(), 1);

        let error = ValidationEngine::default()
            .with_dangling_edge_severity(ValidationSeverity::Error)
            .validate(&graph);
        assert!(error.valid);
        assert_eq!(error.warnings().filter(|i| i.code == "E205").count(), 1);
    }

    /// T2.6: A graph whose root is gone is invalid, whatever else survives.
    #[test]
    fn missing_root_is_an_error() {
        let (graph, _) = document();
        let root = graph.root().clone();
        let mut blocks = graph.blocks().clone();
        let mut structure = graph.structure().clone();
        blocks.remove(&root);
        structure.remove(&root);

        let broken =
            ContentGraph::from_parts(root.clone(), blocks, structure, graph.addressing().clone());
        assert!(!broken.contains(&root));
        let result = ValidationEngine::default().validate(&broken);
        assert!(!result.valid);
        assert!(
            result
                .errors()
                .any(|i| i.code == "E001" && i.block_id.as_ref() == Some(&root))
        );
    }
}

// =============================================================================
// TIER T3: UCL
// =============================================================================

mod t3_ucl {
    use super::*;
    use ucp_core::{ErrorKind, graph_to_json};

    /// T3.1: A syntax error anywhere fails the whole program before any change.
    #[test]
    fn syntax_error_applies_nothing() {
        init_tracing();
        let (mut graph, [intro, ..]) = document();
        let before = graph_to_json(&graph).expect("json");
        let source = format!("EDIT {intro} SET text = \"changed\"\nFROB {intro}");
        let err = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect_err("syntax");
        assert!(matches!(err, UcpError::Syntax { line: 2, .. }));
        assert_eq!(graph_to_json(&graph).expect("json"), before);
    }

    /// T3.2: A failing ATOMIC batch leaves the graph byte-for-byte unchanged.
    #[test]
    fn failed_atomic_batch_is_invisible() {
        init_tracing();
        let (mut graph, [intro, para, ..]) = document();
        let before = graph_to_json(&graph).expect("json");
        let source = format!(
            "ATOMIC {{\n  APPEND {intro} :: \"new\"\n  EDIT {para} SET text = \"x\"\n  MOVE {intro} TO {para}\n}}"
        );
        let result = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect("execute");
        assert!(!result.success);
        assert_eq!(result.commands_applied, 0);
        assert!(result.created_blocks.is_empty());
        assert_eq!(result.errors[0].line, 4);
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidOperation);
        assert_eq!(graph_to_json(&graph).expect("json"), before);
    }

    /// T3.3: Independent batches commit around a failure.
    #[test]
    fn sibling_batches_are_independent() {
        let (mut graph, [intro, para, code, outro]) = document();
        let source = format!(
            "EDIT {para} SET label = \"first\"\nDELETE {intro}\nATOMIC {{ LINK {code} references {para}; MOVE {outro} BEFORE {intro} }}"
        );
        let result = UclExecutor::new()
            .execute(&mut graph, &source, &LongIdsOnly)
            .expect("execute");
        assert_eq!(result.batches_applied, 2);
        assert_eq!(result.batches_failed, 1);
        assert_eq!(result.commands_applied, 3);
        assert_eq!(result.errors[0].batch, 1);
        assert_eq!(graph.get_block(&para).expect("para").metadata.label.as_deref(), Some("first"));
        assert!(graph.has_edge(&code, &para, Some(EdgeType::References)));
        let root = graph.root().clone();
        assert_eq!(graph.children(&root).expect("children"), &[outro, intro]);
    }

    /// T3.4: Edits keep the content kind.
    #[test]
    fn edit_keeps_content_kind() {
        let (mut graph, [_, _, code, _]) = document();
        UclExecutor::new()
            .execute(&mut graph, &format!("EDIT {code} SET \"let y = 2;\""), &LongIdsOnly)
            .expect("execute");
        assert_eq!(
            graph.get_block(&code).expect("code").content,
            Content::code("rust", "let y = 2;")
        );
    }
}

// =============================================================================
// TIER T4: ID VIRTUALIZATION
// =============================================================================

mod t4_id_virtualization {
    use super::*;

    /// T4.1: Root is 1, then document order.
    #[test]
    fn numbering_follows_document_order() {
        let (graph, [intro, para, code, outro]) = document();
        let mapper = IdMapper::from_graph(&graph);
        assert_eq!(mapper.get_short(graph.root()), Some(1));
        assert_eq!(mapper.get_short(&intro), Some(2));
        assert_eq!(mapper.get_short(&para), Some(3));
        assert_eq!(mapper.get_short(&code), Some(4));
        assert_eq!(mapper.get_short(&outro), Some(5));
        assert_eq!(mapper.len(), graph.block_count());
    }

    /// T4.2: Shorten then expand is the identity for command text.
    #[test]
    fn shorten_expand_identity() {
        let (graph, [intro, para, ..]) = document();
        let mapper = IdMapper::from_graph(&graph);
        let text = format!("MOVE {para} TO {intro} INDEX 3\nEDIT {intro} SET text = \"see 4\"");
        let short = mapper.shorten(&text);
        assert_eq!(short, "MOVE 3 TO 2 INDEX 3\nEDIT 2 SET text = \"see 4\"");
        assert_eq!(mapper.expand(&short), text);
    }

    /// T4.3: Short ids drive the executor; unknown ones fail up front.
    #[test]
    fn executor_uses_short_ids() {
        let (mut graph, [_, para, ..]) = document();
        let mapper = IdMapper::from_graph(&graph);
        let result = UclExecutor::new()
            .execute(&mut graph, "EDIT 3 SET text = \"hello\"", &mapper)
            .expect("execute");
        assert!(result.success);
        assert_eq!(graph.get_block(&para).expect("para").content.as_text(), "hello");

        let err = UclExecutor::new()
            .execute(&mut graph, "DELETE 42", &mapper)
            .expect_err("unknown");
        assert!(matches!(err, UcpError::Syntax { line: 1, .. }));
    }

    /// T4.4: The outline is indented by depth.
    #[test]
    fn describe_outline() {
        let (graph, _) = document();
        let outline = IdMapper::from_graph(&graph).describe(&graph);
        assert!(outline.starts_with("Document Structure:\n[1] text - \n"));
        assert!(outline.contains("\n  [2] heading1 - Introduction\n"));
        assert!(outline.contains("\n    [3] paragraph - First paragraph.\n"));
        assert!(outline.contains("\n  [5] conclusion - The end.\n"));
    }

    /// T4.5: A fresh graph's root answers to 1.
    #[test]
    fn fresh_graph_root_is_short_id_one() {
        let mut graph = ContentGraph::new();
        let mapper = IdMapper::from_graph(&graph);
        let result = UclExecutor::new()
            .execute(&mut graph, "EDIT 1 SET text = \"hello\"", &mapper)
            .expect("execute");
        assert!(result.success);
        assert_eq!(
            graph.get_block(graph.root()).expect("root").content.as_text(),
            "hello"
        );
    }
}
