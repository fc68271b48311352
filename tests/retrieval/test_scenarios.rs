use serde_json::json;

use super::support::{fixture, supply_chain_graph, FakeGraph, FakeModel, FakeVector};

const STRIKE_QUESTION: &str = "How will the Singapore port strike affect GlobalTech's production?";

#[tokio::test]
async fn test_strike_question_uses_both_entities() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&["Dockworkers at the Port of Singapore began a strike."]),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert_eq!(result.query, STRIKE_QUESTION);
    assert_eq!(result.entities, vec!["Singapore", "GlobalTech"]);

    // One neighbor lookup per entity, in extraction order, plus one path query.
    assert_eq!(
        f.graph.neighbor_patterns(),
        vec!["(?i).*Singapore.*", "(?i).*GlobalTech.*"]
    );
    let path_queries = f.graph.path_queries();
    assert_eq!(path_queries.len(), 1);
    assert_eq!(
        path_queries[0].text_param("from_pattern"),
        Some("(?i).*Singapore.*")
    );
    assert_eq!(
        path_queries[0].text_param("to_pattern"),
        Some("(?i).*GlobalTech.*")
    );

    assert_eq!(
        result.graph_context,
        "- Port of Singapore --[OPERATES_AT]--> FlowChips\n\
         - Port of Singapore --[OPERATES_AT -> SUPPLIES]--> GlobalTech\n\
         - GlobalTech --[SOURCES_FROM]--> FlowChips\n\
         - Path: Port of Singapore -[OPERATES_AT]-> FlowChips -[SUPPLIES]-> GlobalTech"
    );
    assert_eq!(result.graph_paths.len(), 1);
    assert_eq!(result.graph_paths[0].path_length(), 2);
}

#[tokio::test]
async fn test_combined_context_section_order() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&["Strike enters day three.", "GlobalTech cuts guidance."]),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let context = f
        .retriever
        .retrieve(STRIKE_QUESTION, true)
        .await
        .combined_context();

    let docs = context.find("## Relevant Documents").unwrap();
    let rels = context.find("## Knowledge Graph Relationships").unwrap();
    let paths = context.find("## Graph Paths").unwrap();
    assert!(docs < rels && rels < paths);
    assert!(context.contains("1. Strike enters day three.\n2. GlobalTech cuts guidance."));
    assert!(context.ends_with("- Port of Singapore -[OPERATES_AT]-> FlowChips -[SUPPLIES]-> GlobalTech"));
}

#[tokio::test]
async fn test_reply_without_brackets_skips_graph() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&["Port congestion report"]),
        FakeModel::replying("I cannot extract entities"),
    );

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert!(result.entities.is_empty());
    assert_eq!(result.graph_context, "");
    assert!(result.graph_paths.is_empty());
    assert_eq!(f.graph.query_count(), 0);
    assert_eq!(result.vector_chunks, vec!["Port congestion report"]);
}

#[tokio::test]
async fn test_model_failure_keeps_vector_results() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&["Port congestion report"]),
        FakeModel::failing("ollama unreachable"),
    );

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert!(result.entities.is_empty());
    assert_eq!(result.vector_chunks.len(), 1);
    assert_eq!(f.model.call_count(), 1);
}

#[tokio::test]
async fn test_vector_failure_is_not_fatal() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::failing(),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert!(result.vector_chunks.is_empty());
    assert_eq!(result.entities.len(), 2);
    assert!(!result.graph_context.is_empty());
    assert!(!result.combined_context().contains("## Relevant Documents"));
}

#[tokio::test]
async fn test_every_stage_failing_yields_empty_result() {
    let graph = FakeGraph {
        execute_fails: true,
        ..FakeGraph::healthy()
    };
    let f = fixture(graph, FakeVector::failing(), FakeModel::failing("down"));

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert!(result.is_empty());
    assert!(result.entities.is_empty());
    assert_eq!(result.combined_context(), "");
}

#[tokio::test]
async fn test_graph_failure_with_entities_keeps_entities() {
    let graph = FakeGraph {
        execute_fails: true,
        ..FakeGraph::healthy()
    };
    let f = fixture(
        graph,
        FakeVector::with_documents(&["doc"]),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let result = f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert_eq!(result.entities, vec!["Singapore", "GlobalTech"]);
    assert_eq!(result.graph_context, "");
    assert!(result.graph_paths.is_empty());
    // Two neighbor lookups and one path query were still attempted.
    assert_eq!(f.graph.query_count(), 3);
}

#[tokio::test]
async fn test_single_entity_issues_no_path_query() {
    let f = fixture(
        FakeGraph::healthy().with_neighbors(
            "Singapore",
            vec![json!({ "source": "Singapore", "target": "FlowChips", "relationships": ["OPERATES_AT"], "path_length": 1 })],
        ),
        FakeVector::with_documents(&[]),
        FakeModel::replying(r#"["Singapore"]"#),
    );

    let result = f.retriever.retrieve("What operates in Singapore?", true).await;

    assert_eq!(result.graph_context, "- Singapore --[OPERATES_AT]--> FlowChips");
    assert!(f.graph.path_queries().is_empty());
}

#[tokio::test]
async fn test_empty_documents_are_dropped() {
    let f = fixture(
        FakeGraph::healthy(),
        FakeVector::with_documents(&["kept", "", "also kept"]),
        FakeModel::replying("[]"),
    );

    let result = f.retriever.retrieve("anything", true).await;

    assert_eq!(result.vector_chunks, vec!["kept", "also kept"]);
}

#[tokio::test]
async fn test_third_entity_only_adds_neighbors() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&[]),
        FakeModel::replying(r#"["Singapore", "GlobalTech", "Taiwan"]"#),
    );

    f.retriever.retrieve(STRIKE_QUESTION, true).await;

    assert_eq!(f.graph.neighbor_patterns().len(), 3);
    let path_queries = f.graph.path_queries();
    assert_eq!(path_queries.len(), 1);
    assert!(path_queries[0]
        .params
        .iter()
        .all(|(name, _)| name != "pattern"));
    assert_eq!(
        path_queries[0].text_param("to_pattern"),
        Some("(?i).*GlobalTech.*")
    );
}
