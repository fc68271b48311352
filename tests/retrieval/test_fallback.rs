use super::support::{fixture, supply_chain_graph, FakeGraph, FakeModel, FakeVector};

const QUESTION: &str = "How will the Singapore port strike affect GlobalTech's production?";

#[tokio::test]
async fn test_unhealthy_graph_goes_vector_only() {
    let graph = FakeGraph {
        healthy: false,
        ..supply_chain_graph()
    };
    let f = fixture(
        graph,
        FakeVector::with_documents(&["Strike update"]),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let fallback = f.retriever.retrieve_with_fallback(QUESTION).await;

    assert_eq!(f.model.call_count(), 0);
    assert_eq!(f.graph.query_count(), 0);

    let vector_only = f.retriever.retrieve(QUESTION, false).await;
    assert_eq!(fallback, vector_only);
    assert_eq!(fallback.vector_chunks, vec!["Strike update"]);
}

#[tokio::test]
async fn test_failing_probe_goes_vector_only() {
    let graph = FakeGraph {
        probe_fails: true,
        ..supply_chain_graph()
    };
    let f = fixture(
        graph,
        FakeVector::with_documents(&["Strike update"]),
        FakeModel::replying(r#"["Singapore"]"#),
    );

    let result = f.retriever.retrieve_with_fallback(QUESTION).await;

    assert!(result.entities.is_empty());
    assert!(result.graph_context.is_empty());
    assert_eq!(f.model.call_count(), 0);
}

#[tokio::test]
async fn test_healthy_graph_runs_full_retrieval() {
    let f = fixture(
        supply_chain_graph(),
        FakeVector::with_documents(&["Strike update"]),
        FakeModel::replying(r#"["Singapore", "GlobalTech"]"#),
    );

    let fallback = f.retriever.retrieve_with_fallback(QUESTION).await;
    let direct = f.retriever.retrieve(QUESTION, true).await;

    assert_eq!(fallback, direct);
    assert_eq!(f.model.call_count(), 2);
    assert!(!fallback.graph_context.is_empty());
}
