//! `query` command: run one retrieval and print the fused context.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::retriever::{HybridRetriever, RetrievalResult};
use crate::Error;

/// Printed when neither store produced anything.
pub const NO_CONTEXT_MESSAGE: &str = "No context found.";

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub question: String,
    pub vector_only: bool,
    pub fallback: bool,
    pub top_k: Option<usize>,
    pub json: bool,
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    #[serde(flatten)]
    result: &'a RetrievalResult,
    combined_context: String,
}

pub async fn run(mut config: Config, args: QueryArgs) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        return Err(Error::InvalidArgument("question must not be empty".to_string()).into());
    }

    if let Some(top_k) = args.top_k {
        config.retrieval.vector_top_k = top_k;
    }

    let retriever = HybridRetriever::connect(&config)
        .await
        .context("failed to initialize hybrid retriever")?;

    let result = if args.vector_only {
        retriever.retrieve(question, false).await
    } else if args.fallback {
        retriever.retrieve_with_fallback(question).await
    } else {
        retriever.retrieve(question, true).await
    };

    info!(
        entities = ?result.entities,
        chunks = result.vector_chunks.len(),
        "Query answered"
    );

    println!("{}", render(&result, args.json)?);
    Ok(())
}

/// Text (or pretty JSON) form of a retrieval result.
pub fn render(result: &RetrievalResult, json: bool) -> Result<String> {
    if json {
        let output = QueryOutput {
            result,
            combined_context: result.combined_context(),
        };
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    if result.is_empty() {
        return Ok(NO_CONTEXT_MESSAGE.to_string());
    }

    let mut out = String::new();
    if !result.entities.is_empty() {
        out.push_str(&format!("Entities: {}\n\n", result.entities.join(", ")));
    }
    out.push_str(&result.combined_context());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RetrievalResult {
        let mut result = RetrievalResult::new("Singapore strike impact?");
        result.vector_chunks = vec!["Port workers walked out".to_string()];
        result.entities = vec!["Singapore".to_string()];
        result.graph_context = "- Singapore --[OPERATES_AT]--> FlowChips".to_string();
        result
    }

    #[test]
    fn render_text_lists_entities_then_context() {
        let text = render(&sample(), false).unwrap();
        assert!(text.starts_with("Entities: Singapore\n\n## Relevant Documents"));
        assert!(text.contains("1. Port workers walked out"));
        assert!(text.ends_with("- Singapore --[OPERATES_AT]--> FlowChips"));
    }

    #[test]
    fn render_empty_result_says_so() {
        let result = RetrievalResult::new("anything");
        assert_eq!(render(&result, false).unwrap(), NO_CONTEXT_MESSAGE);
    }

    #[test]
    fn render_json_includes_combined_context() {
        let json = render(&sample(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["query"], "Singapore strike impact?");
        assert_eq!(value["entities"][0], "Singapore");
        assert!(value["combined_context"]
            .as_str()
            .unwrap()
            .contains("## Knowledge Graph Relationships"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let args = QueryArgs {
            question: "   ".to_string(),
            ..Default::default()
        };
        let err = run(Config::default(), args).await.unwrap_err();
        assert!(err.to_string().contains("question must not be empty"));
    }
}
