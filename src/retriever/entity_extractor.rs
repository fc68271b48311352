//! Entity extraction from questions via a language model.
//!
//! The model is asked for a bare JSON array; parsing tolerates prose before
//! or after it. Any failure yields an empty list, which only disables the
//! graph side of a retrieval.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use super::stage::{degrade, Severity, Stage};
use crate::integrations::LanguageModel;

pub const ENTITY_EXTRACTION_PROMPT: &str = r#"You are an entity extraction system for supply chain analysis.
Extract all named entities (companies, products, locations, events) from the user's question.

Return ONLY a JSON array of entity names, nothing else.

Example:
Question: "How will the Singapore port strike affect GlobalTech's production?"
Answer: ["Singapore", "GlobalTech"]

Question: "{query}"
Answer:"#;

/// Outermost bracketed span, across newlines.
static ARRAY_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array pattern"));

pub fn build_prompt(query: &str) -> String {
    ENTITY_EXTRACTION_PROMPT.replace("{query}", query)
}

/// Pull the entity array out of a model reply.
///
/// Returns `None` when the reply holds no decodable JSON array. Elements are
/// coerced to text: strings as-is, `null` dropped, anything else in its JSON
/// form.
pub fn parse_entities(response: &str) -> Option<Vec<String>> {
    if let Some(span) = ARRAY_SPAN.find(response) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(span.as_str()) {
            return Some(coerce(items));
        }
    }

    // Prose with stray brackets around the array: try each opening bracket.
    for (idx, _) in response.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&response[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(items))) = stream.next() {
            return Some(coerce(items));
        }
    }

    None
}

fn coerce(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect()
}

/// Best-effort entity extraction.
#[derive(Clone)]
pub struct EntityExtractor {
    llm: Arc<dyn LanguageModel>,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Entities in the order the model listed them; empty on any failure.
    pub async fn extract(&self, query: &str) -> Vec<String> {
        let response = match self.llm.complete(&build_prompt(query)).await {
            Ok(response) => response,
            Err(err) => {
                return degrade(
                    Stage::EntityExtraction,
                    Severity::Error,
                    format!("Entity extraction failed: {}", err),
                )
            }
        };

        debug!(response = %response.trim(), "Entity extraction reply");

        match parse_entities(&response) {
            Some(entities) => {
                info!(?entities, "Extracted entities");
                entities
            }
            None => degrade(
                Stage::EntityExtraction,
                Severity::Warning,
                format!("Could not parse entities from: {}", response.trim()),
            ),
        }
    }
}
