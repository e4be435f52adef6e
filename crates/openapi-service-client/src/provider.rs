//! LLM vendors whose function-calling formats are supported.

use crate::converter::{CohereSchemaConverter, OpenAiSchemaConverter, SchemaConverter};
use crate::extractor::{DefaultPayloadExtractor, FunctionPayloadExtractor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pairs a payload extractor with the matching tool-definition converter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Anthropic,
    Cohere,
}

impl LlmProvider {
    pub fn payload_extractor(&self) -> Arc<dyn FunctionPayloadExtractor> {
        Arc::new(match self {
            LlmProvider::OpenAi => DefaultPayloadExtractor::openai(),
            LlmProvider::Anthropic => DefaultPayloadExtractor::anthropic(),
            LlmProvider::Cohere => DefaultPayloadExtractor::cohere(),
        })
    }

    pub fn schema_converter(&self) -> Arc<dyn SchemaConverter> {
        match self {
            LlmProvider::OpenAi => Arc::new(OpenAiSchemaConverter::openai()),
            LlmProvider::Anthropic => Arc::new(OpenAiSchemaConverter::anthropic()),
            LlmProvider::Cohere => Arc::new(CohereSchemaConverter),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Cohere => "cohere",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extractor_per_provider() {
        assert_eq!(
            LlmProvider::OpenAi.payload_extractor().required_fields(),
            vec!["name", "arguments"]
        );
        assert_eq!(
            LlmProvider::Anthropic.payload_extractor().required_fields(),
            vec!["name", "input"]
        );
        assert_eq!(
            LlmProvider::Cohere.payload_extractor().required_fields(),
            vec!["name", "parameters"]
        );
    }

    #[test]
    fn test_serde_names() {
        let provider: LlmProvider = serde_json::from_value(json!("anthropic")).unwrap();
        assert_eq!(provider, LlmProvider::Anthropic);
        assert_eq!(serde_json::to_value(LlmProvider::OpenAi).unwrap(), json!("openai"));
        assert_eq!(LlmProvider::default(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::Cohere.to_string(), "cohere");
    }
}
