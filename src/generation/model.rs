//! Request and response types of `generateContent` and `countTokens`.

use serde::{Deserialize, Serialize};

use crate::{client::Model, Content};

/// Reason why the model stopped generating tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    FinishReasonUnspecified,
    /// Natural stop point of the model or provided stop sequence
    Stop,
    /// The maximum number of tokens as specified in the request was reached
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Other,
    Blocklist,
    ProhibitedContent,
    Spii,
    MalformedFunctionCall,
    /// A reason not known to this crate
    #[serde(other)]
    Unrecognized,
}

/// A response candidate generated from the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The generated content; empty when the candidate was blocked
    #[serde(default)]
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i32>,
    /// Log-likelihood score of the candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_logprobs: Option<f64>,
}

/// Feedback on the prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Content modality of a token count entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    ModalityUnspecified,
    Text,
    Image,
    Video,
    Audio,
    Document,
    #[serde(other)]
    Unrecognized,
}

/// Number of tokens for a single modality
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModalityTokenCount {
    pub modality: Modality,
    #[serde(default)]
    pub token_count: i32,
}

/// Token usage of a generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Number of tokens in the prompt, cached content included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<i32>,
    /// Number of tokens in the generated candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<i32>,
    /// Number of tokens served from cached content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content_token_count: Option<i32>,
    /// Number of tokens spent on thinking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_prompt_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Vec<ModalityTokenCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_tokens_details: Option<Vec<ModalityTokenCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_tokens_details: Option<Vec<ModalityTokenCount>>,
}

/// Response from the Gemini API for content generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    /// The candidates generated
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Usage metadata.
    ///
    /// The service does not always report it, for instance on some requests
    /// that use cached content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl GenerationResponse {
    /// Get the text of the first candidate
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| candidate.content.text_parts())
            .unwrap_or_default()
    }
}

/// Configuration for generation
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// The temperature for the model (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// The top-p value for the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// The top-k value for the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    /// The maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
    /// The candidate count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<i32>,
    /// Whether to stop on specific sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// The response mime type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Request to generate content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The contents to generate content from
    pub contents: Vec<Content>,
    /// The generation config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// The system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Name of cached content used as context, e.g. `cachedContents/abc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content: Option<String>,
}

impl GenerateContentRequest {
    /// Whether the request carries more than plain contents.
    fn has_context(&self) -> bool {
        self.generation_config.is_some()
            || self.system_instruction.is_some()
            || self.cached_content.is_some()
    }
}

/// A generation request embedded in a `countTokens` call.
///
/// The embedded form must name the model explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensGenerateRequest {
    pub model: String,
    #[serde(flatten)]
    pub request: GenerateContentRequest,
}

/// Request body of `countTokens`.
///
/// Plain contents are sent as `contents`. When the request also has a system
/// instruction, generation config or cached content, the full request is sent
/// as `generateContentRequest` so that those tokens are counted too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<Content>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_content_request: Option<CountTokensGenerateRequest>,
}

impl CountTokensRequest {
    pub fn from_contents(contents: Vec<Content>) -> Self {
        Self {
            contents: Some(contents),
            generate_content_request: None,
        }
    }

    pub fn from_request(model: &Model, request: GenerateContentRequest) -> Self {
        if request.has_context() {
            Self {
                contents: None,
                generate_content_request: Some(CountTokensGenerateRequest {
                    model: model.to_string(),
                    request,
                }),
            }
        } else {
            Self::from_contents(request.contents)
        }
    }
}

/// Response of `countTokens`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    /// Number of tokens the model tokenizes the prompt into
    #[serde(default)]
    pub total_tokens: i32,
    /// Number of tokens in the cached part of the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<Vec<ModalityTokenCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_tokens_details: Option<Vec<ModalityTokenCount>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_contents_are_counted_directly() {
        let request = GenerateContentRequest {
            contents: vec![Content::text("The quick brown fox")],
            generation_config: None,
            system_instruction: None,
            cached_content: None,
        };
        let count = CountTokensRequest::from_request(&Model::Gemini20Flash, request);
        assert_eq!(
            serde_json::to_value(&count).unwrap(),
            json!({"contents": [{"parts": [{"text": "The quick brown fox"}]}]})
        );
    }

    #[test]
    fn system_instruction_switches_to_embedded_request() {
        let request = GenerateContentRequest {
            contents: vec![Content::text("hi")],
            generation_config: None,
            system_instruction: Some(Content::text("be brief")),
            cached_content: None,
        };
        let count = CountTokensRequest::from_request(&Model::Gemini20Flash, request);
        assert_eq!(
            serde_json::to_value(&count).unwrap(),
            json!({
                "generateContentRequest": {
                    "model": "models/gemini-2.0-flash",
                    "contents": [{"parts": [{"text": "hi"}]}],
                    "systemInstruction": {"parts": [{"text": "be brief"}]}
                }
            })
        );
    }

    #[test]
    fn unknown_finish_reason_is_tolerated() {
        let candidate: Candidate =
            serde_json::from_value(json!({"finishReason": "IMAGE_SAFETY"})).unwrap();
        assert_eq!(candidate.finish_reason, Some(FinishReason::Unrecognized));
        assert_eq!(candidate.content, Content::default());
    }
}
