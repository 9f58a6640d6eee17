use crate::ModelInfo;
use serde_json::json;

#[test]
fn model_info_reports_token_limits() {
    let info: ModelInfo = serde_json::from_value(json!({
        "name": "models/gemini-2.0-flash",
        "version": "2.0",
        "displayName": "Gemini 2.0 Flash",
        "description": "Gemini 2.0 Flash",
        "inputTokenLimit": 1048576,
        "outputTokenLimit": 8192,
        "supportedGenerationMethods": ["generateContent", "countTokens", "createCachedContent"],
        "temperature": 1.0,
        "maxTemperature": 2.0,
        "topP": 0.95,
        "topK": 40
    }))
    .unwrap();

    assert_eq!(info.input_token_limit, 1_048_576);
    assert_eq!(info.output_token_limit, 8192);
    assert!(info.supports("countTokens"));
    assert!(!info.supports("embedContent"));
}

#[cfg(feature = "generation")]
mod generation {
    use super::*;
    use crate::{
        generation::{CountTokensResponse, Modality},
        FinishReason, GenerationResponse,
    };

    #[test]
    fn usage_metadata_is_read_from_response() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Once upon a time"}], "role": "model"},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {
                "promptTokenCount": 10,
                "candidatesTokenCount": 253,
                "totalTokenCount": 263,
                "promptTokensDetails": [{"modality": "TEXT", "tokenCount": 10}]
            },
            "modelVersion": "gemini-2.0-flash"
        }))
        .unwrap();

        assert_eq!(response.text(), "Once upon a time");
        assert_eq!(response.candidates[0].finish_reason, Some(FinishReason::Stop));
        let usage = response.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, Some(10));
        assert_eq!(usage.candidates_token_count, Some(253));
        assert_eq!(usage.total_token_count, Some(263));
        assert_eq!(usage.cached_content_token_count, None);
        assert_eq!(
            usage.prompt_tokens_details.unwrap()[0].modality,
            Modality::Text
        );
    }

    #[test]
    fn missing_usage_metadata_is_tolerated() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}], "role": "model"}}]
        }))
        .unwrap();
        assert!(response.usage_metadata.is_none());
        assert_eq!(serde_json::to_value(&response.usage_metadata).unwrap(), json!(null));
    }

    #[test]
    fn unknown_finish_reason_does_not_fail() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SOMETHING_NEW"}]
        }))
        .unwrap();
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(FinishReason::Unrecognized)
        );
        assert_eq!(response.text(), "");
    }

    #[test]
    fn count_tokens_response_with_cache() {
        let response: CountTokensResponse = serde_json::from_value(json!({
            "totalTokens": 323383,
            "cachedContentTokenCount": 323369
        }))
        .unwrap();
        assert_eq!(response.total_tokens, 323_383);
        assert_eq!(response.cached_content_token_count, Some(323_369));
    }
}

#[cfg(feature = "files")]
mod files {
    use super::*;
    use crate::files::{File, FileState};

    #[test]
    fn file_without_state_is_unspecified() {
        let file: File = serde_json::from_value(json!({
            "name": "files/abc-123",
            "mimeType": "video/mp4",
            "sizeBytes": "64657027",
            "createTime": "2024-09-23T10:15:00.123456Z",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc-123"
        }))
        .unwrap();

        assert_eq!(file.state, FileState::StateUnspecified);
        assert_eq!(file.size_bytes, Some(64_657_027));
        assert_eq!(file.mime_type.as_ref().map(|m| m.essence_str()), Some("video/mp4"));
    }

    #[test]
    fn unknown_state_is_unrecognized() {
        let file: File =
            serde_json::from_value(json!({"name": "files/x", "state": "QUEUED"})).unwrap();
        assert_eq!(file.state, FileState::Unrecognized);
        assert!(!file.state.is_terminal());
    }

    #[test]
    fn failed_file_carries_error_status() {
        let file: File = serde_json::from_value(json!({
            "name": "files/broken",
            "state": "FAILED",
            "error": {"code": 3, "message": "unsupported codec"}
        }))
        .unwrap();

        assert_eq!(file.state, FileState::Failed);
        assert!(file.state.is_terminal());
        assert_eq!(file.error.unwrap().to_string(), "code 3: unsupported codec");
    }
}

#[cfg(feature = "cache")]
mod cache {
    use super::*;
    use crate::CachedContent;

    #[test]
    fn cached_content_reports_usage_and_expiry() {
        let cached: CachedContent = serde_json::from_value(json!({
            "name": "cachedContents/a11-transcript",
            "model": "models/gemini-1.5-flash-001",
            "createTime": "2024-09-23T10:15:00Z",
            "updateTime": "2024-09-23T10:15:00Z",
            "expireTime": "2024-09-23T11:15:00Z",
            "usageMetadata": {"totalTokenCount": 323383}
        }))
        .unwrap();

        assert_eq!(cached.name, "cachedContents/a11-transcript");
        assert_eq!(cached.usage_metadata.total_token_count, 323_383);
        assert!(cached.expiration.expire_time.is_some());
        assert_eq!(cached.expiration.ttl, None);
    }
}
