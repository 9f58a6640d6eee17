#![cfg(feature = "generation")]

use gemini_tokens::{ClientConfig, ClientError, Gemini, Message, Model};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn client(server: &MockServer) -> Gemini {
    let base_url = format!("{}/v1beta/", server.uri()).parse().unwrap();
    Gemini::with_config(ClientConfig::new("test-key").with_base_url(base_url)).unwrap()
}

#[tokio::test]
async fn get_model_reports_context_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-2.0-flash"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/gemini-2.0-flash",
            "inputTokenLimit": 1048576,
            "outputTokenLimit": 8192,
            "supportedGenerationMethods": ["generateContent", "countTokens"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client(&server).await.get_model("gemini-2.0-flash").await.unwrap();
    assert_eq!(info.input_token_limit, 1_048_576);
    assert_eq!(info.output_token_limit, 8192);
}

#[tokio::test]
async fn count_tokens_sends_plain_contents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:countTokens"))
        .and(body_json(json!({
            "contents": [{
                "parts": [{"text": "The quick brown fox jumps over the lazy dog."}],
                "role": "user"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalTokens": 11})))
        .expect(1)
        .mount(&server)
        .await;

    let count = client(&server)
        .await
        .count_tokens(vec![
            Message::user("The quick brown fox jumps over the lazy dog.").content,
        ])
        .await
        .unwrap();
    assert_eq!(count.total_tokens, 11);
}

#[tokio::test]
async fn count_tokens_with_system_instruction_embeds_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:countTokens"))
        .and(body_json(json!({
            "generateContentRequest": {
                "model": "models/gemini-2.5-flash",
                "contents": [{"parts": [{"text": "Hello"}], "role": "user"}],
                "systemInstruction": {"parts": [{"text": "Answer like a pirate"}]}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalTokens": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let count = client(&server)
        .await
        .generate_content()
        .with_model(Model::Gemini25Flash)
        .with_system_instruction("Answer like a pirate")
        .with_user_message("Hello")
        .count_tokens()
        .await
        .unwrap();
    assert_eq!(count.total_tokens, 9);
}

#[tokio::test]
async fn generation_reports_usage_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "A fox jumps."}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 11,
                "candidatesTokenCount": 4,
                "totalTokenCount": 15
            }
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .await
        .generate_content()
        .with_user_message("The quick brown fox jumps over the lazy dog.")
        .execute()
        .await
        .unwrap();

    assert_eq!(response.text(), "A fox jumps.");
    let usage = response.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(11));
    assert_eq!(usage.total_token_count, Some(15));
}

#[tokio::test]
async fn error_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:countTokens"))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let error = client(&server)
        .await
        .count_tokens(vec![Message::user("hi").content])
        .await
        .unwrap_err();
    match error {
        ClientError::BadResponse { code, description } => {
            assert_eq!(code, 400);
            assert_eq!(description.as_deref(), Some("API key not valid"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
