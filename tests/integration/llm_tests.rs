//! Integration tests for description parsing over HTTP

use serde_json::json;
use sourcetap::llm::{DescriptionParser, EnrichmentError, JobDomain, Modality, OpenAiClient};
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANSWER: &str = r#"{
    "ParsedDescription": "Maintain the billing backend.",
    "DeadlineDate": "2024-06-30",
    "MinDegree": "Bachelor's",
    "MinYearsExperience": 2,
    "Modality": "Remote",
    "Domain": "Backend",
    "Languages": ["Go", "SQL"],
    "Frameworks": ["gRPC"]
}"#;

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    }))
}

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new("test-key", "gpt-4o-mini", "Extract the posting fields.")
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_valid_answer_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(completion(ANSWER))
        .expect(1)
        .mount(&server)
        .await;

    let enrichment = client(&server)
        .parse_description("We need a Go developer.")
        .await
        .unwrap();

    assert_eq!(enrichment.modality, Modality::Remote);
    assert_eq!(enrichment.domain, JobDomain::Backend);
    assert_eq!(enrichment.min_years_experience, 2);
    assert_eq!(enrichment.languages, vec!["Go", "SQL"]);
}

#[tokio::test]
async fn test_fenced_answer_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(&format!("```json\n{}\n```", ANSWER)))
        .mount(&server)
        .await;

    let enrichment = client(&server).parse_description("text").await.unwrap();
    assert_eq!(enrichment.frameworks, vec!["gRPC"]);
}

#[tokio::test]
async fn test_prose_answer_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("Sorry, I cannot help with that."))
        .mount(&server)
        .await;

    let result = client(&server).parse_description("text").await;
    assert!(matches!(result, Err(EnrichmentError::Malformed(_))));
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = client(&server).parse_description("text").await;
    match result {
        Err(EnrichmentError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = client(&server).parse_description("text").await;
    assert!(matches!(result, Err(EnrichmentError::EmptyResponse)));
}
