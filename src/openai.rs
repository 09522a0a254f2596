use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Public OpenAI endpoint. Override with `OPENAI_BASE_URL` to point the
/// pipeline at a gateway or a local test server.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Model used to embed chunks and questions.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-large";
/// Model used to answer the question.
pub const CHAT_MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("{endpoint} returned an empty response")]
    Empty { endpoint: String },
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds a client from `OPENAI_API_KEY` (required) and
    /// `OPENAI_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, OpenAiError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| OpenAiError::MissingApiKey)?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, api_key))
    }

    /// Embeds one input string, returning the raw vector.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, OpenAiError> {
        let endpoint = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": EMBEDDING_MODEL,
            "input": input,
        });

        let response: EmbeddingResponse = self.post(&endpoint, &body).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(OpenAiError::Empty { endpoint })
    }

    /// One-shot chat completion, returning the first choice's content.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, OpenAiError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": CHAT_MODEL,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response: ChatResponse = self.post(&endpoint, &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(OpenAiError::Empty { endpoint })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, OpenAiError> {
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| OpenAiError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        response.json().await.map_err(|source| OpenAiError::Request {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_embed_returns_first_vector() {
        tokio_test::block_on(async {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/embeddings")
                .match_header("authorization", "Bearer test-key")
                .match_body(Matcher::Json(json!({
                    "model": EMBEDDING_MODEL,
                    "input": "hello world",
                })))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(json!({ "data": [{ "embedding": [0.25, -0.5, 1.0] }] }).to_string())
                .create_async()
                .await;

            let client = OpenAiClient::new(server.url(), "test-key");
            let embedding = client.embed("hello world").await.unwrap();

            assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
            mock.assert_async().await;
        });
    }

    #[test]
    fn test_embed_surfaces_status_and_body_on_api_error() {
        tokio_test::block_on(async {
            let mut server = Server::new_async().await;
            server
                .mock("POST", "/embeddings")
                .with_status(429)
                .with_body("rate limited")
                .create_async()
                .await;

            let client = OpenAiClient::new(server.url(), "test-key");
            let err = client.embed("anything").await.unwrap_err();

            match err {
                OpenAiError::Api { status, body, .. } => {
                    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                    assert!(body.contains("rate limited"));
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        });
    }

    #[test]
    fn test_embed_rejects_empty_data() {
        tokio_test::block_on(async {
            let mut server = Server::new_async().await;
            server
                .mock("POST", "/embeddings")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{ "data": [] }"#)
                .create_async()
                .await;

            let client = OpenAiClient::new(server.url(), "test-key");
            let err = client.embed("anything").await.unwrap_err();
            assert!(matches!(err, OpenAiError::Empty { .. }));
        });
    }

    #[test]
    fn test_chat_sends_both_roles_and_returns_first_choice() {
        tokio_test::block_on(async {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/chat/completions")
                .match_body(Matcher::Json(json!({
                    "model": CHAT_MODEL,
                    "messages": [
                        { "role": "system", "content": "You are a helpful assistant." },
                        { "role": "user", "content": "What is the capital of France?" },
                    ],
                })))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(
                    json!({ "choices": [{ "message": { "content": "Paris." } }] }).to_string(),
                )
                .create_async()
                .await;

            let client = OpenAiClient::new(server.url(), "test-key");
            let answer = client
                .chat(
                    "You are a helpful assistant.",
                    "What is the capital of France?",
                )
                .await
                .unwrap();

            assert_eq!(answer, "Paris.");
            mock.assert_async().await;
        });
    }

    #[test]
    fn test_chat_rejects_empty_choices() {
        tokio_test::block_on(async {
            let mut server = Server::new_async().await;
            server
                .mock("POST", "/chat/completions")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{ "choices": [] }"#)
                .create_async()
                .await;

            let client = OpenAiClient::new(server.url(), "test-key");
            let err = client.chat("system", "user").await.unwrap_err();
            assert!(matches!(err, OpenAiError::Empty { .. }));
        });
    }

    #[test]
    fn test_from_env_requires_api_key() {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OPENAI_BASE_URL");
        assert!(matches!(
            OpenAiClient::from_env(),
            Err(OpenAiError::MissingApiKey)
        ));

        std::env::set_var("OPENAI_API_KEY", "from-env");
        let client = OpenAiClient::from_env().unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.api_key, "from-env");

        std::env::set_var("OPENAI_BASE_URL", "http://localhost:4000/v1");
        let client = OpenAiClient::from_env().unwrap();
        assert_eq!(client.base_url, "http://localhost:4000/v1");

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OPENAI_BASE_URL");
    }
}
