//! OpenAI chat-completion adapter — the primary, always-present provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Lookup, LookupQuery, Provider, ProviderError, extract, http_client};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the adapter at a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn prompt(query: &LookupQuery) -> String {
        let context = query
            .search_context
            .clone()
            .unwrap_or_else(|| format!("Company: {}", query.company));
        format!(
            "You are a business researcher. Find the person who leads {company}.\n\n\
             AVAILABLE INFORMATION:\n{context}\n\n\
             Look for anyone described as CEO, founder, president, owner, chairman, \
             or managing director. If several names appear, pick the most senior one.\n\n\
             Return ONLY this JSON object:\n\
             {{\"ceo_name\": \"First Last\", \"ceo_title\": \"role\", \"confidence\": \"high/medium/low\"}}\n\n\
             If no human name appears at all, return {{\"ceo_name\": \"Not found\"}}.",
            company = query.company,
        )
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let body = json!({
            "model": MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": "You extract leadership names from business content. Always answer with JSON.",
                },
                { "role": "user", "content": Self::prompt(query) },
            ],
            "temperature": 0.3,
            "max_tokens": 400,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "openai"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "openai"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("openai: malformed response: {e}")))?;

        let reply = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        debug!(company = %query.company, reply_len = reply.len(), "openai reply");

        Ok(Lookup {
            candidate: extract::candidate_from_reply(&reply),
            raw: reply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_reply(content: &str) -> serde_json::Value {
        json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
    }

    #[tokio::test]
    async fn parses_json_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                r#"{"ceo_name": "John Roe", "ceo_title": "CEO", "confidence": "high"}"#,
            )))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk-test")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme Inc".into(),
            ..Default::default()
        };

        let lookup = provider.lookup(&query).await.unwrap();
        let candidate = lookup.candidate.expect("candidate");
        assert_eq!(candidate.name, "John Roe");
        assert_eq!(candidate.title.as_deref(), Some("CEO"));
    }

    #[tokio::test]
    async fn not_found_reply_yields_no_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_reply(r#"{"ceo_name": "Not found"}"#)),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk-test")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme Inc".into(),
            ..Default::default()
        };

        let lookup = provider.lookup(&query).await.unwrap();
        assert!(lookup.candidate.is_none());
    }

    #[tokio::test]
    async fn auth_failure_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("bad-key")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme Inc".into(),
            ..Default::default()
        };

        let err = provider.lookup(&query).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk-test")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme Inc".into(),
            ..Default::default()
        };

        let err = provider.lookup(&query).await.unwrap_err();
        assert!(err.is_transient());
    }
}
