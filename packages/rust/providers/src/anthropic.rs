//! Anthropic messages adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Lookup, LookupQuery, Provider, ProviderError, extract, http_client};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

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
            "Identify the chief executive of {company} from the material below.\n\n\
             {context}\n\n\
             Accept CEO, founder, president, owner, chairman, or managing director. \
             Prefer the most senior person if several are named.\n\n\
             Reply with exactly one JSON object:\n\
             {{\"ceo_name\": \"First Last\", \"ceo_title\": \"role\", \"confidence\": \"high/medium/low\"}}\n\
             Use {{\"ceo_name\": \"Not found\"}} when no person is named.",
            company = query.company,
        )
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let body = json!({
            "model": MODEL,
            "max_tokens": 400,
            "messages": [ { "role": "user", "content": Self::prompt(query) } ],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "anthropic"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "anthropic"));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("anthropic: malformed response: {e}")))?;

        let reply = parsed
            .content
            .first()
            .map(|block| block.text.trim().to_string())
            .unwrap_or_default();

        debug!(company = %query.company, reply_len = reply.len(), "anthropic reply");

        Ok(Lookup {
            candidate: extract::candidate_from_reply(&reply),
            raw: reply,
        })
    }
}
