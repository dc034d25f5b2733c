//! Google Gemini adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Lookup, LookupQuery, Provider, ProviderError, extract, http_client};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Debug, Deserialize)]
struct GenerateCandidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
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
            "Who runs {company}? Use only the material below.\n\n\
             {context}\n\n\
             CEO, founder, president, owner, chairman, and managing director all count. \
             Answer with one JSON object:\n\
             {{\"ceo_name\": \"First Last\", \"ceo_title\": \"role\", \"confidence\": \"high/medium/low\"}}\n\
             If nobody is named, answer {{\"ceo_name\": \"Not found\"}}.",
            company = query.company,
        )
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let body = json!({
            "contents": [ { "parts": [ { "text": Self::prompt(query) } ] } ],
            "generationConfig": { "temperature": 0.3, "maxOutputTokens": 400 },
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, MODEL
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "gemini"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "gemini"));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("gemini: malformed response: {e}")))?;

        let reply = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|part| part.text.trim().to_string())
            .unwrap_or_default();

        debug!(company = %query.company, reply_len = reply.len(), "gemini reply");

        Ok(Lookup {
            candidate: extract::candidate_from_reply(&reply),
            raw: reply,
        })
    }
}
