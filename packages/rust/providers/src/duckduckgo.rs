//! DuckDuckGo HTML search. Keyless fallback when no Google Search
//! credentials are configured; only used as a LinkedIn profile finder
//! and snippet source.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{ContextSource, ProfileFinder, ProviderError, extract, http_client};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
const MAX_SNIPPETS: usize = 5;

pub struct DuckDuckGoFinder {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoFinder {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "duckduckgo"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "duckduckgo"));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(format!("duckduckgo: body read: {e}")))?;

        Ok(result_snippets(&html))
    }

}

/// Snippet block for the LLM prompt when Google Search is unavailable.
#[async_trait]
impl ContextSource for DuckDuckGoFinder {
    async fn context_snippets(&self, company: &str) -> Result<String, ProviderError> {
        let snippets = self
            .search(&format!("\"{company}\" CEO founder president"))
            .await?;
        debug!(company, hits = snippets.len(), "duckduckgo context gathered");
        Ok(snippets.join("\n"))
    }
}

fn result_snippets(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    // Selectors are static and known-valid.
    let Ok(selector) = Selector::parse(".result__snippet, .result__a") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .take(MAX_SNIPPETS * 2)
        .collect()
}

#[async_trait]
impl ProfileFinder for DuckDuckGoFinder {
    async fn find_profile(
        &self,
        person: &str,
        company: &str,
    ) -> Result<Option<String>, ProviderError> {
        let snippets = self
            .search(&format!("site:linkedin.com/in \"{person}\" \"{company}\""))
            .await?;

        for snippet in &snippets {
            if let Some(url) = extract::extract_linkedin_url(snippet) {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }
}
