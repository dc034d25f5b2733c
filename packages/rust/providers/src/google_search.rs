//! Google Custom Search adapter. Doubles as the search-context source for
//! the LLM providers and as a LinkedIn profile finder.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    Candidate, ContextSource, Lookup, LookupQuery, ProfileFinder, Provider, ProviderError,
    extract, http_client,
};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const RESULTS_PER_QUERY: u8 = 5;

pub struct GoogleSearchProvider {
    client: reqwest::Client,
    api_key: String,
    cx: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearchProvider {
    pub fn new(api_key: impl Into<String>, cx: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            cx: cx.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", &RESULTS_PER_QUERY.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "google-search"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "google-search"));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            ProviderError::Transient(format!("google-search: malformed response: {e}"))
        })?;
        Ok(parsed.items)
    }

}

/// Snippet block for the LLM prompt, one `title: snippet` line per hit.
#[async_trait]
impl ContextSource for GoogleSearchProvider {
    async fn context_snippets(&self, company: &str) -> Result<String, ProviderError> {
        let items = self
            .search(&format!("\"{company}\" CEO founder president"))
            .await?;
        let block = items
            .iter()
            .map(|item| format!("{}: {}", item.title, item.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        debug!(company, hits = items.len(), "search context gathered");
        Ok(block)
    }
}

#[async_trait]
impl Provider for GoogleSearchProvider {
    fn name(&self) -> &'static str {
        "google-search"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let items = self
            .search(&format!("\"{}\" CEO name", query.company))
            .await?;

        let raw = items
            .iter()
            .map(|item| format!("{} {}", item.title, item.snippet))
            .collect::<Vec<_>>()
            .join("\n");

        // Search snippets are noisy, so anything pulled out of them is
        // low-confidence by definition.
        let candidate = items.iter().find_map(|item| {
            let text = format!("{} {}", item.title, item.snippet);
            extract::extract_name(&text).map(|name| Candidate {
                name,
                title: None,
                email: None,
                linkedin: extract::extract_linkedin_url(&text),
                confidence: Some("low".to_string()),
            })
        });

        Ok(Lookup { candidate, raw })
    }
}

#[async_trait]
impl ProfileFinder for GoogleSearchProvider {
    async fn find_profile(
        &self,
        person: &str,
        company: &str,
    ) -> Result<Option<String>, ProviderError> {
        let items = self
            .search(&format!("site:linkedin.com/in \"{person}\" \"{company}\""))
            .await?;

        for item in &items {
            if item.link.contains("linkedin.com/in/") {
                return Ok(Some(item.link.clone()));
            }
            if let Some(url) = extract::extract_linkedin_url(&item.snippet) {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GoogleSearchProvider {
        GoogleSearchProvider::new("gs-key", "gs-cx")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn extracts_name_from_snippets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("cx", "gs-cx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [ {
                    "title": "About Acme",
                    "link": "https://acme.example/about",
                    "snippet": "Acme was founded by Jane Smith in 2004 and is based in Ohio."
                } ]
            })))
            .mount(&server)
            .await;

        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };
        let lookup = provider_for(&server).lookup(&query).await.unwrap();
        let candidate = lookup.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
        assert_eq!(candidate.confidence.as_deref(), Some("low"));
    }

    #[tokio::test]
    async fn profile_finder_prefers_result_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [ {
                    "title": "Jane Smith - CEO - Acme | LinkedIn",
                    "link": "https://www.linkedin.com/in/janesmith",
                    "snippet": "Jane Smith. CEO at Acme."
                } ]
            })))
            .mount(&server)
            .await;

        let url = provider_for(&server)
            .find_profile("Jane Smith", "Acme")
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://www.linkedin.com/in/janesmith"));
    }

    #[tokio::test]
    async fn no_items_mean_no_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };
        let lookup = provider_for(&server).lookup(&query).await.unwrap();
        assert!(lookup.candidate.is_none());
    }

    #[tokio::test]
    async fn quota_exhausted_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .context_snippets("Acme")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
