//! Hunter.io domain-search adapter. Needs a website hint; leadership is
//! picked out of the returned email roster by position keywords.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    Candidate, Lookup, LookupQuery, Provider, ProviderError, domain_of, http_client,
};

const DEFAULT_BASE_URL: &str = "https://api.hunter.io";

const LEADERSHIP_POSITIONS: &[&str] = &[
    "ceo",
    "chief executive",
    "founder",
    "president",
    "owner",
    "managing director",
    "chairman",
];

pub struct HunterProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DomainSearchResponse {
    data: DomainSearchData,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    emails: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    linkedin: Option<String>,
    #[serde(default)]
    confidence: Option<u8>,
}

impl HunterProvider {
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
}

fn is_leadership(position: &str) -> bool {
    let lowered = position.to_lowercase();
    LEADERSHIP_POSITIONS.iter().any(|term| lowered.contains(term))
}

fn candidate_from_entry(entry: &EmailEntry) -> Option<Candidate> {
    let first = entry.first_name.as_deref()?.trim();
    let last = entry.last_name.as_deref()?.trim();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    // Hunter's per-email confidence is a 0-100 score.
    let confidence = match entry.confidence.unwrap_or(0) {
        90.. => "high",
        60..=89 => "medium",
        _ => "low",
    };
    Some(Candidate {
        name: format!("{first} {last}"),
        title: entry.position.clone(),
        email: entry.value.clone(),
        linkedin: entry.linkedin.clone(),
        confidence: Some(confidence.to_string()),
    })
}

#[async_trait]
impl Provider for HunterProvider {
    fn name(&self) -> &'static str {
        "hunter"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let Some(website) = query.website.as_deref().filter(|w| !w.trim().is_empty()) else {
            debug!(company = %query.company, "hunter skipped: no website");
            return Ok(Lookup::empty("no website hint"));
        };
        let domain = domain_of(website);

        let response = self
            .client
            .get(format!("{}/v2/domain-search", self.base_url))
            .query(&[
                ("domain", domain.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "hunter"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "hunter"));
        }

        let parsed: DomainSearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("hunter: malformed response: {e}")))?;

        let candidate = parsed
            .data
            .emails
            .iter()
            .filter(|entry| entry.position.as_deref().is_some_and(is_leadership))
            .find_map(candidate_from_entry);

        Ok(Lookup {
            candidate,
            raw: format!("{} emails for {domain}", parsed.data.emails.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query_with_website() -> LookupQuery {
        LookupQuery {
            company: "Acme".into(),
            website: Some("https://acme.example/about".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn picks_leadership_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/domain-search"))
            .and(query_param("domain", "acme.example"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "emails": [
                    {
                        "value": "sales@acme.example",
                        "first_name": "Sam",
                        "last_name": "Seller",
                        "position": "Account Executive",
                        "confidence": 95
                    },
                    {
                        "value": "jane@acme.example",
                        "first_name": "Jane",
                        "last_name": "Smith",
                        "position": "Founder & CEO",
                        "linkedin": "https://linkedin.com/in/janesmith-acme",
                        "confidence": 92
                    }
                ] }
            })))
            .mount(&server)
            .await;

        let provider = HunterProvider::new("hk")
            .unwrap()
            .with_base_url(server.uri());
        let lookup = provider.lookup(&query_with_website()).await.unwrap();
        let candidate = lookup.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
        assert_eq!(candidate.email.as_deref(), Some("jane@acme.example"));
        assert_eq!(candidate.confidence.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn skips_rows_without_website() {
        let server = MockServer::start().await;
        let provider = HunterProvider::new("hk")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };

        let lookup = provider.lookup(&query).await.unwrap();
        assert!(lookup.candidate.is_none());
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn non_leadership_roster_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "emails": [
                    { "value": "info@acme.example", "first_name": "Info", "last_name": "Desk", "position": "Support" }
                ] }
            })))
            .mount(&server)
            .await;

        let provider = HunterProvider::new("hk")
            .unwrap()
            .with_base_url(server.uri());
        let lookup = provider.lookup(&query_with_website()).await.unwrap();
        assert!(lookup.candidate.is_none());
    }

    #[tokio::test]
    async fn invalid_key_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = HunterProvider::new("bad")
            .unwrap()
            .with_base_url(server.uri());
        let err = provider.lookup(&query_with_website()).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
