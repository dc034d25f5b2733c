//! RocketReach people-search adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{Candidate, Lookup, LookupQuery, Provider, ProviderError, http_client};

const DEFAULT_BASE_URL: &str = "https://api.rocketreach.co";

const SEARCH_TITLES: &[&str] = &["CEO", "Chief Executive Officer", "Founder", "President"];

pub struct RocketReachProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    profiles: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    current_title: Option<String>,
    #[serde(default)]
    current_employer: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
}

impl RocketReachProvider {
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

fn employer_matches(profile: &Profile, company: &str) -> bool {
    match profile.current_employer.as_deref() {
        // No employer field means the search produced it for the queried
        // company; trust the match.
        None => true,
        Some(employer) => {
            let employer = employer.to_lowercase();
            let company = company.to_lowercase();
            employer.contains(&company) || company.contains(&employer)
        }
    }
}

#[async_trait]
impl Provider for RocketReachProvider {
    fn name(&self) -> &'static str {
        "rocketreach"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let body = json!({
            "query": {
                "current_employer": [query.company],
                "current_title": SEARCH_TITLES,
            },
            "start": 1,
            "page_size": 3,
        });

        let response = self
            .client
            .post(format!("{}/v2/api/search", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "rocketreach"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "rocketreach"));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            ProviderError::Transient(format!("rocketreach: malformed response: {e}"))
        })?;

        let candidate = parsed
            .profiles
            .iter()
            .filter(|profile| employer_matches(profile, &query.company))
            .find_map(|profile| {
                let name = profile.name.as_deref()?.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Candidate {
                    name: name.to_string(),
                    title: profile.current_title.clone(),
                    email: None,
                    linkedin: profile.linkedin_url.clone(),
                    confidence: Some("high".to_string()),
                })
            });

        Ok(Lookup {
            candidate,
            raw: format!("{} profiles matched", parsed.profiles.len()),
        })
    }
}
