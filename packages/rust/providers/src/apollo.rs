//! Apollo.io people-search adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{Candidate, Lookup, LookupQuery, Provider, ProviderError, domain_of, http_client};

const DEFAULT_BASE_URL: &str = "https://api.apollo.io";

const SEARCH_TITLES: &[&str] = &["CEO", "Chief Executive Officer", "Founder", "President", "Owner"];

pub struct ApolloProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PeopleSearchResponse {
    #[serde(default)]
    people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
}

impl ApolloProvider {
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

#[async_trait]
impl Provider for ApolloProvider {
    fn name(&self) -> &'static str {
        "apollo"
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError> {
        let mut body = json!({
            "q_organization_name": query.company,
            "person_titles": SEARCH_TITLES,
            "page": 1,
            "per_page": 3,
        });
        if let Some(website) = query.website.as_deref().filter(|w| !w.trim().is_empty()) {
            body["q_organization_domains"] = json!(domain_of(website));
        }

        let response = self
            .client
            .post(format!("{}/v1/mixed_people/search", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "apollo"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status, "apollo"));
        }

        let parsed: PeopleSearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("apollo: malformed response: {e}")))?;

        let candidate = parsed.people.iter().find_map(|person| {
            let name = person.name.as_deref()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(Candidate {
                name: name.to_string(),
                title: person.title.clone(),
                // Apollo masks emails behind credits; "email_not_unlocked"
                // placeholders are worse than nothing.
                email: person
                    .email
                    .clone()
                    .filter(|e| e.contains('@') && !e.starts_with("email_not_unlocked")),
                linkedin: person.linkedin_url.clone(),
                confidence: Some("high".to_string()),
            })
        });

        Ok(Lookup {
            candidate,
            raw: format!("{} people matched", parsed.people.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn takes_first_person_with_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/mixed_people/search"))
            .and(header("X-Api-Key", "ap-key"))
            .and(body_partial_json(json!({ "q_organization_name": "Acme" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "people": [
                    {
                        "name": "Jane Smith",
                        "title": "CEO",
                        "email": "email_not_unlocked@domain.com",
                        "linkedin_url": "https://linkedin.com/in/janesmith-acme"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let provider = ApolloProvider::new("ap-key")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };

        let lookup = provider.lookup(&query).await.unwrap();
        let candidate = lookup.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
        assert!(candidate.email.is_none(), "masked email must be dropped");
        assert_eq!(
            candidate.linkedin.as_deref(),
            Some("https://linkedin.com/in/janesmith-acme")
        );
    }

    #[tokio::test]
    async fn empty_people_list_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "people": [] })))
            .mount(&server)
            .await;

        let provider = ApolloProvider::new("ap-key")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };

        let lookup = provider.lookup(&query).await.unwrap();
        assert!(lookup.candidate.is_none());
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = ApolloProvider::new("ap-key")
            .unwrap()
            .with_base_url(server.uri());
        let query = LookupQuery {
            company: "Acme".into(),
            ..Default::default()
        };

        let err = provider.lookup(&query).await.unwrap_err();
        assert!(err.is_transient());
    }
}
