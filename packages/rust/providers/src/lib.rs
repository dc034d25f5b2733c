//! Provider adapters for ceofinder.
//!
//! Each external API gets one adapter implementing [`Provider`]: given a
//! company name (plus optional website/LinkedIn hints), return a best-guess
//! CEO candidate or "no answer". Adapters are thin: build the request,
//! classify the failure, parse the response. Deciding whether an answer is
//! *plausible* is the pipeline's job, not theirs.

pub mod anthropic;
pub mod apollo;
pub mod context;
pub mod duckduckgo;
pub mod extract;
pub mod gemini;
pub mod google_search;
pub mod hunter;
pub mod openai;
pub mod rocketreach;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
pub use ceofinder_shared::Candidate;

/// User-Agent string for outbound requests.
pub const USER_AGENT: &str = concat!("ceofinder/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout applied to every adapter client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure classification for a provider call. The pipeline retries
/// `Transient` once and never retries `Permanent`; the run controller
/// disables a provider after repeated `Permanent` failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Timeout, rate limit, connection failure, 5xx — worth one retry.
    #[error("transient: {0}")]
    Transient(String),

    /// Auth failure, malformed request/credentials — never retried.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an HTTP status the way every adapter does: 401/403/400 are
    /// credential/request problems, everything else non-2xx is transient.
    pub fn from_status(status: reqwest::StatusCode, provider: &str) -> Self {
        match status.as_u16() {
            400 | 401 | 403 => Self::Permanent(format!("{provider}: HTTP {status}")),
            _ => Self::Transient(format!("{provider}: HTTP {status}")),
        }
    }

    /// Classify a reqwest transport error. Builder/request-shape errors are
    /// permanent; network-level failures are transient.
    pub fn from_reqwest(err: reqwest::Error, provider: &str) -> Self {
        if err.is_builder() || (err.is_request() && !err.is_timeout() && !err.is_connect()) {
            Self::Permanent(format!("{provider}: {err}"))
        } else {
            Self::Transient(format!("{provider}: {err}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup types
// ---------------------------------------------------------------------------

/// Input to one provider lookup.
#[derive(Debug, Clone, Default)]
pub struct LookupQuery {
    /// Company name (non-empty; the pipeline short-circuits empty names).
    pub company: String,
    /// Website/domain hint from the input table.
    pub website: Option<String>,
    /// Company LinkedIn page hint from the input table.
    pub company_linkedin: Option<String>,
    /// Pre-gathered search/website context for LLM providers.
    pub search_context: Option<String>,
}

/// Output of one provider lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Proposed candidate, or `None` when the provider found nothing.
    pub candidate: Option<Candidate>,
    /// Raw provider text, kept for logging only.
    pub raw: String,
}

impl Lookup {
    pub fn empty(raw: impl Into<String>) -> Self {
        Self {
            candidate: None,
            raw: raw.into(),
        }
    }
}

/// One external API that can guess a company's CEO.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in logs, health tracking, and the `source`
    /// output column.
    fn name(&self) -> &'static str;

    async fn lookup(&self, query: &LookupQuery) -> Result<Lookup, ProviderError>;
}

/// A provider that can also locate a person's LinkedIn profile. Used for
/// the single supplementary lookup after a candidate without a profile URL
/// is accepted.
#[async_trait]
pub trait ProfileFinder: Send + Sync {
    async fn find_profile(
        &self,
        person: &str,
        company: &str,
    ) -> Result<Option<String>, ProviderError>;
}

/// A search backend that can gather leadership-related snippets about a
/// company, fed into the language-model prompts as extra context.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn context_snippets(&self, company: &str) -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// Request pacing
// ---------------------------------------------------------------------------

/// Minimum-interval pacing per named endpoint, shared across adapters.
/// Awaiting [`Pacer::wait`] sleeps just long enough to keep successive
/// calls to the same name at least `min_interval` apart.
pub struct Pacer {
    min_interval: Duration,
    last_call: Mutex<HashMap<&'static str, Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub async fn wait(&self, name: &'static str) {
        let sleep_for = {
            let mut last = self.last_call.lock().expect("pacer lock");
            let now = Instant::now();
            let wait = match last.get(name) {
                Some(prev) => self.min_interval.saturating_sub(now.duration_since(*prev)),
                None => Duration::ZERO,
            };
            last.insert(name, now + wait);
            wait
        };
        if !sleep_for.is_zero() {
            tokio::time::sleep(sleep_for).await;
        }
    }
}

/// Build the shared reqwest client used by adapters.
pub fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Permanent(format!("failed to build HTTP client: {e}")))
}

/// Reduce a website value from the input table to a bare domain, the form
/// the contact-database APIs expect.
pub fn domain_of(website: &str) -> String {
    website
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let err = ProviderError::from_status(reqwest::StatusCode::UNAUTHORIZED, "openai");
        assert!(!err.is_transient());

        let err = ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "openai");
        assert!(err.is_transient());

        let err = ProviderError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "openai");
        assert!(err.is_transient());
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(domain_of("https://www.acme.test/about"), "acme.test");
        assert_eq!(domain_of("acme.test"), "acme.test");
        assert_eq!(domain_of("http://acme.test/"), "acme.test");
    }

    #[tokio::test]
    async fn pacer_spaces_out_calls() {
        let pacer = Pacer::new(Duration::from_millis(30));
        let start = Instant::now();
        pacer.wait("test").await;
        pacer.wait("test").await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn pacer_tracks_endpoints_separately() {
        let pacer = Pacer::new(Duration::from_millis(200));
        let start = Instant::now();
        pacer.wait("a").await;
        pacer.wait("b").await;
        // Different endpoints do not wait on each other.
        assert!(start.elapsed() < Duration::from_millis(150));
    }
}
