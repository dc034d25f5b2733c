//! Per-row enrichment: consult providers in priority order, accept the
//! first plausible candidate, then try once to attach a LinkedIn profile.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ceofinder_providers::context::{build_prompt_context, website_context};
use ceofinder_providers::{
    ContextSource, Lookup, LookupQuery, Pacer, ProfileFinder, Provider, ProviderError,
};
use ceofinder_shared::{
    Candidate, CompanyRecord, DefaultsConfig, EnrichmentResult, EnrichmentStatus,
};
use tracing::{debug, instrument, warn};

use crate::normalize;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Uniform retry policy applied around every provider invocation.
/// Permanent errors are never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per provider call, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            max_attempts: defaults.retry_attempts.max(1),
            backoff: Duration::from_millis(defaults.retry_backoff_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-row reporting
// ---------------------------------------------------------------------------

/// What one provider did for one row. Consumed by the run controller's
/// provider-health tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Produced the accepted candidate.
    Accepted,
    /// Responded, but with no plausible candidate.
    NoAnswer,
    /// Failed after retries with a transient error.
    Transient(String),
    /// Failed with a non-retryable error (auth, malformed request).
    Permanent(String),
}

/// Pipeline output for one row: the answer plus the per-provider trail.
#[derive(Debug)]
pub struct RowReport {
    pub result: EnrichmentResult,
    pub outcomes: Vec<(&'static str, ProviderOutcome)>,
}

impl RowReport {
    fn not_found(outcomes: Vec<(&'static str, ProviderOutcome)>) -> Self {
        Self {
            result: EnrichmentResult::not_found(),
            outcomes,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    providers: Vec<Arc<dyn Provider>>,
    profile_finder: Option<Arc<dyn ProfileFinder>>,
    context_source: Option<Arc<dyn ContextSource>>,
    client: Option<reqwest::Client>,
    retry: RetryPolicy,
    pacer: Pacer,
}

#[derive(Default)]
pub struct PipelineBuilder {
    providers: Vec<Arc<dyn Provider>>,
    profile_finder: Option<Arc<dyn ProfileFinder>>,
    context_source: Option<Arc<dyn ContextSource>>,
    client: Option<reqwest::Client>,
    retry: Option<RetryPolicy>,
    rate_limit: Option<Duration>,
}

impl PipelineBuilder {
    /// Append a provider at the end of the priority order.
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn profile_finder(mut self, finder: Arc<dyn ProfileFinder>) -> Self {
        self.profile_finder = Some(finder);
        self
    }

    pub fn context_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.context_source = Some(source);
        self
    }

    /// Client used for fetching company websites. Without one, website
    /// context is skipped.
    pub fn website_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limit = Some(min_interval);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            providers: self.providers,
            profile_finder: self.profile_finder,
            context_source: self.context_source,
            client: self.client,
            retry: self.retry.unwrap_or(RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(500),
            }),
            pacer: Pacer::new(self.rate_limit.unwrap_or(Duration::from_millis(1000))),
        }
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Enrich one row. Providers named in `disabled` are skipped. Never
    /// errors: every provider failure degrades to "no answer from that
    /// provider" and the row result reflects whatever remained.
    #[instrument(skip_all, fields(row = record.row_index, company = %record.company))]
    pub async fn enrich(&self, record: &CompanyRecord, disabled: &HashSet<&'static str>) -> RowReport {
        let company = record.company.trim();
        if company.is_empty() {
            debug!("empty company name, skipping lookups");
            return RowReport::not_found(Vec::new());
        }

        let query = self.build_query(record, company).await;
        let mut outcomes: Vec<(&'static str, ProviderOutcome)> = Vec::new();
        // Names that failed plausibility, kept for the ambiguity flag.
        let mut rejected: Vec<String> = Vec::new();

        for provider in &self.providers {
            let name = provider.name();
            if disabled.contains(name) {
                debug!(provider = name, "skipping disabled provider");
                continue;
            }

            match self.call_with_retry(provider.as_ref(), &query).await {
                Ok(Lookup {
                    candidate: Some(candidate),
                    ..
                }) => {
                    if !normalize::plausible(&candidate.name, company) {
                        debug!(provider = name, proposed = %candidate.name, "implausible candidate rejected");
                        rejected.push(normalize::comparison_key(&candidate.name));
                        outcomes.push((name, ProviderOutcome::NoAnswer));
                        continue;
                    }
                    outcomes.push((name, ProviderOutcome::Accepted));
                    let result = self.accept(candidate, name, company, &rejected).await;
                    return RowReport { result, outcomes };
                }
                Ok(Lookup { candidate: None, .. }) => {
                    outcomes.push((name, ProviderOutcome::NoAnswer));
                }
                Err(ProviderError::Transient(message)) => {
                    warn!(provider = name, %message, "provider failed after retry");
                    outcomes.push((name, ProviderOutcome::Transient(message)));
                }
                Err(ProviderError::Permanent(message)) => {
                    warn!(provider = name, %message, "provider failed permanently");
                    outcomes.push((name, ProviderOutcome::Permanent(message)));
                }
            }
        }

        RowReport::not_found(outcomes)
    }

    async fn build_query(&self, record: &CompanyRecord, company: &str) -> LookupQuery {
        let snippets = match &self.context_source {
            Some(source) => match source.context_snippets(company).await {
                Ok(block) if !block.is_empty() => Some(block),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "search context unavailable");
                    None
                }
            },
            None => None,
        };

        let website_text = match (&self.client, record.website.as_deref()) {
            (Some(client), Some(website)) if !website.trim().is_empty() => {
                website_context(client, website, company).await
            }
            _ => None,
        };

        let search_context = build_prompt_context(
            company,
            snippets.as_deref(),
            website_text.as_deref(),
            record.company_linkedin.as_deref(),
        );

        LookupQuery {
            company: company.to_string(),
            website: record.website.clone(),
            company_linkedin: record.company_linkedin.clone(),
            search_context: Some(search_context),
        }
    }

    async fn call_with_retry(
        &self,
        provider: &dyn Provider,
        query: &LookupQuery,
    ) -> Result<Lookup, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.pacer.wait(provider.name()).await;
            match provider.lookup(query).await {
                Ok(lookup) => return Ok(lookup),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    debug!(
                        provider = provider.name(),
                        attempt,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Finalize an accepted candidate: clean the name, flag disagreement
    /// with earlier providers, and attach a LinkedIn profile if missing
    /// (exactly one supplementary lookup, best-effort).
    async fn accept(
        &self,
        mut candidate: Candidate,
        source: &'static str,
        company: &str,
        rejected: &[String],
    ) -> EnrichmentResult {
        candidate.name = normalize::clean_name(&candidate.name);
        let key = normalize::comparison_key(&candidate.name);
        let disputed = rejected.iter().any(|earlier| *earlier != key);

        if candidate.linkedin.is_none() {
            if let Some(finder) = &self.profile_finder {
                match finder.find_profile(&candidate.name, company).await {
                    Ok(url) => candidate.linkedin = url,
                    Err(e) => debug!(error = %e, "supplementary profile lookup failed"),
                }
            }
        }

        EnrichmentResult {
            candidate: Some(candidate),
            status: if disputed {
                EnrichmentStatus::Ambiguous
            } else {
                EnrichmentStatus::Found
            },
            source: Some(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: pops one response per call, counts invocations.
    struct ScriptedProvider {
        name: &'static str,
        responses: Mutex<Vec<Result<Lookup, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(
            name: &'static str,
            responses: Vec<Result<Lookup, ProviderError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn answering(name: &'static str, ceo: &str) -> Arc<Self> {
            Self::new(name, vec![Ok(found(ceo))])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn lookup(&self, _query: &LookupQuery) -> Result<Lookup, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Lookup::empty(""))
            } else {
                responses.remove(0)
            }
        }
    }

    struct FixedFinder(Option<String>);

    #[async_trait]
    impl ProfileFinder for FixedFinder {
        async fn find_profile(
            &self,
            _person: &str,
            _company: &str,
        ) -> Result<Option<String>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn found(name: &str) -> Lookup {
        Lookup {
            candidate: Some(Candidate {
                name: name.to_string(),
                ..Default::default()
            }),
            raw: String::new(),
        }
    }

    fn record(company: &str) -> CompanyRecord {
        CompanyRecord {
            row_index: 0,
            company: company.to_string(),
            ceo_name: None,
            ceo_title: None,
            ceo_email: None,
            ceo_linkedin: None,
            website: None,
            company_linkedin: None,
            confidence: None,
            source: None,
            passthrough: vec![company.to_string()],
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        }
    }

    fn pipeline_with(providers: Vec<Arc<dyn Provider>>) -> Pipeline {
        let mut builder = Pipeline::builder()
            .retry(fast_retry())
            .rate_limit(Duration::ZERO);
        for provider in providers {
            builder = builder.provider(provider);
        }
        builder.build()
    }

    #[tokio::test]
    async fn empty_company_invokes_no_provider() {
        let provider = ScriptedProvider::answering("first", "Jane Smith");
        let pipeline = pipeline_with(vec![provider.clone()]);

        let report = pipeline.enrich(&record("   "), &HashSet::new()).await;

        assert_eq!(report.result.status, EnrichmentStatus::NotFound);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn higher_priority_answer_short_circuits() {
        let first = ScriptedProvider::answering("first", "Jane Smith");
        let second = ScriptedProvider::answering("second", "Other Person");
        let pipeline = pipeline_with(vec![first.clone(), second.clone()]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
        assert_eq!(report.result.source.as_deref(), Some("first"));
        assert_eq!(second.calls(), 0, "lower priority must not run");
    }

    #[tokio::test]
    async fn implausible_candidates_fall_through() {
        let first = ScriptedProvider::answering("first", "Acme");
        let second = ScriptedProvider::answering("second", "Jane Smith");
        let pipeline = pipeline_with(vec![first, second]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
        // The echoed company name counts as a disagreement marker.
        assert_eq!(report.result.status, EnrichmentStatus::Ambiguous);
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let provider = ScriptedProvider::new(
            "flaky",
            vec![
                Err(ProviderError::Transient("timeout".into())),
                Ok(found("Jane Smith")),
            ],
        );
        let pipeline = pipeline_with(vec![provider.clone()]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        assert_eq!(report.result.status, EnrichmentStatus::Found);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let broken = ScriptedProvider::new(
            "broken",
            vec![Err(ProviderError::Permanent("bad key".into()))],
        );
        let fallback = ScriptedProvider::answering("fallback", "Jane Smith");
        let pipeline = pipeline_with(vec![broken.clone(), fallback]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        assert_eq!(broken.calls(), 1);
        assert_eq!(report.result.status, EnrichmentStatus::Found);
        assert!(matches!(
            report.outcomes[0],
            ("broken", ProviderOutcome::Permanent(_))
        ));
    }

    #[tokio::test]
    async fn all_failures_degrade_to_not_found() {
        let a = ScriptedProvider::new(
            "a",
            vec![
                Err(ProviderError::Transient("t1".into())),
                Err(ProviderError::Transient("t2".into())),
            ],
        );
        let b = ScriptedProvider::new("b", vec![Ok(Lookup::empty("nothing"))]);
        let pipeline = pipeline_with(vec![a.clone(), b]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        assert_eq!(report.result.status, EnrichmentStatus::NotFound);
        assert!(report.result.candidate.is_none());
        assert_eq!(a.calls(), 2, "transient failure retried exactly once");
    }

    #[tokio::test]
    async fn disabled_providers_are_skipped() {
        let first = ScriptedProvider::answering("first", "Wrong Person");
        let second = ScriptedProvider::answering("second", "Jane Smith");
        let pipeline = pipeline_with(vec![first.clone(), second]);

        let disabled = HashSet::from(["first"]);
        let report = pipeline.enrich(&record("Acme"), &disabled).await;

        assert_eq!(first.calls(), 0);
        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
    }

    #[tokio::test]
    async fn missing_linkedin_triggers_one_supplementary_lookup() {
        let provider = ScriptedProvider::answering("first", "Jane Smith");
        let pipeline = Pipeline::builder()
            .provider(provider)
            .profile_finder(Arc::new(FixedFinder(Some(
                "https://linkedin.com/in/janesmith".into(),
            ))))
            .retry(fast_retry())
            .rate_limit(Duration::ZERO)
            .build();

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(
            candidate.linkedin.as_deref(),
            Some("https://linkedin.com/in/janesmith")
        );
    }

    #[tokio::test]
    async fn provider_linkedin_skips_supplementary_lookup() {
        let lookup = Lookup {
            candidate: Some(Candidate {
                name: "Jane Smith".into(),
                linkedin: Some("https://linkedin.com/in/janesmith-real".into()),
                ..Default::default()
            }),
            raw: String::new(),
        };
        let provider = ScriptedProvider::new("first", vec![Ok(lookup)]);
        let pipeline = Pipeline::builder()
            .provider(provider)
            .profile_finder(Arc::new(FixedFinder(Some(
                "https://linkedin.com/in/wrong".into(),
            ))))
            .retry(fast_retry())
            .rate_limit(Duration::ZERO)
            .build();

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(
            candidate.linkedin.as_deref(),
            Some("https://linkedin.com/in/janesmith-real")
        );
    }

    #[tokio::test]
    async fn accepted_name_is_cleaned() {
        let provider = ScriptedProvider::answering("first", "Dr.  Jane   Smith");
        let pipeline = pipeline_with(vec![provider]);

        let report = pipeline.enrich(&record("Acme"), &HashSet::new()).await;

        let candidate = report.result.candidate.expect("candidate");
        assert_eq!(candidate.name, "Jane Smith");
    }
}
