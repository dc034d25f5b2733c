//! Website content mining for LLM context.
//!
//! Before asking a language model who runs a company, we fetch the
//! company's website (when the input table carries one) and boil it down
//! to the sentences most likely to mention leadership. The result feeds
//! the `search_context` field of [`crate::LookupQuery`].

use scraper::Html;
use tracing::debug;

/// Cap on the context passed to LLM prompts.
const MAX_CONTEXT_CHARS: usize = 8_000;

/// Sentence keywords that suggest leadership content.
const LEADERSHIP_TERMS: [&str; 14] = [
    "ceo",
    "chief executive",
    "president",
    "founder",
    "co-founder",
    "owner",
    "chairman",
    "director",
    "managing",
    "executive",
    "leader",
    "founded",
    "established",
    "started",
];

/// Fetch a company website and reduce it to leadership-relevant text.
/// Returns `None` (not an error) when the site is unreachable or empty —
/// context is best-effort and its absence never fails a row.
pub async fn website_context(
    client: &reqwest::Client,
    website: &str,
    company: &str,
) -> Option<String> {
    let url = normalize_url(website)?;
    let response = match client.get(url.clone()).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!(%url, status = %r.status(), "website fetch rejected");
            return None;
        }
        Err(e) => {
            debug!(%url, error = %e, "website fetch failed");
            return None;
        }
    };

    let body = response.text().await.ok()?;
    let text = visible_text(&body);
    let reduced = leadership_sentences(&text, company);
    (!reduced.is_empty()).then_some(reduced)
}

/// Ensure the website value has a scheme and parses as a URL. Input
/// spreadsheets carry anything from bare domains to full page links.
fn normalize_url(website: &str) -> Option<url::Url> {
    let trimmed = website.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match url::Url::parse(&with_scheme) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(website, error = %e, "unparseable website value");
            None
        }
    }
}

/// Strip markup and collapse whitespace into plain visible text.
/// Script and style bodies are removed before parsing; scraper's text
/// iterator would otherwise surface them as text nodes.
fn visible_text(html: &str) -> String {
    use std::sync::LazyLock;

    static SCRIPT_OR_STYLE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
            .expect("valid script/style pattern")
    });

    let cleaned = SCRIPT_OR_STYLE.replace_all(html, " ");
    let document = Html::parse_document(&cleaned);
    let mut text = String::new();
    for node in document.root_element().text() {
        let piece = node.trim();
        if !piece.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(piece);
        }
    }
    text
}

/// Keep the sentences that mention leadership terms or the company itself,
/// falling back to the whole text when nothing matches.
fn leadership_sentences(text: &str, company: &str) -> String {
    let company_lower = company.to_ascii_lowercase();
    let mut kept: Vec<&str> = Vec::new();

    for sentence in text.split('.') {
        let sentence = sentence.trim();
        if sentence.len() <= 10 {
            continue;
        }
        let lowered = sentence.to_ascii_lowercase();
        if LEADERSHIP_TERMS.iter().any(|term| lowered.contains(term))
            || (!company_lower.is_empty() && lowered.contains(&company_lower))
        {
            kept.push(sentence);
            if kept.len() >= 20 {
                break;
            }
        }
    }

    let result = if kept.is_empty() {
        text.to_string()
    } else {
        kept.join(". ")
    };
    truncate(&result, MAX_CONTEXT_CHARS)
}

/// Truncate on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Build a combined context block from the available pieces, the shape the
/// LLM prompts expect.
pub fn build_prompt_context(
    company: &str,
    search_snippets: Option<&str>,
    website_text: Option<&str>,
    company_linkedin: Option<&str>,
) -> String {
    let mut parts = vec![format!("Company: {company}")];
    if let Some(snippets) = search_snippets {
        parts.push(format!("Search results: {snippets}"));
    }
    if let Some(text) = website_text {
        parts.push(format!("Website content: {text}"));
    }
    if let Some(linkedin) = company_linkedin {
        parts.push(format!("LinkedIn: {linkedin}"));
    }
    parts.join("\n\n")
}
