//! Candidate extraction from LLM replies.
//!
//! The language-model providers are prompted to answer with a small JSON
//! object, but real replies arrive wrapped in code fences, preceded by
//! prose, or as no JSON at all. Parsing is therefore layered: strip fences,
//! try the whole reply as JSON, try to locate an embedded object, and
//! finally fall back to pulling any plausible `First Last` name out of the
//! free text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use ceofinder_shared::Candidate;

/// The JSON shape the LLM prompts ask for.
#[derive(Debug, Deserialize)]
struct LlmAnswer {
    #[serde(default)]
    ceo_name: String,
    #[serde(default)]
    ceo_title: Option<String>,
    #[serde(default)]
    ceo_linkedin: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

/// Reply values that mean "no answer", not a name.
const NON_ANSWERS: [&str; 6] = ["", "not found", "error", "unknown", "n/a", "none"];

/// Words that disqualify a regex match from being a person's name.
const NON_NAME_WORDS: [&str; 12] = [
    "not found",
    "unknown",
    "error",
    "company",
    "corporation",
    "limited",
    "llc",
    "inc",
    "group",
    "team",
    "staff",
    "linkedin",
];

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Title followed by a name.
        r"(?:CEO|Chief Executive|President|Founder|Owner|Chairman)[:\s]+([A-Z][a-zA-Z]+\s+[A-Z][a-zA-Z]+)",
        // "founded by John Smith" and friends.
        r"(?:founded|started|created|established|owned|led|managed)\s+by[:\s]*([A-Z][a-zA-Z]+\s+[A-Z][a-zA-Z]+)",
        // Name followed by a title.
        r"([A-Z][a-zA-Z]+\s+[A-Z][a-zA-Z]+)(?:\s+(?:is|was|serves as))?\s+(?:the\s+)?(?:CEO|Chief Executive|President|Founder|Owner)",
        // Honorific prefix.
        r"(?:Mr\.|Ms\.|Mrs\.|Dr\.)\s+([A-Z][a-zA-Z]+\s+[A-Z][a-zA-Z]+)",
        // Any capitalized pair, last resort.
        r"\b([A-Z][a-zA-Z]{2,}\s+[A-Z][a-zA-Z]{2,})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid name pattern"))
    .collect()
});

/// Parse an LLM reply into a candidate, or `None` when the reply carries
/// no usable name.
pub fn candidate_from_reply(reply: &str) -> Option<Candidate> {
    let stripped = strip_fences(reply);

    if let Some(candidate) = parse_json_answer(&stripped) {
        return Some(candidate);
    }

    // The reply may bury the JSON object in prose.
    if let (Some(open), Some(close)) = (stripped.find('{'), stripped.rfind('}')) {
        if open < close {
            if let Some(candidate) = parse_json_answer(&stripped[open..=close]) {
                return Some(candidate);
            }
        }
    }

    // Free-text fallback.
    extract_name(&stripped).map(|name| Candidate {
        name,
        title: None,
        email: None,
        linkedin: None,
        confidence: Some("low".into()),
    })
}

fn parse_json_answer(text: &str) -> Option<Candidate> {
    let answer: LlmAnswer = serde_json::from_str(text.trim()).ok()?;
    let name = answer.ceo_name.trim().to_string();
    if NON_ANSWERS.contains(&name.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(Candidate {
        name,
        title: answer.ceo_title.filter(|t| !t.trim().is_empty()),
        email: None,
        linkedin: answer.ceo_linkedin.filter(|l| l.contains("linkedin.com/in/")),
        confidence: answer.confidence.filter(|c| !c.trim().is_empty()),
    })
}

/// Remove markdown code fences and emphasis markers around a reply.
pub fn strip_fences(reply: &str) -> String {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.replace("**", "").replace('*', "").trim().to_string()
}

/// Pull the first plausible `First Last` name out of arbitrary text.
pub fn extract_name(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    for pattern in NAME_PATTERNS.iter() {
        for capture in pattern.captures_iter(text) {
            let name = capture.get(1).map(|m| m.as_str().trim())?;
            if looks_like_name(name) {
                return Some(name.to_string());
            }
        }
    }
    None
}

fn looks_like_name(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    name.len() > 5
        && name.len() < 50
        && name.contains(' ')
        && name.matches(' ').count() <= 3
        && !NON_NAME_WORDS.iter().any(|word| lowered.contains(word))
}

/// Pull the first LinkedIn profile URL out of arbitrary text.
pub fn extract_linkedin_url(text: &str) -> Option<String> {
    static PROFILE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?:https://)?(?:[a-zA-Z0-9.-]*\.)?linkedin\.com/in/[a-zA-Z0-9_-]+")
            .expect("valid profile pattern")
    });
    let matched = PROFILE.find(text)?.as_str();
    let url = if matched.starts_with("https://") {
        matched.to_string()
    } else {
        format!("https://{matched}")
    };
    (url.len() > 30).then_some(url)
}
