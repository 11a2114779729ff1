//! # tb-tagger-http
//!
//! `TagSuggester` backed by a remote content-analysis endpoint. The service
//! receives the free-text query plus the tag names this deployment already
//! knows, and answers with weighted suggestions:
//!
//! ```json
//! [{"tag": "cars", "weight": 1.0}, {"tag": "trucks", "weight": 0.9}]
//! ```
//!
//! The endpoint is untrusted and possibly slow; failures come back as errors
//! for the API layer to map, and malformed weights are dropped here.

use async_trait::async_trait;
use serde::Serialize;
use tb_core::models::TagSuggestion;
use tb_core::traits::TagSuggester;

pub struct HttpTagSuggester {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SuggestRequest<'a> {
    query: &'a str,
    known_tags: &'a [String],
}

impl HttpTagSuggester {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

/// Drops suggestions an untrusted service should not be able to smuggle in:
/// empty names, negative or non-finite weights.
fn sanitize(suggestions: Vec<TagSuggestion>) -> Vec<TagSuggestion> {
    suggestions
        .into_iter()
        .filter(|s| !s.tag.is_empty() && s.weight.is_finite() && s.weight >= 0.0)
        .collect()
}

#[async_trait]
impl TagSuggester for HttpTagSuggester {
    async fn suggest(
        &self,
        query: &str,
        known_tags: &[String],
    ) -> anyhow::Result<Vec<TagSuggestion>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SuggestRequest { query, known_tags })
            .send()
            .await?
            .error_for_status()?;

        let suggestions: Vec<TagSuggestion> = response.json().await?;
        let suggestions = sanitize(suggestions);
        log::debug!(
            "tagger returned {} usable suggestions for {query:?}",
            suggestions.len()
        );
        Ok(suggestions)
    }
}
