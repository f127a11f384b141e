use crate::error::{CatalystError, Result};
use crate::providers::{GenerationBackend, HeadlineRequest};
use content::UserContext;
use std::collections::HashSet;
use std::sync::Arc;

const SYNTHESIS_FAILED: &str = "Could not generate headlines from the context provided.";

/// Turns the user's notes and links into short headline prompts
#[derive(Clone)]
pub struct PromptSynthesizer {
    backend: Arc<dyn GenerationBackend>,
}

impl PromptSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Up to `count` distinct headlines. Fails when the upstream errors or yields none.
    pub async fn synthesize(&self, context: &UserContext, count: usize) -> Result<Vec<String>> {
        let request = HeadlineRequest {
            prompt: headline_prompt(context, count),
            count,
        };
        let raw = self.backend.generate_headlines(&request).await.map_err(|err| {
            tracing::warn!("headline synthesis failed: {err}");
            CatalystError::SynthesisFailed(format!("{SYNTHESIS_FAILED} {err}"))
        })?;

        let headlines = normalize_headlines(raw, count);
        if headlines.is_empty() {
            return Err(CatalystError::SynthesisFailed(SYNTHESIS_FAILED.to_string()));
        }
        if headlines.len() < count {
            tracing::warn!(
                "asked for {count} headlines, upstream returned {} usable",
                headlines.len()
            );
        }
        Ok(headlines)
    }
}

pub fn headline_prompt(context: &UserContext, count: usize) -> String {
    format!(
        "Based on the following notes and links, generate {count} unique, short, and catchy \
         headlines suitable for a social media post. If the notes and links are empty, generate \
         {count} generic placeholder headlines about content creation or social media marketing.\n\n\
         Notes:\n{}\n\nLinks:\n{}\n\nReturn the result as a JSON array of strings.",
        context.notes.trim(),
        context.links.trim()
    )
}

/// Trim, drop blanks and case-insensitive duplicates, cap at `count`
pub fn normalize_headlines(raw: Vec<String>, count: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .filter(|h| seen.insert(h.to_lowercase()))
        .take(count)
        .collect()
}
