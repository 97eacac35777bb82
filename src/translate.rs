//! Prompt-based translation of headlines, company names and release metadata.
//!
//! Translation is best effort. An empty input is not sent at all, and a
//! failed call (after retries) leaves the translated field empty without
//! affecting classification or enrichment.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::api::{AskAsync, RetryAsk};
use crate::models::{ArticleMetadata, MetadataInterpretation};
use crate::utils::{strip_code_fences, truncate_for_log};

pub struct Translator<A> {
    client: RetryAsk<Arc<A>>,
    target_language: String,
}

impl<A: AskAsync> Translator<A> {
    pub fn new(client: Arc<A>, target_language: &str, max_retries: usize) -> Self {
        Self {
            client: RetryAsk::new(client, max_retries, Duration::from_secs(1)),
            target_language: target_language.to_string(),
        }
    }

    #[instrument(level = "debug", skip_all, fields(text = %truncate_for_log(text, 40)))]
    pub async fn translate(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let prompt = format!(
            "Translate the following text into {}. Output only the translation, with no explanation.\n\n{}",
            self.target_language, text
        );
        match self.client.ask(&prompt).await {
            Ok(translated) => {
                let translated = translated.trim().to_string();
                debug!(translated = %truncate_for_log(&translated, 40), "Translated");
                (!translated.is_empty()).then_some(translated)
            }
            Err(e) => {
                warn!(error = %e, "Translation failed; leaving field empty");
                None
            }
        }
    }

    /// Restate the descriptive metadata fields in the target language.
    ///
    /// One call per record, answered as JSON. Metadata with nothing to
    /// interpret is not sent.
    #[instrument(level = "debug", skip_all)]
    pub async fn interpret_metadata(
        &self,
        metadata: &ArticleMetadata,
    ) -> Option<MetadataInterpretation> {
        if !metadata.has_descriptive_fields() {
            return None;
        }

        let prompt = metadata_prompt(metadata, &self.target_language);
        let raw = match self.client.ask(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Metadata interpretation failed; leaving fields empty");
                return None;
            }
        };
        match serde_json::from_str::<MetadataInterpretation>(&strip_code_fences(&raw)) {
            Ok(mut interpreted) => {
                for field in [
                    &mut interpreted.overview,
                    &mut interpreted.business_category,
                    &mut interpreted.keywords,
                    &mut interpreted.location,
                    &mut interpreted.related_links,
                ] {
                    *field = field.trim().to_string();
                }
                (!interpreted.is_empty()).then_some(interpreted)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&raw, 200),
                    "Metadata interpretation was not valid JSON"
                );
                None
            }
        }
    }
}

fn metadata_prompt(metadata: &ArticleMetadata, target_language: &str) -> String {
    format!(
        r#"# Role: Analyst explaining Japanese press-release metadata to a sales team
# Task: Restate each input value in natural {target_language} for a sales representative
# Rules:
# - Keep the meaning; tags and keywords become a comma-separated list
# - An empty input value stays an empty string
# Output (JSON only): {{"overview": "string", "business_category": "string", "keywords": "string", "location": "string", "related_links": "string"}}
# Input:
# - overview: {}
# - business_category: {}
# - keywords: {}
# - location: {}
# - related_links: {}
"#,
        metadata.overview.trim(),
        metadata.business_category.trim(),
        metadata.keywords.trim(),
        metadata.location.trim(),
        metadata.related_links.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubAsk;

    #[tokio::test]
    async fn test_empty_text_is_not_sent() {
        let stub = Arc::new(StubAsk::new(|_| Ok("번역".to_string())));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        assert_eq!(translator.translate("   ").await, None);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_translation_prompt_names_target_language() {
        let stub = Arc::new(StubAsk::new(|prompt| {
            assert!(prompt.contains("into Korean"));
            assert!(prompt.ends_with("新商品発売"));
            Ok(" 신제품 출시 \n".to_string())
        }));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        assert_eq!(
            translator.translate("新商品発売").await.as_deref(),
            Some("신제품 출시")
        );
    }

    fn metadata() -> ArticleMetadata {
        ArticleMetadata {
            overview: "リップスティック".to_string(),
            keywords: "リップ 新作 限定".to_string(),
            email: "press@example.jp".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_interpret_metadata_parses_fenced_json() {
        let stub = Arc::new(StubAsk::new(|prompt| {
            assert!(prompt.contains("natural Korean"));
            assert!(prompt.contains("- keywords: リップ 新作 限定"));
            assert!(!prompt.contains("press@example.jp"));
            Ok("```json\n{\"overview\": \" 립스틱 \", \"keywords\": \"립, 신작, 한정\"}\n```".to_string())
        }));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        let interpreted = translator.interpret_metadata(&metadata()).await.unwrap();
        assert_eq!(interpreted.overview, "립스틱");
        assert_eq!(interpreted.keywords, "립, 신작, 한정");
        assert_eq!(interpreted.location, "");
    }

    #[tokio::test]
    async fn test_interpret_metadata_skips_contact_only_metadata() {
        let stub = Arc::new(StubAsk::new(|_| Ok("{}".to_string())));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        let contact_only = ArticleMetadata {
            email: "press@example.jp".to_string(),
            ..Default::default()
        };
        assert_eq!(translator.interpret_metadata(&contact_only).await, None);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_interpret_metadata_rejects_non_json() {
        let stub = Arc::new(StubAsk::new(|_| Ok("申し訳ありません".to_string())));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        assert_eq!(translator.interpret_metadata(&metadata()).await, None);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_yields_none() {
        let stub = Arc::new(StubAsk::failing_first(usize::MAX, |_| Ok(String::new())));
        let translator = Translator::new(Arc::clone(&stub), "Korean", 0);

        assert_eq!(translator.translate("新商品発売").await, None);
        assert_eq!(stub.calls(), 1);
    }
}
