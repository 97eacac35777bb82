//! Two-stage sales-suitability classification.
//!
//! 1. **Keyword stage**: a local scan of the headline against negative
//!    keywords. A hit is final; the remote stage is not attempted and no
//!    rate budget is spent.
//! 2. **Remote stage**: only with a credential. Takes a permit from the shared
//!    [`RateLimiter`], asks the model for a JSON judgement and maps the answer
//!    to a [`ClassificationVerdict`].
//!
//! Nothing in the remote stage fails the record: credential, budget, transport
//! and parse problems all become `Unclassified` verdicts. Only pipeline
//! cancellation is surfaced as an error.

use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::AskAsync;
use crate::models::{ClassificationVerdict, UnclassifiedCause};
use crate::pipeline::PipelineError;
use crate::rate_limiter::{AcquireError, RateLimiter};
use crate::utils::{looks_truncated, strip_code_fences, truncate_for_log};

/// The structured answer the remote stage expects.
#[derive(Debug, Deserialize)]
struct RemoteJudgement {
    is_suitable: bool,
    #[serde(default)]
    reason: String,
}

enum Parsed {
    Verdict(ClassificationVerdict),
    Truncated,
}

pub struct SuitabilityClassifier<A> {
    /// Lowercased keywords paired with their configured spelling.
    keywords: Vec<(String, String)>,
    limiter: Arc<RateLimiter>,
    /// Present only when a credential was configured.
    remote: Option<Arc<A>>,
}

impl<A: AskAsync> SuitabilityClassifier<A> {
    pub fn new(keywords: &[String], limiter: Arc<RateLimiter>, remote: Option<Arc<A>>) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(|k| (k.to_lowercase(), k.to_string()))
            .collect();
        Self {
            keywords,
            limiter,
            remote,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// First configured keyword contained in `title`, case-insensitively.
    pub fn matched_keyword(&self, title: &str) -> Option<&str> {
        let folded = title.to_lowercase();
        self.keywords
            .iter()
            .find(|(needle, _)| folded.contains(needle.as_str()))
            .map(|(_, original)| original.as_str())
    }

    /// Classify one headline. `context` is extra text for the model, such as a translation.
    #[instrument(level = "debug", skip_all, fields(title = %truncate_for_log(title, 40)))]
    pub async fn classify(
        &self,
        title: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationVerdict, PipelineError> {
        if let Some(keyword) = self.matched_keyword(title) {
            debug!(keyword, "Negative keyword matched; skipping remote stage");
            return Ok(ClassificationVerdict::Unsuitable {
                reason: format!("matched-keyword:\"{keyword}\""),
            });
        }

        let Some(remote) = &self.remote else {
            return Ok(ClassificationVerdict::Unclassified {
                cause: UnclassifiedCause::NoCredential,
            });
        };

        let prompt = suitability_prompt(title, context);
        // A truncated answer is asked again once, with a fresh permit.
        for attempt in 0..2 {
            if let Some(cause) = self.take_permit(cancel).await? {
                return Ok(ClassificationVerdict::Unclassified { cause });
            }

            let raw = match remote.ask(&prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Remote classification failed");
                    return Ok(ClassificationVerdict::Unclassified {
                        cause: UnclassifiedCause::RemoteError,
                    });
                }
            };

            match parse_judgement(&raw) {
                Parsed::Verdict(verdict) => {
                    info!(suitable = verdict.is_suitable(), "Classified headline");
                    return Ok(verdict);
                }
                Parsed::Truncated if attempt == 0 => {
                    warn!(
                        response_preview = %truncate_for_log(&raw, 200),
                        "Judgement looks truncated; re-asking once"
                    );
                }
                Parsed::Truncated => break,
            }
        }

        Ok(ClassificationVerdict::Unclassified {
            cause: UnclassifiedCause::MalformedResponse,
        })
    }

    /// `Ok(Some(cause))` when the budget gave up on us, `Err` on cancellation.
    async fn take_permit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<UnclassifiedCause>, PipelineError> {
        match self.limiter.acquire(cancel).await {
            Ok(()) => Ok(None),
            Err(AcquireError::TimedOut { .. }) => Ok(Some(UnclassifiedCause::RateBudgetExhausted)),
            Err(AcquireError::Cancelled) => Err(PipelineError::Cancelled),
        }
    }
}

fn suitability_prompt(title: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        "(none)"
    } else {
        context.trim()
    };
    format!(
        r#"# Role: Sales consultant for the Japanese beauty market
# Task: Decide whether this press-release headline is a good opening topic for a first sales e-mail.
# Criteria:
1. Related to the cosmetics / beauty industry (not fashion or food)
2. Positive news: new products, awards, pop-up stores (not disputes, stock prices or earnings)
3. Could be mentioned with congratulations at the start of an e-mail
# Output (JSON only): {{"is_suitable": boolean, "reason": "string"}}
# Headline: {title}
# Context: {context}
"#
    )
}

fn parse_judgement(raw: &str) -> Parsed {
    match serde_json::from_str::<RemoteJudgement>(&strip_code_fences(raw)) {
        Ok(RemoteJudgement {
            is_suitable: true,
            reason,
        }) => Parsed::Verdict(ClassificationVerdict::Suitable { reason }),
        Ok(RemoteJudgement {
            is_suitable: false,
            reason,
        }) => Parsed::Verdict(ClassificationVerdict::Unsuitable { reason }),
        Err(e) if looks_truncated(&e) => Parsed::Truncated,
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(raw, 200),
                "Model returned non-conforming JSON"
            );
            Parsed::Verdict(ClassificationVerdict::Unclassified {
                cause: UnclassifiedCause::MalformedResponse,
            })
        }
    }
}
