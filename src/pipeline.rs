//! Bounded-concurrency enrichment and classification pipeline.
//!
//! [`Pipeline::run`] takes the candidate batch in input order and returns one
//! [`EnrichedRecord`] per candidate, in the same order. Up to `concurrency`
//! records are in flight at once. Within a record, the profile fetch, the
//! translate-then-classify chain and the metadata interpretation run
//! concurrently.
//!
//! A record's own failures never leave its worker: a failed profile fetch
//! leaves `profile` empty, and a failed classification becomes an
//! `Unclassified` verdict. The only thing that stops a run early is the
//! cancellation token.

use futures::stream::{self, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::AskAsync;
use crate::classifier::SuitabilityClassifier;
use crate::config::{ConfigError, PipelineConfig};
use crate::enricher::{ProfileEnricher, ProfileFetcher};
use crate::models::{ArticleMetadata, CandidateRecord, EnrichedRecord, MetadataInterpretation};
use crate::rate_limiter::RateLimiter;
use crate::translate::Translator;
use crate::utils::truncate_for_log;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no result was produced for record #{index}")]
    Incomplete { index: usize },
}

pub struct Pipeline<F, A> {
    enricher: ProfileEnricher<F>,
    classifier: SuitabilityClassifier<A>,
    translator: Option<Translator<A>>,
    concurrency: usize,
}

impl<F, A> Pipeline<F, A>
where
    F: ProfileFetcher,
    A: AskAsync,
{
    /// Build a pipeline from validated configuration.
    ///
    /// `remote` is only wired into classification and translation when
    /// `config.has_credential` is set.
    pub fn new(config: &PipelineConfig, fetcher: F, remote: A) -> Result<Self, PipelineError> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit,
            config.window(),
            config.max_permit_wait(),
        )?);
        let remote = config.has_credential.then(|| Arc::new(remote));
        let translator = match &remote {
            Some(remote) if config.translate => Some(Translator::new(
                Arc::clone(remote),
                &config.translate_to,
                config.translate_retries,
            )),
            _ => None,
        };

        info!(
            rate_limit = config.rate_limit,
            window_seconds = config.window_seconds,
            concurrency = config.concurrency,
            has_credential = config.has_credential,
            translate = translator.is_some(),
            dedup_profiles = config.dedup_profiles,
            "Pipeline configured"
        );

        Ok(Self {
            enricher: ProfileEnricher::new(fetcher, config.dedup_profiles),
            classifier: SuitabilityClassifier::new(&config.negative_keywords, limiter, remote),
            translator,
            concurrency: config.concurrency,
        })
    }

    /// Enrich and classify every record, preserving input order.
    #[instrument(level = "info", skip_all, fields(records = records.len(), concurrency = self.concurrency))]
    pub async fn run(
        &self,
        records: Vec<CandidateRecord>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedRecord>, PipelineError> {
        let total = records.len();
        let mut slots: Vec<Option<EnrichedRecord>> = std::iter::repeat_with(|| None)
            .take(total)
            .collect();

        let mut results = pin!(
            stream::iter(records.into_iter().map(Arc::new).enumerate())
                .map(|(index, record)| self.process(index, record, cancel))
                .buffer_unordered(self.concurrency)
        );

        let mut completed = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(completed, total, "Pipeline cancelled; abandoning in-flight records");
                    return Err(PipelineError::Cancelled);
                }
                next = results.next() => match next {
                    Some(Ok((index, enriched))) => {
                        slots[index] = Some(enriched);
                        completed += 1;
                        debug!(index, completed, remaining = total - completed, "Record finished");
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
            }
        }

        let enriched = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(PipelineError::Incomplete { index }))
            .collect::<Result<Vec<_>, _>>()?;
        let limiter = self.classifier.limiter();
        info!(
            total = enriched.len(),
            remote_calls = limiter.grants(),
            rate_limit = limiter.limit(),
            "Pipeline finished"
        );
        Ok(enriched)
    }

    async fn process(
        &self,
        index: usize,
        record: Arc<CandidateRecord>,
        cancel: &CancellationToken,
    ) -> Result<(usize, EnrichedRecord), PipelineError> {
        debug!(index, id = %record.id, title = %truncate_for_log(&record.title, 40), "Processing record");

        let judged = async {
            let title_translated = self.translate(&record.title).await;
            let context = title_translated.as_deref().unwrap_or_default();
            let verdict = self.classifier.classify(&record.title, context, cancel).await?;
            Ok::<_, PipelineError>((title_translated, verdict))
        };
        let (profile, judged, company_name_translated, metadata_interpreted) = tokio::join!(
            self.enricher.enrich(&record.profile_url),
            judged,
            self.translate(&record.company_name),
            self.interpret(&record.metadata),
        );
        let (title_translated, verdict) = judged?;

        Ok((
            index,
            EnrichedRecord {
                record,
                profile: profile.ok(),
                verdict,
                title_translated,
                company_name_translated,
                metadata_interpreted,
            },
        ))
    }

    async fn translate(&self, text: &str) -> Option<String> {
        match &self.translator {
            Some(translator) => translator.translate(text).await,
            None => None,
        }
    }

    async fn interpret(&self, metadata: &ArticleMetadata) -> Option<MetadataInterpretation> {
        match &self.translator {
            Some(translator) => translator.interpret_metadata(metadata).await,
            None => None,
        }
    }
}
