//! Company profile enrichment.
//!
//! [`ProfileEnricher`] turns a profile URL into a [`CompanyProfile`] through a
//! [`ProfileFetcher`]. A failure is local to the record that asked for it;
//! the caller simply attaches no profile.
//!
//! With deduplication on, each distinct URL is fetched at most once per run.
//! Concurrent callers for the same URL wait on the same in-flight fetch and
//! all receive its outcome, success or failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::models::CompanyProfile;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("record has no profile URL")]
    MissingUrl,

    #[error("profile request failed: {0}")]
    Http(String),

    #[error("profile page returned status {0}")]
    Status(u16),

    #[error("profile page has no recognizable company fields")]
    NoProfile,
}

/// Source of company profiles, typically a scraper.
pub trait ProfileFetcher {
    async fn fetch_profile(&self, url: &str) -> Result<CompanyProfile, FetchFailure>;
}

type ProfileOutcome = Result<Arc<CompanyProfile>, FetchFailure>;

pub struct ProfileEnricher<F> {
    fetcher: F,
    /// Per-URL outcome slots; `None` when deduplication is off.
    cache: Option<Mutex<HashMap<String, Arc<OnceCell<ProfileOutcome>>>>>,
}

impl<F: ProfileFetcher> ProfileEnricher<F> {
    pub fn new(fetcher: F, dedup: bool) -> Self {
        Self {
            fetcher,
            cache: dedup.then(|| Mutex::new(HashMap::new())),
        }
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn enrich(&self, url: &str) -> ProfileOutcome {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchFailure::MissingUrl);
        }

        let Some(cache) = &self.cache else {
            return self.fetch(url).await;
        };

        // The map lock is only held to find or insert the slot, never across an await.
        let slot = {
            let mut map = match cache.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(map.entry(url.to_string()).or_default())
        };
        if slot.initialized() {
            debug!("Profile served from run cache");
        }
        slot.get_or_init(|| self.fetch(url)).await.clone()
    }

    async fn fetch(&self, url: &str) -> ProfileOutcome {
        match self.fetcher.fetch_profile(url).await {
            Ok(profile) => {
                debug!(industry = %profile.industry, "Fetched company profile");
                Ok(Arc::new(profile))
            }
            Err(e) => {
                warn!(%url, error = %e, "Company profile fetch failed; record continues without profile");
                Err(e)
            }
        }
    }
}
