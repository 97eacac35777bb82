//! Stub collaborators shared by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::{ApiError, AskAsync};
use crate::enricher::{FetchFailure, ProfileFetcher};
use crate::models::{CandidateRecord, CompanyProfile};

type Responder = Box<dyn Fn(&str) -> Result<String, ApiError> + Send + Sync>;

/// Counting [`AskAsync`] stub; the answer is a pure function of the prompt.
pub struct StubAsk {
    respond: Responder,
    fail_first: usize,
    calls: AtomicUsize,
}

impl StubAsk {
    pub fn new(respond: impl Fn(&str) -> Result<String, ApiError> + Send + Sync + 'static) -> Self {
        Self::failing_first(0, respond)
    }

    /// Fail the first `n` calls with a server error, then answer normally.
    pub fn failing_first(
        n: usize,
        respond: impl Fn(&str) -> Result<String, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            fail_first: n,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn error() -> ApiError {
        ApiError::Status {
            status: 500,
            body: "stub failure".to_string(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AskAsync for StubAsk {
    async fn ask(&self, prompt: &str) -> Result<String, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(Self::error());
        }
        (self.respond)(prompt)
    }
}

/// Deterministic remote judgement: events (開催) are unsuitable, everything else suitable.
pub fn judge_by_title(prompt: &str) -> Result<String, ApiError> {
    let headline = prompt
        .lines()
        .find_map(|l| l.strip_prefix("# Headline: "))
        .unwrap_or_default();
    let suitable = !headline.contains("開催");
    Ok(serde_json::json!({
        "is_suitable": suitable,
        "reason": format!("judged: {headline}"),
    })
    .to_string())
}

/// Profile fetcher stub. Every URL yields a profile derived from the URL,
/// except those registered with [`StubFetcher::failing_on`].
#[derive(Default)]
pub struct StubFetcher {
    failing: HashSet<String>,
    jitter: bool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Delay each fetch by a URL-dependent few milliseconds so completions interleave.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProfileFetcher for StubFetcher {
    async fn fetch_profile(&self, url: &str) -> Result<CompanyProfile, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.jitter {
            let delay = url.bytes().map(u64::from).sum::<u64>() % 7;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.contains(url) {
            return Err(FetchFailure::Status(404));
        }
        Ok(CompanyProfile {
            industry: format!("industry for {url}"),
            official_url: url.to_string(),
            ..Default::default()
        })
    }
}

/// Candidate number `n` with a profile URL unique to it.
pub fn candidate(n: usize, title: &str) -> CandidateRecord {
    CandidateRecord {
        id: format!("{n:04}"),
        title: title.to_string(),
        source_url: format!("https://prtimes.jp/main/html/rd/p/{n:09}.html"),
        published_at: "2026年2月9日 11時00分".to_string(),
        company_name: format!("株式会社{n}"),
        profile_url: format!("https://prtimes.jp/company_id/{n}"),
        metadata: Default::default(),
    }
}
