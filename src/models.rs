//! Data models for press-release records and their enriched representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`CandidateRecord`]: One press release as read from the input batch
//! - [`CompanyProfile`]: Attributes scraped from the issuing company's profile page
//! - [`ClassificationVerdict`]: Terminal sales-relevance outcome for a record
//! - [`EnrichedRecord`]: Output unit combining all of the above
//!
//! Records are shared through `Arc` once the pipeline starts: a candidate is
//! never mutated after it is read, and a fetched profile may be attached to
//! several output records when profile deduplication is enabled.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A press release to be enriched and classified.
///
/// The serde aliases accept the column names produced by the legacy crawler
/// so its raw CSV files can be fed in unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateRecord {
    /// Stable identifier; assigned positionally when the input has none.
    #[serde(default)]
    pub id: String,
    /// Headline in the source language.
    #[serde(alias = "일어 기사 제목")]
    pub title: String,
    /// Link to the press release.
    #[serde(default, alias = "기사 링크")]
    pub source_url: String,
    /// Publish time as displayed by the source site.
    #[serde(default, alias = "게재 일시")]
    pub published_at: String,
    /// Issuing company name in the source language.
    #[serde(default, alias = "회사명(원문)")]
    pub company_name: String,
    /// Link to the issuing company's profile page.
    #[serde(default, alias = "회사 프로필 링크")]
    pub profile_url: String,
    /// Read from the same row by the CSV reader, or scraped from the release page.
    #[serde(skip_deserializing)]
    pub metadata: ArticleMetadata,
}

impl CandidateRecord {
    /// Publish time normalized to a `NaiveDateTime`, if the source text is recognizable.
    pub fn published(&self) -> Option<NaiveDateTime> {
        parse_publish_time(&self.published_at)
    }
}

/// Release-level details: the category block of the release page, its
/// attachments, and contact details found in the body.
///
/// Aliases match the legacy crawler's column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArticleMetadata {
    /// Product or service the release is about (商品・サービス).
    #[serde(alias = "개요")]
    pub overview: String,
    #[serde(alias = "비즈니스카테고리")]
    pub business_category: String,
    #[serde(alias = "키워드")]
    pub keywords: String,
    #[serde(alias = "위치정보")]
    pub location: String,
    #[serde(alias = "관련링크")]
    pub related_links: String,
    #[serde(alias = "첨부PDF명")]
    pub pdf_name: String,
    #[serde(alias = "첨부PDF링크")]
    pub pdf_url: String,
    /// Downloadable press material (ダウンロード).
    #[serde(alias = "소재파일명")]
    pub material_name: String,
    #[serde(alias = "소재파일링크")]
    pub material_url: String,
    #[serde(alias = "이메일")]
    pub email: String,
    /// First non-social, non-PR TIMES link in the release body.
    #[serde(alias = "문의 웹사이트 URL")]
    pub inquiry_url: String,
}

impl ArticleMetadata {
    /// True when any of the fields worth interpreting for a reader is set.
    pub fn has_descriptive_fields(&self) -> bool {
        [
            &self.overview,
            &self.business_category,
            &self.keywords,
            &self.location,
            &self.related_links,
        ]
        .iter()
        .any(|v| !v.trim().is_empty())
    }
}

/// The descriptive metadata fields restated in the reader's language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataInterpretation {
    pub overview: String,
    pub business_category: String,
    pub keywords: String,
    pub location: String,
    pub related_links: String,
}

impl MetadataInterpretation {
    pub fn is_empty(&self) -> bool {
        [
            &self.overview,
            &self.business_category,
            &self.keywords,
            &self.location,
            &self.related_links,
        ]
        .iter()
        .all(|v| v.is_empty())
    }
}

/// Social network a company links to from its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    X,
    Facebook,
    YouTube,
    Instagram,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub url: String,
}

/// Company attributes scraped from a profile page.
///
/// Every field is free text exactly as the page shows it; empty means the
/// page did not list the attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompanyProfile {
    pub industry: String,
    pub address: String,
    pub phone: String,
    pub representative: String,
    pub listing_status: String,
    pub capital: String,
    pub founded: String,
    pub official_url: String,
    pub social_links: Vec<SocialLink>,
}

impl CompanyProfile {
    /// True when no attribute was recognized.
    pub fn is_empty(&self) -> bool {
        [
            &self.industry,
            &self.address,
            &self.phone,
            &self.representative,
            &self.listing_status,
            &self.capital,
            &self.founded,
            &self.official_url,
        ]
        .iter()
        .all(|v| v.is_empty())
            && self.social_links.is_empty()
    }

    /// First link listed for `platform`.
    pub fn social_link(&self, platform: SocialPlatform) -> Option<&str> {
        self.social_links
            .iter()
            .find(|l| l.platform == platform)
            .map(|l| l.url.as_str())
    }
}

/// Why a record could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnclassifiedCause {
    /// No API credential configured; the remote stage was never attempted.
    NoCredential,
    /// Waiting for a rate-limit permit exceeded the configured patience.
    RateBudgetExhausted,
    /// The remote call itself failed.
    RemoteError,
    /// The remote call answered with something that is not a judgement.
    MalformedResponse,
}

impl fmt::Display for UnclassifiedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnclassifiedCause::NoCredential => "no-credential",
            UnclassifiedCause::RateBudgetExhausted => "rate-budget-exhausted",
            UnclassifiedCause::RemoteError => "remote-error",
            UnclassifiedCause::MalformedResponse => "malformed-response",
        };
        f.write_str(s)
    }
}

/// Terminal sales-relevance outcome for one record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ClassificationVerdict {
    Suitable { reason: String },
    Unsuitable { reason: String },
    Unclassified { cause: UnclassifiedCause },
}

impl ClassificationVerdict {
    pub fn is_suitable(&self) -> bool {
        matches!(self, ClassificationVerdict::Suitable { .. })
    }

    /// Spreadsheet-friendly flag: `True`, `False`, or empty when unclassified.
    pub fn suitable_label(&self) -> &'static str {
        match self {
            ClassificationVerdict::Suitable { .. } => "True",
            ClassificationVerdict::Unsuitable { .. } => "False",
            ClassificationVerdict::Unclassified { .. } => "",
        }
    }

    /// Human-readable justification; an unclassified verdict reports its cause.
    pub fn justification(&self) -> String {
        match self {
            ClassificationVerdict::Suitable { reason }
            | ClassificationVerdict::Unsuitable { reason } => reason.clone(),
            ClassificationVerdict::Unclassified { cause } => cause.to_string(),
        }
    }
}

/// One output row: the candidate plus everything learned about it.
///
/// Produced exactly once per input record. Upstream failures show up as
/// `None` fields or an `Unclassified` verdict, never as a missing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub record: Arc<CandidateRecord>,
    pub profile: Option<Arc<CompanyProfile>>,
    pub verdict: ClassificationVerdict,
    pub title_translated: Option<String>,
    pub company_name_translated: Option<String>,
    pub metadata_interpreted: Option<MetadataInterpretation>,
}

/// Verdict and enrichment tallies for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub suitable: usize,
    pub unsuitable: usize,
    pub unclassified: usize,
    pub missing_profiles: usize,
}

impl RunSummary {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        records.iter().fold(
            RunSummary {
                total: records.len(),
                ..Default::default()
            },
            |mut acc, r| {
                match r.verdict {
                    ClassificationVerdict::Suitable { .. } => acc.suitable += 1,
                    ClassificationVerdict::Unsuitable { .. } => acc.unsuitable += 1,
                    ClassificationVerdict::Unclassified { .. } => acc.unclassified += 1,
                }
                if r.profile.is_none() {
                    acc.missing_profiles += 1;
                }
                acc
            },
        )
    }
}

static PUBLISH_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日\s*(\d{1,2})時(\d{1,2})分")
        .expect("publish time pattern is valid")
});

/// Parse a publish time such as `2026年2月9日 11時00分`.
///
/// ISO-like `2026-02-09 11:00` / `2026-02-09T11:00:00` values are accepted
/// too, so re-feeding our own output works.
pub fn parse_publish_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Some(caps) = PUBLISH_TIME_RE.captures(text) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
        return date.and_hms_opt(num(4)?, num(5)?, 0);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
