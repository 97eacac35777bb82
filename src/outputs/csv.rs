//! Tabular output of enriched records.
//!
//! One row per record, in pipeline (= input) order. Files get a UTF-8 BOM so
//! spreadsheet applications detect the encoding of the Japanese text.

use serde::Serialize;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

use crate::models::{CompanyProfile, EnrichedRecord, MetadataInterpretation, SocialPlatform};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Serialize)]
struct Row<'a> {
    id: &'a str,
    title: &'a str,
    title_translated: &'a str,
    suitable: &'a str,
    justification: String,
    source_url: &'a str,
    published_at: &'a str,
    published_iso: String,
    company_name: &'a str,
    company_name_translated: &'a str,
    profile_url: &'a str,
    industry: &'a str,
    address: &'a str,
    phone: &'a str,
    representative: &'a str,
    listing_status: &'a str,
    capital: &'a str,
    founded: &'a str,
    official_url: &'a str,
    sns_x: &'a str,
    sns_facebook: &'a str,
    sns_youtube: &'a str,
    sns_other: String,
    overview: &'a str,
    overview_interpreted: &'a str,
    business_category: &'a str,
    business_category_interpreted: &'a str,
    keywords: &'a str,
    keywords_interpreted: &'a str,
    location: &'a str,
    location_interpreted: &'a str,
    related_links: &'a str,
    related_links_interpreted: &'a str,
    pdf_name: &'a str,
    pdf_url: &'a str,
    material_name: &'a str,
    material_url: &'a str,
    email: &'a str,
    inquiry_url: &'a str,
}

impl<'a> Row<'a> {
    fn from_record(r: &'a EnrichedRecord) -> Self {
        let profile = r.profile.as_deref();
        let field = |f: fn(&CompanyProfile) -> &str| profile.map(f).unwrap_or("");
        let interpreted = r.metadata_interpreted.as_ref();
        let reading =
            |f: fn(&MetadataInterpretation) -> &str| interpreted.map(f).unwrap_or("");
        let metadata = &r.record.metadata;
        let social = |platform| {
            profile
                .and_then(|p| p.social_link(platform))
                .unwrap_or("")
        };
        let sns_other = profile
            .map(|p| {
                p.social_links
                    .iter()
                    .filter(|l| {
                        !matches!(
                            l.platform,
                            SocialPlatform::X | SocialPlatform::Facebook | SocialPlatform::YouTube
                        )
                    })
                    .map(|l| l.url.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Row {
            id: &r.record.id,
            title: &r.record.title,
            title_translated: r.title_translated.as_deref().unwrap_or(""),
            suitable: r.verdict.suitable_label(),
            justification: r.verdict.justification(),
            source_url: &r.record.source_url,
            published_at: &r.record.published_at,
            published_iso: r
                .record
                .published()
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default(),
            company_name: &r.record.company_name,
            company_name_translated: r.company_name_translated.as_deref().unwrap_or(""),
            profile_url: &r.record.profile_url,
            industry: field(|p| p.industry.as_str()),
            address: field(|p| p.address.as_str()),
            phone: field(|p| p.phone.as_str()),
            representative: field(|p| p.representative.as_str()),
            listing_status: field(|p| p.listing_status.as_str()),
            capital: field(|p| p.capital.as_str()),
            founded: field(|p| p.founded.as_str()),
            official_url: field(|p| p.official_url.as_str()),
            sns_x: social(SocialPlatform::X),
            sns_facebook: social(SocialPlatform::Facebook),
            sns_youtube: social(SocialPlatform::YouTube),
            sns_other,
            overview: &metadata.overview,
            overview_interpreted: reading(|m| m.overview.as_str()),
            business_category: &metadata.business_category,
            business_category_interpreted: reading(|m| m.business_category.as_str()),
            keywords: &metadata.keywords,
            keywords_interpreted: reading(|m| m.keywords.as_str()),
            location: &metadata.location,
            location_interpreted: reading(|m| m.location.as_str()),
            related_links: &metadata.related_links,
            related_links_interpreted: reading(|m| m.related_links.as_str()),
            pdf_name: &metadata.pdf_name,
            pdf_url: &metadata.pdf_url,
            material_name: &metadata.material_name,
            material_url: &metadata.material_url,
            email: &metadata.email,
            inquiry_url: &metadata.inquiry_url,
        }
    }
}

/// Write records as CSV (header row included) to any writer.
pub fn write_records<W: Write>(writer: W, records: &[EnrichedRecord]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for record in records {
        out.serialize(Row::from_record(record))?;
    }
    out.flush()?;
    Ok(())
}

/// Write records to a BOM-prefixed CSV file, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_csv_file(
    path: impl AsRef<Path>,
    records: &[EnrichedRecord],
) -> Result<(), Box<dyn Error>> {
    let mut buf = UTF8_BOM.to_vec();
    write_records(&mut buf, records)?;
    tokio::fs::write(path.as_ref(), buf).await?;
    info!(rows = records.len(), "Wrote CSV");
    Ok(())
}
