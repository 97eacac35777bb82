//! PR TIMES listing, release-page and company-profile scraper.
//!
//! # URL Patterns
//!
//! - Press releases: `https://prtimes.jp/main/html/rd/p/<id>.html`
//! - Company profiles: links carrying `company_id`
//!
//! Listing pages show relative times (`15分前`, `3時間前`) for today's
//! releases and absolute dates for older ones, newest first. Release pages
//! carry a `dl` category block (商品・サービス, ビジネスカテゴリ, キーワード,
//! 位置情報, 関連リンク, ダウンロード) and the exact publish time in
//! `og:description`.

use crate::enricher::{FetchFailure, ProfileFetcher};
use crate::models::{ArticleMetadata, CandidateRecord, CompanyProfile, SocialLink, SocialPlatform};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

static RELEASE_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/main/html/rd/p/"]"#).unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3").unwrap());
static COMPANY_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="company_id"]"#).unwrap());
static DL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("dl").unwrap());
static A_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static PDF_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href$=".pdf"], a[href$=".PDF"]"#).unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static OG_DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+分前|\d+時間前|\d{4}年\d{1,2}月\d{1,2}日\s*\d{1,2}時\d{1,2}分)").unwrap()
});

static OG_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[（(](\d{4}年\d{1,2}月\d{1,2}日\s*\d{1,2}時\d{1,2}分)[）)]").unwrap()
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static BODY_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[a-zA-Z0-9][-a-zA-Z0-9.]*(?:/[^\s<>"']*)?"#).unwrap());

/// Hosts that never count as a company's own inquiry site.
const NON_INQUIRY_HOSTS: &[&str] = &["prtimes", "google", "facebook", "youtube", "x.com", "twitter"];

/// Whether a listing time label denotes a release published today.
pub fn is_today_label(label: &str) -> bool {
    label.contains("分前") || label.contains("時間前")
}

/// Index a PR TIMES listing page into candidate records.
///
/// With `today_only`, indexing stops at the first release that is not from
/// today; the listing is newest first.
#[instrument(level = "info", skip(http))]
pub async fn index_articles(
    http: &reqwest::Client,
    listing_url: &str,
    today_only: bool,
) -> Result<Vec<CandidateRecord>, Box<dyn Error>> {
    let base = Url::parse(listing_url)?;
    let html = http
        .get(listing_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let records = parse_listing(&html, &base, today_only);
    info!(count = records.len(), source = listing_url, "Indexed PR TIMES releases");
    Ok(records)
}

/// Extract candidates from listing HTML, in page order, one per release link.
pub fn parse_listing(html: &str, base: &Url, today_only: bool) -> Vec<CandidateRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    let links = document
        .select(&RELEASE_LINK_SELECTOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((base.join(href).ok()?, a))
        })
        .unique_by(|(url, _)| url.to_string());

    for (source_url, link) in links {
        let card = release_card(link);
        let card_text = element_text(card);
        let published_at = TIME_RE
            .captures(&card_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        if today_only && !is_today_label(&published_at) {
            debug!(url = %source_url, %published_at, "Reached releases older than today");
            break;
        }

        let title = card
            .select(&TITLE_SELECTOR)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(link));
        if title.is_empty() {
            continue;
        }

        let company = card.select(&COMPANY_LINK_SELECTOR).next();
        let company_name = company.map(element_text).unwrap_or_default();
        let profile_url = company
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| base.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_default();

        records.push(CandidateRecord {
            id: format!("{:04}", records.len() + 1),
            title,
            source_url: source_url.to_string(),
            published_at,
            company_name,
            profile_url,
            metadata: ArticleMetadata::default(),
        });
    }
    records
}

/// Nearest `article` or `li` ancestor holding the release link.
fn release_card(link: ElementRef<'_>) -> ElementRef<'_> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| matches!(e.value().name(), "article" | "li"))
        .unwrap_or(link)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().join(" ")
}

/// `dt`/`dd` pairs belonging to `dl`, in document order.
///
/// Each `dt` pairs with the next `dd` of the same list; a `dt` without one is
/// dropped. Wrapper `div`s are looked through, nested lists are not.
fn definition_pairs(dl: ElementRef<'_>) -> Vec<(ElementRef<'_>, ElementRef<'_>)> {
    let mut pairs = Vec::new();
    let mut term = None;
    for element in dl.descendants().skip(1).filter_map(ElementRef::wrap) {
        let owner = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "dl");
        if owner.map(|o| o.id()) != Some(dl.id()) {
            continue;
        }
        match element.value().name() {
            "dt" => term = Some(element),
            "dd" => {
                if let Some(dt) = term.take() {
                    pairs.push((dt, element));
                }
            }
            _ => {}
        }
    }
    pairs
}

fn first_href<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element
        .select(&A_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
}

/// Read the company profile `dl > dt/dd` pairs from a page.
///
/// A `dd` holding a link contributes the link target, otherwise its text.
pub fn parse_profile(html: &str) -> Option<CompanyProfile> {
    let document = Html::parse_document(html);
    let mut profile = CompanyProfile::default();

    for dl in document.select(&DL_SELECTOR) {
        for (dt, dd) in definition_pairs(dl) {
            let key = element_text(dt);
            let value = first_href(dd)
                .map(str::to_string)
                .unwrap_or_else(|| element_text(dd));
            if value.is_empty() {
                continue;
            }
            apply_profile_field(&mut profile, &key, value);
        }
    }

    (!profile.is_empty()).then_some(profile)
}

/// What a release page adds to its listing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetails {
    pub metadata: ArticleMetadata,
    /// Exact publish time (`2026年2月9日 11時00分`), when the page states one.
    pub published_at: Option<String>,
}

/// Read the category block, attachments, contacts and publish time of a release page.
pub fn parse_article(html: &str, base: &Url) -> ArticleDetails {
    let document = Html::parse_document(html);
    let mut metadata = ArticleMetadata::default();
    let resolve = |href: &str| base.join(href).map(|u| u.to_string()).unwrap_or_default();

    for dl in document.select(&DL_SELECTOR) {
        for (dt, dd) in definition_pairs(dl) {
            let key = element_text(dt);
            let text = element_text(dd);
            if key.contains("商品") && key.contains("サービス") {
                metadata.overview = text;
            } else if key.contains("ビジネスカテゴリ") {
                metadata.business_category = text;
            } else if key.contains("キーワード") {
                metadata.keywords = text;
            } else if key.contains("位置情報") {
                metadata.location = text;
            } else if key.contains("関連リンク") {
                metadata.related_links = first_href(dd).map(resolve).unwrap_or(text);
            } else if key.contains("ダウンロード") {
                metadata.material_url = first_href(dd).map(resolve).unwrap_or_default();
                metadata.material_name = text;
            }
        }
    }

    if let Some(pdf) = document.select(&PDF_LINK_SELECTOR).next() {
        metadata.pdf_name = element_text(pdf);
        metadata.pdf_url = pdf.value().attr("href").map(resolve).unwrap_or_default();
    }

    let body_text = document
        .select(&BODY_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let (email, inquiry_url) = extract_contacts(&body_text);
    metadata.email = email;
    metadata.inquiry_url = inquiry_url;

    let published_at = document
        .select(&OG_DESCRIPTION_SELECTOR)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .and_then(|content| OG_TIME_RE.captures(content))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    ArticleDetails {
        metadata,
        published_at,
    }
}

/// First e-mail address and first company-looking URL in a release body.
/// Missing values are empty strings.
pub fn extract_contacts(body_text: &str) -> (String, String) {
    let email = EMAIL_RE
        .find(body_text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let website = BODY_URL_RE
        .find_iter(body_text)
        .map(|m| m.as_str())
        .find(|url| !NON_INQUIRY_HOSTS.iter().any(|host| url.contains(host)))
        .map(str::to_string)
        .unwrap_or_default();
    (email, website)
}

#[instrument(level = "debug", skip(http))]
async fn fetch_article_details(
    http: &reqwest::Client,
    url: &str,
) -> Result<ArticleDetails, Box<dyn Error>> {
    let base = Url::parse(url)?;
    let html = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_article(&html, &base))
}

/// Fetch every record's release page and attach what it adds, keeping order.
///
/// A page that cannot be fetched leaves its record as indexed.
#[instrument(level = "info", skip_all, fields(records = records.len(), concurrency = concurrency))]
pub async fn attach_article_details(
    http: &reqwest::Client,
    records: Vec<CandidateRecord>,
    concurrency: usize,
) -> Vec<CandidateRecord> {
    let records: Vec<CandidateRecord> = stream::iter(records)
        .map(|mut record| async move {
            match fetch_article_details(http, &record.source_url).await {
                Ok(details) => {
                    record.metadata = details.metadata;
                    if let Some(published_at) = details.published_at {
                        record.published_at = published_at;
                    }
                }
                Err(e) => {
                    warn!(url = %record.source_url, error = %e, "Failed to fetch release page");
                }
            }
            record
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;
    info!(count = records.len(), "Attached release details");
    records
}

fn apply_profile_field(profile: &mut CompanyProfile, key: &str, value: String) {
    let key = key.trim();
    if let Some(platform) = social_platform(key) {
        profile.social_links.push(SocialLink {
            platform,
            url: value,
        });
    } else if key.contains("業種") {
        profile.industry = value;
    } else if key.contains("本社所在地") {
        profile.address = value;
    } else if key.contains("電話番号") {
        profile.phone = value;
    } else if key.contains("代表者名") {
        profile.representative = value;
    } else if key.contains("上場") {
        profile.listing_status = value;
    } else if key.contains("資本金") {
        profile.capital = value;
    } else if key.contains("設立") {
        profile.founded = value;
    } else if key.contains("URL") {
        profile.official_url = value;
    }
}

fn social_platform(key: &str) -> Option<SocialPlatform> {
    if key == "X" || key.contains("Twitter") {
        Some(SocialPlatform::X)
    } else if key.contains("Facebook") {
        Some(SocialPlatform::Facebook)
    } else if key.contains("YouTube") {
        Some(SocialPlatform::YouTube)
    } else if key.contains("Instagram") {
        Some(SocialPlatform::Instagram)
    } else {
        None
    }
}

/// HTTP profile fetcher for PR TIMES company pages.
#[derive(Debug, Clone)]
pub struct PrTimesClient {
    http: reqwest::Client,
}

impl PrTimesClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ProfileFetcher for PrTimesClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_profile(&self, url: &str) -> Result<CompanyProfile, FetchFailure> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Http(e.to_string()))?;
        debug!(bytes = body.len(), "Downloaded profile page");
        parse_profile(&body).ok_or(FetchFailure::NoProfile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><section class="list-latest-articles">
          <article class="item">
            <h3><a href="/main/html/rd/p/000000010.000012345.html">新作リップ発売のお知らせ</a></h3>
            <a href="/main/html/searchrlp/company_id/12345">株式会社コスメA</a>
            <time>15分前</time>
          </article>
          <article class="item">
            <h3><a href="/main/html/rd/p/000000010.000012345.html">新作リップ発売のお知らせ</a></h3>
          </article>
          <article class="item">
            <h3><a href="https://prtimes.jp/main/html/rd/p/000000003.000067890.html">ポップアップストア開催</a></h3>
            <a href="https://prtimes.jp/main/html/searchrlp/company_id/67890">ビューティーB株式会社</a>
            <span>3時間前</span>
          </article>
          <article class="item">
            <h3><a href="/main/html/rd/p/000000001.000000001.html">昨日のリリース</a></h3>
            <span>2026年2月8日 15時00分</span>
          </article>
        </section></body></html>
    "#;

    const PROFILE: &str = r#"
        <html><body>
          <dl class="__dl_93dhx_1">
            <dt>業種</dt><dd>化粧品</dd>
            <dt>本社所在地</dt><dd>東京都渋谷区神宮前1-2-3</dd>
            <dt>電話番号</dt><dd>03-1234-5678</dd>
            <dt>代表者名</dt><dd>山田 花子</dd>
            <dt>上場</dt><dd>未上場</dd>
            <dt>資本金</dt><dd>1000万円</dd>
            <dt>設立</dt><dd>2015年04月</dd>
            <dt>URL</dt><dd><a href="https://cosme-a.example.jp">https://cosme-a.example.jp</a></dd>
            <dt>X</dt><dd><a href="https://x.com/cosme_a">@cosme_a</a></dd>
            <dt>YouTube</dt><dd><a href="https://youtube.com/@cosme_a">cosme_a</a></dd>
          </dl>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://prtimes.jp/beauty/").unwrap()
    }

    #[test]
    fn test_is_today_label() {
        assert!(is_today_label("15分前"));
        assert!(is_today_label("3時間前"));
        assert!(!is_today_label("2026年2月8日 15時00分"));
        assert!(!is_today_label(""));
    }

    #[test]
    fn test_parse_listing_today_only() {
        let records = parse_listing(LISTING, &base(), true);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].id, "0001");
        assert_eq!(records[0].title, "新作リップ発売のお知らせ");
        assert_eq!(
            records[0].source_url,
            "https://prtimes.jp/main/html/rd/p/000000010.000012345.html"
        );
        assert_eq!(records[0].published_at, "15分前");
        assert_eq!(records[0].company_name, "株式会社コスメA");
        assert_eq!(
            records[0].profile_url,
            "https://prtimes.jp/main/html/searchrlp/company_id/12345"
        );

        assert_eq!(records[1].title, "ポップアップストア開催");
        assert_eq!(records[1].published_at, "3時間前");
    }

    #[test]
    fn test_parse_listing_all() {
        let records = parse_listing(LISTING, &base(), false);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].published_at, "2026年2月8日 15時00分");
        assert!(records[2].profile_url.is_empty());
    }

    #[test]
    fn test_parse_profile_fields() {
        let profile = parse_profile(PROFILE).unwrap();
        assert_eq!(profile.industry, "化粧品");
        assert_eq!(profile.address, "東京都渋谷区神宮前1-2-3");
        assert_eq!(profile.phone, "03-1234-5678");
        assert_eq!(profile.representative, "山田 花子");
        assert_eq!(profile.listing_status, "未上場");
        assert_eq!(profile.capital, "1000万円");
        assert_eq!(profile.founded, "2015年04月");
        assert_eq!(profile.official_url, "https://cosme-a.example.jp");
        assert_eq!(profile.social_link(SocialPlatform::X), Some("https://x.com/cosme_a"));
        assert_eq!(
            profile.social_link(SocialPlatform::YouTube),
            Some("https://youtube.com/@cosme_a")
        );
        assert_eq!(profile.social_link(SocialPlatform::Facebook), None);
    }

    #[test]
    fn test_parse_profile_pairs_each_term_with_its_own_value() {
        let html = r#"
            <html><body><dl>
              <dt>業種</dt><dd>化粧品</dd>
              <dt>本社所在地</dt>
              <dt>電話番号</dt><dd>03-1234-5678</dd>
              <div class="table_row"><dt>代表者名</dt><dd>山田 花子
                <dl><dt>備考</dt><dd>旧代表 鈴木</dd></dl>
              </dd></div>
              <dt>資本金</dt><dd>1000万円</dd>
            </dl></body></html>
        "#;
        let profile = parse_profile(html).unwrap();
        assert_eq!(profile.industry, "化粧品");
        assert_eq!(profile.address, "");
        assert_eq!(profile.phone, "03-1234-5678");
        assert!(profile.representative.starts_with("山田 花子"));
        assert_eq!(profile.capital, "1000万円");
    }

    const ARTICLE: &str = r#"
        <html>
          <head>
            <meta property="og:description" content="株式会社コスメAのプレスリリース（2026年2月9日 11時00分）。新作リップ">
          </head>
          <body>
            <dl>
              <dt>種類</dt><dd>商品サービス</dd>
              <dt>商品・サービス</dt><dd>リップスティック</dd>
              <dt>ビジネスカテゴリ</dt><dd><a href="/main/c/1">化粧品・美容</a> <a href="/main/c/2">ファッション</a></dd>
              <dt>キーワード</dt><dd>リップ 新作 限定</dd>
              <dt>位置情報</dt><dd>東京都渋谷区</dd>
              <dt>関連リンク</dt><dd><a href="https://cosme-a.example.jp/lip">特設サイト</a></dd>
              <dt>ダウンロード</dt><dd><a href="/main/download/1">プレスリリース素材</a></dd>
            </dl>
            <p>詳細は <a href="/a/catalog.pdf">製品カタログ</a> をご覧ください。</p>
            <p>PR TIMES https://prtimes.jp/main/html/rd/p/1.html</p>
            <p>お問い合わせ: press@cosme-a.example.jp https://cosme-a.example.jp/contact</p>
          </body>
        </html>
    "#;

    #[test]
    fn test_parse_article_metadata() {
        let base = Url::parse("https://prtimes.jp/main/html/rd/p/000000010.000012345.html").unwrap();
        let details = parse_article(ARTICLE, &base);
        let metadata = &details.metadata;

        assert_eq!(metadata.overview, "リップスティック");
        assert_eq!(metadata.business_category, "化粧品・美容 ファッション");
        assert_eq!(metadata.keywords, "リップ 新作 限定");
        assert_eq!(metadata.location, "東京都渋谷区");
        assert_eq!(metadata.related_links, "https://cosme-a.example.jp/lip");
        assert_eq!(metadata.material_name, "プレスリリース素材");
        assert_eq!(metadata.material_url, "https://prtimes.jp/main/download/1");
        assert_eq!(metadata.pdf_name, "製品カタログ");
        assert_eq!(metadata.pdf_url, "https://prtimes.jp/a/catalog.pdf");
        assert_eq!(metadata.email, "press@cosme-a.example.jp");
        assert_eq!(metadata.inquiry_url, "https://cosme-a.example.jp/contact");
        assert_eq!(details.published_at.as_deref(), Some("2026年2月9日 11時00分"));
    }

    #[test]
    fn test_parse_article_without_metadata() {
        let base = Url::parse("https://prtimes.jp/main/html/rd/p/1.html").unwrap();
        let details = parse_article("<html><body><p>本文のみ</p></body></html>", &base);
        assert_eq!(details, ArticleDetails::default());
    }

    #[test]
    fn test_extract_contacts_skips_platform_links() {
        let (email, website) = extract_contacts(
            "https://x.com/cosme_a https://www.youtube.com/@a https://shop.example.jp/ 連絡先 info@shop.example.jp",
        );
        assert_eq!(email, "info@shop.example.jp");
        assert_eq!(website, "https://shop.example.jp/");

        assert_eq!(extract_contacts(""), (String::new(), String::new()));
    }

    #[test]
    fn test_parse_profile_without_fields() {
        assert!(parse_profile("<html><body><dl><dt>備考</dt><dd>なし</dd></dl></body></html>").is_none());
        assert!(parse_profile("<html><body><p>no profile</p></body></html>").is_none());
    }
}
