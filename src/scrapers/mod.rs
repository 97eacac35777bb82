//! Source-site scrapers.
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | PR TIMES | [`prtimes`] | HTML scraping | Listing pages and company profile pages |
//!
//! Each scraper exports:
//! - `index_articles(..)`: Returns candidate records discovered on a listing page
//! - a client implementing [`crate::enricher::ProfileFetcher`]
//!
//! Parsing is split from fetching (`parse_listing`, `parse_profile`) so the
//! extraction rules can be tested against fixed HTML.

pub mod prtimes;
