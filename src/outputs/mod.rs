//! Output writers for finished runs.
//!
//! # Submodules
//!
//! - [`csv`]: One row per record, UTF-8 with BOM, for spreadsheet review
//! - [`json`]: Full records plus the run summary, for downstream tooling
//!
//! Both writers take the pipeline's records as-is; row order is input order.

pub mod csv;
pub mod json;
