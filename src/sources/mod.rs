//! Remote data sources.

pub mod ztf_source;

pub use ztf_source::{parse_columns, CrossMatchTable, ZtfSource};
