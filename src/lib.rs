//! # VarWISE View
//!
//! VarWISE View serves the VarWISE catalog of variable mid-infrared sources
//! together with the per-object WISE photometry behind each entry.
//!
//! The crate is organised around a small read-only query engine:
//!
//! - a flat, in-memory catalog table with filter / sort / paginate support
//!   driven by a tiny comma-separated constraint language;
//! - a point lookup into a hive-partitioned Parquet dataset, keyed by a
//!   cluster id whose top 16 bits name its partition;
//! - a cone-search client for the ZTF light-curve service;
//! - an axum HTTP surface tying the pieces together.
//!
//! ## Example
//!
//! ```rust
//! use varwise_view::core::partition_of;
//!
//! assert_eq!(partition_of(0x0001_0000_0000_2A3F), 1);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::float_cmp)]

/// Core data structures and types
pub mod core;

/// Data layout and server configuration
pub mod config;

/// Filter-language and VOTable parsing
pub mod parsing;

/// Catalog table and partitioned object dataset
pub mod storage;

/// Filter evaluation, sorting and pagination over the catalog
pub mod querying;

/// Remote data sources
pub mod sources;

/// Application context and object detail assembly
pub mod api;

/// HTTP surface
pub mod http;

pub mod error {
    //! Error types and result definitions

    use std::path::PathBuf;

    use thiserror::Error;

    use crate::core::ClusterId;

    /// Result type alias for VarWISE View operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Main error type for VarWISE View
    #[derive(Debug, Error)]
    pub enum Error {
        /// A catalog file is missing from the data directory
        #[error(
            "Catalog file not found at {}. Please run the CLI to acquire data first.",
            .0.display()
        )]
        CatalogUnavailable(PathBuf),

        /// A catalog file exists but cannot be used
        #[error("Invalid catalog: {0}")]
        InvalidCatalog(String),

        /// A filter clause does not match the clause grammar
        #[error("Invalid clause: '{0}'")]
        InvalidFilterSyntax(String),

        /// A filter clause names a column the table does not have
        #[error("Unknown column: '{0}'")]
        UnknownColumn(String),

        /// A string literal was used with an ordering operator
        #[error("String comparison only allowed with ==, !=, =: '{0}'")]
        UnsupportedStringOperator(String),

        /// The requested sort column does not exist
        #[error("Invalid sort column: {0}")]
        InvalidSortColumn(String),

        /// Pagination parameters are malformed or out of range
        #[error("{0}")]
        InvalidPagination(String),

        /// No object with this id exists
        #[error("No data found for cluster id {0}")]
        ObjectNotFound(ClusterId),

        /// More than one dataset row carries the same id
        #[error("Multiple entries ({matches}) found for cluster id {cluster_id}")]
        AmbiguousObject {
            cluster_id: ClusterId,
            matches: usize,
        },

        /// The object dataset directory is missing
        #[error(
            "Object data not found at {}. Please run the CLI to acquire data first.",
            .0.display()
        )]
        ObjectDataUnavailable(PathBuf),

        /// Parquet or Arrow failure while reading the object dataset
        #[error("Dataset error: {0}")]
        Dataset(String),

        /// The external cross-match service failed
        #[error("{0}")]
        UpstreamQueryFailed(String),

        /// Configuration error
        #[error("Configuration error: {0}")]
        Config(String),

        /// IO error
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }

    impl Error {
        /// Whether the error was caused by the request rather than the server.
        pub fn is_client_error(&self) -> bool {
            matches!(
                self,
                Error::InvalidFilterSyntax(_)
                    | Error::UnknownColumn(_)
                    | Error::UnsupportedStringOperator(_)
                    | Error::InvalidSortColumn(_)
                    | Error::InvalidPagination(_)
            )
        }

        /// Whether the error is one of the filter-language errors.
        pub fn is_filter_error(&self) -> bool {
            matches!(
                self,
                Error::InvalidFilterSyntax(_)
                    | Error::UnknownColumn(_)
                    | Error::UnsupportedStringOperator(_)
            )
        }
    }

    impl From<parquet::errors::ParquetError> for Error {
        fn from(err: parquet::errors::ParquetError) -> Self {
            Error::Dataset(err.to_string())
        }
    }

    impl From<arrow_schema::ArrowError> for Error {
        fn from(err: arrow_schema::ArrowError) -> Self {
            Error::Dataset(err.to_string())
        }
    }

    impl From<csv::Error> for Error {
        fn from(err: csv::Error) -> Self {
            Error::InvalidCatalog(err.to_string())
        }
    }
}

// Re-export commonly used types
pub use error::{Error, Result};
