//! Catalog querying: filter evaluation, sorting and pagination.

pub mod filter_eval;
pub mod pagination;

pub use filter_eval::{apply_filter, evaluate, FilterOutcome};
pub use pagination::{
    shape_row, sort_rows, CatalogQuery, DrawRequest, GridRequest, Page, PageRequest,
    PagedRequest, SortDirection, SortSpec,
};
