//! Filter, sort and slice the catalog for grid clients.
//!
//! The pipeline always runs in the same order: filter the whole table, sort
//! the surviving rows, then cut one page out of them. Counts reported back
//! describe the table before filtering and the rows before slicing.
//!
//! Two request shapes feed the pipeline: the zero-based `draw/start/length`
//! shape of server-side data grids and a one-based `page/limit` shape.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{Scalar, PAGINATION_UNIT};
use crate::querying::filter_eval::apply_filter;
use crate::storage::catalog_store::{CatalogTable, ColumnKind};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Only `desc` selects descending order.
    pub fn parse(direction: Option<&str>) -> Self {
        match direction {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub filter: Option<String>,
    pub sort: Option<SortSpec>,
    pub offset: usize,
    pub limit: usize,
}

/// One page of catalog rows, referenced by load-order position.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub table: &'a CatalogTable,
    pub rows: Vec<usize>,
    pub total_count: usize,
    pub filtered_count: usize,
}

impl Page<'_> {
    /// Rows as JSON objects in column order.
    pub fn shaped_rows(&self) -> Vec<Map<String, Value>> {
        self.rows.iter().map(|&pos| shape_row(self.table, pos)).collect()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(|&pos| self.table.id_at(pos)).collect()
    }
}

/// Render one row for JSON clients. The id becomes a string so that
/// JavaScript clients do not lose precision; non-finite numbers become null.
pub fn shape_row(table: &CatalogTable, pos: usize) -> Map<String, Value> {
    let mut row = Map::with_capacity(table.columns().len());
    for (i, (name, cell)) in table.columns().iter().zip(table.row_at(pos)).enumerate() {
        let value = if i == 0 {
            Value::String(table.id_at(pos).to_string())
        } else {
            cell.to_json()
        };
        row.insert(name.clone(), value);
    }
    row
}

pub struct CatalogQuery;

impl CatalogQuery {
    /// Run filter → sort → slice and return the requested page.
    pub fn page<'a>(table: &'a CatalogTable, request: &PageRequest) -> Result<Page<'a>> {
        let rows = Self::filtered_sorted(table, request.filter.as_deref(), request.sort.as_ref())?;
        let filtered_count = rows.len();

        let start = request.offset.min(filtered_count);
        let end = request.offset.saturating_add(request.limit).min(filtered_count);
        let rows = rows[start..end].to_vec();

        Ok(Page { table, rows, total_count: table.len(), filtered_count })
    }

    /// Every row passing the filter, in the requested order.
    pub fn filtered_sorted(
        table: &CatalogTable,
        filter: Option<&str>,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<usize>> {
        let mut rows = apply_filter(table, filter)?.rows;
        if let Some(order) = sort {
            let column = table
                .column_index(&order.column)
                .ok_or_else(|| Error::InvalidSortColumn(order.column.clone()))?;
            if !sort_rows(table, &mut rows, column, order.direction) {
                debug!(column = %order.column, "sort column not orderable, leaving rows unsorted");
            }
        }
        Ok(rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKeys {
    Numeric,
    Lexical,
    Coerced,
}

/// Numeric columns sort as numbers. A text column sorts lexically unless
/// some of the rows being sorted hold numbers, in which case it sorts on its
/// numeric coercion.
fn sort_keys(table: &CatalogTable, rows: &[usize], column: usize) -> SortKeys {
    match table.column_kind(column) {
        ColumnKind::Integer | ColumnKind::Float => SortKeys::Numeric,
        ColumnKind::Text => {
            let numbers = rows
                .iter()
                .any(|&pos| matches!(table.cell(pos, column), Scalar::Int(_) | Scalar::Float(_)));
            if numbers {
                SortKeys::Coerced
            } else {
                SortKeys::Lexical
            }
        }
    }
}

/// Missing keys go last in both directions.
fn order_keys<T: PartialOrd>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of `rows` by one column. Ties keep their input order in both
/// directions. Numbers sort numerically and text lexically; a column mixing
/// both is sorted on its numeric coercion. Returns `false`, leaving `rows`
/// untouched, when no cell of a mixed column coerces to a number.
pub fn sort_rows(
    table: &CatalogTable,
    rows: &mut [usize],
    column: usize,
    direction: SortDirection,
) -> bool {
    let cell = |pos: usize| table.cell(pos, column);
    match sort_keys(table, rows, column) {
        SortKeys::Lexical => {
            let text = |pos: usize| match cell(pos) {
                Scalar::Text(s) => Some(s.as_str()),
                _ => None,
            };
            rows.sort_by(|&a, &b| order_keys(text(a), text(b), direction));
        }
        SortKeys::Coerced if rows.iter().all(|&pos| cell(pos).as_f64().is_none()) => {
            return false;
        }
        SortKeys::Numeric | SortKeys::Coerced => {
            rows.sort_by(|&a, &b| order_keys(cell(a).as_f64(), cell(b).as_f64(), direction));
        }
    }
    true
}

/// Read an integer query parameter; absent means `default`.
fn int_param(params: &HashMap<String, String>, key: &str, default: i64) -> Option<i64> {
    match params.get(key) {
        Some(raw) => raw.trim().parse().ok(),
        None => Some(default),
    }
}

/// Zero-based request of server-side data grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRequest {
    pub draw: i64,
    pub start: usize,
    pub length: usize,
}

impl DrawRequest {
    /// Negative `start` is clamped to 0; `length` below 1 falls back to the
    /// default page size.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let invalid = || Error::InvalidPagination("Invalid parameters".to_string());
        let draw = int_param(params, "draw", 1).ok_or_else(invalid)?;
        let start = int_param(params, "start", 0).ok_or_else(invalid)?;
        let length = int_param(params, "length", PAGINATION_UNIT as i64).ok_or_else(invalid)?;

        let start = usize::try_from(start.max(0)).unwrap_or(usize::MAX);
        let length = if length < 1 {
            PAGINATION_UNIT
        } else {
            usize::try_from(length).unwrap_or(usize::MAX)
        };
        Ok(Self { draw, start, length })
    }
}

/// One-based `page/limit` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedRequest {
    pub page: usize,
    pub limit: usize,
}

impl PagedRequest {
    pub fn new(page: usize, limit: usize) -> Result<Self> {
        if page < 1 || limit < 1 {
            return Err(Error::InvalidPagination("page and limit must be positive".to_string()));
        }
        Ok(Self { page, limit })
    }

    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let invalid = || Error::InvalidPagination("Invalid page or limit".to_string());
        let page = int_param(params, "page", 1).ok_or_else(invalid)?;
        let limit = int_param(params, "limit", PAGINATION_UNIT as i64).ok_or_else(invalid)?;
        let to_usize = |v: i64| usize::try_from(v.max(0)).unwrap_or(usize::MAX);
        Self::new(to_usize(page), to_usize(limit))
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Either request shape; `draw` being present selects the grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRequest {
    Draw(DrawRequest),
    Paged(PagedRequest),
}

impl GridRequest {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        if params.contains_key("draw") {
            DrawRequest::from_params(params).map(GridRequest::Draw)
        } else {
            PagedRequest::from_params(params).map(GridRequest::Paged)
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            GridRequest::Draw(r) => r.start,
            GridRequest::Paged(r) => r.offset(),
        }
    }

    pub fn limit(&self) -> usize {
        match self {
            GridRequest::Draw(r) => r.length,
            GridRequest::Paged(r) => r.limit,
        }
    }
}
