//! In-memory catalog tables.
//!
//! A catalog is a CSV file with one row per cluster and an open set of
//! columns, one of which must be the integer primary key `cluster_id`. The
//! whole file is loaded once and never mutated afterwards, so a table can be
//! shared between request handlers without locking.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::info;

use crate::config::DataLayout;
use crate::core::{ClusterId, Scalar, CLUSTER_ID_COLUMN};
use crate::{Error, Result};

/// Value kind of a whole column, inferred at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every cell is an integer and none is missing
    Integer,
    /// Every present cell is a number
    Float,
    /// Anything else
    Text,
}

#[derive(Debug, Clone)]
pub struct CatalogTable {
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Scalar>>,
    ids: Vec<ClusterId>,
    index: HashMap<ClusterId, usize>,
}

impl CatalogTable {
    /// Load a catalog CSV file. A missing file is reported as
    /// [`Error::CatalogUnavailable`]; nothing is downloaded.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::CatalogUnavailable(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw_rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Self::from_raw(headers, &raw_rows)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "catalog loaded"
        );
        Ok(table)
    }

    /// Build a table from CSV-like text cells, inferring one kind per column.
    pub fn from_raw(headers: Vec<String>, raw_rows: &[Vec<String>]) -> Result<Self> {
        if let Some(i) = raw_rows.iter().position(|r| r.len() != headers.len()) {
            return Err(Error::InvalidCatalog(format!(
                "row {} has {} cells, expected {}",
                i,
                raw_rows[i].len(),
                headers.len()
            )));
        }

        let kinds: Vec<ColumnKind> =
            (0..headers.len()).map(|c| infer_kind(raw_rows.iter().map(|r| r[c].as_str()))).collect();

        let rows = raw_rows
            .iter()
            .map(|raw| raw.iter().zip(&kinds).map(|(cell, kind)| convert_cell(cell, *kind)).collect())
            .collect();

        Self::build(headers, Some(kinds), rows)
    }

    /// Build a table from already typed cells. Column kinds are derived from
    /// the cells, so a column may mix numbers and text.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self> {
        Self::build(columns, None, rows)
    }

    fn build(
        mut columns: Vec<String>,
        kinds: Option<Vec<ColumnKind>>,
        mut rows: Vec<Vec<Scalar>>,
    ) -> Result<Self> {
        let id_col = columns.iter().position(|c| c == CLUSTER_ID_COLUMN).ok_or_else(|| {
            Error::InvalidCatalog(format!("missing '{}' column", CLUSTER_ID_COLUMN))
        })?;

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::InvalidCatalog(format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }

        let mut kinds = kinds.unwrap_or_else(|| {
            (0..columns.len()).map(|c| kind_of_cells(rows.iter().map(|r| &r[c]))).collect()
        });

        // The id column always comes first in the exposed schema.
        if id_col != 0 {
            let name = columns.remove(id_col);
            columns.insert(0, name);
            let kind = kinds.remove(id_col);
            kinds.insert(0, kind);
            for row in &mut rows {
                let cell = row.remove(id_col);
                row.insert(0, cell);
            }
        }

        let mut ids = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            let id = match &row[0] {
                Scalar::Int(id) => *id,
                other => {
                    return Err(Error::InvalidCatalog(format!(
                        "row {} has non-integer {}: {}",
                        pos, CLUSTER_ID_COLUMN, other
                    )))
                }
            };
            if index.insert(id, pos).is_some() {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate {} {}",
                    CLUSTER_ID_COLUMN, id
                )));
            }
            ids.push(id);
        }
        kinds[0] = ColumnKind::Integer;

        Ok(Self { columns, kinds, rows, ids, index })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names, `cluster_id` first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_kind(&self, column: usize) -> ColumnKind {
        self.kinds[column]
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.index.contains_key(&id)
    }

    /// Load-order position of an id.
    pub fn position(&self, id: ClusterId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn row(&self, id: ClusterId) -> Option<&[Scalar]> {
        self.position(id).map(|pos| self.rows[pos].as_slice())
    }

    pub fn row_at(&self, pos: usize) -> &[Scalar] {
        &self.rows[pos]
    }

    pub fn cell(&self, pos: usize, column: usize) -> &Scalar {
        &self.rows[pos][column]
    }

    pub fn id_at(&self, pos: usize) -> ClusterId {
        self.ids[pos]
    }

    /// Ids in load order.
    pub fn ids(&self) -> &[ClusterId] {
        &self.ids
    }

    /// Previous and next ids in load order, wrapping around at both ends.
    pub fn neighbors(&self, id: ClusterId) -> Option<(ClusterId, ClusterId)> {
        let pos = self.position(id)?;
        let n = self.ids.len();
        let prev = self.ids[(pos + n - 1) % n];
        let next = self.ids[(pos + 1) % n];
        Some((prev, next))
    }
}

/// Cell texts read as missing values, matching the default NA set of the
/// CSV readers the catalogs are produced with.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells {
        if is_missing(cell) {
            if kind == ColumnKind::Integer {
                kind = ColumnKind::Float;
            }
        } else if kind == ColumnKind::Integer && cell.parse::<i64>().is_ok() {
            continue;
        } else if cell.parse::<f64>().is_ok() {
            kind = ColumnKind::Float;
        } else {
            return ColumnKind::Text;
        }
    }
    kind
}

fn kind_of_cells<'a>(cells: impl Iterator<Item = &'a Scalar>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells {
        match cell {
            Scalar::Int(_) => {}
            Scalar::Float(_) | Scalar::Null => {
                if kind == ColumnKind::Integer {
                    kind = ColumnKind::Float;
                }
            }
            Scalar::Text(_) => return ColumnKind::Text,
        }
    }
    kind
}

fn convert_cell(cell: &str, kind: ColumnKind) -> Scalar {
    if is_missing(cell) {
        return Scalar::Null;
    }
    match kind {
        ColumnKind::Integer => cell.parse().map_or(Scalar::Null, Scalar::Int),
        ColumnKind::Float => cell.parse().map_or(Scalar::Null, Scalar::Float),
        ColumnKind::Text => Scalar::Text(cell.to_string()),
    }
}

/// Interpret the `pure` request flag. Absent means pure; only `0`, `false`
/// and `False` select the full catalog.
pub fn parse_pure_flag(flag: Option<&str>) -> bool {
    !matches!(flag, Some("0" | "false" | "False"))
}

/// The two catalog variants, loaded together at startup.
#[derive(Debug, Clone)]
pub struct CatalogSet {
    pub pure: CatalogTable,
    pub full: CatalogTable,
}

impl CatalogSet {
    pub fn load(layout: &DataLayout) -> Result<Self> {
        let pure = CatalogTable::load(&layout.catalog_path(true))?;
        let full = CatalogTable::load(&layout.catalog_path(false))?;
        Ok(Self { pure, full })
    }

    pub fn select(&self, pure: bool) -> &CatalogTable {
        if pure {
            &self.pure
        } else {
            &self.full
        }
    }
}
