//! Evaluation of parsed filter expressions against a catalog table.
//!
//! Rows are referred to by their load-order position, so a filtered view is
//! just a list of positions and can be filtered again without copying cells.

use crate::core::Scalar;
use crate::parsing::filter_parser::{CompareOp, FilterExpression, FilterParser, FilterValue};
use crate::storage::catalog_store::CatalogTable;
use crate::{Error, Result};

/// Rows that passed a filter, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub rows: Vec<usize>,
    pub filtered_count: usize,
}

struct BoundClause<'e> {
    column: usize,
    op: CompareOp,
    value: &'e FilterValue,
}

impl BoundClause<'_> {
    fn matches(&self, cell: &Scalar) -> bool {
        match self.value {
            // NaN and non-numeric cells never match, whatever the operator.
            FilterValue::Number(target) => {
                cell.as_f64().is_some_and(|v| self.op.compare_f64(v, *target))
            }
            FilterValue::Text(target) => {
                let text = cell.to_string();
                match self.op {
                    CompareOp::Ne => text != *target,
                    _ => text == *target,
                }
            }
        }
    }
}

/// Keep the positions in `rows` whose cells satisfy every clause.
pub fn evaluate(
    expr: &FilterExpression,
    table: &CatalogTable,
    rows: &[usize],
) -> Result<FilterOutcome> {
    let bound = expr
        .clauses
        .iter()
        .map(|clause| {
            let column = table
                .column_index(&clause.column)
                .ok_or_else(|| Error::UnknownColumn(clause.column.clone()))?;
            Ok(BoundClause { column, op: clause.op, value: &clause.value })
        })
        .collect::<Result<Vec<_>>>()?;

    let kept: Vec<usize> = rows
        .iter()
        .copied()
        .filter(|&pos| bound.iter().all(|c| c.matches(table.cell(pos, c.column))))
        .collect();

    Ok(FilterOutcome { filtered_count: kept.len(), rows: kept })
}

/// Parse `filter` against the table's columns and evaluate it over the whole
/// table. An absent or blank filter keeps every row.
pub fn apply_filter(table: &CatalogTable, filter: Option<&str>) -> Result<FilterOutcome> {
    let all: Vec<usize> = (0..table.len()).collect();
    match filter {
        Some(text) if !text.trim().is_empty() => {
            let expr = FilterParser::parse(text, table.columns())?;
            evaluate(&expr, table, &all)
        }
        _ => Ok(FilterOutcome { filtered_count: all.len(), rows: all }),
    }
}
