//! Parsers for the catalog filter language and for VOTable documents

pub mod filter_parser;
pub mod votable_parser;

pub use filter_parser::{CompareOp, FilterClause, FilterExpression, FilterParser, FilterValue};
pub use votable_parser::{parse_votable, VoField, VoTable, VoTableError};
