//! Parser for the catalog filter language.
//!
//! A filter is a comma-separated list of clauses, all of which must hold:
//!
//! ```text
//! w1mag>15.2, Designation=="WISEA J000000", period_peak_1 >= 1e2
//! ```
//!
//! Clause grammar:
//!
//! ```text
//! clause := ws* ident ws* op ws* (number | string) ws*
//! ident  := [A-Za-z_] [A-Za-z0-9_?()-]*
//! op     := "<=" | ">=" | "==" | "!=" | "<" | ">" | "="
//! number := [+-]? digit+ ("." digit+)? ([eE] [+-]? digit+)?
//! string := '"' [^"]* '"'
//! ```
//!
//! Strings have no escapes. `=` means `==`. String literals only work with
//! the equality operators.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Apply the operator to two numbers.
    pub fn compare_f64(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub column: String,
    pub op: CompareOp,
    pub value: FilterValue,
}

/// Clauses combined with logical AND, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    pub clauses: Vec<FilterClause>,
}

impl FilterExpression {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

pub struct FilterParser;

impl FilterParser {
    /// Parse `text` and check every clause against `columns`.
    ///
    /// Clauses are checked one at a time; for each one the grammar is checked
    /// first, then the column, then the operator / literal combination. The
    /// first failing clause decides the error.
    pub fn parse<S: AsRef<str>>(text: &str, columns: &[S]) -> Result<FilterExpression> {
        let mut clauses = Vec::new();
        for raw in split_clauses(text) {
            let clause = parse_clause(raw)?;
            if !columns.iter().any(|c| c.as_ref() == clause.column) {
                return Err(Error::UnknownColumn(clause.column));
            }
            check_operator(&clause, raw)?;
            clauses.push(clause);
        }
        Ok(FilterExpression { clauses })
    }
}

fn split_clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|c| !c.is_empty())
}

fn check_operator(clause: &FilterClause, raw: &str) -> Result<()> {
    if matches!(clause.value, FilterValue::Text(_)) && !clause.op.is_equality() {
        return Err(Error::UnsupportedStringOperator(raw.to_string()));
    }
    Ok(())
}

/// Parse a single, already trimmed clause.
pub fn parse_clause(raw: &str) -> Result<FilterClause> {
    let invalid = || Error::InvalidFilterSyntax(raw.to_string());
    let mut cursor = Cursor::new(raw);

    cursor.skip_whitespace();
    let column = cursor.identifier().ok_or_else(invalid)?;
    cursor.skip_whitespace();
    let op = cursor.operator().ok_or_else(invalid)?;
    cursor.skip_whitespace();
    let value = cursor.value().ok_or_else(invalid)?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(invalid());
    }

    Ok(FilterClause { column: column.to_string(), op, value })
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn identifier(&mut self) -> Option<&'a str> {
        let first = self.peek()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        Some(self.eat_while(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '?' | '(' | ')' | '-')
        }))
    }

    fn operator(&mut self) -> Option<CompareOp> {
        const OPERATORS: [(&str, CompareOp); 7] = [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
            ("=", CompareOp::Eq),
        ];
        let rest = self.rest();
        let (symbol, op) = OPERATORS.iter().find(|(symbol, _)| rest.starts_with(symbol))?;
        self.pos += symbol.len();
        Some(*op)
    }

    fn value(&mut self) -> Option<FilterValue> {
        if self.peek()? == '"' {
            self.bump();
            let body = self.eat_while(|c| c != '"');
            self.bump().filter(|&c| c == '"')?;
            return Some(FilterValue::Text(body.to_string()));
        }
        self.number().map(FilterValue::Number)
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
            return None;
        }
        if self.peek() == Some('.') {
            self.bump();
            if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
                return None;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
                return None;
            }
        }
        self.text[start..self.pos].parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 4] = ["cluster_id", "w1mag", "Designation", "period_peak_1"];

    #[test]
    fn test_parse_numeric_clause() {
        let clause = parse_clause("w1mag>15.2").unwrap();
        assert_eq!(clause.column, "w1mag");
        assert_eq!(clause.op, CompareOp::Gt);
        assert_eq!(clause.value, FilterValue::Number(15.2));
    }

    #[test]
    fn test_single_equals_is_equality() {
        let clause = parse_clause("w1mag = 3").unwrap();
        assert_eq!(clause.op, CompareOp::Eq);
    }

    #[test]
    fn test_two_char_operators_take_precedence() {
        assert_eq!(parse_clause("a<=1").unwrap().op, CompareOp::Le);
        assert_eq!(parse_clause("a>=1").unwrap().op, CompareOp::Ge);
        assert_eq!(parse_clause("a!=1").unwrap().op, CompareOp::Ne);
        assert_eq!(parse_clause("a==1").unwrap().op, CompareOp::Eq);
    }

    #[test]
    fn test_number_formats() {
        let value = |s: &str| parse_clause(s).unwrap().value;
        assert_eq!(value("a>-1.5e3"), FilterValue::Number(-1500.0));
        assert_eq!(value("a>+2E-2"), FilterValue::Number(0.02));
        assert_eq!(value("a>7"), FilterValue::Number(7.0));
        assert!(parse_clause("a>.5").is_err());
        assert!(parse_clause("a>5.").is_err());
        assert!(parse_clause("a>5e").is_err());
        assert!(parse_clause("a>0x10").is_err());
    }

    #[test]
    fn test_identifier_charset() {
        assert_eq!(parse_clause("flag(w1)?-x<1").unwrap().column, "flag(w1)?-x");
        assert!(parse_clause("1abc<1").is_err());
        assert!(parse_clause("a.b<1").is_err());
    }

    #[test]
    fn test_string_literal_has_no_escapes() {
        let clause = parse_clause(r#"Designation=="WISEA J000000""#).unwrap();
        assert_eq!(clause.value, FilterValue::Text("WISEA J000000".to_string()));
        assert!(parse_clause(r#"Designation=="a\"b""#).is_err());
        assert!(parse_clause(r#"Designation=="open"#).is_err());
    }

    #[test]
    fn test_invalid_clause_is_echoed_verbatim() {
        let err = FilterParser::parse("w1mag >> 5", &COLUMNS).unwrap_err();
        assert!(matches!(&err, Error::InvalidFilterSyntax(c) if c == "w1mag >> 5"));
        assert_eq!(err.to_string(), "Invalid clause: 'w1mag >> 5'");
    }

    #[test]
    fn test_unknown_column() {
        let err = FilterParser::parse("w3mag>1", &COLUMNS).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(c) if c == "w3mag"));
    }

    #[test]
    fn test_string_with_ordering_operator() {
        let err = FilterParser::parse(r#"Designation>"W""#, &COLUMNS).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStringOperator(_)));
    }

    #[test]
    fn test_first_failing_clause_wins() {
        let err = FilterParser::parse("w3mag>1, w1mag >> 5", &COLUMNS).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(_)));
    }

    #[test]
    fn test_empty_pieces_are_dropped() {
        let expr = FilterParser::parse(" , w1mag<3 ,, period_peak_1>=10 , ", &COLUMNS).unwrap();
        assert_eq!(expr.len(), 2);
        assert!(FilterParser::parse("  ", &COLUMNS).unwrap().is_empty());
        assert!(FilterParser::parse("", &COLUMNS).unwrap().is_empty());
    }
}
