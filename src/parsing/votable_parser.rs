//! Minimal VOTable reader.
//!
//! Reads the first `TABLE` of a VOTable document serialised as `TABLEDATA`,
//! which is what the IRSA light-curve service returns. `BINARY` / `FITS`
//! serialisations are not supported.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::core::Scalar;

#[derive(Debug, Error)]
pub enum VoTableError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("VOTable contains no TABLE element")]
    NoTable,

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth { row: usize, found: usize, expected: usize },

    #[error("service reported an error: {0}")]
    QueryStatus(String),
}

/// Column declaration of a VOTable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoField {
    pub name: String,
    pub datatype: String,
}

impl VoField {
    fn is_float(&self) -> bool {
        matches!(self.datatype.as_str(), "double" | "float")
    }

    fn is_integer(&self) -> bool {
        matches!(self.datatype.as_str(), "long" | "int" | "short" | "unsignedByte")
    }

    fn convert(&self, raw: &str) -> Scalar {
        let raw = raw.trim();
        if self.is_float() {
            Scalar::Float(raw.parse().unwrap_or(f64::NAN))
        } else if self.is_integer() {
            if raw.is_empty() {
                Scalar::Null
            } else {
                raw.parse::<i64>()
                    .map(Scalar::Int)
                    .or_else(|_| raw.parse::<f64>().map(Scalar::Float))
                    .unwrap_or(Scalar::Null)
            }
        } else {
            Scalar::Text(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoTable {
    pub fields: Vec<VoField>,
    pub rows: Vec<Vec<Scalar>>,
}

impl VoTable {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<Scalar>> {
        let idx = self.field_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse the first table of a VOTable document.
pub fn parse_votable(xml: &str) -> Result<VoTable, VoTableError> {
    let mut reader = Reader::from_str(xml);

    let mut table = VoTable::default();
    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    let mut found_table = false;
    let mut in_table = false;
    let mut in_td = false;
    let mut row: Option<Vec<String>> = None;
    let mut cell = String::new();
    let mut status_error: Option<String> = None;
    let mut in_status_info = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"TABLE" if !found_table => {
                    found_table = true;
                    in_table = true;
                }
                b"FIELD" if in_table => table.fields.push(field_from(&e)),
                b"TR" if in_table => row = Some(Vec::new()),
                b"TD" if row.is_some() => {
                    in_td = true;
                    cell.clear();
                }
                b"INFO" if is_error_status(&e) => {
                    in_status_info = true;
                    status_error = Some(String::new());
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"FIELD" if in_table => table.fields.push(field_from(&e)),
                b"TD" => {
                    if let Some(r) = row.as_mut() {
                        r.push(String::new());
                    }
                }
                b"INFO" if is_error_status(&e) => {
                    status_error = Some("query status ERROR".to_string());
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| VoTableError::Xml(err.to_string()))?;
                if in_td {
                    cell.push_str(&text);
                } else if in_status_info {
                    if let Some(msg) = status_error.as_mut() {
                        msg.push_str(text.trim());
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_td {
                    cell.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"TD" if in_td => {
                    in_td = false;
                    if let Some(r) = row.as_mut() {
                        r.push(std::mem::take(&mut cell));
                    }
                }
                b"TR" => {
                    if let Some(r) = row.take() {
                        raw_rows.push(r);
                    }
                }
                b"TABLE" if in_table => in_table = false,
                b"INFO" => in_status_info = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(VoTableError::Xml(e.to_string())),
            _ => {}
        }
    }

    if let Some(msg) = status_error {
        return Err(VoTableError::QueryStatus(msg));
    }
    if !found_table {
        return Err(VoTableError::NoTable);
    }

    let expected = table.fields.len();
    for (i, raw) in raw_rows.into_iter().enumerate() {
        if raw.len() != expected {
            return Err(VoTableError::RowWidth { row: i, found: raw.len(), expected });
        }
        let converted = table.fields.iter().zip(&raw).map(|(f, v)| f.convert(v)).collect();
        table.rows.push(converted);
    }

    Ok(table)
}

fn field_from(e: &BytesStart<'_>) -> VoField {
    VoField {
        name: attribute(e, "name").unwrap_or_default(),
        datatype: attribute(e, "datatype").unwrap_or_else(|| "char".to_string()),
    }
}

fn is_error_status(e: &BytesStart<'_>) -> bool {
    attribute(e, "name").as_deref() == Some("QUERY_STATUS")
        && attribute(e, "value").as_deref() == Some("ERROR")
}
