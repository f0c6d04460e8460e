//! Core data structures and types for VarWISE View

use std::fmt;

use serde::{Serialize, Serializer};

pub mod photometry;
pub use photometry::*;

/// Catalog / dataset identifier of one cluster of detections.
/// The top 16 bits carry the dataset partition the record lives in.
pub type ClusterId = i64;

/// Number of low bits below the partition key.
pub const PARTITION_SHIFT: u32 = 48;

/// Default number of rows per page for grid clients.
pub const PAGINATION_UNIT: usize = 20;

/// Period shown for objects without a usable period estimate.
pub const DEFAULT_PERIOD: f64 = 4000.0;

/// Default localhost port for the server.
pub const DEFAULT_PORT: u16 = 9000;

/// Name of the primary-key column shared by the catalog and the dataset.
pub const CLUSTER_ID_COLUMN: &str = "cluster_id";

/// Storage partition of a cluster id.
pub fn partition_of(cluster_id: ClusterId) -> i64 {
    cluster_id >> PARTITION_SHIFT
}

/// One cell of a catalog row, or one value of a cross-match column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Scalar {
    /// Numeric view of the cell; `None` when it cannot be read as a number.
    /// NaN is reported as `None` so it never takes part in a comparison.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Int(v) => *v as f64,
            Scalar::Float(v) => *v,
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Null => return None,
        };
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }

    /// JSON value of the cell. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Int(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => finite_json(*v),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
            Scalar::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Scalar {
    /// Text form used by string comparisons in filters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => f.write_str(&format_float(*v)),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Null => f.write_str("nan"),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Int(v) => serializer.serialize_i64(*v),
            Scalar::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Scalar::Float(_) | Scalar::Null => serializer.serialize_none(),
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// `15.0`, `15.2`, `1.2e-05`, `1e+16`, `nan`, `inf`, `-inf`.
///
/// Shortest round-trip digits. Decimal exponents below -4 or from 16 up are
/// written in exponent form with a sign and at least two digits.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value != 0.0 {
        let scientific = format!("{:e}", value);
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                if !(-4..16).contains(&exponent) {
                    let sign = if exponent < 0 { '-' } else { '+' };
                    return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
                }
            }
        }
    }
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Finite floats as JSON numbers, everything else as `null`.
pub fn finite_json(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Serialize a float slice with non-finite values as `null`.
pub fn serialize_finite<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| if v.is_finite() { Some(*v) } else { None }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_top_sixteen_bits() {
        assert_eq!(partition_of(0x0001_0000_0000_2A3F), 1);
        assert_eq!(partition_of(0x00FF_0000_0000_0001), 255);
        assert_eq!(partition_of(42), 0);
    }

    #[test]
    fn test_scalar_text_form() {
        assert_eq!(Scalar::Int(15).to_string(), "15");
        assert_eq!(Scalar::Float(15.0).to_string(), "15.0");
        assert_eq!(Scalar::Float(15.2).to_string(), "15.2");
        assert_eq!(Scalar::Float(f64::NAN).to_string(), "nan");
        assert_eq!(Scalar::Null.to_string(), "nan");
        assert_eq!(Scalar::Text("WISEA J000000".into()).to_string(), "WISEA J000000");
    }

    #[test]
    fn test_float_exponent_form() {
        assert_eq!(format_float(1.2e-5), "1.2e-05");
        assert_eq!(format_float(-3.5e-7), "-3.5e-07");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e16), "1.5e+16");
        assert_eq!(format_float(2.5e300), "2.5e+300");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn test_scalar_json_drops_non_finite() {
        assert_eq!(Scalar::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
        assert_eq!(serde_json::to_string(&Scalar::Float(f64::NAN)).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Scalar::Float(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&Scalar::Int(-3)).unwrap(), "-3");
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Scalar::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Scalar::Text("abc".into()).as_f64(), None);
        assert_eq!(Scalar::Float(f64::NAN).as_f64(), None);
        assert_eq!(Scalar::Null.as_f64(), None);
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
    }
}
