//! Cone-search client for the ZTF light-curve service.
//!
//! The service answers a `POS=CIRCLE ra dec radius_deg` query with a VOTable
//! holding one row per epoch of every ZTF object inside the cone. Only the
//! requested columns are kept. Any failure along the way surfaces as
//! [`Error::UpstreamQueryFailed`]; callers never see a partial table.

use std::time::Duration;

use reqwest::Client;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::config::ZtfConfig;
use crate::core::Scalar;
use crate::parsing::votable_parser::{parse_votable, VoTable};
use crate::{Error, Result};

/// Rows carrying any of these flag bits are dropped by the service.
pub const BAD_CATFLAGS_MASK: u32 = 32768;

/// Columns returned when a client does not name any.
pub const DEFAULT_COLUMNS: [&str; 3] = ["mag", "magerr", "mjd"];

/// Requested columns of a cross-match, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossMatchTable {
    columns: Vec<(String, Vec<Scalar>)>,
}

impl CrossMatchTable {
    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Number of rows, 0 for a table without columns.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for CrossMatchTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in &self.columns {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Split a comma-separated column list. [`DEFAULT_COLUMNS`] apply only when
/// no list is given; an explicit empty list selects nothing.
pub fn parse_columns(cols: Option<&str>) -> Vec<String> {
    match cols {
        Some(cols) => cols
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        None => DEFAULT_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
    }
}

/// Keep only `columns` of a parsed VOTable.
pub fn select_columns(table: &VoTable, columns: &[String]) -> Result<CrossMatchTable> {
    let columns = columns
        .iter()
        .map(|name| {
            table
                .column(name)
                .map(|values| (name.clone(), values))
                .ok_or_else(|| Error::UpstreamQueryFailed(format!("missing column '{}'", name)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CrossMatchTable { columns })
}

pub struct ZtfSource {
    client: Client,
    endpoint: String,
}

impl ZtfSource {
    pub fn new(config: &ZtfConfig) -> Result<Self> {
        Self::with_endpoint(config.endpoint.clone(), config.timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    /// Cone search around (`ra`, `dec`) in degrees with a radius in
    /// arcseconds.
    pub async fn query(
        &self,
        ra: f64,
        dec: f64,
        radius_arcsec: f64,
        columns: &[String],
    ) -> Result<CrossMatchTable> {
        let pos = format!("CIRCLE {} {} {}", ra, dec, radius_arcsec / 3600.0);
        debug!(endpoint = %self.endpoint, pos = %pos, "querying ZTF light curves");

        let mask = BAD_CATFLAGS_MASK.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("POS", pos.as_str()), ("BAD_CATFLAGS_MASK", mask.as_str())])
            .send()
            .await
            .map_err(|e| upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream(format!("service returned HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| upstream(e.to_string()))?;
        let table = parse_votable(&body).map_err(|e| upstream(e.to_string()))?;
        debug!(rows = table.len(), fields = table.fields.len(), "ZTF response parsed");

        select_columns(&table, columns)
    }
}

fn upstream(message: String) -> Error {
    warn!(error = %message, "ZTF query failed");
    Error::UpstreamQueryFailed(message)
}
