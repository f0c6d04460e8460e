use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::{serialize_finite, ClusterId, Scalar, DEFAULT_PERIOD};
use crate::querying::pagination::{CatalogQuery, Page, PageRequest};
use crate::sources::ztf_source::{CrossMatchTable, ZtfSource};
use crate::storage::catalog_store::{CatalogSet, CatalogTable};
use crate::storage::object_store::{ObjectRecord, ObjectStore};
use crate::{Error, Result};

/// Catalog column holding the display name of an object.
pub const TITLE_COLUMN: &str = "Designation";

/// Catalog column holding the primary period estimate.
pub const PERIOD_COLUMN: &str = "period_peak_1";

fn serialize_id<S: Serializer>(id: &ClusterId, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

/// Light curve arrays of one object, parallel by epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCurveSeries {
    #[serde(serialize_with = "serialize_finite")]
    pub t: Vec<f64>,
    #[serde(serialize_with = "serialize_finite")]
    pub w1: Vec<f64>,
    #[serde(serialize_with = "serialize_finite")]
    pub w1s: Vec<f64>,
    #[serde(serialize_with = "serialize_finite")]
    pub w2: Vec<f64>,
    #[serde(serialize_with = "serialize_finite")]
    pub w2s: Vec<f64>,
}

impl From<ObjectRecord> for LightCurveSeries {
    fn from(record: ObjectRecord) -> Self {
        Self {
            t: record.mjd,
            w1: record.w1mag,
            w1s: record.w1sigmag,
            w2: record.w2mag,
            w2s: record.w2sigmag,
        }
    }
}

/// Everything the object page shows about one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectDetail {
    #[serde(serialize_with = "serialize_id")]
    pub cluster_id: ClusterId,
    pub title: String,
    /// Catalog row without the id, in column order
    pub columns: Map<String, Value>,
    pub series: LightCurveSeries,
    pub period: f64,
    #[serde(serialize_with = "serialize_id")]
    pub prev_id: ClusterId,
    #[serde(serialize_with = "serialize_id")]
    pub next_id: ClusterId,
}

/// Application context shared by every request handler.
pub struct VarwiseApi {
    catalogs: CatalogSet,
    objects: ObjectStore,
    ztf: ZtfSource,
}

impl VarwiseApi {
    pub fn new(catalogs: CatalogSet, objects: ObjectStore, ztf: ZtfSource) -> Self {
        Self { catalogs, objects, ztf }
    }

    /// Load both catalogs from the configured data directory. Object data is
    /// opened lazily on the first lookup.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let catalogs = CatalogSet::load(&config.layout)?;
        let objects = ObjectStore::new(config.layout.clone());
        let ztf = ZtfSource::new(&config.ztf)?;
        info!(
            pure_rows = catalogs.pure.len(),
            full_rows = catalogs.full.len(),
            data_dir = %config.layout.base.display(),
            "application context ready"
        );
        Ok(Self::new(catalogs, objects, ztf))
    }

    pub fn catalog(&self, pure: bool) -> &CatalogTable {
        self.catalogs.select(pure)
    }

    pub fn catalog_page(&self, pure: bool, request: &PageRequest) -> Result<Page<'_>> {
        CatalogQuery::page(self.catalog(pure), request)
    }

    /// Assemble the detail of one object. The id must be present in the
    /// selected catalog before the object dataset is consulted. Blocks on
    /// Parquet I/O.
    pub fn object_detail(&self, cluster_id: ClusterId, pure: bool) -> Result<ObjectDetail> {
        let table = self.catalog(pure);
        let (Some(row), Some((prev_id, next_id))) =
            (table.row(cluster_id), table.neighbors(cluster_id))
        else {
            debug!(cluster_id, pure, "object not in catalog");
            return Err(Error::ObjectNotFound(cluster_id));
        };

        let record = self.objects.lookup(cluster_id)?;
        debug!(cluster_id, epochs = record.len(), "object record loaded");

        Ok(assemble(table, row, record, prev_id, next_id))
    }

    pub async fn crossmatch(
        &self,
        ra: f64,
        dec: f64,
        radius_arcsec: f64,
        columns: &[String],
    ) -> Result<CrossMatchTable> {
        self.ztf.query(ra, dec, radius_arcsec, columns).await
    }
}

fn assemble(
    table: &CatalogTable,
    row: &[Scalar],
    record: ObjectRecord,
    prev_id: ClusterId,
    next_id: ClusterId,
) -> ObjectDetail {
    let cluster_id = record.cluster_id;

    let columns: Map<String, Value> = table
        .columns()
        .iter()
        .zip(row)
        .skip(1)
        .map(|(name, cell)| (name.clone(), cell.to_json()))
        .collect();

    let title = match table.column_index(TITLE_COLUMN).map(|i| &row[i]) {
        Some(Scalar::Null) | None => cluster_id.to_string(),
        Some(cell) => cell.to_string(),
    };

    let period = table
        .column_index(PERIOD_COLUMN)
        .and_then(|i| row[i].as_f64())
        .filter(|p| *p > 0.0)
        .unwrap_or(DEFAULT_PERIOD);

    ObjectDetail {
        cluster_id,
        title,
        columns,
        series: record.into(),
        period,
        prev_id,
        next_id,
    }
}
