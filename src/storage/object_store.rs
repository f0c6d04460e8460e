//! Point lookups into the partitioned object dataset.
//!
//! The dataset is a directory of Parquet files laid out hive-style:
//!
//! ```text
//! data/
//!   partition=0/part-0.parquet
//!   partition=1/part-0.parquet
//!   partition=1/part-1.parquet
//! ```
//!
//! Every file holds one row per cluster with the columns `cluster_id`, `mjd`,
//! `w1flux`, `w1sigflux`, `w2flux` and `w2sigflux`, the last five being lists
//! of floats. The partition of a cluster is the top 16 bits of its id, so a
//! lookup only opens the files of one partition and then filters rows on the
//! exact id inside each file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, LargeListArray, ListArray, RecordBatch, UInt16Array, UInt32Array,
    UInt64Array, UInt8Array,
};
use arrow_schema::ArrowError;
use parquet::arrow::arrow_reader::{ArrowPredicateFn, ParquetRecordBatchReaderBuilder, RowFilter};
use parquet::arrow::ProjectionMask;
use tracing::debug;

use crate::config::DataLayout;
use crate::core::{magnitude_errors, magnitudes, partition_of, Band, ClusterId, CLUSTER_ID_COLUMN};
use crate::storage::dataset_cache::DatasetCache;
use crate::{Error, Result};

/// Hive key naming the partition directory.
pub const PARTITION_KEY: &str = "partition";

const SERIES_COLUMNS: [&str; 5] = ["mjd", "w1flux", "w1sigflux", "w2flux", "w2sigflux"];

/// Time series of one cluster, with magnitudes derived from the fluxes.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub cluster_id: ClusterId,
    pub mjd: Vec<f64>,
    pub w1flux: Vec<f64>,
    pub w1sigflux: Vec<f64>,
    pub w2flux: Vec<f64>,
    pub w2sigflux: Vec<f64>,
    pub w1mag: Vec<f64>,
    pub w1sigmag: Vec<f64>,
    pub w2mag: Vec<f64>,
    pub w2sigmag: Vec<f64>,
}

impl ObjectRecord {
    /// Build a record from raw fluxes and derive the magnitude columns.
    pub fn from_fluxes(
        cluster_id: ClusterId,
        mjd: Vec<f64>,
        w1flux: Vec<f64>,
        w1sigflux: Vec<f64>,
        w2flux: Vec<f64>,
        w2sigflux: Vec<f64>,
    ) -> Self {
        let w1mag = magnitudes(Band::W1, &w1flux);
        let w2mag = magnitudes(Band::W2, &w2flux);
        let w1sigmag = magnitude_errors(&w1flux, &w1sigflux);
        let w2sigmag = magnitude_errors(&w2flux, &w2sigflux);
        Self {
            cluster_id,
            mjd,
            w1flux,
            w1sigflux,
            w2flux,
            w2sigflux,
            w1mag,
            w1sigmag,
            w2mag,
            w2sigmag,
        }
    }

    pub fn len(&self) -> usize {
        self.mjd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mjd.is_empty()
    }
}

/// One Parquet file of the dataset and the partition its path names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFragment {
    pub path: PathBuf,
    pub partition: Option<i64>,
}

/// Directory listing of a partitioned dataset.
#[derive(Debug)]
pub struct PartitionedDataset {
    root: PathBuf,
    fragments: Vec<DatasetFragment>,
}

impl PartitionedDataset {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::ObjectDataUnavailable(root.to_path_buf()));
        }
        let mut fragments = Vec::new();
        discover(root, root, &mut fragments)?;
        fragments.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %root.display(), fragments = fragments.len(), "dataset opened");
        Ok(Self { root: root.to_path_buf(), fragments })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fragments(&self) -> &[DatasetFragment] {
        &self.fragments
    }

    /// Fragments that may hold rows of `partition`. Files outside any
    /// `partition=` directory are candidates, but only their physical
    /// partition column can make them match.
    pub fn fragments_for(&self, partition: i64) -> impl Iterator<Item = &DatasetFragment> {
        self.fragments.iter().filter(move |f| f.partition.map_or(true, |p| p == partition))
    }

    /// Fetch the single record of `cluster_id`.
    pub fn lookup(&self, cluster_id: ClusterId) -> Result<ObjectRecord> {
        let partition = partition_of(cluster_id);
        let mut matches = Vec::new();
        let mut scanned = 0usize;
        for fragment in self.fragments_for(partition) {
            scanned += 1;
            scan_fragment(fragment, cluster_id, partition, &mut matches)?;
        }
        debug!(cluster_id, partition, scanned, matches = matches.len(), "object lookup");

        match matches.len() {
            0 => Err(Error::ObjectNotFound(cluster_id)),
            1 => Ok(matches.remove(0)),
            n => Err(Error::AmbiguousObject { cluster_id, matches: n }),
        }
    }
}

fn discover(root: &Path, dir: &Path, out: &mut Vec<DatasetFragment>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if path.is_dir() {
            discover(root, &path, out)?;
        } else if path.extension().is_some_and(|e| e == "parquet") {
            let partition = hive_partition(root, &path)?;
            out.push(DatasetFragment { path, partition });
        }
    }
    Ok(())
}

/// Value of the `partition=<k>` segment of a file path, if any.
fn hive_partition(root: &Path, file: &Path) -> Result<Option<i64>> {
    let relative = file.strip_prefix(root).unwrap_or(file);
    for component in relative.parent().into_iter().flat_map(Path::components) {
        let segment = component.as_os_str().to_string_lossy();
        if let Some((key, value)) = segment.split_once('=') {
            if key == PARTITION_KEY {
                let partition = value.parse().map_err(|_| {
                    Error::Dataset(format!("invalid partition directory '{}'", segment))
                })?;
                return Ok(Some(partition));
            }
        }
    }
    Ok(None)
}

/// Read the rows of one file matching the id and, when the file carries a
/// physical partition column, the partition as well. A file with neither a
/// directory key nor a partition column has a null partition and never
/// matches.
fn scan_fragment(
    fragment: &DatasetFragment,
    cluster_id: ClusterId,
    partition: i64,
    out: &mut Vec<ObjectRecord>,
) -> Result<()> {
    let path = fragment.path.as_path();
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::clone(builder.schema());

    let id_root = schema.index_of(CLUSTER_ID_COLUMN).map_err(|_| missing_column(path, CLUSTER_ID_COLUMN))?;
    let partition_root = schema.index_of(PARTITION_KEY).ok();
    if fragment.partition.is_none() && partition_root.is_none() {
        debug!(path = %path.display(), "skipping file without a partition key");
        return Ok(());
    }

    let mut predicate_roots = vec![id_root];
    predicate_roots.extend(partition_root);
    let predicate_mask = ProjectionMask::roots(builder.parquet_schema(), predicate_roots);
    let predicate = ArrowPredicateFn::new(predicate_mask, move |batch: RecordBatch| {
        row_mask(&batch, cluster_id, partition_root.map(|_| partition))
    });

    let mut output_roots = vec![id_root];
    for name in SERIES_COLUMNS {
        output_roots.push(schema.index_of(name).map_err(|_| missing_column(path, name))?);
    }
    let output_mask = ProjectionMask::roots(builder.parquet_schema(), output_roots);

    let reader = builder
        .with_projection(output_mask)
        .with_row_filter(RowFilter::new(vec![Box::new(predicate)]))
        .build()?;

    for batch in reader {
        let batch = batch?;
        let series: Vec<&ArrayRef> = SERIES_COLUMNS
            .iter()
            .map(|name| batch.column_by_name(name).ok_or_else(|| missing_column(path, name)))
            .collect::<Result<_>>()?;
        for row in 0..batch.num_rows() {
            out.push(ObjectRecord::from_fluxes(
                cluster_id,
                list_row(series[0], row)?,
                list_row(series[1], row)?,
                list_row(series[2], row)?,
                list_row(series[3], row)?,
                list_row(series[4], row)?,
            ));
        }
    }
    Ok(())
}

fn missing_column(path: &Path, column: &str) -> Error {
    Error::Dataset(format!("column '{}' missing from {}", column, path.display()))
}

fn row_mask(
    batch: &RecordBatch,
    cluster_id: ClusterId,
    partition: Option<i64>,
) -> std::result::Result<BooleanArray, ArrowError> {
    let ids = batch
        .column_by_name(CLUSTER_ID_COLUMN)
        .ok_or_else(|| ArrowError::SchemaError(format!("missing {}", CLUSTER_ID_COLUMN)))?;
    let ids = integer_values(ids)?;

    let partitions = match partition {
        Some(_) => {
            let column = batch
                .column_by_name(PARTITION_KEY)
                .ok_or_else(|| ArrowError::SchemaError(format!("missing {}", PARTITION_KEY)))?;
            Some(integer_values(column)?)
        }
        None => None,
    };

    Ok((0..ids.len())
        .map(|i| {
            let id_match = ids[i] == Some(cluster_id);
            let partition_match = match (&partitions, partition) {
                (Some(values), Some(p)) => values[i] == Some(p),
                _ => true,
            };
            Some(id_match && partition_match)
        })
        .collect())
}

/// Integer column as `i64`, whatever its physical width.
fn integer_values(array: &ArrayRef) -> std::result::Result<Vec<Option<i64>>, ArrowError> {
    macro_rules! widen {
        ($($ty:ty),*) => {
            $(
                if let Some(a) = array.as_any().downcast_ref::<$ty>() {
                    return Ok(a.iter().map(|v| v.map(|v| v as i64)).collect());
                }
            )*
        };
    }
    widen!(Int64Array, UInt64Array, Int32Array, UInt32Array, Int16Array, UInt16Array, Int8Array, UInt8Array);
    Err(ArrowError::SchemaError(format!("expected an integer column, found {}", array.data_type())))
}

/// Values of the list cell at `row` as `f64`, nulls as NaN.
fn list_row(column: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    let values = if let Some(list) = column.as_any().downcast_ref::<ListArray>() {
        if list.is_null(row) {
            return Ok(Vec::new());
        }
        list.value(row)
    } else if let Some(list) = column.as_any().downcast_ref::<LargeListArray>() {
        if list.is_null(row) {
            return Ok(Vec::new());
        }
        list.value(row)
    } else {
        return Err(Error::Dataset(format!("expected a list column, found {}", column.data_type())));
    };

    if let Some(a) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(a.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(a) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(a.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        Err(Error::Dataset(format!("expected float list values, found {}", values.data_type())))
    }
}

/// Object lookups against the dataset of a data directory, reusing the
/// opened dataset between calls.
#[derive(Debug)]
pub struct ObjectStore {
    layout: DataLayout,
    cache: DatasetCache,
}

impl ObjectStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout, cache: DatasetCache::new() }
    }

    pub fn lookup(&self, cluster_id: ClusterId) -> Result<ObjectRecord> {
        self.lookup_at(&self.layout.object_data_dir(), cluster_id)
    }

    /// Lookup against an explicit dataset root. The cached dataset is
    /// replaced when `root` differs from the cached one.
    pub fn lookup_at(&self, root: &Path, cluster_id: ClusterId) -> Result<ObjectRecord> {
        self.cache.get_or_open(root)?.lookup(cluster_id)
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hive_partition_from_path() {
        let root = Path::new("/data");
        assert_eq!(
            hive_partition(root, Path::new("/data/partition=3/part-0.parquet")).unwrap(),
            Some(3)
        );
        assert_eq!(
            hive_partition(root, Path::new("/data/year=1/partition=12/x.parquet")).unwrap(),
            Some(12)
        );
        assert_eq!(hive_partition(root, Path::new("/data/x.parquet")).unwrap(), None);
        assert!(hive_partition(root, Path::new("/data/partition=abc/x.parquet")).is_err());
    }

    #[test]
    fn test_record_derives_magnitudes() {
        let record = ObjectRecord::from_fluxes(
            1,
            vec![58000.0, 58001.0],
            vec![1000.0, -1.0],
            vec![10.0, 1.0],
            vec![500.0, 500.0],
            vec![5.0, 5.0],
        );
        assert_eq!(record.len(), 2);
        assert!((record.w1mag[0] - Band::W1.magnitude(1000.0)).abs() < 1e-12);
        assert!(record.w1mag[1].is_nan());
        assert!((record.w2sigmag[0] - 0.010_857_362_047_581_294).abs() < 1e-12);
    }

    #[test]
    fn test_missing_root_is_unavailable() {
        let err = PartitionedDataset::open(Path::new("/nonexistent/varwise/data")).unwrap_err();
        assert!(matches!(err, Error::ObjectDataUnavailable(_)));
    }

    #[test]
    fn test_integer_values_widen() {
        let array: ArrayRef = Arc::new(Int32Array::from(vec![Some(1), None, Some(-4)]));
        assert_eq!(integer_values(&array).unwrap(), vec![Some(1), None, Some(-4)]);
        let array: ArrayRef = Arc::new(Float64Array::from(vec![1.0]));
        assert!(integer_values(&array).is_err());
    }
}
