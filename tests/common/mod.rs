//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow_array::types::Float64Type;
use arrow_array::{ArrayRef, Int64Array, ListArray, RecordBatch};
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

use varwise_view::config::{AppConfig, DataLayout, ZtfConfig};

/// Id living in partition 1.
pub const PARTITIONED_ID: i64 = 0x0001_0000_0000_2A3F;

pub const CATALOG_HEADER: &str = "cluster_id,Designation,ra,dec,w1mag,period_peak_1";

/// Catalog rows used by most tests, in load order.
pub fn catalog_rows() -> Vec<String> {
    vec![
        "101,WISEA J000101.00+000101.0,10.5,-5.25,14.9,120.5".to_string(),
        "102,WISEA J000102.00+000102.0,11.0,-6.0,15.2,0".to_string(),
        format!("{},WISEA J000103.00+000103.0,12.25,7.5,15.3,", PARTITIONED_ID),
        "104,,13.0,8.0,,33.3".to_string(),
    ]
}

pub fn write_catalog(path: &Path, rows: &[String]) {
    let mut text = String::from(CATALOG_HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

/// Catalog of `n` rows with ids `1..=n` and a descending magnitude column.
pub fn numbered_rows(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| format!("{i},WISEA J{i:06},{i}.0,0.0,{}.5,{}", 20 - (i % 7), i % 3))
        .collect()
}

fn list_column(rows: &[Vec<f64>]) -> ArrayRef {
    Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(
        rows.iter().map(|r| Some(r.iter().copied().map(Some).collect::<Vec<_>>())),
    ))
}

/// Light curve stored for `id`: three epochs with flux derived from the id.
pub fn series_for(id: i64) -> [Vec<f64>; 5] {
    let base = (id % 1000) as f64;
    [
        vec![58000.0, 58001.5, 58003.0],
        vec![1000.0 + base, 1100.0 + base, 900.0 + base],
        vec![10.0, 11.0, 9.0],
        vec![500.0 + base, 550.0 + base, 450.0 + base],
        vec![5.0, 5.5, 4.5],
    ]
}

/// Write one Parquet file holding the given ids, optionally with a physical
/// `partition` column.
pub fn write_fragment(path: &Path, ids: &[i64], partition_column: Option<&[i64]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let series: Vec<[Vec<f64>; 5]> = ids.iter().map(|id| series_for(*id)).collect();
    let column = |k: usize| list_column(&series.iter().map(|s| s[k].clone()).collect::<Vec<_>>());

    let mut columns: Vec<(&str, ArrayRef)> = vec![
        ("cluster_id", Arc::new(Int64Array::from(ids.to_vec())) as ArrayRef),
        ("mjd", column(0)),
        ("w1flux", column(1)),
        ("w1sigflux", column(2)),
        ("w2flux", column(3)),
        ("w2sigflux", column(4)),
    ];
    if let Some(partitions) = partition_column {
        columns.push(("partition", Arc::new(Int64Array::from(partitions.to_vec())) as ArrayRef));
    }

    let batch = RecordBatch::try_from_iter(columns).unwrap();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Data directory with both catalogs and a two-partition object dataset.
/// The pure catalog lacks id 104.
pub fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let rows = catalog_rows();
    write_catalog(&dir.path().join("catalog.csv"), &rows);
    write_catalog(&dir.path().join("pure_catalog.csv"), &rows[..3]);

    let data = dir.path().join("data");
    write_fragment(&data.join("partition=0/part-0.parquet"), &[101, 102, 104], None);
    write_fragment(&data.join("partition=1/part-0.parquet"), &[PARTITIONED_ID], None);
    dir
}

pub fn config_for(dir: &Path, ztf_endpoint: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        layout: DataLayout::new(dir),
        ztf: ZtfConfig {
            endpoint: ztf_endpoint.to_string(),
            timeout: std::time::Duration::from_secs(5),
        },
    }
}

/// Minimal light-curve service answer with two epochs of one object.
pub const ZTF_VOTABLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE version="1.3" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
  <RESOURCE type="results">
    <INFO name="QUERY_STATUS" value="OK"/>
    <TABLE>
      <FIELD name="oid" datatype="long"/>
      <FIELD name="mjd" datatype="double"/>
      <FIELD name="mag" datatype="float"/>
      <FIELD name="magerr" datatype="float"/>
      <FIELD name="filtercode" datatype="char" arraysize="*"/>
      <DATA>
        <TABLEDATA>
          <TR><TD>685</TD><TD>58200.25</TD><TD>17.5</TD><TD>0.02</TD><TD>zg</TD></TR>
          <TR><TD>685</TD><TD>58201.25</TD><TD></TD><TD>0.03</TD><TD>zr</TD></TR>
        </TABLEDATA>
      </DATA>
    </TABLE>
  </RESOURCE>
</VOTABLE>
"#;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
