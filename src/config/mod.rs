//! Configuration structures and utilities

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::DEFAULT_PORT;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "VARWISE_VIEW_DATA_DIR";

/// Light-curve endpoint of the IRSA ZTF service.
pub const ZTF_ENDPOINT: &str = "https://irsa.ipac.caltech.edu/cgi-bin/ZTF/nph_light_curves";

/// File layout of an acquired data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub base: PathBuf,
}

impl DataLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `pure_catalog.csv` for the pure variant, `catalog.csv` otherwise.
    pub fn catalog_path(&self, pure: bool) -> PathBuf {
        self.base.join(if pure { "pure_catalog.csv" } else { "catalog.csv" })
    }

    /// Root of the hive-partitioned Parquet dataset.
    pub fn object_data_dir(&self) -> PathBuf {
        self.base.join("data")
    }
}

/// Resolve the data directory.
///
/// Order: explicit override, then `VARWISE_VIEW_DATA_DIR`, then the per-user
/// data directory of the OS.
pub fn resolve_data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("varwise-view"),
    }
}

/// Settings of the cross-match client.
#[derive(Debug, Clone)]
pub struct ZtfConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ZtfConfig {
    fn default() -> Self {
        Self { endpoint: ZTF_ENDPOINT.to_string(), timeout: Duration::from_secs(30) }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub layout: DataLayout,
    pub ztf: ZtfConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            layout: DataLayout::new(resolve_data_dir(None)),
            ztf: ZtfConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
