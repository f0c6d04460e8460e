//! VarWISE View server
//!
//! Serves the VarWISE catalog browser and object pages from an acquired data
//! directory.
//!
//! Usage:
//!   varwise-view --host 0.0.0.0 --port 9000 --data-dir ./varwise-data

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use varwise_view::{
    api::VarwiseApi,
    config::{resolve_data_dir, AppConfig, DataLayout, ZtfConfig, ZTF_ENDPOINT},
    core::DEFAULT_PORT,
    http::start_server,
};

#[derive(Parser, Debug)]
#[command(name = "varwise-view")]
#[command(about = "Browse the VarWISE catalog of variable mid-infrared sources", long_about = None)]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Data directory (overrides VARWISE_VIEW_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value = ZTF_ENDPOINT)]
    ztf_endpoint: String,

    #[arg(long, default_value_t = 30)]
    ztf_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> AppConfig {
        AppConfig {
            host: self.host,
            port: self.port,
            layout: DataLayout::new(resolve_data_dir(self.data_dir.as_deref())),
            ztf: ZtfConfig {
                endpoint: self.ztf_endpoint,
                timeout: Duration::from_secs(self.ztf_timeout_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config();
    info!(data_dir = %config.layout.base.display(), "loading catalogs");

    let api = Arc::new(VarwiseApi::from_config(&config)?);
    start_server(&config.bind_addr(), api).await?;

    info!("server stopped");
    Ok(())
}
