use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use snafu::ResultExt;
use target_parquet_core::run_pipeline;
use target_parquet_observability::init_observability;
use target_parquet_writer::ParquetFileWriter;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug};

use crate::{
    config::Config,
    error::{ObservabilitySnafu, Result, WriterSnafu},
    state::emit_state,
};

mod config;
mod error;
mod memory;
mod state;
mod usage;

#[derive(Parser)]
#[command(name = "target-parquet")]
#[command(about = "Singer target that writes record streams to Parquet files")]
#[command(version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_observability(config.log_level()?).context(ObservabilitySnafu {})?;
    debug!(?config, "loaded config");

    if !config.disable_collection {
        usage::spawn_usage_ping(env!("CARGO_PKG_VERSION"));
    }

    let ct = CancellationToken::new();
    let _ct_guard = ct.clone().drop_guard();
    if tracing::enabled!(Level::DEBUG) {
        tokio::spawn(memory::report_memory(ct.child_token()));
    }

    let writer = ParquetFileWriter::try_new(config.write_options()?).context(WriterSnafu {})?;
    let options = config.pipeline_options()?;
    debug!(
        destination = %writer.layout().root().display(),
        file_size = ?options.file_size,
        "writing parquet files"
    );

    let input = BufReader::new(tokio::io::stdin());
    let output = run_pipeline(input, Arc::new(writer), options).await?;

    emit_state(output.state.as_ref(), std::io::stdout().lock())
}
