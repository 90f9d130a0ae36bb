//! `resumio-upload`: upload one file through a resumable upload session.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use resumio_upload::{ByteSource, UploadStatus, Uploader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "resumio-upload")]
#[command(version)]
#[command(about = "Upload a file through a resumable chunked upload session")]
struct Cli {
    /// File to upload
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Object name sent when negotiating (defaults to the file name)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Content type of the uploaded bytes
    #[arg(long, value_name = "TYPE")]
    content_type: Option<String>,

    /// Session negotiation URL
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Bytes per chunk
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Configuration file (defaults to ~/.config/resumio/uploader.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut file_config = config::Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        file_config.endpoint = endpoint.clone();
    }
    if let Some(chunk_size) = cli.chunk_size {
        file_config.chunk_size = chunk_size;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let status = rt.block_on(run(cli, file_config))?;
    Ok(match status {
        UploadStatus::Done => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn run(cli: Cli, config: config::Config) -> anyhow::Result<UploadStatus> {
    let content_type = cli
        .content_type
        .clone()
        .unwrap_or_else(|| config.content_type.clone());
    let uploader = Uploader::new(config.to_uploader_config())?;

    let source = resumio_upload::FileSource::open(&cli.file)
        .await
        .with_context(|| format!("opening {}", cli.file.display()))?;
    let name = match &cli.name {
        Some(name) => name.clone(),
        None => cli
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("file has no name; pass --name")?,
    };

    tracing::info!(file = %cli.file.display(), %name, size = source.size(), "starting upload");
    let upload = uploader.upload(&name, &content_type, source);

    let size = upload.size();
    upload.on_progress(move |offset| {
        let pct = if size == 0 {
            100.0
        } else {
            offset as f64 * 100.0 / size as f64
        };
        tracing::info!(offset, size, "{pct:.1}%");
    });
    upload.on_error(|err| tracing::warn!(error = %err, "upload error, retrying"));
    upload.on_done(|metadata| match metadata {
        Some(meta) => tracing::info!(%meta, "upload complete"),
        None => tracing::info!("upload complete"),
    });
    upload.on_cancel(|| tracing::warn!("upload cancelled"));

    let finished = tokio::select! {
        finished = upload.wait() => finished,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, cancelling");
            upload.cancel();
            upload.wait().await
        }
    };

    match finished {
        Ok(status) => Ok(status),
        Err(err) => Err(anyhow::anyhow!("upload could not start: {err}")),
    }
}
