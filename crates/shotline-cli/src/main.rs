//! Shotline CLI: operator and cron entry points for the listing media pipeline.
//!
//! Configuration comes from the environment (and `.env`); see `shotline_core::Config`.
//! Every command prints one JSON document with a `success` flag.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use shotline_cli::{
    content_type_for, failure_envelope, init_tracing, load_assets, parse_metadata,
    success_envelope,
};
use shotline_core::media_url::{
    filter_by_source, get_media_stats, is_native_url, resolve_media_urls,
};
use shotline_core::models::{MediaUrlSource, Stage};
use shotline_core::{Config, TracingEventSink};
use shotline_services::{
    create_storage, CleanupService, IngestRequest, PipelineError, PipelineService,
    PresignedUploadRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shotline", about = "Listing media pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migration report over a JSON file of asset records
    MediaStats {
        /// JSON array of asset records
        file: PathBuf,
        /// Include every asset with its resolved URL
        #[arg(long)]
        resolve: bool,
        /// Only list assets from this source (native, approved, processed, missing)
        #[arg(long)]
        source: Option<MediaUrlSource>,
    },
    #[command(flatten)]
    Storage(StorageCommands),
}

/// Commands that need a storage backend.
#[derive(Subcommand)]
enum StorageCommands {
    /// Upload a local file into the raw stage
    Ingest {
        listing_id: String,
        /// File to upload
        file: PathBuf,
        /// Defaults to a guess from the file extension
        #[arg(long)]
        content_type: Option<String>,
        /// Room or shot category folder
        #[arg(long)]
        category: Option<String>,
        /// JSON object attached to the ingest event
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Copy a raw object into processing
    PromoteProcessing {
        listing_id: String,
        #[arg(long)]
        raw_path: Option<String>,
    },
    /// Copy a processing object into qc
    PromoteQc {
        listing_id: String,
        #[arg(long)]
        processing_path: Option<String>,
    },
    /// Publish a qc object to final and remove the qc copy
    PromoteFinal {
        listing_id: String,
        #[arg(long)]
        qc_path: Option<String>,
    },
    /// Delete a qc object that failed review
    Reject {
        listing_id: String,
        #[arg(long)]
        qc_path: Option<String>,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Issue a signed URL for a direct raw upload
    Presign {
        listing_id: String,
        filename: String,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Lifetime in seconds; defaults to SIGNED_UPLOAD_EXPIRY_SECS
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// List a listing's objects in one stage
    Contents {
        listing_id: String,
        /// raw, processing, qc or final
        #[arg(long)]
        stage: Stage,
        #[arg(long)]
        category: Option<String>,
    },
    /// Object counts per stage for a listing
    Status { listing_id: String },
    /// Delete expired objects from the temporary stages
    Cleanup {
        /// Sweep only this stage
        #[arg(long)]
        stage: Option<Stage>,
    },
    /// Remove qc copies whose final copy already exists
    Reconcile,
    /// Object counts and sizes for every stage
    StorageStats,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn to_value(value: impl Serialize) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("Serialize response")
}

struct Services {
    pipeline: PipelineService,
    cleanup: CleanupService,
}

async fn services(config: &Config) -> anyhow::Result<Services> {
    config.validate()?;
    tracing::debug!(
        environment = %config.environment,
        backend = %config.storage_backend(),
        "Loaded configuration"
    );
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    Ok(Services {
        pipeline: PipelineService::new(storage.clone(), Arc::new(TracingEventSink))
            .with_signed_upload_expiry(Duration::from_secs(config.signed_upload_expiry_secs)),
        cleanup: CleanupService::new(storage).with_page_size(config.cleanup_page_size),
    })
}

fn media_report(
    file: &std::path::Path,
    resolve: bool,
    source: Option<MediaUrlSource>,
    config: &Config,
) -> anyhow::Result<Value> {
    let assets = load_assets(file)?;
    let origin = config.storage_public_origin.as_deref();
    let resolved = resolve_media_urls(&assets);
    let native_origin_urls = resolved
        .iter()
        .filter_map(|r| r.resolved_url)
        .filter(|url| is_native_url(url, origin))
        .count();

    let mut report = json!({
        "stats": get_media_stats(&assets),
        "native_origin_urls": native_origin_urls,
    });
    if resolve {
        report["assets"] = to_value(&resolved)?;
    }
    if let Some(source) = source {
        report["filtered"] = to_value(filter_by_source(&assets, source))?;
    }
    Ok(report)
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<Value> {
    match command {
        Commands::MediaStats {
            file,
            resolve,
            source,
        } => media_report(&file, resolve, source, config),
        Commands::Storage(command) => run_storage_command(command, config).await,
    }
}

async fn run_storage_command(command: StorageCommands, config: &Config) -> anyhow::Result<Value> {
    let Services { pipeline, cleanup } = services(config).await?;

    let value = match command {
        StorageCommands::Ingest {
            listing_id,
            file,
            content_type,
            category,
            metadata,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content_type =
                content_type.unwrap_or_else(|| content_type_for(&filename).to_string());

            to_value(
                pipeline
                    .ingest_raw(IngestRequest {
                        listing_id,
                        data: Bytes::from(data),
                        filename,
                        content_type,
                        category,
                        metadata: parse_metadata(metadata.as_deref())?,
                    })
                    .await?,
            )?
        }
        StorageCommands::PromoteProcessing {
            listing_id,
            raw_path,
        } => to_value(
            pipeline
                .promote_to_processing(&listing_id, raw_path.as_deref())
                .await?,
        )?,
        StorageCommands::PromoteQc {
            listing_id,
            processing_path,
        } => to_value(
            pipeline
                .promote_to_qc(&listing_id, processing_path.as_deref())
                .await?,
        )?,
        StorageCommands::PromoteFinal {
            listing_id,
            qc_path,
        } => to_value(
            pipeline
                .promote_to_final(&listing_id, qc_path.as_deref())
                .await?,
        )?,
        StorageCommands::Reject {
            listing_id,
            qc_path,
            reason,
        } => to_value(
            pipeline
                .reject_from_qc(&listing_id, qc_path.as_deref(), &reason)
                .await?,
        )?,
        StorageCommands::Presign {
            listing_id,
            filename,
            content_type,
            category,
            expires_in,
        } => {
            let content_type =
                content_type.unwrap_or_else(|| content_type_for(&filename).to_string());
            to_value(
                pipeline
                    .get_presigned_upload_url(PresignedUploadRequest {
                        listing_id,
                        filename,
                        content_type,
                        category,
                        expires_in: expires_in.map(Duration::from_secs),
                    })
                    .await?,
            )?
        }
        StorageCommands::Contents {
            listing_id,
            stage,
            category,
        } => {
            let files = pipeline
                .get_stage_contents(&listing_id, stage, category.as_deref())
                .await;
            json!({ "stage": stage, "count": files.len(), "files": files })
        }
        StorageCommands::Status { listing_id } => {
            let status = pipeline.get_pipeline_status(&listing_id).await;
            json!({ "listing_id": listing_id, "status": status, "total": status.total() })
        }
        StorageCommands::Cleanup { stage: Some(stage) } => {
            to_value(cleanup.cleanup_bucket(stage).await)?
        }
        StorageCommands::Cleanup { stage: None } => to_value(cleanup.run_full_cleanup().await)?,
        StorageCommands::Reconcile => to_value(cleanup.reconcile_final_promotions().await)?,
        StorageCommands::StorageStats => {
            let stats = cleanup.get_storage_stats().await;
            json!({
                "stages": stats.stages,
                "total_files": stats.total_files(),
                "total_bytes": stats.total_bytes(),
            })
        }
    };

    Ok(value)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match Config::from_env() {
        Ok(config) => run(cli.command, &config).await,
        Err(e) => Err(e.context("Failed to load configuration")),
    };

    let (envelope, code) = match result {
        Ok(value) => (success_envelope(value), ExitCode::SUCCESS),
        Err(err) => {
            let envelope = match err.downcast_ref::<PipelineError>() {
                Some(pipeline_err) => failure_envelope(pipeline_err),
                None => json!({
                    "success": false,
                    "error": format!("{:#}", err),
                    "code": "CLI_ERROR",
                }),
            };
            tracing::debug!(error = %format!("{:#}", err), "Command failed");
            (envelope, ExitCode::FAILURE)
        }
    };

    if let Err(e) = print_json(&envelope) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }
    code
}
