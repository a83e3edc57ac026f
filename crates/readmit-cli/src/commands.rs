use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tokio::io::BufReader;
use tracing::{info, info_span, warn};

use readmit_core::{
    ModelManager, Operation, ReadmissionService, ServiceConfig, ServiceRequest, ServiceResponse,
    StartupSource, TrainingOutcome, spawn_scheduler,
};
use readmit_ingest::{
    BatchUploader, DataProvenance, HospitalTarget, LocalDocumentStore, UploadConfig, UploadReport,
    read_csv_records,
};
use readmit_normalize::DatasetStats;

use readmit_cli::transport;

use crate::cli::{Cli, PredictArgs, ServeArgs, TrainArgs, UploadArgs};

/// Load `--config` (or defaults) and apply the path overrides.
pub fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(bundle) = &cli.bundle {
        config.model.bundle_path = bundle.clone();
    }
    if let Some(store) = &cli.store {
        config.data.store = Some(store.clone());
    }
    Ok(config)
}

/// Publish the persisted bundle or train a first one.
fn ready_manager(config: &ServiceConfig) -> Result<Arc<ModelManager>> {
    let manager = Arc::new(config.build_manager());
    let source = manager.load_or_train().context("initialise model")?;
    match source {
        StartupSource::Loaded => info!(path = %config.model.bundle_path.display(), "loaded model bundle"),
        StartupSource::Trained => info!("trained initial model"),
        StartupSource::TrainedSynthetic => warn!("trained initial model on synthetic data only"),
    }
    Ok(manager)
}

pub fn run_train(config: &ServiceConfig, args: &TrainArgs) -> Result<TrainingOutcome> {
    let span = info_span!("train_command", synthetic = args.synthetic);
    let _guard = span.enter();
    let manager = config.build_manager();
    let outcome = manager
        .train(!args.synthetic)
        .context("training failed")?;
    if !outcome.persisted {
        warn!(
            path = %config.model.bundle_path.display(),
            "model was trained but could not be saved"
        );
    }
    Ok(outcome)
}

fn read_payload(args: &PredictArgs) -> Result<Value> {
    let text = match (&args.payload, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("read request file {}", path.display()))?,
        (None, None) => bail!("no prediction request given"),
    };
    serde_json::from_str(&text).context("parse prediction request as JSON")
}

pub fn run_predict(config: &ServiceConfig, args: &PredictArgs) -> Result<ServiceResponse> {
    let payload = read_payload(args)?;
    let service = ReadmissionService::new(ready_manager(config)?, config.schedule);
    Ok(service.handle(ServiceRequest::predict(payload)))
}

pub fn run_info(config: &ServiceConfig) -> Result<Arc<ModelManager>> {
    ready_manager(config)
}

/// Report health without training: only a persisted bundle counts as loaded.
pub fn run_health(config: &ServiceConfig) -> Result<ServiceResponse> {
    let manager = Arc::new(config.build_manager());
    manager
        .load_persisted()
        .context("publish persisted model")?;
    let service = ReadmissionService::new(manager, config.schedule);
    Ok(service.handle(ServiceRequest::new(Operation::Health)))
}

pub fn run_stats(config: &ServiceConfig) -> Result<(DatasetStats, DataProvenance)> {
    config
        .build_manager()
        .data_stats()
        .context("compute dataset statistics")
}

pub fn run_upload(config: &ServiceConfig, args: &UploadArgs) -> Result<UploadReport> {
    let root = config
        .data
        .store
        .clone()
        .ok_or_else(|| anyhow!("no patient store configured; pass --store or set [data] store"))?;
    let span = info_span!("upload", hospital_id = %args.hospital_id, csv = %args.csv.display());
    let _guard = span.enter();

    let records = read_csv_records(&args.csv)
        .with_context(|| format!("read {}", args.csv.display()))?;
    info!(records = records.len(), "read CSV records");

    let store = LocalDocumentStore::new(root);
    let uploader = BatchUploader::new(UploadConfig {
        batch_size: args.batch_size,
        max_attempts: args.max_attempts,
        ..UploadConfig::default()
    });
    let hospital = HospitalTarget {
        id: args.hospital_id.clone(),
        name: args
            .hospital_name
            .clone()
            .unwrap_or_else(|| args.hospital_id.clone()),
        location: args.location.clone(),
    };
    uploader
        .upload(&store, &hospital, &records)
        .context("upload records")
}

pub async fn run_serve(config: ServiceConfig, args: &ServeArgs) -> Result<usize> {
    // =========================================================================
    // Stage 1: Publish a model before accepting requests
    // =========================================================================
    let startup = config.clone();
    let manager = tokio::task::spawn_blocking(move || ready_manager(&startup))
        .await
        .context("startup task failed")??;

    // =========================================================================
    // Stage 2: Background retraining
    // =========================================================================
    let scheduler = if config.schedule.enabled && !args.no_scheduler {
        Some(spawn_scheduler(
            Arc::clone(&manager),
            config.schedule.poll_interval(),
            config.schedule.policy(),
        ))
    } else {
        info!("background retraining disabled");
        None
    };

    // =========================================================================
    // Stage 3: Serve stdin until EOF
    // =========================================================================
    let service = ReadmissionService::new(manager, config.schedule);
    let served = transport::serve(
        service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    .context("serve requests");

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    let served = served?;
    info!(requests = served, "input closed, shutting down");
    Ok(served)
}
