//! Training runs and the single published-model slot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use readmit_ensemble::{EnsembleConfig, EvaluationConfig, fit_and_evaluate};
use readmit_ingest::{DataProvenance, DataSourceAdapter};
use readmit_model::{CleanedRecord, DataQualityError, FeatureRow, fields};
use readmit_normalize::{CleaningReport, Cleaner, CleanerConfig, DatasetStats, TargetSource};
use readmit_transform::{FeaturePipeline, PipelineConfig};

use crate::bundle::ModelBundle;
use crate::error::{LockPoisoned, TrainingError};
use crate::persistence::{load_bundle, save_bundle};

/// Settings for every stage of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub cleaner: CleanerConfig,
    pub pipeline: PipelineConfig,
    pub ensemble: EnsembleConfig,
    pub evaluation: EvaluationConfig,
}

/// Result of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: Arc<ModelBundle>,
    pub cleaning: CleaningReport,
    /// False when no bundle path is configured or the write failed.
    pub persisted: bool,
    pub elapsed: Duration,
}

/// How [`ModelManager::load_or_train`] obtained the first bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupSource {
    Loaded,
    Trained,
    /// The live-source run failed and a synthetic-only run succeeded.
    TrainedSynthetic,
}

/// Owns the current [`ModelBundle`] and serializes training runs.
///
/// Readers call [`current`](Self::current) and keep the returned `Arc` for the
/// whole request; a concurrent publish never changes a captured bundle.
#[derive(Debug)]
pub struct ModelManager {
    adapter: DataSourceAdapter,
    training: TrainingConfig,
    bundle_path: Option<PathBuf>,
    /// Held for the whole of a training run. Guards no data.
    train_lock: Mutex<()>,
    current: RwLock<Option<Arc<ModelBundle>>>,
    last_attempt: Mutex<Option<DateTime<Utc>>>,
    attempts: AtomicUsize,
}

impl ModelManager {
    pub fn new(adapter: DataSourceAdapter, training: TrainingConfig) -> Self {
        Self {
            adapter,
            training,
            bundle_path: None,
            train_lock: Mutex::new(()),
            current: RwLock::new(None),
            last_attempt: Mutex::new(None),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Persist every published bundle to `path`.
    #[must_use]
    pub fn with_bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_path = Some(path.into());
        self
    }

    pub fn bundle_path(&self) -> Option<&Path> {
        self.bundle_path.as_deref()
    }

    pub fn adapter(&self) -> &DataSourceAdapter {
        &self.adapter
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    /// The published bundle, if any.
    pub fn current(&self) -> Result<Option<Arc<ModelBundle>>, LockPoisoned> {
        self.current
            .read()
            .map(|slot| slot.clone())
            .map_err(|_| LockPoisoned)
    }

    /// Start time of the most recent training run, successful or not.
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        *self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of training runs started since construction.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_source_reachable(&self) -> bool {
        self.adapter.is_reachable()
    }

    fn publish(&self, bundle: Arc<ModelBundle>) -> Result<(), LockPoisoned> {
        let mut slot = self.current.write().map_err(|_| LockPoisoned)?;
        *slot = Some(bundle);
        Ok(())
    }

    /// Run a full fetch → clean → fit → evaluate → persist → publish cycle.
    ///
    /// Concurrent callers queue on the training lock. On error nothing is
    /// published and the on-disk bundle is left as it was.
    pub fn train(&self, use_external_source: bool) -> Result<TrainingOutcome, TrainingError> {
        let _guard = self.train_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        let span = info_span!("train", use_external_source);
        let _enter = span.enter();

        // =====================================================================
        // Stage 1: Fetch
        // =====================================================================
        let fetched = if use_external_source {
            self.adapter.fetch()?
        } else {
            self.adapter.fetch_synthetic()?
        };
        info!(
            records = fetched.records.len(),
            source = %fetched.provenance,
            "fetched training records"
        );

        // =====================================================================
        // Stage 2: Clean
        // =====================================================================
        let cleaned = Cleaner::new(self.training.cleaner).clean(&fetched.records);
        cleaned.report.log();
        if cleaned.records.is_empty() {
            return Err(DataQualityError::NoRecords.into());
        }
        let labelled = cleaned
            .report
            .target_sources
            .iter()
            .any(|(source, count)| *source != TargetSource::Default && *count > 0);
        if !labelled {
            return Err(DataQualityError::MissingTarget(fields::TARGET.to_string()).into());
        }
        let rows: Vec<FeatureRow> = cleaned.records.iter().map(CleanedRecord::to_row).collect();
        let labels: Vec<u8> = cleaned
            .records
            .iter()
            .map(|record| record.readmitted_30_days)
            .collect();

        // =====================================================================
        // Stage 3: Features
        // =====================================================================
        let (pipeline, matrix) =
            FeaturePipeline::fit_transform(&rows, &labels, &self.training.pipeline)?;

        // =====================================================================
        // Stage 4: Fit and evaluate
        // =====================================================================
        let evaluation = fit_and_evaluate(
            &self.training.ensemble,
            &self.training.evaluation,
            &matrix,
            &labels,
        )?;
        let bundle = Arc::new(ModelBundle::new(
            pipeline,
            evaluation.model,
            evaluation.metrics,
            Utc::now(),
            fetched.provenance,
            rows.len(),
        ));

        // =====================================================================
        // Stage 5: Persist, then publish
        // =====================================================================
        let persisted = match &self.bundle_path {
            Some(path) => match save_bundle(&bundle, path) {
                Ok(()) => true,
                Err(error) => {
                    warn!(
                        %error,
                        message = %error.user_message(),
                        "could not persist model bundle; serving it from memory"
                    );
                    false
                }
            },
            None => false,
        };
        self.publish(Arc::clone(&bundle))?;

        let elapsed = started.elapsed();
        info!(
            accuracy = bundle.accuracy(),
            auc = bundle.metrics().auc,
            elapsed_ms = elapsed.as_millis() as u64,
            "published model bundle"
        );
        Ok(TrainingOutcome {
            bundle,
            cleaning: cleaned.report,
            persisted,
            elapsed,
        })
    }

    /// Publish the persisted bundle if there is one and it loads.
    ///
    /// An unreadable file is logged and reported as `false`.
    pub fn load_persisted(&self) -> Result<bool, LockPoisoned> {
        let Some(path) = self.bundle_path.as_deref() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }
        match load_bundle(path) {
            Ok(bundle) => {
                self.publish(Arc::new(bundle))?;
                info!(path = %path.display(), "loaded persisted model bundle");
                Ok(true)
            }
            Err(error) => {
                let suggestion = error.suggestion().unwrap_or_default();
                warn!(%error, %suggestion, "could not load persisted model bundle");
                Ok(false)
            }
        }
    }

    /// Publish the persisted bundle if it loads, otherwise train one.
    ///
    /// A failed live-source run is retried once with synthetic data only.
    pub fn load_or_train(&self) -> Result<StartupSource, TrainingError> {
        if self.load_persisted()? {
            return Ok(StartupSource::Loaded);
        }

        match self.train(true) {
            Ok(_) => Ok(StartupSource::Trained),
            Err(error) => {
                warn!(%error, "initial training failed, retrying with synthetic data only");
                self.train(false)?;
                Ok(StartupSource::TrainedSynthetic)
            }
        }
    }

    /// Fetch and clean the current training data and describe it.
    pub fn data_stats(&self) -> Result<(DatasetStats, DataProvenance), TrainingError> {
        let fetched = self.adapter.fetch()?;
        let cleaned = Cleaner::new(self.training.cleaner).clean(&fetched.records);
        Ok((DatasetStats::compute(&cleaned.records), fetched.provenance))
    }
}
