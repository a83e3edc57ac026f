//! Transport-agnostic request/response facade.
//!
//! A [`ServiceRequest`] names one of five operations. [`ReadmissionService::handle`]
//! always answers with a [`ServiceResponse`] whose `status` is `success` or
//! `error`; failures never escape as Rust errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use readmit_ingest::DataProvenance;
use readmit_model::{PatientRecord, RiskTier, format_percent};
use readmit_normalize::DatasetStats;

use crate::bundle::MODEL_TYPE;
use crate::error::PredictionError;
use crate::manager::ModelManager;
use crate::prediction::PredictionService;
use crate::scheduler::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Predict,
    Retrain,
    ModelInfo,
    Health,
    DataStats,
}

/// One request. `payload` is only read by `predict`; `id` is echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub op: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl ServiceRequest {
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            payload: None,
            id: None,
        }
    }

    pub fn predict(payload: Value) -> Self {
        Self {
            op: Operation::Predict,
            payload: Some(payload),
            id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ServiceResponse {
    fn success(body: ResponseBody) -> Self {
        Self {
            status: Status::Success,
            id: None,
            body,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            id: None,
            body: ResponseBody::Error {
                message: message.into(),
            },
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Predict(PredictBody),
    Retrain(RetrainBody),
    ModelInfo(Box<ModelInfoBody>),
    Health(HealthBody),
    DataStats(DataStatsBody),
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictBody {
    /// Care-plan sentence for the tier.
    pub assessment: String,
    pub score: f64,
    pub risk: RiskTier,
    pub confidence: String,
    pub prediction: u8,
    pub disease_type: String,
    pub model_accuracy: String,
    pub last_training: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrainBody {
    pub message: String,
    pub new_accuracy: String,
    pub training_time: DateTime<Utc>,
    pub duration_secs: f64,
    pub data_source: DataProvenance,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfoBody {
    pub model_type: String,
    pub algorithms: Vec<String>,
    pub features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub numerical_features: Vec<String>,
    pub selected_features: Vec<String>,
    pub accuracy: String,
    pub auc: f64,
    pub f1: f64,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub training_records: usize,
    pub last_training: Option<DateTime<Utc>>,
    pub data_source: DataProvenance,
    pub auto_retrain: bool,
    pub retrain_interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthBody {
    pub model_loaded: bool,
    pub data_source_connected: bool,
    pub accuracy: String,
    pub last_training: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeDistribution {
    pub mean: String,
    pub median: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub missing_values: usize,
    pub complete_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatsBody {
    pub total_records: usize,
    pub readmission_rate: String,
    pub age_distribution: AgeDistribution,
    pub diagnosis_distribution: BTreeMap<String, usize>,
    pub data_quality: DataQuality,
    pub data_source: DataProvenance,
}

impl DataStatsBody {
    fn new(stats: DatasetStats, data_source: DataProvenance) -> Self {
        Self {
            total_records: stats.total_records,
            readmission_rate: format_percent(stats.readmission_rate, 2),
            age_distribution: AgeDistribution {
                mean: format!("{:.1}", stats.age_mean),
                median: format!("{:.1}", stats.age_median),
            },
            diagnosis_distribution: stats.diagnosis_distribution,
            data_quality: DataQuality {
                missing_values: stats.missing_values,
                complete_records: stats.complete_records,
            },
            data_source,
        }
    }
}

/// Dispatches requests to the prediction service and the model manager.
#[derive(Debug, Clone)]
pub struct ReadmissionService {
    manager: Arc<ModelManager>,
    predictor: PredictionService,
    schedule: ScheduleConfig,
}

impl ReadmissionService {
    pub fn new(manager: Arc<ModelManager>, schedule: ScheduleConfig) -> Self {
        Self {
            predictor: PredictionService::new(Arc::clone(&manager)),
            manager,
            schedule,
        }
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    pub fn handle(&self, request: ServiceRequest) -> ServiceResponse {
        let id = request.id.clone();
        let response = match request.op {
            Operation::Predict => self.predict(request.payload),
            Operation::Retrain => self.retrain(),
            Operation::ModelInfo => self.model_info(),
            Operation::Health => self.health(),
            Operation::DataStats => self.data_stats(),
        };
        response.with_id(id)
    }

    pub fn predict(&self, payload: Option<Value>) -> ServiceResponse {
        let record = match payload {
            None | Some(Value::Null) => Err(PredictionError::EmptyRequest),
            Some(value) => PatientRecord::try_from(value)
                .map_err(|_| PredictionError::Malformed("payload must be a JSON object".into())),
        };
        let result = record.and_then(|record| self.predictor.predict(&record));
        match result {
            Ok(result) => ServiceResponse::success(ResponseBody::Predict(PredictBody {
                assessment: result.status().to_string(),
                score: result.probability,
                risk: result.risk,
                confidence: result.confidence(),
                prediction: result.prediction,
                disease_type: result.disease_type.clone(),
                model_accuracy: format_percent(result.model_accuracy, 1),
                last_training: Some(result.trained_at),
            })),
            Err(error) => {
                warn!(%error, "prediction failed");
                ServiceResponse::error(format!("Prediction failed: {error}"))
            }
        }
    }

    /// Train synchronously on the live source.
    pub fn retrain(&self) -> ServiceResponse {
        info!("manual retraining triggered");
        match self.manager.train(true) {
            Ok(outcome) => ServiceResponse::success(ResponseBody::Retrain(RetrainBody {
                message: "Model retrained successfully".to_string(),
                new_accuracy: format_percent(outcome.bundle.accuracy(), 2),
                training_time: outcome.bundle.trained_at(),
                duration_secs: outcome.elapsed.as_secs_f64(),
                data_source: outcome.bundle.data_source(),
                persisted: outcome.persisted,
            })),
            Err(error) => ServiceResponse::error(format!("Retraining failed: {error}")),
        }
    }

    pub fn model_info(&self) -> ServiceResponse {
        let bundle = match self.manager.current() {
            Ok(Some(bundle)) => bundle,
            Ok(None) => return ServiceResponse::error(PredictionError::NoModel.to_string()),
            Err(error) => return ServiceResponse::error(error.to_string()),
        };
        let pipeline = bundle.pipeline();
        let metrics = bundle.metrics();
        ServiceResponse::success(ResponseBody::ModelInfo(Box::new(ModelInfoBody {
            model_type: MODEL_TYPE.to_string(),
            algorithms: bundle.algorithm_names().into_iter().map(String::from).collect(),
            features: pipeline.original_feature_names().to_vec(),
            categorical_features: pipeline.categorical_columns(),
            numerical_features: pipeline.numerical_columns(),
            selected_features: pipeline.selected_columns().into_iter().map(String::from).collect(),
            accuracy: format_percent(metrics.accuracy, 2),
            auc: metrics.auc,
            f1: metrics.f1,
            cv_mean: metrics.cv_mean,
            cv_std: metrics.cv_std,
            training_records: bundle.training_records(),
            last_training: Some(bundle.trained_at()),
            data_source: bundle.data_source(),
            auto_retrain: self.schedule.enabled,
            retrain_interval: self.schedule.cadence(),
        })))
    }

    pub fn health(&self) -> ServiceResponse {
        let bundle = self.manager.current().ok().flatten();
        ServiceResponse::success(ResponseBody::Health(HealthBody {
            model_loaded: bundle.is_some(),
            data_source_connected: self.manager.is_source_reachable(),
            accuracy: bundle
                .as_ref()
                .map_or_else(|| "N/A".to_string(), |bundle| format_percent(bundle.accuracy(), 2)),
            last_training: bundle.as_ref().map(|bundle| bundle.trained_at()),
        }))
    }

    pub fn data_stats(&self) -> ServiceResponse {
        match self.manager.data_stats() {
            Ok((stats, source)) => {
                ServiceResponse::success(ResponseBody::DataStats(DataStatsBody::new(stats, source)))
            }
            Err(error) => ServiceResponse::error(format!("Failed to get data stats: {error}")),
        }
    }
}
