//! Training orchestrator: fits a roster of models over one shared data set.
//!
//! Each model trains in isolation. An error or a panic inside one model's
//! fit/predict becomes a failed [`TrainingResult`] for that model only; the
//! other models and the pool are unaffected. Parallel and sequential runs
//! produce the same keyed results, since every model owns its own state and
//! the training arrays are only ever read.

use crate::domain::error::MltraderError;
use crate::domain::model::TrainableModel;
use crate::ports::model_store_port::ModelStore;
use ndarray::Array2;
use rayon::prelude::*;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    /// `workers: None` sizes the pool to the roster.
    Parallel { workers: Option<usize> },
    Sequential,
}

/// Shared, read-only inputs of one training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub x_train: &'a Array2<f64>,
    pub y_train: &'a [u8],
    /// Predictions are produced only when validation features are given.
    pub x_val: Option<&'a Array2<f64>>,
    pub y_val: Option<&'a [u8]>,
}

impl<'a> TrainingData<'a> {
    pub fn new(x_train: &'a Array2<f64>, y_train: &'a [u8]) -> Self {
        Self {
            x_train,
            y_train,
            x_val: None,
            y_val: None,
        }
    }

    pub fn with_validation(mut self, x_val: &'a Array2<f64>, y_val: &'a [u8]) -> Self {
        self.x_val = Some(x_val);
        self.y_val = Some(y_val);
        self
    }
}

/// Outcome of one model's fit/predict cycle.
#[derive(Debug)]
pub struct TrainingResult {
    pub model_id: String,
    pub success: bool,
    pub elapsed: Duration,
    /// Present only on success.
    pub model: Option<Box<dyn TrainableModel>>,
    /// Present only on success with validation data.
    pub predictions: Option<Vec<u8>>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub results: BTreeMap<String, TrainingResult>,
    pub total_elapsed: Duration,
}

impl TrainingReport {
    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn successful_models(&self) -> impl Iterator<Item = &(dyn TrainableModel + 'static)> {
        self.results.values().filter_map(|r| r.model.as_deref())
    }

    /// Predictions of every successful model, keyed by model id.
    pub fn predictions(&self) -> BTreeMap<String, Vec<u8>> {
        self.results
            .iter()
            .filter(|(_, r)| r.success)
            .filter_map(|(id, r)| r.predictions.clone().map(|p| (id.clone(), p)))
            .collect()
    }

    pub fn failures(&self) -> BTreeMap<String, String> {
        self.results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(id, r)| (id.clone(), r.error.clone().unwrap_or_default()))
            .collect()
    }

    /// Persists every successful model. A failed save is logged and
    /// returned; it never stops the remaining saves.
    pub fn save_models(&self, store: &dyn ModelStore) -> Vec<(String, MltraderError)> {
        let mut failed = Vec::new();
        for model in self.successful_models() {
            match model.snapshot().and_then(|s| store.save(&s)) {
                Ok(()) => debug!(model = model.name(), "model saved"),
                Err(e) => {
                    warn!(model = model.name(), error = %e, "could not save model");
                    failed.push((model.name().to_string(), e));
                }
            }
        }
        failed
    }
}

/// Restores each roster model from the store; models without a usable
/// snapshot are logged and left out.
pub fn load_models(
    store: &dyn ModelStore,
    roster: Vec<Box<dyn TrainableModel>>,
) -> Vec<Box<dyn TrainableModel>> {
    roster
        .into_iter()
        .filter_map(|mut model| {
            match store.load(model.name()).and_then(|s| model.restore(s)) {
                Ok(()) => Some(model),
                Err(e) => {
                    warn!(model = model.name(), error = %e, "could not load model");
                    None
                }
            }
        })
        .collect()
}

/// Trains every model in `roster` and collects the keyed results.
///
/// Fails up front only for roster-level problems (duplicate ids, pool
/// construction); per-model failures are reported inside the report.
pub fn run_training(
    roster: Vec<Box<dyn TrainableModel>>,
    data: TrainingData<'_>,
    mode: TrainingMode,
) -> Result<TrainingReport, MltraderError> {
    let mut seen = BTreeSet::new();
    for model in &roster {
        if !seen.insert(model.name().to_string()) {
            return Err(MltraderError::invalid(
                "training",
                "roster",
                format!("duplicate model id {}", model.name()),
            ));
        }
    }

    let start = Instant::now();
    let results: Vec<TrainingResult> = match mode {
        TrainingMode::Sequential => {
            info!(models = roster.len(), "training sequentially");
            roster.into_iter().map(|m| train_one(m, data)).collect()
        }
        TrainingMode::Parallel { workers } => {
            let width = workers.unwrap_or(roster.len()).max(1);
            info!(models = roster.len(), workers = width, "training in parallel");
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(width)
                .build()
                .map_err(|e| MltraderError::WorkerPool {
                    reason: e.to_string(),
                })?;
            pool.install(|| {
                roster
                    .into_par_iter()
                    .map(|m| train_one(m, data))
                    .collect()
            })
        }
    };
    let total_elapsed = start.elapsed();

    let results: BTreeMap<String, TrainingResult> = results
        .into_iter()
        .map(|r| (r.model_id.clone(), r))
        .collect();
    let report = TrainingReport {
        results,
        total_elapsed,
    };
    info!(
        succeeded = report.success_count(),
        total = report.results.len(),
        elapsed_ms = total_elapsed.as_millis() as u64,
        "training finished"
    );
    Ok(report)
}

fn fit_and_predict(
    model: &mut dyn TrainableModel,
    data: TrainingData<'_>,
) -> Result<Option<Vec<u8>>, MltraderError> {
    model.fit(data.x_train, data.y_train)?;
    data.x_val.map(|x| model.predict(x)).transpose()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn train_one(mut model: Box<dyn TrainableModel>, data: TrainingData<'_>) -> TrainingResult {
    let model_id = model.name().to_string();
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| fit_and_predict(model.as_mut(), data)));
    let elapsed = start.elapsed();

    let error = match outcome {
        Ok(Ok(predictions)) => {
            info!(model = %model_id, elapsed_ms = elapsed.as_millis() as u64, "model trained");
            return TrainingResult {
                model_id,
                success: true,
                elapsed,
                model: Some(model),
                predictions,
                error: None,
            };
        }
        Ok(Err(e @ MltraderError::ModelTraining { .. })) => e,
        Ok(Err(e)) => MltraderError::ModelTraining {
            model: model_id.clone(),
            reason: e.to_string(),
        },
        Err(payload) => MltraderError::ModelTraining {
            model: model_id.clone(),
            reason: format!("panicked: {}", panic_message(payload)),
        },
    }
    .to_string();
    warn!(model = %model_id, error = %error, "model failed");
    TrainingResult {
        model_id,
        success: false,
        elapsed,
        model: None,
        predictions: None,
        error: Some(error),
    }
}
