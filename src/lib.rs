//! Workspace umbrella crate for p-stable locality-sensitive hashing.
//!
//! This crate re-exports the numeric core from `pstable` and adds the
//! operational layer around it: stage helpers that log through `tracing`,
//! a pluggable metrics observer, and YAML configuration loading.

pub mod config;

pub use config::{ConfigLoadError, LshConfigFile};
pub use pstable::{
    collision_probability, collision_probability_with, estimate_distance, estimate_similarity,
    CollisionModel, HashValues, HasherConfig, IntegrationConfig, Metric, PStableError,
    PStableHasher, Projection, ProjectionFamily, RandomSource, PSTABLE_ALGORITHM,
    PSTABLE_VERSION,
};

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use tracing::{info, warn, Level};

/// Errors raised by the helpers of this crate, tagged with the failing stage.
#[derive(Debug, Clone, PartialEq)]
pub enum LshError {
    /// Building the hasher (config validation or family generation) failed.
    Construct(PStableError),
    /// Hashing a vector failed.
    Hash(PStableError),
    /// Comparing two hashers failed.
    Compare(PStableError),
    /// Evaluating the collision probability model failed.
    Model(PStableError),
}

impl LshError {
    /// The core error behind this failure.
    pub fn inner(&self) -> &PStableError {
        match self {
            LshError::Construct(err)
            | LshError::Hash(err)
            | LshError::Compare(err)
            | LshError::Model(err) => err,
        }
    }
}

impl fmt::Display for LshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LshError::Construct(err) => write!(f, "hasher construction failed: {err}"),
            LshError::Hash(err) => write!(f, "hashing failed: {err}"),
            LshError::Compare(err) => write!(f, "similarity estimation failed: {err}"),
            LshError::Model(err) => write!(f, "collision model failed: {err}"),
        }
    }
}

impl Error for LshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Metrics observer for hashing stages.
pub trait LshMetrics: Send + Sync {
    fn record_construct(&self, latency: Duration, result: Result<(), PStableError>);
    fn record_hash(&self, latency: Duration, result: Result<(), PStableError>);
    fn record_compare(&self, latency: Duration, result: Result<(), PStableError>);
    fn record_model(&self, latency: Duration, result: Result<(), PStableError>);
}

/// Install or clear the global metrics recorder.
pub fn set_lsh_metrics(recorder: Option<Arc<dyn LshMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn LshMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn LshMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn LshMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

#[derive(Clone, Copy)]
enum Stage {
    Construct,
    Hash,
    Compare,
    Model,
}

/// Times one stage and reports it to the installed recorder, if any.
struct StageTimer {
    stage: Stage,
    start: Instant,
}

impl StageTimer {
    fn start(stage: Stage) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }

    fn finish<T>(self, result: &Result<T, PStableError>) -> Duration {
        let elapsed = self.start.elapsed();
        if let Some(recorder) = metrics_recorder() {
            let outcome = match result {
                Ok(_) => Ok(()),
                Err(err) => Err(err.clone()),
            };
            match self.stage {
                Stage::Construct => recorder.record_construct(elapsed, outcome),
                Stage::Hash => recorder.record_hash(elapsed, outcome),
                Stage::Compare => recorder.record_compare(elapsed, outcome),
                Stage::Model => recorder.record_model(elapsed, outcome),
            }
        }
        elapsed
    }
}

/// Build a hasher, logging and timing the projection family generation.
pub fn build_hasher(config: &HasherConfig) -> Result<PStableHasher, LshError> {
    let span = tracing::span!(
        Level::DEBUG,
        "lsh.construct",
        dim = config.dim,
        num_perm = config.num_perm,
        metric_dim = config.metric_dim
    );
    let _guard = span.enter();

    let timer = StageTimer::start(Stage::Construct);
    let result = PStableHasher::new(config.clone());
    let elapsed_micros = timer.finish(&result).as_micros();
    match result {
        Ok(hasher) => {
            info!(
                seed = config.seed,
                metric = %hasher.metric(),
                use_parallel = config.use_parallel,
                elapsed_micros,
                "construct_success"
            );
            Ok(hasher)
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros, "construct_failure");
            Err(LshError::Construct(err))
        }
    }
}

/// Hash `vector` on `hasher`, replacing its current hash values.
pub fn hash_vector(hasher: &mut PStableHasher, vector: &[f64]) -> Result<HashValues, LshError> {
    let span = tracing::span!(
        Level::DEBUG,
        "lsh.hash",
        dim = hasher.config().dim,
        num_perm = hasher.config().num_perm
    );
    let _guard = span.enter();

    let timer = StageTimer::start(Stage::Hash);
    let result = hasher.hash(vector).map(HashValues::clone);
    let elapsed_micros = timer.finish(&result).as_micros();
    match result {
        Ok(values) => {
            info!(input_len = vector.len(), elapsed_micros, "hash_success");
            Ok(values)
        }
        Err(err) => {
            warn!(input_len = vector.len(), error = %err, elapsed_micros, "hash_failure");
            Err(LshError::Hash(err))
        }
    }
}

/// Hash many vectors with one family, in input order, without touching the
/// hasher's stored values.
pub fn hash_batch<V>(hasher: &PStableHasher, vectors: &[V]) -> Result<Vec<HashValues>, LshError>
where
    V: AsRef<[f64]> + Sync,
{
    let span = tracing::span!(
        Level::DEBUG,
        "lsh.hash_batch",
        dim = hasher.config().dim,
        batch_len = vectors.len()
    );
    let _guard = span.enter();

    let timer = StageTimer::start(Stage::Hash);
    let result = hasher.hash_batch(vectors);
    let elapsed_micros = timer.finish(&result).as_micros();
    match result {
        Ok(values) => {
            info!(
                use_parallel = hasher.config().use_parallel,
                elapsed_micros,
                "hash_batch_success"
            );
            Ok(values)
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros, "hash_batch_failure");
            Err(LshError::Hash(err))
        }
    }
}

/// Estimate the similarity of two hashed hashers.
pub fn compare(a: &PStableHasher, b: &PStableHasher) -> Result<f64, LshError> {
    let span = tracing::span!(Level::DEBUG, "lsh.compare", num_perm = a.config().num_perm);
    let _guard = span.enter();

    let timer = StageTimer::start(Stage::Compare);
    let result = estimate_similarity(a, b);
    let elapsed_micros = timer.finish(&result).as_micros();
    match result {
        Ok(similarity) => {
            info!(similarity, elapsed_micros, "compare_success");
            Ok(similarity)
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros, "compare_failure");
            Err(LshError::Compare(err))
        }
    }
}

/// Hash `a` and `b` on two independently built hashers and compare them.
///
/// Both hashers are built from `config`, so they share the same family
/// without exchanging it.
pub fn compare_vectors(config: &HasherConfig, a: &[f64], b: &[f64]) -> Result<f64, LshError> {
    let mut left = build_hasher(config)?;
    let mut right = build_hasher(config)?;
    hash_vector(&mut left, a)?;
    hash_vector(&mut right, b)?;
    compare(&left, &right)
}

/// Theoretical collision probability at `distance` under `config`.
pub fn theoretical_similarity(
    config: &HasherConfig,
    distance: f64,
    integration: &IntegrationConfig,
) -> Result<f64, LshError> {
    let span = tracing::span!(Level::DEBUG, "lsh.model", r = config.r, distance);
    let _guard = span.enter();

    let timer = StageTimer::start(Stage::Model);
    let result = collision_probability_with(config, distance, integration);
    let elapsed_micros = timer.finish(&result).as_micros();
    match result {
        Ok(probability) => {
            info!(probability, elapsed_micros, "model_success");
            Ok(probability)
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros, "model_failure");
            Err(LshError::Model(err))
        }
    }
}
