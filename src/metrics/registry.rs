//! Registry that drives collectors on every scrape.

use crate::collector::{CollectError, Collector, MetricDesc, MetricSample};
use futures::future::join_all;
use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, Opts, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metric {0:?} is already registered")]
    AlreadyRegistered(String),
}

/// A collector that failed during one scrape.
#[derive(Debug)]
pub struct CollectFailure {
    /// Name of the metric that could not be produced.
    pub metric: String,
    /// What went wrong.
    pub error: CollectError,
}

/// Output of one scrape: the metric families that were produced and the
/// collectors that failed.
#[derive(Debug, Default)]
pub struct Gathered {
    /// Families sorted by metric name.
    pub families: Vec<MetricFamily>,
    /// Per-metric failures, in registration order.
    pub errors: Vec<CollectFailure>,
}

impl Gathered {
    /// Encodes the gathered families in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Collection of registered collectors.
///
/// The registry is built once at startup and is read-only afterwards,
/// so it can be shared behind an `Arc` by concurrent scrapes.
#[derive(Default)]
pub struct MetricsRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector, rejecting duplicate metric names.
    pub fn register<C>(&mut self, collector: C) -> Result<(), MetricsError>
    where
        C: Collector + 'static,
    {
        let name = collector.describe().name();
        if self.collectors.iter().any(|c| c.describe().name() == name) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }
        tracing::debug!(metric = name, "collector registered");
        self.collectors.push(Box::new(collector));
        Ok(())
    }

    /// Descriptions of every registered metric, in registration order.
    pub fn descriptions(&self) -> Vec<&MetricDesc> {
        self.collectors.iter().map(|c| c.describe()).collect()
    }

    /// Runs every collector concurrently and gathers the results.
    ///
    /// A failing collector contributes an entry to [`Gathered::errors`]
    /// and never removes another collector's family.
    pub async fn gather(&self) -> Gathered {
        let samples = join_all(self.collectors.iter().map(|c| c.collect())).await;

        let mut gathered = Gathered::default();
        for (collector, sample) in self.collectors.iter().zip(samples) {
            let desc = collector.describe();
            match sample {
                MetricSample::Gauge(value) => match gauge_family(desc, value) {
                    Ok(family) => gathered.families.extend(family),
                    Err(e) => gathered.errors.push(CollectFailure {
                        metric: desc.name().to_string(),
                        error: CollectError::Metric(e),
                    }),
                },
                MetricSample::Invalid(error) => gathered.errors.push(CollectFailure {
                    metric: desc.name().to_string(),
                    error,
                }),
            }
        }

        gathered.families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        gathered
    }

    /// Gathers and encodes in one step, dropping failures.
    pub async fn encode(&self) -> Result<String, MetricsError> {
        self.gather().await.encode()
    }
}

fn gauge_family(desc: &MetricDesc, value: f64) -> Result<Vec<MetricFamily>, prometheus::Error> {
    let gauge = Gauge::with_opts(Opts::new(desc.name(), desc.help()))?;
    gauge.set(value);
    Ok(gauge.collect())
}
