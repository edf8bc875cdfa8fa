// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Abstract definitions for labeled metrics.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::time::Instant;

/// An ordered mapping of label names to label values.
///
/// Labels are the dimensions attached to a metric observation
/// (e.g. `method=GET`, `tenant=acme`), used for later filtering and
/// aggregation. Keys are kept sorted so equal sets hash and display
/// identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Creates an empty label set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a label, returning the modified set. Convenient for building
    /// sets inline: `LabelSet::new().with("method", "GET")`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts or overrides a label, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a label, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Looks up a label value by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of labels in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set carries no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Display for LabelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{pairs}]")
    }
}

/// A unique, structured identifier for a metric family.
///
/// Composed of a namespace (the instrumented operation's prefix, e.g.
/// "api") and a name (e.g. "requests_total"). Labels are not part of the
/// identifier; they key the individual series inside a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// The prefix shared by related metrics (e.g. "api").
    pub namespace: String,
    /// The specific name of the metric (e.g. "requests_total").
    pub name: String,
}

impl MetricId {
    /// Creates a new `MetricId` from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the flat identifier, `"{namespace}_{name}"`.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.namespace, self.name)
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricType {
    /// A value that only ever increases (e.g. total requests).
    Counter,
    /// A value that can go up or down (e.g. in-flight requests).
    Gauge,
    /// A value that tracks the distribution of a set of measurements.
    Histogram,
}

/// The recorded distribution for one labeled series of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSeries {
    /// Cumulative sample counts per bucket bound: `bucket_counts[i]` is
    /// the number of samples `<= bucket_bounds[i]` of the owning family.
    pub bucket_counts: Vec<u64>,
    /// Sum of all observed samples.
    pub sum: f64,
    /// Total number of observed samples.
    pub count: u64,
}

impl HistogramSeries {
    /// Creates an empty series shaped for `bucket_count` bounds.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            bucket_counts: vec![0; bucket_count],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, bucket_bounds: &[f64], sample: f64) {
        for (i, &bound) in bucket_bounds.iter().enumerate() {
            if sample <= bound {
                self.bucket_counts[i] += 1;
            }
        }
        self.sum += sample;
        self.count += 1;
    }
}

/// The per-series values of a metric family, keyed by label set.
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// One `u64` count per label set.
    Counter(HashMap<LabelSet, u64>),
    /// One `f64` level per label set.
    Gauge(HashMap<LabelSet, f64>),
    /// One sample distribution per label set, sharing the family's
    /// bucket bounds.
    Histogram {
        /// The upper bounds of the histogram buckets, strictly ascending.
        bucket_bounds: Vec<f64>,
        /// The recorded distributions, keyed by label set.
        series: HashMap<LabelSet, HistogramSeries>,
    },
}

impl MetricValue {
    /// Returns the [`MetricType`] corresponding to this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Returns the counter value for `labels`. Absent series read as 0.
    pub fn counter_get(&self, labels: &LabelSet) -> Option<u64> {
        match self {
            MetricValue::Counter(series) => Some(series.get(labels).copied().unwrap_or(0)),
            _ => None,
        }
    }

    /// Returns the gauge value for `labels`. Absent series read as 0.
    pub fn gauge_get(&self, labels: &LabelSet) -> Option<f64> {
        match self {
            MetricValue::Gauge(series) => Some(series.get(labels).copied().unwrap_or(0.0)),
            _ => None,
        }
    }

    /// Returns the recorded distribution for `labels`, if this is a
    /// histogram. Absent series read as an empty distribution.
    pub fn histogram_get(&self, labels: &LabelSet) -> Option<HistogramSeries> {
        match self {
            MetricValue::Histogram {
                bucket_bounds,
                series,
            } => Some(
                series
                    .get(labels)
                    .cloned()
                    .unwrap_or_else(|| HistogramSeries::new(bucket_bounds.len())),
            ),
            _ => None,
        }
    }
}

/// Descriptive, static metadata about a metric family.
#[derive(Debug, Clone)]
pub struct MetricMetadata {
    /// The metric's unique identifier.
    pub id: MetricId,
    /// The type of the metric.
    pub metric_type: MetricType,
    /// A human-readable description of what the metric measures.
    pub description: String,
    /// The unit of measurement (e.g. "seconds", "count").
    pub unit: String,
    /// The timestamp when this metric was first registered.
    pub created_at: Instant,
    /// The timestamp when this metric was last updated.
    pub last_updated: Instant,
}

impl MetricMetadata {
    /// Creates new metadata for a metric.
    pub fn new(
        id: MetricId,
        metric_type: MetricType,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            metric_type,
            description: description.into(),
            unit: unit.into(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Updates the `last_updated` timestamp to the current time.
    pub fn update_timestamp(&mut self) {
        self.last_updated = Instant::now();
    }
}

/// A complete metric family, combining its value with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The static, descriptive metadata for the metric.
    pub metadata: MetricMetadata,
    /// The current per-series values of the metric.
    pub value: MetricValue,
}

impl Metric {
    /// A convenience constructor for a new, empty `Counter` family.
    pub fn new_counter(id: MetricId, description: impl Into<String>) -> Self {
        Self {
            metadata: MetricMetadata::new(id, MetricType::Counter, description, "count"),
            value: MetricValue::Counter(HashMap::new()),
        }
    }

    /// A convenience constructor for a new, empty `Gauge` family.
    pub fn new_gauge(id: MetricId, description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            metadata: MetricMetadata::new(id, MetricType::Gauge, description, unit),
            value: MetricValue::Gauge(HashMap::new()),
        }
    }

    /// A convenience constructor for a new, empty `Histogram` family.
    pub fn new_histogram(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> Self {
        Self {
            metadata: MetricMetadata::new(id, MetricType::Histogram, description, unit),
            value: MetricValue::Histogram {
                bucket_bounds,
                series: HashMap::new(),
            },
        }
    }

    /// Increments the counter series for `labels` by `delta`, returning
    /// the new value.
    pub fn increment_counter(&mut self, labels: &LabelSet, delta: u64) -> MetricsResult<u64> {
        match self.value {
            MetricValue::Counter(ref mut series) => {
                let value = series.entry(labels.clone()).or_insert(0);
                *value = value.saturating_add(delta);
                let result = *value;
                self.metadata.update_timestamp();
                Ok(result)
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: self.value.metric_type(),
            }),
        }
    }

    /// Adds `delta` (possibly negative) to the gauge series for `labels`,
    /// returning the new value.
    pub fn add_gauge(&mut self, labels: &LabelSet, delta: f64) -> MetricsResult<f64> {
        match self.value {
            MetricValue::Gauge(ref mut series) => {
                let value = series.entry(labels.clone()).or_insert(0.0);
                *value += delta;
                let result = *value;
                self.metadata.update_timestamp();
                Ok(result)
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: self.value.metric_type(),
            }),
        }
    }

    /// Sets the gauge series for `labels` to `value`.
    pub fn set_gauge(&mut self, labels: &LabelSet, value: f64) -> MetricsResult<()> {
        match self.value {
            MetricValue::Gauge(ref mut series) => {
                series.insert(labels.clone(), value);
                self.metadata.update_timestamp();
                Ok(())
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: self.value.metric_type(),
            }),
        }
    }

    /// Records one sample in the histogram series for `labels`.
    pub fn record_histogram_sample(&mut self, labels: &LabelSet, sample: f64) -> MetricsResult<()> {
        match self.value {
            MetricValue::Histogram {
                ref bucket_bounds,
                ref mut series,
            } => {
                series
                    .entry(labels.clone())
                    .or_insert_with(|| HistogramSeries::new(bucket_bounds.len()))
                    .observe(bucket_bounds, sample);
                self.metadata.update_timestamp();
                Ok(())
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: self.value.metric_type(),
            }),
        }
    }
}

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// The requested metric was not found in the registry.
    MetricNotFound(MetricId),
    /// An operation was attempted on a metric of the wrong type
    /// (e.g. trying to observe a sample on a counter).
    TypeMismatch {
        /// The expected metric type for the operation.
        expected: MetricType,
        /// The actual metric type that was found.
        found: MetricType,
    },
    /// An error originating from the backend storage layer.
    StorageError(String),
    /// An invalid operation was attempted (e.g. invalid histogram bounds,
    /// empty metric prefix).
    InvalidOperation(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::MetricNotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
            MetricsError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}
