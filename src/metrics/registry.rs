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

//! Registry for managing metric families.

use crate::metrics::types::{
    HistogramSeries, LabelSet, Metric, MetricId, MetricType, MetricValue, MetricsError,
    MetricsResult,
};
use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use std::sync::Arc;

/// Central registry for metric families.
///
/// The registry provides create-or-fetch registration and serves as the
/// lookup point for inspection. Registering an identifier that already
/// exists returns a handle to the existing family when the structure
/// matches, and an error when it does not (different type, or different
/// histogram buckets).
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Create a new metrics registry with the default in-memory backend
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// Create a new metrics registry with a custom backend
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Register or fetch a counter family
    pub fn get_or_create_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        match self.backend.get_metric(&id) {
            Ok(existing) => {
                check_type(&existing, MetricType::Counter)?;
            }
            Err(MetricsError::MetricNotFound(_)) => {
                self.backend
                    .put_metric(Metric::new_counter(id.clone(), description))?;
                log::debug!("registered counter {id}");
            }
            Err(e) => return Err(e),
        }
        Ok(CounterHandle::new(id, self.backend.clone()))
    }

    /// Register or fetch a gauge family
    pub fn get_or_create_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        match self.backend.get_metric(&id) {
            Ok(existing) => {
                check_type(&existing, MetricType::Gauge)?;
            }
            Err(MetricsError::MetricNotFound(_)) => {
                self.backend
                    .put_metric(Metric::new_gauge(id.clone(), description, unit))?;
                log::debug!("registered gauge {id}");
            }
            Err(e) => return Err(e),
        }
        Ok(GaugeHandle::new(id, self.backend.clone()))
    }

    /// Register or fetch a histogram family.
    ///
    /// `buckets` must be non-empty and strictly ascending. Re-registering
    /// an existing histogram with different bounds is an error.
    pub fn get_or_create_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        buckets: &[f64],
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        if buckets.is_empty() {
            return Err(MetricsError::InvalidOperation(format!(
                "histogram {id} requires at least one bucket bound"
            )));
        }
        if buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidOperation(format!(
                "histogram {id} bucket bounds must be strictly ascending"
            )));
        }

        match self.backend.get_metric(&id) {
            Ok(existing) => {
                check_type(&existing, MetricType::Histogram)?;
                if let MetricValue::Histogram { bucket_bounds, .. } = &existing.value {
                    if bucket_bounds != buckets {
                        return Err(MetricsError::InvalidOperation(format!(
                            "histogram {id} already registered with different buckets"
                        )));
                    }
                }
            }
            Err(MetricsError::MetricNotFound(_)) => {
                self.backend.put_metric(Metric::new_histogram(
                    id.clone(),
                    description,
                    unit,
                    buckets.to_vec(),
                ))?;
                log::debug!("registered histogram {id}");
            }
            Err(e) => return Err(e),
        }
        Ok(HistogramHandle::new(id, self.backend.clone()))
    }

    /// Get a metric family by ID
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Check if a metric exists
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.backend.contains_metric(id)
    }

    /// Get all metric families in a namespace
    pub fn get_namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        if let Some(memory_backend) = self
            .backend
            .as_ref()
            .as_any()
            .downcast_ref::<InMemoryBackend>()
        {
            memory_backend.get_metrics_by_namespace(namespace)
        } else {
            self.backend
                .list_all_metrics()
                .into_iter()
                .filter(|m| m.metadata.id.namespace == namespace)
                .collect()
        }
    }

    /// Get the total number of metric families
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// Clear all metrics
    pub fn clear_all(&self) -> MetricsResult<()> {
        self.backend.clear_all()
    }

    /// Get direct access to the backend (for advanced operations)
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_type(existing: &Metric, expected: MetricType) -> MetricsResult<()> {
    let found = existing.value.metric_type();
    if found == expected {
        Ok(())
    } else {
        Err(MetricsError::TypeMismatch { expected, found })
    }
}

/// Handle for efficient counter operations
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Increment the series for `labels` by 1
    pub fn increment(&self, labels: &LabelSet) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, labels, 1)
    }

    /// Increment the series for `labels` by a specific amount
    pub fn increment_by(&self, labels: &LabelSet, amount: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, labels, amount)
    }

    /// Get the current value of the series for `labels` (0 if never
    /// incremented)
    pub fn get(&self, labels: &LabelSet) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .counter_get(labels)
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.value.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for efficient gauge operations
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Increment the series for `labels` by 1
    pub fn increment(&self, labels: &LabelSet) -> MetricsResult<f64> {
        self.add(labels, 1.0)
    }

    /// Decrement the series for `labels` by 1
    pub fn decrement(&self, labels: &LabelSet) -> MetricsResult<f64> {
        self.add(labels, -1.0)
    }

    /// Add `delta` (possibly negative) to the series for `labels`
    pub fn add(&self, labels: &LabelSet, delta: f64) -> MetricsResult<f64> {
        self.backend.add_gauge(&self.id, labels, delta)
    }

    /// Set the series for `labels` to a specific value
    pub fn set(&self, labels: &LabelSet, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, labels, value)
    }

    /// Get the current value of the series for `labels` (0 if never
    /// touched)
    pub fn get(&self, labels: &LabelSet) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .gauge_get(labels)
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.value.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for efficient histogram operations
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Record a sample in the series for `labels`
    pub fn observe(&self, value: f64, labels: &LabelSet) -> MetricsResult<()> {
        self.backend.record_histogram_sample(&self.id, labels, value)
    }

    /// Get the recorded distribution for `labels` (empty if never
    /// observed)
    pub fn get(&self, labels: &LabelSet) -> MetricsResult<HistogramSeries> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .histogram_get(labels)
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: metric.value.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.metric_count(), 0);
    }

    #[test]
    fn test_counter_registration_and_operations() {
        let registry = MetricsRegistry::new();

        let counter = registry
            .get_or_create_counter("api", "requests_total", "Total requests processed")
            .unwrap();

        let labels = LabelSet::new().with("method", "GET");
        assert_eq!(counter.increment(&labels).unwrap(), 1);
        assert_eq!(counter.increment_by(&labels, 5).unwrap(), 6);
        assert_eq!(counter.get(&labels).unwrap(), 6);
        assert_eq!(counter.get(&LabelSet::new()).unwrap(), 0);

        assert!(registry.contains_metric(counter.id()));
        assert_eq!(registry.metric_count(), 1);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let registry = MetricsRegistry::new();

        let first = registry
            .get_or_create_counter("api", "requests_total", "Total requests")
            .unwrap();
        first.increment(&LabelSet::new()).unwrap();

        let second = registry
            .get_or_create_counter("api", "requests_total", "Total requests")
            .unwrap();
        assert_eq!(second.get(&LabelSet::new()).unwrap(), 1);
        assert_eq!(registry.metric_count(), 1);
    }

    #[test]
    fn test_conflicting_type_is_rejected() {
        let registry = MetricsRegistry::new();

        registry
            .get_or_create_counter("api", "requests_total", "Total requests")
            .unwrap();

        let result = registry.get_or_create_gauge("api", "requests_total", "Oops", "requests");
        assert!(matches!(result, Err(MetricsError::TypeMismatch { .. })));
    }

    #[test]
    fn test_gauge_registration_and_operations() {
        let registry = MetricsRegistry::new();

        let gauge = registry
            .get_or_create_gauge("api", "in_progress_count", "In-flight requests", "requests")
            .unwrap();

        let labels = LabelSet::new().with("foo", "bar");
        assert_eq!(gauge.increment(&labels).unwrap(), 1.0);
        assert_eq!(gauge.increment(&labels).unwrap(), 2.0);
        assert_eq!(gauge.decrement(&labels).unwrap(), 1.0);

        gauge.set(&labels, 100.5).unwrap();
        assert_eq!(gauge.get(&labels).unwrap(), 100.5);
    }

    #[test]
    fn test_histogram_registration_and_operations() {
        let registry = MetricsRegistry::new();

        let histogram = registry
            .get_or_create_histogram(
                "api",
                "request_duration_seconds",
                "Request durations",
                "seconds",
                &[0.1, 1.0, 10.0],
            )
            .unwrap();

        let labels = LabelSet::new().with("foo", "bar");
        histogram.observe(0.05, &labels).unwrap();
        histogram.observe(2.5, &labels).unwrap();

        let series = histogram.get(&labels).unwrap();
        assert_eq!(series.count, 2);
        assert_eq!(series.bucket_counts, vec![1, 1, 2]);
        assert!((series.sum - 2.55).abs() < 1e-9);

        let untouched = histogram.get(&LabelSet::new()).unwrap();
        assert_eq!(untouched.count, 0);
    }

    #[test]
    fn test_histogram_bucket_validation() {
        let registry = MetricsRegistry::new();

        let empty = registry.get_or_create_histogram("api", "h", "H", "seconds", &[]);
        assert!(matches!(empty, Err(MetricsError::InvalidOperation(_))));

        let unsorted =
            registry.get_or_create_histogram("api", "h", "H", "seconds", &[1.0, 0.5, 2.0]);
        assert!(matches!(unsorted, Err(MetricsError::InvalidOperation(_))));
    }

    #[test]
    fn test_histogram_bucket_conflict() {
        let registry = MetricsRegistry::new();

        registry
            .get_or_create_histogram("api", "h", "H", "seconds", &[0.1, 1.0])
            .unwrap();

        let conflicting = registry.get_or_create_histogram("api", "h", "H", "seconds", &[0.5, 5.0]);
        assert!(matches!(
            conflicting,
            Err(MetricsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_namespace_filtering() {
        let registry = MetricsRegistry::new();

        registry
            .get_or_create_counter("api", "requests_total", "Requests")
            .unwrap();
        registry
            .get_or_create_counter("api", "exceptions_total", "Exceptions")
            .unwrap();
        registry
            .get_or_create_gauge("jobs", "in_progress_count", "In-flight", "jobs")
            .unwrap();

        assert_eq!(registry.get_namespace_metrics("api").len(), 2);
        assert_eq!(registry.get_namespace_metrics("jobs").len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let registry = MetricsRegistry::new();

        registry
            .get_or_create_counter("api", "requests_total", "Requests")
            .unwrap();
        registry
            .get_or_create_gauge("api", "in_progress_count", "In-flight", "requests")
            .unwrap();
        assert_eq!(registry.metric_count(), 2);

        registry.clear_all().unwrap();
        assert_eq!(registry.metric_count(), 0);
    }
}
