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

use crate::metrics::types::{
    LabelSet, Metric, MetricId, MetricType, MetricsError, MetricsResult,
};
use crate::storage::backend::{BackendStats, MetricsBackend};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory metrics backend using `RwLock<HashMap>`.
///
/// Thread-safe concurrent access (multiple readers, single writer) with
/// O(1) average case lookup. Update operations are overridden to mutate
/// families in place under a single write lock, so every counter bump,
/// gauge move, and histogram observation is atomic.
#[derive(Debug)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new in-memory backend with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Get statistics about this backend
    pub fn get_stats(&self) -> BackendStats {
        let storage = self.storage.read().unwrap();

        let mut counter_count = 0;
        let mut gauge_count = 0;
        let mut histogram_count = 0;

        for metric in storage.values() {
            match metric.value.metric_type() {
                MetricType::Counter => counter_count += 1,
                MetricType::Gauge => gauge_count += 1,
                MetricType::Histogram => histogram_count += 1,
            }
        }

        BackendStats {
            total_metrics: storage.len(),
            counter_count,
            gauge_count,
            histogram_count,
        }
    }

    /// Get all metric families sharing a namespace
    pub fn get_metrics_by_namespace(&self, namespace: &str) -> Vec<Metric> {
        let storage = self.storage.read().unwrap();
        storage
            .values()
            .filter(|metric| metric.metadata.id.namespace == namespace)
            .cloned()
            .collect()
    }

    fn with_metric_mut<T>(
        &self,
        id: &MetricId,
        update: impl FnOnce(&mut Metric) -> MetricsResult<T>,
    ) -> MetricsResult<T> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;

        update(metric)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsBackend for InMemoryBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn put_metric(&self, metric: Metric) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage.insert(metric.metadata.id.clone(), metric);
        Ok(())
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        let storage = self
            .storage
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))?;

        storage
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        if let Ok(storage) = self.storage.read() {
            storage.contains_key(id)
        } else {
            false
        }
    }

    fn remove_metric(&self, id: &MetricId) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn list_metric_ids(&self) -> Vec<MetricId> {
        if let Ok(storage) = self.storage.read() {
            storage.keys().cloned().collect()
        } else {
            Vec::new()
        }
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        if let Ok(storage) = self.storage.read() {
            storage.values().cloned().collect()
        } else {
            Vec::new()
        }
    }

    fn clear_all(&self) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage.clear();
        Ok(())
    }

    fn metric_count(&self) -> usize {
        if let Ok(storage) = self.storage.read() {
            storage.len()
        } else {
            0
        }
    }

    // In-place updates under a single write lock.

    fn increment_counter(
        &self,
        id: &MetricId,
        labels: &LabelSet,
        delta: u64,
    ) -> MetricsResult<u64> {
        self.with_metric_mut(id, |metric| metric.increment_counter(labels, delta))
    }

    fn add_gauge(&self, id: &MetricId, labels: &LabelSet, delta: f64) -> MetricsResult<f64> {
        self.with_metric_mut(id, |metric| metric.add_gauge(labels, delta))
    }

    fn set_gauge(&self, id: &MetricId, labels: &LabelSet, value: f64) -> MetricsResult<()> {
        self.with_metric_mut(id, |metric| metric.set_gauge(labels, value))
    }

    fn record_histogram_sample(
        &self,
        id: &MetricId,
        labels: &LabelSet,
        sample: f64,
    ) -> MetricsResult<()> {
        self.with_metric_mut(id, |metric| metric.record_histogram_sample(labels, sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_backend_basic_operations() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "requests_total");
        let metric = Metric::new_counter(id.clone(), "Test counter");

        assert!(backend.put_metric(metric).is_ok());
        assert!(backend.contains_metric(&id));
        assert_eq!(backend.metric_count(), 1);

        assert!(backend.remove_metric(&id).is_ok());
        assert!(!backend.contains_metric(&id));
        assert_eq!(backend.metric_count(), 0);
    }

    #[test]
    fn test_counter_increment_per_labels() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "requests_total");
        backend
            .put_metric(Metric::new_counter(id.clone(), "Test counter"))
            .unwrap();

        let get = LabelSet::new().with("method", "GET");
        let put = LabelSet::new().with("method", "PUT");

        assert_eq!(backend.increment_counter(&id, &get, 5).unwrap(), 5);
        assert_eq!(backend.increment_counter(&id, &get, 3).unwrap(), 8);
        assert_eq!(backend.increment_counter(&id, &put, 1).unwrap(), 1);

        let retrieved = backend.get_metric(&id).unwrap();
        assert_eq!(retrieved.value.counter_get(&get), Some(8));
        assert_eq!(retrieved.value.counter_get(&put), Some(1));
    }

    #[test]
    fn test_gauge_moves_up_and_down() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "in_progress_count");
        backend
            .put_metric(Metric::new_gauge(id.clone(), "In-flight", "requests"))
            .unwrap();

        let labels = LabelSet::new().with("foo", "bar");

        assert_eq!(backend.add_gauge(&id, &labels, 1.0).unwrap(), 1.0);
        assert_eq!(backend.add_gauge(&id, &labels, 1.0).unwrap(), 2.0);
        assert_eq!(backend.add_gauge(&id, &labels, -2.0).unwrap(), 0.0);

        backend.set_gauge(&id, &labels, 250.5).unwrap();
        let retrieved = backend.get_metric(&id).unwrap();
        assert_eq!(retrieved.value.gauge_get(&labels), Some(250.5));
    }

    #[test]
    fn test_histogram_observations() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "request_duration_seconds");
        let buckets = vec![0.1, 1.0, 10.0];
        backend
            .put_metric(Metric::new_histogram(
                id.clone(),
                "Durations",
                "seconds",
                buckets,
            ))
            .unwrap();

        let labels = LabelSet::new();
        backend.record_histogram_sample(&id, &labels, 0.05).unwrap();
        backend.record_histogram_sample(&id, &labels, 0.5).unwrap();
        backend.record_histogram_sample(&id, &labels, 5.0).unwrap();

        let series = backend
            .get_metric(&id)
            .unwrap()
            .value
            .histogram_get(&labels)
            .unwrap();
        assert_eq!(series.count, 3);
        assert_eq!(series.bucket_counts, vec![1, 2, 3]);
        assert!((series.sum - 5.55).abs() < 1e-9);
    }

    #[test]
    fn test_namespace_filtering_and_stats() {
        let backend = InMemoryBackend::new();

        backend
            .put_metric(Metric::new_counter(
                MetricId::new("api", "requests_total"),
                "Requests",
            ))
            .unwrap();
        backend
            .put_metric(Metric::new_counter(
                MetricId::new("api", "exceptions_total"),
                "Exceptions",
            ))
            .unwrap();
        backend
            .put_metric(Metric::new_gauge(
                MetricId::new("jobs", "in_progress_count"),
                "In-flight",
                "jobs",
            ))
            .unwrap();

        assert_eq!(backend.get_metrics_by_namespace("api").len(), 2);
        assert_eq!(backend.get_metrics_by_namespace("jobs").len(), 1);
        assert_eq!(backend.get_metrics_by_namespace("nope").len(), 0);

        let stats = backend.get_stats();
        assert_eq!(stats.total_metrics, 3);
        assert_eq!(stats.counter_count, 2);
        assert_eq!(stats.gauge_count, 1);
        assert_eq!(stats.histogram_count, 0);
    }

    #[test]
    fn test_update_errors() {
        let backend = InMemoryBackend::new();
        let missing = MetricId::new("test", "nonexistent");

        assert!(matches!(
            backend.increment_counter(&missing, &LabelSet::new(), 1),
            Err(MetricsError::MetricNotFound(_))
        ));

        let id = MetricId::new("test", "gauge");
        backend
            .put_metric(Metric::new_gauge(id.clone(), "Gauge", "units"))
            .unwrap();
        assert!(matches!(
            backend.increment_counter(&id, &LabelSet::new(), 1),
            Err(MetricsError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_all() {
        let backend = InMemoryBackend::new();
        backend
            .put_metric(Metric::new_counter(MetricId::new("a", "b"), "c"))
            .unwrap();
        assert_eq!(backend.metric_count(), 1);

        backend.clear_all().unwrap();
        assert_eq!(backend.metric_count(), 0);
    }
}
