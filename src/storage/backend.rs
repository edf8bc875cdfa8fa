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

//! The storage interface metric registries delegate to.

use crate::metrics::types::{LabelSet, Metric, MetricId, MetricsResult};
use serde::Serialize;
use std::fmt::Debug;

/// Trait defining the interface for metrics storage backends.
///
/// The default update methods are read-modify-write over `get_metric` /
/// `put_metric`. Backends with interior locking should override them so
/// each update runs under a single critical section; the instrumentation
/// layer assumes every individual update it issues is atomic.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Get a reference to this object as Any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;

    /// Store or replace a metric family
    fn put_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Retrieve a metric family by ID
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Check if a metric exists
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Remove a metric
    fn remove_metric(&self, id: &MetricId) -> MetricsResult<()>;

    /// Get all metric IDs currently stored
    fn list_metric_ids(&self) -> Vec<MetricId>;

    /// Get all metrics (potentially expensive operation)
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// Clear all metrics
    fn clear_all(&self) -> MetricsResult<()>;

    /// Get the number of metric families stored
    fn metric_count(&self) -> usize;

    // Convenience methods for common operations

    /// Increment the counter series for `labels` by `delta`
    fn increment_counter(
        &self,
        id: &MetricId,
        labels: &LabelSet,
        delta: u64,
    ) -> MetricsResult<u64> {
        let mut metric = self.get_metric(id)?;
        let result = metric.increment_counter(labels, delta)?;
        self.put_metric(metric)?;
        Ok(result)
    }

    /// Add `delta` (possibly negative) to the gauge series for `labels`
    fn add_gauge(&self, id: &MetricId, labels: &LabelSet, delta: f64) -> MetricsResult<f64> {
        let mut metric = self.get_metric(id)?;
        let result = metric.add_gauge(labels, delta)?;
        self.put_metric(metric)?;
        Ok(result)
    }

    /// Set the gauge series for `labels` to `value`
    fn set_gauge(&self, id: &MetricId, labels: &LabelSet, value: f64) -> MetricsResult<()> {
        let mut metric = self.get_metric(id)?;
        metric.set_gauge(labels, value)?;
        self.put_metric(metric)?;
        Ok(())
    }

    /// Record one sample in the histogram series for `labels`
    fn record_histogram_sample(
        &self,
        id: &MetricId,
        labels: &LabelSet,
        sample: f64,
    ) -> MetricsResult<()> {
        let mut metric = self.get_metric(id)?;
        metric.record_histogram_sample(labels, sample)?;
        self.put_metric(metric)?;
        Ok(())
    }
}

/// Statistics about the metrics backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendStats {
    /// Total number of metric families stored
    pub total_metrics: usize,
    /// Number of counters
    pub counter_count: usize,
    /// Number of gauges
    pub gauge_count: usize,
    /// Number of histograms
    pub histogram_count: usize,
}
