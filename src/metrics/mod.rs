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

//! The metric data model and the registry built on top of it.
//!
//! [`types`] defines the "common language" of the crate: metric
//! identifiers, label sets, per-series values, and the error type.
//! [`registry`] provides create-or-fetch registration and cheap handles
//! for updating individual metric families.

pub mod registry;
pub mod types;

pub use self::registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};
pub use self::types::{
    HistogramSeries, LabelSet, Metric, MetricId, MetricMetadata, MetricType, MetricValue,
    MetricsError, MetricsResult,
};
