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

//! # Vigil
//!
//! Uniform, low-overhead instrumentation of arbitrary units of work
//! (HTTP handlers, RPC calls, background jobs) over pluggable metric
//! storage.
//!
//! The entry point is [`Request`], which registers four metrics for a
//! named operation (total count, exception count, duration histogram,
//! in-progress gauge) and keeps them consistent across every exit path
//! of the measured work. Metrics live in a [`MetricsRegistry`], which
//! delegates storage to a [`storage::MetricsBackend`] implementation;
//! an in-memory backend is provided.

#![warn(missing_docs)]

pub mod metrics;
pub mod request;
pub mod storage;
pub mod utils;

pub use metrics::registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};
pub use metrics::types::{
    LabelSet, Metric, MetricId, MetricValue, MetricsError, MetricsResult,
};
pub use request::{ErrorClass, NoBlockError, Request};
