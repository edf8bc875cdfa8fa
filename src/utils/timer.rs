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

//! RAII-based timer for automatically recording durations.

use crate::metrics::registry::HistogramHandle;
use crate::metrics::types::LabelSet;
use std::time::Instant;

/// Times a scope and records the elapsed seconds in a histogram when
/// dropped.
///
/// A lighter-weight alternative to the full request protocol for
/// callers that only want duration instrumentation. The RAII pattern
/// ensures the measurement is recorded even on early returns.
pub struct ScopedMetricTimer<'a> {
    started: Instant,
    histogram: &'a HistogramHandle,
    labels: LabelSet,
}

impl<'a> ScopedMetricTimer<'a> {
    /// Creates a new timer for the given histogram and starts it
    /// immediately.
    pub fn new(histogram: &'a HistogramHandle, labels: LabelSet) -> Self {
        Self {
            started: Instant::now(),
            histogram,
            labels,
        }
    }
}

impl Drop for ScopedMetricTimer<'_> {
    fn drop(&mut self) {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        if let Err(e) = self.histogram.observe(elapsed_secs, &self.labels) {
            log::warn!("[ScopedMetricTimer] Failed to record metric: {e}");
        }
    }
}
