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

//! Uniform instrumentation of a unit of work.
//!
//! [`Request`] registers four metrics for a named operation and keeps
//! them consistent across every exit path of the measured work:
//!
//! - `{prefix}_requests_total` — counter, incremented once per call;
//! - `{prefix}_exceptions_total` — counter, incremented when the work
//!   fails, with a `class` label naming the failure kind;
//! - `{prefix}_request_duration_seconds` — histogram, one observation
//!   per successful call;
//! - `{prefix}_in_progress_count` — gauge, incremented while the work
//!   runs and decremented on the way out, unconditionally.
//!
//! ```
//! use vigil::{LabelSet, MetricsRegistry, Request};
//!
//! let registry = MetricsRegistry::new();
//! let request = Request::new("api", &registry)?;
//!
//! let labels = LabelSet::new().with("method", "GET");
//! let body = request.measure(&labels, |labels| {
//!     labels.insert("status", "200");
//!     Ok::<_, std::convert::Infallible>("hello")
//! })?;
//! assert_eq!(body, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::metrics::registry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry,
};
use crate::metrics::types::{LabelSet, MetricsError, MetricsResult};
use std::fmt::Display;
use std::time::Instant;

/// Default duration histogram bucket bounds, in seconds. The
/// conventional latency set used by metric client libraries.
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// The label added to the exception counter, naming the failure kind.
pub const CLASS_LABEL: &str = "class";

/// The failure class recorded when the work panics (or is cancelled by
/// unwinding) instead of returning an error.
pub const PANIC_CLASS: &str = "panic";

/// Maps a failure to a stable, low-cardinality name for its kind.
///
/// The exception counter is labeled with this name, so implementations
/// must keep the set of possible return values small and fixed (one per
/// failure kind, never per occurrence).
pub trait ErrorClass {
    /// A stable name identifying this failure's kind.
    fn error_class(&self) -> &str;
}

impl ErrorClass for std::convert::Infallible {
    fn error_class(&self) -> &str {
        match *self {}
    }
}

/// No unit of work was supplied to a measurement call.
///
/// Raised by [`Request::try_measure`] before any metric is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoBlockError;

impl Display for NoBlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no unit of work was supplied to measure")
    }
}

impl std::error::Error for NoBlockError {}

/// Instrumented execution wrapper for a named operation.
///
/// Constructed once against a [`MetricsRegistry`] and kept for the life
/// of the service; each [`measure`](Request::measure) call is
/// independent and carries no shared label state, so a `Request` can be
/// used concurrently from any number of threads.
#[derive(Debug, Clone)]
pub struct Request {
    requests: CounterHandle,
    exceptions: CounterHandle,
    durations: HistogramHandle,
    in_progress: GaugeHandle,
}

impl Request {
    /// Registers the four request metrics under `prefix` with the
    /// default duration buckets.
    ///
    /// An empty prefix is rejected with
    /// [`MetricsError::InvalidOperation`]; registry schema conflicts
    /// propagate unchanged.
    pub fn new(prefix: &str, registry: &MetricsRegistry) -> MetricsResult<Self> {
        Self::with_buckets(prefix, registry, DEFAULT_DURATION_BUCKETS)
    }

    /// Like [`new`](Request::new), with custom duration histogram
    /// bucket bounds.
    pub fn with_buckets(
        prefix: &str,
        registry: &MetricsRegistry,
        buckets: &[f64],
    ) -> MetricsResult<Self> {
        if prefix.is_empty() {
            return Err(MetricsError::InvalidOperation(
                "request metric prefix must not be empty".to_string(),
            ));
        }

        let requests = registry.get_or_create_counter(
            prefix,
            "requests_total",
            format!("Number of {prefix} requests processed"),
        )?;
        let exceptions = registry.get_or_create_counter(
            prefix,
            "exceptions_total",
            format!("Number of {prefix} requests that terminated abnormally"),
        )?;
        let durations = registry.get_or_create_histogram(
            prefix,
            "request_duration_seconds",
            format!("Time taken to process each {prefix} request"),
            "seconds",
            buckets,
        )?;
        let in_progress = registry.get_or_create_gauge(
            prefix,
            "in_progress_count",
            format!("Number of {prefix} requests currently being processed"),
            "requests",
        )?;

        Ok(Self {
            requests,
            exceptions,
            durations,
            in_progress,
        })
    }

    /// Runs `work`, updating the four request metrics according to its
    /// outcome, and returns its result unchanged.
    ///
    /// `base_labels` drive the gauge and both counters exactly as
    /// given. The work receives a mutable, independent copy — the
    /// working label set — and may add, override, or delete labels
    /// freely; the final state of that copy labels the duration
    /// observation, and nothing else.
    ///
    /// On success: gauge down, total up, one duration observation.
    /// On failure (an `Err` from the work, or an unwind through it):
    /// gauge down, total up, exception counter up with a
    /// [`CLASS_LABEL`] naming the failure kind, no duration
    /// observation. The error (or panic) propagates unchanged.
    ///
    /// Metric updates are observable side effects, never control flow:
    /// failures to record them are logged and swallowed.
    pub fn measure<F, T, E>(&self, base_labels: &LabelSet, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut LabelSet) -> Result<T, E>,
        E: ErrorClass,
    {
        let mut guard = InFlightGuard::arm(self, base_labels);

        let mut working_labels = base_labels.clone();
        let started = Instant::now();
        let result = work(&mut working_labels);
        let elapsed = started.elapsed().as_secs_f64();

        guard.disarm();
        warn_on_failure(
            "decrement in-progress gauge",
            self.in_progress.decrement(base_labels),
        );
        warn_on_failure(
            "increment request counter",
            self.requests.increment(base_labels),
        );
        match &result {
            Ok(_) => warn_on_failure(
                "observe request duration",
                self.durations.observe(elapsed, &working_labels),
            ),
            Err(e) => warn_on_failure(
                "increment exception counter",
                self.exceptions
                    .increment(&base_labels.clone().with(CLASS_LABEL, e.error_class())),
            ),
        }

        result
    }

    /// Dynamic variant of [`measure`](Request::measure) for call sites
    /// where the work is only conditionally present.
    ///
    /// Fails with [`NoBlockError`] before any metric is touched when
    /// `work` is `None`; otherwise behaves exactly like `measure`, with
    /// the work's own result in the inner `Result`.
    pub fn try_measure<F, T, E>(
        &self,
        base_labels: &LabelSet,
        work: Option<F>,
    ) -> Result<Result<T, E>, NoBlockError>
    where
        F: FnOnce(&mut LabelSet) -> Result<T, E>,
        E: ErrorClass,
    {
        match work {
            Some(work) => Ok(self.measure(base_labels, work)),
            None => Err(NoBlockError),
        }
    }
}

/// Scope guard pairing the in-progress gauge increment with a
/// guaranteed decrement.
///
/// Armed on entry to `measure`; disarmed once the work has returned and
/// the normal bookkeeping takes over. If it drops while still armed the
/// work unwound, and the failure-path updates run here so the gauge
/// never leaks an in-flight request.
struct InFlightGuard<'a> {
    request: &'a Request,
    base_labels: &'a LabelSet,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn arm(request: &'a Request, base_labels: &'a LabelSet) -> Self {
        warn_on_failure(
            "increment in-progress gauge",
            request.in_progress.increment(base_labels),
        );
        Self {
            request,
            base_labels,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn_on_failure(
            "decrement in-progress gauge",
            self.request.in_progress.decrement(self.base_labels),
        );
        warn_on_failure(
            "increment request counter",
            self.request.requests.increment(self.base_labels),
        );
        warn_on_failure(
            "increment exception counter",
            self.request
                .exceptions
                .increment(&self.base_labels.clone().with(CLASS_LABEL, PANIC_CLASS)),
        );
    }
}

fn warn_on_failure<T>(context: &str, outcome: MetricsResult<T>) {
    if let Err(e) = outcome {
        log::warn!("failed to {context}: {e}");
    }
}
