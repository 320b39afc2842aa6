// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The diagnostics center: one funnel for events, metrics, incidents,
//! and the recovery budget.

use crate::budget::{NotifyCooldowns, RecoveryBudget};
use crate::bundle::{self, BundleContents, BundleError};
use parking_lot::Mutex;
use quedo_core::clock::Clock;
use quedo_core::event::{names, SessionEvent};
use quedo_core::metrics::MetricPoint;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Where structured records land (the history store in production).
pub trait EventSink: Send + Sync {
    fn append_event(&self, event: &SessionEvent);
    fn record_metric(&self, point: &MetricPoint);
}

/// Discards everything; for components wired up before storage exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn append_event(&self, _event: &SessionEvent) {}
    fn record_metric(&self, _point: &MetricPoint) {}
}

/// Identifier of an open incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncidentId(pub u64);

struct Incident {
    id: IncidentId,
    tag: String,
    opened_at_ms: u64,
}

/// The diagnostics hub. Cheap to share; every member is internally
/// synchronized.
pub struct DiagnosticsCenter<C: Clock> {
    clock: C,
    sink: Arc<dyn EventSink>,
    budget: RecoveryBudget<C>,
    cooldowns: NotifyCooldowns<C>,
    incidents: Mutex<Vec<Incident>>,
    next_incident: AtomicU64,
}

impl<C: Clock> DiagnosticsCenter<C> {
    pub fn new(clock: C, sink: Arc<dyn EventSink>) -> Self {
        Self {
            budget: RecoveryBudget::new(clock.clone()),
            cooldowns: NotifyCooldowns::new(clock.clone()),
            clock,
            sink,
            incidents: Mutex::new(Vec::new()),
            next_incident: AtomicU64::new(1),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Record a structured event: tracing line plus the sink.
    pub fn emit(&self, event: SessionEvent) {
        info!(name = %event.name, attrs = ?event.attrs, "event");
        self.sink.append_event(&event);
    }

    /// Convenience constructor stamped with the center's clock.
    pub fn event(&self, name: &str) -> SessionEvent {
        SessionEvent::new(name, self.clock.epoch_ms())
    }

    pub fn record_metric(&self, point: MetricPoint) {
        self.sink.record_metric(&point);
    }

    /// Count-style metric with one tag.
    pub fn count(&self, name: &str, tag_key: &str, tag_value: &str) {
        let point =
            MetricPoint::new(name, 1.0, self.clock.epoch_ms()).tag(tag_key, tag_value);
        self.record_metric(point);
    }

    /// Consume recovery budget for `tag`. False forces degraded.
    pub fn allow_recovery(&self, tag: &str) -> bool {
        self.budget.try_consume(tag)
    }

    pub fn allow_degraded_notification(&self, reason: &str) -> bool {
        self.cooldowns.allow_degraded_notification(reason)
    }

    pub fn allow_silent_mic_warning(&self) -> bool {
        self.cooldowns.allow_silent_mic_warning()
    }

    pub fn start_incident(&self, tag: &str) -> IncidentId {
        let id = IncidentId(self.next_incident.fetch_add(1, Ordering::SeqCst));
        let opened_at_ms = self.clock.epoch_ms();
        self.incidents.lock().push(Incident {
            id,
            tag: tag.to_string(),
            opened_at_ms,
        });
        self.emit(
            self.event(names::INCIDENT_OPENED)
                .attr("incident", id.0.to_string())
                .attr("tag", tag),
        );
        id
    }

    pub fn close_incident(&self, id: IncidentId) {
        let mut incidents = self.incidents.lock();
        if let Some(index) = incidents.iter().position(|i| i.id == id) {
            let incident = incidents.remove(index);
            drop(incidents);
            let open_for_ms = self.clock.epoch_ms().saturating_sub(incident.opened_at_ms);
            self.emit(
                self.event(names::INCIDENT_CLOSED)
                    .attr("incident", incident.id.0.to_string())
                    .attr("tag", incident.tag)
                    .attr("open_for_ms", open_for_ms.to_string()),
            );
        }
    }

    pub fn open_incidents(&self) -> Vec<(IncidentId, String)> {
        self.incidents.lock().iter().map(|i| (i.id, i.tag.clone())).collect()
    }

    /// Write the support bundle zip into `exports_dir`.
    pub fn export_support_bundle(
        &self,
        contents: &BundleContents,
        exports_dir: &Path,
    ) -> Result<PathBuf, BundleError> {
        bundle::write_bundle(contents, exports_dir, self.clock.epoch_ms())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::{EventSink, MetricPoint, SessionEvent};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recording sink for tests.
    #[derive(Clone, Default)]
    pub struct MemorySink {
        events: Arc<Mutex<Vec<SessionEvent>>>,
        metrics: Arc<Mutex<Vec<MetricPoint>>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<SessionEvent> {
            self.events.lock().clone()
        }

        pub fn metrics(&self) -> Vec<MetricPoint> {
            self.metrics.lock().clone()
        }

        pub fn metric_total(&self, name: &str, tag_key: &str, tag_value: &str) -> f64 {
            self.metrics
                .lock()
                .iter()
                .filter(|p| {
                    p.name == name
                        && p.tags.get(tag_key).map(String::as_str) == Some(tag_value)
                })
                .map(|p| p.value)
                .sum()
        }
    }

    impl EventSink for MemorySink {
        fn append_event(&self, event: &SessionEvent) {
            self.events.lock().push(event.clone());
        }

        fn record_metric(&self, point: &MetricPoint) {
            self.metrics.lock().push(point.clone());
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemorySink;

#[cfg(test)]
#[path = "center_tests.rs"]
mod tests;
