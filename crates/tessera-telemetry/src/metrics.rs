//! Prometheus export of gossip subsystem counters.
//!
//! Subsystems count with plain atomics and hand out snapshots. The node
//! copies those snapshots into this registry periodically, so the hot paths
//! never touch Prometheus.
//!
//! Names follow `ts_gossip_<kind>` with `subsystem` and `name` labels, e.g.
//! `ts_gossip_events_total{subsystem="checkers",name="rejected_heavy"}`.
//! Several nodes in one process export through [`MetricsHandle::scoped`],
//! which prefixes the subsystem label with the node.

use lazy_static::lazy_static;
use std::borrow::Cow;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide registry scraped by the metrics endpoint.
    pub static ref REGISTRY: Registry = Registry::new();
}

/// Registered gossip metric families.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
    totals: IntCounterVec,
    gauges: IntGaugeVec,
    scope: Option<String>,
}

/// Register the gossip metric families in the process-wide registry.
///
/// Fails if called twice in one process.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    MetricsHandle::with_registry(REGISTRY.clone())
}

impl MetricsHandle {
    /// Register the gossip metric families in `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, TelemetryError> {
        let totals = IntCounterVec::new(
            Opts::new(
                "ts_gossip_events_total",
                "Monotonic gossip counters by subsystem",
            ),
            &["subsystem", "name"],
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        let gauges = IntGaugeVec::new(
            Opts::new("ts_gossip_level", "Current gossip levels by subsystem"),
            &["subsystem", "name"],
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        registry
            .register(Box::new(totals.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        registry
            .register(Box::new(gauges.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        Ok(Self {
            registry,
            totals,
            gauges,
            scope: None,
        })
    }

    /// Handle sharing the families whose subsystem labels read
    /// `<scope>/<subsystem>`.
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..self.clone()
        }
    }

    fn subsystem<'a>(&self, subsystem: &'a str) -> Cow<'a, str> {
        match &self.scope {
            Some(scope) => Cow::Owned(format!("{scope}/{subsystem}")),
            None => Cow::Borrowed(subsystem),
        }
    }

    /// Bring counters up to the totals of a subsystem snapshot.
    ///
    /// Totals lower than the exported value are ignored; a subsystem that
    /// was recreated starts counting again from the exported level.
    pub fn export_totals(&self, subsystem: &str, totals: &[(&str, u64)]) {
        let subsystem = self.subsystem(subsystem);
        let subsystem = subsystem.as_ref();
        for (name, value) in totals {
            let counter = self.totals.with_label_values(&[subsystem, name]);
            let current = counter.get();
            if *value > current {
                counter.inc_by(*value - current);
            }
        }
    }

    /// Overwrite gauges with current levels.
    pub fn export_levels(&self, subsystem: &str, levels: &[(&str, u64)]) {
        let subsystem = self.subsystem(subsystem);
        let subsystem = subsystem.as_ref();
        for (name, value) in levels {
            let clamped = i64::try_from(*value).unwrap_or(i64::MAX);
            self.gauges
                .with_label_values(&[subsystem, name])
                .set(clamped);
        }
    }

    /// Exported total, for diagnostics and tests.
    pub fn total(&self, subsystem: &str, name: &str) -> u64 {
        self.totals
            .with_label_values(&[self.subsystem(subsystem).as_ref(), name])
            .get()
    }

    /// Exported level, for diagnostics and tests.
    pub fn level(&self, subsystem: &str, name: &str) -> i64 {
        self.gauges
            .with_label_values(&[self.subsystem(subsystem).as_ref(), name])
            .get()
    }

    /// Encode the registry in Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> MetricsHandle {
        MetricsHandle::with_registry(Registry::new()).unwrap()
    }

    #[test]
    fn test_totals_follow_snapshots() {
        let metrics = handle();
        metrics.export_totals("checkers", &[("accepted", 5), ("rejected_heavy", 1)]);
        metrics.export_totals("checkers", &[("accepted", 9), ("rejected_heavy", 1)]);
        assert_eq!(metrics.total("checkers", "accepted"), 9);
        assert_eq!(metrics.total("checkers", "rejected_heavy"), 1);

        // a reset subsystem never moves a counter backwards
        metrics.export_totals("checkers", &[("accepted", 2)]);
        assert_eq!(metrics.total("checkers", "accepted"), 9);
    }

    #[test]
    fn test_levels_overwrite() {
        let metrics = handle();
        metrics.export_levels("dag_fetcher", &[("tracked", 40)]);
        metrics.export_levels("dag_fetcher", &[("tracked", 3)]);
        assert_eq!(metrics.level("dag_fetcher", "tracked"), 3);
        metrics.export_levels("dag_fetcher", &[("tracked", u64::MAX)]);
        assert_eq!(metrics.level("dag_fetcher", "tracked"), i64::MAX);
    }

    #[test]
    fn test_scoped_handles_keep_nodes_apart() {
        let metrics = handle();
        let a = metrics.scoped("node-a");
        let b = metrics.scoped("node-b");
        a.export_totals("emitter", &[("events_emitted", 7)]);
        b.export_totals("emitter", &[("events_emitted", 2)]);
        assert_eq!(a.total("emitter", "events_emitted"), 7);
        assert_eq!(b.total("emitter", "events_emitted"), 2);
        assert_eq!(metrics.total("node-a/emitter", "events_emitted"), 7);
        assert_eq!(metrics.total("emitter", "events_emitted"), 0);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        MetricsHandle::with_registry(registry.clone()).unwrap();
        let err = MetricsHandle::with_registry(registry).err().unwrap();
        assert!(matches!(err, TelemetryError::MetricsInit(_)));
    }

    #[test]
    fn test_encode_contains_labels() {
        let metrics = handle();
        metrics.export_totals("emitter", &[("events_emitted", 4)]);
        let text = metrics.encode().unwrap();
        assert!(text.contains("ts_gossip_events_total"));
        assert!(text.contains("subsystem=\"emitter\""));
        assert!(text.contains("name=\"events_emitted\""));
    }
}
