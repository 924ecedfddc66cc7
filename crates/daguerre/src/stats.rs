//! Runtime statistics.

use daguerre_transform::{EngineStats, ImageEngine};
use derive_getters::Getters;
use prometheus::Registry;
use serde::Serialize;
use std::sync::Arc;

const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";
const VIRTUAL_MEMORY: &str = "process_virtual_memory_bytes";

/// Process-level memory figures. Zero where the platform has no collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Getters)]
pub struct RuntimeStats {
    resident_bytes: u64,
    virtual_bytes: u64,
}

/// One point-in-time view of the process and the image engine.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct StatsSnapshot {
    runtime: RuntimeStats,
    engine: EngineStats,
}

/// Reads process and engine statistics without changing either.
pub struct StatsReporter<E: ImageEngine> {
    engine: Arc<E>,
    registry: Registry,
}

impl<E: ImageEngine> StatsReporter<E> {
    /// Reporter over `engine` and the current process.
    pub fn new(engine: Arc<E>) -> Self {
        let registry = Registry::new();
        register_process_collector(&registry);
        Self { engine, registry }
    }

    /// Current figures.
    #[tracing::instrument(skip(self))]
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut runtime = RuntimeStats::default();
        for family in self.registry.gather() {
            let value = family
                .get_metric()
                .first()
                .map(|metric| metric.get_gauge().get_value() as u64)
                .unwrap_or_default();
            match family.get_name() {
                RESIDENT_MEMORY => runtime.resident_bytes = value,
                VIRTUAL_MEMORY => runtime.virtual_bytes = value,
                _ => {}
            }
        }

        let snapshot = StatsSnapshot {
            runtime,
            engine: self.engine.stats(),
        };
        tracing::debug!(?snapshot, "Collected stats");
        snapshot
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    if let Err(e) = registry.register(Box::new(collector)) {
        tracing::warn!(error = %e, "Process statistics unavailable");
    }
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) {
    tracing::debug!("No process collector on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use daguerre_transform::RasterEngine;

    #[test]
    fn test_snapshot_serializes() {
        let reporter = StatsReporter::new(Arc::new(RasterEngine::new()));
        let snapshot = reporter.snapshot();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["runtime"]["resident_bytes"].is_u64());
        assert_eq!(json["engine"]["live_images"], 0);
        assert_eq!(json["engine"]["operation_counts"]["decode"], 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reports_process_memory() {
        let reporter = StatsReporter::new(Arc::new(RasterEngine::new()));
        let snapshot = reporter.snapshot();
        assert!(*snapshot.runtime().resident_bytes() > 0);
        assert!(*snapshot.runtime().virtual_bytes() >= *snapshot.runtime().resident_bytes());
    }
}
