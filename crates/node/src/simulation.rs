//! One simulation run: grow an overlay, optionally build chords, inject
//! failures, send random payloads among the available nodes and report.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::Deserialize;
use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::yz_core::callback::CallbackError;
use crate::yz_core::callback::Delivery;
use crate::yz_core::callback::OverlayCallback;
use crate::yz_core::callback::RouteFailure;
use crate::yz_core::inspect::OverlayInspect;
use crate::yz_core::inspect::OverlayStats;
use crate::yz_core::Overlay;

/// Outcome of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub nodes: usize,
    pub unavailable: usize,
    pub components: usize,
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
    /// Failures between nodes the partition detection placed together.
    /// Always zero unless routing lost a message it could have delivered.
    pub unexplained_failures: usize,
    pub stats: OverlayStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspect: Option<OverlayInspect>,
}

#[derive(Default)]
struct Outcomes {
    deliveries: Mutex<Vec<Delivery>>,
    failures: Mutex<Vec<RouteFailure>>,
}

#[async_trait]
impl OverlayCallback for Outcomes {
    async fn on_delivered(&self, delivery: &Delivery) -> std::result::Result<(), CallbackError> {
        self.deliveries
            .lock()
            .map_err(|e| e.to_string())?
            .push(delivery.clone());
        Ok(())
    }

    async fn on_failed(&self, failure: &RouteFailure) -> std::result::Result<(), CallbackError> {
        self.failures
            .lock()
            .map_err(|e| e.to_string())?
            .push(failure.clone());
        Ok(())
    }
}

/// Run the simulation described by `config`. When `inspect` is set the
/// report carries every connection table.
pub async fn run(config: &Config, inspect: bool) -> Result<SimulationReport> {
    let sim = &config.simulation;
    if sim.nodes == 0 {
        return Err(Error::InvalidSimulation(
            "an overlay needs at least one node".to_string(),
        ));
    }

    let mut overlay = Overlay::new(config.overlay.clone())?;
    let outcomes = Arc::new(Outcomes::default());
    overlay.set_callback(outcomes.clone())?;

    tracing::info!("Growing the overlay to {} nodes", sim.nodes);
    overlay.populate(sim.nodes).await?;
    if sim.chords {
        let count = overlay.config().chord_count;
        tracing::info!("Building {} chord pairs per node", count);
        overlay.build_chords(count).await?;
    }

    let mut rng = match config.overlay.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let harness = overlay.resilience();
    let mut unavailable = harness.mark_random_unavailable(sim.fail_fraction, &mut rng)?;
    for locality in sim.fail_localities.iter() {
        unavailable += harness.mark_locality_unavailable(*locality);
    }
    let partitions = harness.detect_partitions()?;

    let live: Vec<usize> = (0..overlay.len())
        .filter(|i| overlay.node(*i).map(|n| n.is_available()).unwrap_or(false))
        .collect();
    let mut sent = 0;
    if live.is_empty() {
        tracing::warn!("No available node left, nothing to send");
    } else {
        for i in 0..sim.messages {
            let from = live[rng.gen_range(0..live.len())];
            let to = live[rng.gen_range(0..live.len())];
            overlay.send(from, to, format!("message {i}"))?;
            sent += 1;
        }
        overlay.settle().await?;
    }

    let deliveries = outcomes
        .deliveries
        .lock()
        .map_err(|e| Error::InvalidSimulation(e.to_string()))?
        .clone();
    let failures = outcomes
        .failures
        .lock()
        .map_err(|e| Error::InvalidSimulation(e.to_string()))?
        .clone();

    let mut failures_by_kind = BTreeMap::new();
    for f in failures.iter() {
        *failures_by_kind.entry(format!("{:?}", f.kind)).or_insert(0) += 1;
    }
    let unexplained_failures = failures
        .iter()
        .filter(|f| partitions.same_component(&f.origin, &f.destination))
        .count();
    if unexplained_failures > 0 {
        tracing::warn!(
            "{} messages failed between nodes of one component",
            unexplained_failures
        );
    }

    let report = SimulationReport {
        nodes: overlay.len(),
        unavailable,
        components: partitions.component_count(),
        sent,
        delivered: deliveries.len(),
        failed: failures.len(),
        failures_by_kind,
        unexplained_failures,
        stats: overlay.stats()?,
        inspect: if inspect {
            Some(overlay.inspect()?)
        } else {
            None
        },
    };
    overlay.shutdown();
    Ok(report)
}
