//! Concurrent traffic generator.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::admission::{AdmissionController, Outcome, RequestDescriptor, WindowSnapshot};
use crate::simulation::upstream::SyntheticUpstream;

/// Shape of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Destinations to drive traffic at.
    pub addresses: Vec<String>,
    /// Requests sent to each destination.
    pub requests_per_address: usize,
    /// Concurrent tasks per destination.
    pub concurrency: usize,
}

/// What happened to one destination during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressReport {
    pub admitted: u64,
    pub rejected: u64,
    pub failed: u64,
    pub window: Option<WindowSnapshot>,
}

impl AddressReport {
    fn merge(&mut self, other: &AddressReport) {
        self.admitted += other.admitted;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// Drive every destination concurrently and report per-address totals.
pub async fn run(
    controller: Arc<AdmissionController>,
    upstream: SyntheticUpstream,
    sim: &SimulationConfig,
) -> BTreeMap<String, AddressReport> {
    let concurrency = sim.concurrency.max(1);
    let mut tasks = Vec::new();

    for address in &sim.addresses {
        for worker in 0..concurrency {
            // Spread the remainder over the first workers.
            let count = sim.requests_per_address / concurrency
                + usize::from(worker < sim.requests_per_address % concurrency);
            let controller = controller.clone();
            let upstream = upstream.clone();
            let address = address.clone();

            tasks.push(tokio::spawn(async move {
                let mut report = AddressReport::default();
                for i in 0..count {
                    let method = format!("call{}", i % 4);
                    let request = RequestDescriptor::new("simulation.Endpoint", method);
                    let res = controller
                        .handle_async(&address, request, |req| upstream.call(&address, req))
                        .await;
                    match res {
                        Ok(outcome) => {
                            report.admitted += 1;
                            if outcome.is_failure() {
                                report.failed += 1;
                            }
                        }
                        Err(_) => report.rejected += 1,
                    }
                }
                (address, report)
            }));
        }
    }

    let mut reports: BTreeMap<String, AddressReport> = BTreeMap::new();
    for task in tasks {
        match task.await {
            Ok((address, report)) => reports.entry(address).or_default().merge(&report),
            Err(e) => tracing::error!(error = %e, "Simulation worker failed"),
        }
    }

    for (address, report) in reports.iter_mut() {
        report.window = controller.snapshot(address);
    }

    tracing::info!(destinations = reports.len(), "Simulation finished");
    reports
}
