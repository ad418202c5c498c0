//! Fan-out/fan-in orchestration of parallel scan units.
//!
//! Dispatch is eager and unconditional: every unit is spawned before any
//! result is examined, and the join loop waits for the slowest unit before
//! reaching a verdict. The first failure is re-raised only after all units
//! have terminated, so sibling units always get to release their own
//! connections.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::JoinSet;
use tracing::{debug, info};

use scanstress_model::ClientError;

use crate::{
    aggregate::{RunAggregate, RunTotals},
    driver::run_unit,
};

/// Parallel unit count when the caller does not choose one.
pub const DEFAULT_UNITS: usize = 100;

/// One fixed-shape stress run: `units` independent scan sequences against
/// one endpoint, filtered to one target schema.
#[derive(Debug, Clone)]
pub struct StressRun {
    base_url: String,
    target_schema: String,
    units: usize,
}

impl StressRun {
    pub fn new(base_url: impl Into<String>, target_schema: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            target_schema: target_schema.into(),
            units: DEFAULT_UNITS,
        }
    }

    pub fn with_units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Dispatch all units, join all units, then either re-raise the first
    /// failure or snapshot the injected aggregate. The report totals are
    /// only produced on a fully successful join; a failed run yields no
    /// totals at all.
    pub async fn execute(
        &self,
        totals: Arc<RunAggregate>,
    ) -> Result<RunTotals, ClientError> {
        let log_once = Arc::new(AtomicBool::new(true));
        let mut units = JoinSet::new();

        for unit in 0..self.units {
            let base_url = self.base_url.clone();
            let target_schema = self.target_schema.clone();
            let totals = Arc::clone(&totals);
            let log_once = Arc::clone(&log_once);
            units.spawn(async move {
                let log_tables = log_once.swap(false, Ordering::Relaxed);
                let report =
                    run_unit(&base_url, &target_schema, &totals, log_tables).await?;
                debug!(
                    unit,
                    objects = report.objects_scanned,
                    rows = report.rows_loaded,
                    "unit joined"
                );
                Ok::<_, ClientError>(report)
            });
        }
        info!(units = self.units, "all units dispatched");

        let mut first_failure: Option<ClientError> = None;
        while let Some(joined) = units.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => Err(ClientError::Execution(format!(
                    "scan unit panicked: {join_err}"
                ))),
            };
            if let Err(err) = outcome {
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
        }
        info!(units = self.units, "all units joined");

        if let Some(err) = first_failure {
            return Err(err);
        }

        let totals = totals.snapshot();
        info!(%totals, "run complete");
        Ok(totals)
    }
}
