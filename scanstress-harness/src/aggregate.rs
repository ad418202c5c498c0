//! Process-wide run counters.
//!
//! Three monotonic counters shared by every parallel unit. Increments are
//! commutative, so relaxed atomics are sufficient; no unit ever reads the
//! counters mid-run. `snapshot` is only meaningful once the orchestrator
//! has joined every unit (read-after-join discipline).

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
pub struct RunAggregate {
    matched_objects: AtomicU64,
    total_errors: AtomicU64,
    total_rows_loaded: AtomicU64,
}

impl RunAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// One queryable object fully scanned without error.
    pub fn record_object(&self) {
        self.matched_objects.fetch_add(1, Ordering::Relaxed);
    }

    /// One result row consumed (all columns decoded).
    pub fn record_row(&self) {
        self.total_rows_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// One counted-and-continued error. The scan driver never takes this
    /// path: unit failures abort the unit and surface at the join instead,
    /// so a successful run always reports zero here.
    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Exact totals, valid only after all concurrent activity has joined.
    pub fn snapshot(&self) -> RunTotals {
        RunTotals {
            tables_loaded: self.matched_objects.load(Ordering::Relaxed),
            errors: self.total_errors.load(Ordering::Relaxed),
            rows_total: self.total_rows_loaded.load(Ordering::Relaxed),
        }
    }
}

/// Final counter values of a fully joined run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub tables_loaded: u64,
    pub errors: u64,
    pub rows_total: u64,
}

impl fmt::Display for RunTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tables loaded {}, Errors: {}, Rows Total:{}",
            self.tables_loaded, self.errors, self.rows_total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn report_line_format() {
        let totals = RunTotals {
            tables_loaded: 20,
            errors: 0,
            rows_total: 100,
        };
        assert_eq!(totals.to_string(), "Tables loaded 20, Errors: 0, Rows Total:100");
    }

    #[test]
    fn counters_are_independent() {
        let agg = RunAggregate::new();
        agg.record_object();
        agg.record_row();
        agg.record_row();
        agg.record_error();
        assert_eq!(
            agg.snapshot(),
            RunTotals {
                tables_loaded: 1,
                errors: 1,
                rows_total: 2,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_never_lost() {
        let agg = Arc::new(RunAggregate::new());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let agg = Arc::clone(&agg);
            tasks.spawn(async move {
                for _ in 0..1_000 {
                    agg.record_row();
                }
                agg.record_object();
            });
        }
        while tasks.join_next().await.is_some() {}

        let totals = agg.snapshot();
        assert_eq!(totals.rows_total, 16_000);
        assert_eq!(totals.tables_loaded, 16);
        assert_eq!(totals.errors, 0);
    }

    /// Dispatch order must not matter: the totals are plain sums.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn aggregation_is_order_independent() {
        let mut snapshots = Vec::new();
        for reversed in [false, true] {
            let agg = Arc::new(RunAggregate::new());
            let mut tasks = tokio::task::JoinSet::new();
            let units: Vec<u64> = if reversed {
                (1..=8).rev().collect()
            } else {
                (1..=8).collect()
            };
            for rows in units {
                let agg = Arc::clone(&agg);
                tasks.spawn(async move {
                    for _ in 0..rows {
                        agg.record_row();
                    }
                    agg.record_object();
                });
            }
            while tasks.join_next().await.is_some() {}
            snapshots.push(agg.snapshot());
        }
        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[0].rows_total, 36);
    }
}
