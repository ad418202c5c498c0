//! Failure semantics: run-level abort at the join, resource release on
//! failing paths, and the error taxonomy surfaced to the caller.

mod support;

use std::sync::Arc;

use scanstress_harness::{ClientError, RunAggregate, StressRun, run_unit};
use scanstress_server::{Catalog, SchemaDef, TableDef, serve};
use support::{number_rows, run_against};

fn faulty_catalog() -> Catalog {
    Catalog::new(vec![SchemaDef {
        name: "sales".into(),
        tables: vec![
            TableDef::new("EMPS", vec!["ID", "NAME"], number_rows(5)),
            TableDef::new("BROKEN", vec!["ID", "NAME"], number_rows(5))
                .failing_after(2),
        ],
    }])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mid_scan_fault_fails_the_run_after_join() {
    // Frame size 1 so the fault lands on a fetch, not the first frame.
    let service = serve(faulty_catalog(), 1).await.unwrap();

    let err = run_against(&service, "sales", 4).await.unwrap_err();
    assert!(matches!(err, ClientError::Execution(_)));
    assert!(err.to_string().contains("injected fault"));

    // Every unit ran to termination and released what it opened, failing
    // ones included.
    assert_eq!(service.state().open_connections().await, 0);
    assert_eq!(service.state().open_statements().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn partial_rows_stay_counted_after_a_failure() {
    let service = serve(faulty_catalog(), 1).await.unwrap();

    let totals = Arc::new(RunAggregate::new());
    let run = StressRun::new(service.base_url(), "sales").with_units(3);
    run.execute(Arc::clone(&totals)).await.unwrap_err();

    // Counters are monotonic: rows consumed before the fault are not
    // rolled back. Descriptor order puts EMPS first, so every unit scans
    // its five rows cleanly, then reads the two pre-fault BROKEN rows.
    let snapshot = totals.snapshot();
    assert_eq!(snapshot.rows_total, 3 * (5 + 2));
    assert_eq!(snapshot.tables_loaded, 3);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn single_failing_unit_reports_execution_error() {
    let service = serve(faulty_catalog(), 1).await.unwrap();

    let totals = RunAggregate::new();
    let err = run_unit(service.base_url(), "sales", &totals, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Execution(_)));

    // The failing unit closed its own connection and statements on the way
    // out.
    assert_eq!(service.state().open_connections().await, 0);
    assert_eq!(service.state().open_statements().await, 0);

    // EMPS precedes BROKEN in descriptor order, so exactly one object
    // completed before the fault.
    let snapshot = totals.snapshot();
    assert_eq!(snapshot.tables_loaded, 1);
    assert_eq!(snapshot.rows_total, 5 + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn healthy_siblings_are_not_poisoned_by_a_failing_unit() {
    // Every unit hits the broken object, every unit terminates, and the
    // service ends each run with nothing left open.
    let service = serve(faulty_catalog(), 1).await.unwrap();

    for _ in 0..3 {
        run_against(&service, "sales", 6).await.unwrap_err();
        assert_eq!(service.state().open_connections().await, 0);
        assert_eq!(service.state().open_statements().await, 0);
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_fatal_to_the_run() {
    let totals = Arc::new(RunAggregate::new());
    // Nothing listens on port 9; connection establishment must fail.
    let run = StressRun::new("http://127.0.0.1:9", "sales").with_units(3);

    let err = run.execute(Arc::clone(&totals)).await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
    assert_eq!(totals.snapshot().rows_total, 0);
}
