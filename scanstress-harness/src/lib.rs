//! Concurrency-stress harness for an HTTP tabular-query service.
//!
//! The harness dispatches a fixed number of independent scan units against
//! one endpoint. Each unit opens its own logical connection, enumerates the
//! queryable objects through a wildcard metadata request, fully scans every
//! object whose schema matches the configured target (case-insensitive), and
//! feeds per-row and per-object counts into a shared set of atomic counters.
//! The orchestrator waits for every unit to terminate before deciding the
//! run verdict, so a failing unit never leaks in-flight connections by
//! aborting its siblings.

pub mod aggregate;
pub mod client;
pub mod driver;
pub mod orchestrator;

pub use aggregate::{RunAggregate, RunTotals};
pub use client::{Connection, Cursor, ProtocolClient, Statement};
pub use driver::{UnitReport, run_unit};
pub use orchestrator::{DEFAULT_UNITS, StressRun};

pub use scanstress_model::ClientError;
