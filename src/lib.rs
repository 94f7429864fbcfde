pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod notify;
pub mod report;

pub use audit::{AuditRunner, CheckOutcome, Finding, RunOutcome};
pub use catalog::{Check, CheckRepository, Exclusion, SqlCheckRepository};
pub use error::{AuditError, MalformedExclusionError, QueryError};
pub use executor::{QueryExecutor, ResultRow, SqliteQueryExecutor, NULL_SENTINEL};
pub use report::{assemble, AuditReport};
