//! Hawkeye - database change observer
//!
//! Capture named snapshots of a database through pluggable probes, diff any
//! two of them and render a human-readable report of what changed.
//!
//! - Probes: row counts, data checksums and table structure are bundled;
//!   anything implementing [`Probe`] can be registered
//! - Snapshots: kept in memory, in capture order, addressable by name
//! - Logging: a level-filtered event log printed alongside `tracing`

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod logger;
pub mod probe;
pub mod probes;
pub mod registry;
pub mod snapshot;
pub mod source;

pub use config::{ProbeConfig, Settings};
pub use db::{Database, PgDatabase, Row};
pub use error::{HawkeyeError, HawkeyeResult, ProbeError};
pub use host::{Hawkeye, HawkeyeBuilder};
pub use logger::{EventLog, LogLevel, LogRecord};
pub use probe::Probe;
pub use snapshot::{Diff, Snapshot};
pub use source::{CatalogProbeSource, ProbeSource, StaticProbeSource};
