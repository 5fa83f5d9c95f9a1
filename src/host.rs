//! Host Facade
//!
//! [`Hawkeye`] owns the probe registry, the snapshot store and the event log,
//! and orchestrates capture, comparison and rendering across every probe.
//! Each call either completes fully or fails without touching stored state.

use crate::config::ProbeConfig;
use crate::db::Database;
use crate::dispatch::{attribute, into_map, notify, notify_async};
use crate::error::{assert, HawkeyeError, HawkeyeResult};
use crate::logger::{EventLog, LogLevel, LogRecord};
use crate::probe::Probe;
use crate::registry::ProbeRegistry;
use crate::snapshot::{Diff, Snapshot, SnapshotStore};
use crate::source::{CatalogProbeSource, ProbeSource};
use chrono::Local;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for [`Hawkeye`]
pub struct HawkeyeBuilder {
    db: Arc<dyn Database>,
    config: ProbeConfig,
    log_level: LogLevel,
    log_writer: Option<Box<dyn Write + Send>>,
    sources: Vec<Box<dyn ProbeSource>>,
}

impl HawkeyeBuilder {
    pub fn config(mut self, config: ProbeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Where printed log records go (stdout by default)
    pub fn log_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.log_writer = Some(writer);
        self
    }

    /// Append a probe source to the source stack
    pub fn source(mut self, source: impl ProbeSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Replace the whole source stack
    pub fn sources(mut self, sources: Vec<Box<dyn ProbeSource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Resolve the table list, then discover, instantiate and register probes
    pub async fn build(self) -> HawkeyeResult<Hawkeye> {
        let log = match self.log_writer {
            Some(writer) => EventLog::with_writer(self.log_level, writer),
            None => EventLog::new(self.log_level),
        };

        let mut host = Hawkeye {
            db: self.db,
            config: ProbeConfig::default(),
            registry: ProbeRegistry::new(),
            snapshots: SnapshotStore::new(),
            log,
            last_tick: 0,
        };

        host.set_options(self.config).await?;

        let sources: Vec<&dyn ProbeSource> = self.sources.iter().map(|s| s.as_ref()).collect();
        host.load_probes(&sources)?;

        info!(
            "Hawkeye ready: {} probes, {} tables",
            host.registry.len(),
            host.config.tables.len()
        );
        Ok(host)
    }
}

/// Snapshot-and-diff host for one database
pub struct Hawkeye {
    db: Arc<dyn Database>,
    config: ProbeConfig,
    registry: ProbeRegistry,
    snapshots: SnapshotStore,
    log: EventLog,
    /// Last tick handed out for a generated snapshot name, in microseconds
    last_tick: i64,
}

impl Hawkeye {
    /// Builder with no probe sources and the default log threshold
    pub fn builder(db: Arc<dyn Database>) -> HawkeyeBuilder {
        HawkeyeBuilder {
            db,
            config: ProbeConfig::default(),
            log_level: LogLevel::default(),
            log_writer: None,
            sources: Vec::new(),
        }
    }

    /// Host with every bundled probe registered
    pub async fn new(db: Arc<dyn Database>, config: ProbeConfig) -> HawkeyeResult<Self> {
        Self::builder(db)
            .config(config)
            .source(CatalogProbeSource::all())
            .build()
            .await
    }


    pub fn options(&self) -> &ProbeConfig {
        &self.config
    }

    /// Replace the probe options, resolving the table list if it is empty
    pub async fn set_options(&mut self, config: ProbeConfig) -> HawkeyeResult<()> {
        self.config = config;
        self.ensure_tables().await
    }

    async fn ensure_tables(&mut self) -> HawkeyeResult<()> {
        if !self.config.needs_tables() {
            return Ok(());
        }
        let tables = self.db.list_tables().await?;
        debug!("Resolved {} tables from the database", tables.len());
        self.log(
            format!("No tables configured, using all {} tables", tables.len()),
            Some(LogLevel::Debug),
            None,
        );
        self.config.tables = tables;
        Ok(())
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }


    /// Register a probe under `name`, or under its own name when omitted
    pub fn add_probe(&mut self, probe: Box<dyn Probe>, name: Option<&str>) -> HawkeyeResult<String> {
        let name = self.registry.add(probe, name, &self.config)?;
        self.log(format!("Probe {} registered", name), Some(LogLevel::Debug), None);
        Ok(name)
    }

    /// Unregister a probe; no teardown hook is called
    pub fn remove_probe(&mut self, name: &str) -> Option<Box<dyn Probe>> {
        let removed = self.registry.remove(name);
        if removed.is_some() {
            self.log(format!("Probe {} removed", name), Some(LogLevel::Debug), None);
        }
        removed
    }

    pub fn probe_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Discover every source, instantiate every candidate, then register
    ///
    /// Nothing is registered unless all candidates load.
    pub fn load_probes(&mut self, sources: &[&dyn ProbeSource]) -> HawkeyeResult<Vec<String>> {
        let mut candidates = Vec::new();
        for source in sources {
            candidates.extend(source.discover()?);
        }

        let mut loaded = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let probe = candidate.instantiate(self)?;
            let name = if candidate.name.is_empty() {
                probe.name()
            } else {
                candidate.name.clone()
            };
            assert(!name.is_empty(), Some("Probe name must not be empty"))?;
            loaded.push((name, probe));
        }

        let mut names = Vec::with_capacity(loaded.len());
        for (name, probe) in loaded {
            names.push(self.add_probe(probe, Some(&name))?);
        }
        debug!("Loaded probes: {:?}", names);
        Ok(names)
    }


    /// Capture every probe and store the result under `name`
    ///
    /// Without a name one is generated from the current time.
    pub async fn capture_snapshot(&mut self, name: Option<&str>) -> HawkeyeResult<Snapshot> {
        self.ensure_tables().await?;

        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.default_name(),
        };

        let db = self.db.as_ref();
        let config = &self.config;
        let results = notify_async(&self.registry, move |probe_name, probe| async move {
            probe.capture(db, config).await.map_err(attribute(probe_name))
        })
        .await?;

        let snapshot = Snapshot::new(name, into_map(results));
        self.snapshots.save(snapshot.clone());
        self.log(
            format!("Captured snapshot {} ({} probes)", snapshot.name, snapshot.payload.len()),
            Some(LogLevel::Info),
            None,
        );
        Ok(snapshot)
    }

    pub fn get_snapshot(&self, name: &str) -> HawkeyeResult<&Snapshot> {
        self.snapshots
            .get(name)
            .ok_or_else(|| HawkeyeError::SnapshotNotFound(name.to_string()))
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        self.snapshots.names()
    }

    /// Drop every stored snapshot
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.log("Snapshots cleared", Some(LogLevel::Debug), None);
    }

    /// `YYMMDD_<unix seconds>.<micros>`, strictly increasing per host
    fn default_name(&mut self) -> String {
        let now = Local::now();
        let tick = now.timestamp_micros().max(self.last_tick + 1);
        self.last_tick = tick;
        format!(
            "{}{}.{:06}",
            now.format("%y%m%d_"),
            tick / 1_000_000,
            tick % 1_000_000
        )
    }


    /// Compare two snapshots probe by probe
    ///
    /// Unless both are given, the last two stored snapshots are used, the
    /// more recent one as `after`.
    pub fn diff(&self, before: Option<&Snapshot>, after: Option<&Snapshot>) -> HawkeyeResult<Diff> {
        let (before, after) = match (before, after) {
            (Some(before), Some(after)) => (before, after),
            _ => {
                let last = self.snapshots.last_n(2)?;
                (last[1], last[0])
            }
        };
        debug!("Diffing {} -> {}", before.name, after.name);

        let results = notify(&self.registry, |name, probe| {
            let old = before.get(name).ok_or_else(|| missing_payload(name, &before.name))?;
            let new = after.get(name).ok_or_else(|| missing_payload(name, &after.name))?;
            probe.compare(old, new).map_err(attribute(name))
        })?;

        Ok(Diff {
            before: before.name.clone(),
            after: after.name.clone(),
            results: into_map(results),
        })
    }

    /// Diff two stored snapshots by name
    pub fn diff_named(&self, before: &str, after: &str) -> HawkeyeResult<Diff> {
        let before = self.get_snapshot(before)?;
        let after = self.get_snapshot(after)?;
        self.diff(Some(before), Some(after))
    }

    /// Render a diff (the last two snapshots' when omitted) as a text report
    ///
    /// Fragments are separated by one blank line and empty fragments are
    /// skipped; the report ends with a single newline.
    pub fn render_diff(&self, diff: Option<&Diff>) -> HawkeyeResult<String> {
        let computed;
        let diff = match diff {
            Some(diff) => diff,
            None => {
                computed = self.diff(None, None)?;
                &computed
            }
        };

        let fragments = notify(&self.registry, |name, probe| {
            let fragment = diff.get(name).ok_or_else(|| missing_payload(name, &diff.label()))?;
            probe.render(fragment).map_err(attribute(name))
        })?;

        let body: Vec<&str> = fragments
            .iter()
            .map(|(_, fragment)| fragment.trim_end_matches(['\r', '\n']))
            .filter(|fragment| !fragment.is_empty())
            .collect();
        Ok(format!("{}\n", body.join("\n\n")))
    }


    /// Record an operational event; `level` defaults to INFO
    pub fn log(&self, message: impl Into<String>, level: Option<LogLevel>, probe: Option<&str>) {
        self.log.log(message, level, probe);
    }

    /// Handle to this host's event log, for probes
    pub fn log_handle(&self) -> EventLog {
        self.log.clone()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.log.records()
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.log.set_threshold(level);
    }
}

fn missing_payload(probe: &str, subject: &str) -> HawkeyeError {
    HawkeyeError::MissingPayload {
        probe: probe.to_string(),
        subject: subject.to_string(),
    }
}

/// Report of the last two snapshots, or the reason there is none
impl fmt::Display for Hawkeye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_diff(None) {
            Ok(report) => f.write_str(&report),
            Err(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Debug for Hawkeye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hawkeye")
            .field("config", &self.config)
            .field("probes", &self.registry.names())
            .field("snapshots", &self.snapshots.names())
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}
