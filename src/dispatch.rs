//! Broadcast Dispatcher
//!
//! Fans one call out to every registered probe, in registry order, and
//! collects the results keyed by probe name. The first failure aborts the
//! broadcast; nothing gathered so far is returned.

use crate::error::{HawkeyeError, HawkeyeResult, ProbeError};
use crate::probe::Probe;
use crate::registry::ProbeRegistry;
use serde_json::{Map, Value};
use std::future::Future;
use tracing::trace;

/// Results of one broadcast, in registry order
pub type Broadcast<T> = Vec<(String, T)>;

/// Invoke `call` on every probe and collect the results
pub fn notify<'r, T, F>(registry: &'r ProbeRegistry, mut call: F) -> HawkeyeResult<Broadcast<T>>
where
    F: FnMut(&'r str, &'r dyn Probe) -> HawkeyeResult<T>,
{
    let mut results = Vec::with_capacity(registry.len());
    for (name, probe) in registry.all() {
        trace!("Notifying probe {}", name);
        let result = call(name, probe)?;
        results.push((name.to_string(), result));
    }
    Ok(results)
}

/// Like [`notify`], awaiting each probe before moving to the next
pub async fn notify_async<'r, T, F, Fut>(
    registry: &'r ProbeRegistry,
    mut call: F,
) -> HawkeyeResult<Broadcast<T>>
where
    F: FnMut(&'r str, &'r dyn Probe) -> Fut,
    Fut: Future<Output = HawkeyeResult<T>>,
{
    let mut results = Vec::with_capacity(registry.len());
    for (name, probe) in registry.all() {
        trace!("Notifying probe {}", name);
        let result = call(name, probe).await?;
        results.push((name.to_string(), result));
    }
    Ok(results)
}

/// Attribute a probe-local failure to the probe that raised it
pub fn attribute(probe: &str) -> impl FnOnce(ProbeError) -> HawkeyeError + '_ {
    move |source| HawkeyeError::Probe {
        probe: probe.to_string(),
        source,
    }
}

/// Keyed JSON object from broadcast results
pub fn into_map(results: Broadcast<Value>) -> Map<String, Value> {
    results.into_iter().collect()
}
