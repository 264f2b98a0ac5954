pub mod aggregate;
pub mod calendar;
pub mod normalize;
pub mod timings;

pub use aggregate::{Aggregator, EpicAggregate, EstimateAttribution, LoadOverview, MetricsStore};
pub use normalize::Normalizer;

use crate::model::{Config, Result};
use serde_json::Value;

/// Single entry point for the report driver: normalizes both query results
/// and folds them into a fresh `MetricsStore`. Deterministic for identical
/// inputs; the first uninterpretable issue aborts the whole report.
pub fn compute_metrics(epics: &[Value], issues: &[Value], config: &Config) -> Result<MetricsStore> {
    let normalizer = Normalizer::new(config)?;
    let mut store = MetricsStore::new();

    for epic in epics {
        store.insert_epic(normalizer.normalize(epic)?);
    }
    for issue in issues {
        store.insert_issue(normalizer.normalize(issue)?);
    }
    store.aggregate_load(&config.iterations);
    Ok(store)
}
