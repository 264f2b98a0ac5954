use crate::model::{Discipline, IssueFact};
use indexmap::{IndexMap, IndexSet};

/// Epic-level rollup: the epic's own fact (when it was fetched), the
/// iteration labels its children touch, and the children themselves keyed
/// by issue key. Re-inserting a key replaces the child.
#[derive(Debug, Clone, Default)]
pub struct EpicAggregate {
    pub fact: Option<IssueFact>,
    pub iters: IndexSet<String>,
    pub children: IndexMap<String, IssueFact>,
}

impl EpicAggregate {
    /// Latest iteration key any child is scheduled against; used to order
    /// epics in the report.
    pub fn latest_iteration(&self) -> f64 {
        self.children
            .values()
            .map(|child| child.iteration.num)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadOverview {
    pub completed: f64,
    pub remaining: f64,
    pub planned: f64,
    pub unplanned: f64,
    pub total: f64,
}

/// Aggregation state for one report run. Built empty, populated only by
/// folding issue facts, handed read-only to the report driver.
#[derive(Debug, Clone, Default)]
pub struct MetricsStore {
    pub epics: IndexMap<String, EpicAggregate>,
    pub load_by_discipline: IndexMap<Discipline, IndexMap<String, f64>>,
    pub velocity_by_discipline: IndexMap<Discipline, IndexMap<String, f64>>,
    pub load_by_assignee: IndexMap<String, IndexMap<String, f64>>,
    pub load_overview: IndexMap<Discipline, LoadOverview>,
    pub warnings: IndexMap<String, IssueFact>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_epic(&mut self, fact: IssueFact) {
        if !fact.warnings.is_empty() {
            self.warnings.insert(fact.key.clone(), fact.clone());
        }
        let key = fact.key.clone();
        self.epics.entry(key).or_default().fact = Some(fact);
    }

    pub fn insert_issue(&mut self, fact: IssueFact) {
        if !fact.warnings.is_empty() {
            self.warnings.insert(fact.key.clone(), fact.clone());
        }
        let epic = self.epics.entry(fact.epic_key.clone()).or_default();
        epic.iters.insert(fact.iteration.label.clone());
        epic.children.insert(fact.key.clone(), fact);
    }
}

/// How a child issue's effort is attributed to its discipline tags. Issues
/// carrying several tags enter separate sub-estimates per discipline;
/// single-discipline issues enter only the aggregate estimate, which is
/// attributed whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateAttribution {
    SplitBySubEstimate,
    WholeEstimate,
}

impl EstimateAttribution {
    pub fn select(fact: &IssueFact) -> Self {
        if fact.discipline.len() > 1 {
            Self::SplitBySubEstimate
        } else {
            Self::WholeEstimate
        }
    }

    pub fn estimate(&self, fact: &IssueFact, discipline: Discipline) -> f64 {
        match self {
            Self::WholeEstimate => fact.estimates.sp,
            Self::SplitBySubEstimate => match discipline {
                Discipline::Server => fact.estimates.be,
                Discipline::Web => fact.estimates.fe,
                Discipline::QaAutomation => fact.estimates.qa,
                _ => fact.estimates.sp,
            },
        }
    }
}

pub trait Aggregator {
    fn aggregate_load(&mut self, iterations: &[String]);
}

impl Aggregator for MetricsStore {
    fn aggregate_load(&mut self, iterations: &[String]) {
        let children = self
            .epics
            .values()
            .flat_map(|epic| epic.children.values())
            .cloned()
            .collect::<Vec<_>>();
        for fact in &children {
            self.fold_assignee(fact);
            self.fold_disciplines(fact, iterations);
        }
    }
}

trait AggregatorExtension {
    fn fold_assignee(&mut self, fact: &IssueFact);
    fn fold_disciplines(&mut self, fact: &IssueFact, iterations: &[String]);
}

impl AggregatorExtension for MetricsStore {
    fn fold_assignee(&mut self, fact: &IssueFact) {
        *self
            .load_by_assignee
            .entry(fact.assignee.clone())
            .or_default()
            .entry(fact.iteration.label.clone())
            .or_insert(0.0) += fact.estimates.sp;
    }

    fn fold_disciplines(&mut self, fact: &IssueFact, iterations: &[String]) {
        let done = is_done(&fact.status);
        let planned = iterations.contains(&fact.iteration.label);
        let attribution = EstimateAttribution::select(fact);

        for &discipline in &fact.discipline {
            let estimate = attribution.estimate(fact, discipline);

            *self
                .load_by_discipline
                .entry(discipline)
                .or_default()
                .entry(fact.iteration.label.clone())
                .or_insert(0.0) += estimate;

            let velocity = self
                .velocity_by_discipline
                .entry(discipline)
                .or_default()
                .entry(fact.iteration.label.clone())
                .or_insert(0.0);
            if done {
                *velocity += estimate;
            }

            let overview = self.load_overview.entry(discipline).or_default();
            overview.total += estimate;
            if done {
                overview.completed += estimate;
            } else {
                overview.remaining += estimate;
                if planned {
                    overview.planned += estimate;
                } else {
                    overview.unplanned += estimate;
                }
            }
        }
    }
}

pub fn is_done(status: &str) -> bool {
    matches!(
        status.to_lowercase().as_str(),
        "accepted" | "completed" | "done"
    )
}
