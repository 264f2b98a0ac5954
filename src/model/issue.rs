/// Numeric iteration key reserved for issues that are not scheduled in the
/// current PI. Sorts after every real `<pi>.<iteration>` key.
pub const UNSCHEDULED_NUM: f64 = 1000.0;

/// Epic-link sentinel for issues without a parent epic.
pub const UNASSIGNED_EPIC: &str = "unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    QaAutomation,
    PoPm,
    Server,
    Web,
    Na,
}

impl Discipline {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "qa/automation" => Some(Self::QaAutomation),
            "po/pm" => Some(Self::PoPm),
            "server" => Some(Self::Server),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QaAutomation => "qa/automation",
            Self::PoPm => "po/pm",
            Self::Server => "server",
            Self::Web => "web",
            Self::Na => "na",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Estimates {
    pub be: f64,
    pub fe: f64,
    pub qa: f64,
    pub sp: f64,
}

impl Estimates {
    /// Number of per-discipline sub-estimates that were actually entered.
    pub fn sub_estimate_count(&self) -> usize {
        [self.be, self.fe, self.qa]
            .iter()
            .filter(|estimate| **estimate > 0.0)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub label: String,
    pub num: f64,
}

impl Iteration {
    pub fn new(label: impl ToString, num: f64) -> Self {
        Self {
            label: label.to_string(),
            num,
        }
    }

    pub fn unscheduled() -> Self {
        Self::new("NA", UNSCHEDULED_NUM)
    }

    pub fn not_applicable() -> Self {
        Self::new("NA", 0.0)
    }

    pub fn is_unscheduled(&self) -> bool {
        self.num == UNSCHEDULED_NUM
    }
}

/// Accumulated business-day durations per lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Durations {
    pub dev_duration: f64,
    pub code_review: f64,
    pub qa_duration: f64,
    pub demo_duration: f64,
    pub on_hold_duration: f64,
    pub blocked_duration: f64,
    pub cycle_time: f64,
}

/// Canonical, flattened record for one tracker issue. Immutable once built
/// by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueFact {
    pub key: String,
    pub assignee: String,
    pub team_name: String,
    pub status: String,
    pub issue_type: String,
    pub summary: String,
    pub link: String,
    pub discipline: Vec<Discipline>,
    pub estimates: Estimates,
    pub epic_key: String,
    pub iteration: Iteration,
    pub resolved: bool,
    pub durations: Durations,
    pub warnings: Vec<String>,
}
