/// Workflow phases that accumulate business-day durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Development,
    CodeReview,
    Qa,
    Demo,
}

/// Classification of a workflow status id. Statuses the tracker workflow
/// knows about but that carry no duration bucket are `Ignored`; an id
/// missing from the table entirely means the workflow model is stale and
/// must fail the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Phase(Phase),
    Ignored,
}

// Story workflow:
// To Do, Backlog, Iteration Ready, In Development, In Code Review,
// In QA, In Acceptance, Accepted, Canceled
pub fn classify(status_id: &str) -> Option<StatusClass> {
    match status_id {
        "3" => Some(StatusClass::Phase(Phase::Development)), // In Progress (legacy)
        "11966" => Some(StatusClass::Phase(Phase::Development)), // In Development
        "12161" => Some(StatusClass::Phase(Phase::CodeReview)), // In Code Review
        "10044" => Some(StatusClass::Phase(Phase::Qa)),      // In QA
        "11967" => Some(StatusClass::Phase(Phase::Demo)),    // In Acceptance
        "10011" // Accepted
        | "10029" // Canceled
        | "10055" // To Do
        | "10561" // Backlog
        | "11963" // Awaiting Internal
        | "12661" // Iteration Ready
        | "12865" // Analysis Done
        | "13762" // Pending
        | "14361" // Analysis In Progress
        => Some(StatusClass::Ignored),
        _ => None,
    }
}

/// Statuses meaning active development has (re)started.
pub fn is_development(status_id: &str) -> bool {
    matches!(status_id, "3" | "11966")
}

/// Terminal acceptance statuses (Accepted, Done).
pub fn is_terminal(status_id: &str) -> bool {
    matches!(status_id, "10011" | "10053")
}
