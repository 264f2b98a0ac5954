use crate::analyze::calendar::business_duration;
use crate::model::{classify, is_development, is_terminal, Phase, Result, StatusClass};
use chrono::{DateTime, FixedOffset, Utc};

/// "Never happened" marker for the `started`/`updated`/`accepted` instants.
pub fn epoch() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// One status transition from the issue changelog.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub at: DateTime<FixedOffset>,
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
}

/// One change of the "Flagged" field from the issue changelog.
#[derive(Debug, Clone)]
pub struct FlagChange {
    pub at: DateTime<FixedOffset>,
    pub from: Option<String>,
    pub from_name: Option<String>,
}

/// Accumulated state after walking an issue's status history.
#[derive(Debug, Clone)]
pub struct StatusTimings {
    pub started: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub accepted: DateTime<FixedOffset>,
    pub dev_duration: f64,
    pub code_review: f64,
    pub qa_duration: f64,
    pub demo_duration: f64,
    pub on_hold_duration: f64,
    pub cycle_time: f64,
}

impl StatusTimings {
    fn new() -> Self {
        Self {
            started: epoch(),
            updated: epoch(),
            accepted: epoch(),
            dev_duration: 0.0,
            code_review: 0.0,
            qa_duration: 0.0,
            demo_duration: 0.0,
            on_hold_duration: 0.0,
            cycle_time: 0.0,
        }
    }

    /// Walks chronologically sorted status changes and accumulates the time
    /// spent in each tracked phase. A `from` status id missing from the
    /// lookup table is fatal: it means the workflow changed under us and
    /// every downstream total would be suspect.
    pub fn from_changes(key: &str, changes: &[StatusChange]) -> Result<Self> {
        let mut res = Self::new();

        for change in changes {
            let duration = business_duration(&res.updated, &change.at);

            if is_development(&change.to) {
                if res.started == epoch() {
                    res.started = change.at;
                } else {
                    // re-entering development after a hold
                    res.on_hold_duration += duration;
                }
            } else if is_terminal(&change.to) {
                res.accepted = change.at;
            }

            match classify(&change.from) {
                Some(StatusClass::Phase(phase)) => *res.bucket_mut(phase) += duration,
                Some(StatusClass::Ignored) => {}
                None => {
                    return Err(format!(
                        "Unhandled status change (From) for {key}: From: {} ({}) To: {} ({})",
                        change.from_name, change.from, change.to_name, change.to
                    )
                    .into())
                }
            }

            res.updated = change.at;
        }

        if res.started > epoch() {
            // in-flight issues count cycle time up to the last known event
            let reference = if res.accepted > epoch() {
                res.accepted
            } else {
                res.updated
            };
            res.cycle_time = business_duration(&res.started, &reference);
        }

        Ok(res)
    }

    fn bucket_mut(&mut self, phase: Phase) -> &mut f64 {
        match phase {
            Phase::Development => &mut self.dev_duration,
            Phase::CodeReview => &mut self.code_review,
            Phase::Qa => &mut self.qa_duration,
            Phase::Demo => &mut self.demo_duration,
        }
    }
}

/// Sums the business time of closed blocked intervals. A "became blocked"
/// change opens an interval, an unblock with a previously open interval
/// closes it; anything unmatched contributes nothing.
pub fn blocked_duration(changes: &[FlagChange]) -> f64 {
    let mut total = 0.0;
    let mut blocked_since: Option<DateTime<FixedOffset>> = None;

    for change in changes {
        let was_flagged = change.from.as_deref().is_some_and(|from| !from.is_empty());
        if !was_flagged {
            blocked_since = Some(change.at);
        } else if change.from_name.as_deref() == Some("Blocked") {
            if let Some(since) = blocked_since.take() {
                total += business_duration(&since, &change.at);
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn change(at: &str, from: &str, to: &str) -> StatusChange {
        StatusChange {
            at: ts(at),
            from: from.to_string(),
            from_name: format!("name-{from}"),
            to: to.to_string(),
            to_name: format!("name-{to}"),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_history_stays_at_defaults() {
        let timings = StatusTimings::from_changes("AO-1", &[]).unwrap();
        assert_eq!(timings.started, epoch());
        assert_close(timings.dev_duration, 0.0);
        assert_close(timings.cycle_time, 0.0);
    }

    #[test]
    fn development_to_accepted_accumulates_dev_and_cycle_time() {
        // Backlog -> In Development on Mon, In Development -> Accepted on
        // Thu: 3 business days of development, 3 days cycle time.
        let changes = [
            change("2024-01-08T00:00:00+00:00", "10561", "11966"),
            change("2024-01-11T00:00:00+00:00", "11966", "10011"),
        ];
        let timings = StatusTimings::from_changes("AO-1", &changes).unwrap();
        assert_eq!(timings.started, ts("2024-01-08T00:00:00+00:00"));
        assert_eq!(timings.accepted, ts("2024-01-11T00:00:00+00:00"));
        assert_close(timings.dev_duration, 3.0);
        assert_close(timings.cycle_time, 3.0);
        assert_close(timings.on_hold_duration, 0.0);
    }

    #[test]
    fn reentering_development_counts_as_on_hold() {
        let changes = [
            change("2024-01-08T00:00:00+00:00", "10561", "11966"),
            change("2024-01-09T00:00:00+00:00", "11966", "13762"),
            change("2024-01-10T00:00:00+00:00", "13762", "11966"),
        ];
        let timings = StatusTimings::from_changes("AO-1", &changes).unwrap();
        assert_close(timings.dev_duration, 1.0);
        assert_close(timings.on_hold_duration, 1.0);
    }

    #[test]
    fn in_flight_cycle_time_runs_to_last_event() {
        let changes = [
            change("2024-01-08T00:00:00+00:00", "10561", "11966"),
            change("2024-01-10T00:00:00+00:00", "11966", "12161"),
        ];
        let timings = StatusTimings::from_changes("AO-1", &changes).unwrap();
        assert_eq!(timings.accepted, epoch());
        assert_close(timings.cycle_time, 2.0);
    }

    #[test]
    fn phase_sum_never_exceeds_elapsed_time() {
        let changes = [
            change("2024-01-08T00:00:00+00:00", "10561", "11966"),
            change("2024-01-09T00:00:00+00:00", "11966", "12161"),
            change("2024-01-10T00:00:00+00:00", "12161", "10044"),
            change("2024-01-11T00:00:00+00:00", "10044", "11967"),
            change("2024-01-12T00:00:00+00:00", "11967", "10011"),
        ];
        let timings = StatusTimings::from_changes("AO-1", &changes).unwrap();
        let phase_sum = timings.dev_duration
            + timings.code_review
            + timings.qa_duration
            + timings.demo_duration;
        let elapsed = business_duration(&timings.started, &timings.updated);
        assert!(phase_sum <= elapsed + 1e-9);
    }

    #[test]
    fn unhandled_from_status_is_fatal_and_names_the_issue() {
        let changes = [change("2024-01-08T00:00:00+00:00", "99999", "11966")];
        let err = StatusTimings::from_changes("AO-42", &changes).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AO-42"));
        assert!(message.contains("99999"));
        assert!(message.contains("Unhandled status change"));
    }

    #[test]
    fn blocked_interval_is_summed() {
        let changes = [
            FlagChange {
                at: ts("2024-01-08T00:00:00+00:00"),
                from: None,
                from_name: None,
            },
            FlagChange {
                at: ts("2024-01-10T00:00:00+00:00"),
                from: Some("10000".to_string()),
                from_name: Some("Blocked".to_string()),
            },
        ];
        assert_close(blocked_duration(&changes), 2.0);
    }

    #[test]
    fn unmatched_open_interval_contributes_nothing() {
        let changes = [FlagChange {
            at: ts("2024-01-08T00:00:00+00:00"),
            from: None,
            from_name: None,
        }];
        assert_close(blocked_duration(&changes), 0.0);
    }

    #[test]
    fn unblock_without_open_interval_is_ignored() {
        let changes = [FlagChange {
            at: ts("2024-01-10T00:00:00+00:00"),
            from: Some("10000".to_string()),
            from_name: Some("Blocked".to_string()),
        }];
        assert_close(blocked_duration(&changes), 0.0);
    }
}
