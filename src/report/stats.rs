use crate::model::{Discipline, IssueFact, Result};
use itertools::Itertools;
use std::fs;

// Cycle-time buckets (business days) and the story-point scale each bucket
// maps to. The last bucket whose lower bound fits the cycle time wins.
const CYCLE_TIME_BREAKS: [f64; 10] = [0.0, 0.5, 1.0, 1.5, 2.5, 4.0, 6.5, 10.0, 20.0, 50.0];
const ESTIMATE_SCALE: [i64; 10] = [1, 1, 2, 3, 5, 8, 13, 20, 40, 100];

const HEADER: [&str; 20] = [
    "key",
    "assignee",
    "type",
    "status",
    "iteration",
    "disciplines",
    "be_estimate",
    "fe_estimate",
    "qa_estimate",
    "sp_estimate",
    "dev_days",
    "review_days",
    "qa_days",
    "demo_days",
    "on_hold_days",
    "blocked_days",
    "cycle_time",
    "suggested_estimate",
    "warnings",
    "link",
];

pub trait StatsReport {
    fn stats_create(&self, path: &str) -> Result<()>;
}

impl StatsReport for [IssueFact] {
    fn stats_create(&self, path: &str) -> Result<()> {
        fs::write(path, render(self))?;
        Ok(())
    }
}

/// What a story's cycle time says its estimate should have been.
pub fn suggested_estimate(cycle_time: f64) -> i64 {
    let bucket = CYCLE_TIME_BREAKS
        .iter()
        .rposition(|lower| *lower <= cycle_time)
        .unwrap_or(0);
    ESTIMATE_SCALE[bucket]
}

fn render(facts: &[IssueFact]) -> String {
    let mut lines = vec![HEADER.join("\t")];
    for fact in facts {
        let durations = &fact.durations;
        lines.push(
            [
                fact.key.clone(),
                fact.assignee.clone(),
                fact.issue_type.clone(),
                fact.status.clone(),
                fact.iteration.label.clone(),
                fact.discipline.iter().map(Discipline::as_str).join(","),
                fmt_points(fact.estimates.be),
                fmt_points(fact.estimates.fe),
                fmt_points(fact.estimates.qa),
                fmt_points(fact.estimates.sp),
                fmt_days(durations.dev_duration),
                fmt_days(durations.code_review),
                fmt_days(durations.qa_duration),
                fmt_days(durations.demo_duration),
                fmt_days(durations.on_hold_duration),
                fmt_days(durations.blocked_duration),
                fmt_days(durations.cycle_time),
                suggested_estimate(durations.cycle_time).to_string(),
                fact.warnings.join(","),
                fact.link.clone(),
            ]
            .join("\t"),
        );
    }
    lines.join("\n") + "\n"
}

fn fmt_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

fn fmt_days(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Durations, Estimates, Iteration};

    fn fact(key: &str) -> IssueFact {
        IssueFact {
            key: key.to_string(),
            assignee: "Mary Murphy".to_string(),
            team_name: "Crewmates".to_string(),
            status: "Accepted".to_string(),
            issue_type: "Story".to_string(),
            summary: "Do the thing".to_string(),
            link: format!("https://jira.example.com/browse/{key}"),
            discipline: vec![Discipline::Server],
            estimates: Estimates {
                be: 0.0,
                fe: 0.0,
                qa: 0.0,
                sp: 5.0,
            },
            epic_key: "AO-100".to_string(),
            iteration: Iteration::new("AO-PI12-IT1", 12.1),
            resolved: true,
            durations: Durations {
                dev_duration: 2.0,
                cycle_time: 3.0,
                ..Durations::default()
            },
            warnings: vec![],
        }
    }

    #[test]
    fn estimate_scale_follows_cycle_time_buckets() {
        assert_eq!(suggested_estimate(0.0), 1);
        assert_eq!(suggested_estimate(0.4), 1);
        assert_eq!(suggested_estimate(0.5), 1);
        assert_eq!(suggested_estimate(1.0), 2);
        assert_eq!(suggested_estimate(2.4), 3);
        assert_eq!(suggested_estimate(2.5), 5);
        assert_eq!(suggested_estimate(4.0), 8);
        assert_eq!(suggested_estimate(50.0), 100);
        assert_eq!(suggested_estimate(365.0), 100);
    }

    #[test]
    fn renders_header_and_one_row_per_fact() {
        let rendered = render(&[fact("AO-1"), fact("AO-2")]);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split('\t').count(), HEADER.len());
        assert!(lines[1].starts_with("AO-1\t"));
        assert!(lines[2].starts_with("AO-2\t"));
    }

    #[test]
    fn row_carries_durations_and_suggested_estimate() {
        let rendered = render(&[fact("AO-1")]);
        let row = rendered.lines().nth(1).unwrap().split('\t').collect::<Vec<_>>();
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[9], "5"); // sp_estimate
        assert_eq!(row[10], "2.00"); // dev_days
        assert_eq!(row[16], "3.00"); // cycle_time
        assert_eq!(row[17], "5"); // suggested_estimate
        assert_eq!(row[19], "https://jira.example.com/browse/AO-1");
    }

    #[test]
    fn multi_discipline_and_warnings_join_with_commas() {
        let mut warned = fact("AO-3");
        warned.discipline = vec![Discipline::Server, Discipline::Web];
        warned.warnings = vec![
            "Issue has not been estimated".to_string(),
            "Issue not assigned to epic".to_string(),
        ];
        let rendered = render(&[warned]);
        let row = rendered.lines().nth(1).unwrap().split('\t').collect::<Vec<_>>();
        assert_eq!(row[5], "server,web");
        assert_eq!(
            row[18],
            "Issue has not been estimated,Issue not assigned to epic"
        );
    }
}
