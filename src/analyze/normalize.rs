use crate::analyze::timings::{blocked_duration, FlagChange, StatusChange, StatusTimings};
use crate::model::{
    Config, Discipline, Durations, Estimates, IssueFact, Iteration, Result, UNASSIGNED_EPIC,
    UNSCHEDULED_NUM,
};
use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

// Tracker custom fields, from the workflow this tool reports on.
const FIELD_BE_ESTIMATE: &str = "customfield_20501";
const FIELD_FE_ESTIMATE: &str = "customfield_20500";
const FIELD_QA_ESTIMATE: &str = "customfield_20502";
const FIELD_SP_ESTIMATE: &str = "customfield_10501";
const FIELD_EPIC_LINK: &str = "customfield_11000";
const FIELD_TEAM_NAME: &str = "customfield_15500";
const FIELD_SPRINTS: &str = "customfield_10007";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

const COMPLETION_STATUSES: [&str; 4] = ["accepted", "complete", "completed", "done"];

/// Maps raw tracker records to `IssueFact`s. Pure per record: normalizing
/// the same record twice yields identical facts.
pub struct Normalizer {
    team_name: String,
    jira_url: String,
    iteration_re: Regex,
    backlog_re: Regex,
}

impl Normalizer {
    pub fn new(config: &Config) -> Result<Self> {
        let prefix = &config.sprint_prefix;
        Ok(Self {
            team_name: config.jira.team_name.clone(),
            jira_url: config.jira.url.clone(),
            iteration_re: Regex::new(&format!(r"{prefix}-(PI|IP)(\d+)-IT(\d+)"))?,
            backlog_re: Regex::new(&format!(r"{prefix}-PI(\d+)-Backlog"))?,
        })
    }

    pub fn normalize(&self, issue: &Value) -> Result<IssueFact> {
        let Some(key) = issue["key"].as_str() else {
            return Err("Not found 'key' field in issue".into());
        };
        let fields = &issue["fields"];

        let estimates = Estimates {
            be: fields[FIELD_BE_ESTIMATE].as_f64().unwrap_or(0.0),
            fe: fields[FIELD_FE_ESTIMATE].as_f64().unwrap_or(0.0),
            qa: fields[FIELD_QA_ESTIMATE].as_f64().unwrap_or(0.0),
            sp: fields[FIELD_SP_ESTIMATE].as_f64().unwrap_or(0.0),
        };
        let status = fields
            .pointer("/status/name")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string();
        let resolution = fields
            .pointer("/resolution/name")
            .and_then(Value::as_str)
            .unwrap_or("Unresolved");
        let resolved = COMPLETION_STATUSES.contains(&status.to_lowercase().as_str())
            || resolution.to_lowercase() != "unresolved";

        let sprint_text = fields[FIELD_SPRINTS]
            .as_array()
            .and_then(|sprints| sprints.last())
            .and_then(Value::as_str);
        let iteration = self.parse_iteration(key, sprint_text, resolved);

        let durations = match issue.pointer("/changelog/histories").and_then(Value::as_array) {
            Some(histories) => durations_from_changelog(key, histories)?,
            None => Durations::default(),
        };

        let mut fact = IssueFact {
            key: key.to_string(),
            assignee: fields
                .pointer("/assignee/displayName")
                .and_then(Value::as_str)
                .unwrap_or("NA")
                .to_string(),
            team_name: fields
                .pointer(&format!("/{FIELD_TEAM_NAME}/value"))
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string(),
            status,
            issue_type: fields
                .pointer("/issuetype/name")
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string(),
            summary: fields["summary"].as_str().unwrap_or("N/A").to_string(),
            link: format!("{}/browse/{}", self.jira_url, key),
            discipline: discipline_from_labels(&fields["labels"]),
            estimates,
            epic_key: fields[FIELD_EPIC_LINK]
                .as_str()
                .unwrap_or(UNASSIGNED_EPIC)
                .to_string(),
            iteration,
            resolved,
            durations,
            warnings: vec![],
        };
        fact.warnings = self.check_for_warnings(&fact);
        Ok(fact)
    }

    /// Extracts the most recent iteration marker. Unmatched text is only a
    /// diagnostic: the issue is treated as unscheduled and processing
    /// continues.
    fn parse_iteration(&self, key: &str, text: Option<&str>, resolved: bool) -> Iteration {
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            if let Some(caps) = self.iteration_re.captures(text) {
                let num = format!("{}.{}", &caps[2], &caps[3]).parse::<f64>().ok();
                if let Some(num) = num {
                    return Iteration::new(&caps[0], num);
                }
            }
            if let Some(caps) = self.backlog_re.captures(text) {
                return Iteration::new(&caps[0], UNSCHEDULED_NUM);
            }
            warn!("{key}: no valid iteration was found: {text}");
        }
        if resolved {
            Iteration::not_applicable()
        } else {
            Iteration::unscheduled()
        }
    }

    /// Data-quality checks. Every check is evaluated so one issue can carry
    /// several warnings at once. Resolved issues, epics and pure po/pm
    /// items are exempt.
    fn check_for_warnings(&self, fact: &IssueFact) -> Vec<String> {
        if fact.resolved
            || fact.issue_type == "Epic"
            || (fact.discipline.len() == 1 && fact.discipline[0] == Discipline::PoPm)
        {
            return vec![];
        }

        let discipline_count = fact.discipline.len();
        let estimate_count = fact.estimates.sub_estimate_count();
        let mut warnings = vec![];

        if fact.iteration.is_unscheduled() {
            warnings.push("Issue not scheduled in current PI".to_string());
        }
        if fact.team_name != self.team_name {
            warnings.push(format!(
                "Team Name ({}) does not match the config ({})",
                fact.team_name, self.team_name
            ));
        }
        if fact.epic_key == UNASSIGNED_EPIC {
            warnings.push("Issue not assigned to epic".to_string());
        }
        if fact.discipline[0] == Discipline::Na {
            warnings.push("Issue is missing labels".to_string());
        }
        if fact.estimates.sp == 0.0 {
            warnings.push("Issue has not been estimated".to_string());
        }
        if discipline_count > 1 && estimate_count != discipline_count {
            warnings.push("Issue is missing discipline estimate".to_string());
        }
        if discipline_count == 1 && estimate_count > 1 {
            warnings.push("Issue has more estimates than disciplines".to_string());
        }
        warnings
    }
}

fn discipline_from_labels(labels: &Value) -> Vec<Discipline> {
    let matches = labels
        .as_array()
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Discipline::from_label)
                .unique()
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if matches.is_empty() {
        vec![Discipline::Na]
    } else {
        matches
    }
}

fn durations_from_changelog(key: &str, histories: &[Value]) -> Result<Durations> {
    let mut durations = Durations::default();

    let status_changes = status_changes(histories)?;
    if !status_changes.is_empty() {
        let timings = StatusTimings::from_changes(key, &status_changes)?;
        durations.dev_duration = timings.dev_duration;
        durations.code_review = timings.code_review;
        durations.qa_duration = timings.qa_duration;
        durations.demo_duration = timings.demo_duration;
        durations.on_hold_duration = timings.on_hold_duration;
        durations.cycle_time = timings.cycle_time;
    }
    durations.blocked_duration = blocked_duration(&flag_changes(histories)?);
    Ok(durations)
}

fn status_changes(histories: &[Value]) -> Result<Vec<StatusChange>> {
    let mut changes = vec![];
    for history in histories {
        let Some(item) = history_item(history, "status") else {
            continue;
        };
        changes.push(StatusChange {
            at: history_timestamp(history)?,
            from: item["from"].as_str().unwrap_or("").to_string(),
            from_name: item["fromString"].as_str().unwrap_or("").to_string(),
            to: item["to"].as_str().unwrap_or("").to_string(),
            to_name: item["toString"].as_str().unwrap_or("").to_string(),
        });
    }
    changes.sort_by_key(|change| change.at);
    Ok(changes)
}

fn flag_changes(histories: &[Value]) -> Result<Vec<FlagChange>> {
    let mut changes = vec![];
    for history in histories {
        let Some(item) = history_item(history, "Flagged") else {
            continue;
        };
        changes.push(FlagChange {
            at: history_timestamp(history)?,
            from: item["from"].as_str().map(String::from),
            from_name: item["fromString"].as_str().map(String::from),
        });
    }
    changes.sort_by_key(|change| change.at);
    Ok(changes)
}

fn history_item<'a>(history: &'a Value, field: &str) -> Option<&'a Value> {
    history["items"]
        .as_array()?
        .iter()
        .find(|item| item["field"].as_str() == Some(field))
}

fn history_timestamp(history: &Value) -> Result<DateTime<FixedOffset>> {
    let Some(created) = history["created"].as_str() else {
        return Err("Not found 'created' field in changelog history".into());
    };
    Ok(DateTime::parse_from_str(created, TIMESTAMP_FORMAT)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JiraConfig;
    use indexmap::IndexMap;
    use serde_json::json;

    fn config() -> Config {
        Config {
            jira: JiraConfig {
                url: "https://jira.example.com".to_string(),
                project: "TPRT".to_string(),
                team_name: "Crewmates".to_string(),
            },
            prog_increment: "PI12".to_string(),
            sprint_prefix: "AO".to_string(),
            iterations: vec![
                "AO-PI12-IT1".to_string(),
                "AO-PI12-IT2".to_string(),
                "AO-PI12-IT3".to_string(),
            ],
            capacity: IndexMap::new(),
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(&config()).unwrap()
    }

    fn story(key: &str) -> Value {
        json!({
            "key": key,
            "fields": {
                "assignee": {"displayName": "Mary Murphy"},
                "issuetype": {"name": "Story"},
                "status": {"name": "In Development"},
                "summary": "Do the thing",
                "labels": ["server"],
                "customfield_10501": 5.0,
                "customfield_11000": "AO-100",
                "customfield_15500": {"value": "Crewmates"},
                "customfield_10007": ["AO-PI12-IT2"]
            }
        })
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn missing_optional_fields_get_typed_defaults() {
        let fact = normalizer()
            .normalize(&json!({"key": "AO-1", "fields": {}}))
            .unwrap();
        assert_eq!(fact.assignee, "NA");
        assert_eq!(fact.team_name, "N/A");
        assert_eq!(fact.summary, "N/A");
        assert_eq!(fact.epic_key, UNASSIGNED_EPIC);
        assert_eq!(fact.discipline, vec![Discipline::Na]);
        assert_close(fact.estimates.sp, 0.0);
        assert!(!fact.resolved);
        assert!(fact.iteration.is_unscheduled());
        assert_eq!(fact.durations, Durations::default());
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = story("AO-7");
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(&raw).unwrap(),
            normalizer.normalize(&raw).unwrap()
        );
    }

    #[test]
    fn discipline_matching_is_case_insensitive_and_falls_back_to_na() {
        let mut raw = story("AO-1");
        raw["fields"]["labels"] = json!(["Server", "WEB", "triage"]);
        let fact = normalizer().normalize(&raw).unwrap();
        assert_eq!(fact.discipline, vec![Discipline::Server, Discipline::Web]);

        raw["fields"]["labels"] = json!(["triage"]);
        let fact = normalizer().normalize(&raw).unwrap();
        assert_eq!(fact.discipline, vec![Discipline::Na]);
    }

    #[test]
    fn iteration_marker_parses_to_sortable_key() {
        let fact = normalizer().normalize(&story("AO-1")).unwrap();
        assert_eq!(fact.iteration.label, "AO-PI12-IT2");
        assert_close(fact.iteration.num, 12.2);
    }

    #[test]
    fn backlog_marker_is_unscheduled() {
        let mut raw = story("AO-1");
        raw["fields"]["customfield_10007"] = json!(["AO-PI12-Backlog"]);
        let fact = normalizer().normalize(&raw).unwrap();
        assert_eq!(fact.iteration.label, "AO-PI12-Backlog");
        assert!(fact.iteration.is_unscheduled());
    }

    #[test]
    fn garbage_iteration_text_is_unscheduled_unless_resolved() {
        let mut raw = story("AO-1");
        raw["fields"]["customfield_10007"] = json!(["Sprint 9000"]);
        let fact = normalizer().normalize(&raw).unwrap();
        assert_eq!(fact.iteration.label, "NA");
        assert!(fact.iteration.is_unscheduled());

        raw["fields"]["resolution"] = json!({"name": "Fixed"});
        let fact = normalizer().normalize(&raw).unwrap();
        assert!(fact.resolved);
        assert_close(fact.iteration.num, 0.0);
    }

    #[test]
    fn resolved_by_status_or_resolution() {
        let mut raw = story("AO-1");
        raw["fields"]["status"] = json!({"name": "Accepted"});
        assert!(normalizer().normalize(&raw).unwrap().resolved);

        let mut raw = story("AO-1");
        raw["fields"]["resolution"] = json!({"name": "Unresolved"});
        assert!(!normalizer().normalize(&raw).unwrap().resolved);
    }

    #[test]
    fn no_changelog_leaves_all_durations_zero() {
        let fact = normalizer().normalize(&story("AO-1")).unwrap();
        assert_eq!(fact.durations, Durations::default());
        assert_close(fact.durations.cycle_time, 0.0);
    }

    #[test]
    fn changelog_durations_are_interpreted() {
        let mut raw = story("AO-1");
        raw["changelog"] = json!({"histories": [
            {
                "created": "2024-01-11T00:00:00.000+0000",
                "items": [{"field": "status", "from": "11966", "fromString": "In Development",
                           "to": "10011", "toString": "Accepted"}]
            },
            {
                "created": "2024-01-08T00:00:00.000+0000",
                "items": [{"field": "status", "from": "10561", "fromString": "Backlog",
                           "to": "11966", "toString": "In Development"}]
            }
        ]});
        let fact = normalizer().normalize(&raw).unwrap();
        assert_close(fact.durations.dev_duration, 3.0);
        assert_close(fact.durations.cycle_time, 3.0);
    }

    #[test]
    fn blocked_time_from_flagged_history() {
        let mut raw = story("AO-1");
        raw["changelog"] = json!({"histories": [
            {
                "created": "2024-01-08T00:00:00.000+0000",
                "items": [{"field": "Flagged", "from": null, "fromString": null,
                           "to": "10000", "toString": "Blocked"}]
            },
            {
                "created": "2024-01-10T00:00:00.000+0000",
                "items": [{"field": "Flagged", "from": "10000", "fromString": "Blocked",
                           "to": null, "toString": null}]
            }
        ]});
        let fact = normalizer().normalize(&raw).unwrap();
        assert_close(fact.durations.blocked_duration, 2.0);
    }

    #[test]
    fn unhandled_status_change_aborts_naming_the_issue() {
        let mut raw = story("AO-13");
        raw["changelog"] = json!({"histories": [
            {
                "created": "2024-01-08T00:00:00.000+0000",
                "items": [{"field": "status", "from": "55555", "fromString": "Mystery",
                           "to": "11966", "toString": "In Development"}]
            }
        ]});
        let err = normalizer().normalize(&raw).unwrap_err();
        assert!(err.to_string().contains("AO-13"));
        assert!(err.to_string().contains("55555"));
    }

    #[test]
    fn resolved_epics_and_po_pm_issues_skip_warning_checks() {
        let mut raw = story("AO-1");
        raw["fields"]["resolution"] = json!({"name": "Fixed"});
        assert!(normalizer().normalize(&raw).unwrap().warnings.is_empty());

        let mut raw = story("AO-1");
        raw["fields"]["issuetype"] = json!({"name": "Epic"});
        raw["fields"]["customfield_10501"] = json!(0);
        assert!(normalizer().normalize(&raw).unwrap().warnings.is_empty());

        let mut raw = story("AO-1");
        raw["fields"]["labels"] = json!(["po/pm"]);
        raw["fields"]["customfield_10501"] = json!(0);
        assert!(normalizer().normalize(&raw).unwrap().warnings.is_empty());
    }

    #[test]
    fn two_disciplines_with_one_estimate_warns_missing_discipline_estimate() {
        let mut raw = story("AO-1");
        raw["fields"]["labels"] = json!(["server", "web"]);
        raw["fields"]["customfield_20501"] = json!(3.0);
        let fact = normalizer().normalize(&raw).unwrap();
        assert!(fact
            .warnings
            .contains(&"Issue is missing discipline estimate".to_string()));
    }

    #[test]
    fn one_discipline_with_two_estimates_warns_more_estimates() {
        let mut raw = story("AO-1");
        raw["fields"]["customfield_20501"] = json!(3.0);
        raw["fields"]["customfield_20500"] = json!(2.0);
        let fact = normalizer().normalize(&raw).unwrap();
        assert!(fact
            .warnings
            .contains(&"Issue has more estimates than disciplines".to_string()));
    }

    #[test]
    fn warning_checks_are_not_short_circuited() {
        let raw = json!({
            "key": "AO-9",
            "fields": {
                "issuetype": {"name": "Story"},
                "status": {"name": "Backlog"},
                "customfield_15500": {"value": "Others"}
            }
        });
        let warnings = normalizer().normalize(&raw).unwrap().warnings;
        assert!(warnings.len() >= 4);
        assert!(warnings.contains(&"Issue not scheduled in current PI".to_string()));
        assert!(warnings.contains(&"Issue not assigned to epic".to_string()));
        assert!(warnings.contains(&"Issue is missing labels".to_string()));
        assert!(warnings.contains(&"Issue has not been estimated".to_string()));
    }
}
