use crate::model::Config;

/// All non-cancelled epics scheduled against the configured PI for the
/// configured team.
pub fn epics_in_pi(config: &Config) -> String {
    format!(
        "project = '{}' AND 'PI Number' ~ '{}' AND 'Team Name' = {} \
         AND issuetype = 'Epic' AND status != Canceled",
        config.jira.project, config.prog_increment, config.jira.team_name
    )
}

/// Children of the given epics, plus any team issue scheduled into one of
/// the configured iterations (they may lack an epic link and still count).
pub fn issues_for_epics(config: &Config, epic_keys: &[String]) -> String {
    let epic_links = epic_keys.join(",");
    let sprints = config.iterations.join(",");
    format!(
        "('Epic Link' in ({epic_links}) OR (Sprint in ({sprints}) \
         AND 'Team Name' = {} AND issuetype not in ('Epic', 'Sub-task'))) \
         AND status != Canceled",
        config.jira.team_name
    )
}

/// Resolved stories and defects for the team in the configured iterations,
/// most recently resolved first.
pub fn resolved_in_iterations(config: &Config) -> String {
    format!(
        "'Team Name' = {} AND issuetype in (Story, Defect) \
         AND resolved is not EMPTY AND status != Canceled \
         AND Sprint in ({}) ORDER BY resolved DESC",
        config.jira.team_name,
        config.iterations.join(",")
    )
}
