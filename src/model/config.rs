use crate::model::Result;
use indexmap::IndexMap;
use serde_json::{from_str, Value};
use std::fs;

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub url: String,
    pub project: String,
    pub team_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jira: JiraConfig,
    pub prog_increment: String,
    pub sprint_prefix: String,
    pub iterations: Vec<String>,
    pub capacity: IndexMap<String, Vec<i64>>,
}

// Create
impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::parse(&json_str)
    }
}

// Parser
impl Config {
    fn parse(json_str: &str) -> Result<Self> {
        let root: Value = from_str(json_str)?;

        let jira = &root["jira"];
        let Some(url) = jira["url"].as_str() else {
            return Err("Not found 'jira.url' field".into());
        };
        let Some(project) = jira["project"].as_str() else {
            return Err("Not found 'jira.project' field".into());
        };
        let Some(team_name) = jira["teamName"].as_str() else {
            return Err("Not found 'jira.teamName' field".into());
        };
        let Some(prog_increment) = root["pi"].as_str() else {
            return Err("Not found 'pi' field".into());
        };
        let Some(sprint_prefix) = root["sprintPrefix"].as_str() else {
            return Err("Not found 'sprintPrefix' field".into());
        };
        let iterations = match root["iterations"].as_array() {
            Some(list) => list
                .iter()
                .filter_map(|iteration| iteration.as_str().map(String::from))
                .collect(),
            None => return Err("Not found 'iterations' field".into()),
        };

        let mut capacity = IndexMap::new();
        if let Some(map) = root["capacity"].as_object() {
            for (discipline, values) in map {
                let Some(values) = values.as_array() else {
                    return Err(format!("Capacity for '{discipline}' is not a list").into());
                };
                let values = values
                    .iter()
                    .filter_map(Value::as_i64)
                    .collect::<Vec<i64>>();
                capacity.insert(discipline.clone(), values);
            }
        }

        Ok(Self {
            jira: JiraConfig {
                url: url.to_string(),
                project: project.to_string(),
                team_name: team_name.to_string(),
            },
            prog_increment: prog_increment.to_string(),
            sprint_prefix: sprint_prefix.to_string(),
            iterations,
            capacity,
        })
    }
}
