mod config;
mod issue;
mod result;
mod status;

pub use config::{Config, JiraConfig};
pub use issue::{
    Discipline, Durations, Estimates, IssueFact, Iteration, UNASSIGNED_EPIC, UNSCHEDULED_NUM,
};
pub use result::Result;
pub use status::{classify, is_development, is_terminal, Phase, StatusClass};
