mod client;
pub mod jql;

pub use client::{JiraClient, PageProgress};
