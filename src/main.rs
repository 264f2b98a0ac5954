mod analyze;
mod jira;
mod model;
mod report;
mod utils;

use crate::analyze::{compute_metrics, Normalizer};
use crate::jira::{jql, JiraClient};
use crate::model::{Config, Result};
use crate::report::markdown::MarkdownReport;
use crate::report::stats::StatsReport;
use crate::utils::{MultiProgressNew, ProgressStyleTemplate};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
struct Args {
    #[arg(long = "config", default_value = "config.json")]
    config_path: String,
    #[arg(long = "jira_user")]
    jira_user: String,
    #[arg(long = "jira_token")]
    jira_token: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Iteration workload and PI feature roadmap
    Overview {
        #[arg(long = "output", default_value = "pi-overview.md")]
        output_path: String,
        #[arg(short = 'a', long = "assignee")]
        show_assignee: bool,
        #[arg(short = 'w', long = "warnings")]
        show_warnings: bool,
    },
    /// Cycle-time statistics for resolved stories
    Stats {
        #[arg(long = "output", default_value = "story-stats.tsv")]
        output_path: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(&args).await.unwrap()
}

async fn run(args: &Args) -> Result<()> {
    let config = Config::from_file(&args.config_path)?;

    let client = JiraClient::new(&config.jira.url, &args.jira_user, &args.jira_token);
    client.myself().await?;

    match &args.command {
        Command::Overview {
            output_path,
            show_assignee,
            show_warnings,
        } => run_overview(&client, &config, output_path, *show_assignee, *show_warnings).await,
        Command::Stats { output_path } => run_stats(&client, &config, output_path).await,
    }
}

async fn run_overview(
    client: &JiraClient,
    config: &Config,
    output_path: &str,
    show_assignee: bool,
    show_warnings: bool,
) -> Result<()> {
    let epics = fetch_issues(
        client,
        &jql::epics_in_pi(config),
        None,
        "Retrieving features",
    )
    .await?;
    let epic_keys = epics
        .iter()
        .filter_map(|epic| epic["key"].as_str().map(String::from))
        .collect::<Vec<_>>();

    let issues = fetch_issues(
        client,
        &jql::issues_for_epics(config, &epic_keys),
        Some("changelog"),
        "Retrieving issues",
    )
    .await?;

    let metrics = compute_metrics(&epics, &issues, config)?;
    if !metrics.warnings.is_empty() {
        tracing::info!(
            "{} issues carry data-quality warnings, run with -w to list them",
            metrics.warnings.len()
        );
    }

    metrics.report_create(config, show_assignee, show_warnings, output_path)?;
    tracing::info!("Report written to {}", output_path);
    Ok(())
}

async fn run_stats(client: &JiraClient, config: &Config, output_path: &str) -> Result<()> {
    let issues = fetch_issues(
        client,
        &jql::resolved_in_iterations(config),
        Some("changelog"),
        "Retrieving resolved issues",
    )
    .await?;

    let normalizer = Normalizer::new(config)?;
    let facts = issues
        .iter()
        .map(|issue| normalizer.normalize(issue))
        .collect::<Result<Vec<_>>>()?;

    facts.stats_create(output_path)?;
    tracing::info!("Stats written to {}", output_path);
    Ok(())
}

async fn fetch_issues(
    client: &JiraClient,
    jql: &str,
    expand: Option<&str>,
    message: &str,
) -> Result<Vec<Value>> {
    let multi_progress = MultiProgress::default();
    let pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::count_bar(),
    );
    pb.set_message(message.to_string());

    let progress_pb = pb.clone();
    let progress = move |fetched: usize, total: usize| {
        progress_pb.set_length(total as u64);
        progress_pb.set_position(fetched as u64);
    };

    let issues = client.search(jql, expand, Box::new(progress)).await?;
    pb.set_style(ProgressStyleTemplate::only_message());
    pb.finish_with_message(format!("✅ {} (find {} issues)", message, issues.len()));
    Ok(issues)
}
