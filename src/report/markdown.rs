use crate::analyze::{EpicAggregate, LoadOverview, MetricsStore};
use crate::model::{Config, Discipline, IssueFact, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use markdown_builder::Markdown;
use markdown_table::{Heading, MarkdownTable};
use std::fs;

pub trait MarkdownReport {
    fn report_create(
        &self,
        config: &Config,
        show_assignee: bool,
        show_warnings: bool,
        path: &str,
    ) -> Result<()>;
}

impl MarkdownReport for MetricsStore {
    fn report_create(
        &self,
        config: &Config,
        show_assignee: bool,
        show_warnings: bool,
        path: &str,
    ) -> Result<()> {
        let mut doc = Markdown::new();

        doc.header1("PI Feature Story Distribution");
        doc.paragraph(
            "Overview of all features within the PI, including stories scheduled outside it."
                .to_string(),
        );
        doc.add_epic_distribution(&self.epics, config);

        doc.header1("Feature Load Overview");
        doc.add_load_overview(&self.load_overview, config);

        if show_assignee {
            doc.header1("Iteration Load By Assignee");
            doc.add_iteration_loads(&self.load_by_assignee, config, false);
        }

        doc.header1("Iteration Load By Discipline");
        doc.add_iteration_loads(&by_label(&self.load_by_discipline), config, true);

        doc.header1("Iteration Velocity By Discipline");
        doc.add_iteration_loads(&by_label(&self.velocity_by_discipline), config, false);

        if show_warnings {
            doc.header1("Issue Warnings");
            doc.paragraph(
                "Double check these issues to ensure the metrics above are accurate.".to_string(),
            );
            doc.add_warnings(&self.warnings);
        }

        fs::write(path, doc.render())?;
        Ok(())
    }
}

trait MarkdownExt {
    fn add_epic_distribution(&mut self, epics: &IndexMap<String, EpicAggregate>, config: &Config);
    fn add_load_overview(&mut self, overview: &IndexMap<Discipline, LoadOverview>, config: &Config);
    fn add_iteration_loads(
        &mut self,
        loads: &IndexMap<String, IndexMap<String, f64>>,
        config: &Config,
        with_capacity: bool,
    );
    fn add_warnings(&mut self, warnings: &IndexMap<String, IssueFact>);
}

impl MarkdownExt for Markdown {
    fn add_epic_distribution(&mut self, epics: &IndexMap<String, EpicAggregate>, config: &Config) {
        let header = [
            vec!["No.".to_string(), "Feature".to_string()],
            config.iterations.clone(),
            vec!["Unplanned".to_string()],
        ]
        .concat()
        .into_iter()
        .map(|heading| Heading::new(heading, None))
        .collect::<Vec<_>>();

        let mut table = vec![];
        let epics = epics
            .iter()
            .sorted_by(|(_, a), (_, b)| a.latest_iteration().total_cmp(&b.latest_iteration()));
        for (row_no, (key, epic)) in epics.enumerate() {
            let feature = match &epic.fact {
                Some(fact) => format!(
                    "{}<br>{} ({})<br>{}",
                    fact.summary, fact.key, fact.status, fact.link
                ),
                None => key.to_string(),
            };
            let columns = config
                .iterations
                .iter()
                .map(|iteration| children_cell(epic, |child| &child.iteration.label == iteration))
                .collect::<Vec<_>>();
            let unplanned = children_cell(epic, |child| {
                !config.iterations.contains(&child.iteration.label)
            });
            table.push(
                [
                    vec![(row_no + 1).to_string(), feature],
                    columns,
                    vec![unplanned],
                ]
                .concat(),
            );
        }

        let mut md_table = MarkdownTable::new(table);
        md_table.with_headings(header);
        self.paragraph(md_table.as_markdown().unwrap());
    }

    fn add_load_overview(
        &mut self,
        overview: &IndexMap<Discipline, LoadOverview>,
        config: &Config,
    ) {
        let header = [
            "Discipline",
            "Capacity",
            "Total",
            "Completed",
            "Remaining",
            "Planned",
            "Unplanned",
            "Delta",
        ]
        .iter()
        .map(|heading| Heading::new(heading.to_string(), None))
        .collect::<Vec<_>>();

        let mut table = vec![];
        let mut totals = LoadOverview::default();
        let mut capacity_total = 0;

        for (discipline, load) in overview
            .iter()
            .sorted_by_key(|(discipline, _)| discipline.as_str())
        {
            let capacity = config
                .capacity
                .get(discipline.as_str())
                .map(|values| values.iter().sum::<i64>())
                .unwrap_or(0);
            capacity_total += capacity;
            totals.total += load.total;
            totals.completed += load.completed;
            totals.remaining += load.remaining;
            totals.planned += load.planned;
            totals.unplanned += load.unplanned;

            table.push(vec![
                discipline.as_str().to_uppercase(),
                capacity.to_string(),
                fmt_points(load.total),
                fmt_points(load.completed),
                fmt_points(load.remaining),
                fmt_points(load.planned),
                fmt_points(load.unplanned),
                fmt_points(capacity as f64 - load.total),
            ]);
        }
        table.push(vec![
            "**Totals**".to_string(),
            capacity_total.to_string(),
            fmt_points(totals.total),
            fmt_points(totals.completed),
            fmt_points(totals.remaining),
            fmt_points(totals.planned),
            fmt_points(totals.unplanned),
            fmt_points(capacity_total as f64 - totals.total),
        ]);

        let mut md_table = MarkdownTable::new(table);
        md_table.with_headings(header);
        self.paragraph(md_table.as_markdown().unwrap());
    }

    fn add_iteration_loads(
        &mut self,
        loads: &IndexMap<String, IndexMap<String, f64>>,
        config: &Config,
        with_capacity: bool,
    ) {
        let header = [
            vec!["".to_string()],
            config.iterations.clone(),
            vec!["Totals".to_string()],
        ]
        .concat()
        .into_iter()
        .map(|heading| Heading::new(heading, None))
        .collect::<Vec<_>>();

        let mut table = vec![];
        if with_capacity {
            let per_iteration = (0..config.iterations.len())
                .map(|index| {
                    config
                        .capacity
                        .values()
                        .map(|values| values.get(index).copied().unwrap_or(0))
                        .sum::<i64>()
                })
                .collect::<Vec<_>>();
            let row = [
                vec!["Capacity".to_string()],
                per_iteration
                    .iter()
                    .map(|value| value.to_string())
                    .collect(),
                vec![per_iteration.iter().sum::<i64>().to_string()],
            ]
            .concat();
            table.push(row);
        }

        for (name, row_loads) in loads.iter().sorted_by_key(|(name, _)| name.clone()) {
            let values = config
                .iterations
                .iter()
                .map(|iteration| row_loads.get(iteration).copied().unwrap_or(0.0))
                .collect::<Vec<_>>();
            let row = [
                vec![name.clone()],
                values.iter().map(|value| fmt_points(*value)).collect(),
                vec![fmt_points(values.iter().sum())],
            ]
            .concat();
            table.push(row);
        }

        let mut md_table = MarkdownTable::new(table);
        md_table.with_headings(header);
        self.paragraph(md_table.as_markdown().unwrap());
    }

    fn add_warnings(&mut self, warnings: &IndexMap<String, IssueFact>) {
        if warnings.is_empty() {
            self.paragraph("No warnings found.".to_string());
            return;
        }
        let header = ["Key", "Warnings", "Team", "Discipline(s)", "Iteration", "Link"]
            .iter()
            .map(|heading| Heading::new(heading.to_string(), None))
            .collect::<Vec<_>>();

        let mut table = vec![];
        for (key, fact) in warnings.iter().sorted_by_key(|(key, _)| key.clone()) {
            table.push(vec![
                key.clone(),
                fact.warnings.join("<br>"),
                fact.team_name.clone(),
                fact.discipline.iter().map(Discipline::as_str).join(","),
                fact.iteration.label.clone(),
                fact.link.clone(),
            ]);
        }

        let mut md_table = MarkdownTable::new(table);
        md_table.with_headings(header);
        self.paragraph(md_table.as_markdown().unwrap());
    }
}

fn children_cell(epic: &EpicAggregate, filter: impl Fn(&IssueFact) -> bool) -> String {
    epic.children
        .values()
        .filter(|child| filter(child))
        .map(|child| format!("{} ({})", child.key, child.status))
        .join("<br>")
}

fn by_label(
    loads: &IndexMap<Discipline, IndexMap<String, f64>>,
) -> IndexMap<String, IndexMap<String, f64>> {
    loads
        .iter()
        .map(|(discipline, row)| (discipline.as_str().to_uppercase(), row.clone()))
        .collect()
}

fn fmt_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
