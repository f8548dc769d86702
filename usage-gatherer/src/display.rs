//! Terminal rendering of group reports and batch runs.

use crate::{
    collectors::BatchReport,
    metrics::{
        ActivityTier,
        GroupReport,
        ProcessorReport,
        NO_DATA,
    },
};
use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};

const BAR_WIDTH: f64 = 40.0;

/// Summary, bar chart and pruning candidates for one group.
pub fn format_report(report: &GroupReport) -> String {
    let mut output = String::new();
    output.push_str(&format_summary_table(report));
    output.push_str(&format_bar_chart(report));
    output.push_str(&format_pruning_candidates(report));
    output
}

pub fn tier_color(tier: Option<ActivityTier>) -> Color {
    match tier {
        Some(ActivityTier::Unused) => Color::Red,
        Some(ActivityTier::Low) => Color::Yellow,
        Some(ActivityTier::Active) => Color::Blue,
        None => Color::DarkGrey,
    }
}

/// Format number in human readable format
fn format_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        format!("{}", num)
    }
}

fn count_cell(row: &ProcessorReport) -> String {
    match row.count.count() {
        Some(count) if row.is_lower_bound() => format!("≥{}", format_number(count)),
        Some(count) => format_number(count),
        None => NO_DATA.to_string(),
    }
}

pub fn format_summary_table(report: &GroupReport) -> String {
    let summary = &report.summary;
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(format!(
            "PROCESSOR USAGE ({}, {})",
            report.label, report.group_id
        ))
        .add_attribute(Attribute::Bold)
        .fg(Color::Green)]);

    let period = match report.window {
        Some(window) => format!(
            "{} → {} ({:.0} days)",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M"),
            window.length_days()
        ),
        None => "since processor creation".to_string(),
    };

    let rows = [
        ("Period", period, None),
        ("Processors", summary.total_processors.to_string(), None),
        ("Total executions", format_number(summary.total_count), None),
        ("UNUSED", summary.unused.to_string(), Some(Color::Red)),
        ("LOW", summary.low.to_string(), Some(Color::Yellow)),
        ("ACTIVE", summary.active.to_string(), Some(Color::Blue)),
        (NO_DATA, summary.no_data.to_string(), Some(Color::DarkGrey)),
        ("Lower bounds", summary.incomplete.to_string(), None),
    ];
    for (label, value, color) in rows {
        let mut value = Cell::new(value);
        if let Some(color) = color {
            value = value.fg(color);
        }
        table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), value]);
    }

    format!("{}\n", table)
}

/// Horizontal bars scaled to the busiest processor, colored by tier.
pub fn format_bar_chart(report: &GroupReport) -> String {
    let mut output = String::new();
    output.push_str("\nEXECUTIONS PER PROCESSOR\n");

    if report.rows.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("No processors in this process group").add_attribute(Attribute::Bold)
            ]);
        output.push_str(&format!("{}\n", table));
        return output;
    }

    let max = report.rows.iter().filter_map(|row| row.count.count()).max().unwrap_or(0);
    let windowed = report.window.is_some();

    let mut table = Table::new();
    let mut header = vec![
        Cell::new("Processor").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Bar").add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
    ];
    if windowed {
        header.push(Cell::new("Per day").add_attribute(Attribute::Bold));
    }
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for row in &report.rows {
        let bar = match row.count.count() {
            Some(count) if count > 0 && max > 0 => {
                let length = ((count as f64 / max as f64) * BAR_WIDTH).round() as usize;
                "█".repeat(length.max(1))
            }
            Some(_) => String::new(),
            None => "?".to_string(),
        };
        let color = tier_color(row.tier);

        let mut cells = vec![
            Cell::new(&row.name),
            Cell::new(&row.processor_type),
            Cell::new(bar).fg(color),
            Cell::new(count_cell(row)).fg(color),
        ];
        if windowed {
            cells.push(Cell::new(
                row.events_per_day
                    .map(|rate| format!("{:.1}", rate))
                    .unwrap_or_default(),
            ));
        }
        table.add_row(cells);
    }

    output.push_str(&format!("{}\n", table));
    output.push_str("Legend: red = UNUSED, yellow = LOW, blue = ACTIVE, ? = NO_DATA\n");
    output
}

/// Processors worth reviewing for removal: the `UNUSED` and `LOW` tiers.
pub fn format_pruning_candidates(report: &GroupReport) -> String {
    let mut output = String::new();

    for (tier, title) in [
        (ActivityTier::Unused, "never executed"),
        (ActivityTier::Low, "rarely executed"),
    ] {
        let rows: Vec<&ProcessorReport> = report.rows_in_tier(tier).collect();
        output.push_str(&format!("\n{} processors ({}): {}\n", tier, title, rows.len()));
        for row in rows {
            output.push_str(&format!("  - {} ({})\n", row.name, row.processor_type));
        }
    }

    let no_data: Vec<&ProcessorReport> = report.no_data_rows().collect();
    if !no_data.is_empty() {
        output.push_str(&format!("\n{} processors (count unavailable): {}\n", NO_DATA, no_data.len()));
        for row in no_data {
            output.push_str(&format!("  - {} ({})\n", row.name, row.processor_type));
        }
    }

    output
}

/// Full, partial and failed groups of a batch, failures listed with their error.
pub fn format_run_summary(batch: &BatchReport) -> String {
    let summary = batch.summary();
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Flow").add_attribute(Attribute::Bold),
            Cell::new("Group").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
        ]);

    for outcome in &batch.groups {
        let (result, color) = match &outcome.result {
            Ok(report) => (
                format!(
                    "{} ({} processors, {} no data)",
                    report.quality(),
                    report.summary.total_processors,
                    report.summary.no_data
                ),
                Color::Green,
            ),
            Err(err) => (format!("failed: {err}"), Color::Red),
        };
        table.add_row(vec![
            Cell::new(&outcome.target.label),
            Cell::new(&outcome.target.id),
            Cell::new(result).fg(color),
        ]);
    }

    format!(
        "{}\nFlows: {} │ full: {} │ partial: {} │ failed: {}\n",
        table,
        summary.total(),
        summary.full,
        summary.partial,
        summary.failed
    )
}
