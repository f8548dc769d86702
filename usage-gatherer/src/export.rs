//! CSV and JSON exports.
//!
//! Writers are generic over [`std::io::Write`]; path helpers decide the file names.

use crate::{
    collectors::ChildGroup,
    metrics::{
        BatchRow,
        ChartSeries,
        GroupReport,
    },
};
use chrono::{
    DateTime,
    SecondsFormat,
    Utc,
};
use eyre::{
    Result,
    WrapErr,
};
use std::{
    io,
    path::{
        Path,
        PathBuf,
    },
};

pub const BATCH_HEADER: [&str; 7] = [
    "snapshot_timestamp",
    "flow_name",
    "process_group_id",
    "processor_id",
    "processor_name",
    "processor_type",
    "invocations",
];

/// One row per processor in report order. Windowed reports get the daily rate and a
/// completeness column.
pub fn write_report_csv<W: io::Write>(writer: W, report: &GroupReport) -> Result<()> {
    let windowed = report.window.is_some();
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["processor_name", "processor_type", "execution_count"];
    if windowed {
        header.extend(["events_per_day", "complete"]);
    }
    header.push("tier");
    csv.write_record(&header)?;

    for row in &report.rows {
        let mut record = vec![
            row.name.clone(),
            row.processor_type.clone(),
            row.count.count().map(|c| c.to_string()).unwrap_or_default(),
        ];
        if windowed {
            record.push(row.events_per_day.map(|rate| format!("{:.1}", rate)).unwrap_or_default());
            record.push(if row.is_no_data() {
                String::new()
            } else {
                (!row.is_lower_bound()).to_string()
            });
        }
        record.push(row.status_label());
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Combined rows of a batch, ready for append-only ingestion.
pub fn write_batch_csv<W: io::Write>(writer: W, rows: &[BatchRow]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(BATCH_HEADER)?;
    for row in rows {
        csv.write_record([
            row.snapshot_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            row.flow_name.clone(),
            row.process_group_id.clone(),
            row.processor_id.clone(),
            row.processor_name.clone(),
            row.processor_type.clone(),
            row.invocations.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// `id,flow_name` pairs, the same shape the batch mode reads back.
pub fn write_flows_csv<W: io::Write>(writer: W, groups: &[ChildGroup]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["id", "flow_name"])?;
    for group in groups {
        csv.write_record([&group.id, &group.name])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_chart_json<W: io::Write>(writer: W, series: &ChartSeries) -> Result<()> {
    serde_json::to_writer_pretty(writer, series).wrap_err("Failed to write chart series")
}

/// Makes a flow label usable as part of a file name.
pub fn file_safe(label: &str) -> String {
    let safe: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "flow".to_string()
    } else {
        safe
    }
}

pub fn report_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}.csv"))
}

pub fn chart_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}.chart.json"))
}

pub fn flow_report_path(dir: &Path, prefix: &str, flow_name: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.csv", file_safe(flow_name)))
}

pub fn flow_chart_path(dir: &Path, prefix: &str, flow_name: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.chart.json", file_safe(flow_name)))
}

pub fn combined_path(dir: &Path, prefix: &str, snapshot: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{prefix}_all_flows_{}.csv", snapshot.format("%Y%m%d_%H%M%S")))
}
