use crate::{
    collectors::CountMap,
    metrics::{
        ActivityTier,
        CountValue,
        ProcessorDescriptor,
        ProcessorReport,
        ReportSummary,
        TimeWindow,
    },
};
use std::cmp::Ordering;

/// Joins descriptors with their counts into report rows, one per descriptor.
///
/// A descriptor without a count becomes a `NO_DATA` row. Rows are ordered by count descending,
/// unknown counts last, then by name and id.
pub fn build_rows(
    descriptors: &[ProcessorDescriptor],
    counts: &CountMap,
    window: Option<TimeWindow>,
) -> Vec<ProcessorReport> {
    let mut rows: Vec<ProcessorReport> = descriptors
        .iter()
        .map(|descriptor| {
            let (value, completeness) = match counts.get(&descriptor.id) {
                Some(count) => (count.value.clone(), count.completeness),
                None => (CountValue::unknown("no count returned for processor"), None),
            };
            let events_per_day = match (value.count(), window) {
                (Some(count), Some(window)) if window.length_days() > 0.0 => {
                    Some(count as f64 / window.length_days())
                }
                _ => None,
            };
            ProcessorReport {
                processor_id: descriptor.id.clone(),
                name: descriptor.name.clone(),
                processor_type: descriptor.processor_type.clone(),
                group_id: descriptor.group_id.clone(),
                tier: value.count().map(ActivityTier::classify),
                count: value,
                events_per_day,
                completeness,
            }
        })
        .collect();

    rows.sort_by(compare_rows);
    rows
}

fn compare_rows(a: &ProcessorReport, b: &ProcessorReport) -> Ordering {
    let by_count = match (a.count.count(), b.count.count()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_count
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.processor_id.cmp(&b.processor_id))
}

pub fn summarize(rows: &[ProcessorReport]) -> ReportSummary {
    rows.iter().fold(
        ReportSummary {
            total_processors: rows.len(),
            ..ReportSummary::default()
        },
        |mut summary, row| {
            match row.tier {
                Some(ActivityTier::Unused) => summary.unused += 1,
                Some(ActivityTier::Low) => summary.low += 1,
                Some(ActivityTier::Active) => summary.active += 1,
                None => summary.no_data += 1,
            }
            summary.total_count += row.count.count().unwrap_or(0);
            if row.is_lower_bound() {
                summary.incomplete += 1;
            }
            summary
        },
    )
}
