// SPDX-License-Identifier: MIT
//! Pure aggregation over in-memory project/entry lists.
//!
//! Feeds the dashboard pie chart and the PDF report. Nothing here touches
//! the database — handlers fetch rows, these functions reduce them.

use serde::Serialize;
use std::collections::HashMap;

use crate::storage::{ProjectRow, TimeEntryRow};

/// Sum of hours across all entries. Order-independent (floating point
/// addition aside).
pub fn total_hours(entries: &[TimeEntryRow]) -> f64 {
    entries.iter().map(|e| e.hours).sum()
}

/// Map of project id → summed hours. Every listed project is present, with
/// 0.0 when it has no entries. Entries pointing at an unlisted project are
/// ignored.
pub fn per_project_totals(
    projects: &[ProjectRow],
    entries: &[TimeEntryRow],
) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = projects
        .iter()
        .map(|p| (p.id.clone(), 0.0))
        .collect();
    for entry in entries {
        if let Some(total) = totals.get_mut(&entry.project_id) {
            *total += entry.hours;
        }
    }
    totals
}

/// One pie slice: a project with its summed hours and share of the total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSlice {
    pub project_id: String,
    pub name: String,
    pub total_hours: f64,
    pub percentage: f64,
}

/// Slices in project-list order. When every total is zero the chart would
/// collapse, so the share falls back to an equal split across projects.
pub fn chart_slices(projects: &[ProjectRow], totals: &HashMap<String, f64>) -> Vec<ChartSlice> {
    let grand_total: f64 = projects
        .iter()
        .map(|p| totals.get(&p.id).copied().unwrap_or(0.0))
        .sum();

    projects
        .iter()
        .map(|p| {
            let hours = totals.get(&p.id).copied().unwrap_or(0.0);
            let percentage = if grand_total > 0.0 {
                hours / grand_total * 100.0
            } else {
                100.0 / projects.len() as f64
            };
            ChartSlice {
                project_id: p.id.clone(),
                name: p.name.clone(),
                total_hours: hours,
                percentage,
            }
        })
        .collect()
}

/// Split report rows into pages of at most `rows_per_page` rows, in order.
/// The PDF layer starts a new page whenever vertical space runs out;
/// `rows_per_page` is how many rows fit on one page.
pub fn paginate<T>(rows: &[T], rows_per_page: usize) -> Vec<&[T]> {
    if rows.is_empty() {
        return Vec::new();
    }
    rows.chunks(rows_per_page.max(1)).collect()
}
