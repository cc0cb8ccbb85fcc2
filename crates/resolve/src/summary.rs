use serde::Serialize;

use crate::model::{EntityLevel, IssueType, MappingIssue};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSummary {
    pub rows_in: usize,
    pub facts_out: usize,
    pub rows_dropped: usize,
    pub missing_bulk_snapshot: bool,
    pub levels: Vec<LevelSummary>,
}

/// Rows lost at one entity level, absolute and as a share of `rows_in`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub entity_level: EntityLevel,
    pub unmapped_rows: u64,
    pub ambiguous_rows: u64,
    pub unmapped_pct: f64,
    pub ambiguous_pct: f64,
}

const RESOLVED_LEVELS: [EntityLevel; 3] =
    [EntityLevel::Campaign, EntityLevel::AdGroup, EntityLevel::Target];

/// Compute pass statistics from the deduplicated issue list.
pub fn compute_summary(rows_in: usize, facts_out: usize, issues: &[MappingIssue]) -> MappingSummary {
    let mut levels: Vec<LevelSummary> = RESOLVED_LEVELS
        .iter()
        .map(|&entity_level| LevelSummary {
            entity_level,
            unmapped_rows: 0,
            ambiguous_rows: 0,
            unmapped_pct: 0.0,
            ambiguous_pct: 0.0,
        })
        .collect();
    let mut missing_bulk_snapshot = false;

    for issue in issues {
        if issue.issue_type == IssueType::MissingBulkSnapshot {
            missing_bulk_snapshot = true;
            continue;
        }
        let Some(level) = levels.iter_mut().find(|l| l.entity_level == issue.entity_level) else {
            continue;
        };
        match issue.issue_type {
            IssueType::Unmapped => level.unmapped_rows += issue.row_count,
            IssueType::Ambiguous => level.ambiguous_rows += issue.row_count,
            IssueType::MissingBulkSnapshot => {}
        }
    }

    for level in &mut levels {
        level.unmapped_pct = percent(level.unmapped_rows, rows_in);
        level.ambiguous_pct = percent(level.ambiguous_rows, rows_in);
    }

    MappingSummary {
        rows_in,
        facts_out,
        rows_dropped: rows_in.saturating_sub(facts_out),
        missing_bulk_snapshot,
        levels,
    }
}

fn percent(part: u64, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
