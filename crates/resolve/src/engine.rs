use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::json;

use crate::config::MappingConfig;
use crate::error::MappingError;
use crate::index::LookupIndex;
use crate::issues::IssueCollector;
use crate::mapper::map_report;
use crate::model::{
    EntityLevel, IssueType, LookupTables, MappingMeta, MappingResult, PassParams, Report, ReportFacts,
};
use crate::snapshot::pick_snapshot_within;
use crate::summary::compute_summary;

/// Run one mapping pass: pick the bulk snapshot for the export date, build the
/// index, map every row, and summarize.
pub fn run(
    config: &MappingConfig,
    tables: &LookupTables,
    report: &Report,
    params: &PassParams,
) -> Result<MappingResult, MappingError> {
    let exported_date = export_date(&params.exported_at)?;
    let available = tables.snapshot_dates();
    let snapshot_date =
        pick_snapshot_within(exported_date, &available, config.snapshot.forward_window_days);

    let mut issues = IssueCollector::new();
    if snapshot_date.is_none() {
        log::warn!(
            "upload {}: no bulk snapshot usable for {exported_date} ({} available)",
            params.upload_id,
            available.len()
        );
        issues.add_issue_rows(
            EntityLevel::Account,
            IssueType::MissingBulkSnapshot,
            json!({
                "account_id": params.account_id,
                "exported_date": exported_date.to_string(),
            }),
            None,
            report.row_count() as u64,
        );
    }

    let index = LookupIndex::build(tables, snapshot_date);
    let facts = map_report(report, &index, params, &mut issues);
    let issues = issues.into_issues();
    let summary = compute_summary(report.row_count(), facts.len(), &issues);

    log::info!(
        "upload {}: {} report, {} row(s) in, {} fact(s) out, {} issue(s)",
        params.upload_id,
        report.kind(),
        summary.rows_in,
        summary.facts_out,
        issues.len()
    );

    Ok(MappingResult {
        meta: MappingMeta {
            config_name: config.name.clone(),
            report_kind: report.kind().to_string(),
            upload_id: params.upload_id.clone(),
            account_id: params.account_id.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            reference_date: params.reference_date,
            exported_date,
            snapshot_date,
        },
        summary,
        facts,
        issues,
    })
}

/// Map several uploads against one shared index on the rayon pool. Each
/// upload gets its own collector; results come back in input order.
pub fn map_uploads_parallel(
    index: &LookupIndex,
    uploads: &[(Report, PassParams)],
) -> Vec<(ReportFacts, IssueCollector)> {
    uploads
        .par_iter()
        .map(|(report, params)| {
            let mut issues = IssueCollector::new();
            let facts = map_report(report, index, params, &mut issues);
            (facts, issues)
        })
        .collect()
}

/// Calendar date of an export timestamp: RFC 3339 (date in its own offset) or
/// anything starting with `YYYY-MM-DD`.
pub fn export_date(exported_at: &str) -> Result<NaiveDate, MappingError> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(exported_at) {
        return Ok(ts.date_naive());
    }
    exported_at
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| MappingError::TimestampParse(exported_at.into()))
}
