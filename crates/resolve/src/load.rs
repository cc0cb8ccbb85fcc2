//! Lookup tables from CSV.
//!
//! Columns are addressed by header name, dates are `YYYY-MM-DD`, and an empty
//! validity cell means "unbounded". Row shapes:
//!
//! | table | columns |
//! |---|---|
//! | portfolios | `snapshot_date, portfolio_id, portfolio_name` |
//! | campaigns | `snapshot_date, campaign_id, campaign_name, portfolio_id` |
//! | ad_groups | `snapshot_date, ad_group_id, campaign_id, ad_group_name` |
//! | targets | `snapshot_date, target_id, ad_group_id, expression, match_type` |
//! | campaign_history | `entity_id, name, valid_from, valid_to` |
//! | ad_group_history | `entity_id, campaign_id, name, valid_from, valid_to` |
//! | *_overrides | `entity_id, name, valid_from, valid_to` |

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::config::TableFiles;
use crate::error::MappingError;
use crate::model::{
    LookupTables, NameHistoryRow, OverrideRow, SnapshotAdGroup, SnapshotCampaign,
    SnapshotPortfolio, SnapshotTarget,
};
use crate::normalize::{is_negative_match_type, MatchType};

/// Load every table named in `files` from `dir`. A missing file is an empty table.
pub fn load_tables_from_dir(dir: &Path, files: &TableFiles) -> Result<LookupTables, MappingError> {
    let read = |table: &str, file: &str| -> Result<Option<String>, MappingError> {
        let path = dir.join(file);
        if !path.exists() {
            log::info!("table '{table}': {} not found, treating as empty", path.display());
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| MappingError::Io(format!("{}: {e}", path.display())))
    };

    let mut tables = LookupTables::default();
    if let Some(data) = read("portfolios", &files.portfolios)? {
        tables.portfolios = load_portfolios(&data)?;
    }
    if let Some(data) = read("campaigns", &files.campaigns)? {
        tables.campaigns = load_campaigns(&data)?;
    }
    if let Some(data) = read("ad_groups", &files.ad_groups)? {
        tables.ad_groups = load_ad_groups(&data)?;
    }
    if let Some(data) = read("targets", &files.targets)? {
        tables.targets = load_targets(&data)?;
    }
    if let Some(data) = read("campaign_history", &files.campaign_history)? {
        tables.campaign_history = load_campaign_history(&data)?;
    }
    if let Some(data) = read("ad_group_history", &files.ad_group_history)? {
        tables.ad_group_history = load_ad_group_history(&data)?;
    }
    if let Some(data) = read("campaign_overrides", &files.campaign_overrides)? {
        tables.campaign_overrides = load_overrides("campaign_overrides", &data)?;
    }
    if let Some(data) = read("ad_group_overrides", &files.ad_group_overrides)? {
        tables.ad_group_overrides = load_overrides("ad_group_overrides", &data)?;
    }
    if let Some(data) = read("target_overrides", &files.target_overrides)? {
        tables.target_overrides = load_overrides("target_overrides", &data)?;
    }

    log::debug!(
        "loaded lookup tables from {}: {} snapshot date(s), {} campaign row(s)",
        dir.display(),
        tables.snapshot_dates().len(),
        tables.campaigns.len()
    );
    Ok(tables)
}

pub fn load_portfolios(csv_data: &str) -> Result<Vec<SnapshotPortfolio>, MappingError> {
    read_table(
        "portfolios",
        csv_data,
        &["snapshot_date", "portfolio_id", "portfolio_name"],
        |r| {
            Ok(SnapshotPortfolio {
                snapshot_date: r.date("snapshot_date")?,
                portfolio_id: r.text("portfolio_id").into(),
                portfolio_name: r.text("portfolio_name").into(),
            })
        },
    )
}

pub fn load_campaigns(csv_data: &str) -> Result<Vec<SnapshotCampaign>, MappingError> {
    read_table(
        "campaigns",
        csv_data,
        &["snapshot_date", "campaign_id", "campaign_name", "portfolio_id"],
        |r| {
            Ok(SnapshotCampaign {
                snapshot_date: r.date("snapshot_date")?,
                campaign_id: r.text("campaign_id").into(),
                campaign_name: r.text("campaign_name").into(),
                portfolio_id: r.opt_text("portfolio_id"),
            })
        },
    )
}

pub fn load_ad_groups(csv_data: &str) -> Result<Vec<SnapshotAdGroup>, MappingError> {
    read_table(
        "ad_groups",
        csv_data,
        &["snapshot_date", "ad_group_id", "campaign_id", "ad_group_name"],
        |r| {
            Ok(SnapshotAdGroup {
                snapshot_date: r.date("snapshot_date")?,
                ad_group_id: r.text("ad_group_id").into(),
                campaign_id: r.text("campaign_id").into(),
                ad_group_name: r.text("ad_group_name").into(),
            })
        },
    )
}

/// Match type and negative flag are both derived from the raw `match_type` cell.
pub fn load_targets(csv_data: &str) -> Result<Vec<SnapshotTarget>, MappingError> {
    read_table(
        "targets",
        csv_data,
        &["snapshot_date", "target_id", "ad_group_id", "expression", "match_type"],
        |r| {
            let raw_match_type = r.text("match_type");
            Ok(SnapshotTarget {
                snapshot_date: r.date("snapshot_date")?,
                target_id: r.text("target_id").into(),
                ad_group_id: r.text("ad_group_id").into(),
                expression: r.text("expression").into(),
                match_type: MatchType::parse(raw_match_type),
                is_negative: is_negative_match_type(raw_match_type),
            })
        },
    )
}

pub fn load_campaign_history(csv_data: &str) -> Result<Vec<NameHistoryRow>, MappingError> {
    read_table(
        "campaign_history",
        csv_data,
        &["entity_id", "name", "valid_from", "valid_to"],
        |r| {
            Ok(NameHistoryRow {
                entity_id: r.text("entity_id").into(),
                parent_id: None,
                name: r.text("name").into(),
                valid_from: r.opt_date("valid_from")?,
                valid_to: r.opt_date("valid_to")?,
            })
        },
    )
}

pub fn load_ad_group_history(csv_data: &str) -> Result<Vec<NameHistoryRow>, MappingError> {
    read_table(
        "ad_group_history",
        csv_data,
        &["entity_id", "campaign_id", "name", "valid_from", "valid_to"],
        |r| {
            Ok(NameHistoryRow {
                entity_id: r.text("entity_id").into(),
                parent_id: r.opt_text("campaign_id"),
                name: r.text("name").into(),
                valid_from: r.opt_date("valid_from")?,
                valid_to: r.opt_date("valid_to")?,
            })
        },
    )
}

pub fn load_overrides(table: &str, csv_data: &str) -> Result<Vec<OverrideRow>, MappingError> {
    read_table(
        table,
        csv_data,
        &["entity_id", "name", "valid_from", "valid_to"],
        |r| {
            Ok(OverrideRow {
                entity_id: r.text("entity_id").into(),
                name: r.text("name").into(),
                valid_from: r.opt_date("valid_from")?,
                valid_to: r.opt_date("valid_to")?,
            })
        },
    )
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// One CSV record with its required columns resolved to indices.
struct Cells<'r> {
    table: &'r str,
    line: u64,
    record: &'r csv::StringRecord,
    columns: &'r HashMap<&'static str, usize>,
}

impl Cells<'_> {
    fn text(&self, column: &str) -> &str {
        self.columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
            .trim()
    }

    fn opt_text(&self, column: &str) -> Option<String> {
        let value = self.text(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn date(&self, column: &str) -> Result<NaiveDate, MappingError> {
        let value = self.text(column);
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| MappingError::DateParse {
            table: self.table.into(),
            line: self.line,
            value: value.into(),
        })
    }

    fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>, MappingError> {
        if self.text(column).is_empty() {
            Ok(None)
        } else {
            self.date(column).map(Some)
        }
    }
}

fn read_table<T>(
    table: &str,
    csv_data: &str,
    required: &[&'static str],
    mut build: impl FnMut(&Cells<'_>) -> Result<T, MappingError>,
) -> Result<Vec<T>, MappingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut columns = HashMap::new();
    for &name in required {
        let idx = headers.iter().position(|h| h == name).ok_or_else(|| {
            MappingError::MissingColumn {
                table: table.into(),
                column: name.into(),
            }
        })?;
        columns.insert(name, idx);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(build(&Cells {
            table,
            line,
            record: &record,
            columns: &columns,
        })?);
    }
    Ok(rows)
}
