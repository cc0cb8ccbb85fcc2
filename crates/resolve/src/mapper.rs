//! Fact mappers, one per report shape.
//!
//! Each mapper walks rows in order, resolves campaign → ad group → target as
//! the shape requires, and emits a fact per fully resolved row. The first
//! level that fails records one issue and drops the row; deeper levels are
//! never attempted. Mappers do no I/O and never fail.

use serde_json::{json, Value};

use crate::index::{LookupIndex, TargetKey};
use crate::issues::IssueCollector;
use crate::model::{
    CampaignFact, CampaignRow, EntityLevel, IssueType, PassParams, PlacementFact, PlacementRow,
    Report, ReportFacts, ResolvedId, SearchTermFact, SearchTermRow, TargetingFact, TargetingRow,
    ROLLUP_TARGET_KEY, WILDCARD_TARGETING,
};
use crate::normalize::{is_negative_match_type, MatchType};
use crate::resolver::{resolve_ad_group, resolve_campaign, resolve_target};

/// Dispatch on report shape.
pub fn map_report(
    report: &Report,
    index: &LookupIndex,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> ReportFacts {
    match report {
        Report::Campaign(rows) => ReportFacts::Campaign(map_campaign_rows(rows, index, params, issues)),
        Report::Placement(rows) => ReportFacts::Placement(map_placement_rows(rows, index, params, issues)),
        Report::Targeting(rows) => ReportFacts::Targeting(map_targeting_rows(rows, index, params, issues)),
        Report::SearchTerm(rows) => {
            ReportFacts::SearchTerm(map_search_term_rows(rows, index, params, issues))
        }
    }
}

pub fn map_campaign_rows(
    rows: &[CampaignRow],
    index: &LookupIndex,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Vec<CampaignFact> {
    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(campaign_id) = campaign_step(
            index,
            &row.campaign_name_norm,
            row.portfolio_name_norm.as_deref(),
            params,
            issues,
        ) else {
            continue;
        };
        facts.push(CampaignFact {
            row: row.clone(),
            stamp: params.stamp(),
            portfolio_id: snapshot_portfolio(index, &campaign_id),
            campaign_id,
        });
    }
    facts
}

/// Placement rows are campaign-scoped: same resolution as campaign rows.
pub fn map_placement_rows(
    rows: &[PlacementRow],
    index: &LookupIndex,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Vec<PlacementFact> {
    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(campaign_id) = campaign_step(
            index,
            &row.campaign_name_norm,
            row.portfolio_name_norm.as_deref(),
            params,
            issues,
        ) else {
            continue;
        };
        facts.push(PlacementFact {
            row: row.clone(),
            stamp: params.stamp(),
            portfolio_id: snapshot_portfolio(index, &campaign_id),
            campaign_id,
        });
    }
    facts
}

pub fn map_targeting_rows(
    rows: &[TargetingRow],
    index: &LookupIndex,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Vec<TargetingFact> {
    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(campaign_id) = campaign_step(
            index,
            &row.campaign_name_norm,
            row.portfolio_name_norm.as_deref(),
            params,
            issues,
        ) else {
            continue;
        };
        let Some(ad_group_id) =
            ad_group_step(index, &campaign_id, &row.ad_group_name_norm, params, issues)
        else {
            continue;
        };
        let match_type = MatchType::parse(&row.match_type_raw);
        let is_negative = is_negative_match_type(&row.match_type_raw);
        let Some(target_id) = target_step(
            index,
            TargetKey {
                ad_group_id: &ad_group_id,
                expression_norm: &row.targeting_norm,
                match_type,
                is_negative,
            },
            params,
            issues,
        ) else {
            continue;
        };
        facts.push(TargetingFact {
            row: row.clone(),
            stamp: params.stamp(),
            campaign_id,
            ad_group_id,
            target_id,
            match_type_norm: match_type,
            is_negative,
        });
    }
    facts
}

/// Search-term rows resolve a target only when the row names one; the `*`
/// rollup row carries no target and gets the rollup sentinel key.
pub fn map_search_term_rows(
    rows: &[SearchTermRow],
    index: &LookupIndex,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Vec<SearchTermFact> {
    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(campaign_id) = campaign_step(
            index,
            &row.campaign_name_norm,
            row.portfolio_name_norm.as_deref(),
            params,
            issues,
        ) else {
            continue;
        };
        let Some(ad_group_id) =
            ad_group_step(index, &campaign_id, &row.ad_group_name_norm, params, issues)
        else {
            continue;
        };
        let match_type = MatchType::parse(&row.match_type_raw);
        let is_negative = is_negative_match_type(&row.match_type_raw);

        let (target_id, target_key) = if row.targeting_norm == WILDCARD_TARGETING {
            (None, ROLLUP_TARGET_KEY.to_string())
        } else {
            let Some(target_id) = target_step(
                index,
                TargetKey {
                    ad_group_id: &ad_group_id,
                    expression_norm: &row.targeting_norm,
                    match_type,
                    is_negative,
                },
                params,
                issues,
            ) else {
                continue;
            };
            (Some(target_id.clone()), target_id)
        };

        facts.push(SearchTermFact {
            row: row.clone(),
            stamp: params.stamp(),
            campaign_id,
            ad_group_id,
            target_id,
            target_key,
            match_type_norm: match_type,
            is_negative,
        });
    }
    facts
}

// ---------------------------------------------------------------------------
// Resolution steps
// ---------------------------------------------------------------------------

fn campaign_step(
    index: &LookupIndex,
    name_norm: &str,
    portfolio_name_norm: Option<&str>,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Option<String> {
    let resolved = resolve_campaign(index, name_norm, portfolio_name_norm, params.reference_date);
    accept(resolved, EntityLevel::Campaign, issues, || {
        let mut key = json!({ "campaign_name_norm": name_norm });
        if let Some(portfolio) = portfolio_name_norm {
            key["portfolio_name_norm"] = Value::from(portfolio);
        }
        key
    })
}

fn ad_group_step(
    index: &LookupIndex,
    campaign_id: &str,
    name_norm: &str,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Option<String> {
    let resolved = resolve_ad_group(index, campaign_id, name_norm, params.reference_date);
    accept(resolved, EntityLevel::AdGroup, issues, || {
        json!({ "campaign_id": campaign_id, "ad_group_name_norm": name_norm })
    })
}

fn target_step(
    index: &LookupIndex,
    key: TargetKey<'_>,
    params: &PassParams,
    issues: &mut IssueCollector,
) -> Option<String> {
    let resolved = resolve_target(index, key, params.reference_date);
    accept(resolved, EntityLevel::Target, issues, || {
        json!({
            "ad_group_id": key.ad_group_id,
            "targeting_norm": key.expression_norm,
            "match_type_norm": key.match_type.as_str(),
            "is_negative": key.is_negative,
        })
    })
}

/// `Ok` yields the ID; anything else becomes an issue at `level`.
fn accept(
    resolved: ResolvedId,
    level: EntityLevel,
    issues: &mut IssueCollector,
    issue_key: impl FnOnce() -> Value,
) -> Option<String> {
    match resolved {
        ResolvedId::Ok(id) => Some(id),
        ResolvedId::Ambiguous(candidates) => {
            issues.add_issue(level, IssueType::Ambiguous, issue_key(), Some(candidates));
            None
        }
        ResolvedId::Unmapped(near_misses) => {
            let candidates = (!near_misses.is_empty()).then_some(near_misses);
            issues.add_issue(level, IssueType::Unmapped, issue_key(), candidates);
            None
        }
    }
}

fn snapshot_portfolio(index: &LookupIndex, campaign_id: &str) -> Option<String> {
    index
        .campaign_by_id(campaign_id)
        .and_then(|c| c.portfolio_id.clone())
}
