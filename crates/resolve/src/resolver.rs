//! Per-level name → ID resolution.
//!
//! Every level runs the same precedence chain and stops at the first source
//! that yields any candidate: override, then bulk snapshot, then name history
//! (campaign and ad group only). A source with two or more distinct IDs is
//! `Ambiguous`; lower sources are not consulted.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::index::{DatedEntry, LookupIndex, TargetKey};
use crate::model::{CandidateInfo, CandidateSource, ResolvedId};
use crate::temporal::is_within_range;

/// Resolve a campaign by normalized name.
///
/// When `portfolio_name_norm` maps to exactly one portfolio, snapshot
/// candidates in that portfolio are preferred over same-named campaigns
/// elsewhere.
pub fn resolve_campaign(
    index: &LookupIndex,
    name_norm: &str,
    portfolio_name_norm: Option<&str>,
    reference_date: NaiveDate,
) -> ResolvedId {
    if let Some(resolved) = resolve_dated(
        index.campaign_overrides_named(name_norm),
        reference_date,
        CandidateSource::Override,
    ) {
        return resolved;
    }

    let candidates = index.campaigns_named(name_norm);
    let portfolio_id = match portfolio_name_norm.map(|p| index.portfolio_ids_named(p)) {
        Some([only]) => Some(only.as_str()),
        _ => None,
    };
    let in_portfolio = |portfolio: &Option<String>| portfolio.as_deref() == portfolio_id;
    let narrow = portfolio_id.is_some() && candidates.iter().any(|c| in_portfolio(&c.portfolio_id));
    if let Some(resolved) = collapse(
        candidates
            .iter()
            .filter(|c| !narrow || in_portfolio(&c.portfolio_id))
            .map(|c| CandidateInfo::new(c.campaign_id.as_str(), CandidateSource::Snapshot)),
    ) {
        return resolved;
    }

    resolve_history(index.campaign_history_named(name_norm), reference_date)
}

/// Resolve an ad group by normalized name inside an already resolved campaign.
pub fn resolve_ad_group(
    index: &LookupIndex,
    campaign_id: &str,
    name_norm: &str,
    reference_date: NaiveDate,
) -> ResolvedId {
    if let Some(resolved) = resolve_dated(
        index.ad_group_overrides_named(name_norm),
        reference_date,
        CandidateSource::Override,
    ) {
        return within_parent(resolved, campaign_id, |id| {
            index.ad_group_by_id(id).map(|ag| ag.campaign_id.as_str())
        });
    }

    if let Some(resolved) = collapse(
        index
            .ad_groups_named(campaign_id, name_norm)
            .iter()
            .map(|ag| CandidateInfo::new(ag.ad_group_id.as_str(), CandidateSource::Snapshot)),
    ) {
        return resolved;
    }

    resolve_history(index.ad_group_history_named(campaign_id, name_norm), reference_date)
}

/// Resolve a target by composite key. Targets have no history fallback.
pub fn resolve_target(index: &LookupIndex, key: TargetKey<'_>, reference_date: NaiveDate) -> ResolvedId {
    if let Some(resolved) = resolve_dated(
        index.target_overrides_named(key.expression_norm),
        reference_date,
        CandidateSource::Override,
    ) {
        return within_parent(resolved, key.ad_group_id, |id| {
            index.target_by_id(id).map(|t| t.ad_group_id.as_str())
        });
    }

    collapse(
        index
            .targets_matching(key)
            .map(|t| CandidateInfo::new(t.target_id.as_str(), CandidateSource::Snapshot)),
    )
    .unwrap_or_else(ResolvedId::unmapped)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collapse candidates to distinct IDs (first occurrence per ID, ordered by
/// ID). `None` when there are no candidates at all.
fn collapse(candidates: impl Iterator<Item = CandidateInfo>) -> Option<ResolvedId> {
    let mut distinct: BTreeMap<String, CandidateInfo> = BTreeMap::new();
    for candidate in candidates {
        distinct.entry(candidate.id.clone()).or_insert(candidate);
    }
    match distinct.len() {
        0 => None,
        1 => distinct.into_keys().next().map(ResolvedId::Ok),
        _ => Some(ResolvedId::Ambiguous(distinct.into_values().collect())),
    }
}

/// Entries whose window covers `reference_date`, collapsed to distinct IDs.
fn resolve_dated(
    entries: &[DatedEntry],
    reference_date: NaiveDate,
    source: CandidateSource,
) -> Option<ResolvedId> {
    collapse(
        entries
            .iter()
            .filter(|e| is_within_range(reference_date, e.valid_from, e.valid_to))
            .map(|e| dated_candidate(e, source)),
    )
}

/// Last resort: history rows valid on `reference_date`. Rows outside their
/// window come back as near misses on `Unmapped`.
fn resolve_history(entries: &[DatedEntry], reference_date: NaiveDate) -> ResolvedId {
    resolve_dated(entries, reference_date, CandidateSource::History).unwrap_or_else(|| {
        let mut near_misses: Vec<CandidateInfo> = entries
            .iter()
            .map(|e| dated_candidate(e, CandidateSource::History))
            .collect();
        near_misses.sort_by(|a, b| a.id.cmp(&b.id).then(a.valid_from.cmp(&b.valid_from)));
        ResolvedId::Unmapped(near_misses)
    })
}

/// An override `Ok` whose entity the snapshot records under a different parent
/// becomes `Unmapped`. Ambiguous overrides are returned as they are.
fn within_parent<'i>(
    resolved: ResolvedId,
    parent_id: &str,
    recorded_parent: impl Fn(&str) -> Option<&'i str>,
) -> ResolvedId {
    match resolved {
        ResolvedId::Ok(id) => match recorded_parent(id.as_str()) {
            Some(recorded) if recorded != parent_id => {
                ResolvedId::Unmapped(vec![CandidateInfo::new(id, CandidateSource::Override)])
            }
            _ => ResolvedId::Ok(id),
        },
        other => other,
    }
}

fn dated_candidate(entry: &DatedEntry, source: CandidateSource) -> CandidateInfo {
    CandidateInfo::new(entry.entity_id.as_str(), source).with_window(entry.valid_from, entry.valid_to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        LookupTables, NameHistoryRow, OverrideRow, SnapshotAdGroup, SnapshotCampaign,
        SnapshotPortfolio, SnapshotTarget,
    };
    use crate::normalize::MatchType;

    const SNAP: &str = "2025-01-15";

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn campaign(id: &str, name: &str, portfolio: Option<&str>) -> SnapshotCampaign {
        SnapshotCampaign {
            snapshot_date: d(SNAP),
            campaign_id: id.into(),
            campaign_name: name.into(),
            portfolio_id: portfolio.map(Into::into),
        }
    }

    fn ad_group(id: &str, campaign_id: &str, name: &str) -> SnapshotAdGroup {
        SnapshotAdGroup {
            snapshot_date: d(SNAP),
            ad_group_id: id.into(),
            campaign_id: campaign_id.into(),
            ad_group_name: name.into(),
        }
    }

    fn target(id: &str, ad_group_id: &str, expr: &str, mt: MatchType, neg: bool) -> SnapshotTarget {
        SnapshotTarget {
            snapshot_date: d(SNAP),
            target_id: id.into(),
            ad_group_id: ad_group_id.into(),
            expression: expr.into(),
            match_type: mt,
            is_negative: neg,
        }
    }

    fn history(id: &str, parent: Option<&str>, name: &str, from: Option<&str>, to: Option<&str>) -> NameHistoryRow {
        NameHistoryRow {
            entity_id: id.into(),
            parent_id: parent.map(Into::into),
            name: name.into(),
            valid_from: from.map(d),
            valid_to: to.map(d),
        }
    }

    fn ovr(id: &str, name: &str, from: Option<&str>, to: Option<&str>) -> OverrideRow {
        OverrideRow {
            entity_id: id.into(),
            name: name.into(),
            valid_from: from.map(d),
            valid_to: to.map(d),
        }
    }

    fn build(tables: LookupTables) -> LookupIndex {
        LookupIndex::build(&tables, Some(d(SNAP)))
    }

    fn ids(candidates: &[CandidateInfo]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    // -- campaign ----------------------------------------------------------

    #[test]
    fn override_beats_snapshot_and_history() {
        let index = build(LookupTables {
            campaigns: vec![campaign("c_snap", "Brand", None)],
            campaign_history: vec![history("c_hist", None, "Brand", None, None)],
            campaign_overrides: vec![ovr("c_ovr", "Brand", None, None)],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2025-01-20")),
            ResolvedId::Ok("c_ovr".into())
        );
    }

    #[test]
    fn snapshot_beats_history() {
        let index = build(LookupTables {
            campaigns: vec![campaign("c_snap", "Brand", None)],
            campaign_history: vec![history("c_hist", None, "Brand", None, None)],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2025-01-20")),
            ResolvedId::Ok("c_snap".into())
        );
    }

    #[test]
    fn expired_override_falls_through() {
        let index = build(LookupTables {
            campaigns: vec![campaign("c_snap", "Brand", None)],
            campaign_overrides: vec![ovr("c_ovr", "Brand", Some("2024-01-01"), Some("2024-12-31"))],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2025-01-20")),
            ResolvedId::Ok("c_snap".into())
        );
    }

    #[test]
    fn ambiguous_override_stops_precedence() {
        let index = build(LookupTables {
            campaigns: vec![campaign("c_snap", "Brand", None)],
            campaign_overrides: vec![
                ovr("c_b", "Brand", None, None),
                ovr("c_a", "Brand", Some("2025-01-01"), None),
            ],
            ..LookupTables::default()
        });
        match resolve_campaign(&index, "brand", None, d("2025-01-20")) {
            ResolvedId::Ambiguous(candidates) => {
                assert_eq!(ids(&candidates), vec!["c_a", "c_b"]);
                assert!(candidates.iter().all(|c| c.source == CandidateSource::Override));
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_override_rows_collapse() {
        let index = build(LookupTables {
            campaign_overrides: vec![
                ovr("c1", "Brand", None, Some("2025-06-30")),
                ovr("c1", "Brand", Some("2025-01-01"), None),
            ],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2025-02-01")),
            ResolvedId::Ok("c1".into())
        );
    }

    #[test]
    fn snapshot_duplicates_are_ambiguous() {
        let index = build(LookupTables {
            campaigns: vec![
                campaign("c2", "Brand", Some("pf2")),
                campaign("c1", "Brand", Some("pf1")),
                campaign("c1", "Brand", Some("pf1")),
            ],
            campaign_history: vec![history("c_hist", None, "Brand", None, None)],
            ..LookupTables::default()
        });
        match resolve_campaign(&index, "brand", None, d("2025-01-20")) {
            ResolvedId::Ambiguous(candidates) => {
                assert_eq!(ids(&candidates), vec!["c1", "c2"]);
                assert!(candidates.iter().all(|c| c.source == CandidateSource::Snapshot));
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn portfolio_narrows_snapshot_candidates() {
        let tables = LookupTables {
            portfolios: vec![SnapshotPortfolio {
                snapshot_date: d(SNAP),
                portfolio_id: "pf1".into(),
                portfolio_name: "Brand Portfolio".into(),
            }],
            campaigns: vec![
                campaign("c1", "Brand", Some("pf1")),
                campaign("c2", "Brand", Some("pf2")),
            ],
            ..LookupTables::default()
        };
        let index = build(tables);
        assert_eq!(
            resolve_campaign(&index, "brand", Some("brand portfolio"), d("2025-01-20")),
            ResolvedId::Ok("c1".into())
        );
        // Unknown portfolio name: no narrowing.
        assert!(matches!(
            resolve_campaign(&index, "brand", Some("other"), d("2025-01-20")),
            ResolvedId::Ambiguous(_)
        ));
    }

    #[test]
    fn portfolio_with_no_matching_campaign_does_not_narrow() {
        let tables = LookupTables {
            portfolios: vec![SnapshotPortfolio {
                snapshot_date: d(SNAP),
                portfolio_id: "pf9".into(),
                portfolio_name: "Elsewhere".into(),
            }],
            campaigns: vec![campaign("c1", "Brand", Some("pf1"))],
            ..LookupTables::default()
        };
        let index = build(tables);
        assert_eq!(
            resolve_campaign(&index, "brand", Some("elsewhere"), d("2025-01-20")),
            ResolvedId::Ok("c1".into())
        );
    }

    #[test]
    fn ambiguous_portfolio_name_does_not_narrow() {
        let tables = LookupTables {
            portfolios: vec![
                SnapshotPortfolio {
                    snapshot_date: d(SNAP),
                    portfolio_id: "pf1".into(),
                    portfolio_name: "Twin".into(),
                },
                SnapshotPortfolio {
                    snapshot_date: d(SNAP),
                    portfolio_id: "pf2".into(),
                    portfolio_name: "Twin".into(),
                },
            ],
            campaigns: vec![
                campaign("c1", "Brand", Some("pf1")),
                campaign("c2", "Brand", Some("pf2")),
            ],
            ..LookupTables::default()
        };
        let index = build(tables);
        assert!(matches!(
            resolve_campaign(&index, "brand", Some("twin"), d("2025-01-20")),
            ResolvedId::Ambiguous(_)
        ));
    }

    #[test]
    fn history_respects_reference_date() {
        let index = build(LookupTables {
            campaign_history: vec![
                history("c_old", None, "Brand", Some("2024-01-01"), Some("2024-06-30")),
                history("c_new", None, "Brand", Some("2024-07-01"), None),
            ],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2024-03-01")),
            ResolvedId::Ok("c_old".into())
        );
        assert_eq!(
            resolve_campaign(&index, "brand", None, d("2025-01-20")),
            ResolvedId::Ok("c_new".into())
        );
    }

    #[test]
    fn overlapping_history_is_ambiguous_with_windows() {
        let index = build(LookupTables {
            campaign_history: vec![
                history("c1", None, "Brand", Some("2024-01-01"), None),
                history("c2", None, "Brand", None, Some("2025-12-31")),
            ],
            ..LookupTables::default()
        });
        match resolve_campaign(&index, "brand", None, d("2025-01-20")) {
            ResolvedId::Ambiguous(candidates) => {
                assert_eq!(ids(&candidates), vec!["c1", "c2"]);
                assert_eq!(candidates[0].valid_from, Some(d("2024-01-01")));
                assert_eq!(candidates[1].valid_to, Some(d("2025-12-31")));
                assert!(candidates.iter().all(|c| c.source == CandidateSource::History));
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn unmapped_carries_history_near_misses() {
        let index = build(LookupTables {
            campaign_history: vec![history("c_old", None, "Brand", None, Some("2024-06-30"))],
            ..LookupTables::default()
        });
        match resolve_campaign(&index, "brand", None, d("2025-01-20")) {
            ResolvedId::Unmapped(near) => assert_eq!(ids(&near), vec!["c_old"]),
            other => panic!("expected unmapped, got {other:?}"),
        }
        assert_eq!(
            resolve_campaign(&index, "nothing", None, d("2025-01-20")),
            ResolvedId::Unmapped(vec![])
        );
    }

    // -- ad group ----------------------------------------------------------

    #[test]
    fn ad_group_scoped_to_campaign() {
        let index = build(LookupTables {
            ad_groups: vec![ad_group("ag1", "c1", "Main"), ad_group("ag2", "c2", "Main")],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_ad_group(&index, "c1", "main", d("2025-01-20")),
            ResolvedId::Ok("ag1".into())
        );
        assert_eq!(
            resolve_ad_group(&index, "c2", "main", d("2025-01-20")),
            ResolvedId::Ok("ag2".into())
        );
        assert_eq!(
            resolve_ad_group(&index, "c3", "main", d("2025-01-20")),
            ResolvedId::Unmapped(vec![])
        );
    }

    #[test]
    fn ad_group_override_cannot_escape_campaign() {
        let index = build(LookupTables {
            ad_groups: vec![ad_group("ag2", "c2", "Other")],
            ad_group_overrides: vec![ovr("ag2", "Main", None, None)],
            ..LookupTables::default()
        });
        match resolve_ad_group(&index, "c1", "main", d("2025-01-20")) {
            ResolvedId::Unmapped(near) => {
                assert_eq!(ids(&near), vec!["ag2"]);
                assert_eq!(near[0].source, CandidateSource::Override);
            }
            other => panic!("expected unmapped, got {other:?}"),
        }
        assert_eq!(
            resolve_ad_group(&index, "c2", "main", d("2025-01-20")),
            ResolvedId::Ok("ag2".into())
        );
    }

    #[test]
    fn ad_group_override_unknown_to_snapshot_is_accepted() {
        let index = build(LookupTables {
            ad_group_overrides: vec![ovr("ag_new", "Main", None, None)],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_ad_group(&index, "c1", "main", d("2025-01-20")),
            ResolvedId::Ok("ag_new".into())
        );
    }

    #[test]
    fn ambiguous_ad_group_override_is_not_parent_checked() {
        let index = build(LookupTables {
            ad_groups: vec![ad_group("ag1", "c1", "X"), ad_group("ag2", "c2", "Y")],
            ad_group_overrides: vec![ovr("ag1", "Main", None, None), ovr("ag2", "Main", None, None)],
            ..LookupTables::default()
        });
        match resolve_ad_group(&index, "c1", "main", d("2025-01-20")) {
            ResolvedId::Ambiguous(candidates) => assert_eq!(ids(&candidates), vec!["ag1", "ag2"]),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn ad_group_history_scoped_to_campaign() {
        let index = build(LookupTables {
            ad_group_history: vec![
                history("ag_old", Some("c1"), "Main", None, Some("2025-12-31")),
                history("ag_else", Some("c2"), "Main", None, None),
            ],
            ..LookupTables::default()
        });
        assert_eq!(
            resolve_ad_group(&index, "c1", "main", d("2025-01-20")),
            ResolvedId::Ok("ag_old".into())
        );
    }

    // -- target ------------------------------------------------------------

    fn key<'a>(ad_group_id: &'a str, expr: &'a str, mt: MatchType, neg: bool) -> TargetKey<'a> {
        TargetKey {
            ad_group_id,
            expression_norm: expr,
            match_type: mt,
            is_negative: neg,
        }
    }

    #[test]
    fn target_resolved_by_composite_key() {
        let index = build(LookupTables {
            targets: vec![
                target("t1", "ag1", "running shoes", MatchType::Exact, false),
                target("t2", "ag1", "running shoes", MatchType::Phrase, true),
            ],
            ..LookupTables::default()
        });
        let date = d("2025-01-20");
        assert_eq!(
            resolve_target(&index, key("ag1", "running shoes", MatchType::Exact, false), date),
            ResolvedId::Ok("t1".into())
        );
        assert_eq!(
            resolve_target(&index, key("ag1", "running shoes", MatchType::Phrase, true), date),
            ResolvedId::Ok("t2".into())
        );
        assert_eq!(
            resolve_target(&index, key("ag1", "running shoes", MatchType::Broad, false), date),
            ResolvedId::Unmapped(vec![])
        );
    }

    #[test]
    fn target_override_parent_check() {
        let index = build(LookupTables {
            targets: vec![target("t9", "ag9", "other", MatchType::Exact, false)],
            target_overrides: vec![ovr("t9", "running shoes", None, None)],
            ..LookupTables::default()
        });
        let date = d("2025-01-20");
        assert!(matches!(
            resolve_target(&index, key("ag1", "running shoes", MatchType::Exact, false), date),
            ResolvedId::Unmapped(_)
        ));
        assert_eq!(
            resolve_target(&index, key("ag9", "running shoes", MatchType::Exact, false), date),
            ResolvedId::Ok("t9".into())
        );
    }

    #[test]
    fn ambiguous_target_override_is_not_parent_checked() {
        let index = build(LookupTables {
            targets: vec![
                target("t1", "ag1", "a", MatchType::Exact, false),
                target("t2", "ag2", "b", MatchType::Exact, false),
            ],
            target_overrides: vec![
                ovr("t1", "running shoes", None, None),
                ovr("t2", "running shoes", None, None),
            ],
            ..LookupTables::default()
        });
        // t2 lives under ag2, yet the pair is reported as it stands.
        match resolve_target(&index, key("ag1", "running shoes", MatchType::Exact, false), d("2025-01-20")) {
            ResolvedId::Ambiguous(candidates) => {
                assert_eq!(ids(&candidates), vec!["t1", "t2"]);
                assert!(candidates.iter().all(|c| c.source == CandidateSource::Override));
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_snapshot_target() {
        let index = build(LookupTables {
            targets: vec![
                target("t1", "ag1", "shoes", MatchType::Broad, false),
                target("t2", "ag1", "Shoes", MatchType::Broad, false),
            ],
            ..LookupTables::default()
        });
        assert!(matches!(
            resolve_target(&index, key("ag1", "shoes", MatchType::Broad, false), d("2025-01-20")),
            ResolvedId::Ambiguous(c) if c.len() == 2
        ));
    }
}
