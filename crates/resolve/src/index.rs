//! Immutable lookup index for one mapping pass.
//!
//! Built once from [`LookupTables`] for a chosen bulk snapshot date, then only
//! read. Every lookup takes borrowed keys and returns a slice, so resolving a
//! row allocates nothing in the index.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::model::{LookupTables, NameHistoryRow, OverrideRow};
use crate::normalize::{normalize_name, MatchType};

/// Most names map to one or two candidates.
type Bucket<T> = SmallVec<[T; 2]>;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignCandidate {
    pub campaign_id: String,
    pub portfolio_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdGroupCandidate {
    pub ad_group_id: String,
    pub campaign_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCandidate {
    pub target_id: String,
    pub ad_group_id: String,
    pub match_type: MatchType,
    pub is_negative: bool,
}

/// A name-history or override row reduced to what resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedEntry {
    pub entity_id: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl From<&NameHistoryRow> for DatedEntry {
    fn from(row: &NameHistoryRow) -> Self {
        Self {
            entity_id: row.entity_id.clone(),
            valid_from: row.valid_from,
            valid_to: row.valid_to,
        }
    }
}

impl From<&OverrideRow> for DatedEntry {
    fn from(row: &OverrideRow) -> Self {
        Self {
            entity_id: row.entity_id.clone(),
            valid_from: row.valid_from,
            valid_to: row.valid_to,
        }
    }
}

/// Composite target key: ad group + normalized expression + match type + negative flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetKey<'a> {
    pub ad_group_id: &'a str,
    pub expression_norm: &'a str,
    pub match_type: MatchType,
    pub is_negative: bool,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LookupIndex {
    snapshot_date: Option<NaiveDate>,

    campaigns_by_name: FxHashMap<String, Bucket<CampaignCandidate>>,
    campaigns_by_id: FxHashMap<String, CampaignCandidate>,
    portfolios_by_name: FxHashMap<String, Bucket<String>>,

    /// campaign_id → ad group name → candidates
    ad_groups_by_name: FxHashMap<String, FxHashMap<String, Bucket<AdGroupCandidate>>>,
    ad_groups_by_id: FxHashMap<String, AdGroupCandidate>,

    /// ad_group_id → expression → candidates (match type and negative flag
    /// complete the key at lookup time)
    targets_by_expression: FxHashMap<String, FxHashMap<String, Bucket<TargetCandidate>>>,
    targets_by_id: FxHashMap<String, TargetCandidate>,

    campaign_history: FxHashMap<String, Bucket<DatedEntry>>,
    /// campaign_id → ad group name → history rows
    ad_group_history: FxHashMap<String, FxHashMap<String, Bucket<DatedEntry>>>,

    campaign_overrides: FxHashMap<String, Bucket<DatedEntry>>,
    ad_group_overrides: FxHashMap<String, Bucket<DatedEntry>>,
    target_overrides: FxHashMap<String, Bucket<DatedEntry>>,
}

impl LookupIndex {
    /// Build the index from the rows of one bulk snapshot plus all history and
    /// override rows. With `snapshot_date = None` no snapshot candidates exist.
    pub fn build(tables: &LookupTables, snapshot_date: Option<NaiveDate>) -> Self {
        let mut index = Self {
            snapshot_date,
            ..Self::default()
        };
        let in_snapshot = |date: NaiveDate| Some(date) == snapshot_date;

        for row in tables.portfolios.iter().filter(|r| in_snapshot(r.snapshot_date)) {
            index
                .portfolios_by_name
                .entry(normalize_name(&row.portfolio_name))
                .or_default()
                .push(row.portfolio_id.clone());
        }

        for row in tables.campaigns.iter().filter(|r| in_snapshot(r.snapshot_date)) {
            let candidate = CampaignCandidate {
                campaign_id: row.campaign_id.clone(),
                portfolio_id: row.portfolio_id.clone(),
            };
            index
                .campaigns_by_id
                .entry(row.campaign_id.clone())
                .or_insert_with(|| candidate.clone());
            index
                .campaigns_by_name
                .entry(normalize_name(&row.campaign_name))
                .or_default()
                .push(candidate);
        }

        for row in tables.ad_groups.iter().filter(|r| in_snapshot(r.snapshot_date)) {
            let candidate = AdGroupCandidate {
                ad_group_id: row.ad_group_id.clone(),
                campaign_id: row.campaign_id.clone(),
            };
            index
                .ad_groups_by_id
                .entry(row.ad_group_id.clone())
                .or_insert_with(|| candidate.clone());
            index
                .ad_groups_by_name
                .entry(row.campaign_id.clone())
                .or_default()
                .entry(normalize_name(&row.ad_group_name))
                .or_default()
                .push(candidate);
        }

        for row in tables.targets.iter().filter(|r| in_snapshot(r.snapshot_date)) {
            let candidate = TargetCandidate {
                target_id: row.target_id.clone(),
                ad_group_id: row.ad_group_id.clone(),
                match_type: row.match_type,
                is_negative: row.is_negative,
            };
            index
                .targets_by_id
                .entry(row.target_id.clone())
                .or_insert_with(|| candidate.clone());
            index
                .targets_by_expression
                .entry(row.ad_group_id.clone())
                .or_default()
                .entry(normalize_name(&row.expression))
                .or_default()
                .push(candidate);
        }

        for row in &tables.campaign_history {
            index
                .campaign_history
                .entry(normalize_name(&row.name))
                .or_default()
                .push(DatedEntry::from(row));
        }

        let mut orphaned_history = 0usize;
        for row in &tables.ad_group_history {
            let Some(campaign_id) = row.parent_id.as_ref() else {
                orphaned_history += 1;
                continue;
            };
            index
                .ad_group_history
                .entry(campaign_id.clone())
                .or_default()
                .entry(normalize_name(&row.name))
                .or_default()
                .push(DatedEntry::from(row));
        }
        if orphaned_history > 0 {
            log::warn!("skipped {orphaned_history} ad-group history row(s) without a campaign id");
        }

        index_overrides(&mut index.campaign_overrides, &tables.campaign_overrides);
        index_overrides(&mut index.ad_group_overrides, &tables.ad_group_overrides);
        index_overrides(&mut index.target_overrides, &tables.target_overrides);

        log::debug!(
            "lookup index built: snapshot={:?} campaigns={} ad_groups={} targets={} history={}+{} overrides={}+{}+{}",
            snapshot_date,
            index.campaigns_by_id.len(),
            index.ad_groups_by_id.len(),
            index.targets_by_id.len(),
            tables.campaign_history.len(),
            tables.ad_group_history.len() - orphaned_history,
            tables.campaign_overrides.len(),
            tables.ad_group_overrides.len(),
            tables.target_overrides.len(),
        );

        index
    }

    pub fn snapshot_date(&self) -> Option<NaiveDate> {
        self.snapshot_date
    }

    // -- snapshot --------------------------------------------------------

    pub fn campaigns_named(&self, name_norm: &str) -> &[CampaignCandidate] {
        self.campaigns_by_name
            .get(name_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn campaign_by_id(&self, campaign_id: &str) -> Option<&CampaignCandidate> {
        self.campaigns_by_id.get(campaign_id)
    }

    pub fn portfolio_ids_named(&self, name_norm: &str) -> &[String] {
        self.portfolios_by_name
            .get(name_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn ad_groups_named(&self, campaign_id: &str, name_norm: &str) -> &[AdGroupCandidate] {
        self.ad_groups_by_name
            .get(campaign_id)
            .and_then(|by_name| by_name.get(name_norm))
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn ad_group_by_id(&self, ad_group_id: &str) -> Option<&AdGroupCandidate> {
        self.ad_groups_by_id.get(ad_group_id)
    }

    /// Snapshot targets matching every component of `key`.
    pub fn targets_matching(&self, key: TargetKey<'_>) -> impl Iterator<Item = &TargetCandidate> + '_ {
        let (match_type, is_negative) = (key.match_type, key.is_negative);
        self.targets_by_expression
            .get(key.ad_group_id)
            .and_then(|by_expr| by_expr.get(key.expression_norm))
            .map(|b| b.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(move |t| t.match_type == match_type && t.is_negative == is_negative)
    }

    pub fn target_by_id(&self, target_id: &str) -> Option<&TargetCandidate> {
        self.targets_by_id.get(target_id)
    }

    // -- history ---------------------------------------------------------

    pub fn campaign_history_named(&self, name_norm: &str) -> &[DatedEntry] {
        self.campaign_history
            .get(name_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn ad_group_history_named(&self, campaign_id: &str, name_norm: &str) -> &[DatedEntry] {
        self.ad_group_history
            .get(campaign_id)
            .and_then(|by_name| by_name.get(name_norm))
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    // -- overrides -------------------------------------------------------

    pub fn campaign_overrides_named(&self, name_norm: &str) -> &[DatedEntry] {
        self.campaign_overrides
            .get(name_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn ad_group_overrides_named(&self, name_norm: &str) -> &[DatedEntry] {
        self.ad_group_overrides
            .get(name_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn target_overrides_named(&self, expression_norm: &str) -> &[DatedEntry] {
        self.target_overrides
            .get(expression_norm)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }
}

fn index_overrides(map: &mut FxHashMap<String, Bucket<DatedEntry>>, rows: &[OverrideRow]) {
    for row in rows {
        map.entry(normalize_name(&row.name))
            .or_default()
            .push(DatedEntry::from(row));
    }
}
