use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::MatchType;
use crate::summary::MappingSummary;

/// Sentinel `target_key` for search-term rollup rows (targeting expression `*`).
pub const ROLLUP_TARGET_KEY: &str = "__ROLLUP__";

/// Normalized targeting expression that marks a match-all rollup row.
pub const WILDCARD_TARGETING: &str = "*";

// ---------------------------------------------------------------------------
// Lookup tables (as handed over by the persistence layer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPortfolio {
    pub snapshot_date: NaiveDate,
    pub portfolio_id: String,
    pub portfolio_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCampaign {
    pub snapshot_date: NaiveDate,
    pub campaign_id: String,
    pub campaign_name: String,
    pub portfolio_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAdGroup {
    pub snapshot_date: NaiveDate,
    pub ad_group_id: String,
    pub campaign_id: String,
    pub ad_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTarget {
    pub snapshot_date: NaiveDate,
    pub target_id: String,
    pub ad_group_id: String,
    pub expression: String,
    pub match_type: MatchType,
    pub is_negative: bool,
}

/// A name an entity held during `[valid_from, valid_to]`.
///
/// `parent_id` is the owning campaign for ad-group history and `None` for
/// campaign history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameHistoryRow {
    pub entity_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Operator-asserted name → ID resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRow {
    pub entity_id: String,
    pub name: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Everything the index builder needs: dated bulk snapshot rows plus the full
/// history and override tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupTables {
    #[serde(default)]
    pub portfolios: Vec<SnapshotPortfolio>,
    #[serde(default)]
    pub campaigns: Vec<SnapshotCampaign>,
    #[serde(default)]
    pub ad_groups: Vec<SnapshotAdGroup>,
    #[serde(default)]
    pub targets: Vec<SnapshotTarget>,
    #[serde(default)]
    pub campaign_history: Vec<NameHistoryRow>,
    #[serde(default)]
    pub ad_group_history: Vec<NameHistoryRow>,
    #[serde(default)]
    pub campaign_overrides: Vec<OverrideRow>,
    #[serde(default)]
    pub ad_group_overrides: Vec<OverrideRow>,
    #[serde(default)]
    pub target_overrides: Vec<OverrideRow>,
}

impl LookupTables {
    /// Distinct bulk snapshot dates present in any snapshot table, ascending.
    pub fn snapshot_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .portfolios
            .iter()
            .map(|r| r.snapshot_date)
            .chain(self.campaigns.iter().map(|r| r.snapshot_date))
            .chain(self.ad_groups.iter().map(|r| r.snapshot_date))
            .chain(self.targets.iter().map(|r| r.snapshot_date))
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}

// ---------------------------------------------------------------------------
// Resolution outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Override,
    Snapshot,
    History,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Snapshot => write!(f, "snapshot"),
            Self::History => write!(f, "history"),
        }
    }
}

/// One matching possibility, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub id: String,
    pub source: CandidateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
}

impl CandidateInfo {
    pub fn new(id: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            id: id.into(),
            source,
            valid_from: None,
            valid_to: None,
        }
    }

    pub fn with_window(mut self, valid_from: Option<NaiveDate>, valid_to: Option<NaiveDate>) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }
}

/// Outcome of resolving one name at one level.
///
/// `Ambiguous` always holds at least two distinct IDs. `Unmapped` may hold
/// near-miss candidates (e.g. history rows outside their window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedId {
    Ok(String),
    Ambiguous(Vec<CandidateInfo>),
    Unmapped(Vec<CandidateInfo>),
}

impl ResolvedId {
    pub fn unmapped() -> Self {
        Self::Unmapped(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    /// Pass-level conditions (missing bulk snapshot).
    Account,
    Campaign,
    AdGroup,
    Target,
}

impl std::fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Campaign => write!(f, "campaign"),
            Self::AdGroup => write!(f, "ad_group"),
            Self::Target => write!(f, "target"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Unmapped,
    Ambiguous,
    MissingBulkSnapshot,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmapped => write!(f, "unmapped"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::MissingBulkSnapshot => write!(f, "missing_bulk_snapshot"),
        }
    }
}

/// A deduplicated "could not resolve" diagnostic.
///
/// `key` is a JSON object of the lookup inputs, never free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingIssue {
    pub entity_level: EntityLevel,
    pub issue_type: IssueType,
    pub key: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateInfo>>,
    pub row_count: u64,
}

// ---------------------------------------------------------------------------
// Report rows (already parsed upstream)
// ---------------------------------------------------------------------------

/// Metric columns carried through to facts unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub sales: f64,
    #[serde(default)]
    pub orders: u64,
    #[serde(default)]
    pub units: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    pub date: NaiveDate,
    pub campaign_name: String,
    pub campaign_name_norm: String,
    #[serde(default)]
    pub portfolio_name_norm: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRow {
    pub date: NaiveDate,
    pub campaign_name: String,
    pub campaign_name_norm: String,
    #[serde(default)]
    pub portfolio_name_norm: Option<String>,
    pub placement: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRow {
    pub date: NaiveDate,
    pub campaign_name: String,
    pub campaign_name_norm: String,
    #[serde(default)]
    pub portfolio_name_norm: Option<String>,
    pub ad_group_name: String,
    pub ad_group_name_norm: String,
    pub targeting: String,
    pub targeting_norm: String,
    pub match_type_raw: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTermRow {
    pub date: NaiveDate,
    pub campaign_name: String,
    pub campaign_name_norm: String,
    #[serde(default)]
    pub portfolio_name_norm: Option<String>,
    pub ad_group_name: String,
    pub ad_group_name_norm: String,
    pub targeting: String,
    pub targeting_norm: String,
    pub match_type_raw: String,
    pub customer_search_term: String,
    pub customer_search_term_norm: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// One uploaded report, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum Report {
    Campaign(Vec<CampaignRow>),
    Placement(Vec<PlacementRow>),
    Targeting(Vec<TargetingRow>),
    SearchTerm(Vec<SearchTermRow>),
}

impl Report {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Campaign(_) => "campaign",
            Self::Placement(_) => "placement",
            Self::Targeting(_) => "targeting",
            Self::SearchTerm(_) => "search_term",
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Campaign(rows) => rows.len(),
            Self::Placement(rows) => rows.len(),
            Self::Targeting(rows) => rows.len(),
            Self::SearchTerm(rows) => rows.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pass parameters + facts
// ---------------------------------------------------------------------------

/// Static parameters of one mapping pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassParams {
    pub upload_id: String,
    pub account_id: String,
    /// ISO timestamp of the report export, stamped onto every fact.
    pub exported_at: String,
    /// Date every validity window is evaluated against.
    pub reference_date: NaiveDate,
}

impl PassParams {
    pub fn stamp(&self) -> PassStamp {
        PassStamp {
            upload_id: self.upload_id.clone(),
            account_id: self.account_id.clone(),
            exported_at: self.exported_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassStamp {
    pub upload_id: String,
    pub account_id: String,
    pub exported_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignFact {
    #[serde(flatten)]
    pub row: CampaignRow,
    #[serde(flatten)]
    pub stamp: PassStamp,
    pub campaign_id: String,
    pub portfolio_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementFact {
    #[serde(flatten)]
    pub row: PlacementRow,
    #[serde(flatten)]
    pub stamp: PassStamp,
    pub campaign_id: String,
    pub portfolio_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetingFact {
    #[serde(flatten)]
    pub row: TargetingRow,
    #[serde(flatten)]
    pub stamp: PassStamp,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub target_id: String,
    pub match_type_norm: MatchType,
    pub is_negative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchTermFact {
    #[serde(flatten)]
    pub row: SearchTermRow,
    #[serde(flatten)]
    pub stamp: PassStamp,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub target_id: Option<String>,
    pub target_key: String,
    pub match_type_norm: MatchType,
    pub is_negative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum ReportFacts {
    Campaign(Vec<CampaignFact>),
    Placement(Vec<PlacementFact>),
    Targeting(Vec<TargetingFact>),
    SearchTerm(Vec<SearchTermFact>),
}

impl ReportFacts {
    pub fn len(&self) -> usize {
        match self {
            Self::Campaign(facts) => facts.len(),
            Self::Placement(facts) => facts.len(),
            Self::Targeting(facts) => facts.len(),
            Self::SearchTerm(facts) => facts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Pass output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MappingResult {
    pub meta: MappingMeta,
    pub summary: MappingSummary,
    pub facts: ReportFacts,
    pub issues: Vec<MappingIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingMeta {
    pub config_name: String,
    pub report_kind: String,
    pub upload_id: String,
    pub account_id: String,
    pub engine_version: String,
    pub reference_date: NaiveDate,
    pub exported_date: NaiveDate,
    pub snapshot_date: Option<NaiveDate>,
}
