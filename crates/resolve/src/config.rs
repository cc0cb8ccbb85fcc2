use serde::Deserialize;

use crate::error::MappingError;
use crate::snapshot::DEFAULT_FORWARD_WINDOW_DAYS;

/// Upper bound for `snapshot.forward_window_days`.
const MAX_FORWARD_WINDOW_DAYS: u32 = 31;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    pub name: String,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub tables: TableFiles,
}

// ---------------------------------------------------------------------------
// Snapshot picking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// How many days after the export date a bulk snapshot may be taken.
    #[serde(default = "default_forward_window_days")]
    pub forward_window_days: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            forward_window_days: DEFAULT_FORWARD_WINDOW_DAYS,
        }
    }
}

fn default_forward_window_days() -> u32 {
    DEFAULT_FORWARD_WINDOW_DAYS
}

// ---------------------------------------------------------------------------
// Lookup table files
// ---------------------------------------------------------------------------

/// CSV file names of the lookup tables, relative to the table directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableFiles {
    pub portfolios: String,
    pub campaigns: String,
    pub ad_groups: String,
    pub targets: String,
    pub campaign_history: String,
    pub ad_group_history: String,
    pub campaign_overrides: String,
    pub ad_group_overrides: String,
    pub target_overrides: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            portfolios: "bulk_portfolios.csv".into(),
            campaigns: "bulk_campaigns.csv".into(),
            ad_groups: "bulk_ad_groups.csv".into(),
            targets: "bulk_targets.csv".into(),
            campaign_history: "campaign_name_history.csv".into(),
            ad_group_history: "ad_group_name_history.csv".into(),
            campaign_overrides: "campaign_overrides.csv".into(),
            ad_group_overrides: "ad_group_overrides.csv".into(),
            target_overrides: "target_overrides.csv".into(),
        }
    }
}

impl TableFiles {
    /// (table name, file name) pairs in load order.
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("portfolios", self.portfolios.as_str()),
            ("campaigns", self.campaigns.as_str()),
            ("ad_groups", self.ad_groups.as_str()),
            ("targets", self.targets.as_str()),
            ("campaign_history", self.campaign_history.as_str()),
            ("ad_group_history", self.ad_group_history.as_str()),
            ("campaign_overrides", self.campaign_overrides.as_str()),
            ("ad_group_overrides", self.ad_group_overrides.as_str()),
            ("target_overrides", self.target_overrides.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            snapshot: SnapshotConfig::default(),
            tables: TableFiles::default(),
        }
    }
}

impl MappingConfig {
    pub fn from_toml(input: &str) -> Result<Self, MappingError> {
        let config: MappingConfig =
            toml::from_str(input).map_err(|e| MappingError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MappingError> {
        if self.name.trim().is_empty() {
            return Err(MappingError::ConfigValidation("name must not be empty".into()));
        }

        if self.snapshot.forward_window_days > MAX_FORWARD_WINDOW_DAYS {
            return Err(MappingError::ConfigValidation(format!(
                "snapshot.forward_window_days must be at most {MAX_FORWARD_WINDOW_DAYS}, got {}",
                self.snapshot.forward_window_days
            )));
        }

        for (table, file) in self.tables.entries() {
            if file.trim().is_empty() {
                return Err(MappingError::ConfigValidation(format!(
                    "tables.{table}: file name must not be empty"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
