use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::model::{CandidateInfo, EntityLevel, IssueType, MappingIssue};

/// Pass-scoped multiset of mapping issues.
///
/// Issues with the same (level, type, key) are one issue; adding it again
/// only grows `row_count`. Entries keep first-insertion order, so feeding the
/// same rows in the same order always yields the same list.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<MappingIssue>,
    positions: FxHashMap<String, usize>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one affected row.
    pub fn add_issue(
        &mut self,
        entity_level: EntityLevel,
        issue_type: IssueType,
        key: Value,
        candidates: Option<Vec<CandidateInfo>>,
    ) {
        self.add_issue_rows(entity_level, issue_type, key, candidates, 1);
    }

    /// Record `row_count` affected rows. Candidates of an existing entry are kept.
    pub fn add_issue_rows(
        &mut self,
        entity_level: EntityLevel,
        issue_type: IssueType,
        key: Value,
        candidates: Option<Vec<CandidateInfo>>,
        row_count: u64,
    ) {
        let dedup_key = dedup_key(entity_level, issue_type, &key);
        if let Some(&pos) = self.positions.get(&dedup_key) {
            self.issues[pos].row_count += row_count;
            return;
        }
        self.positions.insert(dedup_key, self.issues.len());
        self.issues.push(MappingIssue {
            entity_level,
            issue_type,
            key,
            candidates,
            row_count,
        });
    }

    /// Fold another pass's issues into this one, preserving this collector's order.
    pub fn merge(&mut self, other: IssueCollector) {
        for issue in other.issues {
            self.add_issue_rows(
                issue.entity_level,
                issue.issue_type,
                issue.key,
                issue.candidates,
                issue.row_count,
            );
        }
    }

    pub fn list(&self) -> &[MappingIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<MappingIssue> {
        self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Total rows affected by issues of this level and type.
    pub fn row_count(&self, entity_level: EntityLevel, issue_type: IssueType) -> u64 {
        self.issues
            .iter()
            .filter(|i| i.entity_level == entity_level && i.issue_type == issue_type)
            .map(|i| i.row_count)
            .sum()
    }
}

/// JSON array `[level, type, key]` with object fields written in sorted
/// order at every depth, whatever map ordering `serde_json` was built with.
fn dedup_key(entity_level: EntityLevel, issue_type: IssueType, key: &Value) -> String {
    let mut out = format!("[\"{entity_level}\",\"{issue_type}\",");
    write_canonical(key, &mut out);
    out.push(']');
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(name.as_str()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
