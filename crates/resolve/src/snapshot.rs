use chrono::NaiveDate;

/// How far past the export date a bulk snapshot may be and still count as "as of" it.
pub const DEFAULT_FORWARD_WINDOW_DAYS: u32 = 7;

/// Pick the bulk snapshot that best represents `exported_date`, using the
/// default forward window.
pub fn pick_snapshot(exported_date: NaiveDate, available: &[NaiveDate]) -> Option<NaiveDate> {
    pick_snapshot_within(exported_date, available, DEFAULT_FORWARD_WINDOW_DAYS)
}

/// Latest snapshot on or before `exported_date`; failing that, the earliest
/// snapshot at most `forward_window_days` after it. `available` need not be sorted.
pub fn pick_snapshot_within(
    exported_date: NaiveDate,
    available: &[NaiveDate],
    forward_window_days: u32,
) -> Option<NaiveDate> {
    if let Some(latest) = available.iter().filter(|d| **d <= exported_date).max() {
        return Some(*latest);
    }
    available
        .iter()
        .filter(|d| (**d - exported_date).num_days() <= i64::from(forward_window_days))
        .min()
        .copied()
}
