use chrono::NaiveDate;

/// True when `date` falls inside `[valid_from, valid_to]`. A missing bound is
/// unbounded on that side.
pub fn is_within_range(
    date: NaiveDate,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
) -> bool {
    valid_from.map_or(true, |from| date >= from) && valid_to.map_or(true, |to| date <= to)
}
