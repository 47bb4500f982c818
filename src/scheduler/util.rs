use super::EngineError;
use crate::holiday::{self, FIRST_GREGORIAN_YEAR};
use crate::model::{Ledger, Share, ShareId, WeekAssignment};

/// Bornes supportées par chrono pour `from_isoywd_opt` et l'affichage.
const LAST_SUPPORTED_YEAR: i32 = 9999;

pub(super) fn check_year(year: i32) -> Result<(), EngineError> {
    if !(FIRST_GREGORIAN_YEAR..=LAST_SUPPORTED_YEAR).contains(&year) {
        return Err(EngineError::Validation(format!(
            "year {year} outside {FIRST_GREGORIAN_YEAR}..={LAST_SUPPORTED_YEAR}"
        )));
    }
    Ok(())
}

pub(super) fn check_week(year: i32, week: u32) -> Result<(), EngineError> {
    check_year(year)?;
    if !holiday::is_valid_week(year, week) {
        return Err(EngineError::Validation(format!(
            "week {week} does not exist in ISO year {year} (1..={})",
            holiday::weeks_in_iso_year(year)
        )));
    }
    Ok(())
}

pub(super) fn require_share<'a>(ledger: &'a Ledger, id: &ShareId) -> Result<&'a Share, EngineError> {
    ledger
        .find_share(id)
        .ok_or_else(|| EngineError::NotFound(format!("unknown share: {}", id.as_str())))
}

pub(super) fn find_assignment_index(
    assignments: &[WeekAssignment],
    year: i32,
    week: u32,
) -> Option<usize> {
    assignments
        .iter()
        .position(|a| a.year == year && a.week == week)
}

/// Remplace ou insère la ligne (year, week).
pub(super) fn upsert(assignments: &mut Vec<WeekAssignment>, record: WeekAssignment) {
    match find_assignment_index(assignments, record.year, record.week) {
        Some(pos) => assignments[pos] = record,
        None => assignments.push(record),
    }
}
