use super::{util, EngineError, GenerationReport, Scheduler};
use crate::holiday::{self, ASCENSION_NOTE};
use crate::model::{AssignmentSource, Ledger, ShareId, WeekAssignment, WeekKind};
use std::collections::HashMap;
use tracing::debug;

pub(super) fn generate_year(
    scheduler: &mut Scheduler,
    year: i32,
    anchor_index: Option<usize>,
) -> Result<GenerationReport, EngineError> {
    util::check_year(year)?;

    let rotation: Vec<ShareId> = scheduler.ledger.rotation().into_iter().cloned().collect();
    if rotation.is_empty() {
        return Err(EngineError::Configuration(
            "no rotation sequence defined".to_string(),
        ));
    }

    let anchor = anchor_index.unwrap_or(scheduler.ledger.settings.anchor_share_index);
    if anchor >= rotation.len() {
        return Err(EngineError::Validation(format!(
            "anchor index {anchor} outside 0..{}",
            rotation.len()
        )));
    }

    let ascension_week = holiday::ascension_week(year);
    let records = plan_year(&scheduler.ledger, year, &rotation, anchor, ascension_week);
    let generated_weeks = records.len();

    scheduler.atomically(|ledger| {
        for record in records {
            util::upsert(&mut ledger.assignments, record);
        }
        Ok(())
    })?;

    Ok(GenerationReport {
        year,
        generated_weeks,
        ascension_week,
    })
}

/// Calcule les lignes à écrire ; le pointeur de rotation reste local.
fn plan_year(
    ledger: &Ledger,
    year: i32,
    rotation: &[ShareId],
    anchor: usize,
    ascension_week: u32,
) -> Vec<WeekAssignment> {
    let existing: HashMap<u32, &WeekAssignment> = ledger
        .assignments
        .iter()
        .filter(|a| a.year == year)
        .map(|a| (a.week, a))
        .collect();

    let weeks = holiday::weeks_in_iso_year(year);
    let mut pointer = anchor;
    let mut out = Vec::with_capacity(weeks as usize);

    for week in 1..=weeks {
        if let Some(current) = existing.get(&week) {
            if current.is_protected() {
                debug!(year, week, source = current.source.as_str(), "skipping protected week");
                continue;
            }
        }

        if week == ascension_week {
            out.push(WeekAssignment {
                year,
                week,
                kind: WeekKind::Common,
                note: Some(ASCENSION_NOTE.to_string()),
                is_locked: true,
                source: AssignmentSource::Generated,
            });
            continue;
        }

        let share_id = rotation[pointer % rotation.len()].clone();
        out.push(WeekAssignment {
            year,
            week,
            kind: WeekKind::Share { share_id },
            note: None,
            is_locked: false,
            source: AssignmentSource::Generated,
        });
        pointer += 1;
    }

    out
}
