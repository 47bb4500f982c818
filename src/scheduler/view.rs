use super::{util, AssignmentView, CalendarView, CalendarWeek, EngineError, ShareRef};
use crate::holiday;
use crate::model::{CalendarEvent, Ledger, WeekAssignment};
use chrono::{TimeZone, Utc};

pub(super) fn calendar(ledger: &Ledger, year: i32) -> Result<CalendarView, EngineError> {
    util::check_year(year)?;
    let weeks_in_year = holiday::weeks_in_iso_year(year);

    let mut weeks = Vec::with_capacity(weeks_in_year as usize);
    for week in 1..=weeks_in_year {
        let starts_on = holiday::week_start(year, week).ok_or_else(|| {
            EngineError::Validation(format!("week {week} does not exist in {year}"))
        })?;
        weeks.push(CalendarWeek {
            week,
            starts_on,
            assignment: ledger
                .find_assignment(year, week)
                .map(|a| assignment_view(ledger, a)),
        });
    }

    Ok(CalendarView {
        year,
        weeks_in_year,
        ascension_week: holiday::ascension_week(year),
        weeks,
        events: events_around(ledger, year),
        holidays: holiday::danish_holidays(year),
    })
}

/// Les semaines ISO débordent sur les années voisines : marge de quelques jours.
fn events_around(ledger: &Ledger, year: i32) -> Vec<CalendarEvent> {
    let (Some(from), Some(to)) = (
        Utc.with_ymd_and_hms(year - 1, 12, 20, 0, 0, 0).single(),
        Utc.with_ymd_and_hms(year + 1, 1, 10, 0, 0, 0).single(),
    ) else {
        return Vec::new();
    };
    let mut events: Vec<CalendarEvent> = ledger
        .events
        .iter()
        .filter(|e| e.start >= from && e.end <= to)
        .cloned()
        .collect();
    events.sort_by(|a, b| a.start.cmp(&b.start));
    events
}

fn assignment_view(ledger: &Ledger, a: &WeekAssignment) -> AssignmentView {
    let share = a
        .kind
        .share_id()
        .and_then(|id| ledger.find_share(id))
        .map(|s| ShareRef {
            id: s.id.clone(),
            code: s.code.clone(),
            name: s.name.clone(),
            color: s.color.clone(),
        });
    AssignmentView {
        kind: a.kind.type_name(),
        share,
        note: a.note.clone(),
        is_locked: a.is_locked,
        source: a.source.as_str(),
    }
}
