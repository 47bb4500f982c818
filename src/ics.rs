//! Export iCalendar (RFC 5545) : semaines assignées, événements, jours fériés.

use crate::holiday;
use crate::model::{Ledger, WeekAssignment, WeekKind};
use crate::scheduler::EngineError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

const UID_DOMAIN: &str = "weekshare";
const MAX_LINE_OCTETS: usize = 75;

/// Rend l'année `year` en texte ICS (lignes séparées par CRLF).
pub fn render_ics(ledger: &Ledger, year: i32, now: DateTime<Utc>) -> Result<String, EngineError> {
    if year < holiday::FIRST_GREGORIAN_YEAR {
        return Err(EngineError::Validation(format!("year {year} not supported")));
    }
    let stamp = format_stamp(now);
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        "PRODID:-//Weekshare//Kalender//DA".into(),
        "X-WR-CALNAME:Weekshare".into(),
    ];

    if ledger.settings.include_week_assignments_in_ics {
        for assignment in ledger.assignments_for_year(year) {
            let Some(start) = holiday::week_start(year, assignment.week) else {
                continue;
            };
            lines.push("BEGIN:VEVENT".into());
            lines.push(format!("UID:week-{year}-{}@{UID_DOMAIN}", assignment.week));
            lines.push(format!("DTSTAMP:{stamp}"));
            lines.push(format!("DTSTART;VALUE=DATE:{}", format_date(start)));
            lines.push(format!(
                "DTEND;VALUE=DATE:{}",
                format_date(start + Duration::days(7))
            ));
            lines.push(format!("SUMMARY:{}", escape(&week_summary(ledger, assignment))));
            if let Some(note) = &assignment.note {
                lines.push(format!("DESCRIPTION:{}", escape(note)));
            }
            lines.push("END:VEVENT".into());
        }
    }

    let mut events: Vec<_> = ledger
        .events
        .iter()
        .filter(|e| e.start.year() == year && e.end.year() == year)
        .collect();
    events.sort_by_key(|e| e.start);
    for event in events {
        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:event-{}@{UID_DOMAIN}", event.id));
        lines.push(format!("DTSTAMP:{}", format_stamp(event.created_at)));
        if event.all_day {
            let last_day = event.end.date_naive() + Duration::days(1);
            lines.push(format!(
                "DTSTART;VALUE=DATE:{}",
                format_date(event.start.date_naive())
            ));
            lines.push(format!("DTEND;VALUE=DATE:{}", format_date(last_day)));
        } else {
            lines.push(format!("DTSTART:{}", format_stamp(event.start)));
            lines.push(format!("DTEND:{}", format_stamp(event.end)));
        }
        lines.push(format!("SUMMARY:{}", escape(&event.title)));
        if let Some(description) = &event.description {
            lines.push(format!("DESCRIPTION:{}", escape(description)));
        }
        lines.push("END:VEVENT".into());
    }

    if ledger.settings.include_holidays_in_ics {
        for (index, h) in holiday::danish_holidays(year).iter().enumerate() {
            lines.push("BEGIN:VEVENT".into());
            lines.push(format!("UID:holiday-{year}-{index}@{UID_DOMAIN}"));
            lines.push(format!("DTSTAMP:{stamp}"));
            lines.push(format!("DTSTART;VALUE=DATE:{}", format_date(h.date)));
            lines.push(format!(
                "DTEND;VALUE=DATE:{}",
                format_date(h.date + Duration::days(1))
            ));
            lines.push(format!("SUMMARY:{} (Helligdag)", escape(h.name)));
            lines.push("END:VEVENT".into());
        }
    }

    lines.push("END:VCALENDAR".into());
    let mut out = lines.iter().map(|l| fold(l)).collect::<Vec<_>>().join("\r\n");
    out.push_str("\r\n");
    Ok(out)
}

fn week_summary(ledger: &Ledger, assignment: &WeekAssignment) -> String {
    let week = assignment.week;
    match &assignment.kind {
        WeekKind::Share { share_id } => match ledger.find_share(share_id) {
            Some(share) => format!("Uge {week} - Andel {}", share.label()),
            None => format!("Uge {week} - SHARE"),
        },
        WeekKind::Common => format!("Uge {week} - FÆLLES"),
        other => format!("Uge {week} - {}", other.type_name()),
    }
}

fn format_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Pliage à 75 octets (RFC 5545 §3.1) sans couper un caractère UTF-8 ;
/// chaque suite commence par une espace.
fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 3 * (line.len() / MAX_LINE_OCTETS));
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}

/// Échappement des valeurs TEXT (RFC 5545 §3.3.11).
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}
