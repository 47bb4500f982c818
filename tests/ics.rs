#![forbid(unsafe_code)]
use chrono::{TimeZone, Utc};
use weekshare::{
    holiday::ASCENSION_NOTE, ics::render_ics, AssignmentSource, CalendarEvent, Ledger, Share,
    WeekAssignment, WeekKind,
};

fn sample_ledger() -> Ledger {
    let fk = Share::new("Andel FK", "FK");
    let mut ledger = Ledger::default();
    ledger.assignments = vec![
        WeekAssignment {
            year: 2025,
            week: 22,
            kind: WeekKind::Common,
            note: Some(ASCENSION_NOTE.to_string()),
            is_locked: true,
            source: AssignmentSource::Generated,
        },
        WeekAssignment {
            year: 2025,
            week: 1,
            kind: WeekKind::Share {
                share_id: fk.id.clone(),
            },
            note: None,
            is_locked: false,
            source: AssignmentSource::Generated,
        },
    ];
    ledger.shares.push(fk);

    let mut event = CalendarEvent::new(
        "Arbejdsweekend".into(),
        "work".into(),
        Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap(),
        true,
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    event.id = "ev1".into();
    ledger.events.push(event);
    ledger.settings.include_holidays_in_ics = false;
    ledger
}

#[test]
fn weeks_and_events_snapshot() {
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let ics = render_ics(&sample_ledger(), 2025, now).unwrap();
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    let text = ics.replace("\r\n", "\n");
    insta::assert_snapshot!(text.trim_end(), @r"
    BEGIN:VCALENDAR
    VERSION:2.0
    PRODID:-//Weekshare//Kalender//DA
    X-WR-CALNAME:Weekshare
    BEGIN:VEVENT
    UID:week-2025-1@weekshare
    DTSTAMP:20250102T030405Z
    DTSTART;VALUE=DATE:20241230
    DTEND;VALUE=DATE:20250106
    SUMMARY:Uge 1 - Andel FK
    END:VEVENT
    BEGIN:VEVENT
    UID:week-2025-22@weekshare
    DTSTAMP:20250102T030405Z
    DTSTART;VALUE=DATE:20250526
    DTEND;VALUE=DATE:20250602
    SUMMARY:Uge 22 - FÆLLES
    DESCRIPTION:Kristi Himmelfart (Automatisk)
    END:VEVENT
    BEGIN:VEVENT
    UID:event-ev1@weekshare
    DTSTAMP:20250101T000000Z
    DTSTART;VALUE=DATE:20250614
    DTEND;VALUE=DATE:20250616
    SUMMARY:Arbejdsweekend
    END:VEVENT
    END:VCALENDAR
    ");
}

#[test]
fn holidays_only_when_enabled() {
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let mut ledger = Ledger::default();
    let ics = render_ics(&ledger, 2025, now).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 11);
    assert!(ics.contains("SUMMARY:Kristi Himmelfartsdag (Helligdag)\r\n"));
    assert!(ics.contains("DTSTART;VALUE=DATE:20250529\r\n"));

    ledger.settings.include_holidays_in_ics = false;
    let ics = render_ics(&ledger, 2025, now).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 0);
}

#[test]
fn week_assignments_can_be_left_out() {
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let mut ledger = sample_ledger();
    ledger.settings.include_week_assignments_in_ics = false;
    let ics = render_ics(&ledger, 2025, now).unwrap();
    assert!(!ics.contains("UID:week-"));
    assert!(ics.contains("UID:event-ev1@weekshare"));
}

#[test]
fn events_outside_year_are_skipped() {
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let ledger = sample_ledger();
    let ics = render_ics(&ledger, 2026, now).unwrap();
    assert!(!ics.contains("Arbejdsweekend"));
}
