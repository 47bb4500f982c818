//! Calendrier : Pâques (comput grégorien), Ascension, semaines ISO-8601.
//!
//! Fonctions pures, sans E/S. Correctes pour toute année grégorienne (>= 1583).

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// Première année du calendrier grégorien.
pub const FIRST_GREGORIAN_YEAR: i32 = 1583;

/// Note posée sur la semaine commune de l'Ascension.
pub const ASCENSION_NOTE: &str = "Kristi Himmelfart (Automatisk)";

/// Jour férié danois.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

/// Dimanche de Pâques (algorithme de Meeus/Jones/Butcher).
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    // month ∈ {3, 4}, day ∈ 1..=31 : toujours une date valide
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .unwrap_or(NaiveDate::MIN)
}

/// Jeudi de l'Ascension, 39 jours après Pâques.
pub fn ascension_date(year: i32) -> NaiveDate {
    easter_sunday(year) + Duration::days(39)
}

/// Numéro de semaine ISO contenant l'Ascension.
pub fn ascension_week(year: i32) -> u32 {
    ascension_date(year).iso_week().week()
}

/// 52 ou 53 : le 28 décembre tombe toujours dans la dernière semaine ISO.
pub fn weeks_in_iso_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

/// Lundi d'une semaine ISO, `None` si la semaine n'existe pas pour l'année.
pub fn week_start(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

pub fn is_valid_week(year: i32, week: u32) -> bool {
    (1..=weeks_in_iso_year(year)).contains(&week)
}

/// Jours fériés danois de l'année, triés par date.
pub fn danish_holidays(year: i32) -> Vec<Holiday> {
    let easter = easter_sunday(year);
    let offset = |days: i64, name: &'static str| Holiday {
        date: easter + Duration::days(days),
        name,
    };
    let fixed = |month: u32, day: u32, name: &'static str| {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Holiday { date, name })
    };

    let mut out: Vec<Holiday> = [
        fixed(1, 1, "Nytårsdag"),
        fixed(6, 5, "Grundlovsdag"),
        fixed(12, 25, "Juledag"),
        fixed(12, 26, "2. Juledag"),
    ]
    .into_iter()
    .flatten()
    .collect();

    out.push(offset(-3, "Skærtorsdag"));
    out.push(offset(-2, "Langfredag"));
    out.push(offset(0, "Påskedag"));
    out.push(offset(1, "2. Påskedag"));
    // Store Bededag supprimé à partir de 2024
    if year < 2024 {
        out.push(offset(26, "Store Bededag"));
    }
    out.push(Holiday {
        date: ascension_date(year),
        name: "Kristi Himmelfartsdag",
    });
    out.push(offset(49, "Pinsedag"));
    out.push(offset(50, "2. Pinsedag"));

    out.sort_by_key(|h| h.date);
    out
}
