use crate::holiday::Holiday;
use crate::model::{CalendarEvent, ShareId, WeekKind};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Résultat d'une génération d'année, affiché à l'administrateur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub year: i32,
    pub generated_weeks: usize,
    pub ascension_week: u32,
}

/// Modification manuelle d'une semaine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekPatch {
    pub year: i32,
    pub week: u32,
    pub kind: WeekKind,
    /// `None` conserve la note existante.
    pub note: Option<String>,
}

/// Proposition d'échange : le demandeur cède `week_a` contre `week_b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapProposal {
    pub requesting: ShareId,
    pub receiving: ShareId,
    pub year: i32,
    pub week_a: u32,
    pub week_b: u32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRef {
    pub id: ShareId,
    pub code: String,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub share: Option<ShareRef>,
    pub note: Option<String>,
    pub is_locked: bool,
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarWeek {
    pub week: u32,
    pub starts_on: NaiveDate,
    pub assignment: Option<AssignmentView>,
}

/// Vue en lecture seule d'une année complète.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub year: i32,
    pub weeks_in_year: u32,
    pub ascension_week: u32,
    pub weeks: Vec<CalendarWeek>,
    /// Événements compris entre le 20 décembre précédent et le 10 janvier suivant.
    pub events: Vec<CalendarEvent>,
    pub holidays: Vec<Holiday>,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("week {week} of {year} is locked and cannot be modified")]
    Locked { year: i32, week: u32 },
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
