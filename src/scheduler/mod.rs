mod assignment;
mod mutate;
mod swap;
mod types;
mod util;
mod view;

pub use mutate::DEFAULT_SHARE_CODES;
pub use types::{
    AssignmentView, CalendarView, CalendarWeek, EngineError, GenerationReport, ShareRef,
    SwapProposal, WeekPatch,
};

use crate::model::{
    CalendarEvent, CalendarSettings, Ledger, Share, ShareId, SwapId, SwapRequest, WeekAssignment,
};
use chrono::{DateTime, Utc};

/// Scheduler : encapsule un Ledger et applique les règles d'allocation.
///
/// Chaque opération mutante travaille sur une copie : en cas d'erreur, le
/// Ledger reste exactement dans son état précédent.
#[derive(Debug, Default)]
pub struct Scheduler {
    ledger: Ledger,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            ledger: Ledger::default(),
        }
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Lecture seule : toute écriture passe par les opérations, qui appliquent les verrous.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, EngineError>,
    {
        let mut working = self.ledger.clone();
        let out = f(&mut working)?;
        self.ledger = working;
        Ok(out)
    }

    /// Génère (ou rafraîchit) toutes les semaines ISO de `year`.
    pub fn generate_year(
        &mut self,
        year: i32,
        anchor_index: Option<usize>,
    ) -> Result<GenerationReport, EngineError> {
        assignment::generate_year(self, year, anchor_index)
    }

    /// Remplace toute la séquence de rotation ; positions 0..N-1.
    pub fn replace_sequence(&mut self, ordered: &[ShareId]) -> Result<(), EngineError> {
        mutate::replace_sequence(self, ordered)
    }

    /// Modification administrative ; refusée si la semaine est verrouillée.
    pub fn patch_week(&mut self, patch: WeekPatch) -> Result<WeekAssignment, EngineError> {
        mutate::patch_week(self, patch)
    }

    pub fn add_share(&mut self, share: Share) -> Result<ShareId, EngineError> {
        mutate::add_share(self, share)
    }

    pub fn rename_share(&mut self, id: &ShareId, name: &str) -> Result<(), EngineError> {
        mutate::rename_share(self, id, name)
    }

    /// Retourne `false` si une séquence existait déjà.
    pub fn seed_default_shares(&mut self) -> Result<bool, EngineError> {
        mutate::seed_default_shares(self)
    }

    pub fn add_event(&mut self, event: CalendarEvent) -> Result<String, EngineError> {
        mutate::add_event(self, event)
    }

    pub fn remove_event(&mut self, id: &str) -> Result<(), EngineError> {
        mutate::remove_event(self, id)
    }

    pub fn update_settings(&mut self, settings: CalendarSettings) -> Result<(), EngineError> {
        mutate::update_settings(self, settings)
    }

    pub fn propose_swap(
        &mut self,
        acting: &ShareId,
        proposal: SwapProposal,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        swap::propose(self, acting, proposal, now)
    }

    pub fn accept_swap(
        &mut self,
        swap_id: &SwapId,
        acting: &ShareId,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        swap::accept(self, swap_id, acting, now)
    }

    pub fn reject_swap(
        &mut self,
        swap_id: &SwapId,
        acting: &ShareId,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        swap::reject(self, swap_id, acting, now)
    }

    pub fn post_swap_message(
        &mut self,
        swap_id: &SwapId,
        acting: &ShareId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        swap::post_message(self, swap_id, acting, content, now)
    }

    /// Lecture pure : une entrée par semaine ISO, assignée ou non.
    pub fn calendar(&self, year: i32) -> Result<CalendarView, EngineError> {
        view::calendar(&self.ledger, year)
    }
}

/// Vue calendrier directement depuis un ledger chargé.
pub fn calendar_view(ledger: &Ledger, year: i32) -> Result<CalendarView, EngineError> {
    view::calendar(ledger, year)
}
