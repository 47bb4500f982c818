//! Service transactionnel : une opération = chargement, mutation, sauvegarde
//! atomique, le tout sous un verrou. Une erreur n'écrit rien.

use crate::ics;
use crate::model::{CalendarEvent, CalendarSettings, Ledger, Share, ShareId, SwapId, SwapRequest, WeekAssignment};
use crate::notification::{prepare_notice, NoopNotifier, SwapEvent, SwapNotice, SwapNotifier, TextSwapNotice};
use crate::scheduler::{calendar_view, CalendarView, EngineError, GenerationReport, Scheduler, SwapProposal, WeekPatch};
use crate::storage::Storage;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub struct WeekService<S: Storage> {
    storage: S,
    gate: Mutex<()>,
    notifier: Box<dyn SwapNotifier + Send + Sync>,
}

impl<S: Storage> WeekService<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            gate: Mutex::new(()),
            notifier: Box::new(NoopNotifier),
        }
    }

    pub fn with_notifier<N: SwapNotifier + Send + Sync + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, EngineError> {
        self.gate
            .lock()
            .map_err(|_| EngineError::Persistence(anyhow!("service lock poisoned")))
    }

    /// Relit l'état sous le verrou (processus et support), applique `f`, puis sauvegarde.
    fn transact<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Scheduler) -> Result<T, EngineError>,
    {
        let _guard = self.lock()?;
        self.storage
            .exclusive(|| -> Result<T, EngineError> {
                let ledger = self.storage.load().context("loading ledger")?;
                let mut scheduler = Scheduler::from_ledger(ledger);
                let out = f(&mut scheduler)?;
                self.storage
                    .save(scheduler.ledger())
                    .context("saving ledger")?;
                Ok(out)
            })
            .context("locking store")?
    }

    fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Ledger) -> Result<T, EngineError>,
    {
        let _guard = self.lock()?;
        let ledger = self.storage.load().context("loading ledger")?;
        f(&ledger)
    }

    fn deliver(&self, notice: Option<SwapNotice>) {
        let Some(notice) = notice else {
            return;
        };
        if let Err(err) = self.notifier.notify(&notice) {
            warn!(swap = notice.swap.id.as_str(), error = %err, "swap notification failed");
        }
    }

    pub fn generate_year(
        &self,
        year: i32,
        anchor_index: Option<usize>,
    ) -> Result<GenerationReport, EngineError> {
        let report = self.transact(|s| s.generate_year(year, anchor_index))?;
        info!(
            year = report.year,
            generated = report.generated_weeks,
            ascension_week = report.ascension_week,
            "year generated"
        );
        Ok(report)
    }

    pub fn replace_sequence(&self, ordered: &[ShareId]) -> Result<(), EngineError> {
        self.transact(|s| s.replace_sequence(ordered))?;
        info!(length = ordered.len(), "rotation sequence replaced");
        Ok(())
    }

    pub fn patch_week(&self, patch: WeekPatch) -> Result<WeekAssignment, EngineError> {
        let record = self.transact(|s| s.patch_week(patch))?;
        info!(year = record.year, week = record.week, kind = record.kind.type_name(), "week patched");
        Ok(record)
    }

    pub fn propose_swap(
        &self,
        acting: &ShareId,
        proposal: SwapProposal,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        let (swap, notice) = self.transact(|s| {
            let swap = s.propose_swap(acting, proposal, now)?;
            let notice = prepare_notice(s.ledger(), SwapEvent::Proposed, &swap, &TextSwapNotice);
            Ok((swap, notice))
        })?;
        info!(swap = swap.id.as_str(), year = swap.year, week_a = swap.week_a, week_b = swap.week_b, "swap proposed");
        self.deliver(notice);
        Ok(swap)
    }

    pub fn accept_swap(
        &self,
        swap_id: &SwapId,
        acting: &ShareId,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        let (swap, notice) = self.transact(|s| {
            let swap = s.accept_swap(swap_id, acting, now)?;
            let notice = prepare_notice(s.ledger(), SwapEvent::Accepted, &swap, &TextSwapNotice);
            Ok((swap, notice))
        })?;
        info!(swap = swap.id.as_str(), "swap accepted");
        self.deliver(notice);
        Ok(swap)
    }

    pub fn reject_swap(
        &self,
        swap_id: &SwapId,
        acting: &ShareId,
        now: DateTime<Utc>,
    ) -> Result<SwapRequest, EngineError> {
        let (swap, notice) = self.transact(|s| {
            let swap = s.reject_swap(swap_id, acting, now)?;
            let notice = prepare_notice(s.ledger(), SwapEvent::Rejected, &swap, &TextSwapNotice);
            Ok((swap, notice))
        })?;
        info!(swap = swap.id.as_str(), "swap rejected");
        self.deliver(notice);
        Ok(swap)
    }

    pub fn post_swap_message(
        &self,
        swap_id: &SwapId,
        acting: &ShareId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transact(|s| s.post_swap_message(swap_id, acting, content, now))
    }

    pub fn add_share(&self, share: Share) -> Result<ShareId, EngineError> {
        self.transact(|s| s.add_share(share))
    }

    pub fn rename_share(&self, id: &ShareId, name: &str) -> Result<(), EngineError> {
        self.transact(|s| s.rename_share(id, name))
    }

    pub fn seed_default_shares(&self) -> Result<bool, EngineError> {
        let created = self.transact(|s| s.seed_default_shares())?;
        if created {
            info!("default shares and sequence created");
        }
        Ok(created)
    }

    pub fn add_event(&self, event: CalendarEvent) -> Result<String, EngineError> {
        self.transact(|s| s.add_event(event))
    }

    pub fn remove_event(&self, id: &str) -> Result<(), EngineError> {
        self.transact(|s| s.remove_event(id))
    }

    pub fn update_settings(&self, settings: CalendarSettings) -> Result<(), EngineError> {
        self.transact(|s| s.update_settings(settings))
    }

    pub fn settings(&self) -> Result<CalendarSettings, EngineError> {
        self.read(|ledger| Ok(ledger.settings.clone()))
    }

    pub fn list_shares(&self) -> Result<Vec<Share>, EngineError> {
        self.read(|ledger| Ok(ledger.shares_by_name().into_iter().cloned().collect()))
    }

    /// Séquence courante, dans l'ordre de rotation.
    pub fn sequence(&self) -> Result<Vec<Share>, EngineError> {
        self.read(|ledger| {
            Ok(ledger
                .rotation()
                .into_iter()
                .filter_map(|id| ledger.find_share(id).cloned())
                .collect())
        })
    }

    /// Échanges impliquant `share` (tous si `None`), les plus récents d'abord.
    pub fn list_swaps(&self, share: Option<&ShareId>) -> Result<Vec<SwapRequest>, EngineError> {
        self.read(|ledger| {
            let mut out: Vec<SwapRequest> = ledger
                .swaps
                .iter()
                .filter(|s| share.map_or(true, |id| s.involves(id)))
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(out)
        })
    }

    pub fn calendar(&self, year: i32) -> Result<CalendarView, EngineError> {
        self.read(|ledger| calendar_view(ledger, year))
    }

    pub fn export_ics(&self, year: i32, now: DateTime<Utc>) -> Result<String, EngineError> {
        self.read(|ledger| ics::render_ics(ledger, year, now))
    }

    pub fn snapshot(&self) -> Result<Ledger, EngineError> {
        self.read(|ledger| Ok(ledger.clone()))
    }
}
