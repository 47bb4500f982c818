use super::{util, EngineError, Scheduler, WeekPatch};
use crate::model::{
    AssignmentSource, CalendarEvent, CalendarSettings, SequenceItem, Share, ShareId,
    WeekAssignment, WeekKind,
};

/// Andels créés par `seed_default_shares`, dans l'ordre de rotation.
pub const DEFAULT_SHARE_CODES: [&str; 5] = ["FK", "HT", "OT", "KP", "AF"];

pub(super) fn replace_sequence(
    scheduler: &mut Scheduler,
    ordered: &[ShareId],
) -> Result<(), EngineError> {
    scheduler.atomically(|ledger| {
        let mut items = Vec::with_capacity(ordered.len());
        for (position, share_id) in ordered.iter().enumerate() {
            util::require_share(ledger, share_id)?;
            items.push(SequenceItem {
                position: position as u32,
                share_id: share_id.clone(),
            });
        }
        ledger.sequence = items;
        Ok(())
    })
}

pub(super) fn patch_week(
    scheduler: &mut Scheduler,
    patch: WeekPatch,
) -> Result<WeekAssignment, EngineError> {
    util::check_week(patch.year, patch.week)?;

    scheduler.atomically(|ledger| {
        if let WeekKind::Share { share_id } = &patch.kind {
            util::require_share(ledger, share_id)?;
        }

        let existing = ledger.find_assignment(patch.year, patch.week);
        if let Some(current) = existing {
            if current.is_locked {
                return Err(EngineError::Locked {
                    year: patch.year,
                    week: patch.week,
                });
            }
        }

        let note = match patch.note {
            Some(note) if note.trim().is_empty() => None,
            Some(note) => Some(note),
            None => existing.and_then(|a| a.note.clone()),
        };

        let record = WeekAssignment {
            year: patch.year,
            week: patch.week,
            kind: patch.kind,
            note,
            is_locked: false,
            source: AssignmentSource::Manual,
        };
        util::upsert(&mut ledger.assignments, record.clone());
        Ok(record)
    })
}

pub(super) fn add_share(scheduler: &mut Scheduler, share: Share) -> Result<ShareId, EngineError> {
    if share.name.trim().is_empty() {
        return Err(EngineError::Validation("share name cannot be empty".to_string()));
    }
    scheduler.atomically(|ledger| {
        if !share.code.is_empty() && ledger.find_share_by_code(&share.code).is_some() {
            return Err(EngineError::Validation(format!(
                "share code already in use: {}",
                share.code
            )));
        }
        let id = share.id.clone();
        ledger.shares.push(share);
        Ok(id)
    })
}

pub(super) fn rename_share(
    scheduler: &mut Scheduler,
    id: &ShareId,
    name: &str,
) -> Result<(), EngineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("share name cannot be empty".to_string()));
    }
    let share = scheduler
        .ledger
        .find_share_mut(id)
        .ok_or_else(|| EngineError::NotFound(format!("unknown share: {}", id.as_str())))?;
    share.name = name.to_string();
    Ok(())
}

/// Crée FK, HT, OT, KP, AF et la séquence associée si aucune séquence n'existe.
pub(super) fn seed_default_shares(scheduler: &mut Scheduler) -> Result<bool, EngineError> {
    if !scheduler.ledger.sequence.is_empty() {
        return Ok(false);
    }
    scheduler.atomically(|ledger| {
        let mut ordered = Vec::with_capacity(DEFAULT_SHARE_CODES.len());
        for code in DEFAULT_SHARE_CODES {
            let id = match ledger.find_share_by_code(code) {
                Some(existing) => existing.id.clone(),
                None => {
                    let share = Share::new(format!("Andel {code}"), code);
                    let id = share.id.clone();
                    ledger.shares.push(share);
                    id
                }
            };
            ordered.push(id);
        }
        ledger.sequence = ordered
            .into_iter()
            .enumerate()
            .map(|(position, share_id)| SequenceItem {
                position: position as u32,
                share_id,
            })
            .collect();
        ledger.settings = CalendarSettings::default();
        Ok(true)
    })
}

pub(super) fn add_event(scheduler: &mut Scheduler, event: CalendarEvent) -> Result<String, EngineError> {
    if event.title.trim().is_empty() {
        return Err(EngineError::Validation("event title cannot be empty".to_string()));
    }
    if event.end < event.start {
        return Err(EngineError::Validation(
            "event end must not be before start".to_string(),
        ));
    }
    let id = event.id.clone();
    scheduler.ledger.events.push(event);
    Ok(id)
}

pub(super) fn remove_event(scheduler: &mut Scheduler, id: &str) -> Result<(), EngineError> {
    let before = scheduler.ledger.events.len();
    scheduler.ledger.events.retain(|e| e.id != id);
    if scheduler.ledger.events.len() == before {
        return Err(EngineError::NotFound(format!("unknown event: {id}")));
    }
    Ok(())
}

pub(super) fn update_settings(
    scheduler: &mut Scheduler,
    settings: CalendarSettings,
) -> Result<(), EngineError> {
    let len = scheduler.ledger.sequence.len();
    if len > 0 && settings.anchor_share_index >= len {
        return Err(EngineError::Validation(format!(
            "anchor index {} outside 0..{len}",
            settings.anchor_share_index
        )));
    }
    scheduler.ledger.settings = settings;
    Ok(())
}
