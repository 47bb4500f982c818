//! Machine d'états des échanges : PENDING → ACCEPTED | REJECTED.

use super::{util, EngineError, Scheduler, SwapProposal};
use crate::model::{
    AssignmentSource, Conversation, Ledger, Message, ShareId, SwapId, SwapRequest, SwapStatus,
    WeekAssignment, WeekKind,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(super) fn propose(
    scheduler: &mut Scheduler,
    acting: &ShareId,
    proposal: SwapProposal,
    now: DateTime<Utc>,
) -> Result<SwapRequest, EngineError> {
    if acting != &proposal.requesting {
        return Err(EngineError::Authorization(
            "only a member of the requesting share may propose".to_string(),
        ));
    }
    if proposal.requesting == proposal.receiving {
        return Err(EngineError::Validation(
            "a share cannot swap with itself".to_string(),
        ));
    }
    util::check_week(proposal.year, proposal.week_a)?;
    util::check_week(proposal.year, proposal.week_b)?;

    scheduler.atomically(|ledger| {
        util::require_share(ledger, &proposal.requesting)?;
        util::require_share(ledger, &proposal.receiving)?;

        // Pas de contrôle de propriété des semaines : vérifié par le receveur.
        let swap = SwapRequest {
            id: SwapId::random(),
            requesting_share_id: proposal.requesting.clone(),
            receiving_share_id: proposal.receiving.clone(),
            year: proposal.year,
            week_a: proposal.week_a,
            week_b: proposal.week_b,
            status: SwapStatus::Pending,
            created_at: now,
            resolved_at: None,
        };

        if let Some(text) = proposal.message.as_deref().map(str::trim) {
            if !text.is_empty() {
                ledger.conversations.push(Conversation {
                    id: Uuid::new_v4().to_string(),
                    swap_id: Some(swap.id.clone()),
                    participants: vec![proposal.requesting.clone(), proposal.receiving.clone()],
                    messages: vec![Message {
                        author: proposal.requesting.clone(),
                        content: text.to_string(),
                        created_at: now,
                    }],
                });
            }
        }

        ledger.swaps.push(swap.clone());
        Ok(swap)
    })
}

pub(super) fn accept(
    scheduler: &mut Scheduler,
    swap_id: &SwapId,
    acting: &ShareId,
    now: DateTime<Utc>,
) -> Result<SwapRequest, EngineError> {
    scheduler.atomically(|ledger| {
        let swap = resolve(ledger, swap_id, acting, SwapStatus::Accepted, now)?;

        // Les deux semaines sont verrouillées pour survivre à une régénération.
        write_swapped_week(ledger, swap.year, swap.week_a, &swap.receiving_share_id)?;
        write_swapped_week(ledger, swap.year, swap.week_b, &swap.requesting_share_id)?;
        Ok(swap)
    })
}

pub(super) fn reject(
    scheduler: &mut Scheduler,
    swap_id: &SwapId,
    acting: &ShareId,
    now: DateTime<Utc>,
) -> Result<SwapRequest, EngineError> {
    scheduler.atomically(|ledger| resolve(ledger, swap_id, acting, SwapStatus::Rejected, now))
}

pub(super) fn post_message(
    scheduler: &mut Scheduler,
    swap_id: &SwapId,
    acting: &ShareId,
    content: &str,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EngineError::Validation("message cannot be empty".to_string()));
    }

    scheduler.atomically(|ledger| {
        let swap = ledger
            .find_swap(swap_id)
            .ok_or_else(|| EngineError::NotFound(format!("unknown swap: {}", swap_id.as_str())))?;
        if !swap.involves(acting) {
            return Err(EngineError::Authorization(
                "only parties of the swap may post messages".to_string(),
            ));
        }
        let participants = vec![
            swap.requesting_share_id.clone(),
            swap.receiving_share_id.clone(),
        ];

        let message = Message {
            author: acting.clone(),
            content: content.to_string(),
            created_at: now,
        };
        match ledger
            .conversations
            .iter_mut()
            .find(|c| c.swap_id.as_ref() == Some(swap_id))
        {
            Some(conversation) => conversation.messages.push(message),
            None => ledger.conversations.push(Conversation {
                id: Uuid::new_v4().to_string(),
                swap_id: Some(swap_id.clone()),
                participants,
                messages: vec![message],
            }),
        }
        Ok(())
    })
}

/// Vérifie l'acteur et l'état puis applique la transition terminale.
fn resolve(
    ledger: &mut Ledger,
    swap_id: &SwapId,
    acting: &ShareId,
    target: SwapStatus,
    now: DateTime<Utc>,
) -> Result<SwapRequest, EngineError> {
    let swap = ledger
        .find_swap_mut(swap_id)
        .ok_or_else(|| EngineError::NotFound(format!("unknown swap: {}", swap_id.as_str())))?;

    if &swap.receiving_share_id != acting {
        return Err(EngineError::Authorization(
            "only the receiving share may resolve this swap".to_string(),
        ));
    }
    if swap.status.is_terminal() {
        return Err(EngineError::InvalidState(format!(
            "swap {} already {}",
            swap_id.as_str(),
            swap.status.as_str()
        )));
    }

    swap.status = target;
    swap.resolved_at = Some(now);
    Ok(swap.clone())
}

fn write_swapped_week(
    ledger: &mut Ledger,
    year: i32,
    week: u32,
    share_id: &ShareId,
) -> Result<(), EngineError> {
    util::check_week(year, week)?;
    let note = ledger.find_assignment(year, week).and_then(|a| a.note.clone());
    util::upsert(
        &mut ledger.assignments,
        WeekAssignment {
            year,
            week,
            kind: WeekKind::Share {
                share_id: share_id.clone(),
            },
            note,
            is_locked: true,
            source: AssignmentSource::Swap,
        },
    );
    Ok(())
}
