use crate::model::{Ledger, Share, SwapRequest};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapEvent {
    Proposed,
    Accepted,
    Rejected,
}

/// Avis d'échange prêt à être délivré (mail, SMS...).
#[derive(Debug, Clone)]
pub struct SwapNotice {
    pub event: SwapEvent,
    pub swap: SwapRequest,
    /// Code de l'andel destinataire de l'avis.
    pub recipient: String,
    pub content: String,
}

/// Permet de customiser le rendu du message.
pub trait SwapNoticeRenderer {
    fn render(&self, event: SwapEvent, swap: &SwapRequest, from: &Share, to: &Share) -> String;
}

/// Gabarit texte simple.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSwapNotice;

impl SwapNoticeRenderer for TextSwapNotice {
    fn render(&self, event: SwapEvent, swap: &SwapRequest, from: &Share, to: &Share) -> String {
        match event {
            SwapEvent::Proposed => format!(
                "Hej {to},\n\n{from} foreslår at bytte uge {a} mod jeres uge {b} i {year}.\nSvar på forespørgslen i kalenderen.\n",
                to = to.name,
                from = from.name,
                a = swap.week_a,
                b = swap.week_b,
                year = swap.year
            ),
            SwapEvent::Accepted => format!(
                "Hej {from},\n\n{to} har accepteret byttet: uge {b} i {year} er nu jeres, uge {a} er overdraget.\n",
                from = from.name,
                to = to.name,
                a = swap.week_a,
                b = swap.week_b,
                year = swap.year
            ),
            SwapEvent::Rejected => format!(
                "Hej {from},\n\n{to} har afvist byttet af uge {a} mod uge {b} i {year}.\n",
                from = from.name,
                to = to.name,
                a = swap.week_a,
                b = swap.week_b,
                year = swap.year
            ),
        }
    }
}

/// Livraison des avis. Une erreur ici n'annule jamais l'opération déjà validée.
pub trait SwapNotifier {
    fn notify(&self, notice: &SwapNotice) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl SwapNotifier for NoopNotifier {
    fn notify(&self, _notice: &SwapNotice) -> Result<()> {
        Ok(())
    }
}

/// Prépare l'avis : le receveur pour une proposition, le demandeur sinon.
/// `None` si l'un des andels a disparu du ledger.
pub fn prepare_notice(
    ledger: &Ledger,
    event: SwapEvent,
    swap: &SwapRequest,
    renderer: &dyn SwapNoticeRenderer,
) -> Option<SwapNotice> {
    let from = ledger.find_share(&swap.requesting_share_id)?;
    let to = ledger.find_share(&swap.receiving_share_id)?;
    let recipient = match event {
        SwapEvent::Proposed => to,
        SwapEvent::Accepted | SwapEvent::Rejected => from,
    };
    Some(SwapNotice {
        event,
        swap: swap.clone(),
        recipient: recipient.label().to_string(),
        content: renderer.render(event, swap, from, to),
    })
}
