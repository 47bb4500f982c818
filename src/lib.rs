#![forbid(unsafe_code)]
//! Weekshare — répartition des semaines d'une propriété partagée entre andels.
//!
//! - Génération annuelle déterministe (rotation round-robin, semaine ISO).
//! - Semaine de l'Ascension toujours commune et verrouillée.
//! - Échanges à deux parties ; une semaine échangée est verrouillée.
//! - Stockage fichier JSON atomique ; export ICS et CSV.

pub mod holiday;
pub mod ics;
pub mod io;
pub mod model;
pub mod notification;
pub mod scheduler;
pub mod service;
pub mod storage;

pub use holiday::{ascension_week, danish_holidays, easter_sunday, weeks_in_iso_year, Holiday};
pub use model::{
    AssignmentSource, CalendarEvent, CalendarSettings, Ledger, SequenceItem, Share, ShareId,
    SwapId, SwapRequest, SwapStatus, WeekAssignment, WeekKind,
};
pub use notification::{NoopNotifier, SwapEvent, SwapNotice, SwapNotifier, TextSwapNotice};
pub use scheduler::{
    CalendarView, EngineError, GenerationReport, Scheduler, SwapProposal, WeekPatch,
};
pub use service::WeekService;
pub use storage::{JsonStorage, MemoryStorage, Storage};
