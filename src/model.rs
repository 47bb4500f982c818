use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiant fort pour Share
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShareId(String);

impl ShareId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Andel (co-propriétaire) recevant des semaines en rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: ShareId,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Share {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, code: C) -> Self {
        Self {
            id: ShareId::random(),
            name: name.into(),
            code: code.into(),
            color: None,
        }
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Code court s'il existe, sinon le nom.
    pub fn label(&self) -> &str {
        if self.code.is_empty() {
            &self.name
        } else {
            &self.code
        }
    }
}

/// Élément de la séquence de rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub position: u32,
    pub share_id: ShareId,
}

/// Nature d'une semaine. La référence d'andel n'existe que pour `Share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekKind {
    Share { share_id: ShareId },
    Common,
    Opening,
    Closing,
    Blocked,
}

impl WeekKind {
    pub fn share_id(&self) -> Option<&ShareId> {
        match self {
            WeekKind::Share { share_id } => Some(share_id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WeekKind::Share { .. } => "SHARE",
            WeekKind::Common => "COMMON",
            WeekKind::Opening => "OPENING",
            WeekKind::Closing => "CLOSING",
            WeekKind::Blocked => "BLOCKED",
        }
    }
}

/// Origine d'une assignation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentSource {
    Generated,
    Manual,
    Swap,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentSource::Generated => "GENERATED",
            AssignmentSource::Manual => "MANUAL",
            AssignmentSource::Swap => "SWAP",
        }
    }
}

/// Assignation d'une semaine ISO, clé unique (year, week).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekAssignment {
    pub year: i32,
    pub week: u32,
    #[serde(flatten)]
    pub kind: WeekKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    pub source: AssignmentSource,
}

impl WeekAssignment {
    /// Une régénération ne touche jamais une ligne protégée.
    pub fn is_protected(&self) -> bool {
        if self.is_locked {
            return true;
        }
        match self.source {
            AssignmentSource::Manual | AssignmentSource::Swap => true,
            AssignmentSource::Generated => false,
        }
    }
}

/// Identifiant fort pour SwapRequest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapId(String);

impl SwapId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
        }
    }
}

/// Demande d'échange : `week_a` est cédée par le demandeur, `week_b` est souhaitée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: SwapId,
    pub requesting_share_id: ShareId,
    pub receiving_share_id: ShareId,
    pub year: i32,
    pub week_a: u32,
    pub week_b: u32,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SwapRequest {
    pub fn involves(&self, share: &ShareId) -> bool {
        &self.requesting_share_id == share || &self.receiving_share_id == share
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: ShareId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Fil de discussion, rattaché ou non à un échange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_id: Option<SwapId>,
    pub participants: Vec<ShareId>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Événement du calendrier (week-end de travail, assemblée...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Crée un événement en validant que `end >= start`.
    pub fn new(
        title: String,
        kind: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, String> {
        if end < start {
            return Err("event end must not be before start".to_string());
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            kind,
            start,
            end,
            all_day,
            description: None,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    #[serde(default)]
    pub anchor_share_index: usize,
    #[serde(default = "default_true")]
    pub include_week_assignments_in_ics: bool,
    #[serde(default = "default_true")]
    pub include_holidays_in_ics: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            anchor_share_index: 0,
            include_week_assignments_in_ics: true,
            include_holidays_in_ics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// État persistant complet
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Ledger {
    #[serde(default)]
    pub shares: Vec<Share>,
    #[serde(default)]
    pub sequence: Vec<SequenceItem>,
    #[serde(default)]
    pub assignments: Vec<WeekAssignment>,
    #[serde(default)]
    pub swaps: Vec<SwapRequest>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub settings: CalendarSettings,
}

impl Ledger {
    pub fn find_share(&self, id: &ShareId) -> Option<&Share> {
        self.shares.iter().find(|s| &s.id == id)
    }
    pub fn find_share_mut(&mut self, id: &ShareId) -> Option<&mut Share> {
        self.shares.iter_mut().find(|s| &s.id == id)
    }
    pub fn find_share_by_code(&self, code: &str) -> Option<&Share> {
        self.shares.iter().find(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Andels triés par nom (ordre par défaut sans séquence explicite).
    pub fn shares_by_name(&self) -> Vec<&Share> {
        let mut out: Vec<&Share> = self.shares.iter().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Séquence de rotation triée par position.
    pub fn rotation(&self) -> Vec<&ShareId> {
        let mut items: Vec<&SequenceItem> = self.sequence.iter().collect();
        items.sort_by_key(|item| item.position);
        items.into_iter().map(|item| &item.share_id).collect()
    }

    pub fn find_assignment(&self, year: i32, week: u32) -> Option<&WeekAssignment> {
        self.assignments
            .iter()
            .find(|a| a.year == year && a.week == week)
    }

    pub fn assignments_for_year(&self, year: i32) -> Vec<&WeekAssignment> {
        let mut out: Vec<&WeekAssignment> =
            self.assignments.iter().filter(|a| a.year == year).collect();
        out.sort_by_key(|a| a.week);
        out
    }

    pub fn find_swap(&self, id: &SwapId) -> Option<&SwapRequest> {
        self.swaps.iter().find(|s| &s.id == id)
    }
    pub fn find_swap_mut(&mut self, id: &SwapId) -> Option<&mut SwapRequest> {
        self.swaps.iter_mut().find(|s| &s.id == id)
    }

    pub fn conversation_for_swap(&self, id: &SwapId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.swap_id.as_ref() == Some(id))
    }
}
