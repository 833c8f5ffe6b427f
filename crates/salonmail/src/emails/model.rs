use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::emails::related::RelatedRef;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScheduledEmail {
    pub id: Uuid,
    pub email_type: String,
    pub email: String,

    pub related_type: String,
    pub related_id: i64,

    pub send_at: DateTime<Utc>,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,

    pub replay_of_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledEmail {
    pub fn status(&self) -> Option<EmailStatus> {
        EmailStatus::parse(&self.status)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status() == Some(EmailStatus::Pending) && self.send_at <= now
    }
}

/// A record about to be inserted. Everything here is owned by the creator and
/// never changes after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduledEmail {
    pub email_type: EmailType,
    pub email: String,
    pub related: RelatedRef,
    pub send_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EmailStatus::Pending),
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EmailStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailType {
    ReservationReminder2Days,
    ReservationReminder1Day,
    ReservationThanks3Days,
    ReservationThanks1Month,
}

impl EmailType {
    pub const ALL: [EmailType; 4] = [
        EmailType::ReservationReminder2Days,
        EmailType::ReservationReminder1Day,
        EmailType::ReservationThanks3Days,
        EmailType::ReservationThanks1Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::ReservationReminder2Days => "reservation_reminder_2days",
            EmailType::ReservationReminder1Day => "reservation_reminder_1day",
            EmailType::ReservationThanks3Days => "reservation_thanks_3days",
            EmailType::ReservationThanks1Month => "reservation_thanks_1month",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Days before the visit, for reminder types.
    pub fn reminder_days(&self) -> Option<u32> {
        match self {
            EmailType::ReservationReminder2Days => Some(2),
            EmailType::ReservationReminder1Day => Some(1),
            EmailType::ReservationThanks3Days | EmailType::ReservationThanks1Month => None,
        }
    }
}

impl std::fmt::Display for EmailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyset position for paging through due records in `(send_at, id)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub send_at: DateTime<Utc>,
    pub id: Uuid,
}

impl PageCursor {
    pub fn after(record: &ScheduledEmail) -> Self {
        Self {
            send_at: record.send_at,
            id: record.id,
        }
    }
}
