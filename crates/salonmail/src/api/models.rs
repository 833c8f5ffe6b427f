use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emails::repo::StatusCounts;
use crate::emails::ScheduledEmail;

#[derive(Debug, Deserialize)]
pub struct ListEmailsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub cursor_created_at: Option<DateTime<Utc>>,
    pub cursor_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ListEmailsResponse {
    pub items: Vec<ScheduledEmail>,
    pub next_cursor_created_at: Option<DateTime<Utc>>,
    pub next_cursor_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequeueRequest {
    /// Defaults to now.
    pub send_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RequeueResponse {
    pub new_email_id: Uuid,
    pub replay_of_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub now_utc: DateTime<Utc>,
    pub counts: StatusCounts,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
