use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::emails::{EmailStatus, RequeueOutcome, ScheduledEmailsRepo};

pub mod models;

use models::{
    ErrorBody, ListEmailsQuery, ListEmailsResponse, MetricsResponse, RequeueRequest,
    RequeueResponse,
};

#[derive(Clone)]
pub struct ApiState {
    pub emails: ScheduledEmailsRepo,
    pub api_token: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/emails", get(list_emails))
        .route("/failed", get(list_failed))
        .route("/emails/:id", get(get_email))
        .route("/emails/:id/requeue", post(requeue_email))
        .route("/metrics", get(metrics))
        .route("/metrics/prom", get(metrics_prom))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        // Health stays open for load balancers.
        .route("/health", get(health))
        .with_state(state)
}

async fn require_token(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    if let Some(expected) = state.api_token.as_deref() {
        let presented = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if presented != Some(expected) {
            return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
        }
    }
    next.run(req).await
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

fn internal_err(e: anyhow::Error) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("internal error: {e}"),
    )
}

pub async fn list_emails(
    State(state): State<ApiState>,
    Query(q): Query<ListEmailsQuery>,
) -> Result<Json<ListEmailsResponse>, (StatusCode, String)> {
    if let Some(status) = q.status.as_deref() {
        if EmailStatus::parse(status).is_none() {
            return Err((
                StatusCode::BAD_REQUEST,
                "status must be one of pending, sent, failed".into(),
            ));
        }
    }

    let items = state
        .emails
        .list(
            q.status.as_deref(),
            q.limit.unwrap_or(100),
            q.cursor_created_at,
            q.cursor_id,
        )
        .await
        .map_err(internal_err)?;

    let (next_cursor_created_at, next_cursor_id) = items
        .last()
        .map(|x| (Some(x.created_at), Some(x.id)))
        .unwrap_or((None, None));

    Ok(Json(ListEmailsResponse {
        items,
        next_cursor_created_at,
        next_cursor_id,
    }))
}

pub async fn list_failed(
    State(state): State<ApiState>,
    Query(mut q): Query<ListEmailsQuery>,
) -> Result<Json<ListEmailsResponse>, (StatusCode, String)> {
    q.status = Some(EmailStatus::Failed.as_str().to_string());
    list_emails(State(state), Query(q)).await
}

pub async fn get_email(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.emails.get(id).await {
        Ok(Some(email)) => (StatusCode::OK, Json(email)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "scheduled email not found"),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("internal error: {e}"),
        ),
    }
}

pub async fn requeue_email(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
    body: Result<Json<RequeueRequest>, JsonRejection>,
) -> Response {
    // A bare POST with no JSON body means "requeue for now".
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => RequeueRequest::default(),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let send_at = body.send_at.unwrap_or_else(Utc::now);

    match state.emails.requeue_failed(id, send_at).await {
        Ok(RequeueOutcome::Requeued(new_id)) => {
            tracing::info!(email_id = %id, new_email_id = %new_id, "failed email requeued");
            (
                StatusCode::CREATED,
                Json(RequeueResponse {
                    new_email_id: new_id,
                    replay_of_id: id,
                }),
            )
                .into_response()
        }
        Ok(RequeueOutcome::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "scheduled email not found")
        }
        Ok(RequeueOutcome::NotFailed(status)) => error_response(
            StatusCode::CONFLICT,
            format!("only failed emails can be requeued (status={status})"),
        ),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("internal error: {e}"),
        ),
    }
}

pub async fn metrics(
    State(state): State<ApiState>,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    let now_utc = Utc::now();
    let counts = state
        .emails
        .status_counts(now_utc)
        .await
        .map_err(internal_err)?;

    Ok(Json(MetricsResponse { now_utc, counts }))
}

pub async fn metrics_prom(State(state): State<ApiState>) -> Response {
    match state.emails.status_counts(Utc::now()).await {
        Ok(c) => {
            let body = format!(
                concat!(
                    "# HELP salonmail_pending Scheduled emails waiting for their send time\n",
                    "# TYPE salonmail_pending gauge\n",
                    "salonmail_pending {}\n",
                    "# HELP salonmail_due Pending emails whose send time has passed\n",
                    "# TYPE salonmail_due gauge\n",
                    "salonmail_due {}\n",
                    "# HELP salonmail_sent Emails sent\n",
                    "# TYPE salonmail_sent gauge\n",
                    "salonmail_sent {}\n",
                    "# HELP salonmail_failed Emails that ended failed\n",
                    "# TYPE salonmail_failed gauge\n",
                    "salonmail_failed {}\n"
                ),
                c.pending, c.due, c.sent, c.failed
            );

            (StatusCode::OK, body).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics error: {e}"),
        )
            .into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
