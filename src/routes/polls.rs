//! Poll REST routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use protocol::{
    AnonymousIdResponse, ClosePollRequest, CreatePollRequest, CreatePollResponse, ErrorResponse, MessageResponse,
    PollSnapshot, VoteRequest,
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::services::poll::{self, PollError};
use crate::state::AppState;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// `?anon_id=` query carried by create and read requests.
#[derive(Debug, Default, Deserialize)]
pub struct AnonQuery {
    pub anon_id: Option<String>,
}

pub(crate) fn poll_error_to_status(err: &PollError) -> StatusCode {
    match err {
        PollError::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        PollError::NotFound => StatusCode::NOT_FOUND,
        PollError::InvalidOption => StatusCode::BAD_REQUEST,
        PollError::VotingEnded | PollError::Closed | PollError::AlreadyVoted | PollError::NotCreator => {
            StatusCode::FORBIDDEN
        }
    }
}

fn api_error(err: PollError) -> ApiError {
    (poll_error_to_status(&err), Json(ErrorResponse { detail: err.to_string() }))
}

/// `GET /api/anonymous-id`: mint a fresh anonymous id.
pub async fn anonymous_id() -> Json<AnonymousIdResponse> {
    Json(AnonymousIdResponse { anon_id: poll::generate_anonymous_id() })
}

/// `POST /api/polls?anon_id=`: create a poll owned by `anon_id`.
pub async fn create_poll(
    State(state): State<AppState>,
    Query(query): Query<AnonQuery>,
    Json(body): Json<CreatePollRequest>,
) -> Result<Json<CreatePollResponse>, ApiError> {
    let Some(creator) = query.anon_id.filter(|id| !id.trim().is_empty()) else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse { detail: "anon_id query parameter required".to_owned() }),
        ));
    };

    let poll_id = poll::create_poll(&state, &body.question, &body.options, &creator, OffsetDateTime::now_utc())
        .await
        .map_err(api_error)?;
    Ok(Json(CreatePollResponse { poll_id }))
}

/// `GET /api/polls/{id}?anon_id=`: poll snapshot for the viewer.
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<AnonQuery>,
) -> Result<Json<PollSnapshot>, ApiError> {
    let snapshot = poll::get_poll(&state, &poll_id, query.anon_id.as_deref(), OffsetDateTime::now_utc())
        .await
        .map_err(api_error)?;
    Ok(Json(snapshot))
}

/// `POST /api/polls/{id}/vote`: record a vote.
pub async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    poll::vote(&state, &poll_id, &body.option, &body.anon_id, OffsetDateTime::now_utc())
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse { message: "Vote recorded".to_owned() }))
}

/// `POST /api/polls/{id}/close`: creator-only close.
pub async fn close_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(body): Json<ClosePollRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    poll::close_poll(&state, &poll_id, &body.anon_id)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse { message: "Poll closed. Results visible until expiration.".to_owned() }))
}

#[cfg(test)]
#[path = "polls_test.rs"]
mod tests;
