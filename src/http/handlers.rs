//! HTTP request handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::Result;
use crate::http::error::json_body;
use crate::http::state::AppState;
use crate::types::{CreatePollRequest, CreateUserRequest, VoteRequest};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let connections = state.rooms.connection_count()?;

    Ok(Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "connections": connections,
    })))
}

/// Cast a vote and return the poll's recomputed counts
pub async fn create_vote(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(payload)?;
    let update = state.votes.submit_vote(request).await?;

    Ok((StatusCode::CREATED, Json(update)))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(payload)?;
    let user = state.directory.register_user(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.directory.get_user(&user_id).await?))
}

pub async fn create_poll(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(payload)?;
    let poll = state.directory.create_poll(request).await?;

    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn list_polls(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.directory.list_polls().await?))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.directory.get_poll(&poll_id).await?))
}
