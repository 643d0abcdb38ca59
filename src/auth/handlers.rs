use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

use super::dto::{AuthResponse, LoginRequest, RegisterRequest};
use super::jwt::JwtKeys;
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, body))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let session = services::register(
        &state.db,
        &keys,
        &body.name,
        &body.email,
        body.age,
        &body.password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

#[instrument(skip(state, body))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let session = services::login(&state.db, &keys, &body.email, &body.password).await?;
    Ok(Json(session.into()))
}
