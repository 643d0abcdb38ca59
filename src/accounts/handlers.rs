use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{auth::extractors::CurrentAccount, error::ApiError, state::AppState};

use super::dto::{
    AccountResponse, CreateAccountRequest, PagedAccountResponse, PageParams, PatchAccountRequest,
    SearchParams, StatisticsResponse, UpdateAccountRequest,
};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list).post(create))
        .route("/accounts/search", get(search))
        .route("/accounts/adults", get(adults))
        .route("/accounts/statistics", get(statistics))
        .route(
            "/accounts/:id",
            get(get_by_id).put(update).patch(patch).delete(delete_by_id),
        )
}

#[instrument(skip(state, auth, body), fields(actor = auth.0.id))]
async fn create(
    State(state): State<AppState>,
    auth: CurrentAccount,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AccountResponse>), ApiError> {
    let account = services::create_account(&state.db, &body.name, &body.email, body.age).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/accounts/{}", account.id).parse().unwrap(),
    );
    Ok((StatusCode::CREATED, headers, Json(account.into())))
}

#[instrument(skip(state, _auth))]
async fn list(
    State(state): State<AppState>,
    _auth: CurrentAccount,
    Query(params): Query<PageParams>,
) -> Result<Json<PagedAccountResponse>, ApiError> {
    let paged =
        services::list_accounts(&state.db, params.page, params.size, params.sort.as_deref())
            .await?;
    Ok(Json(paged.into()))
}

#[instrument(skip(state, _auth))]
async fn get_by_id(
    State(state): State<AppState>,
    _auth: CurrentAccount,
    Path(id): Path<i64>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = services::get_account(&state.db, id).await?;
    Ok(Json(account.into()))
}

#[instrument(skip(state, _auth))]
async fn search(
    State(state): State<AppState>,
    _auth: CurrentAccount,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = services::search_by_name(&state.db, &params.keyword).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, _auth))]
async fn adults(
    State(state): State<AppState>,
    _auth: CurrentAccount,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = services::get_adult_accounts(&state.db).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, _auth))]
async fn statistics(
    State(state): State<AppState>,
    _auth: CurrentAccount,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let stats = services::get_statistics(&state.db).await?;
    Ok(Json(stats.into()))
}

#[instrument(skip(state, auth, body), fields(actor = auth.0.id))]
async fn update(
    State(state): State<AppState>,
    auth: CurrentAccount,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account =
        services::update_account(&state.db, id, &body.name, &body.email, body.age).await?;
    Ok(Json(account.into()))
}

#[instrument(skip(state, auth, body), fields(actor = auth.0.id))]
async fn patch(
    State(state): State<AppState>,
    auth: CurrentAccount,
    Path(id): Path<i64>,
    Json(body): Json<PatchAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    // The service accepts all-None; requiring at least one field is a
    // transport rule, so it lives here.
    if body.is_empty() {
        return Err(ApiError::InvalidArgument(
            "at least one field must be provided".into(),
        ));
    }
    let account = services::patch_account(
        &state.db,
        id,
        body.name.as_deref(),
        body.email.as_deref(),
        body.age,
    )
    .await?;
    Ok(Json(account.into()))
}

#[instrument(skip(state, auth), fields(actor = auth.0.id))]
async fn delete_by_id(
    State(state): State<AppState>,
    auth: CurrentAccount,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    services::delete_account(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
