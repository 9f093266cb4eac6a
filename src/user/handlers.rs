use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    state::AppState,
    user::{
        dto::{CreateUserRequest, PublicUser, TokenRequest, TokenResponse},
        error::AccountError,
        services::NewUserFields,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AccountError> {
    let Json(payload) = payload?;
    if let Err(e) = payload.validate() {
        warn!(error = %e, "invalid create user payload");
        return Err(e);
    }

    let user = state
        .accounts
        .create_user(
            payload.email(),
            payload.password(),
            NewUserFields {
                name: payload.name().trim().to_string(),
            },
        )
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AccountError> {
    let Json(payload) = payload?;
    let token = state
        .tokens
        .issue_token(payload.email(), payload.password())
        .await?;
    Ok(Json(TokenResponse { token }))
}
