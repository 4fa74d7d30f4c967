use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::domain::value_objects::{principal::Principal, user_profiles::UserProfile};

use crate::{
    auth::AuthPrincipal,
    axum_http::{error_responses::AppError, routers::AppState},
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(caller_profile).put(save_caller_profile))
        .route("/:principal", get(user_profile))
        .with_state(state)
}

fn profile_response(profile: Option<UserProfile>) -> Result<Json<UserProfile>, AppError> {
    profile
        .map(Json)
        .ok_or_else(|| AppError::NotFound("profile not found".to_string()))
}

pub async fn caller_profile(
    State(state): State<AppState>,
    auth: AuthPrincipal,
) -> Result<impl IntoResponse, AppError> {
    profile_response(state.access.get_caller_profile(&auth.principal).await?)
}

pub async fn save_caller_profile(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(profile): Json<UserProfile>,
) -> Result<impl IntoResponse, AppError> {
    state
        .access
        .save_caller_profile(&auth.principal, profile)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_profile(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(principal): Path<Principal>,
) -> Result<impl IntoResponse, AppError> {
    profile_response(
        state
            .access
            .get_user_profile(&auth.principal, &principal)
            .await?,
    )
}
