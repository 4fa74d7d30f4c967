use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::value_objects::user_profiles::{
    AssignRoleRequest, CallerRoleResponse, IsAdminResponse,
};

use crate::{
    auth::AuthPrincipal,
    axum_http::{error_responses::AppError, routers::AppState},
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/role", get(caller_role))
        .route("/is-admin", get(is_admin))
        .with_state(state)
}

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/roles", post(assign_role))
        .with_state(state)
}

pub async fn caller_role(
    State(state): State<AppState>,
    auth: AuthPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let role = state.access.caller_role(&auth.principal).await?;
    Ok(Json(CallerRoleResponse {
        principal: auth.principal,
        role,
    }))
}

pub async fn is_admin(
    State(state): State<AppState>,
    auth: AuthPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let is_admin = state.access.is_admin(&auth.principal).await?;
    Ok(Json(IsAdminResponse { is_admin }))
}

pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(request): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = state.access.require_admin(&auth.principal).await?;
    state
        .access
        .assign_role(&admin, request.principal, request.role)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
