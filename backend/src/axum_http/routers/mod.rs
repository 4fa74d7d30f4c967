pub mod access_control;
pub mod subscriptions;
pub mod user_profiles;

use std::sync::Arc;

use axum::Router;
use crates::domain::value_objects::principal::Principal;

use crate::{
    auth::AuthPrincipal,
    axum_http::error_responses::AppError,
    usecases::{access_control::AccessControlUseCase, subscriptions::SubscriptionUseCase},
};

#[derive(Clone)]
pub struct AppState {
    pub subscriptions: Arc<SubscriptionUseCase>,
    pub access: Arc<AccessControlUseCase>,
}

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/subscriptions", subscriptions::routes(state.clone()))
        .nest(
            "/api/v1/admin/subscriptions",
            subscriptions::admin_routes(state.clone()),
        )
        .nest("/api/v1/access", access_control::routes(state.clone()))
        .nest(
            "/api/v1/admin/access",
            access_control::admin_routes(state.clone()),
        )
        .nest("/api/v1/profile", user_profiles::routes(state))
}

/// Rejects the anonymous principal for operations bound to a caller identity.
pub(crate) fn authenticated(auth: &AuthPrincipal) -> Result<&Principal, AppError> {
    if auth.principal.is_anonymous() {
        return Err(AppError::Unauthorized(
            "sign in to perform this action".to_string(),
        ));
    }
    Ok(&auth.principal)
}
