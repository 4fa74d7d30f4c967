use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::domain::value_objects::{
    principal::Principal,
    subscriptions::{
        IsSubscribedResponse, RecordPaymentRequest, SubscriptionStatusResponse,
        VerifySubscriptionRequest,
    },
};

use crate::{
    auth::AuthPrincipal,
    axum_http::{
        error_responses::AppError,
        routers::{AppState, authenticated},
    },
    usecases::subscriptions::SubscriptionError,
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/verify", post(verify_and_activate))
        .route("/payment-memo", get(payment_memo))
        .route("/:principal", get(subscription_status))
        .route("/:principal/active", get(is_subscribed))
        .with_state(state)
}

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(record_payment))
        .with_state(state)
}

pub async fn is_subscribed(
    State(state): State<AppState>,
    Path(principal): Path<Principal>,
) -> impl IntoResponse {
    let subscribed = state.subscriptions.is_subscribed(&principal).await;
    Json(IsSubscribedResponse { subscribed })
}

pub async fn subscription_status(
    State(state): State<AppState>,
    Path(principal): Path<Principal>,
) -> Result<Response, AppError> {
    match state.subscriptions.get_subscription_status(&principal).await {
        Ok(record) => Ok(Json(SubscriptionStatusResponse::Ok(record)).into_response()),
        Err(SubscriptionError::NotFound(message)) => Ok((
            StatusCode::NOT_FOUND,
            Json(SubscriptionStatusResponse::Error(message)),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

pub async fn verify_and_activate(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(request): Json<VerifySubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = authenticated(&auth)?;
    let outcome = state
        .subscriptions
        .verify_and_activate_subscription(caller, request.block_index)
        .await?;

    Ok(Json(outcome))
}

pub async fn payment_memo(
    State(state): State<AppState>,
    auth: AuthPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let caller = authenticated(&auth)?;
    Ok(Json(state.subscriptions.payment_instructions(caller)))
}

pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = state.access.require_admin(&auth.principal).await?;
    let record = state
        .subscriptions
        .record_payment(&admin, &request.principal, request.amount)
        .await?;

    Ok(Json(SubscriptionStatusResponse::Ok(record)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use crates::domain::value_objects::principal::Principal;
    use serde_json::json;

    use crate::axum_http::routers::test_app::{ADMIN, app, json_body, send};
    use crate::usecases::test_support::{P1, P2, StaticLedger, transfer_block, treasury};

    fn ledger_with_payment() -> StaticLedger {
        let memo = Principal::parse(P1).unwrap().payment_memo();
        StaticLedger::default().with_block(transfer_block(42, treasury(), 100_000, memo))
    }

    #[tokio::test]
    async fn verify_then_query_status() {
        let app = app(ledger_with_payment());
        let active_uri = format!("/api/v1/subscriptions/{P1}/active");
        let status_uri = format!("/api/v1/subscriptions/{P1}");

        let response = send(&app, "GET", &active_uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "subscribed": false }));

        let response = send(&app, "GET", &status_uri, None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await.get("error").is_some());

        let response = send(
            &app,
            "POST",
            "/api/v1/subscriptions/verify",
            Some(P1),
            Some(json!({ "block_index": 42 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.get("ok").is_some());

        let response = send(&app, "GET", &active_uri, None, None).await;
        assert_eq!(json_body(response).await, json!({ "subscribed": true }));

        let response = send(&app, "GET", &status_uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ok"]["paidAmount"], json!(100_000));
        assert_eq!(body["ok"]["status"], json!("active"));
    }

    #[tokio::test]
    async fn rejections_are_ok_responses_with_the_variant() {
        let app = app(StaticLedger::default());

        let response = send(
            &app,
            "POST",
            "/api/v1/subscriptions/verify",
            Some(P1),
            Some(json!({ "block_index": 999_999_999u64 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "blockNotFound": 999_999_999u64 })
        );
    }

    #[tokio::test]
    async fn anonymous_callers_cannot_verify() {
        let app = app(ledger_with_payment());

        let response = send(
            &app,
            "POST",
            "/api/v1/subscriptions/verify",
            None,
            Some(json!({ "block_index": 42 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["retryable"], json!(false));
    }

    #[tokio::test]
    async fn payment_memo_matches_the_caller() {
        let app = app(StaticLedger::default());

        let response =
            send(&app, "GET", "/api/v1/subscriptions/payment-memo", Some(P1), None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["memo"], json!(Principal::parse(P1).unwrap().payment_memo()));
        assert_eq!(body["min_fee_e8s"], json!(100_000));
    }

    #[tokio::test]
    async fn manual_payments_require_admin() {
        let app = app(StaticLedger::default());
        let request = json!({ "principal": P2, "amount": 100_000 });

        let response = send(
            &app,
            "POST",
            "/api/v1/admin/subscriptions/payments",
            Some(P1),
            Some(request.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(
            &app,
            "POST",
            "/api/v1/admin/subscriptions/payments",
            Some(ADMIN),
            Some(request),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let uri = format!("/api/v1/subscriptions/{P2}/active");
        let response = send(&app, "GET", &uri, None, None).await;
        assert_eq!(json_body(response).await, json!({ "subscribed": true }));
    }
}
