use crate::{
    auth::JwtKeys,
    axum_http::{
        default_routers,
        routers::{self, AppState},
    },
    config::config_model::DotEnvyConfig,
    services::expiry_loop,
    usecases::{access_control::AccessControlUseCase, subscriptions::SubscriptionUseCase},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::infra::{
    db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            subscriptions::SubscriptionPostgres, user_profiles::UserProfilePostgres,
            user_roles::UserRolePostgres,
        },
    },
    ledger::ledger_client::LedgerHttpClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Routes plus the auth extension, without transport layers.
pub fn app(state: AppState, keys: Arc<JwtKeys>) -> Router {
    routers::api_routes(state)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .fallback(default_routers::not_found)
        .layer(Extension(keys))
}

pub fn build_state(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<AppState> {
    let ledger = LedgerHttpClient::new(
        config.ledger.api_url.clone(),
        Duration::from_secs(config.ledger.timeout_secs),
    )?;

    let subscriptions = SubscriptionUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ledger),
        config.subscription.attribution.build(),
        config.subscription.policy()?,
    );
    let access = AccessControlUseCase::new(
        Arc::new(UserRolePostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserProfilePostgres::new(Arc::clone(&db_pool))),
        config.access.admin_principals.clone(),
    );

    Ok(AppState {
        subscriptions: Arc::new(subscriptions),
        access: Arc::new(access),
    })
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let state = build_state(&config, db_pool)?;
    info!(
        attribution = %config.subscription.attribution,
        min_fee_e8s = config.subscription.min_fee_e8s,
        "Subscription use case is ready"
    );

    if state.subscriptions.policy().period.is_some() {
        tokio::spawn(expiry_loop::run_expiry_loop(
            Arc::clone(&state.subscriptions),
            Duration::from_secs(config.subscription.expiry_sweep_interval_secs.max(1)),
        ));
    } else {
        info!("Lifetime subscriptions configured, expiry loop disabled");
    }

    let keys = Arc::new(JwtKeys::from_secret(&config.auth.jwt_secret));
    let app = app(state, keys)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::axum_http::routers::test_app;
    use crate::usecases::test_support::StaticLedger;

    #[tokio::test]
    async fn health_check_and_fallback() {
        let app = test_app::app(StaticLedger::default());

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
