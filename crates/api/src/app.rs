use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain::services::ranking::RankingPolicy;
use domain::services::scoring::ScoringEngine;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, security_headers_middleware, trace_id,
};
use crate::routes::{admin, applications, health, invites, referrals};
use crate::services::{
    AdmissionService, AdmissionSettings, InviteCodeRegistry, InviteSettings, QueueService,
    ReferralService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub admission: AdmissionService,
    pub invites: InviteCodeRegistry,
    pub queue: QueueService,
    pub referrals: ReferralService,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);
    let admission_cfg = &config.admission;

    let scoring = ScoringEngine::new(admission_cfg.max_score);
    let registry = InviteCodeRegistry::new(
        pool.clone(),
        InviteSettings {
            max_uses: admission_cfg.invite_max_uses,
            expiry_days: admission_cfg.invite_expiry_days,
        },
    );
    let referral_service = ReferralService::new(pool.clone());
    let admission = AdmissionService::new(
        pool.clone(),
        scoring,
        registry.clone(),
        referral_service.clone(),
        AdmissionSettings {
            auto_approve_threshold: admission_cfg.auto_approve_threshold,
            invite_grant_count: admission_cfg.invite_grant_count,
            invite_max_uses: admission_cfg.invite_max_uses,
            invite_expiry_days: admission_cfg.invite_expiry_days,
        },
    );
    let queue = QueueService::new(
        pool.clone(),
        RankingPolicy {
            boost_per_referral: admission_cfg.boost_per_referral,
            approvals_per_day: admission_cfg.approvals_per_day,
        },
    );

    let state = AppState {
        pool,
        config: config.clone(),
        admission,
        invites: registry,
        queue,
        referrals: referral_service,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public beta routes (fronted by the gateway, no auth here)
    let beta_routes = Router::new()
        .route(
            "/api/v1/beta/applications",
            post(applications::submit_application),
        )
        .route(
            "/api/v1/beta/applications/:id/position",
            get(applications::queue_position),
        )
        .route("/api/v1/beta/capacity", get(applications::capacity_status))
        .route("/api/v1/beta/invites/redeem", post(invites::redeem_invite))
        .route("/api/v1/beta/invites/:code", get(invites::get_invite_info))
        .route(
            "/api/v1/beta/referrals/leaderboard",
            get(referrals::leaderboard),
        )
        .route(
            "/api/v1/beta/profiles/:profile_id/invites",
            post(invites::issue_invite).get(invites::list_invites),
        )
        .route(
            "/api/v1/beta/profiles/:profile_id/invites/:code",
            delete(invites::revoke_invite),
        );

    // Admin routes (require the operator key)
    let admin_routes = Router::new()
        .route("/api/v1/admin/stats", get(admin::get_stats))
        .route("/api/v1/admin/applications", get(admin::list_pending))
        .route(
            "/api/v1/admin/applications/approve",
            post(admin::bulk_approve),
        )
        .route(
            "/api/v1/admin/applications/:id/approve",
            post(admin::approve_application),
        )
        .route(
            "/api/v1/admin/applications/:id/reject",
            post(admin::reject_application),
        )
        .route("/api/v1/admin/capacity", put(admin::set_capacity))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(beta_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
