//! API 模块
//!
//! 提供 REST API 支持。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::catalog::Catalog;
use crate::config::config::AppConfig;
use crate::error::AppError;
use crate::observability::{
    AppMetrics, HealthCheckResult, ObservabilityState, create_observability_router,
    metrics_middleware,
};
use crate::scoring::{ConversationScorer, ScoringPolicy};
use crate::services::{
    CallAnalyzer, PersonaRegistry, PersonaStateMachine, ResolutionPolicy, create_session_service,
};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// `/api/v1` 下的业务路由
pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::persona_routes::create_persona_router())
        .merge(routes::session_routes::create_session_router())
        .merge(routes::score_routes::create_score_router())
        .merge(routes::call_routes::create_call_router());

    Router::new().nest("/api/v1", api).with_state(app_state)
}

/// 业务路由加可观测性路由，以及请求指标、追踪和 CORS 中间件
pub fn create_app(app_state: AppState, observability: Arc<ObservabilityState>) -> Router {
    create_observability_router(observability.clone())
        .merge(create_router(app_state))
        .layer(axum::middleware::from_fn_with_state(
            observability,
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// 按配置加载目录和人设并组装完整路由；任何数据错误都会中止启动
pub async fn initialize_api(config: &AppConfig) -> Result<Router, AppError> {
    tracing::info!("Initializing API router...");

    let catalog = Arc::new(Catalog::load(&config.data.catalog_path)?);
    let registry = Arc::new(PersonaRegistry::load_dir(&config.data.personas_dir, &catalog)?);
    let scorer = Arc::new(ConversationScorer::with_policy(
        catalog.clone(),
        ScoringPolicy::from(&config.scoring),
    ));
    let metrics = Arc::new(AppMetrics::default());
    let session_service = create_session_service(
        registry.clone(),
        scorer.clone(),
        PersonaStateMachine::new(ResolutionPolicy::from(&config.scoring)),
        metrics.clone(),
    );
    let analyzer = CallAnalyzer::new((*scorer).clone(), config.analysis.clone());

    let observability = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        metrics.clone(),
    ));
    observability
        .add_health_check(HealthCheckResult::healthy(
            "catalog",
            format!(
                "{} techniques, {} magic phrases, {} rapport breakers",
                catalog.techniques().len(),
                catalog.magic_phrases().len(),
                catalog.rapport_breakers().len()
            ),
        ))
        .await;
    observability
        .add_health_check(HealthCheckResult::healthy(
            "personas",
            format!("{} personas", registry.len()),
        ))
        .await;

    let state = AppState::new(catalog, registry, scorer, session_service, analyzer, metrics);
    Ok(create_app(state, observability))
}
