//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志初始化和健康检查。

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};
use crate::models::session::SessionPhase;

// ===== Metrics =====

/// 应用指标
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_sum: AtomicU64,
    pub sessions_started: AtomicU64,
    pub sessions_active: AtomicUsize,
    pub sessions_resolved: AtomicU64,
    pub sessions_escalated: AtomicU64,
    pub turns_scored: AtomicU64,
    pub rapport_breakers_total: AtomicU64,
    pub calls_analyzed: AtomicU64,
    pub errors_total: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 新会话
    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        self.sessions_active.fetch_add(1, Ordering::SeqCst);
    }

    /// 会话离开活跃状态（终止或删除）
    pub fn record_session_closed(&self) {
        let _ = self
            .sessions_active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// 记录一轮评分及其导致的阶段变化
    pub fn record_turn(&self, rapport_breakers: usize, entered: Option<SessionPhase>) {
        self.turns_scored.fetch_add(1, Ordering::SeqCst);
        self.rapport_breakers_total
            .fetch_add(rapport_breakers as u64, Ordering::SeqCst);
        match entered {
            Some(SessionPhase::Resolved) => {
                self.sessions_resolved.fetch_add(1, Ordering::SeqCst);
                self.record_session_closed();
            }
            Some(SessionPhase::Escalated) => {
                self.sessions_escalated.fetch_add(1, Ordering::SeqCst);
                self.record_session_closed();
            }
            _ => {}
        }
    }

    /// 记录通话分析
    pub fn record_call_analyzed(&self) {
        self.calls_analyzed.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let counter = |name: &str, help: &str, kind: &str, value: String| {
            format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n")
        };
        let load = |v: &AtomicU64| v.load(Ordering::SeqCst).to_string();

        [
            counter("http_requests_total", "Total HTTP requests", "counter", load(&self.http_requests_total)),
            counter(
                "http_request_duration_seconds_sum",
                "Total HTTP request duration in seconds",
                "counter",
                (self.http_request_duration_sum.load(Ordering::SeqCst) as f64 / 1000.0).to_string(),
            ),
            counter("sessions_started_total", "Roleplay sessions started", "counter", load(&self.sessions_started)),
            counter(
                "sessions_active",
                "Roleplay sessions still presenting objections",
                "gauge",
                self.sessions_active.load(Ordering::SeqCst).to_string(),
            ),
            counter("sessions_resolved_total", "Sessions with every objection resolved", "counter", load(&self.sessions_resolved)),
            counter("sessions_escalated_total", "Sessions that escalated", "counter", load(&self.sessions_escalated)),
            counter("turns_scored_total", "Agent turns scored", "counter", load(&self.turns_scored)),
            counter("rapport_breakers_total", "Rapport breakers detected", "counter", load(&self.rapport_breakers_total)),
            counter("calls_analyzed_total", "Call transcripts analyzed", "counter", load(&self.calls_analyzed)),
            counter("errors_total", "Total errors", "counter", load(&self.errors_total)),
        ]
        .concat()
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
}

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
}

impl HealthCheckResult {
    pub fn healthy(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            healthy: true,
            message: message.into(),
        }
    }
}

/// 可观测性状态
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub health_checks: Mutex<Vec<HealthCheckResult>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String, metrics: Arc<AppMetrics>) -> Self {
        Self {
            metrics,
            health_checks: Mutex::new(Vec::new()),
            start_time: Utc::now(),
            version,
        }
    }

    /// 添加健康检查结果，同名结果会被替换
    pub async fn add_health_check(&self, result: HealthCheckResult) {
        let mut checks = self.health_checks.lock().await;
        checks.retain(|c| c.name != result.name);
        checks.push(result);
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: checks
            .iter()
            .map(|c| HealthCheck {
                name: c.name.clone(),
                status: if c.healthy { "healthy" } else { "unhealthy" }.to_string(),
                message: Some(c.message.clone()),
            })
            .collect(),
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查：目录和人设已加载
pub async fn readiness(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    if !checks.is_empty() && checks.iter().all(|c| c.healthy) {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置的级别。配置了 `log_dir` 时额外写入按天滚动的 JSON
/// 日志文件，返回的 guard 需要在进程结束前一直持有。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Configuration(format!("invalid log level '{}': {}", config.level, e)))?;

    let stdout_layer = if config.structured {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_line_number(true).boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cfr-coach.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("failed to set tracing subscriber: {}", e)))?;

    Ok(guard)
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    State(state): State<Arc<ObservabilityState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(req).await;

    state
        .metrics
        .record_http_request(start.elapsed().as_millis() as u64);
    if response.status().is_server_error() {
        state.metrics.record_error();
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = AppMetrics::default();
        metrics.record_http_request(100);
        metrics.record_session_started();
        metrics.record_turn(2, None);
        metrics.record_error();

        let output = metrics.gather();
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("sessions_active 1"));
        assert!(output.contains("turns_scored_total 1"));
        assert!(output.contains("rapport_breakers_total 2"));
        assert!(output.contains("errors_total 1"));
        assert!(output.contains("# TYPE sessions_active gauge"));
    }

    #[test]
    fn test_terminal_turn_closes_session() {
        let metrics = AppMetrics::default();
        metrics.record_session_started();
        metrics.record_turn(0, Some(SessionPhase::Escalated));
        assert_eq!(metrics.sessions_active.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.sessions_escalated.load(Ordering::SeqCst), 1);

        // never underflows
        metrics.record_session_closed();
        assert_eq!(metrics.sessions_active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health_checks_replace_by_name() {
        let state = ObservabilityState::new("0.1.0".into(), Arc::new(AppMetrics::default()));
        state
            .add_health_check(HealthCheckResult::healthy("catalog", "3 techniques"))
            .await;
        state
            .add_health_check(HealthCheckResult::healthy("catalog", "4 techniques"))
            .await;
        let checks = state.health_checks.lock().await;
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].message, "4 techniques");
    }
}
