//! API Handlers
//!
//! HTTP request handlers for each demo service endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

use crate::config::Config;
use crate::decorator::{cache, Cached};
use crate::error::{CacheError, Result};
use crate::http::{respond, RequestKeyBuilder, RequestMeta};
use crate::manager::CacheRegistry;
use crate::models::{
    CalcQuery, CalcResponse, ClearRequest, ClearResponse, HealthResponse, StatsResponse,
    UserResponse,
};

/// Application state shared across all handlers.
///
/// Holds the registry and the cached callables served by the endpoints.
#[derive(Clone)]
pub struct AppState {
    /// Registry holding the active cache manager
    pub registry: Arc<CacheRegistry>,
    /// Cached user lookup
    pub users: Cached<u64, UserResponse, Infallible>,
    /// Cached power calculation
    pub calc: Cached<CalcQuery, CalcResponse, Infallible>,
}

impl AppState {
    /// Creates a new AppState resolving managers through `registry`.
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        let users: Cached<u64, UserResponse, Infallible> = cache(registry.clone())
            .expire(60)
            .namespace("users")
            .wrap_sync(concat!(module_path!(), "::get_user"), |id: u64| {
                Ok(UserResponse::for_id(id))
            });

        let calc: Cached<CalcQuery, CalcResponse, Infallible> = cache(registry.clone())
            .expire(300)
            .namespace("calc")
            .key_builder(Arc::new(RequestKeyBuilder))
            .wrap(concat!(module_path!(), "::calculate"), |query: CalcQuery| async move {
                tokio::task::yield_now().await;
                Ok(CalcResponse {
                    x: query.x,
                    y: query.y,
                    result: query.x.checked_pow(query.y),
                })
            });

        Self {
            registry,
            users,
            calc,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the configured backend and installs a manager for it.
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(CacheRegistry::new());
        registry.init(config.manager_config());
        Self::new(registry)
    }
}

/// Handler for GET /users/:id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    request: RequestMeta,
) -> Response {
    respond(&state.users, id, &request).await
}

/// Handler for GET /calc
pub async fn calc_handler(
    State(state): State<AppState>,
    Query(query): Query<CalcQuery>,
    request: RequestMeta,
) -> Response {
    respond(&state.calc, query, &request).await
}

/// Handler for POST /cache/clear
///
/// Clears by namespace, by key, or everything when the body names neither.
pub async fn clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<ClearResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let manager = state.registry.active().ok_or(CacheError::NotConfigured)?;
    let removed = manager
        .clear(req.namespace.as_deref(), req.key.as_deref())
        .await?;

    Ok(Json(ClearResponse::new(removed)))
}

/// Handler for GET /stats
///
/// Returns the counters of the active manager.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let manager = state.registry.active().ok_or(CacheError::NotConfigured)?;
    Ok(Json(StatsResponse::new(manager.stats(), manager.is_enabled())))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::manager::CacheManagerConfig;

    fn test_state() -> AppState {
        let registry = Arc::new(CacheRegistry::new());
        registry.init(
            CacheManagerConfig::new(Arc::new(InMemoryBackend::new()))
                .prefix("test:")
                .expire(300),
        );
        AppState::new(registry)
    }

    #[tokio::test]
    async fn test_cached_user_call() {
        let state = test_state();

        let user = state.users.call(3).await.unwrap();
        assert_eq!(user, UserResponse::for_id(3));

        let manager = state.registry.active().unwrap();
        state.users.call(3).await.unwrap();
        assert_eq!(manager.stats().hits, 1);
        assert_eq!(manager.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_calc_overflow_is_null() {
        let state = test_state();
        let response = state.calc.call(CalcQuery { x: 10, y: 40 }).await.unwrap();
        assert_eq!(response.result, None);
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        state.users.call(1).await.unwrap();
        state.users.call(2).await.unwrap();

        let response = clear_handler(
            State(state.clone()),
            Json(ClearRequest {
                namespace: Some("test::users".to_string()),
                key: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.removed, 2);
    }

    #[tokio::test]
    async fn test_clear_handler_invalid_request() {
        let state = test_state();
        let result = clear_handler(
            State(state),
            Json(ClearRequest {
                namespace: Some("a".to_string()),
                key: Some("b".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stats_handler_without_manager() {
        let state = AppState::new(Arc::new(CacheRegistry::new()));
        let result = stats_handler(State(state)).await;
        assert!(matches!(result, Err(CacheError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
