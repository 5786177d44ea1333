//! Cache diagnostics endpoint.

use actix_web::{HttpResponse, web};
use vaultcord_core::ports::ResponseCache;
use vaultcord_shared::dto::CacheStatusResponse;

use crate::state::AppState;

/// Sweep expired entries, then report cache and rate limiter state.
///
/// GET /api/cache/status
pub async fn cache_status(state: web::Data<AppState>) -> HttpResponse {
    let evicted = state.cache.cleanup().await;

    let response = CacheStatusResponse {
        cache: state.cache.status().await,
        rate_limit: state.limiter.queue_status(),
        evicted,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}
