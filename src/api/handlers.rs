//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::cache::TtlCache;
use crate::chain::{ChainGateway, ContractStats};
use crate::errors::ChainError;
use crate::resolver::{ResolveRequest, Resolver};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MISSING_FIELDS: &str = "Missing required fields: gameId, didWin, multiplier";

/// Shared application state
pub struct AppState {
    pub resolver: Arc<dyn Resolver>,
    /// Read access to the contract; absent in mock mode
    pub gateway: Option<Arc<dyn ChainGateway>>,
    pub stats_cache: TtlCache<(), ContractStats>,
    pub version: String,
}

impl AppState {
    pub fn new(resolver: Arc<dyn Resolver>, gateway: Option<Arc<dyn ChainGateway>>, stats_ttl: Duration) -> Self {
        Self {
            resolver,
            gateway,
            stats_cache: TtlCache::new(stats_ttl),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn gateway(&self, request_id: &RequestId) -> Result<&Arc<dyn ChainGateway>, ApiError> {
        self.gateway.as_ref().ok_or_else(|| {
            ApiError::service_unavailable(
                request_id.0.clone(),
                "Chain reads are not available in mock mode".to_string(),
            )
        })
    }
}

/// Health check handler
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: state.resolver.environment().to_string(),
        resolver_address: state.resolver.signer().map(|a| to_checksum(&a, None)),
        version: state.version.clone(),
        timestamp: Utc::now(),
    })
}

/// Settle a finished game
/// POST /resolve-game
pub async fn resolve_game_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResolveGameRequest>, JsonRejection>,
) -> Result<Json<ResolveGameResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        ApiError::bad_request(request_id.0.clone(), format!("Invalid JSON body: {}", rejection.body_text()))
    })?;

    let (Some(game_id), Some(did_win), Some(multiplier)) = (body.game_id, body.did_win, body.multiplier) else {
        return Err(ApiError::bad_request(request_id.0.clone(), MISSING_FIELDS.to_string()));
    };
    if game_id.trim().is_empty() {
        return Err(ApiError::bad_request(request_id.0.clone(), MISSING_FIELDS.to_string()));
    }

    info!(
        request_id = %request_id.0,
        game_id = %game_id,
        did_win,
        multiplier,
        game_type = ?body.game_type,
        player = ?body.player,
        "Resolve request"
    );

    let request = ResolveRequest {
        game_id,
        did_win,
        multiplier,
        game_type: body.game_type,
        player: body.player,
    };

    let receipt = state.resolver.resolve_game(&request).await.map_err(|e| {
        warn!(request_id = %request_id.0, game_id = %request.game_id, category = %e.category(), error = %e, "Resolution failed");
        ApiError::from_resolution(request_id.0.clone(), &e)
    })?;

    let message = if receipt.did_win {
        format!("Game resolved: player won at {:.2}x", receipt.multiplier)
    } else {
        "Game resolved: player lost".to_string()
    };

    Ok(Json(ResolveGameResponse {
        success: true,
        transaction_hash: receipt.transaction_hash,
        game_id: receipt.game_id,
        did_win: receipt.did_win,
        multiplier: receipt.multiplier,
        multiplier_percent: receipt.multiplier_percent,
        message,
    }))
}

/// On-chain game record
/// GET /games/:game_id
pub async fn game_details_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameResponse>, ApiError> {
    let gateway = state.gateway(&request_id)?;
    let game = gateway.get_game_details(&game_id).await.ok_or_else(|| {
        ApiError::service_unavailable(request_id.0.clone(), "Game details unavailable, try again".to_string())
    })?;
    if !game.exists {
        return Err(ApiError::not_found(request_id.0.clone(), format!("Game {} not found", game_id)));
    }
    Ok(Json(GameResponse::from(game)))
}

/// Player aggregates
/// GET /users/:address/stats
pub async fn user_stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    let account: Address = address
        .parse()
        .map_err(|_| ApiError::bad_request(request_id.0.clone(), format!("Invalid address: {}", address)))?;

    let gateway = state.gateway(&request_id)?;
    let stats = gateway.get_user_stats(account).await.ok_or_else(|| {
        ApiError::service_unavailable(request_id.0.clone(), "User stats unavailable, try again".to_string())
    })?;
    Ok(Json(UserStatsResponse::new(to_checksum(&account, None), stats)))
}

/// Contract-wide totals, cached
/// GET /stats
pub async fn contract_stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ContractStatsResponse>, ApiError> {
    let gateway = state.gateway(&request_id)?;
    let stats = state
        .stats_cache
        .get_or_try_fetch((), || async {
            gateway
                .get_contract_stats()
                .await
                .ok_or_else(|| ChainError::Rpc("getContractStats returned no data".to_string()))
        })
        .await
        .map_err(|e| ApiError::service_unavailable(request_id.0.clone(), e.to_string()))?;
    Ok(Json(ContractStatsResponse::from(stats)))
}
