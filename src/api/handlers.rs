//! Request Handlers
//!
//! Thin adapters from HTTP to the core services. Every handler resolves the
//! caller, forwards to one service call and maps the error.

use super::{
    errors::{ApiError, ApiResultExt},
    middleware::{Caller, RequestId},
    models::*,
};
use crate::bonus::achievements::{AchievementClaim, AchievementView};
use crate::bonus::cashback::CashbackStatus;
use crate::bonus::daily::DailyClaim;
use crate::bonus::promo::PromoActivation;
use crate::bonus::referral::{ReferralList, ReferralStatus};
use crate::bonus::{BonusService, CashbackClaim, Credited};
use crate::games::crash::CrashView;
use crate::games::mines::MinesView;
use crate::games::tower::{TowerConfig, TowerView};
use crate::games::types::*;
use crate::games::{GameController, SessionState};
use crate::services::{AccountSummary, GameStats, Registration, ServiceContainer};
use crate::settlement::{DepositEvent, DepositOutcome, PayoutRequest, SettlementService, WithdrawInfo, WithdrawRequest};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use std::sync::Arc;

/// Environment variable holding the settlement webhook key
pub const SETTLEMENT_API_KEY_ENV: &str = "SETTLEMENT_API_KEY";

/// Shared application state
pub struct AppState {
    pub services: Arc<ServiceContainer>,
    pub games: GameController,
    pub settlement: SettlementService,
    pub bonus: BonusService,
    pub version: String,
    /// Webhook key; `None` leaves settlement endpoints open for development
    pub settlement_api_key: Option<String>,
}

impl AppState {
    pub fn new(services: Arc<ServiceContainer>) -> Self {
        Self {
            games: GameController::new(services.clone()),
            settlement: SettlementService::new(services.clone()),
            bonus: BonusService::new(services.clone()),
            services,
            version: env!("CARGO_PKG_VERSION").to_string(),
            settlement_api_key: std::env::var(SETTLEMENT_API_KEY_ENV).ok(),
        }
    }

    pub fn with_settlement_api_key(mut self, key: Option<String>) -> Self {
        self.settlement_api_key = key;
        self
    }

    fn check_settlement_key(&self, headers: &HeaderMap, request_id: &RequestId) -> Result<(), ApiError> {
        let Some(expected) = &self.settlement_api_key else {
            return Ok(());
        };
        let provided = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
        if provided == Some(expected.as_str()) {
            Ok(())
        } else {
            Err(ApiError::forbidden(request_id, "Invalid or missing settlement API key"))
        }
    }
}

type Shared = State<Arc<AppState>>;

/// GET /health
pub async fn health_handler(State(state): Shared) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// POST /api/account/register
pub async fn register_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    body: Option<Json<RegisterRequest>>,
) -> Result<Json<Registration>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    state
        .services
        .register(&id, body.referrer_code.as_deref())
        .await
        .for_request(&request_id)
        .map(Json)
}

/// GET /api/account
pub async fn account_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<AccountSummary>, ApiError> {
    state.services.account_summary(&id).await.for_request(&request_id).map(Json)
}

/// GET /api/games/stats
pub async fn game_stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
) -> Result<Json<Vec<GameStats>>, ApiError> {
    state.services.game_stats().await.for_request(&request_id).map(Json)
}

pub async fn dice_play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<DicePlayRequest>,
) -> Result<Json<PlayResult>, ApiError> {
    state.games.play_dice(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn x100_play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<X100PlayRequest>,
) -> Result<Json<PlayResult>, ApiError> {
    state.games.play_x100(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn keno_play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<KenoPlayRequest>,
) -> Result<Json<PlayResult>, ApiError> {
    state.games.play_keno(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn bubbles_play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<BubblesPlayRequest>,
) -> Result<Json<PlayResult>, ApiError> {
    state.games.play_bubbles(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn mines_start_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<MinesStartRequest>,
) -> Result<Json<SessionState<MinesView>>, ApiError> {
    state.games.mines_start(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn mines_step_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<MinesStepRequest>,
) -> Result<Json<SessionState<MinesView>>, ApiError> {
    state.games.mines_step(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn mines_cashout_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    body: Option<Json<SessionCashoutRequest>>,
) -> Result<Json<SessionState<MinesView>>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    state.games.mines_cashout(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn mines_current_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<SessionState<MinesView>>, ApiError> {
    state.games.mines_current(&id).await.for_request(&request_id).map(Json)
}

pub async fn tower_start_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<TowerStartRequest>,
) -> Result<Json<SessionState<TowerView>>, ApiError> {
    state.games.tower_start(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn tower_step_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<TowerStepRequest>,
) -> Result<Json<SessionState<TowerView>>, ApiError> {
    state.games.tower_step(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn tower_cashout_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    body: Option<Json<SessionCashoutRequest>>,
) -> Result<Json<SessionState<TowerView>>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    state.games.tower_cashout(&id, request).await.for_request(&request_id).map(Json)
}

pub async fn tower_current_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<SessionState<TowerView>>, ApiError> {
    state.games.tower_current(&id).await.for_request(&request_id).map(Json)
}

/// GET /api/games/tower/config
pub async fn tower_config_handler(State(state): Shared) -> Json<TowerConfig> {
    Json(state.games.tower_config())
}

/// GET /api/games/crash/history
pub async fn crash_history_handler(State(state): Shared) -> Json<CrashHistoryResponse> {
    Json(CrashHistoryResponse {
        rounds: state.games.crash_history(),
    })
}

pub async fn crash_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<CrashBetRequest>,
) -> Result<Json<SessionState<CrashView>>, ApiError> {
    state.games.crash_bet(&id, request).await.for_request(&request_id).map(Json)
}

/// POST /api/games/crash/cashout/:bet_id
pub async fn crash_cashout_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Path(bet_id): Path<String>,
    Json(request): Json<CrashCashoutRequest>,
) -> Result<Json<SessionState<CrashView>>, ApiError> {
    state
        .games
        .crash_cashout(&id, &bet_id, request.multiplier)
        .await
        .for_request(&request_id)
        .map(Json)
}

/// GET /api/games/crash/status/:bet_id?current_mult=
pub async fn crash_status_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Path(bet_id): Path<String>,
    Query(query): Query<CrashStatusQuery>,
) -> Result<Json<SessionState<CrashView>>, ApiError> {
    state
        .games
        .crash_status(&id, &bet_id, query.current_mult)
        .await
        .for_request(&request_id)
        .map(Json)
}

/// POST /api/settlement/deposit
pub async fn deposit_webhook_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    headers: HeaderMap,
    Json(event): Json<DepositEvent>,
) -> Result<Json<DepositOutcome>, ApiError> {
    state.check_settlement_key(&headers, &request_id)?;
    state.settlement.settle_deposit(event).await.for_request(&request_id).map(Json)
}

/// POST /api/settlement/payout/:payout_id
pub async fn payout_callback_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    headers: HeaderMap,
    Path(payout_id): Path<String>,
    Json(body): Json<PayoutCallbackRequest>,
) -> Result<Json<PayoutRequest>, ApiError> {
    state.check_settlement_key(&headers, &request_id)?;
    state
        .settlement
        .finish_payout(&payout_id, body.success)
        .await
        .for_request(&request_id)
        .map(Json)
}

/// POST /api/withdraw
pub async fn withdraw_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<PayoutRequest>, ApiError> {
    state.settlement.withdraw(&id, request).await.for_request(&request_id).map(Json)
}

/// GET /api/withdraw/info
pub async fn withdraw_info_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<WithdrawInfo>, ApiError> {
    state.settlement.withdraw_info(&id).await.for_request(&request_id).map(Json)
}

/// GET /api/withdraw/history
pub async fn withdraw_history_handler(State(state): Shared, Caller(id): Caller) -> Json<WithdrawHistoryResponse> {
    Json(WithdrawHistoryResponse {
        payouts: state.settlement.withdraw_history(&id),
    })
}

/// POST /api/promo/activate
pub async fn promo_activate_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Json(request): Json<PromoActivateRequest>,
) -> Result<Json<Credited<PromoActivation>>, ApiError> {
    state.bonus.activate_promo(&id, &request.code).await.for_request(&request_id).map(Json)
}

/// GET /api/bonus/cashback
pub async fn cashback_status_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<CashbackStatus>, ApiError> {
    state.bonus.cashback_status(&id).await.for_request(&request_id).map(Json)
}

/// POST /api/bonus/cashback/claim
pub async fn cashback_claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<Credited<CashbackClaim>>, ApiError> {
    state.bonus.claim_cashback(&id).await.for_request(&request_id).map(Json)
}

/// GET /api/bonus/referral
pub async fn referral_status_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<ReferralStatus>, ApiError> {
    state.bonus.referral_status(&id).await.for_request(&request_id).map(Json)
}

/// GET /api/bonus/referral/list
pub async fn referral_list_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<ReferralList>, ApiError> {
    state.bonus.referral_list(&id).await.for_request(&request_id).map(Json)
}

pub async fn achievements_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<Vec<AchievementView>>, ApiError> {
    state.bonus.achievements(&id).await.for_request(&request_id).map(Json)
}

/// POST /api/bonus/achievements/:achievement_id/claim
pub async fn achievement_claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
    Path(achievement_id): Path<String>,
) -> Result<Json<Credited<AchievementClaim>>, ApiError> {
    state
        .bonus
        .claim_achievement(&id, &achievement_id)
        .await
        .for_request(&request_id)
        .map(Json)
}

/// POST /api/bonus/daily/claim
pub async fn daily_claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): Shared,
    Caller(id): Caller,
) -> Result<Json<Credited<DailyClaim>>, ApiError> {
    state.bonus.claim_daily(&id).await.for_request(&request_id).map(Json)
}
