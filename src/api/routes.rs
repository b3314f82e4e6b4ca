//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Account
        .route("/api/account", get(account_handler))
        .route("/api/account/register", post(register_handler))
        // Single-shot games
        .route("/api/games/stats", get(game_stats_handler))
        .route("/api/games/dice/play", post(dice_play_handler))
        .route("/api/games/x100/play", post(x100_play_handler))
        .route("/api/games/keno/play", post(keno_play_handler))
        .route("/api/games/bubbles/play", post(bubbles_play_handler))
        // Multi-step games
        .route("/api/games/mines/start", post(mines_start_handler))
        .route("/api/games/mines/step", post(mines_step_handler))
        .route("/api/games/mines/cashout", post(mines_cashout_handler))
        .route("/api/games/mines/current", get(mines_current_handler))
        .route("/api/games/tower/start", post(tower_start_handler))
        .route("/api/games/tower/step", post(tower_step_handler))
        .route("/api/games/tower/cashout", post(tower_cashout_handler))
        .route("/api/games/tower/current", get(tower_current_handler))
        .route("/api/games/tower/config", get(tower_config_handler))
        .route("/api/games/crash/history", get(crash_history_handler))
        .route("/api/games/crash/bet", post(crash_bet_handler))
        .route("/api/games/crash/cashout/:bet_id", post(crash_cashout_handler))
        .route("/api/games/crash/status/:bet_id", get(crash_status_handler))
        // Settlement webhooks
        .route("/api/settlement/deposit", post(deposit_webhook_handler))
        .route("/api/settlement/payout/:payout_id", post(payout_callback_handler))
        // Withdrawals
        .route("/api/withdraw", post(withdraw_handler))
        .route("/api/withdraw/info", get(withdraw_info_handler))
        .route("/api/withdraw/history", get(withdraw_history_handler))
        // Bonuses
        .route("/api/promo/activate", post(promo_activate_handler))
        .route("/api/bonus/cashback", get(cashback_status_handler))
        .route("/api/bonus/cashback/claim", post(cashback_claim_handler))
        .route("/api/bonus/referral", get(referral_status_handler))
        .route("/api/bonus/referral/list", get(referral_list_handler))
        .route("/api/bonus/achievements", get(achievements_handler))
        .route(
            "/api/bonus/achievements/:achievement_id/claim",
            post(achievement_claim_handler),
        )
        .route("/api/bonus/daily/claim", post(daily_claim_handler))
        .with_state(state)
}
