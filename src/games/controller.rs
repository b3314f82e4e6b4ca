//! Game controller
//!
//! Every play request runs under the caller's account lock: clamp the bet,
//! deduct it, ask the fairness engine, move the session along and settle.
//! The bank reserve and audit counters are updated once per resolved bet.

use crate::accounts::AccountHandle;
use crate::common::types::{round_money, AccountId};
use crate::errors::{CasinoError, CasinoResult};
use crate::fairness::{Exposure, Wager};
use crate::games::crash::{self, CrashBet, CrashStatus, CrashView};
use crate::games::mines::{self, MinesSession, MinesView};
use crate::games::session::{CrashLookup, CrashRound, GameSession};
use crate::games::tower::{self, TowerConfig, TowerSession, TowerStep, TowerView};
use crate::games::types::*;
use crate::games::{bubbles, dice, keno, x100};
use crate::ledger::{Account, JournalKind, LedgerSplit};
use crate::services::ServiceContainer;
use crate::settings::GameSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State of a multi-step game after a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState<V> {
    #[serde(flatten)]
    pub session: V,
    /// Set once the session is resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
    pub balance: BalanceView,
}

#[derive(Clone)]
pub struct GameController {
    services: Arc<ServiceContainer>,
}

impl GameController {
    pub fn new(services: Arc<ServiceContainer>) -> Self {
        Self { services }
    }

    async fn settings(&self, game: GameType) -> CasinoResult<GameSettings> {
        self.services.settings().game_settings(game).await
    }

    fn account(&self, id: &AccountId, game: GameType) -> CasinoResult<AccountHandle> {
        self.services.limiter().check(id, &game.to_string())?;
        Ok(self.services.authenticate(id))
    }

    /// `min(requested, total balance, max_bet)`, rounded down to cents
    fn clamp_bet(&self, account: &Account, requested: f64, max_bet: f64) -> CasinoResult<f64> {
        account.ensure_active()?;
        let min_bet = self.services.config().limits.min_bet;
        let total = account.total();
        if total < min_bet {
            return Err(CasinoError::InsufficientFunds {
                requested,
                available: total,
            });
        }
        if !requested.is_finite() || requested < min_bet {
            return Err(CasinoError::validation(format!("minimum bet is {:.2}", min_bet)));
        }
        Ok(round_money(requested.min(total).min(max_bet)))
    }

    fn max_bet(&self) -> f64 {
        self.services.config().limits.max_bet
    }

    fn place(&self, account: &mut Account, game: GameType, bet: f64, now: DateTime<Utc>) -> LedgerSplit {
        let split = account.deduct(bet);
        account.record(JournalKind::Bet { game }, -bet, now);
        debug!(
            account = %account.id,
            game = %game,
            bet,
            from_deposit = split.from_deposit,
            from_promo = split.from_promo,
            "Bet accepted"
        );
        split
    }

    /// Credit the win, decay the wager requirement and report to the bank
    async fn resolve(&self, account: &mut Account, game: GameType, split: &LedgerSplit, win: f64, now: DateTime<Utc>) {
        if win > 0.0 {
            account.credit(win, split);
            account.record(JournalKind::Win { game }, win, now);
        }
        account.decrease_wager(split.total());
        account.stats.record(game, split.total(), win);

        let promotional = account.player.is_promotional();
        if let Err(err) = self
            .services
            .settings()
            .record_outcome(game, split.total(), win, promotional)
            .await
        {
            warn!(game = %game, error = %err, "Failed to record bet outcome");
        }
        info!(account = %account.id, game = %game, bet = split.total(), win, "Bet resolved");
    }

    fn single_wager(account: &Account, settings: &GameSettings, multiplier: f64, bet: f64) -> Wager {
        Wager::single(settings.rtp, multiplier)
            .with_player(account.player)
            .with_exposure(Exposure {
                payout: bet * multiplier,
                bet,
                bank: settings.bank,
            })
    }

    fn step_wager(account: &Account, settings: &GameSettings, multiplier: f64, step: usize, bet: f64, payout: f64) -> Wager {
        Wager::single(settings.rtp, multiplier)
            .with_steps(step as u32)
            .with_player(account.player)
            .with_exposure(Exposure {
                payout,
                bet,
                bank: settings.bank,
            })
    }

    fn play_result(
        game_type: GameType,
        bet: f64,
        win: f64,
        multiplier: f64,
        account: &Account,
        detail: PlayDetail,
    ) -> PlayResult {
        PlayResult {
            game_id: Uuid::new_v4().to_string(),
            game_type,
            outcome: GameOutcome::from_win(win > 0.0),
            bet,
            win,
            multiplier,
            balance: account.balance_view(),
            detail,
        }
    }

    pub async fn play_dice(&self, id: &AccountId, request: DicePlayRequest) -> CasinoResult<PlayResult> {
        dice::validate_chance(request.chance)?;
        let settings = self.settings(GameType::Dice).await?;
        let handle = self.account(id, GameType::Dice)?;
        let mut account = handle.lock().await;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let multiplier = dice::multiplier(request.chance);
        let wager = Self::single_wager(&account, &settings, multiplier, bet);
        let now = Utc::now();
        let split = self.place(&mut account, GameType::Dice, bet, now);

        let engine = self.services.engine();
        let won = engine.decide(&wager);
        let roll = dice::roll(engine.random(), request.chance, request.direction, won);
        let win = if won { round_money(bet * multiplier) } else { 0.0 };
        self.resolve(&mut account, GameType::Dice, &split, win, now).await;

        Ok(Self::play_result(
            GameType::Dice,
            bet,
            win,
            multiplier,
            &account,
            PlayDetail::Dice {
                roll,
                chance: request.chance,
                direction: request.direction,
            },
        ))
    }

    pub async fn play_x100(&self, id: &AccountId, request: X100PlayRequest) -> CasinoResult<PlayResult> {
        x100::validate_coef(request.coef)?;
        let settings = self.settings(GameType::X100).await?;
        let handle = self.account(id, GameType::X100)?;
        let mut account = handle.lock().await;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let multiplier = request.coef as f64;
        let wager = Self::single_wager(&account, &settings, multiplier, bet);
        let now = Utc::now();
        let split = self.place(&mut account, GameType::X100, bet, now);

        let engine = self.services.engine();
        let won = engine.decide(&wager);
        let position = x100::spin(engine.random(), request.coef, won);
        let win = if won { round_money(bet * multiplier) } else { 0.0 };
        self.resolve(&mut account, GameType::X100, &split, win, now).await;

        Ok(Self::play_result(
            GameType::X100,
            bet,
            win,
            multiplier,
            &account,
            PlayDetail::X100 {
                selected_coef: request.coef,
                result_coef: x100::WHEEL[position],
                position,
                rotation: x100::rotation(position),
            },
        ))
    }

    /// The draw comes first; a paying draw only stands if the engine
    /// approves it at the table multiplier.
    pub async fn play_keno(&self, id: &AccountId, request: KenoPlayRequest) -> CasinoResult<PlayResult> {
        keno::validate_picks(&request.numbers)?;
        let settings = self.settings(GameType::Keno).await?;
        let handle = self.account(id, GameType::Keno)?;
        let mut account = handle.lock().await;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let now = Utc::now();
        let split = self.place(&mut account, GameType::Keno, bet, now);
        let engine = self.services.engine();

        let mut drawn = keno::draw(engine.random());
        let mut matches = keno::count_matches(&request.numbers, &drawn);
        let mut multiplier = keno::payout(request.numbers.len(), matches);
        if multiplier > 0.0 {
            let wager = Self::single_wager(&account, &settings, multiplier, bet);
            if !engine.decide(&wager) {
                drawn = keno::losing_draw(&request.numbers);
                matches = 0;
                multiplier = 0.0;
            }
        }

        let win = round_money(bet * multiplier);
        self.resolve(&mut account, GameType::Keno, &split, win, now).await;

        Ok(Self::play_result(
            GameType::Keno,
            bet,
            win,
            multiplier,
            &account,
            PlayDetail::Keno {
                selected: request.numbers,
                drawn,
                matches,
            },
        ))
    }

    pub async fn play_bubbles(&self, id: &AccountId, request: BubblesPlayRequest) -> CasinoResult<PlayResult> {
        bubbles::validate_target(request.target)?;
        let settings = self.settings(GameType::Bubbles).await?;
        let handle = self.account(id, GameType::Bubbles)?;
        let mut account = handle.lock().await;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let multiplier = request.target;
        let wager = Self::single_wager(&account, &settings, multiplier, bet);
        let now = Utc::now();
        let split = self.place(&mut account, GameType::Bubbles, bet, now);

        let engine = self.services.engine();
        let won = engine.decide(&wager);
        let result = bubbles::pop_point(engine.random(), request.target, won);
        let win = if won { round_money(bet * multiplier) } else { 0.0 };
        self.resolve(&mut account, GameType::Bubbles, &split, win, now).await;

        Ok(Self::play_result(
            GameType::Bubbles,
            bet,
            win,
            multiplier,
            &account,
            PlayDetail::Bubbles {
                target: request.target,
                result,
            },
        ))
    }

    /// Deduct the bet and open the session; a lost race on the session slot
    /// hands the bet back.
    fn open_session(
        &self,
        account: &mut Account,
        session: GameSession,
        split: &LedgerSplit,
        now: DateTime<Utc>,
    ) -> CasinoResult<()> {
        let reference = session.id().to_string();
        if let Err(err) = self.services.sessions().open(&account.id, session) {
            account.refund(split);
            account.record(JournalKind::Refund { reference }, split.total(), now);
            return Err(err);
        }
        Ok(())
    }

    fn ensure_no_session(&self, id: &AccountId, game: GameType) -> CasinoResult<()> {
        if self.services.sessions().is_active(id, game) {
            return Err(CasinoError::conflict(format!("active {} session already exists", game)));
        }
        Ok(())
    }

    pub async fn mines_start(&self, id: &AccountId, request: MinesStartRequest) -> CasinoResult<SessionState<MinesView>> {
        mines::validate_bombs(request.bombs)?;
        let handle = self.account(id, GameType::Mines)?;
        let mut account = handle.lock().await;
        self.ensure_no_session(id, GameType::Mines)?;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let now = Utc::now();
        let split = self.place(&mut account, GameType::Mines, bet, now);
        let layout = mines::generate_layout(self.services.engine().random(), request.bombs);
        let session = MinesSession::new(Uuid::new_v4().to_string(), bet, split, request.bombs, layout);
        let view = session.view();
        self.open_session(&mut account, GameSession::Mines(session), &split, now)?;
        info!(account = %id, bet, bombs = request.bombs, "Mines session opened");

        Ok(SessionState {
            session: view,
            outcome: None,
            balance: account.balance_view(),
        })
    }

    fn active_mines(&self, id: &AccountId) -> CasinoResult<MinesSession> {
        match self.services.sessions().require(id, GameType::Mines)? {
            GameSession::Mines(session) => Ok(session),
            _ => Err(CasinoError::not_found("no active mines session")),
        }
    }

    pub async fn mines_step(&self, id: &AccountId, request: MinesStepRequest) -> CasinoResult<SessionState<MinesView>> {
        mines::validate_cell(request.cell)?;
        let settings = self.settings(GameType::Mines).await?;
        let handle = self.account(id, GameType::Mines)?;
        let mut account = handle.lock().await;
        let mut session = self.active_mines(id)?;
        if session.opened.contains(&request.cell) {
            return Err(CasinoError::validation(format!("cell {} is already open", request.cell)));
        }

        let step = session.opened.len() + 1;
        let coefficient = mines::coefficient(session.bombs, step);
        let potential = round_money(session.bet * coefficient);
        let wager = Self::step_wager(&account, &settings, coefficient, step, session.bet, potential);

        let engine = self.services.engine();
        let safe = engine.decide(&wager);
        session.mines = mines::reconcile(&session.mines, &session.opened, request.cell, safe, engine.random());

        let now = Utc::now();
        if !safe {
            session.active = false;
            session.win = 0.0;
            self.resolve(&mut account, GameType::Mines, &session.split, 0.0, now).await;
            let view = session.view();
            self.services.sessions().close(id, GameSession::Mines(session));
            return Ok(SessionState {
                session: view,
                outcome: Some(GameOutcome::Loss),
                balance: account.balance_view(),
            });
        }

        session.opened.push(request.cell);
        session.win = potential;
        if session.is_cleared() {
            return Ok(self.finish_mines(&mut account, session, now).await);
        }

        let view = session.view();
        self.services.sessions().update(id, GameSession::Mines(session));
        Ok(SessionState {
            session: view,
            outcome: None,
            balance: account.balance_view(),
        })
    }

    /// Cash out the open Mines session. A retry after the session resolved
    /// is stale.
    pub async fn mines_cashout(&self, id: &AccountId, request: SessionCashoutRequest) -> CasinoResult<SessionState<MinesView>> {
        let handle = self.account(id, GameType::Mines)?;
        let mut account = handle.lock().await;
        let session = match self
            .services
            .sessions()
            .require_for_cashout(id, GameType::Mines, request.game_id.as_deref())?
        {
            GameSession::Mines(session) => session,
            _ => return Err(CasinoError::not_found("no active mines session")),
        };
        if session.opened.is_empty() || session.win <= 0.0 {
            return Err(CasinoError::validation("open at least one cell before cashing out"));
        }
        Ok(self.finish_mines(&mut account, session, Utc::now()).await)
    }

    async fn finish_mines(&self, account: &mut Account, mut session: MinesSession, now: DateTime<Utc>) -> SessionState<MinesView> {
        session.active = false;
        self.resolve(account, GameType::Mines, &session.split, session.win, now).await;
        let view = session.view();
        self.services.sessions().close(&account.id, GameSession::Mines(session));
        SessionState {
            session: view,
            outcome: Some(GameOutcome::Win),
            balance: account.balance_view(),
        }
    }

    pub async fn mines_current(&self, id: &AccountId) -> CasinoResult<SessionState<MinesView>> {
        let handle = self.services.authenticate(id);
        let account = handle.lock().await;
        let session = self.active_mines(id)?;
        Ok(SessionState {
            session: session.view(),
            outcome: None,
            balance: account.balance_view(),
        })
    }

    pub async fn tower_start(&self, id: &AccountId, request: TowerStartRequest) -> CasinoResult<SessionState<TowerView>> {
        let handle = self.account(id, GameType::Tower)?;
        let mut account = handle.lock().await;
        self.ensure_no_session(id, GameType::Tower)?;
        let bet = self.clamp_bet(&account, request.bet, self.max_bet())?;

        let now = Utc::now();
        let split = self.place(&mut account, GameType::Tower, bet, now);
        let layout = tower::generate_layout(self.services.engine().random(), request.difficulty);
        let session = TowerSession::new(Uuid::new_v4().to_string(), bet, split, request.difficulty, layout);
        let view = session.view();
        self.open_session(&mut account, GameSession::Tower(session), &split, now)?;
        info!(account = %id, bet, difficulty = ?request.difficulty, "Tower session opened");

        Ok(SessionState {
            session: view,
            outcome: None,
            balance: account.balance_view(),
        })
    }

    fn active_tower(&self, id: &AccountId) -> CasinoResult<TowerSession> {
        match self.services.sessions().require(id, GameType::Tower)? {
            GameSession::Tower(session) => Ok(session),
            _ => Err(CasinoError::not_found("no active tower session")),
        }
    }

    pub async fn tower_step(&self, id: &AccountId, request: TowerStepRequest) -> CasinoResult<SessionState<TowerView>> {
        tower::validate_column(request.column)?;
        let settings = self.settings(GameType::Tower).await?;
        let handle = self.account(id, GameType::Tower)?;
        let mut account = handle.lock().await;
        let mut session = self.active_tower(id)?;

        let row = session.current_row + 1;
        if let Some(requested) = request.row.filter(|r| *r != row) {
            return Err(CasinoError::validation(format!(
                "row {} is not playable, next row is {}",
                requested, row
            )));
        }
        let coefficient = tower::multiplier(session.difficulty, row)
            .ok_or_else(|| CasinoError::validation("tower already completed"))?;
        let potential = round_money(session.bet * coefficient);
        let wager = Self::step_wager(&account, &settings, coefficient, row, session.bet, potential);

        let engine = self.services.engine();
        let safe = engine.decide(&wager);
        let index = row - 1;
        session.bombs[index] = tower::reconcile_row(&session.bombs[index], request.column, safe, engine.random());
        session.path.push(TowerStep { row, column: request.column });

        let now = Utc::now();
        if !safe {
            session.active = false;
            session.win = 0.0;
            self.resolve(&mut account, GameType::Tower, &session.split, 0.0, now).await;
            let view = session.view();
            self.services.sessions().close(id, GameSession::Tower(session));
            return Ok(SessionState {
                session: view,
                outcome: Some(GameOutcome::Loss),
                balance: account.balance_view(),
            });
        }

        session.current_row = row;
        session.win = potential;
        if session.reached_top() {
            return Ok(self.finish_tower(&mut account, session, now).await);
        }

        let view = session.view();
        self.services.sessions().update(id, GameSession::Tower(session));
        Ok(SessionState {
            session: view,
            outcome: None,
            balance: account.balance_view(),
        })
    }

    pub async fn tower_cashout(&self, id: &AccountId, request: SessionCashoutRequest) -> CasinoResult<SessionState<TowerView>> {
        let handle = self.account(id, GameType::Tower)?;
        let mut account = handle.lock().await;
        let session = match self
            .services
            .sessions()
            .require_for_cashout(id, GameType::Tower, request.game_id.as_deref())?
        {
            GameSession::Tower(session) => session,
            _ => return Err(CasinoError::not_found("no active tower session")),
        };
        if session.current_row == 0 || session.win <= 0.0 {
            return Err(CasinoError::validation("clear at least one row before cashing out"));
        }
        Ok(self.finish_tower(&mut account, session, Utc::now()).await)
    }

    async fn finish_tower(&self, account: &mut Account, mut session: TowerSession, now: DateTime<Utc>) -> SessionState<TowerView> {
        session.active = false;
        self.resolve(account, GameType::Tower, &session.split, session.win, now).await;
        let view = session.view();
        self.services.sessions().close(&account.id, GameSession::Tower(session));
        SessionState {
            session: view,
            outcome: Some(GameOutcome::Win),
            balance: account.balance_view(),
        }
    }

    pub async fn tower_current(&self, id: &AccountId) -> CasinoResult<SessionState<TowerView>> {
        let handle = self.services.authenticate(id);
        let account = handle.lock().await;
        let session = self.active_tower(id)?;
        Ok(SessionState {
            session: session.view(),
            outcome: None,
            balance: account.balance_view(),
        })
    }

    pub fn tower_config(&self) -> TowerConfig {
        tower::board_config()
    }

    /// Latest resolved crash points across all players
    pub fn crash_history(&self) -> Vec<CrashRound> {
        self.services.sessions().crash_history()
    }

    pub async fn crash_bet(&self, id: &AccountId, request: CrashBetRequest) -> CasinoResult<SessionState<CrashView>> {
        let settings = self.settings(GameType::Crash).await?;
        let handle = self.account(id, GameType::Crash)?;
        let mut account = handle.lock().await;
        self.ensure_no_session(id, GameType::Crash)?;
        let limits = &self.services.config().limits;
        let bet = self.clamp_bet(&account, request.bet, limits.max_bet.min(limits.crash_max_bet))?;

        let now = Utc::now();
        let split = self.place(&mut account, GameType::Crash, bet, now);
        let crash_point = self.services.engine().crash_point(settings.rtp);
        let crash_bet = CrashBet::new(Uuid::new_v4().to_string(), bet, split, crash_point);
        let view = crash_bet.view();
        self.open_session(&mut account, GameSession::Crash(crash_bet), &split, now)?;
        info!(account = %id, bet, bet_id = %view.bet_id, "Crash bet placed");

        Ok(SessionState {
            session: view,
            outcome: None,
            balance: account.balance_view(),
        })
    }

    /// Cash out at `multiplier`; wins only if the secret point was not passed
    pub async fn crash_cashout(&self, id: &AccountId, bet_id: &str, multiplier: f64) -> CasinoResult<SessionState<CrashView>> {
        crash::validate_cashout_multiplier(multiplier)?;
        let handle = self.account(id, GameType::Crash)?;
        let mut account = handle.lock().await;

        let mut bet = match self.services.sessions().find_crash(id, bet_id)? {
            CrashLookup::Resolved(_) => {
                return Err(CasinoError::stale(format!("crash bet {} already resolved", bet_id)));
            }
            CrashLookup::Active(bet) => bet,
        };

        if multiplier <= bet.crash_point {
            bet.status = CrashStatus::CashedOut;
            bet.cashed_out_multiplier = Some(multiplier);
            bet.win = round_money(bet.bet * multiplier);
        } else {
            bet.status = CrashStatus::Crashed;
        }
        Ok(self.finish_crash(&mut account, bet, Utc::now()).await)
    }

    /// Poll a crash bet. A reported multiplier past the secret point resolves
    /// the bet as lost; at exactly the point a cashout can still win.
    pub async fn crash_status(&self, id: &AccountId, bet_id: &str, current: Option<f64>) -> CasinoResult<SessionState<CrashView>> {
        let handle = self.services.authenticate(id);
        let mut account = handle.lock().await;

        match self.services.sessions().find_crash(id, bet_id)? {
            CrashLookup::Resolved(bet) => Ok(SessionState {
                outcome: crash_outcome(&bet),
                session: bet.view(),
                balance: account.balance_view(),
            }),
            CrashLookup::Active(mut bet) => match current {
                Some(reached) if reached > bet.crash_point => {
                    bet.status = CrashStatus::Lose;
                    Ok(self.finish_crash(&mut account, bet, Utc::now()).await)
                }
                _ => Ok(SessionState {
                    session: bet.view(),
                    outcome: None,
                    balance: account.balance_view(),
                }),
            },
        }
    }

    async fn finish_crash(&self, account: &mut Account, bet: CrashBet, now: DateTime<Utc>) -> SessionState<CrashView> {
        self.resolve(account, GameType::Crash, &bet.split, bet.win, now).await;
        debug!(bet_id = %bet.id, crash_point = bet.crash_point, status = ?bet.status, "Crash bet resolved");
        let state = SessionState {
            session: bet.view(),
            outcome: crash_outcome(&bet),
            balance: account.balance_view(),
        };
        self.services.sessions().close(&account.id, GameSession::Crash(bet));
        state
    }
}

fn crash_outcome(bet: &CrashBet) -> Option<GameOutcome> {
    match bet.status {
        CrashStatus::Active => None,
        CrashStatus::CashedOut => Some(GameOutcome::Win),
        CrashStatus::Crashed | CrashStatus::Lose => Some(GameOutcome::Loss),
    }
}
