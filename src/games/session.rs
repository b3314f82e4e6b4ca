//! Multi-step game sessions
//!
//! At most one active session exists per (account, game). Opening is an
//! atomic check-and-create on the map entry. Resolved crash bets stay
//! addressable by id, and the last resolved Mines and Tower session of each
//! account is remembered, so late retries are recognised as stale. The most
//! recent crash points are kept for the public round history.

use crate::common::types::AccountId;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::crash::CrashBet;
use crate::games::mines::MinesSession;
use crate::games::tower::TowerSession;
use crate::games::types::GameType;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Resolved crash rounds kept for the history view
pub const CRASH_HISTORY_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameSession {
    Mines(MinesSession),
    Tower(TowerSession),
    Crash(CrashBet),
}

impl GameSession {
    pub fn game_type(&self) -> GameType {
        match self {
            GameSession::Mines(_) => GameType::Mines,
            GameSession::Tower(_) => GameType::Tower,
            GameSession::Crash(_) => GameType::Crash,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            GameSession::Mines(s) => &s.id,
            GameSession::Tower(s) => &s.id,
            GameSession::Crash(s) => &s.id,
        }
    }
}

/// Result of looking a crash bet up by id
#[derive(Debug, Clone)]
pub enum CrashLookup {
    Active(CrashBet),
    Resolved(CrashBet),
}

/// One resolved crash round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRound {
    pub crash_point: f64,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionStore {
    active: DashMap<(AccountId, GameType), GameSession>,
    crash_owners: DashMap<String, AccountId>,
    resolved_crash: DashMap<String, CrashBet>,
    last_resolved: DashMap<(AccountId, GameType), String>,
    crash_history: Mutex<VecDeque<CrashRound>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session, failing with a conflict if one is already active
    pub fn open(&self, account: &AccountId, session: GameSession) -> CasinoResult<()> {
        let game = session.game_type();
        match self.active.entry((account.clone(), game)) {
            Entry::Occupied(_) => Err(CasinoError::conflict(format!("active {} session already exists", game))),
            Entry::Vacant(vacant) => {
                if let GameSession::Crash(bet) = &session {
                    self.crash_owners.insert(bet.id.clone(), account.clone());
                }
                vacant.insert(session);
                Ok(())
            }
        }
    }

    pub fn is_active(&self, account: &AccountId, game: GameType) -> bool {
        self.active.contains_key(&(account.clone(), game))
    }

    pub fn get(&self, account: &AccountId, game: GameType) -> Option<GameSession> {
        self.active.get(&(account.clone(), game)).map(|s| s.clone())
    }

    /// Like [`get`](Self::get) but a missing session is an error
    pub fn require(&self, account: &AccountId, game: GameType) -> CasinoResult<GameSession> {
        self.get(account, game)
            .ok_or_else(|| CasinoError::not_found(format!("no active {} session", game)))
    }

    /// Active session a cashout acts on.
    ///
    /// `expected` pins the session id the caller saw. A request aimed at the
    /// session that already resolved, or sent after it resolved with no
    /// newer session open, is stale rather than missing.
    pub fn require_for_cashout(
        &self,
        account: &AccountId,
        game: GameType,
        expected: Option<&str>,
    ) -> CasinoResult<GameSession> {
        let key = (account.clone(), game);
        let active = self.active.get(&key).map(|s| s.clone());
        if let Some(session) = active.as_ref() {
            if expected.map_or(true, |id| id == session.id()) {
                return Ok(session.clone());
            }
        }

        let resolved = self.last_resolved.get(&key).map(|id| id.clone());
        let stale = match (resolved.as_deref(), expected) {
            (Some(last), Some(id)) => last == id,
            (Some(_), None) => active.is_none(),
            (None, _) => false,
        };
        if stale {
            return Err(CasinoError::stale(format!("{} session already resolved", game)));
        }
        Err(CasinoError::not_found(format!("no active {} session", game)))
    }

    /// Store the new state of an active session
    pub fn update(&self, account: &AccountId, session: GameSession) {
        self.active.insert((account.clone(), session.game_type()), session);
    }

    /// Remove the active session; resolved crash bets are archived by id
    pub fn close(&self, account: &AccountId, session: GameSession) {
        let key = (account.clone(), session.game_type());
        self.active.remove(&key);
        match session {
            GameSession::Crash(bet) => {
                self.push_crash_round(bet.crash_point);
                self.resolved_crash.insert(bet.id.clone(), bet);
            }
            other => {
                self.last_resolved.insert(key, other.id().to_string());
            }
        }
    }

    fn push_crash_round(&self, crash_point: f64) {
        let mut history = match self.crash_history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push_front(CrashRound {
            crash_point,
            resolved_at: Utc::now(),
        });
        history.truncate(CRASH_HISTORY_LEN);
    }

    /// Latest resolved crash rounds, newest first
    pub fn crash_history(&self) -> Vec<CrashRound> {
        match self.crash_history.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn find_crash(&self, account: &AccountId, bet_id: &str) -> CasinoResult<CrashLookup> {
        let owned = self
            .crash_owners
            .get(bet_id)
            .map(|owner| owner.value() == account)
            .unwrap_or(false);
        if !owned {
            return Err(CasinoError::not_found(format!("crash bet {}", bet_id)));
        }

        if let Some(GameSession::Crash(bet)) = self.get(account, GameType::Crash) {
            if bet.id == bet_id {
                return Ok(CrashLookup::Active(bet));
            }
        }
        self.resolved_crash
            .get(bet_id)
            .map(|bet| CrashLookup::Resolved(bet.clone()))
            .ok_or_else(|| CasinoError::not_found(format!("crash bet {}", bet_id)))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crash::CrashStatus;
    use crate::ledger::LedgerSplit;

    fn mines(id: &str) -> GameSession {
        GameSession::Mines(MinesSession::new(id.into(), 10.0, LedgerSplit::default(), 3, vec![1, 2, 3]))
    }

    #[test]
    fn test_one_active_session_per_game() {
        let store = SessionStore::new();
        let alice = AccountId::from("alice");
        store.open(&alice, mines("m1")).unwrap();
        assert!(matches!(store.open(&alice, mines("m2")), Err(CasinoError::Conflict(_))));

        // Another account is unaffected
        store.open(&AccountId::from("bob"), mines("m3")).unwrap();
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn test_require_and_close() {
        let store = SessionStore::new();
        let alice = AccountId::from("alice");
        assert!(matches!(store.require(&alice, GameType::Tower), Err(CasinoError::NotFound(_))));

        store.open(&alice, mines("m1")).unwrap();
        let session = store.require(&alice, GameType::Mines).unwrap();
        assert_eq!(session.id(), "m1");
        store.close(&alice, session);
        assert!(!store.is_active(&alice, GameType::Mines));
    }

    #[test]
    fn test_cashout_after_resolution_is_stale() {
        let store = SessionStore::new();
        let alice = AccountId::from("alice");
        assert!(matches!(
            store.require_for_cashout(&alice, GameType::Mines, None),
            Err(CasinoError::NotFound(_))
        ));

        store.open(&alice, mines("m1")).unwrap();
        let session = store.require_for_cashout(&alice, GameType::Mines, Some("m1")).unwrap();
        store.close(&alice, session);

        assert!(store.require_for_cashout(&alice, GameType::Mines, None).unwrap_err().is_benign());
        assert!(store.require_for_cashout(&alice, GameType::Mines, Some("m1")).unwrap_err().is_benign());

        // A retry naming the old session never touches the new one
        store.open(&alice, mines("m2")).unwrap();
        assert!(store.require_for_cashout(&alice, GameType::Mines, Some("m1")).unwrap_err().is_benign());
        assert_eq!(store.require_for_cashout(&alice, GameType::Mines, None).unwrap().id(), "m2");
        assert!(matches!(
            store.require_for_cashout(&alice, GameType::Mines, Some("nope")),
            Err(CasinoError::NotFound(_))
        ));
    }

    #[test]
    fn test_crash_lookup_lifecycle() {
        let store = SessionStore::new();
        let alice = AccountId::from("alice");
        let bet = CrashBet::new("c1".into(), 5.0, LedgerSplit::default(), 2.0);
        store.open(&alice, GameSession::Crash(bet.clone())).unwrap();

        assert!(matches!(store.find_crash(&alice, "c1"), Ok(CrashLookup::Active(_))));
        assert!(store.find_crash(&AccountId::from("bob"), "c1").is_err());

        let mut resolved = bet;
        resolved.status = CrashStatus::CashedOut;
        store.close(&alice, GameSession::Crash(resolved));
        assert!(matches!(store.find_crash(&alice, "c1"), Ok(CrashLookup::Resolved(_))));
        assert!(!store.is_active(&alice, GameType::Crash));
    }

    #[test]
    fn test_crash_history_keeps_latest_rounds() {
        let store = SessionStore::new();
        let alice = AccountId::from("alice");
        assert!(store.crash_history().is_empty());

        for i in 0..CRASH_HISTORY_LEN + 5 {
            let bet = CrashBet::new(format!("c{}", i), 1.0, LedgerSplit::default(), 1.0 + i as f64);
            store.open(&alice, GameSession::Crash(bet.clone())).unwrap();
            store.close(&alice, GameSession::Crash(bet));
        }
        // Mines sessions do not show up
        store.open(&alice, mines("m1")).unwrap();
        store.close(&alice, mines("m1"));

        let history = store.crash_history();
        assert_eq!(history.len(), CRASH_HISTORY_LEN);
        assert_eq!(history[0].crash_point, 1.0 + (CRASH_HISTORY_LEN + 4) as f64);
        assert_eq!(history[CRASH_HISTORY_LEN - 1].crash_point, 6.0);
    }
}
