//! Account store
//!
//! Accounts live behind a per-account async mutex so that the whole
//! deduct, decide, credit sequence of one request runs serialized for that
//! account while other accounts proceed in parallel.

use crate::common::types::AccountId;
use crate::errors::{CasinoError, CasinoResult};
use crate::fairness::PlayerOverride;
use crate::ledger::Account;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub type AccountHandle = Arc<Mutex<Account>>;

/// Concurrent map of accounts plus the referral code index
pub struct AccountStore {
    accounts: DashMap<AccountId, AccountHandle>,
    ref_index: DashMap<String, AccountId>,
    /// Referral code to the accounts it invited, oldest first
    invited: DashMap<String, Vec<AccountId>>,
    promo_cap: f64,
}

impl AccountStore {
    pub fn new(promo_cap: f64) -> Self {
        Self {
            accounts: DashMap::new(),
            ref_index: DashMap::new(),
            invited: DashMap::new(),
            promo_cap,
        }
    }

    /// Return the account for `id`, creating it on first sight.
    ///
    /// `referrer_code` is only honoured on creation and only when it resolves
    /// to an existing account.
    pub fn get_or_create(&self, id: &AccountId, referrer_code: Option<&str>) -> (AccountHandle, bool) {
        if let Some(existing) = self.accounts.get(id) {
            return (existing.clone(), false);
        }

        let referrer = referrer_code
            .map(str::trim)
            .filter(|code| self.ref_index.contains_key(*code))
            .map(str::to_string);

        match self.accounts.entry(id.clone()) {
            Entry::Occupied(occupied) => (occupied.get().clone(), false),
            Entry::Vacant(vacant) => {
                let ref_code = self.allocate_ref_code(id);
                info!(account = %id, ref_code = %ref_code, referred = referrer.is_some(), "Account created");
                if let Some(code) = referrer.as_ref() {
                    self.invited.entry(code.clone()).or_default().push(id.clone());
                }
                let account = Account::new(id.clone(), ref_code, referrer, self.promo_cap);
                let handle = Arc::new(Mutex::new(account));
                vacant.insert(handle.clone());
                (handle, true)
            }
        }
    }

    pub fn get(&self, id: &AccountId) -> CasinoResult<AccountHandle> {
        self.accounts
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CasinoError::not_found(format!("account {}", id)))
    }

    /// Resolve a referral code to the account that owns it
    pub fn find_by_ref_code(&self, code: &str) -> Option<AccountHandle> {
        let id = self.ref_index.get(code)?.clone();
        self.accounts.get(&id).map(|entry| entry.clone())
    }

    /// Accounts invited with `code`, newest first
    pub fn invited_by(&self, code: &str) -> Vec<AccountHandle> {
        let ids = self.invited.get(code).map(|ids| ids.clone()).unwrap_or_default();
        ids.iter()
            .rev()
            .filter_map(|id| self.accounts.get(id).map(|entry| entry.clone()))
            .collect()
    }

    pub async fn set_override(&self, id: &AccountId, player: PlayerOverride) -> CasinoResult<()> {
        let handle = self.get(id)?;
        handle.lock().await.player = player;
        Ok(())
    }

    pub async fn set_banned(&self, id: &AccountId, banned: bool) -> CasinoResult<()> {
        let handle = self.get(id)?;
        handle.lock().await.banned = banned;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn allocate_ref_code(&self, id: &AccountId) -> String {
        loop {
            let candidate = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
            if let Entry::Vacant(vacant) = self.ref_index.entry(candidate.clone()) {
                vacant.insert(id.clone());
                return candidate;
            }
        }
    }
}
