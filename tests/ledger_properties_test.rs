//! Dual-balance ledger properties

use wagerline::common::types::{round_money, AccountId};
use wagerline::ledger::{Account, LedgerSplit};
use wagerline::random::{RandomSource, SeededRandom};

fn account(deposit: f64, promo: f64) -> Account {
    let mut acc = Account::new(AccountId::from("ledger"), "LEDGER".into(), None, 300.0);
    acc.deposit_balance = deposit;
    acc.promo_balance = promo;
    acc
}

#[test]
fn test_win_follows_bet_split() {
    let mut acc = account(7.0, 3.0);
    let split = acc.deduct(10.0);
    assert_eq!(split, LedgerSplit { from_deposit: 7.0, from_promo: 3.0 });
    assert_eq!(acc.total(), 0.0);

    let credited = acc.credit(20.0, &split);
    assert!((credited.from_deposit - 14.0).abs() < 1e-9);
    assert!((credited.from_promo - 6.0).abs() < 1e-9);
    assert!((acc.deposit_balance - 14.0).abs() < 1e-9);
    assert!((acc.promo_balance - 6.0).abs() < 1e-9);
}

#[test]
fn test_deposit_funds_are_spent_first() {
    let mut acc = account(5.0, 50.0);
    let split = acc.deduct(20.0);
    assert_eq!(split.from_deposit, 5.0);
    assert_eq!(split.from_promo, 15.0);
    assert_eq!(acc.deposit_balance, 0.0);
    assert_eq!(acc.promo_balance, 35.0);
}

#[test]
fn test_withdrawable_respects_wager_and_promo_cap() {
    let mut acc = account(500.0, 400.0);
    acc.wager = 120.0;
    let locked = acc.withdrawable();
    assert_eq!(locked.total, 500.0);
    assert_eq!(locked.locked_promo, 400.0);

    acc.decrease_wager(200.0);
    assert_eq!(acc.wager, 0.0);
    let open = acc.withdrawable();
    assert_eq!(open.from_promo, 300.0);
    assert_eq!(open.total, 800.0);
    assert_eq!(open.locked_promo, 100.0);
}

#[test]
fn test_withdraw_takes_deposit_then_unlocked_promo() {
    let mut acc = account(200.0, 400.0);
    let split = acc.withdraw(350.0, 150.0).unwrap();
    assert_eq!(split, LedgerSplit { from_deposit: 200.0, from_promo: 150.0 });
    assert_eq!(acc.promo_balance, 250.0);

    assert!(acc.withdraw(100.0, 150.0).is_err());
    assert!(acc.withdraw(1_000.0, 150.0).is_err());
}

#[test]
fn test_balances_never_go_negative() {
    let random = SeededRandom::new(99);
    let mut acc = account(100.0, 40.0);
    acc.wager = 500.0;

    for _ in 0..2_000 {
        let total = acc.total();
        if total < 1.0 {
            acc.deposit_balance += 50.0;
            continue;
        }
        let bet = round_money(random.uniform(1.0, total.max(1.0)).min(total));
        let split = acc.deduct(bet);
        let win = if random.next_f64() < 0.45 { round_money(bet * random.uniform(1.0, 3.0)) } else { 0.0 };
        acc.credit(win, &split);
        acc.decrease_wager(bet);

        assert!(acc.deposit_balance >= -1e-9, "deposit went negative: {}", acc.deposit_balance);
        assert!(acc.promo_balance >= -1e-9, "promo went negative: {}", acc.promo_balance);
        assert!(acc.wager >= 0.0);
    }
}
