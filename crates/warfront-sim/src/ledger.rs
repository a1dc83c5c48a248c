//! Per-client currency and population accounts.
//!
//! Only the command validator reserves, and it runs serially, so a check
//! followed by a debit on the same account can never interleave with
//! another writer.

use std::collections::BTreeMap;

use thiserror::Error;

use warfront_core::events::Notification;
use warfront_core::state::LedgerView;
use warfront_core::types::ClientId;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("client {0:?} has no account")]
    UnknownClient(ClientId),
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u32, have: u32 },
    #[error("population limit: {used} + {need} exceeds cap {cap}")]
    PopulationLimit { used: u32, need: u32, cap: u32 },
}

impl LedgerError {
    /// Notification owed to the client, if the failure is a business rule.
    pub fn notification(&self) -> Option<Notification> {
        match self {
            LedgerError::UnknownClient(_) => None,
            LedgerError::InsufficientFunds { .. } => Some(Notification::InsufficientFunds),
            LedgerError::PopulationLimit { .. } => Some(Notification::PopulationLimitReached),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Account {
    pub currency: u32,
    pub population: u32,
    pub population_cap: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: BTreeMap<ClientId, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account. Returns false if the client already has one.
    pub fn open(&mut self, client: ClientId, currency: u32, population_cap: u32) -> bool {
        if self.accounts.contains_key(&client) {
            return false;
        }
        self.accounts.insert(
            client,
            Account {
                currency,
                population: 0,
                population_cap,
            },
        );
        true
    }

    pub fn close(&mut self, client: ClientId) -> Option<Account> {
        self.accounts.remove(&client)
    }

    pub fn account(&self, client: ClientId) -> Option<&Account> {
        self.accounts.get(&client)
    }

    #[cfg(test)]
    pub(crate) fn account_mut(&mut self, client: ClientId) -> Option<&mut Account> {
        self.accounts.get_mut(&client)
    }

    /// Check currency and population together, then debit both. On error
    /// nothing changes.
    pub fn try_reserve(
        &mut self,
        client: ClientId,
        currency: u32,
        population: u32,
    ) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&client)
            .ok_or(LedgerError::UnknownClient(client))?;
        if currency > account.currency {
            return Err(LedgerError::InsufficientFunds {
                need: currency,
                have: account.currency,
            });
        }
        if population > 0 && account.population + population > account.population_cap {
            return Err(LedgerError::PopulationLimit {
                used: account.population,
                need: population,
                cap: account.population_cap,
            });
        }
        account.currency -= currency;
        account.population += population;
        Ok(())
    }

    pub fn deposit(&mut self, client: ClientId, amount: u32) {
        if let Some(account) = self.accounts.get_mut(&client) {
            account.currency = account.currency.saturating_add(amount);
        }
    }

    pub fn release_population(&mut self, client: ClientId, amount: u32) {
        if let Some(account) = self.accounts.get_mut(&client) {
            account.population = account.population.saturating_sub(amount);
        }
    }

    pub fn add_population_cap(&mut self, client: ClientId, amount: u32) {
        if let Some(account) = self.accounts.get_mut(&client) {
            account.population_cap = account.population_cap.saturating_add(amount);
        }
    }

    /// Losing housing can leave population above the cap; new reservations
    /// are refused until it drops back.
    pub fn remove_population_cap(&mut self, client: ClientId, amount: u32) {
        if let Some(account) = self.accounts.get_mut(&client) {
            account.population_cap = account.population_cap.saturating_sub(amount);
        }
    }

    pub fn views(&self) -> Vec<LedgerView> {
        self.accounts
            .iter()
            .map(|(client, account)| LedgerView {
                client: *client,
                currency: account.currency,
                population: account.population,
                population_cap: account.population_cap,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: ClientId = ClientId(1);

    #[test]
    fn test_reserve_debits_both() {
        let mut ledger = Ledger::new();
        ledger.open(C, 150, 10);
        ledger.account_mut(C).unwrap().population = 5;
        ledger.try_reserve(C, 100, 1).unwrap();
        let account = ledger.account(C).unwrap();
        assert_eq!(account.currency, 50);
        assert_eq!(account.population, 6);
    }

    #[test]
    fn test_failed_reserve_changes_nothing() {
        let mut ledger = Ledger::new();
        ledger.open(C, 150, 1);
        ledger.try_reserve(C, 10, 1).unwrap();
        let err = ledger.try_reserve(C, 10, 1).unwrap_err();
        assert_eq!(err.notification(), Some(Notification::PopulationLimitReached));
        assert_eq!(ledger.account(C).unwrap().currency, 140);

        let err = ledger.try_reserve(C, 500, 0).unwrap_err();
        assert_eq!(err.notification(), Some(Notification::InsufficientFunds));
        assert_eq!(ledger.account(C).unwrap().currency, 140);
    }

    #[test]
    fn test_unknown_client_is_not_a_business_rejection() {
        let mut ledger = Ledger::new();
        let err = ledger.try_reserve(ClientId(9), 0, 0).unwrap_err();
        assert_eq!(err, LedgerError::UnknownClient(ClientId(9)));
        assert_eq!(err.notification(), None);
    }

    #[test]
    fn test_sequence_never_goes_negative_or_over_cap() {
        let mut ledger = Ledger::new();
        ledger.open(C, 1000, 7);
        for i in 0..50u32 {
            let _ = ledger.try_reserve(C, 37 + i % 5, 1 + i % 2);
            let account = ledger.account(C).unwrap();
            assert!(account.population <= account.population_cap);
        }
        let account = ledger.account(C).unwrap();
        assert!(account.currency < 1000);
        assert_eq!(account.population, 7);
    }

    #[test]
    fn test_open_twice_is_refused() {
        let mut ledger = Ledger::new();
        assert!(ledger.open(C, 10, 1));
        assert!(!ledger.open(C, 99, 99));
        assert_eq!(ledger.account(C).unwrap().currency, 10);
    }
}
