//! Test fixtures and helpers.
//!
//! Deterministic identities and pre-wired ledgers for integration tests.

use safesnap::{Ledger, LedgerConfig};
use safesnap_core::{CallContext, Keypair, Principal};
use safesnap_store::MemoryStore;

/// A principal derived from a one-byte seed.
pub fn principal(seed: u8) -> Principal {
    Party::with_seed(seed).principal
}

/// A test identity.
#[derive(Debug, Clone)]
pub struct Party {
    pub keypair: Keypair,
    pub principal: Principal,
}

impl Party {
    /// Create a party with a random keypair.
    pub fn new() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from a one-byte seed.
    pub fn with_seed(seed: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[0] = seed;
        Self::from_keypair(Keypair::from_seed(&bytes))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let principal = keypair.principal();
        Self { keypair, principal }
    }

    /// Call context for this party.
    pub fn ctx(&self) -> CallContext {
        CallContext::new(self.principal)
    }
}

impl Default for Party {
    fn default() -> Self {
        Self::new()
    }
}

/// Create `count` deterministic parties with distinct principals.
pub fn multi_party(count: usize) -> Vec<Party> {
    (0..count).map(|i| Party::with_seed(i as u8)).collect()
}

/// The usual cast of a ledger test: one deployer and three wallets.
#[derive(Debug, Clone)]
pub struct Accounts {
    pub deployer: Party,
    pub wallet_1: Party,
    pub wallet_2: Party,
    pub wallet_3: Party,
}

impl Accounts {
    pub fn new() -> Self {
        Self {
            deployer: Party::with_seed(0),
            wallet_1: Party::with_seed(1),
            wallet_2: Party::with_seed(2),
            wallet_3: Party::with_seed(3),
        }
    }

    /// All principals, deployer first.
    pub fn principals(&self) -> Vec<Principal> {
        vec![
            self.deployer.principal,
            self.wallet_1.principal,
            self.wallet_2.principal,
            self.wallet_3.principal,
        ]
    }
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh in-memory ledger plus the standard accounts.
pub struct LedgerFixture {
    pub ledger: Ledger<MemoryStore>,
    pub accounts: Accounts,
}

impl LedgerFixture {
    /// Open an empty ledger with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(LedgerConfig::default()).await
    }

    /// Open an empty ledger with `config`.
    ///
    /// # Panics
    ///
    /// Panics if the ledger cannot be opened; an empty in-memory store has
    /// nothing to replay, so this only fires on a broken build.
    pub async fn with_config(config: LedgerConfig) -> Self {
        let ledger = Ledger::open(MemoryStore::new(), config)
            .await
            .expect("opening an empty in-memory ledger");
        Self {
            ledger,
            accounts: Accounts::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_parties_are_stable() {
        assert_eq!(principal(7), principal(7));
        assert_eq!(Party::with_seed(7).principal, principal(7));
    }

    #[test]
    fn test_multi_party_distinct() {
        let parties = multi_party(3);
        assert_ne!(parties[0].principal, parties[1].principal);
        assert_ne!(parties[1].principal, parties[2].principal);
        assert_ne!(parties[0].principal, parties[2].principal);
    }

    #[test]
    fn test_accounts_distinct() {
        let mut principals = Accounts::new().principals();
        principals.sort();
        principals.dedup();
        assert_eq!(principals.len(), 4);
    }

    #[tokio::test]
    async fn test_fixture_starts_empty() {
        let fixture = LedgerFixture::new().await;
        assert_eq!(fixture.ledger.photo_count().await, 0);
        assert_eq!(fixture.ledger.head_seq().await, 0);
    }
}
