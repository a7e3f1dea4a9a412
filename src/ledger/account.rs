use crate::identity::{Address, PublicKey};
use crate::types::Coins;
use serde::{Deserialize, Serialize};

/// An account record: balances plus the replay-protection counter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    address: Address,
    coins: Coins,
    sequence: u64,
    /// Recorded from the first transaction the account signs
    pub_key: Option<PublicKey>,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            coins: Coins::new(),
            sequence: 0,
            pub_key: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn coins(&self) -> &Coins {
        &self.coins
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pub_key(&self) -> Option<&PublicKey> {
        self.pub_key.as_ref()
    }

    pub(crate) fn set_coins(&mut self, coins: Coins) {
        self.coins = coins;
    }

    pub(crate) fn increment_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub(crate) fn set_pub_key(&mut self, pub_key: PublicKey) {
        self.pub_key = Some(pub_key);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
