use serde::{Deserialize, Serialize};

/// What still happens to a transaction whose messages failed after it
/// passed signature, sequence and fee checks
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPolicy {
    pub advance_sequence_on_failure: bool,
    pub charge_fee_on_failure: bool,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            advance_sequence_on_failure: false,
            charge_fee_on_failure: true,
        }
    }
}

impl TxPolicy {
    pub fn with_advance_sequence_on_failure(mut self, advance: bool) -> Self {
        self.advance_sequence_on_failure = advance;
        self
    }

    pub fn with_charge_fee_on_failure(mut self, charge: bool) -> Self {
        self.charge_fee_on_failure = charge;
        self
    }
}

/// State-machine configuration. Part of genesis so every replica agrees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub tx_policy: TxPolicy,
    /// Run the invariant checks at the end of every block
    pub check_invariants: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tx_policy: TxPolicy::default(),
            check_invariants: true,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tx_policy(mut self, policy: TxPolicy) -> Self {
        self.tx_policy = policy;
        self
    }

    pub fn with_check_invariants(mut self, check: bool) -> Self {
        self.check_invariants = check;
        self
    }
}
