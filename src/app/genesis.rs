use crate::app::{invariants, AppConfig, ChainState, GenesisError};
use crate::gov::{GovParams, Governance};
use crate::identity::{Address, PublicKey};
use crate::staking::{Staking, StakingParams};
use crate::types::{Coin, Coins};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub coins: Coins,
}

/// Validator bonded out of a genesis account's funds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub owner: Address,
    pub consensus_pubkey: PublicKey,
    pub self_bond: Coin,
    pub moniker: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub chain_id: String,
    pub genesis_time: u64,
    pub config: AppConfig,
    pub staking_params: StakingParams,
    pub gov_params: GovParams,
    pub accounts: Vec<GenesisAccount>,
    pub validators: Vec<GenesisValidator>,
}

impl GenesisState {
    pub fn new(chain_id: &str, genesis_time: u64) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            genesis_time,
            config: AppConfig::default(),
            staking_params: StakingParams::default(),
            gov_params: GovParams::default(),
            accounts: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_staking_params(mut self, params: StakingParams) -> Self {
        self.staking_params = params;
        self
    }

    pub fn with_gov_params(mut self, params: GovParams) -> Self {
        self.gov_params = params;
        self
    }

    pub fn with_account(mut self, address: Address, coins: Coins) -> Self {
        self.accounts.push(GenesisAccount { address, coins });
        self
    }

    pub fn with_validator(mut self, owner: Address, consensus_pubkey: PublicKey, self_bond: Coin, moniker: &str) -> Self {
        self.validators.push(GenesisValidator {
            owner,
            consensus_pubkey,
            self_bond,
            moniker: moniker.to_string(),
        });
        self
    }

    /// Mint accounts, bond genesis validators and derive the initial
    /// validator set
    pub fn build(&self) -> Result<ChainState, GenesisError> {
        if self.chain_id.trim().is_empty() {
            return Err(GenesisError::EmptyChainId);
        }
        let mut state = ChainState::new(
            &self.chain_id,
            self.config.clone(),
            self.genesis_time,
            Staking::new(self.staking_params.clone()),
            Governance::new(self.gov_params.clone()),
        );

        let mut seen = BTreeSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address) {
                return Err(GenesisError::DuplicateAccount(account.address.to_string()));
            }
            state.ledger.mint_genesis(account.address, &account.coins)?;
        }
        for v in &self.validators {
            state.staking.create_validator(
                &mut state.ledger,
                v.owner,
                v.consensus_pubkey,
                &v.self_bond,
                &v.moniker,
            )?;
        }
        let updates = state.staking.apply_validator_set(self.genesis_time);
        invariants::check(&state)?;

        info!(
            chain_id = %self.chain_id,
            accounts = self.accounts.len(),
            validators = updates.len(),
            "genesis state built"
        );
        Ok(state)
    }
}
