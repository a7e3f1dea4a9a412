use crate::identity::{Keypair, Signer};
use crate::tx::{Msg, Tx, TxBody};
use crate::types::Coins;
use thiserror::Error;

/// Errors that can occur when building a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Missing signer: signing keypair is required")]
    MissingSigner,

    #[error("Missing chain id")]
    MissingChainId,

    #[error("Missing sequence: the signer's current sequence is required")]
    MissingSequence,

    #[error("Transaction has no messages")]
    NoMessages,
}

/// Builder for signed transactions
pub struct TxBuilder<'a> {
    signer: Option<&'a Keypair>,
    chain_id: Option<String>,
    msgs: Vec<Msg>,
    fee: Coins,
    memo: String,
    sequence: Option<u64>,
}

impl<'a> TxBuilder<'a> {
    pub fn new() -> Self {
        Self {
            signer: None,
            chain_id: None,
            msgs: Vec::new(),
            fee: Coins::new(),
            memo: String::new(),
            sequence: None,
        }
    }

    /// Set the signing keypair (required)
    pub fn signer(mut self, keypair: &'a Keypair) -> Self {
        self.signer = Some(keypair);
        self
    }

    /// Set the chain id (required)
    pub fn chain_id(mut self, chain_id: &str) -> Self {
        self.chain_id = Some(chain_id.to_string());
        self
    }

    /// Append a message; messages apply in the order added
    pub fn msg(mut self, msg: Msg) -> Self {
        self.msgs.push(msg);
        self
    }

    pub fn fee(mut self, fee: Coins) -> Self {
        self.fee = fee;
        self
    }

    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    /// Set the account sequence (required)
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Build and sign the transaction
    pub fn build(self) -> Result<Tx, BuildError> {
        let keypair = self.signer.ok_or(BuildError::MissingSigner)?;
        let chain_id = self.chain_id.ok_or(BuildError::MissingChainId)?;
        let sequence = self.sequence.ok_or(BuildError::MissingSequence)?;
        if self.msgs.is_empty() {
            return Err(BuildError::NoMessages);
        }

        let body = TxBody {
            chain_id,
            msgs: self.msgs,
            fee: self.fee,
            memo: self.memo,
            sequence,
        };
        let signature = Signer::sign(keypair, &body.sign_bytes());
        Ok(Tx::from_parts(body, keypair.public_key(), signature))
    }
}

impl<'a> Default for TxBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}
