use crate::identity::{Address, PublicKey, Signature, Signer};
use crate::tx::Msg;
use crate::types::Coins;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The signed part of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    pub chain_id: String,
    pub msgs: Vec<Msg>,
    pub fee: Coins,
    pub memo: String,
    /// Must equal the signer account's sequence when the tx is delivered
    pub sequence: u64,
}

impl TxBody {
    /// Canonical bytes covered by the signature
    pub fn sign_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }
}

/// A transaction envelope as ordered by consensus
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    body: TxBody,
    signer: PublicKey,
    signature: Signature,
}

impl Tx {
    pub fn from_parts(body: TxBody, signer: PublicKey, signature: Signature) -> Self {
        Self {
            body,
            signer,
            signature,
        }
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn msgs(&self) -> &[Msg] {
        &self.body.msgs
    }

    pub fn fee(&self) -> &Coins {
        &self.body.fee
    }

    pub fn sequence(&self) -> u64 {
        self.body.sequence
    }

    pub fn signer(&self) -> &PublicKey {
        &self.signer
    }

    pub fn signer_address(&self) -> Address {
        Address::from_public_key(&self.signer)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn verify_signature(&self) -> bool {
        Signer::verify(&self.signer, &self.body.sign_bytes(), &self.signature)
    }

    /// SHA-256 of the signed body and signature
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.body.sign_bytes());
        hasher.update(self.signature.to_bytes());
        hasher.finalize().into()
    }
}
