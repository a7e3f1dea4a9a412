// Identity module - ed25519 keys, signatures and account addresses

mod address;
mod keypair;
mod signer;

pub use address::{Address, AddressError, ModuleAccount, ADDRESS_LEN, ADDRESS_PREFIX};
pub use keypair::{Keypair, KeypairError, PublicKey};
pub use signer::{Signature, SignatureError, Signer};
