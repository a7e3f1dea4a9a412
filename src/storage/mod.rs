// Storage module - persistence of committed chain state and the local keyring
// over sled

mod store;

pub use store::{ChainStore, StorageStats, StoreError};
