// App module - state container, transaction router, block processor and
// the committed-state query path

mod block;
mod config;
mod error;
mod genesis;
pub mod invariants;
mod query;
mod router;
mod state;

pub use block::{App, EndBlockResult};
pub use config::{AppConfig, TxPolicy};
pub use error::{FatalError, GenesisError, QueryError};
pub use genesis::{GenesisAccount, GenesisState, GenesisValidator};
pub use query::QueryHandle;
pub use router::{deliver_tx, TxResult};
pub use state::ChainState;
