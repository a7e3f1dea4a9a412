// Tx module - messages, signed envelopes and their wire codec

mod builder;
mod codec;
mod envelope;
mod error;
mod msg;

pub use builder::{BuildError, TxBuilder};
pub use codec::{CodecError, TxCodec};
pub use envelope::{Tx, TxBody};
pub use error::TxError;
pub use msg::{Msg, Route, MAX_MEMO_LEN, MAX_MONIKER_LEN};
