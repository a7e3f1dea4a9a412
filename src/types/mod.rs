// Types module - shared value types: exact rationals, coins, block headers, events

mod block;
mod coin;
mod rational;

pub use block::{BlockHeader, Event};
pub use coin::{Coin, CoinError, Coins};
pub use rational::{Rational, RationalError};
