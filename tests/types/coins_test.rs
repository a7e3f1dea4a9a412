// Coins Tests

use runechain::types::{Coin, CoinError, Coins};

#[test]
fn test_parse_multi_denom() {
    let coins: Coins = "10RUNE,5ATOM".parse().unwrap();
    assert_eq!(coins.amount_of("RUNE"), 10);
    assert_eq!(coins.amount_of("ATOM"), 5);
    assert_eq!(coins.amount_of("BTC"), 0);
    // denominations render in sorted order
    assert_eq!(coins.to_string(), "5ATOM,10RUNE");
}

#[test]
fn test_parse_merges_repeated_denoms() {
    let coins: Coins = "10RUNE,5RUNE".parse().unwrap();
    assert_eq!(coins, Coins::single(15, "RUNE"));
}

#[test]
fn test_empty_string_is_empty_balance() {
    let coins: Coins = "".parse().unwrap();
    assert!(coins.is_zero());
}

#[test]
fn test_invalid_denom_rejected() {
    assert!(matches!("10R".parse::<Coin>(), Err(CoinError::InvalidDenom(_))));
    assert!(matches!("10rune-x".parse::<Coin>(), Err(CoinError::InvalidDenom(_))));
    assert!(matches!("RUNE10".parse::<Coin>(), Err(CoinError::Parse(_))));
}

#[test]
fn test_zero_single_is_empty() {
    assert!(Coins::single(0, "RUNE").is_zero());
    assert_eq!(Coins::single(0, "RUNE"), Coins::new());
}

#[test]
fn test_checked_sub_insufficient_is_none() {
    let have = Coins::single(5, "RUNE");
    assert!(have.checked_sub(&Coins::single(6, "RUNE")).is_none());
    assert!(have.checked_sub(&Coins::single(1, "ATOM")).is_none());
}

#[test]
fn test_is_all_gte() {
    let have: Coins = "10RUNE,5ATOM".parse().unwrap();
    assert!(have.is_all_gte(&Coins::single(10, "RUNE")));
    assert!(!have.is_all_gte(&"10RUNE,6ATOM".parse().unwrap()));
    assert!(have.is_all_gte(&Coins::new()));
}

#[test]
fn test_decoded_zero_entry_fails_validation() {
    let decoded: Coins = serde_json::from_str(r#"{"RUNE":0}"#).unwrap();
    assert!(decoded.validate().is_err());
    assert!(Coins::single(3, "RUNE").validate().is_ok());
}
