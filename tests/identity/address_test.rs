// Identity Tests
// Keys, signatures and account addresses

use runechain::identity::{Address, AddressError, Keypair, ModuleAccount, Signer, ADDRESS_PREFIX};

#[test]
fn test_address_is_stable_for_a_key() {
    let keypair = Keypair::from_seed([7u8; 32]);

    let a = Address::from_public_key(&keypair.public_key());
    let b = Address::from_public_key(&keypair.public_key());

    assert_eq!(a, b);
    assert!(a.to_string().starts_with(ADDRESS_PREFIX));
}

#[test]
fn test_address_string_round_trip() {
    let addr = Address::from_public_key(&Keypair::generate().public_key());
    let parsed: Address = addr.to_string().parse().unwrap();
    assert_eq!(parsed, addr);
}

#[test]
fn test_address_parse_rejects_garbage() {
    assert!(matches!(Address::parse("cosmos1abc"), Err(AddressError::InvalidFormat(_))));
    assert!(matches!(Address::parse("rune1"), Err(AddressError::InvalidFormat(_))));
    assert!(matches!(Address::parse("rune10OIl"), Err(AddressError::InvalidBase58(_))));
    assert!(matches!(Address::parse("rune12g"), Err(AddressError::InvalidLength(_))));
}

#[test]
fn test_module_accounts_are_distinct() {
    let mut seen: Vec<Address> = ModuleAccount::ALL.iter().map(|m| m.address()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), ModuleAccount::ALL.len());
    assert_eq!(ModuleAccount::BondedPool.address(), Address::for_module("bonded_pool"));
}

#[test]
fn test_signature_binds_message_and_key() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let sig = Signer::sign(&alice, b"transfer 10RUNE");

    assert!(Signer::verify(&alice.public_key(), b"transfer 10RUNE", &sig));
    assert!(!Signer::verify(&alice.public_key(), b"transfer 11RUNE", &sig));
    assert!(!Signer::verify(&bob.public_key(), b"transfer 10RUNE", &sig));
}

#[test]
fn test_keypair_bytes_round_trip() {
    let keypair = Keypair::generate();
    let restored = Keypair::from_bytes(&keypair.to_bytes()).unwrap();
    assert_eq!(restored.public_key(), keypair.public_key());
}
