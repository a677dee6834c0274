//! Property tests for key derivation and the mnemonic codec

use proptest::prelude::*;
use sdkd_core::{
    entropy_to_mnemonic, mnemonic_to_entropy, personal_message_hash, Address, PrivateKey,
    MNEMONIC_WORD_COUNT,
};
use secrecy::ExposeSecret;

fn valid_key() -> impl Strategy<Value = PrivateKey> {
    prop::array::uniform32(any::<u8>())
        .prop_filter_map("not a valid scalar", |bytes| PrivateKey::from_bytes(&bytes).ok())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mnemonic_round_trip(entropy in prop::array::uniform32(any::<u8>())) {
        let phrase = entropy_to_mnemonic(&entropy).unwrap();
        prop_assert_eq!(phrase.expose_secret().split(' ').count(), MNEMONIC_WORD_COUNT);
        prop_assert_eq!(mnemonic_to_entropy(phrase.expose_secret()).unwrap(), entropy.to_vec());
    }

    #[test]
    fn address_matches_checksum_rendering(key in valid_key()) {
        let address = key.address().unwrap();
        let checksum = address.to_checksum_string();
        prop_assert_eq!(checksum.to_lowercase(), address.to_string());
        prop_assert!(Address::is_checksum_valid(&checksum));
        prop_assert_eq!(checksum.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn personal_signature_recovers_address(
        key in valid_key(),
        message in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let signature = key.sign_personal_message(&message).unwrap();
        let recovered = signature.recover(&personal_message_hash(&message)).unwrap();
        prop_assert_eq!(recovered.address(), key.address().unwrap());
    }
}
