//! Integration tests for share generation and recombination

use proptest::prelude::*;
use sdkd_multisig::{MultisigError, SecretSharing, Share};

#[test]
fn test_known_share_vector() {
    let shares: Vec<Share> = [
        "802d28e0cc9ed1f0daf76aab23c0740d8a69b1d32018e",
        "803352ba6be5dd94728bc3d3a9489960ce710741bfc80",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect();

    let secret = SecretSharing::combine(&shares).unwrap();
    assert_eq!(*secret, "d94527908e99bcff99bf7106f16d2490cf60e692");
}

#[test]
fn test_duplicate_ids_are_ignored() {
    let shares: Vec<Share> = [
        "802d28e0cc9ed1f0daf76aab23c0740d8a69b1d32018e",
        "802d28e0cc9ed1f0daf76aab23c0740d8a69b1d32018e",
        "803352ba6be5dd94728bc3d3a9489960ce710741bfc80",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect();

    let secret = SecretSharing::combine(&shares).unwrap();
    assert_eq!(*secret, "d94527908e99bcff99bf7106f16d2490cf60e692");
}

#[test]
fn test_mismatched_bit_widths() {
    let eight = SecretSharing::new(8).unwrap().share("abcd", 2, 2).unwrap();
    let twelve = SecretSharing::new(12).unwrap().share("abcd", 2, 2).unwrap();

    let mixed = vec![eight[0].clone(), twelve[1].clone()];
    assert!(matches!(
        SecretSharing::combine(&mixed),
        Err(MultisigError::MismatchedShares { expected: 8, found: 12 })
    ));
}

#[test]
fn test_shares_encode_field_width() {
    let shares = SecretSharing::new(12).unwrap().share("ff", 3, 2).unwrap();
    for (i, share) in shares.iter().enumerate() {
        let encoded = share.to_string();
        assert!(encoded.starts_with('C'));
        assert_eq!(&encoded[1..4], format!("{:03x}", i + 1));
        assert_eq!(encoded.parse::<Share>().unwrap(), *share);
    }
}

#[test]
fn test_below_threshold_does_not_error() {
    let engine = SecretSharing::default();
    let secret = "d94527908e99bcff99bf7106f16d2490cf60e692";
    let shares = engine.share(secret, 3, 3).unwrap();

    let partial = SecretSharing::combine(&shares[..2]).unwrap();
    assert_ne!(*partial, secret);
}

#[test]
fn test_single_share_reveals_nothing_useful() {
    // With a 2-of-2 split the lone share is uniformly distributed, so repeated
    // splits of the same secret must not repeat a share payload
    let engine = SecretSharing::default();
    let secret = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    let first = engine.share(secret, 2, 2).unwrap();
    let second = engine.share(secret, 2, 2).unwrap();
    assert_ne!(first[0].payload(), second[0].payload());
    assert_ne!(first[1].payload(), second[1].payload());
}

fn hex_secret() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..48).prop_map(hex::encode)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn any_threshold_subset_recombines(
        secret in hex_secret(),
        bits in 3u32..=12,
        num_shares in 2u32..=6,
        threshold_offset in 0u32..5,
        rotate in 0usize..6,
    ) {
        let threshold = 2 + threshold_offset % (num_shares - 1);
        let engine = SecretSharing::new(bits).unwrap();
        let mut shares = engine.share(&secret, num_shares, threshold).unwrap();
        prop_assert_eq!(shares.len(), num_shares as usize);

        let rotation = rotate % shares.len();
        shares.rotate_left(rotation);
        let subset = &shares[..threshold as usize];
        let combined = SecretSharing::combine(subset).unwrap();
        prop_assert_eq!(combined.as_str(), secret.as_str());
    }

    #[test]
    fn below_threshold_yields_unrelated_output(
        secret in prop::collection::vec(any::<u8>(), 16..48).prop_map(hex::encode),
        bits in 3u32..=12,
        num_shares in 2u32..=6,
        threshold_offset in 0u32..5,
    ) {
        let threshold = 2 + threshold_offset % (num_shares - 1);
        let engine = SecretSharing::new(bits).unwrap();

        let mut outputs = Vec::new();
        for _ in 0..3 {
            let shares = engine.share(&secret, num_shares, threshold).unwrap();
            let partial = SecretSharing::combine(&shares[..threshold as usize - 1]).unwrap();
            prop_assert_ne!(partial.as_str(), secret.as_str());
            outputs.push(partial.to_string());
        }
        prop_assert!(outputs.iter().any(|output| *output != outputs[0]));
    }

    #[test]
    fn string_form_round_trips(secret in hex_secret(), bits in 3u32..=20) {
        let engine = SecretSharing::new(bits).unwrap();
        let shares = engine.share(&secret, 2, 2).unwrap();
        let reparsed: Vec<Share> = shares
            .iter()
            .map(|share| share.to_string().parse().unwrap())
            .collect();
        let combined = SecretSharing::combine(&reparsed).unwrap();
        prop_assert_eq!(combined.as_str(), secret.as_str());
    }
}
