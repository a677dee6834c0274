//! Threshold secret sharing of hex secrets
//!
//! The secret is prefixed with a `1` marker bit, cut into field-width segments
//! from the right, and each segment gets its own random polynomial. Every share
//! carries one evaluation per segment.

use crate::field::GaloisField;
use crate::share::{bin_to_hex, hex_to_bin, Share};
use crate::{MultisigError, MultisigResult};
use rand::rngs::OsRng;
use rand::Rng;
use zeroize::{Zeroize, Zeroizing};

/// Splits and recombines secrets over a fixed field width
#[derive(Debug, Clone)]
pub struct SecretSharing {
    field: GaloisField,
}

impl SecretSharing {
    /// Engine for a field width in `3..=20`
    pub fn new(bits: u32) -> MultisigResult<Self> {
        Ok(Self {
            field: GaloisField::new(bits)?,
        })
    }

    /// Field width used for new shares
    pub fn bits(&self) -> u32 {
        self.field.bits()
    }

    /// Split `secret_hex` into `num_shares` shares, any `threshold` of which recombine
    pub fn share(
        &self,
        secret_hex: &str,
        num_shares: u32,
        threshold: u32,
    ) -> MultisigResult<Vec<Share>> {
        let max = self.field.max();
        if !(2..=max).contains(&num_shares) {
            return Err(MultisigError::InvalidParameters(format!(
                "number of shares must be between 2 and {max}, got {num_shares}"
            )));
        }
        if !(2..=max).contains(&threshold) {
            return Err(MultisigError::InvalidParameters(format!(
                "threshold must be between 2 and {max}, got {threshold}"
            )));
        }
        if threshold > num_shares {
            return Err(MultisigError::InvalidParameters(format!(
                "threshold {threshold} exceeds number of shares {num_shares}"
            )));
        }

        let secret_bits = hex_to_bin(secret_hex)
            .map(|bin| Zeroizing::new(format!("1{bin}")))
            .ok_or_else(|| MultisigError::InvalidParameters("secret must be a hex string".to_string()))?;
        let segments = Zeroizing::new(split_segments(&secret_bits, self.bits()));

        tracing::debug!(
            bits = self.bits(),
            segments = segments.len(),
            num_shares,
            threshold,
            "splitting secret"
        );

        // evaluations[share][segment], segment 0 is the right-most one
        let mut evaluations = vec![Vec::with_capacity(segments.len()); num_shares as usize];
        let mut coeffs = Zeroizing::new(vec![0u32; threshold as usize]);
        for &segment in segments.iter() {
            coeffs[0] = segment;
            for coeff in coeffs.iter_mut().skip(1) {
                *coeff = OsRng.gen_range(1..=max);
            }
            for (x, column) in (1..=num_shares).zip(evaluations.iter_mut()) {
                column.push(self.field.horner(x, &coeffs));
            }
        }

        let width = self.bits() as usize;
        let mut shares = Vec::with_capacity(num_shares as usize);
        for (x, mut column) in (1..=num_shares).zip(evaluations) {
            let bin: Zeroizing<String> = Zeroizing::new(
                column
                    .iter()
                    .rev()
                    .map(|value| format!("{value:0width$b}"))
                    .collect(),
            );
            column.zeroize();
            shares.push(Share::new(self.bits(), x, bin_to_hex(&bin))?);
        }

        Ok(shares)
    }

    /// Recover the secret from a set of shares.
    ///
    /// Duplicate ids are ignored. Supplying fewer shares than the threshold does
    /// not fail; it yields an unrelated value.
    pub fn combine(shares: &[Share]) -> MultisigResult<Zeroizing<String>> {
        let bin = interpolate(shares, 0)?;
        let start = bin.find('1').map_or(0, |idx| idx + 1);
        Ok(Zeroizing::new(bin_to_hex(&bin[start..])))
    }

    /// Derive an additional share with `id` from an existing qualifying set
    pub fn new_share(id: u32, shares: &[Share]) -> MultisigResult<Share> {
        let first = shares
            .first()
            .ok_or_else(|| MultisigError::InvalidParameters("no shares supplied".to_string()))?;
        let bits = first.bits();
        let max = (1u32 << bits) - 1;
        if id == 0 || id > max {
            return Err(MultisigError::InvalidParameters(format!(
                "share id must be between 1 and {max}, got {id}"
            )));
        }

        let bin = interpolate(shares, id)?;
        Share::new(bits, id, bin_to_hex(&bin))
    }
}

impl Default for SecretSharing {
    fn default() -> Self {
        Self {
            field: GaloisField::default(),
        }
    }
}

/// Interpolate every segment position at `at` and concatenate the results
fn interpolate(shares: &[Share], at: u32) -> MultisigResult<Zeroizing<String>> {
    let first = shares
        .first()
        .ok_or_else(|| MultisigError::InvalidParameters("no shares supplied".to_string()))?;
    let bits = first.bits();
    if let Some(other) = shares.iter().find(|share| share.bits() != bits) {
        return Err(MultisigError::MismatchedShares {
            expected: bits,
            found: other.bits(),
        });
    }
    let field = GaloisField::new(bits)?;

    let mut xs = Vec::with_capacity(shares.len());
    let mut columns: Vec<Zeroizing<Vec<u32>>> = Vec::with_capacity(shares.len());
    for share in shares {
        if xs.contains(&share.id()) {
            continue;
        }
        let bin = hex_to_bin(share.payload())
            .map(Zeroizing::new)
            .ok_or_else(|| MultisigError::MalformedShare("payload is not hex".to_string()))?;
        xs.push(share.id());
        columns.push(Zeroizing::new(split_segments(&bin, bits)));
    }

    let segments = columns.iter().map(|column| column.len()).max().unwrap_or(0);
    let width = bits as usize;
    let mut values = Zeroizing::new(Vec::with_capacity(segments));
    let mut ys = Zeroizing::new(vec![0u32; columns.len()]);
    for segment in 0..segments {
        for (y, column) in ys.iter_mut().zip(&columns) {
            *y = column.get(segment).copied().unwrap_or(0);
        }
        values.push(field.lagrange(at, &xs, &ys));
    }

    Ok(Zeroizing::new(
        values
            .iter()
            .rev()
            .map(|value| format!("{value:0width$b}"))
            .collect(),
    ))
}

/// Cut a binary string into `bits`-wide values from the right; the left-most may be shorter
fn split_segments(bin: &str, bits: u32) -> Vec<u32> {
    let width = bits as usize;
    let mut parts = Vec::with_capacity(bin.len() / width + 1);
    let mut end = bin.len();
    while end > width {
        parts.push(parse_bin(&bin[end - width..end]));
        end -= width;
    }
    parts.push(parse_bin(&bin[..end]));
    parts
}

fn parse_bin(bin: &str) -> u32 {
    bin.bytes().fold(0u32, |acc, b| (acc << 1) | u32::from(b == b'1'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments_right_to_left() {
        assert_eq!(split_segments("1101100000001", 8), vec![0b0000_0001, 0b11011]);
        assert_eq!(split_segments("1", 8), vec![1]);
        assert_eq!(split_segments("", 8), vec![0]);
    }

    #[test]
    fn test_parameter_validation() {
        let engine = SecretSharing::default();
        assert!(engine.share("ab", 1, 2).is_err());
        assert!(engine.share("ab", 2, 1).is_err());
        assert!(engine.share("ab", 256, 2).is_err());
        assert!(engine.share("ab", 2, 3).is_err());
        assert!(matches!(
            engine.share("not hex", 2, 2),
            Err(MultisigError::InvalidParameters(_))
        ));
        assert!(SecretSharing::new(2).is_err());
    }

    #[test]
    fn test_two_of_two() {
        let engine = SecretSharing::default();
        let secret = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let shares = engine.share(secret, 2, 2).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].id(), 1);
        assert_eq!(shares[1].id(), 2);
        assert_eq!(*SecretSharing::combine(&shares).unwrap(), secret);
    }

    #[test]
    fn test_uppercase_secret_recombines_lowercase() {
        let engine = SecretSharing::default();
        let shares = engine.share("ABCDEF", 3, 2).unwrap();
        assert_eq!(*SecretSharing::combine(&shares[1..]).unwrap(), "abcdef");
    }

    #[test]
    fn test_empty_share_set() {
        assert!(SecretSharing::combine(&[]).is_err());
        assert!(SecretSharing::new_share(3, &[]).is_err());
    }

    #[test]
    fn test_new_share_joins_set() {
        let engine = SecretSharing::default();
        let shares = engine.share("c0ffee", 2, 2).unwrap();
        let extra = SecretSharing::new_share(7, &shares).unwrap();
        assert_eq!(extra.id(), 7);
        let mixed = vec![shares[0].clone(), extra];
        assert_eq!(*SecretSharing::combine(&mixed).unwrap(), "c0ffee");
    }

    #[test]
    fn test_new_share_rejects_bad_id() {
        let engine = SecretSharing::default();
        let shares = engine.share("c0ffee", 2, 2).unwrap();
        assert!(SecretSharing::new_share(0, &shares).is_err());
        assert!(SecretSharing::new_share(256, &shares).is_err());
    }
}
