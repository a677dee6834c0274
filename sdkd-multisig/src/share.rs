//! Share wire format: `<bits base36><id hex><payload hex>`

use crate::field::{MAX_BITS, MIN_BITS};
use crate::{MultisigError, MultisigResult};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One share of a secret
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    bits: u32,
    id: u32,
    payload: String,
}

impl Share {
    /// Assemble a share, checking every component
    pub fn new(bits: u32, id: u32, payload: impl Into<String>) -> MultisigResult<Self> {
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(MultisigError::MalformedShare(format!("bit width {bits} out of range")));
        }
        let max = (1u32 << bits) - 1;
        if id == 0 || id > max {
            return Err(MultisigError::MalformedShare(format!(
                "id {id} must be between 1 and {max}"
            )));
        }
        let payload = payload.into();
        if payload.is_empty() || !payload.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MultisigError::MalformedShare("payload must be non-empty hex".to_string()));
        }

        Ok(Self { bits, id, payload })
    }

    /// Field width the share was produced with
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Evaluation point
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Hex payload
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Number of hex digits used for ids at a given width
pub(crate) fn id_width(bits: u32) -> usize {
    format!("{:x}", (1u32 << bits) - 1).len()
}

impl FromStr for Share {
    type Err = MultisigError;

    fn from_str(value: &str) -> MultisigResult<Self> {
        let value = value.trim();
        let mut chars = value.chars();
        let bits = chars
            .next()
            .and_then(|c| c.to_digit(36))
            .ok_or_else(|| MultisigError::MalformedShare("missing bit width".to_string()))?;
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(MultisigError::MalformedShare(format!("bit width {bits} out of range")));
        }

        let width = id_width(bits);
        let rest = chars.as_str();
        if rest.len() <= width || !rest.is_ascii() {
            return Err(MultisigError::MalformedShare("share too short".to_string()));
        }
        let (id_hex, payload) = rest.split_at(width);
        let id = u32::from_str_radix(id_hex, 16)
            .map_err(|e| MultisigError::MalformedShare(format!("bad id: {e}")))?;

        Self::new(bits, id, payload)
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = std::char::from_digit(self.bits, 36)
            .map(|c| c.to_ascii_uppercase())
            .ok_or(fmt::Error)?;
        write!(
            f,
            "{}{:0width$x}{}",
            bits,
            self.id,
            self.payload,
            width = id_width(self.bits)
        )
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("bits", &self.bits)
            .field("id", &self.id)
            .field("payload", &"[REDACTED]")
            .finish()
    }
}

/// Expand hex into a string of binary digits, four per hex digit
pub(crate) fn hex_to_bin(hex: &str) -> Option<String> {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = c.to_digit(16)?;
        out.push_str(&format!("{nibble:04b}"));
    }
    Some(out)
}

/// Collapse binary digits into lowercase hex, left-padding to a multiple of four
pub(crate) fn bin_to_hex(bin: &str) -> String {
    let pad = (4 - bin.len() % 4) % 4;
    let padded: String = "0".repeat(pad) + bin;

    padded
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            let nibble = chunk.iter().fold(0u32, |acc, &b| (acc << 1) | u32::from(b == b'1'));
            std::char::from_digit(nibble, 16).unwrap_or('0')
        })
        .collect()
}
