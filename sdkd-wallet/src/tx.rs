//! Transaction validation, assembly and signing
//!
//! Legacy (pre-1559) transactions only. When a chain id is set the signature
//! follows EIP-155 replay protection.

use crate::error::ValidationKind;
use crate::units::{self, EtherUnit};
use crate::{WalletError, WalletResult};
use rlp::RlpStream;
use sdkd_core::{keccak256, strip_hex_prefix, Address, PrivateKey, RecoverableSignature};
use serde::{Deserialize, Serialize};

/// Recipient placeholder that requests contract creation
pub const CONTRACT_CREATION_SENTINEL: &str = "0xCONTRACT";

/// Gas for a plain value transfer
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

/// User-supplied transaction fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDraft {
    /// Recipient; empty for contract creation
    pub to: String,
    /// Decimal amount in `unit`
    pub value: String,
    #[serde(default)]
    pub unit: EtherUnit,
    pub gas_limit: u64,
    /// Call data, `0x` optional
    #[serde(default)]
    pub data: String,
}

impl TxDraft {
    /// Plain wei transfer
    pub fn transfer(to: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            value: value.into(),
            unit: EtherUnit::Wei,
            gas_limit: DEFAULT_GAS_LIMIT,
            data: String::new(),
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: EtherUnit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }
}

fn is_valid_recipient(to: &str) -> bool {
    let Some(digits) = to.strip_prefix("0x") else {
        return false;
    };
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    let all_lower = !digits.bytes().any(|b| b.is_ascii_uppercase());
    let all_upper = !digits.bytes().any(|b| b.is_ascii_lowercase());
    all_lower || all_upper || Address::is_checksum_valid(to)
}

fn is_hex_data(data: &str) -> bool {
    strip_hex_prefix(data).bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check a draft; the contract-creation sentinel is rewritten to an empty recipient
pub fn validate(draft: &mut TxDraft) -> Result<(), ValidationKind> {
    if draft.to != CONTRACT_CREATION_SENTINEL && !is_valid_recipient(&draft.to) {
        return Err(ValidationKind::BadAddress);
    }
    if !units::is_decimal(&draft.value) {
        return Err(ValidationKind::BadValue);
    }
    if draft.gas_limit == 0 {
        return Err(ValidationKind::BadGasLimit);
    }
    if !is_hex_data(&draft.data) {
        return Err(ValidationKind::BadData);
    }
    if draft.to == CONTRACT_CREATION_SENTINEL {
        draft.to.clear();
    }
    Ok(())
}

/// Account state read from the node before assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainData {
    pub nonce: u128,
    pub gas_price: u128,
    pub balance: u128,
}

/// `0x` hex quantity without leading zeros
pub fn quantity_hex(value: u128) -> String {
    format!("{value:#x}")
}

/// Fully resolved transaction, ready to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTx {
    pub nonce: u128,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// `None` creates a contract
    pub to: Option<Address>,
    pub value_wei: u128,
    pub data: Vec<u8>,
    pub chain_id: Option<u64>,
}

impl AssembledTx {
    pub fn nonce_hex(&self) -> String {
        quantity_hex(self.nonce)
    }

    pub fn gas_price_hex(&self) -> String {
        quantity_hex(self.gas_price)
    }

    pub fn gas_limit_hex(&self) -> String {
        quantity_hex(u128::from(self.gas_limit))
    }

    pub fn value_hex(&self) -> String {
        quantity_hex(self.value_wei)
    }

    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }

    /// Maximum wei the transaction can spend
    pub fn max_cost(&self) -> Option<u128> {
        self.gas_price
            .checked_mul(u128::from(self.gas_limit))?
            .checked_add(self.value_wei)
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&trimmed(self.nonce));
        stream.append(&trimmed(self.gas_price));
        stream.append(&trimmed(u128::from(self.gas_limit)));
        match &self.to {
            Some(to) => stream.append(&to.as_bytes().to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&trimmed(self.value_wei));
        stream.append(&self.data);
    }
}

fn trimmed(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn trimmed_word(word: &[u8; 32]) -> Vec<u8> {
    let start = word.iter().position(|b| *b != 0).unwrap_or(word.len());
    word[start..].to_vec()
}

/// Resolve a validated draft against chain state
pub fn assemble(
    draft: &TxDraft,
    chain: &ChainData,
    chain_id: Option<u64>,
) -> WalletResult<AssembledTx> {
    let to = if draft.to.is_empty() {
        None
    } else {
        Some(
            draft
                .to
                .parse::<Address>()
                .map_err(|_| WalletError::from(ValidationKind::BadAddress))?,
        )
    };

    let value_wei = units::to_wei(&draft.value, draft.unit)?;

    let mut data_digits = strip_hex_prefix(&draft.data).to_string();
    if data_digits.len() % 2 == 1 {
        data_digits.insert(0, '0');
    }
    let data = hex::decode(&data_digits).map_err(|_| WalletError::from(ValidationKind::BadData))?;

    let tx = AssembledTx {
        nonce: chain.nonce,
        gas_price: chain.gas_price,
        gas_limit: draft.gas_limit,
        to,
        value_wei,
        data,
        chain_id,
    };

    let required = tx.max_cost().ok_or(ValidationKind::BadValue)?;
    if required > chain.balance {
        return Err(WalletError::InsufficientFunds {
            required,
            available: chain.balance,
        });
    }

    Ok(tx)
}

/// Keccak-256 of the unsigned RLP payload
pub fn signing_hash(tx: &AssembledTx) -> [u8; 32] {
    let mut stream = match tx.chain_id {
        Some(_) => RlpStream::new_list(9),
        None => RlpStream::new_list(6),
    };
    tx.append_fields(&mut stream);
    if let Some(chain_id) = tx.chain_id {
        stream.append(&trimmed(u128::from(chain_id)));
        stream.append_empty_data();
        stream.append_empty_data();
    }
    keccak256(&stream.out())
}

/// Signed transaction and its raw encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub tx: AssembledTx,
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub raw: Vec<u8>,
}

impl SignedTx {
    /// Raw transaction as submitted to the node
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    /// Transaction hash
    pub fn hash(&self) -> String {
        format!("0x{}", hex::encode(keccak256(&self.raw)))
    }

    /// Recover the sending address from the signature
    pub fn sender(&self) -> WalletResult<Address> {
        let base = match self.tx.chain_id {
            Some(chain_id) => 35 + 2 * chain_id,
            None => 27,
        };
        let recovery_id = self
            .v
            .checked_sub(base)
            .and_then(|id| u8::try_from(id).ok())
            .ok_or_else(|| WalletError::Chain(format!("unexpected v value {}", self.v)))?;

        let signature = RecoverableSignature {
            r: self.r,
            s: self.s,
            recovery_id,
        };
        Ok(signature.recover(&signing_hash(&self.tx))?.address())
    }
}

/// Sign an assembled transaction
pub fn sign(tx: &AssembledTx, key: &PrivateKey) -> WalletResult<SignedTx> {
    let signature = key.sign_hash(&signing_hash(tx))?;
    let recovery_id = u64::from(signature.recovery_id);
    let v = match tx.chain_id {
        Some(chain_id) => recovery_id + 35 + 2 * chain_id,
        None => recovery_id + 27,
    };

    let mut stream = RlpStream::new_list(9);
    tx.append_fields(&mut stream);
    stream.append(&trimmed(u128::from(v)));
    stream.append(&trimmed_word(&signature.r));
    stream.append(&trimmed_word(&signature.s));

    Ok(SignedTx {
        tx: tx.clone(),
        v,
        r: signature.r,
        s: signature.s,
        raw: stream.out().to_vec(),
    })
}
