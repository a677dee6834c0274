//! Ether denominations and decimal conversion to wei

use crate::error::ValidationKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named ether denomination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtherUnit {
    #[default]
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    Ether,
    Kether,
    Mether,
    Gether,
    Tether,
}

impl EtherUnit {
    /// Number of decimal places relative to wei
    pub fn decimals(&self) -> u32 {
        match self {
            EtherUnit::Wei => 0,
            EtherUnit::Kwei => 3,
            EtherUnit::Mwei => 6,
            EtherUnit::Gwei => 9,
            EtherUnit::Szabo => 12,
            EtherUnit::Finney => 15,
            EtherUnit::Ether => 18,
            EtherUnit::Kether => 21,
            EtherUnit::Mether => 24,
            EtherUnit::Gether => 27,
            EtherUnit::Tether => 30,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EtherUnit::Wei => "wei",
            EtherUnit::Kwei => "kwei",
            EtherUnit::Mwei => "mwei",
            EtherUnit::Gwei => "gwei",
            EtherUnit::Szabo => "szabo",
            EtherUnit::Finney => "finney",
            EtherUnit::Ether => "ether",
            EtherUnit::Kether => "kether",
            EtherUnit::Mether => "mether",
            EtherUnit::Gether => "gether",
            EtherUnit::Tether => "tether",
        }
    }
}

impl FromStr for EtherUnit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let unit = match value.to_ascii_lowercase().as_str() {
            "wei" => EtherUnit::Wei,
            "kwei" | "ada" | "femtoether" => EtherUnit::Kwei,
            "mwei" | "babbage" | "picoether" => EtherUnit::Mwei,
            "gwei" | "shannon" | "nanoether" | "nano" => EtherUnit::Gwei,
            "szabo" | "microether" | "micro" => EtherUnit::Szabo,
            "finney" | "milliether" | "milli" => EtherUnit::Finney,
            "ether" | "eth" => EtherUnit::Ether,
            "kether" | "grand" | "einstein" => EtherUnit::Kether,
            "mether" => EtherUnit::Mether,
            "gether" => EtherUnit::Gether,
            "tether" => EtherUnit::Tether,
            other => return Err(format!("unknown ether unit: {other}")),
        };
        Ok(unit)
    }
}

impl fmt::Display for EtherUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `value` is a non-negative decimal number such as `12`, `0.5` or `.5`
pub fn is_decimal(value: &str) -> bool {
    split_decimal(value).is_some()
}

fn split_decimal(value: &str) -> Option<(&str, &str)> {
    let value = value.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !digits(whole) || !digits(fraction) {
        return None;
    }
    Some((whole, fraction))
}

/// Convert a decimal amount in `unit` to wei
pub fn to_wei(value: &str, unit: EtherUnit) -> Result<u128, ValidationKind> {
    let (whole, fraction) = split_decimal(value).ok_or(ValidationKind::BadValue)?;
    let decimals = unit.decimals() as usize;

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals {
        // Amount has a fractional wei part
        return Err(ValidationKind::BadValue);
    }

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(decimals - fraction.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| ValidationKind::BadValue)
}

/// Render a wei amount in `unit` without trailing zeros
pub fn from_wei(wei: u128, unit: EtherUnit) -> String {
    let decimals = unit.decimals() as usize;
    let digits = format!("{wei:0>width$}", width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}
