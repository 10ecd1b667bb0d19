//! Common types used across the exchange
//!
//! This module provides the fundamental domain types shared between the
//! matching engine, the asset ledger, and the configuration/CLI layers:
//! account identities (`Address`) and the fixed-point quantities
//! (`Amount`) the engine moves around.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The fixed scale factor used for all fractional amounts: `10^18`.
///
/// A price `p` means `p` scaled units of the price asset per one scaled
/// unit of the book asset. `(amount * price) / UNIT` (floor division)
/// gives the price-asset cost of `amount` book-asset units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Opaque account identity standing in for an on-chain address.
///
/// Backed by 32 bytes rather than the 20 a real EVM address would use:
/// nothing in this workspace speaks the EVM checksum format, and a wider,
/// uniformly-zero-padded identifier is simpler to construct in tests than
/// one that needs a checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address, used as the sentinel "no maker" / "unassigned" value.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Build an address from a short integer tag, useful in tests and demos
    /// (`Address::from_u64(1)`, `Address::from_u64(2)`, ...).
    pub fn from_u64(tag: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&tag.to_be_bytes());
        Self(bytes)
    }

    /// True if this is the zero/sentinel address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let hex_part = text.strip_prefix("0x").unwrap_or(&text);
        if hex_part.len() != 64 {
            return Err(D::Error::custom(format!(
                "address must be 32 bytes (64 hex digits), got {} characters",
                hex_part.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex_part[i * 2..i * 2 + 2], 16)
                .map_err(|e| D::Error::custom(format!("invalid hex in address: {e}")))?;
        }
        Ok(Address(bytes))
    }
}

/// A non-negative fixed-point quantity, scaled by [`UNIT`].
///
/// spec-level amounts are described as 256-bit (or equivalent wide)
/// unsigned integers; this implementation uses `u128` as the "equivalent
/// wide integer" — ample headroom for the scaled quantities a two-asset
/// order book moves (see DESIGN.md for the tradeoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(u128::MAX);

    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn min(self, rhs: Amount) -> Amount {
        if self.0 <= rhs.0 {
            self
        } else {
            rhs
        }
    }

    /// `self * price / UNIT`, floored, as spec'd for every cost computation.
    ///
    /// Returns `None` on overflow of the intermediate product; callers
    /// should treat that as an invalid order rather than panicking.
    pub fn scale_by_price(self, price: Amount) -> Option<Amount> {
        self.0
            .checked_mul(price.0)
            .map(|product| Amount(product / UNIT))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_zero_is_default() {
        assert_eq!(Address::default(), Address::ZERO);
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn address_display_is_hex_prefixed() {
        let addr = Address::from_u64(1);
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 64);
    }

    #[test]
    fn scale_by_price_floors() {
        // 10 * 1.5 units, UNIT = 1e18: 10 * 1.5e18 / 1e18 == 15
        let amount = Amount(10);
        let price = Amount(UNIT + UNIT / 2);
        assert_eq!(amount.scale_by_price(price), Some(Amount(15)));
    }

    #[test]
    fn scale_by_price_floor_division_drops_remainder() {
        // 3 units at a price of 1/3 UNIT should floor to 0, not round.
        let amount = Amount(1);
        let price = Amount(UNIT / 3);
        assert_eq!(amount.scale_by_price(price), Some(Amount(0)));
    }

    #[test]
    fn checked_sub_detects_underflow() {
        assert_eq!(Amount(1).checked_sub(Amount(2)), None);
        assert_eq!(Amount(5).checked_sub(Amount(2)), Some(Amount(3)));
    }

    #[test]
    fn address_serde_round_trips_through_hex() {
        let addr = Address::from_u64(42);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn address_deserialize_accepts_missing_prefix() {
        let addr = Address::from_u64(7);
        let hex_only = addr.to_string().trim_start_matches("0x").to_string();
        let parsed: Address = serde_json::from_str(&format!("\"{hex_only}\"")).unwrap();
        assert_eq!(parsed, addr);
    }
}
