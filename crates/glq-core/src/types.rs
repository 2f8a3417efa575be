//! Core ledger types: addresses, amounts, tiers, call context.
//!
//! Token amounts are `u128` base units (see [`COIN`](crate::constants::COIN)).
//! Time is Unix seconds as `u64`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_TIER1_APY_BPS, DEFAULT_TIER2_APY_BPS, DEFAULT_TIER3_APY_BPS,
};
use crate::error::AddressError;

/// Token amount in base units.
pub type Amount = u128;

/// Ranking id issued by the tier engine. `0` means "none".
pub type MemberId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A 20-byte account address, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::InvalidPrefix)?;
        if body.len() != 40 {
            return Err(AddressError::InvalidLength(body.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reward band. Tier 1 is the most senior and earns the highest rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    One,
    Two,
    Three,
}

impl Tier {
    /// All tiers, most senior first.
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Two, Tier::Three];

    /// Numeric tier (1, 2 or 3).
    pub fn as_u8(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            3 => Ok(Tier::Three),
            other => Err(format!("invalid tier: {other}")),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Annual percentage yield per tier, in basis points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApyRates {
    pub tier1_bps: u64,
    pub tier2_bps: u64,
    pub tier3_bps: u64,
}

impl ApyRates {
    pub fn new(tier1_bps: u64, tier2_bps: u64, tier3_bps: u64) -> Self {
        Self { tier1_bps, tier2_bps, tier3_bps }
    }

    /// Rate applied to a member currently ranked in `tier`.
    pub fn for_tier(&self, tier: Tier) -> u64 {
        match tier {
            Tier::One => self.tier1_bps,
            Tier::Two => self.tier2_bps,
            Tier::Three => self.tier3_bps,
        }
    }
}

impl Default for ApyRates {
    fn default() -> Self {
        Self::new(DEFAULT_TIER1_APY_BPS, DEFAULT_TIER2_APY_BPS, DEFAULT_TIER3_APY_BPS)
    }
}

/// Who is calling and when. Read once per operation and reused throughout it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn address_display_is_prefixed_hex() {
        let addr = Address([0xab; 20]);
        assert_eq!(addr.to_string(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn address_parse_accepts_mixed_case() {
        let s = "0x8984e422E30033A84B780420566046d25EB3519a";
        let addr: Address = s.parse().unwrap();
        assert_eq!(addr.to_string(), s.to_lowercase());
    }

    #[test]
    fn address_parse_rejects_missing_prefix() {
        assert_eq!(
            "8984e422e30033a84b780420566046d25eb3519a".parse::<Address>(),
            Err(AddressError::InvalidPrefix)
        );
    }

    #[test]
    fn address_parse_rejects_short_input() {
        assert_eq!("0x1234".parse::<Address>(), Err(AddressError::InvalidLength(4)));
    }

    #[test]
    fn address_parse_rejects_non_hex() {
        let s = format!("0x{}", "zz".repeat(20));
        assert!(matches!(s.parse::<Address>(), Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn address_serde_json_roundtrip() {
        let addr = Address([7; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "07".repeat(20)));
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1; 20]).is_zero());
    }

    #[test]
    fn tier_numbers() {
        assert_eq!(Tier::One.as_u8(), 1);
        assert_eq!(Tier::Three.to_string(), "3");
        assert_eq!(Tier::try_from(2u8), Ok(Tier::Two));
        assert!(Tier::try_from(0u8).is_err());
        assert!(Tier::try_from(4u8).is_err());
    }

    #[test]
    fn tier_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Tier::Two).unwrap(), "2");
        let t: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(t, Tier::Three);
    }

    #[test]
    fn tiers_order_by_seniority() {
        assert!(Tier::One < Tier::Two);
        assert!(Tier::Two < Tier::Three);
    }

    #[test]
    fn apy_lookup_per_tier() {
        let rates = ApyRates::new(1, 2, 3);
        assert_eq!(rates.for_tier(Tier::One), 1);
        assert_eq!(rates.for_tier(Tier::Two), 2);
        assert_eq!(rates.for_tier(Tier::Three), 3);
    }

    #[test]
    fn default_apy_matches_constants() {
        let rates = ApyRates::default();
        assert_eq!(rates.tier1_bps, DEFAULT_TIER1_APY_BPS);
        assert_eq!(rates.tier2_bps, DEFAULT_TIER2_APY_BPS);
        assert_eq!(rates.tier3_bps, DEFAULT_TIER3_APY_BPS);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn address_text_roundtrip(bytes in any::<[u8; 20]>()) {
            let addr = Address(bytes);
            let text = addr.to_string();
            prop_assert_eq!(text.len(), 42);
            prop_assert_eq!(text.parse::<Address>(), Ok(addr));
        }

        #[test]
        fn address_json_roundtrip(bytes in any::<[u8; 20]>()) {
            let addr = Address(bytes);
            let json = serde_json::to_string(&addr).unwrap();
            prop_assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
        }
    }
}
