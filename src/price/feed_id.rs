//! FTSOv2 feed identifiers
//!
//! A feed id is 21 bytes: one category byte followed by the ASCII feed name
//! (`BTC/USD`), right-padded with zero bytes.

use crate::constants::DEFAULT_QUOTE_CURRENCY;
use crate::error::AddressError;
use serde::{Serialize, Serializer};
use std::fmt;

const FEED_ID_LEN: usize = 21;
const NAME_LEN: usize = FEED_ID_LEN - 1;

/// Feed category (first byte of the id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedCategory {
    Crypto,
    Forex,
    Commodity,
    Stock,
}

impl FeedCategory {
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Crypto => 0x01,
            Self::Forex => 0x02,
            Self::Commodity => 0x03,
            Self::Stock => 0x04,
        }
    }
}

impl TryFrom<u8> for FeedCategory {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Crypto),
            0x02 => Ok(Self::Forex),
            0x03 => Ok(Self::Commodity),
            0x04 => Ok(Self::Stock),
            other => Err(AddressError::UnknownCategory(other)),
        }
    }
}

/// Identifier of one FTSOv2 feed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedId {
    category: FeedCategory,
    name: String,
}

impl FeedId {
    /// Build an id from a category and an already normalized name
    pub fn new(category: FeedCategory, name: &str) -> Result<Self, AddressError> {
        if name.is_empty() {
            return Err(AddressError::EmptySymbol);
        }
        if !name.is_ascii() {
            return Err(AddressError::NonAsciiName(name.to_string()));
        }
        if name.len() > NAME_LEN {
            return Err(AddressError::NameTooLong(name.to_string()));
        }
        Ok(Self {
            category,
            name: name.to_string(),
        })
    }

    /// Crypto feed from a loose symbol: `"btc"` and `"BTC/usd"` both become `BTC/USD`
    pub fn crypto(symbol: &str) -> Result<Self, AddressError> {
        Self::new(FeedCategory::Crypto, &normalize_symbol(symbol)?)
    }

    /// Decode the 21-byte on-chain form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != FEED_ID_LEN {
            return Err(AddressError::InvalidLength {
                expected: FEED_ID_LEN,
                actual: bytes.len(),
            });
        }
        let category = FeedCategory::try_from(bytes[0])?;
        let name_bytes = &bytes[1..];
        let end = name_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(name_bytes.len());
        let name = std::str::from_utf8(&name_bytes[..end])
            .map_err(|_| AddressError::InvalidHex(hex::encode(bytes)))?;
        Self::new(category, name)
    }

    /// Decode `0x`-prefixed hex
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::InvalidHex(s.to_string()))?;
        let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn category(&self) -> FeedCategory {
        self.category
    }

    /// Human-readable feed name, e.g. `BTC/USD`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The 21-byte on-chain form
    pub fn to_bytes(&self) -> [u8; FEED_ID_LEN] {
        let mut out = [0u8; FEED_ID_LEN];
        out[0] = self.category.as_byte();
        out[1..1 + self.name.len()].copy_from_slice(self.name.as_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for FeedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Uppercase and append the default quote currency when missing
fn normalize_symbol(symbol: &str) -> Result<String, AddressError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(AddressError::EmptySymbol);
    }
    let upper = trimmed.to_ascii_uppercase();
    if upper.contains('/') {
        Ok(upper)
    } else {
        Ok(format!("{}/{}", upper, DEFAULT_QUOTE_CURRENCY))
    }
}
